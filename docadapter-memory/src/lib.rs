//! In-memory query executor for docadapter.
//!
//! This crate provides a thread-safe, in-memory implementation of the `QueryExecutor` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development,
//! testing and small deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Full predicate support** - Every compiled predicate is evaluated natively
//! - **Stable ordering** - Multi-key sorts keep insertion order between ties
//!
//! # Quick Start
//!
//! ```ignore
//! use docadapter_core::{envelope::ItemRequest, service::StorageService};
//! use docadapter_memory::MemoryExecutor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = StorageService::new(MemoryExecutor::new());
//!     let item = serde_json::json!({ "name": "Alice" });
//!
//!     service
//!         .insert(ItemRequest::new("users", item.as_object().cloned().unwrap_or_default()))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docadapter_memory;

pub mod evaluator;
pub mod store;

pub use store::{MemoryExecutor, MemoryExecutorBuilder};
