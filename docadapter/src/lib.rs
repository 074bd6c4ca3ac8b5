//! Main docadapter crate: a uniform CRUD surface over pluggable document stores.
//!
//! This crate is the primary entry point. It re-exports the core types, the bundled
//! executors and a [`config`] layer that picks and connects a backend at runtime.
//!
//! # Features
//!
//! - **Structured filters** - Nested `$and`/`$or`/`$not` trees over field comparisons,
//!   compiled into escaped, store-ready predicates
//! - **Multiple backends** - In-memory and MongoDB executors behind one trait
//! - **Date transparency** - `{ "date": "<ISO-8601>" }` wrappers become native dates and back
//!
//! # Quick Start
//!
//! ```ignore
//! use docadapter::{prelude::*, memory::MemoryExecutor};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> AdapterResult<()> {
//!     let service = StorageService::new(MemoryExecutor::new());
//!
//!     let widget = json!({ "name": "Sprocket", "createdAt": { "date": "2024-01-01T00:00:00.000" } });
//!     service
//!         .insert(ItemRequest::new("widgets", widget.as_object().cloned().unwrap_or_default()))
//!         .await?;
//!
//!     let page = service
//!         .find(FindRequest::new("widgets", 0, 10).with_filter(json!({
//!             "operator": "$startsWith", "fieldName": "name", "value": "spr",
//!         })))
//!         .await?;
//!
//!     println!("{} of {}", page.items.len(), page.total_count);
//!
//!     service.shutdown().await
//! }
//! ```
//!
//! # Runtime Backend Selection
//!
//! ```ignore
//! use docadapter::config::AdapterConfig;
//!
//! let service = AdapterConfig::from_env()?.connect().await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory executor for development and testing
//! - `mongodb` - MongoDB executor (requires the `mongodb` feature)

pub mod config;
pub mod prelude;

pub use docadapter_core::{compile, date, envelope, error, executor, filter, item, predicate, service, sort};

// Re-export BSON and JSON types for convenience
pub use bson;
pub use serde_json;

/// In-memory executor implementations.
pub mod memory {
    pub use docadapter_memory::{MemoryExecutor, MemoryExecutorBuilder};
}

/// MongoDB executor implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docadapter_mongodb::{MongoDbExecutor, MongoDbExecutorBuilder};
}
