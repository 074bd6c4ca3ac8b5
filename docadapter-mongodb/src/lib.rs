//! MongoDB query executor for docadapter.
//!
//! This crate provides a MongoDB-based implementation of the `QueryExecutor` trait. Compiled
//! predicates are translated into native MongoDB filters, so filtering, sorting and paging
//! all run inside the database.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docadapter = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docadapter::{executor::ExecutorBuilder, mongodb::MongoDbExecutor, service::StorageService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = MongoDbExecutor::builder("mongodb://localhost:27017", "my_database")
//!         .build()
//!         .await?;
//!     let service = StorageService::new(executor);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docadapter_mongodb;

pub mod query;
pub mod sanitizer;
pub mod store;

pub use store::{MongoDbExecutor, MongoDbExecutorBuilder};
