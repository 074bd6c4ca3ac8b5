//! A generic data-access adapter: a uniform CRUD surface over pluggable document stores.
//!
//! This crate is the core of the docadapter project and provides:
//!
//! - **Filter trees** ([`filter`]) - The wire-level filter language and its parsing
//! - **Compiled predicates** ([`predicate`]) - Store-ready filters and the visitor executors walk
//! - **Filter compilation** ([`compile`]) - Translation of filter trees into predicates
//! - **Sorting** ([`sort`]) - Sort specifications and ordering clauses
//! - **Date handling** ([`date`]) - Conversion between wire date wrappers and native dates
//! - **Items** ([`item`]) - The record type and its JSON conversions
//! - **Executor abstraction** ([`executor`]) - Traits implemented by storage backends
//! - **Payloads** ([`envelope`]) - Request and response types of every operation
//! - **Storage service** ([`service`]) - Validation and orchestration of CRUD operations
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docadapter_core::{envelope::FindRequest, service::StorageService};
//! use serde_json::json;
//!
//! let service = StorageService::new(executor);
//! let page = service
//!     .find(FindRequest::new("users", 0, 20).with_sort(json!([
//!         { "fieldName": "lastName", "direction": "asc" },
//!     ])))
//!     .await?;
//!
//! println!("{} of {}", page.items.len(), page.total_count);
//! ```

#[allow(unused_extern_crates)]
extern crate self as docadapter_core;

pub mod compile;
pub mod date;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod filter;
pub mod item;
pub mod predicate;
pub mod service;
pub mod sort;
