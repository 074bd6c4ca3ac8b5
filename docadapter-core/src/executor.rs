//! Query executor abstraction.
//!
//! The storage service never talks to a store directly. It compiles filters and sorts, then
//! delegates to a [`QueryExecutor`], which owns connections, pooling and the translation of
//! compiled predicates into the store's native query form.
//!
//! # Traits
//!
//! - [`QueryExecutor`]: the store operations the service needs
//! - [`ExecutorBuilder`]: factory trait for creating executor instances

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;

use crate::{
    error::AdapterResult,
    item::Item,
    predicate::Predicate,
    sort::OrderClause,
};

/// Abstract interface to a backing store.
///
/// # Thread Safety
///
/// Implementations must be thread-safe; one executor serves every concurrent request, and
/// `find` runs `select` and `count` on it at the same time.
///
/// # Unconstrained predicates
///
/// [`Predicate::Empty`] and [`Predicate::Always`] both mean "every record".
///
/// # Error Handling
///
/// Store failures are reported as [`AdapterError::Backend`](crate::error::AdapterError::Backend)
/// (or another store-kind variant) and are passed to the caller unchanged.
#[async_trait]
pub trait QueryExecutor: Send + Sync + Debug {
    /// Returns the records matching `predicate`, ordered by `order`, after skipping `skip`
    /// records and keeping at most `limit`.
    async fn select(
        &self,
        collection: &str,
        predicate: &Predicate,
        order: &OrderClause,
        skip: u64,
        limit: Option<u64>,
    ) -> AdapterResult<Vec<Item>>;

    /// Counts the records matching `predicate`.
    async fn count(&self, collection: &str, predicate: &Predicate) -> AdapterResult<u64>;

    /// Persists a new record and returns its stored form.
    ///
    /// The item always carries an `_id`. Collections are created on first insert.
    async fn insert(&self, collection: &str, item: Item) -> AdapterResult<Item>;

    /// Replaces the record whose `_id` matches the item's.
    ///
    /// Returns `None` when no record carries that identifier; executors never upsert.
    async fn update(&self, collection: &str, item: Item) -> AdapterResult<Option<Item>>;

    /// Deletes the record with the given identifier, returning how many records were removed.
    async fn delete_one(&self, collection: &str, item_id: &str) -> AdapterResult<u64>;

    /// Lists the collections known to the store.
    async fn list_collections(&self) -> AdapterResult<Vec<String>>;

    /// Releases the executor's resources. The default implementation does nothing.
    async fn shutdown(&self) -> AdapterResult<()> {
        Ok(())
    }
}

macro_rules! forward_query_executor {
    ($($wrapper:ty),+) => {
        $(
            #[async_trait]
            impl<E> QueryExecutor for $wrapper
            where
                E: QueryExecutor + ?Sized,
            {
                async fn select(
                    &self,
                    collection: &str,
                    predicate: &Predicate,
                    order: &OrderClause,
                    skip: u64,
                    limit: Option<u64>,
                ) -> AdapterResult<Vec<Item>> {
                    (**self).select(collection, predicate, order, skip, limit).await
                }

                async fn count(&self, collection: &str, predicate: &Predicate) -> AdapterResult<u64> {
                    (**self).count(collection, predicate).await
                }

                async fn insert(&self, collection: &str, item: Item) -> AdapterResult<Item> {
                    (**self).insert(collection, item).await
                }

                async fn update(&self, collection: &str, item: Item) -> AdapterResult<Option<Item>> {
                    (**self).update(collection, item).await
                }

                async fn delete_one(&self, collection: &str, item_id: &str) -> AdapterResult<u64> {
                    (**self).delete_one(collection, item_id).await
                }

                async fn list_collections(&self) -> AdapterResult<Vec<String>> {
                    (**self).list_collections().await
                }

                async fn shutdown(&self) -> AdapterResult<()> {
                    (**self).shutdown().await
                }
            }
        )+
    };
}

forward_query_executor!(&E, Box<E>, Arc<E>);

/// Factory for executors that need asynchronous setup (connecting, authenticating).
#[async_trait]
pub trait ExecutorBuilder {
    type Executor: QueryExecutor;

    async fn build(self) -> AdapterResult<Self::Executor>;
}
