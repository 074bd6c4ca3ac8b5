//! In-memory query executor.
//!
//! Items are kept per collection in insertion order, behind an async-aware read-write lock.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use mea::rwlock::RwLock;
use tracing::trace;

use docadapter_core::{
    error::{AdapterError, AdapterResult},
    executor::{ExecutorBuilder, QueryExecutor},
    item::{ID_FIELD, Item},
    predicate::Predicate,
    sort::OrderClause,
};

use crate::evaluator::{PredicateEvaluator, compare_items};

type StoreMap = HashMap<String, Vec<Item>>;

/// Thread-safe in-memory executor.
///
/// # Thread Safety
///
/// `MemoryExecutor` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Performance
///
/// Every query scans the whole collection; there are no indexes.
///
/// # Example
///
/// ```ignore
/// use docadapter_memory::MemoryExecutor;
/// use docadapter_core::service::StorageService;
///
/// let service = StorageService::new(MemoryExecutor::new());
/// ```
#[derive(Default, Clone, Debug)]
pub struct MemoryExecutor {
    /// collection name -> items in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl MemoryExecutor {
    /// Creates a new, empty executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing a `MemoryExecutor`.
    pub fn builder() -> MemoryExecutorBuilder {
        MemoryExecutorBuilder
    }

    fn filter<'a>(items: &'a [Item], predicate: &Predicate) -> AdapterResult<Vec<&'a Item>> {
        if predicate.is_unconstrained() {
            return Ok(items.iter().collect());
        }

        let mut evaluator = PredicateEvaluator::new();
        let mut matched = Vec::new();

        for item in items {
            if evaluator.matches(item, predicate)? {
                matched.push(item);
            }
        }

        Ok(matched)
    }
}

fn same_id(item: &Item, id: &str) -> bool {
    item.get_str(ID_FIELD).is_ok_and(|existing| existing == id)
}

fn require_id(item: &Item) -> AdapterResult<&str> {
    item.get_str(ID_FIELD)
        .map_err(|_| AdapterError::Backend(format!("Item is missing a string {ID_FIELD}")))
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    async fn select(
        &self,
        collection: &str,
        predicate: &Predicate,
        order: &OrderClause,
        skip: u64,
        limit: Option<u64>,
    ) -> AdapterResult<Vec<Item>> {
        let store = self.store.read().await;
        let Some(items) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut matched = Self::filter(items, predicate)?;
        if !order.is_empty() {
            matched.sort_by(|left, right| compare_items(order, left, right));
        }

        trace!(collection, matched = matched.len(), skip, ?limit, "memory select");

        Ok(
            matched
                .into_iter()
                .skip(usize::try_from(skip).unwrap_or(usize::MAX))
                .take(limit.map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX)))
                .cloned()
                .collect()
        )
    }

    async fn count(&self, collection: &str, predicate: &Predicate) -> AdapterResult<u64> {
        let store = self.store.read().await;

        Ok(match store.get(collection) {
            Some(items) => Self::filter(items, predicate)?.len() as u64,
            None => 0,
        })
    }

    async fn insert(&self, collection: &str, item: Item) -> AdapterResult<Item> {
        let id = require_id(&item)?;
        let mut store = self.store.write().await;
        let items = store
            .entry(collection.to_string())
            .or_default();

        if items.iter().any(|existing| same_id(existing, id)) {
            return Err(AdapterError::Backend(format!(
                "Item with id {id} already exists in collection {collection}"
            )));
        }

        items.push(item.clone());

        Ok(item)
    }

    async fn update(&self, collection: &str, item: Item) -> AdapterResult<Option<Item>> {
        let id = require_id(&item)?;
        let mut store = self.store.write().await;
        let Some(existing) = store
            .get_mut(collection)
            .and_then(|items| items.iter_mut().find(|existing| same_id(existing, id)))
        else {
            return Ok(None);
        };

        *existing = item.clone();

        Ok(Some(item))
    }

    async fn delete_one(&self, collection: &str, item_id: &str) -> AdapterResult<u64> {
        let mut store = self.store.write().await;
        let Some(items) = store.get_mut(collection) else {
            return Ok(0);
        };

        match items.iter().position(|item| same_id(item, item_id)) {
            Some(index) => {
                items.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn list_collections(&self) -> AdapterResult<Vec<String>> {
        let mut names = self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }
}

/// Builder for constructing [`MemoryExecutor`] instances.
///
/// ```ignore
/// use docadapter_memory::MemoryExecutor;
/// use docadapter_core::executor::ExecutorBuilder;
///
/// let executor = MemoryExecutor::builder().build().await?;
/// ```
#[derive(Default, Debug)]
pub struct MemoryExecutorBuilder;

#[async_trait]
impl ExecutorBuilder for MemoryExecutorBuilder {
    type Executor = MemoryExecutor;

    /// Always succeeds with a fresh, empty executor.
    async fn build(self) -> AdapterResult<Self::Executor> {
        Ok(MemoryExecutor::new())
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use docadapter_core::{
        compile::FilterCompiler,
        sort::{SortCompiler, SortSpec},
    };
    use serde_json::{Value, json};

    use super::*;

    fn order(sort: Value) -> OrderClause {
        SortCompiler::compile(&SortSpec::from_json(Some(&sort)).unwrap())
    }

    async fn seeded() -> MemoryExecutor {
        let executor = MemoryExecutor::new();
        for (id, name, price) in [("a", "Bolt", 3), ("b", "Anchor", 12), ("c", "Clamp", 7), ("d", "Bracket", 12)] {
            executor
                .insert("parts", doc! { "_id": id, "name": name, "price": price })
                .await
                .unwrap();
        }
        executor
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|item| item.get_str("_id").unwrap()).collect()
    }

    #[tokio::test]
    async fn unordered_select_keeps_insertion_order() {
        let executor = seeded().await;

        let items = executor
            .select("parts", &Predicate::Always, &OrderClause::default(), 1, Some(2))
            .await
            .unwrap();

        assert_eq!(ids(&items), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn multi_key_sort_is_stable() {
        let executor = seeded().await;
        let order = order(json!([
            { "fieldName": "price", "direction": "desc" },
            { "fieldName": "name" },
        ]));

        let items = executor
            .select("parts", &Predicate::Empty, &order, 0, None)
            .await
            .unwrap();

        assert_eq!(ids(&items), vec!["b", "d", "c", "a"]);
    }

    #[tokio::test]
    async fn count_ignores_paging() {
        let executor = seeded().await;
        let predicate = FilterCompiler::compile_json(Some(&json!({
            "operator": "$gte", "fieldName": "price", "value": 7,
        })))
        .unwrap();

        let page = executor
            .select("parts", &predicate, &OrderClause::default(), 0, Some(1))
            .await
            .unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(executor.count("parts", &predicate).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let executor = seeded().await;

        let result = executor.insert("parts", doc! { "_id": "a" }).await;

        assert!(matches!(result, Err(AdapterError::Backend(_))));
    }

    #[tokio::test]
    async fn update_never_upserts() {
        let executor = seeded().await;

        let replaced = executor
            .update("parts", doc! { "_id": "a", "name": "Bolt", "price": 4 })
            .await
            .unwrap();
        let missing = executor.update("parts", doc! { "_id": "zz" }).await.unwrap();
        let other_collection = executor.update("nothing", doc! { "_id": "a" }).await.unwrap();

        assert!(replaced.is_some());
        assert!(missing.is_none());
        assert!(other_collection.is_none());
        assert_eq!(executor.count("parts", &Predicate::Always).await.unwrap(), 4);
        assert!(executor.list_collections().await.unwrap() == vec!["parts".to_string()]);
    }

    #[tokio::test]
    async fn delete_reports_affected_records() {
        let executor = seeded().await;

        assert_eq!(executor.delete_one("parts", "c").await.unwrap(), 1);
        assert_eq!(executor.delete_one("parts", "c").await.unwrap(), 0);
        assert_eq!(executor.delete_one("nothing", "c").await.unwrap(), 0);
        assert_eq!(executor.count("parts", &Predicate::Always).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let executor = MemoryExecutor::builder().build().await.unwrap();
        let clone = executor.clone();

        clone.insert("things", doc! { "_id": "x" }).await.unwrap();

        assert_eq!(executor.count("things", &Predicate::Always).await.unwrap(), 1);
    }
}
