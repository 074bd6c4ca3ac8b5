//! The storage service: request validation and orchestration of CRUD operations.
//!
//! [`StorageService`] is the entry point callers use. For each operation it checks the
//! payload, compiles the filter and sort, delegates to its [`QueryExecutor`] and converts
//! items between their wire and store forms (including dates, see [`DateCodec`]).
//!
//! The service keeps no state between calls and never retries. Executor failures reach the
//! caller unchanged.
//!
//! # Example
//!
//! ```ignore
//! use docadapter::{prelude::*, memory::MemoryExecutor};
//! use serde_json::json;
//!
//! let service = StorageService::new(MemoryExecutor::new());
//! let page = service
//!     .find(FindRequest::new("widgets", 0, 10).with_filter(json!({
//!         "operator": "$gt", "fieldName": "price", "value": 10,
//!     })))
//!     .await?;
//! ```

use tracing::{debug, warn};

use crate::{
    compile::FilterCompiler,
    date::DateCodec,
    envelope::{
        CountRequest, CountResponse, FindRequest, FindResponse, GetRequest, InsertRequest,
        ItemResponse, ListCollectionsResponse, RemoveRequest, UpdateRequest,
    },
    error::{AdapterError, AdapterResult},
    executor::QueryExecutor,
    item::{Item, WireItem, ensure_id, item_from_json, item_id, item_to_json},
    predicate::Predicate,
    sort::{OrderClause, SortCompiler, SortSpec},
};

/// Orchestrates CRUD operations over a [`QueryExecutor`].
#[derive(Debug)]
pub struct StorageService<E: QueryExecutor> {
    executor: E,
}

impl<E: QueryExecutor> StorageService<E> {
    /// Creates a new storage service over the given executor.
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Returns the executor this service delegates to.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Returns one page of matching items and the size of the whole matching population.
    ///
    /// `select` and `count` are issued concurrently; if either fails the whole operation fails.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::BadRequest`] when `collectionName`, `skip` or `limit` is missing or
    ///   invalid, or the filter/sort is malformed
    /// - [`AdapterError::UnsupportedOperator`] for unknown filter operators
    pub async fn find(&self, request: FindRequest) -> AdapterResult<FindResponse> {
        let collection = require_collection(request.collection_name.as_deref())?;
        let skip = match request.skip {
            None => return Err(AdapterError::missing("skip")),
            Some(skip) if skip < 0 => {
                return Err(AdapterError::BadRequest(
                    "Invalid skip in request body: must not be negative".into(),
                ));
            }
            Some(skip) => skip as u64,
        };
        let limit = match request.limit {
            None => return Err(AdapterError::missing("limit")),
            Some(limit) if limit <= 0 => {
                return Err(AdapterError::BadRequest(
                    "Invalid limit in request body: must be a positive integer".into(),
                ));
            }
            Some(limit) => limit as u64,
        };

        let predicate = FilterCompiler::compile_json(request.filter.as_ref())?;
        let order = SortCompiler::compile(&SortSpec::from_json(request.sort.as_ref())?);

        debug!(collection, predicate = %predicate, order = %order, skip, limit, "find");

        let (items, total_count) = futures::try_join!(
            self.executor.select(collection, &predicate, &order, skip, Some(limit)),
            self.executor.count(collection, &predicate),
        )?;

        Ok(FindResponse {
            items: items
                .into_iter()
                .map(outbound)
                .collect(),
            total_count,
        })
    }

    /// Returns the item with the given identifier.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::BadRequest`] when `collectionName` or `itemId` is missing
    /// - [`AdapterError::NotFound`] when no item carries the identifier
    pub async fn get(&self, request: GetRequest) -> AdapterResult<ItemResponse> {
        let collection = require_collection(request.collection_name.as_deref())?;
        let id = require_item_id(request.item_id.as_deref())?;

        debug!(collection, id, "get");

        match self.select_by_id(collection, id).await? {
            Some(item) => Ok(ItemResponse { item: outbound(item) }),
            None => {
                warn!(collection, id, "item not found");
                Err(AdapterError::NotFound(format!("Item with id {id} not found.")))
            }
        }
    }

    /// Persists a new item, generating an `_id` when it has none.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::BadRequest`] when `collectionName` or `item` is missing, or `_id` is
    ///   not a string
    pub async fn insert(&self, request: InsertRequest) -> AdapterResult<ItemResponse> {
        let collection = require_collection(request.collection_name.as_deref())?;
        let mut item = require_item(request.item)?;
        let id = ensure_id(&mut item)?;

        debug!(collection, id = %id, "insert");

        let inserted = self
            .executor
            .insert(collection, DateCodec::decode_inbound(item))
            .await?;

        Ok(ItemResponse { item: outbound(inserted) })
    }

    /// Replaces an existing item, identified by its `_id`.
    ///
    /// An identifier that matches no record is reported as not found; nothing is created.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::BadRequest`] when `collectionName`, `item` or `item._id` is missing
    /// - [`AdapterError::NotFound`] when no item carries the identifier
    pub async fn update(&self, request: UpdateRequest) -> AdapterResult<ItemResponse> {
        let collection = require_collection(request.collection_name.as_deref())?;
        let item = require_item(request.item)?;
        let id = item_id(&item)?
            .ok_or_else(|| AdapterError::missing("item._id"))?
            .to_string();

        debug!(collection, id = %id, "update");

        match self
            .executor
            .update(collection, DateCodec::decode_inbound(item))
            .await?
        {
            Some(updated) => Ok(ItemResponse { item: outbound(updated) }),
            None => {
                warn!(collection, id = %id, "update matched no item");
                Err(AdapterError::NotFound(format!("Item with id {id} does not exist.")))
            }
        }
    }

    /// Deletes an item and returns it as it was before deletion.
    ///
    /// The item is read before it is deleted, without any lock or transaction between the two
    /// steps. Two concurrent removals of the same identifier may both read the item; the
    /// one whose delete affects no record reports it as not found.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::BadRequest`] when `collectionName` or `itemId` is missing
    /// - [`AdapterError::NotFound`] when the item is absent before or during deletion
    pub async fn remove(&self, request: RemoveRequest) -> AdapterResult<ItemResponse> {
        let collection = require_collection(request.collection_name.as_deref())?;
        let id = require_item_id(request.item_id.as_deref())?;

        debug!(collection, id, "remove");

        let not_found = || AdapterError::NotFound(format!("Item with id {id} does not exist."));

        let Some(item) = self.select_by_id(collection, id).await? else {
            warn!(collection, id, "remove target not found");
            return Err(not_found());
        };

        if self.executor.delete_one(collection, id).await? == 0 {
            warn!(collection, id, "remove target vanished before delete");
            return Err(not_found());
        }

        Ok(ItemResponse { item: outbound(item) })
    }

    /// Counts the items matching an optional filter.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::BadRequest`] when `collectionName` is missing or the filter is malformed
    /// - [`AdapterError::UnsupportedOperator`] for unknown filter operators
    pub async fn count(&self, request: CountRequest) -> AdapterResult<CountResponse> {
        let collection = require_collection(request.collection_name.as_deref())?;
        let predicate = FilterCompiler::compile_json(request.filter.as_ref())?;

        debug!(collection, predicate = %predicate, "count");

        Ok(CountResponse {
            total_count: self.executor.count(collection, &predicate).await?,
        })
    }

    /// Lists the collections of the backing store.
    pub async fn list_collections(&self) -> AdapterResult<ListCollectionsResponse> {
        Ok(ListCollectionsResponse {
            collections: self.executor.list_collections().await?,
        })
    }

    /// Shuts down the underlying executor.
    pub async fn shutdown(self) -> AdapterResult<()> {
        self.executor.shutdown().await
    }

    async fn select_by_id(&self, collection: &str, id: &str) -> AdapterResult<Option<Item>> {
        Ok(self
            .executor
            .select(collection, &Predicate::id_eq(id), &OrderClause::default(), 0, Some(1))
            .await?
            .into_iter()
            .next())
    }
}

fn require_collection(name: Option<&str>) -> AdapterResult<&str> {
    match name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(AdapterError::missing("collectionName")),
    }
}

fn require_item_id(id: Option<&str>) -> AdapterResult<&str> {
    match id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(AdapterError::missing("itemId")),
    }
}

fn require_item(item: Option<WireItem>) -> AdapterResult<Item> {
    item_from_json(item.ok_or_else(|| AdapterError::missing("item"))?)
}

fn outbound(item: Item) -> WireItem {
    item_to_json(DateCodec::encode_outbound(item))
}
