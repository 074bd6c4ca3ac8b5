use async_trait::async_trait;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions},
};
use tracing::{debug, info};

use docadapter_core::{
    error::{AdapterError, AdapterResult},
    executor::{ExecutorBuilder, QueryExecutor},
    item::{ID_FIELD, Item},
    predicate::Predicate,
    sort::OrderClause,
};

use crate::{
    query::{MongoPredicateTranslator, sort_document},
    sanitizer::KeySanitizer,
};

fn backend(err: mongodb::error::Error) -> AdapterError {
    AdapterError::Backend(err.to_string())
}

/// Query executor backed by a MongoDB database.
///
/// Collections map one-to-one onto MongoDB collections of the configured database. Item keys
/// that MongoDB cannot store are rewritten on the way in and restored on the way out.
#[derive(Debug, Clone)]
pub struct MongoDbExecutor {
    client: Client,
    database: String,
}

impl MongoDbExecutor {
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
        }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbExecutorBuilder {
        MongoDbExecutorBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&KeySanitizer::sanitize_key(collection_name))
    }

    fn require_id(item: &Item) -> AdapterResult<&str> {
        item.get_str(ID_FIELD)
            .map_err(|_| AdapterError::Backend(format!("Item is missing a string {ID_FIELD}")))
    }
}

#[async_trait]
impl QueryExecutor for MongoDbExecutor {
    async fn select(
        &self,
        collection: &str,
        predicate: &Predicate,
        order: &OrderClause,
        skip: u64,
        limit: Option<u64>,
    ) -> AdapterResult<Vec<Item>> {
        let filter = MongoPredicateTranslator::translate(predicate)?;
        let mut options = FindOptions::default();

        options.sort = sort_document(order);
        if skip > 0 {
            options.skip = Some(skip);
        }
        if let Some(limit) = limit {
            options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        debug!(collection, %filter, "mongodb find");

        Ok(
            self.get_collection(collection)
                .find(filter)
                .with_options(options)
                .await
                .map_err(backend)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend)?
                .into_iter()
                .map(KeySanitizer::restore_document)
                .collect()
        )
    }

    async fn count(&self, collection: &str, predicate: &Predicate) -> AdapterResult<u64> {
        let filter = MongoPredicateTranslator::translate(predicate)?;

        debug!(collection, %filter, "mongodb count");

        self.get_collection(collection)
            .count_documents(filter)
            .await
            .map_err(backend)
    }

    async fn insert(&self, collection: &str, item: Item) -> AdapterResult<Item> {
        self.get_collection(collection)
            .insert_one(KeySanitizer::sanitize_document(item.clone()))
            .await
            .map_err(backend)?;

        Ok(item)
    }

    async fn update(&self, collection: &str, item: Item) -> AdapterResult<Option<Item>> {
        let id = Self::require_id(&item)?;
        let result = self
            .get_collection(collection)
            .replace_one(doc! { ID_FIELD: id }, KeySanitizer::sanitize_document(item.clone()))
            .await
            .map_err(backend)?;

        Ok((result.matched_count > 0).then_some(item))
    }

    async fn delete_one(&self, collection: &str, item_id: &str) -> AdapterResult<u64> {
        Ok(
            self.get_collection(collection)
                .delete_one(doc! { ID_FIELD: item_id })
                .await
                .map_err(backend)?
                .deleted_count
        )
    }

    async fn list_collections(&self) -> AdapterResult<Vec<String>> {
        let mut names = self
            .client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(backend)?
            .iter()
            .map(|name| KeySanitizer::restore_key(name))
            .collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }

    async fn shutdown(&self) -> AdapterResult<()> {
        info!(database = %self.database, "shutting down mongodb client");
        self.client.clone().shutdown().await;

        Ok(())
    }
}

/// Builder for [`MongoDbExecutor`], connecting from a connection string.
#[derive(Debug, Clone)]
pub struct MongoDbExecutorBuilder {
    dsn: String,
    database: String,
}

impl MongoDbExecutorBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl ExecutorBuilder for MongoDbExecutorBuilder {
    type Executor = MongoDbExecutor;

    async fn build(self) -> AdapterResult<Self::Executor> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| AdapterError::Initialization(e.to_string()))?;

        info!(database = %self.database, "connecting to mongodb");

        Ok(MongoDbExecutor::new(
            Client::with_options(options).map_err(|e| AdapterError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_connection_strings_fail_initialization() {
        let result = MongoDbExecutor::builder("not a connection string", "db").build().await;

        assert!(matches!(result, Err(AdapterError::Initialization(_))));
    }
}
