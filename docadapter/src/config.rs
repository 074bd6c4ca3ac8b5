//! Backend selection and connection settings.
//!
//! An [`AdapterConfig`] can be deserialized from any serde format or read from the
//! environment, then turned into a ready [`StorageService`] with [`AdapterConfig::connect`].
//!
//! | Variable | Default |
//! |---|---|
//! | `DOCADAPTER_BACKEND` | `memory` |
//! | `MONGODB_URI` | `mongodb://localhost:27017` |
//! | `MONGODB_DATABASE` | `docadapter` |

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::info;

use docadapter_core::{
    error::{AdapterError, AdapterResult},
    executor::{ExecutorBuilder, QueryExecutor},
    service::StorageService,
};
use docadapter_memory::MemoryExecutor;

pub const BACKEND_VAR: &str = "DOCADAPTER_BACKEND";
pub const MONGODB_URI_VAR: &str = "MONGODB_URI";
pub const MONGODB_DATABASE_VAR: &str = "MONGODB_DATABASE";

const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
const DEFAULT_DATABASE: &str = "docadapter";

/// The store a service talks to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Mongodb,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Memory => "memory",
            BackendKind::Mongodb => "mongodb",
        })
    }
}

impl FromStr for BackendKind {
    type Err = AdapterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "mongodb" => Ok(BackendKind::Mongodb),
            other => Err(AdapterError::Config(format!("Unknown backend {other:?}"))),
        }
    }
}

fn default_mongodb_uri() -> String {
    DEFAULT_MONGODB_URI.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

/// Connection settings for a storage service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Connection string, used by the `mongodb` backend only.
    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,
    /// Database name, used by the `mongodb` backend only.
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            mongodb_uri: default_mongodb_uri(),
            database: default_database(),
        }
    }
}

impl AdapterConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> AdapterResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults for unset or
    /// blank variables.
    pub fn from_lookup<F>(lookup: F) -> AdapterResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            backend: match lookup(BACKEND_VAR) {
                Some(backend) => backend.parse()?,
                None => defaults.backend,
            },
            mongodb_uri: lookup(MONGODB_URI_VAR).unwrap_or(defaults.mongodb_uri),
            database: lookup(MONGODB_DATABASE_VAR).unwrap_or(defaults.database),
        })
    }

    /// Builds the configured executor and wraps it in a storage service.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::Initialization`] when the store cannot be reached or configured
    /// - [`AdapterError::Config`] when the backend is not compiled in
    pub async fn connect(&self) -> AdapterResult<StorageService<Box<dyn QueryExecutor>>> {
        let executor: Box<dyn QueryExecutor> = match self.backend {
            BackendKind::Memory => Box::new(MemoryExecutor::builder().build().await?),
            BackendKind::Mongodb => self.connect_mongodb().await?,
        };

        info!(backend = %self.backend, "storage executor ready");

        Ok(StorageService::new(executor))
    }

    #[cfg(feature = "mongodb")]
    async fn connect_mongodb(&self) -> AdapterResult<Box<dyn QueryExecutor>> {
        let executor = docadapter_mongodb::MongoDbExecutor::builder(&self.mongodb_uri, &self.database)
            .build()
            .await?;

        Ok(Box::new(executor))
    }

    #[cfg(not(feature = "mongodb"))]
    async fn connect_mongodb(&self) -> AdapterResult<Box<dyn QueryExecutor>> {
        Err(AdapterError::Config(
            "The mongodb backend requires the `mongodb` feature".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use docadapter_core::envelope::CountRequest;
    use serde_json::json;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();

        move |key| vars.get(key).cloned()
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        let config = AdapterConfig::from_lookup(lookup(&[(MONGODB_DATABASE_VAR, "  ")])).unwrap();

        assert_eq!(config, AdapterConfig::default());
        assert_eq!(config.mongodb_uri, "mongodb://localhost:27017");
    }

    #[test]
    fn variables_override_defaults() {
        let config = AdapterConfig::from_lookup(lookup(&[
            (BACKEND_VAR, "MongoDB"),
            (MONGODB_URI_VAR, "mongodb://db:27017"),
            (MONGODB_DATABASE_VAR, "shop"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendKind::Mongodb);
        assert_eq!(config.mongodb_uri, "mongodb://db:27017");
        assert_eq!(config.database, "shop");
    }

    #[test]
    fn unknown_backends_are_config_errors() {
        let result = AdapterConfig::from_lookup(lookup(&[(BACKEND_VAR, "sqlite")]));

        assert!(matches!(result, Err(AdapterError::Config(_))));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: AdapterConfig = serde_json::from_value(json!({ "database": "shop" })).unwrap();

        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.database, "shop");
        assert_eq!(config.mongodb_uri, "mongodb://localhost:27017");
    }

    #[tokio::test]
    async fn memory_backend_connects() {
        let service = AdapterConfig::default().connect().await.unwrap();

        let count = service.count(CountRequest::new("anything")).await.unwrap();

        assert_eq!(count.total_count, 0);
    }

    #[cfg(not(feature = "mongodb"))]
    #[tokio::test]
    async fn mongodb_backend_requires_the_feature() {
        let config = AdapterConfig {
            backend: BackendKind::Mongodb,
            ..AdapterConfig::default()
        };

        let err = config.connect().await.unwrap_err();

        assert_eq!(err.kind(), docadapter_core::error::ErrorKind::Store);
        assert!(matches!(err, AdapterError::Config(_)));
    }
}
