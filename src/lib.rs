#![forbid(unsafe_code)]

pub mod app;
pub mod auth;
pub mod config;
pub mod debounce;
pub mod error;
pub mod inmemory;
pub mod model;
pub mod mutation;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod search;
pub mod store;
pub mod sync;

use std::sync::Arc;

pub use app::InventoryApp;
pub use config::{InventoryConfig, SearchMode, StoreBackendConfig, WriteMode};
pub use error::{InventoryError, InventoryResult};
pub use model::{InventoryItem, ItemDocument, ItemName, Revision, SessionState};
pub use mutation::{MutationOutcome, QuantityMutator};
pub use search::filter;
pub use store::ItemStore;
pub use sync::InventorySync;

/// Builds the item store selected by `config.backend`.
pub fn create_item_store(config: &InventoryConfig) -> InventoryResult<Arc<dyn ItemStore>> {
    match &config.backend {
        StoreBackendConfig::InMemory => Ok(Arc::new(inmemory::InMemoryItemStore::new())),
        #[cfg(feature = "redis")]
        StoreBackendConfig::RedisUrl(url) => Ok(Arc::new(
            redis_store::RedisItemStore::from_url_with_namespace(url, config.namespace.as_str())?,
        )),
        #[cfg(not(feature = "redis"))]
        StoreBackendConfig::RedisUrl(_) => Err(InventoryError::StoreUnavailable(
            "redis backend requires the `redis` feature".into(),
        )),
    }
}

/// JSON schema of a materialized inventory row.
#[cfg(feature = "schema")]
pub fn inventory_item_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(InventoryItem)
}

pub(crate) fn serde_error(err: serde_json::Error) -> InventoryError {
    InventoryError::Validation(format!("document could not be encoded: {err}"))
}

#[cfg(feature = "redis")]
pub(crate) fn redis_error(err: redis::RedisError) -> InventoryError {
    InventoryError::StoreUnavailable(err.to_string())
}
