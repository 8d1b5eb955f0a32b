use crate::error::{validation, InventoryResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which document store backs the inventory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendConfig {
    #[default]
    InMemory,
    RedisUrl(String),
}

/// How quantity mutations write back to the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Read, compute, overwrite. Concurrent writers on one item can lose updates.
    #[default]
    ReadModifyWrite,
    /// Write only if the document revision is unchanged since the read; retry otherwise.
    CompareAndSwap,
}

/// Which item fields a search query is matched against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Name,
    NameOrCategory,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct InventoryConfig {
    pub backend: StoreBackendConfig,
    /// Key prefix used by namespaced backends.
    pub namespace: String,
    pub write_mode: WriteMode,
    /// Upper bound on compare-and-swap attempts per mutation.
    pub max_cas_attempts: u32,
    pub search_mode: SearchMode,
    /// Quiet period before a typed search query is applied.
    pub search_debounce_ms: u64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendConfig::InMemory,
            namespace: "inventory".to_string(),
            write_mode: WriteMode::ReadModifyWrite,
            max_cas_attempts: 8,
            search_mode: SearchMode::Name,
            search_debounce_ms: 300,
        }
    }
}

impl InventoryConfig {
    /// Parses a JSON document; absent fields take their defaults.
    pub fn from_json(raw: &str) -> InventoryResult<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|err| validation(format!("invalid inventory config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> InventoryResult<()> {
        if self.max_cas_attempts == 0 {
            return Err(validation("max_cas_attempts must be at least 1"));
        }
        if self.namespace.trim().is_empty() {
            return Err(validation("namespace must not be empty"));
        }
        Ok(())
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}
