use crate::snapshot::{FilesystemSnapshotProvider, NoopSnapshotProvider, SnapshotProvider};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum SnapshotStoreType {
    Filesystem { base_dir: String, filename: String },
    Noop,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct CacheConfig {
    /// Base URL of the cache service's KV HTTP API.
    pub url: String,
}

/// Read-time override rules, passed into the store at construction time.
///
/// Overrides always win over persisted values: they are a pure read-time
/// transform and never mutate storage, so an overridden flag's effective
/// value may diverge from what the cache holds.
#[derive(Clone, Default, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct OverrideConfig {
    /// Report every flag as enabled, regardless of storage.
    pub force_all_enabled: bool,
    /// Flags that always report enabled, regardless of storage.
    pub always_enabled: HashSet<String>,
}

/// Initial value for a flag, applied by seeding when no snapshot exists.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct FlagDefault {
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct FlagStoreConfig {
    pub cache: CacheConfig,
    pub snapshot: SnapshotStoreType,
    #[serde(default)]
    pub overrides: OverrideConfig,
    #[serde(default)]
    pub defaults: HashMap<String, FlagDefault>,
}

pub fn get_provider(store_type: &SnapshotStoreType) -> Arc<dyn SnapshotProvider> {
    match store_type {
        SnapshotStoreType::Filesystem { base_dir, filename } => {
            Arc::new(FilesystemSnapshotProvider::new(base_dir, filename))
        }
        SnapshotStoreType::Noop => Arc::new(NoopSnapshotProvider),
    }
}
