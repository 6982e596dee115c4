pub mod cache;
pub mod config;
pub mod metrics_defs;
pub mod seed;
pub mod snapshot;
pub mod store;
pub mod types;

pub use cache::{CacheBackend, CacheError, HttpCache, MemoryCache};
pub use config::{FlagStoreConfig, OverrideConfig, SnapshotStoreType, get_provider};
pub use snapshot::{
    FilesystemSnapshotProvider, NoopSnapshotProvider, SnapshotError, SnapshotProvider,
};
pub use store::{FLAG_KEY_PREFIX, FlagError, FlagStore};
pub use types::{FlagMap, FlagRecord};

#[cfg(test)]
pub(crate) mod testutils;
