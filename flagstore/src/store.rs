use crate::cache::{CacheBackend, CacheError};
use crate::config::OverrideConfig;
use crate::types::{FlagMap, FlagRecord};
use std::sync::Arc;

/// Cache key convention: `feature_flag:<name>`.
pub const FLAG_KEY_PREFIX: &str = "feature_flag:";

fn flag_key(name: &str) -> String {
    format!("{FLAG_KEY_PREFIX}{name}")
}

#[derive(thiserror::Error, Debug)]
pub enum FlagError {
    #[error("flag name must not be empty")]
    EmptyName,

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("invalid flag record: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Maps flag names to records persisted in the cache service, with a
/// read-time override layer. Every operation is one cache round-trip;
/// concurrent writers race under last-write-wins semantics.
pub struct FlagStore {
    cache: Arc<dyn CacheBackend>,
    overrides: OverrideConfig,
}

impl FlagStore {
    pub fn new(cache: Arc<dyn CacheBackend>, overrides: OverrideConfig) -> Self {
        FlagStore { cache, overrides }
    }

    /// Upserts the record, stamping `updated_at` with the current time.
    /// Repeated calls with the same arguments leave a single record.
    pub async fn set(
        &self,
        name: &str,
        enabled: bool,
        description: &str,
    ) -> Result<FlagRecord, FlagError> {
        if name.is_empty() {
            return Err(FlagError::EmptyName);
        }

        let record = FlagRecord::new(enabled, description);
        let value = serde_json::to_string(&record)?;
        self.cache.put(&flag_key(name), &value).await?;

        Ok(record)
    }

    /// Turns the flag on, keeping the stored description if the record exists.
    pub async fn enable(&self, name: &str) -> Result<FlagRecord, FlagError> {
        let description = self
            .get_details(name)
            .await?
            .map(|record| record.description)
            .unwrap_or_default();
        self.set(name, true, &description).await
    }

    /// Turns the flag off, keeping the stored description if the record exists.
    pub async fn disable(&self, name: &str) -> Result<FlagRecord, FlagError> {
        let description = self
            .get_details(name)
            .await?
            .map(|record| record.description)
            .unwrap_or_default();
        self.set(name, false, &description).await
    }

    /// Effective value of the flag. Overrides win over storage and are
    /// answered without a cache round-trip; a flag that was never set
    /// reports disabled. A stored record that cannot be decoded also
    /// reports disabled rather than failing the caller.
    pub async fn is_enabled(&self, name: &str) -> Result<bool, FlagError> {
        if self.overrides.force_all_enabled || self.overrides.always_enabled.contains(name) {
            tracing::debug!(flag = name, "flag forced on by override");
            return Ok(true);
        }

        match self.cache.get(&flag_key(name)).await? {
            Some(raw) => match serde_json::from_str::<FlagRecord>(&raw) {
                Ok(record) => Ok(record.enabled),
                Err(err) => {
                    tracing::warn!(flag = name, error = %err, "unreadable flag record, treating as disabled");
                    Ok(false)
                }
            },
            None => Ok(false),
        }
    }

    /// The stored record, or `None` if the flag was never set.
    pub async fn get_details(&self, name: &str) -> Result<Option<FlagRecord>, FlagError> {
        match self.cache.get(&flag_key(name)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// All known flags. Ordering is not guaranteed. Records that cannot be
    /// decoded are skipped.
    pub async fn list(&self) -> Result<FlagMap, FlagError> {
        let entries = self.cache.scan(FLAG_KEY_PREFIX).await?;

        let mut flags = FlagMap::new();
        for (key, raw) in entries {
            let name = key.strip_prefix(FLAG_KEY_PREFIX).unwrap_or(&key).to_string();
            match serde_json::from_str::<FlagRecord>(&raw) {
                Ok(record) => {
                    flags.insert(name, record);
                }
                Err(err) => {
                    tracing::warn!(flag = %name, error = %err, "skipping unreadable flag record");
                }
            }
        }

        Ok(flags)
    }

    /// Removes the record. Subsequent reads fall back to the override and
    /// never-set behavior.
    pub async fn delete(&self, name: &str) -> Result<(), FlagError> {
        self.cache.delete(&flag_key(name)).await?;
        Ok(())
    }

    pub fn overrides(&self) -> &OverrideConfig {
        &self.overrides
    }
}
