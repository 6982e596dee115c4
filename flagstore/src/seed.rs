//! Startup seeding: pushes the snapshot file (or the configured defaults)
//! into the cache, then writes back a fresh snapshot of the resulting state.

use crate::config::FlagDefault;
use crate::metrics_defs::SEED_WRITES;
use crate::snapshot::SnapshotProvider;
use crate::store::{FlagError, FlagStore};
use crate::types::FlagMap;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    Snapshot,
    Defaults,
}

pub struct SeedOutcome {
    pub name: String,
    pub enabled: bool,
    pub result: Result<(), FlagError>,
}

pub struct SeedReport {
    pub source: SeedSource,
    pub outcomes: Vec<SeedOutcome>,
    pub snapshot_written: bool,
    pub final_state: FlagMap,
}

impl SeedReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

/// Seeds the cache and refreshes the snapshot. An individual flag write
/// failing does not abort the remaining flags; a failure to read back the
/// final state does.
pub async fn seed(
    store: &FlagStore,
    snapshot: &dyn SnapshotProvider,
    defaults: &HashMap<String, FlagDefault>,
) -> Result<SeedReport, FlagError> {
    let (source, to_set) = match snapshot.load() {
        Ok(flags) if !flags.is_empty() => (
            SeedSource::Snapshot,
            flags
                .into_iter()
                .map(|(name, record)| (name, record.enabled, record.description))
                .collect::<Vec<_>>(),
        ),
        Ok(_) => (SeedSource::Defaults, defaults_to_set(defaults)),
        Err(err) => {
            tracing::warn!(error = %err, "could not read flag snapshot, using configured defaults");
            (SeedSource::Defaults, defaults_to_set(defaults))
        }
    };

    let mut outcomes = Vec::with_capacity(to_set.len());
    for (name, enabled, description) in to_set {
        let result = store.set(&name, enabled, &description).await.map(|_| ());
        match &result {
            Ok(()) => {
                metrics::counter!(SEED_WRITES.name).increment(1);
            }
            Err(err) => {
                tracing::error!(flag = %name, error = %err, "failed to seed flag");
            }
        }
        outcomes.push(SeedOutcome {
            name,
            enabled,
            result,
        });
    }

    let final_state = store.list().await?;

    let snapshot_written = match snapshot.store(&final_state) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "failed to write flag snapshot");
            false
        }
    };

    Ok(SeedReport {
        source,
        outcomes,
        snapshot_written,
        final_state,
    })
}

fn defaults_to_set(defaults: &HashMap<String, FlagDefault>) -> Vec<(String, bool, String)> {
    defaults
        .iter()
        .map(|(name, default)| (name.clone(), default.enabled, default.description.clone()))
        .collect()
}
