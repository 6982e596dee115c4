/// Best-effort local copy of the flag map, used to seed the cache when it
/// comes up empty or to recover last-known values when the cache service is
/// unreachable at startup. No atomic-write or corruption-recovery guarantee.
use crate::types::FlagMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait SnapshotProvider: Send + Sync {
    fn load(&self) -> Result<FlagMap, SnapshotError>;
    fn store(&self, flags: &FlagMap) -> Result<(), SnapshotError>;
}

pub struct FilesystemSnapshotProvider {
    path: PathBuf,
}

impl FilesystemSnapshotProvider {
    pub fn new(base_dir: &str, filename: &str) -> Self {
        FilesystemSnapshotProvider {
            path: Path::new(base_dir).join(filename),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotProvider for FilesystemSnapshotProvider {
    fn load(&self) -> Result<FlagMap, SnapshotError> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    fn store(&self, flags: &FlagMap) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Create or overwrite file
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, flags)?;
        writer.flush()?;

        tracing::debug!(path = %self.path.display(), flags = flags.len(), "stored flag snapshot");
        Ok(())
    }
}

/// Discards stores and loads nothing. Used when no snapshot file is configured.
pub struct NoopSnapshotProvider;

impl SnapshotProvider for NoopSnapshotProvider {
    fn load(&self) -> Result<FlagMap, SnapshotError> {
        tracing::warn!("loading flags from the no-op snapshot provider");
        Ok(FlagMap::new())
    }

    fn store(&self, _flags: &FlagMap) -> Result<(), SnapshotError> {
        // Do nothing
        Ok(())
    }
}
