//! Literal string substitution against the model routing config file, with a
//! backup of the original next to it.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Substitution {
    pub find: String,
    pub replace: String,
}

#[derive(Debug)]
pub struct PatchReport {
    pub backup_path: PathBuf,
    pub applied: Vec<Substitution>,
    /// Substitutions whose `find` text was not present. A miss is reported,
    /// not treated as an error: the file may already carry the fix.
    pub missed: Vec<Substitution>,
}

#[derive(thiserror::Error, Debug)]
pub enum PatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no substitutions configured")]
    NoSubstitutions,
}

/// Backs up `path` to `<path>.bak`, applies each substitution in order, and
/// writes the result back in place.
pub fn patch_file(path: &Path, substitutions: &[Substitution]) -> Result<PatchReport, PatchError> {
    if substitutions.is_empty() {
        return Err(PatchError::NoSubstitutions);
    }

    let original = fs::read_to_string(path)?;

    let backup_path = backup_path_for(path);
    fs::write(&backup_path, &original)?;

    let mut content = original;
    let mut applied = Vec::new();
    let mut missed = Vec::new();

    for substitution in substitutions {
        if content.contains(&substitution.find) {
            content = content.replace(&substitution.find, &substitution.replace);
            applied.push(substitution.clone());
        } else {
            missed.push(substitution.clone());
        }
    }

    fs::write(path, &content)?;

    tracing::debug!(
        path = %path.display(),
        applied = applied.len(),
        missed = missed.len(),
        "patched routing config"
    );

    Ok(PatchReport {
        backup_path,
        applied,
        missed,
    })
}

fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}
