use std::env;

const PREVIEW_LEN: usize = 8;

/// Presence report for a set of required environment variables. Values are
/// never exposed in full; only a short prefix survives for the operator to
/// recognize which credential is configured.
#[derive(Debug)]
pub struct EnvReport {
    pub entries: Vec<EnvEntry>,
}

#[derive(Debug)]
pub struct EnvEntry {
    pub name: String,
    /// Truncated preview of the value, or `None` when unset or empty.
    pub preview: Option<String>,
}

impl EnvReport {
    pub fn collect(names: &[&str]) -> Self {
        let entries = names
            .iter()
            .map(|name| EnvEntry {
                name: (*name).to_string(),
                preview: env::var(name)
                    .ok()
                    .filter(|value| !value.is_empty())
                    .map(|value| preview(&value)),
            })
            .collect();

        EnvReport { entries }
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|entry| entry.preview.is_some())
    }

    pub fn missing(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.preview.is_none())
            .map(|entry| entry.name.as_str())
            .collect()
    }
}

pub(crate) fn preview(value: &str) -> String {
    let head: String = value.chars().take(PREVIEW_LEN).collect();
    if head.len() == value.len() {
        head
    } else {
        format!("{head}...")
    }
}
