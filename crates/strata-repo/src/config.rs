//! Repository configuration.
//!
//! Configuration is an INI file flattened to `section.key` entries, read
//! once at repository open and queried by dotted key (e.g.
//! `sparse.filter`).

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::RepoResult;
use crate::ini;

/// Flattened repository configuration.
#[derive(Clone, Debug, Default)]
pub struct RepositoryConfig {
    entries: BTreeMap<String, String>,
}

impl RepositoryConfig {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from INI text.
    pub fn from_ini(text: &str) -> RepoResult<Self> {
        let mut entries = BTreeMap::new();
        for (section, keys) in ini::parse(text)? {
            for (key, value) in keys {
                let flat = if section.is_empty() {
                    key
                } else {
                    format!("{section}.{key}")
                };
                entries.insert(flat, value);
            }
        }
        Ok(Self { entries })
    }

    /// Load configuration from an INI file on disk.
    pub fn load(path: &Path) -> RepoResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ini(&text)
    }

    /// Read a value by dotted key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set a value by dotted key, returning the prior value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a value by dotted key, returning the prior value.
    pub fn unset(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// All entries whose dotted key starts with `prefix`.
    pub fn with_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}
