//! Minimal INI parsing shared by the repository config and the sparse
//! filter file.
//!
//! Supported syntax: `[section]` headers, `key = value` assignments, blank
//! lines, and `#`/`;` comments. Keys before the first section header land
//! in the unnamed section `""`.

use std::collections::BTreeMap;

use crate::error::{RepoError, RepoResult};

/// Parsed INI content: section name → key → value.
pub type IniSections = BTreeMap<String, BTreeMap<String, String>>;

/// Parse INI text into its sections.
pub fn parse(text: &str) -> RepoResult<IniSections> {
    let mut sections: IniSections = BTreeMap::new();
    let mut current = String::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(header) = line.strip_prefix('[') {
            match header.strip_suffix(']') {
                Some(name) if !name.trim().is_empty() => {
                    current = name.trim().to_string();
                    sections.entry(current.clone()).or_default();
                    continue;
                }
                _ => {
                    return Err(RepoError::MalformedConfig {
                        line: index + 1,
                        text: raw_line.to_string(),
                    })
                }
            }
        }
        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                sections
                    .entry(current.clone())
                    .or_default()
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => {
                return Err(RepoError::MalformedConfig {
                    line: index + 1,
                    text: raw_line.to_string(),
                })
            }
        }
    }

    Ok(sections)
}
