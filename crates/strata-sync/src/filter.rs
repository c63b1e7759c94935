//! The repository filter a sparse clone is defined by.
//!
//! The filter is loaded from an INI file (named by the repository config
//! key `sparse.filter`). Each section names a feature-type path and
//! carries two keys: `type` — the predicate kind — and, for attribute
//! predicates, `filter` — its text. A `default` section applies to paths
//! without a section of their own.
//!
//! ```ini
//! [roads]
//! type = all
//!
//! [buildings]
//! type = attribute
//! filter = zone=commercial
//! ```
//!
//! Supported predicate kinds: `all` (every feature under the path
//! matches) and `attribute` (`name=value` equality on a feature
//! attribute).

use std::path::Path;

use strata_repo::ini;
use strata_store::Feature;

use crate::error::{SyncError, SyncResult};

/// Section name whose rule applies to paths without their own section.
const DEFAULT_SECTION: &str = "default";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Predicate {
    /// Every feature under the path matches.
    All,
    /// Equality on one feature attribute.
    Attribute { name: String, value: String },
}

#[derive(Clone, Debug)]
struct FilterRule {
    path: String,
    predicate: Predicate,
}

/// A predicate over feature paths and attributes, defining what a sparse
/// clone keeps.
#[derive(Clone, Debug, Default)]
pub struct RepositoryFilter {
    rules: Vec<FilterRule>,
    default_rule: Option<Predicate>,
}

impl RepositoryFilter {
    /// A filter with no rules; nothing matches.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a filter from INI text.
    pub fn from_ini(text: &str) -> SyncResult<Self> {
        let sections = ini::parse(text)?;
        let mut rules = Vec::new();
        let mut default_rule = None;

        for (section, keys) in sections {
            if section.is_empty() {
                return Err(SyncError::InvalidFilter(
                    "filter entries must be inside a section".into(),
                ));
            }
            let predicate = match keys.get("type").map(String::as_str) {
                Some("all") => Predicate::All,
                Some("attribute") => {
                    let text = keys.get("filter").ok_or_else(|| {
                        SyncError::InvalidFilter(format!(
                            "attribute filter for {section:?} needs a filter key"
                        ))
                    })?;
                    let (name, value) = text.split_once('=').ok_or_else(|| {
                        SyncError::InvalidFilter(format!(
                            "attribute filter for {section:?} must be name=value, got {text:?}"
                        ))
                    })?;
                    Predicate::Attribute {
                        name: name.trim().to_string(),
                        value: value.trim().to_string(),
                    }
                }
                Some(other) => {
                    return Err(SyncError::InvalidFilter(format!(
                        "unknown filter type {other:?} for {section:?}"
                    )))
                }
                None => {
                    return Err(SyncError::InvalidFilter(format!(
                        "section {section:?} has no type key"
                    )))
                }
            };

            if section == DEFAULT_SECTION {
                default_rule = Some(predicate);
            } else {
                rules.push(FilterRule {
                    path: section,
                    predicate,
                });
            }
        }

        Ok(Self {
            rules,
            default_rule,
        })
    }

    /// Load a filter from an INI file on disk.
    pub fn load(path: &Path) -> SyncResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ini(&text)
    }

    fn rule_for(&self, path: &str) -> Option<&Predicate> {
        self.rules
            .iter()
            .find(|rule| {
                path == rule.path || path.strip_prefix(&rule.path).is_some_and(|r| r.starts_with('/'))
            })
            .map(|rule| &rule.predicate)
            .or(self.default_rule.as_ref())
    }

    /// Whether any rule applies to `path` at all.
    pub fn filters_path(&self, path: &str) -> bool {
        self.rule_for(path).is_some()
    }

    /// Whether the rule for `path` needs the feature's attribute values.
    pub fn needs_attributes(&self, path: &str) -> bool {
        matches!(self.rule_for(path), Some(Predicate::Attribute { .. }))
    }

    /// Whether a feature at `path` passes the filter.
    ///
    /// `feature` supplies attribute values for attribute predicates; an
    /// attribute predicate without feature data does not match.
    pub fn matches(&self, path: &str, feature: Option<&Feature>) -> bool {
        match self.rule_for(path) {
            None => false,
            Some(Predicate::All) => true,
            Some(Predicate::Attribute { name, value }) => feature
                .and_then(|f| f.get(name))
                .is_some_and(|v| v.as_filter_text() == *value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_store::AttributeValue;

    fn road(lanes: i64) -> Feature {
        Feature::new(vec![("lanes".to_string(), AttributeValue::Int(lanes))])
    }

    #[test]
    fn all_rule_matches_everything_under_its_path() {
        let filter = RepositoryFilter::from_ini("[roads]\ntype = all\n").unwrap();
        assert!(filter.filters_path("roads"));
        assert!(filter.matches("roads/road.1", None));
        assert!(filter.matches("roads/highways/h.1", None));
        assert!(!filter.matches("buildings/b.1", None));
        assert!(!filter.matches("roadside/r.1", None));
    }

    #[test]
    fn attribute_rule_checks_feature_values() {
        let filter =
            RepositoryFilter::from_ini("[roads]\ntype = attribute\nfilter = lanes=2\n").unwrap();
        assert!(filter.needs_attributes("roads/road.1"));
        assert!(filter.matches("roads/road.1", Some(&road(2))));
        assert!(!filter.matches("roads/road.1", Some(&road(4))));
        // No attribute data available: the predicate cannot match.
        assert!(!filter.matches("roads/road.1", None));
    }

    #[test]
    fn default_section_applies_to_unlisted_paths() {
        let filter =
            RepositoryFilter::from_ini("[default]\ntype = all\n[roads]\ntype = attribute\nfilter = lanes=2\n")
                .unwrap();
        assert!(filter.matches("buildings/b.1", None));
        assert!(!filter.matches("roads/road.1", Some(&road(4))));
    }

    #[test]
    fn empty_filter_matches_nothing() {
        let filter = RepositoryFilter::empty();
        assert!(!filter.filters_path("roads"));
        assert!(!filter.matches("roads/road.1", None));
    }

    #[test]
    fn unknown_type_is_invalid() {
        let err = RepositoryFilter::from_ini("[roads]\ntype = cql\n").unwrap_err();
        assert!(matches!(err, SyncError::InvalidFilter(_)));
    }

    #[test]
    fn attribute_rule_without_filter_text_is_invalid() {
        let err = RepositoryFilter::from_ini("[roads]\ntype = attribute\n").unwrap_err();
        assert!(matches!(err, SyncError::InvalidFilter(_)));
    }

    #[test]
    fn section_without_type_is_invalid() {
        let err = RepositoryFilter::from_ini("[roads]\nfilter = lanes=2\n").unwrap_err();
        assert!(matches!(err, SyncError::InvalidFilter(_)));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filter.ini");
        std::fs::write(&path, "[roads]\ntype = all\n").unwrap();

        let filter = RepositoryFilter::load(&path).unwrap();
        assert!(filter.matches("roads/road.1", None));
    }
}
