//! Ref-name validation.
//!
//! Valid ref names:
//! - Must be non-empty
//! - Must not contain whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` (double dot) or `@{`
//! - Must not start or end with `/` or contain consecutive slashes
//! - Must not end with `.` or `.lock`

use crate::error::{RefError, RefResult};

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

/// Validate a ref name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use strata_refs::names::validate_ref_name;
///
/// assert!(validate_ref_name("refs/heads/main").is_ok());
/// assert!(validate_ref_name("HEAD").is_ok());
/// assert!(validate_ref_name("").is_err());
/// assert!(validate_ref_name("bad..name").is_err());
/// ```
pub fn validate_ref_name(name: &str) -> RefResult<()> {
    if name.is_empty() {
        return Err(RefError::InvalidName {
            name: name.to_string(),
            reason: "ref name must not be empty".into(),
        });
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(RefError::InvalidName {
                name: name.to_string(),
                reason: format!("contains forbidden character: {ch:?}"),
            });
        }
    }

    if name.contains("..") {
        return Err(RefError::InvalidName {
            name: name.to_string(),
            reason: "must not contain '..'".into(),
        });
    }

    if name.contains("@{") {
        return Err(RefError::InvalidName {
            name: name.to_string(),
            reason: "must not contain '@{'".into(),
        });
    }

    if name.starts_with('/') || name.ends_with('/') {
        return Err(RefError::InvalidName {
            name: name.to_string(),
            reason: "must not start or end with '/'".into(),
        });
    }

    if name.contains("//") {
        return Err(RefError::InvalidName {
            name: name.to_string(),
            reason: "must not contain consecutive slashes '//'".into(),
        });
    }

    if name.ends_with('.') || name.ends_with(".lock") {
        return Err(RefError::InvalidName {
            name: name.to_string(),
            reason: "must not end with '.' or '.lock'".into(),
        });
    }

    Ok(())
}
