//! Core reference value types and well-known names.

use strata_types::ObjectId;

use crate::error::{RefError, RefResult};

/// The symbolic ref that names the currently checked-out branch.
pub const HEAD: &str = "HEAD";

/// The ref pointing at the root tree of the working copy.
pub const WORK_HEAD: &str = "WORK_HEAD";

/// The ref pointing at the root tree of the staging area.
pub const STAGE_HEAD: &str = "STAGE_HEAD";

/// Prefix of the user refs namespace (branches, tags, remotes).
pub const REFS_PREFIX: &str = "refs/";

/// Prefix of the branch namespace.
pub const HEADS_PREFIX: &str = "refs/heads/";

/// Prefix of the tag namespace.
pub const TAGS_PREFIX: &str = "refs/tags/";

/// Prefix under which each open transaction keeps its private namespace.
pub const TRANSACTIONS_PREFIX: &str = "transactions/";

/// Marker prefix of a serialized symbolic ref value.
const SYMREF_PREFIX: &str = "ref: ";

/// The value a named reference points to.
///
/// Direct refs hold an object id, serialized as 40 hex characters.
/// Symbolic refs hold another reference name, serialized as
/// `ref: <target>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefValue {
    /// A direct ref holding an object id.
    Id(ObjectId),
    /// A symbolic ref naming another reference.
    Symbolic(String),
}

impl RefValue {
    /// Serialize to the stored string form.
    pub fn encode(&self) -> String {
        match self {
            RefValue::Id(id) => id.to_hex(),
            RefValue::Symbolic(target) => format!("{SYMREF_PREFIX}{target}"),
        }
    }

    /// Decode a stored string form.
    pub fn decode(name: &str, value: &str) -> RefResult<Self> {
        if let Some(target) = value.strip_prefix(SYMREF_PREFIX) {
            return Ok(RefValue::Symbolic(target.to_string()));
        }
        let id = ObjectId::from_hex(value).map_err(|_| RefError::MalformedValue {
            name: name.to_string(),
            value: value.to_string(),
        })?;
        Ok(RefValue::Id(id))
    }

    /// Returns `true` if this is a symbolic ref value.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, RefValue::Symbolic(_))
    }

    /// The object id of a direct ref, or `None` for a symbolic ref.
    pub fn as_id(&self) -> Option<ObjectId> {
        match self {
            RefValue::Id(id) => Some(*id),
            RefValue::Symbolic(_) => None,
        }
    }

    /// The target name of a symbolic ref, or `None` for a direct ref.
    pub fn as_target(&self) -> Option<&str> {
        match self {
            RefValue::Id(_) => None,
            RefValue::Symbolic(target) => Some(target),
        }
    }
}
