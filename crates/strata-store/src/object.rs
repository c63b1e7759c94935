use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use strata_types::{ContentHasher, ObjectId};

use crate::error::{StoreError, StoreResult};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// A commit referencing a root tree and its parent commits.
    Commit,
    /// A listing of named entries referencing features and subtrees.
    Tree,
    /// A single geospatial feature's attribute values.
    Feature,
    /// The schema describing a class of features.
    FeatureType,
    /// An annotated, immutable pointer to a commit.
    Tag,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::Tree => write!(f, "tree"),
            Self::Feature => write!(f, "feature"),
            Self::FeatureType => write!(f, "featuretype"),
            Self::Tag => write!(f, "tag"),
        }
    }
}

/// A stored object: kind tag + canonical serialized data.
///
/// `StoredObject` is the unit of storage. The store never interprets the
/// data beyond the kind tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The canonical serialized bytes of the object.
    pub data: Vec<u8>,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// Compute the content-addressed id for this object.
    ///
    /// Uses the domain-separated hasher for the object's kind, so objects
    /// of different kinds never collide.
    pub fn compute_id(&self) -> ObjectId {
        let hasher = match self.kind {
            ObjectKind::Commit => &ContentHasher::COMMIT,
            ObjectKind::Tree => &ContentHasher::TREE,
            ObjectKind::Feature => &ContentHasher::FEATURE,
            ObjectKind::FeatureType => &ContentHasher::FEATURE_TYPE,
            ObjectKind::Tag => &ContentHasher::TAG,
        };
        hasher.hash(&self.data)
    }
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: for<'de> Deserialize<'de>>(obj: &StoredObject, kind: ObjectKind) -> StoreResult<T> {
    if obj.kind != kind {
        return Err(StoreError::CorruptObject {
            id: obj.compute_id(),
            reason: format!("expected {kind}, got {}", obj.kind),
        });
    }
    serde_json::from_slice(&obj.data).map_err(|e| StoreError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Author or committer identification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Timezone offset in minutes from UTC.
    pub tz_offset: i32,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            timestamp,
            tz_offset: 0,
        }
    }
}

/// A commit: a root tree, ordered parents, authorship, and a message.
///
/// The first parent is the **mainline** parent, used as the base when
/// computing the changes a commit introduces. The commit's id is the hash
/// of its canonical encoding; rewriting any field yields a different id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Root of the versioned feature tree.
    pub tree: ObjectId,
    /// Parent commit ids; empty for a root commit.
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl Commit {
    /// The mainline (first) parent, if any.
    pub fn mainline_parent(&self) -> Option<ObjectId> {
        self.parents.first().copied()
    }

    /// Returns `true` if this commit has no parents.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// The content-addressed id of this commit.
    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.compute_id())
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        Ok(StoredObject::new(ObjectKind::Commit, encode(self)?))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        decode(obj, ObjectKind::Commit)
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// What a tree entry points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// A feature object.
    Feature,
    /// A subtree object.
    Tree,
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Entry name (feature id or subtree name).
    pub name: String,
    /// Whether the entry is a feature or a subtree.
    pub kind: EntryKind,
    /// Content-addressed id of the referenced object.
    pub id: ObjectId,
    /// Id of the feature type the entry conforms to; NULL when inherited.
    pub metadata: ObjectId,
}

impl TreeEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind, id: ObjectId, metadata: ObjectId) -> Self {
        Self {
            name: name.into(),
            kind,
            id,
            metadata,
        }
    }

    /// A feature entry.
    pub fn feature(name: impl Into<String>, id: ObjectId, metadata: ObjectId) -> Self {
        Self::new(name, EntryKind::Feature, id, metadata)
    }

    /// A subtree entry.
    pub fn subtree(name: impl Into<String>, id: ObjectId, metadata: ObjectId) -> Self {
        Self::new(name, EntryKind::Tree, id, metadata)
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

/// A content-addressed set of named entries.
///
/// Entries are kept sorted by name so the canonical encoding — and hence
/// the tree's id — is deterministic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a new tree with the given entries, sorted by name.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The content-addressed id of this tree.
    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.compute_id())
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        Ok(StoredObject::new(ObjectKind::Tree, encode(self)?))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        decode(obj, ObjectKind::Tree)
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The distinguished id of the empty tree.
///
/// Every root commit's base tree, and every tree from which all entries
/// have been removed, resolves to this fixed id.
pub fn empty_tree_id() -> ObjectId {
    static EMPTY_TREE_ID: OnceLock<ObjectId> = OnceLock::new();
    *EMPTY_TREE_ID.get_or_init(|| {
        Tree::empty()
            .to_stored_object()
            .expect("empty tree canonical encoding")
            .compute_id()
    })
}

// ---------------------------------------------------------------------------
// Feature
// ---------------------------------------------------------------------------

/// The value of a single feature attribute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// A point geometry in the feature's reference system.
    Point {
        x: f64,
        y: f64,
    },
}

impl AttributeValue {
    /// Text form used when matching attribute filters.
    pub fn as_filter_text(&self) -> String {
        match self {
            AttributeValue::Null => "null".to_string(),
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::Int(i) => i.to_string(),
            AttributeValue::Float(f) => f.to_string(),
            AttributeValue::Text(s) => s.clone(),
            AttributeValue::Point { x, y } => format!("POINT({x} {y})"),
        }
    }
}

/// A geospatial feature: an ordered set of named attribute values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub attributes: Vec<(String, AttributeValue)>,
}

impl Feature {
    pub fn new(attributes: Vec<(String, AttributeValue)>) -> Self {
        Self { attributes }
    }

    /// Look up an attribute value by name.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// The content-addressed id of this feature.
    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.compute_id())
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        Ok(StoredObject::new(ObjectKind::Feature, encode(self)?))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        decode(obj, ObjectKind::Feature)
    }
}

// ---------------------------------------------------------------------------
// FeatureType
// ---------------------------------------------------------------------------

/// One property of a feature type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    /// The kind of value the property holds ("int", "float", "text",
    /// "bool", "point").
    pub value_kind: String,
}

/// The schema a class of features conforms to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureType {
    pub name: String,
    pub properties: Vec<PropertyDescriptor>,
}

impl FeatureType {
    pub fn new(name: impl Into<String>, properties: Vec<PropertyDescriptor>) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }

    /// The content-addressed id of this feature type.
    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.compute_id())
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        Ok(StoredObject::new(ObjectKind::FeatureType, encode(self)?))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        decode(obj, ObjectKind::FeatureType)
    }
}

// ---------------------------------------------------------------------------
// Tag
// ---------------------------------------------------------------------------

/// An annotated, immutable pointer to a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagObject {
    pub name: String,
    pub target: ObjectId,
    pub tagger: Signature,
    pub message: String,
}

impl TagObject {
    /// The content-addressed id of this tag.
    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(self.to_stored_object()?.compute_id())
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        Ok(StoredObject::new(ObjectKind::Tag, encode(self)?))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        decode(obj, ObjectKind::Tag)
    }
}
