use crate::object::ObjectId;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"strata-commit-v1"`) that is
/// prepended to every hash computation. This prevents cross-type hash
/// collisions: a feature and a tag with identical bytes produce different
/// ids. The 256-bit digest is truncated to the 160-bit [`ObjectId`] width.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for commit objects.
    pub const COMMIT: Self = Self {
        domain: "strata-commit-v1",
    };
    /// Hasher for tree objects.
    pub const TREE: Self = Self {
        domain: "strata-tree-v1",
    };
    /// Hasher for feature objects.
    pub const FEATURE: Self = Self {
        domain: "strata-feature-v1",
    };
    /// Hasher for feature-type objects.
    pub const FEATURE_TYPE: Self = Self {
        domain: "strata-featuretype-v1",
    };
    /// Hasher for tag objects.
    pub const TAG: Self = Self {
        domain: "strata-tag-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        let digest = hasher.finalize();
        let mut truncated = [0u8; 20];
        truncated.copy_from_slice(&digest.as_bytes()[..20]);
        ObjectId::from_raw(truncated)
    }

    /// Verify that data produces the expected object ID.
    pub fn verify(&self, data: &[u8], expected: &ObjectId) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
