use strata_types::ObjectId;

/// A resolved reference: a name and the commit id it points to.
///
/// Used for both sides of replication — the remote ref a fetch starts
/// from, and the local ref a push publishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedRef {
    pub name: String,
    pub id: ObjectId,
}

impl NamedRef {
    pub fn new(name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::ContentHasher;

    #[test]
    fn construction() {
        let id = ContentHasher::COMMIT.hash(b"tip");
        let r = NamedRef::new("refs/heads/master", id);
        assert_eq!(r.name, "refs/heads/master");
        assert_eq!(r.id, id);
    }
}
