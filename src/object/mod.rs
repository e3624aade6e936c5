//! Represents the git concept of an "object" which is a tuple of
//! object type and binary data identified by the hash of the binary data.

mod commit;
pub use commit::Commit;

mod id;
pub use id::{Id, ParseIdError, ID_LEN};

mod kind;
pub use kind::Kind;

pub(crate) mod parse_utils;

mod signature;
pub use signature::Signature;

mod tag;
pub use tag::Tag;

mod tree;
pub use tree::{Tree, TreeEntry};

/// Describes a single object stored (or about to be stored) in a git repository.
///
/// Objects are immutable values. Their identity is the SHA-1 hash of their
/// canonical encoding, so two equal objects always have the same [`Id`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Object {
    Blob(Vec<u8>),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl Object {
    /// Return the kind of the object.
    pub fn kind(&self) -> Kind {
        match self {
            Object::Blob(_) => Kind::Blob,
            Object::Tree(_) => Kind::Tree,
            Object::Commit(_) => Kind::Commit,
            Object::Tag(_) => Kind::Tag,
        }
    }

    /// Serialize the object body in git's canonical format.
    ///
    /// This does not include the `"<kind> <len>\0"` header.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Object::Blob(content) => content.clone(),
            Object::Tree(tree) => tree.encode(),
            Object::Commit(commit) => commit.encode(),
            Object::Tag(tag) => tag.encode(),
        }
    }

    /// Computes the object's ID from its content, size, and type.
    ///
    /// This is functionally equivalent to the
    /// [`git hash-object`](https://git-scm.com/docs/git-hash-object) command
    /// without the `-w` option that would write the object to the repo.
    pub fn id(&self) -> Id {
        Id::hash_object(self.kind().as_str(), &self.encode())
    }

    /// Parse an object body of the given kind.
    ///
    /// The error is a human-readable reason; callers attach the object ID.
    pub fn decode(kind: Kind, body: &[u8]) -> Result<Object, String> {
        match kind {
            Kind::Blob => Ok(Object::Blob(body.to_vec())),
            Kind::Tree => Tree::parse(body).map(Object::Tree),
            Kind::Commit => Commit::parse(body).map(Object::Commit),
            Kind::Tag => Tag::parse(body).map(Object::Tag),
        }
    }

    pub fn into_blob(self) -> Option<Vec<u8>> {
        match self {
            Object::Blob(content) => Some(content),
            _ => None,
        }
    }

    pub fn into_tree(self) -> Option<Tree> {
        match self {
            Object::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn into_commit(self) -> Option<Commit> {
        match self {
            Object::Commit(commit) => Some(commit),
            _ => None,
        }
    }

    pub fn into_tag(self) -> Option<Tag> {
        match self {
            Object::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::path::FileMode;

    #[test]
    fn blob_id() {
        // $ echo 'test content' | git hash-object --stdin
        // d670460b4b4aece5915caf5c68d12f560a9fe3e4

        let o = Object::Blob(b"test content\n".to_vec());
        assert_eq!(o.kind(), Kind::Blob);
        assert_eq!(o.id().to_string(), "d670460b4b4aece5915caf5c68d12f560a9fe3e4");

        let o = Object::Blob(Vec::new());
        assert_eq!(o.id().to_string(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn tree_id() {
        assert_eq!(
            Object::Tree(Tree::empty()).id().to_string(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );

        // $ echo 'test content' > file && git add file && git write-tree
        let blob = Id::from_hex("d670460b4b4aece5915caf5c68d12f560a9fe3e4").unwrap();
        let tree = Tree::new(vec![TreeEntry::new("file", FileMode::Normal, blob)]).unwrap();
        let tree = Object::Tree(tree);

        let decoded = Object::decode(Kind::Tree, &tree.encode()).unwrap();
        assert_eq!(decoded, tree);
        assert_eq!(decoded.id(), tree.id());
    }

    #[test]
    fn commit_id_matches_git() {
        // GIT_AUTHOR_DATE='1234567890 +0000' GIT_COMMITTER_DATE='1234567890 +0000' \
        // GIT_AUTHOR_NAME=A GIT_AUTHOR_EMAIL=a@example.com \
        // GIT_COMMITTER_NAME=A GIT_COMMITTER_EMAIL=a@example.com \
        // git commit-tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904 -m msg
        let sig = Signature::new("A", "a@example.com", 1234567890, 0).unwrap();
        let tree = Object::Tree(Tree::empty()).id();
        let commit = Object::Commit(Commit::new(tree, vec![], sig.clone(), sig, "msg\n"));

        let body = commit.encode();
        let expected = format!(
            "tree {}\nauthor A <a@example.com> 1234567890 +0000\n\
             committer A <a@example.com> 1234567890 +0000\n\nmsg\n",
            tree
        );
        assert_eq!(body, expected.as_bytes());
        assert_eq!(commit.id(), Id::hash_object("commit", expected.as_bytes()));
    }

    #[test]
    fn decode_reports_reason() {
        let err = Object::decode(Kind::Commit, b"nonsense").unwrap_err();
        assert_eq!(err, "missing tree header");
    }

    #[test]
    fn into_accessors() {
        let o = Object::Blob(b"x".to_vec());
        assert!(o.clone().into_tree().is_none());
        assert_eq!(o.into_blob().unwrap(), b"x");
    }
}
