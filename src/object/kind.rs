use std::fmt::{self, Display, Formatter};

/// Describes the fundamental git object type (blob, tree, commit, or tag).
///
/// We use the word `kind` here to avoid conflict with the Rust reserved word `type`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Kind {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl Kind {
    /// Parse the type name used in object headers and tag `type` lines.
    pub fn from_bytes(name: &[u8]) -> Option<Kind> {
        match name {
            b"blob" => Some(Kind::Blob),
            b"tree" => Some(Kind::Tree),
            b"commit" => Some(Kind::Commit),
            b"tag" => Some(Kind::Tag),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Blob => "blob",
            Kind::Tree => "tree",
            Kind::Commit => "commit",
            Kind::Tag => "tag",
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_string() {
        assert_eq!(Kind::Blob.to_string(), "blob");
        assert_eq!(Kind::Commit.to_string(), "commit");
        assert_eq!(Kind::Tree.to_string(), "tree");
        assert_eq!(Kind::Tag.to_string(), "tag");
    }

    #[test]
    fn from_bytes() {
        assert_eq!(Kind::from_bytes(b"tree"), Some(Kind::Tree));
        assert_eq!(Kind::from_bytes(b"tag"), Some(Kind::Tag));
        assert_eq!(Kind::from_bytes(b"Tree"), None);
        assert_eq!(Kind::from_bytes(b"arbitrary"), None);
    }
}
