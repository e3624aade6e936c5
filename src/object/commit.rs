use super::parse_utils::{header, split_headers};
use super::{Id, Signature};

/// A commit: a tree snapshot plus its place in history.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Commit {
    tree: Id,
    parents: Vec<Id>,
    author: Signature,
    committer: Signature,
    extra_headers: Vec<u8>,
    message: String,
}

impl Commit {
    pub fn new(
        tree: Id,
        parents: Vec<Id>,
        author: Signature,
        committer: Signature,
        message: &str,
    ) -> Commit {
        Commit {
            tree,
            parents,
            author,
            committer,
            extra_headers: Vec::new(),
            message: message.to_string(),
        }
    }

    pub fn tree(&self) -> &Id {
        &self.tree
    }

    pub fn parents(&self) -> &[Id] {
        &self.parents
    }

    pub fn author(&self) -> &Signature {
        &self.author
    }

    pub fn committer(&self) -> &Signature {
        &self.committer
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The first line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(256 + self.message.len());

        push_header(&mut body, "tree", &self.tree.to_string());
        for parent in &self.parents {
            push_header(&mut body, "parent", &parent.to_string());
        }
        push_header(&mut body, "author", &self.author.to_string());
        push_header(&mut body, "committer", &self.committer.to_string());

        // Headers we don't interpret (encoding, gpgsig, mergetag ...) are
        // carried through byte-for-byte so the ID is preserved.
        body.extend_from_slice(&self.extra_headers);

        body.push(b'\n');
        body.extend_from_slice(self.message.as_bytes());
        body
    }

    pub(crate) fn parse(body: &[u8]) -> Result<Commit, String> {
        let (lines, message) = split_headers(body);
        let mut lines = lines.into_iter().peekable();

        let tree = lines
            .next()
            .and_then(|line| header(line, b"tree"))
            .ok_or("missing tree header")?;
        let tree = Id::from_hex(tree).map_err(|e| format!("bad tree ID: {}", e))?;

        let mut parents = Vec::new();
        while let Some(parent) = lines.peek().copied().and_then(|line| header(line, b"parent")) {
            parents.push(Id::from_hex(parent).map_err(|e| format!("bad parent ID: {}", e))?);
            lines.next();
        }

        let author = lines
            .next()
            .and_then(|line| header(line, b"author"))
            .and_then(Signature::parse)
            .ok_or("missing or malformed author")?;

        let committer = lines
            .next()
            .and_then(|line| header(line, b"committer"))
            .and_then(Signature::parse)
            .ok_or("missing or malformed committer")?;

        let mut extra_headers = Vec::new();
        for line in lines {
            extra_headers.extend_from_slice(line);
            extra_headers.push(b'\n');
        }

        let message = String::from_utf8(message.to_vec())
            .map_err(|_| "commit message is not UTF-8".to_string())?;

        Ok(Commit {
            tree,
            parents,
            author,
            committer,
            extra_headers,
            message,
        })
    }
}

pub(crate) fn push_header(body: &mut Vec<u8>, name: &str, value: &str) {
    body.extend_from_slice(name.as_bytes());
    body.push(b' ');
    body.extend_from_slice(value.as_bytes());
    body.push(b'\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig() -> Signature {
        Signature::new("A. U. Thor", "author@localhost", 1222757360, -450).unwrap()
    }

    const TREE: &str = "be9bfa841874ccc9f2ef7c48d0c76226f89b7189";

    #[test]
    fn encodes_git_layout() {
        let tree = Id::from_hex(TREE).unwrap();
        let c = Commit::new(tree, vec![tree], sig(), sig(), "subject\n\nbody\n");

        let expected = format!(
            "tree {t}\n\
             parent {t}\n\
             author A. U. Thor <author@localhost> 1222757360 -0730\n\
             committer A. U. Thor <author@localhost> 1222757360 -0730\n\
             \n\
             subject\n\nbody\n",
            t = TREE
        );

        assert_eq!(String::from_utf8(c.encode()).unwrap(), expected);
        assert_eq!(c.summary(), "subject");
        assert_eq!(Commit::parse(expected.as_bytes()).unwrap(), c);
    }

    #[test]
    fn preserves_unknown_headers() {
        let raw = format!(
            "tree {t}\n\
             author A <a@example.com> 0 +0000\n\
             committer A <a@example.com> 0 +0000\n\
             encoding ISO-8859-1\n\
             gpgsig -----BEGIN PGP SIGNATURE-----\n \n -----END PGP SIGNATURE-----\n\
             \n\
             msg",
            t = TREE
        );

        let c = Commit::parse(raw.as_bytes()).unwrap();
        assert!(c.parents().is_empty());
        assert_eq!(c.message(), "msg");
        assert_eq!(c.encode(), raw.as_bytes());
    }

    #[test]
    fn old_style_signatures_keep_their_id() {
        let raw = format!(
            "tree {t}\n\
             author A <a@x> 0 -0000\n\
             committer A<a@x> 1222757360\n\
             \n\
             m\n",
            t = TREE
        );

        let c = Commit::parse(raw.as_bytes()).unwrap();
        assert_eq!(c.author().tz_offset(), 0);
        assert_eq!(c.committer().name(), "A");
        assert_eq!(c.committer().timestamp(), 0);
        assert_eq!(c.encode(), raw.as_bytes());
    }

    #[test]
    fn rejects_malformed() {
        assert!(Commit::parse(b"").is_err());
        assert!(Commit::parse(b"parent be9bfa841874ccc9f2ef7c48d0c76226f89b7189\n").is_err());

        let no_committer = format!("tree {}\nauthor <> 0 +0000\n\nmsg", TREE);
        assert!(Commit::parse(no_committer.as_bytes()).is_err());

        let bad_parent = format!(
            "tree {}\nparent zzz\nauthor <> 0 +0000\ncommitter <> 0 +0000\n\n",
            TREE
        );
        assert!(Commit::parse(bad_parent.as_bytes()).is_err());
    }
}
