use std::cmp::Ordering;
use std::collections::HashSet;

use super::{Id, Kind, ID_LEN};
use crate::error::{Error, Result};
use crate::path::{check_name, tree_order, FileMode};

/// A single named entry within a [`Tree`].
///
/// The entry refers to its object by ID only; the object itself lives in
/// the object store.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TreeEntry {
    name: String,
    mode: FileMode,
    id: Id,
}

impl TreeEntry {
    pub fn new<S: Into<String>>(name: S, mode: FileMode, id: Id) -> TreeEntry {
        TreeEntry {
            name: name.into(),
            mode,
            id,
        }
    }

    /// Create an entry from raw Unix mode bits, as handed over by callers
    /// that don't speak [`FileMode`].
    ///
    /// Fails with [`Error::InvalidEntry`] if git doesn't recognize the mode.
    pub fn with_mode_bits<S: Into<String>>(name: S, mode: u32, id: Id) -> Result<TreeEntry> {
        let name = name.into();
        match FileMode::from_value(mode) {
            Some(mode) => Ok(TreeEntry::new(name, mode, id)),
            None => Err(Error::InvalidEntry(format!(
                "unsupported mode {:o} for `{}`",
                mode, name
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// The type of object that this entry points at.
    pub fn kind(&self) -> Kind {
        self.mode.kind()
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    fn order(&self, other: &TreeEntry) -> Ordering {
        tree_order(
            (self.name.as_bytes(), self.mode),
            (other.name.as_bytes(), other.mode),
        )
    }
}

/// An ordered list of entries describing one directory level.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Build a tree from entries in any order.
    ///
    /// Names are validated and must be unique; entries are sorted into
    /// git's canonical order.
    pub fn new(mut entries: Vec<TreeEntry>) -> Result<Tree> {
        {
            let mut seen = HashSet::with_capacity(entries.len());

            for entry in &entries {
                if let Err(err) = check_name(entry.name.as_bytes()) {
                    return Err(Error::InvalidEntry(format!("`{}`: {}", entry.name, err)));
                }

                if !seen.insert(entry.name.as_str()) {
                    return Err(Error::InvalidEntry(format!(
                        "duplicate name `{}`",
                        entry.name
                    )));
                }
            }
        }

        entries.sort_by(|a, b| a.order(b));
        Ok(Tree { entries })
    }

    /// The empty tree.
    pub fn empty() -> Tree {
        Tree::default()
    }

    /// Entries in canonical order.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry with the given name at this level.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.entries.len() * (ID_LEN + 32));

        for entry in &self.entries {
            body.extend_from_slice(entry.mode.to_octal().as_bytes());
            body.push(b' ');
            body.extend_from_slice(entry.name.as_bytes());
            body.push(0);
            body.extend_from_slice(entry.id.as_bytes());
        }

        body
    }

    /// Parse the body of a tree object.
    ///
    /// Entries are kept in the order they were stored so that re-encoding
    /// reproduces the original bytes.
    pub(crate) fn parse(mut body: &[u8]) -> std::result::Result<Tree, String> {
        let mut entries = Vec::new();

        while !body.is_empty() {
            let space = body
                .iter()
                .position(|b| *b == b' ')
                .ok_or("truncated entry mode")?;

            let mode = FileMode::from_octal_slice(&body[..space])
                .ok_or_else(|| format!("bad mode `{}`", String::from_utf8_lossy(&body[..space])))?;
            body = &body[space + 1..];

            let nul = body
                .iter()
                .position(|b| *b == 0)
                .ok_or("truncated entry name")?;

            let name = std::str::from_utf8(&body[..nul])
                .map_err(|_| "entry name is not UTF-8".to_string())?
                .to_string();
            body = &body[nul + 1..];

            if body.len() < ID_LEN {
                return Err("truncated entry ID".to_string());
            }

            let id = Id::new(&body[..ID_LEN]).map_err(|e| e.to_string())?;
            body = &body[ID_LEN..];

            entries.push(TreeEntry { name, mode, id });
        }

        Ok(Tree { entries })
    }
}
