//! Building, walking and flattening trees.

use std::collections::BTreeMap;

use super::Repository;
use crate::error::{Error, Result};
use crate::object::{Commit, Id, Kind, Object, Tag, Tree, TreeEntry};
use crate::path::FileMode;

/// A whole tree flattened to `path → (mode, blob)`, one item per file.
pub type Snapshot = BTreeMap<String, (FileMode, Id)>;

/// A tree entry found by path, along with the ID of the tree that holds it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedEntry {
    entry: TreeEntry,
    tree: Id,
}

impl ResolvedEntry {
    pub fn entry(&self) -> &TreeEntry {
        &self.entry
    }

    /// ID of the tree that directly contains the entry.
    pub fn tree(&self) -> &Id {
        &self.tree
    }

    pub fn into_entry(self) -> TreeEntry {
        self.entry
    }
}

impl Repository {
    /// Validate, sort and store a tree made of `entries`.
    ///
    /// Fails with [`Error::InvalidEntry`] on an empty, reserved or duplicate
    /// name.
    pub fn build_tree(&self, entries: Vec<TreeEntry>) -> Result<Id> {
        let tree = Tree::new(entries)?;
        self.objects.put(&Object::Tree(tree))
    }

    /// Read an object and check its kind.
    fn lookup(&self, id: &Id, expected: Kind) -> Result<Object> {
        let object = self.objects.get(id)?;
        if object.kind() == expected {
            Ok(object)
        } else {
            Err(unexpected(id, expected, &object))
        }
    }

    pub fn lookup_tree(&self, id: &Id) -> Result<Tree> {
        match self.objects.get(id)? {
            Object::Tree(tree) => Ok(tree),
            other => Err(unexpected(id, Kind::Tree, &other)),
        }
    }

    pub fn lookup_commit(&self, id: &Id) -> Result<Commit> {
        match self.objects.get(id)? {
            Object::Commit(commit) => Ok(commit),
            other => Err(unexpected(id, Kind::Commit, &other)),
        }
    }

    pub fn lookup_tag(&self, id: &Id) -> Result<Tag> {
        match self.objects.get(id)? {
            Object::Tag(tag) => Ok(tag),
            other => Err(unexpected(id, Kind::Tag, &other)),
        }
    }

    pub fn lookup_blob(&self, id: &Id) -> Result<Vec<u8>> {
        match self.objects.get(id)? {
            Object::Blob(content) => Ok(content),
            other => Err(unexpected(id, Kind::Blob, &other)),
        }
    }

    /// Find the entry at a `/`-separated `path` below `tree`.
    ///
    /// Fails with [`Error::PathNotFound`] if a component is missing and
    /// [`Error::NotATree`] if a component before the last isn't a directory.
    pub fn resolve_entry(&self, tree: &Id, path: &str) -> Result<ResolvedEntry> {
        let mut components = path.split('/').peekable();
        let mut tree_id = *tree;
        let mut current = self.lookup_tree(tree)?;
        let mut walked = String::new();

        while let Some(name) = components.next() {
            if !walked.is_empty() {
                walked.push('/');
            }
            walked.push_str(name);

            let entry = current
                .get(name)
                .cloned()
                .ok_or_else(|| Error::PathNotFound(walked.clone()))?;

            if components.peek().is_none() {
                return Ok(ResolvedEntry {
                    entry,
                    tree: tree_id,
                });
            }

            if entry.kind() != Kind::Tree {
                return Err(Error::NotATree(walked));
            }

            tree_id = *entry.id();
            current = self.lookup_tree(&tree_id)?;
        }

        Err(Error::PathNotFound(path.to_string()))
    }

    /// Read the object a tree entry points at.
    pub fn entry_to_object(&self, entry: &TreeEntry) -> Result<Object> {
        self.lookup(entry.id(), entry.kind())
    }

    /// Flatten a tree into one item per file, recursing into subtrees.
    pub fn flatten_tree(&self, tree: &Id) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();
        self.flatten_into(tree, "", &mut snapshot)?;
        Ok(snapshot)
    }

    fn flatten_into(&self, tree: &Id, prefix: &str, snapshot: &mut Snapshot) -> Result<()> {
        for entry in self.lookup_tree(tree)?.entries() {
            let path = format!("{}{}", prefix, entry.name());
            if entry.mode() == FileMode::Tree {
                self.flatten_into(entry.id(), &format!("{}/", path), snapshot)?;
            } else {
                snapshot.insert(path, (entry.mode(), *entry.id()));
            }
        }

        Ok(())
    }

    /// Store the nested trees that hold exactly the files in `snapshot` and
    /// return the ID of the top one. The inverse of [`flatten_tree`].
    ///
    /// [`flatten_tree`]: Repository::flatten_tree
    pub fn write_snapshot(&self, snapshot: &Snapshot) -> Result<Id> {
        let files: Vec<(&str, FileMode, Id)> = snapshot
            .iter()
            .map(|(path, (mode, id))| (path.as_str(), *mode, *id))
            .collect();

        self.write_level(&files)
    }

    fn write_level(&self, files: &[(&str, FileMode, Id)]) -> Result<Id> {
        let mut entries = Vec::new();
        let mut dirs: BTreeMap<&str, Vec<(&str, FileMode, Id)>> = BTreeMap::new();

        for (path, mode, id) in files {
            match path.split_once('/') {
                Some((dir, rest)) => dirs.entry(dir).or_default().push((rest, *mode, *id)),
                None => entries.push(TreeEntry::new(*path, *mode, *id)),
            }
        }

        for (dir, files) in dirs {
            let id = self.write_level(&files)?;
            entries.push(TreeEntry::new(dir, FileMode::Tree, id));
        }

        self.build_tree(entries)
    }
}

fn unexpected(id: &Id, expected: Kind, actual: &Object) -> Error {
    Error::UnexpectedKind {
        id: *id,
        expected,
        actual: actual.kind(),
    }
}
