//! The working tree and the staging index.
//!
//! A [`Workdir`] is the part of a repository that is not history: the files
//! a user edits and the index that records what the next commit will hold.
//! Stashing reads both, writes commits from them, and later puts them back.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::object::Id;
use crate::path::FileMode;

mod ignore;
pub use ignore::IgnoreRules;

pub(crate) mod index_file;

mod memory;
pub use memory::MemoryWorkdir;

mod on_disk;
pub use on_disk::OnDiskWorkdir;

/// File system metadata cached in the index so that unchanged files need
/// not be hashed again. All zeros means "unknown".
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StatData {
    pub ctime: (u32, u32),
    pub mtime: (u32, u32),
    pub dev: u32,
    pub ino: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
}

/// A staged file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexEntry {
    mode: FileMode,
    id: Id,
    stat: StatData,
}

impl IndexEntry {
    pub fn new(mode: FileMode, id: Id) -> IndexEntry {
        IndexEntry {
            mode,
            id,
            stat: StatData::default(),
        }
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn stat(&self) -> &StatData {
        &self.stat
    }

    pub(crate) fn with_stat(mut self, stat: StatData) -> IndexEntry {
        self.stat = stat;
        self
    }
}

/// The staging area: a flat map from `/`-separated path to staged blob,
/// kept in git's index order (byte order of the full path).
///
/// Paths left unmerged by a conflicted merge are tracked separately. Staging
/// or removing such a path resolves it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Index {
    entries: BTreeMap<String, IndexEntry>,
    conflicts: BTreeSet<String>,
}

impl Index {
    pub fn new() -> Index {
        Index::default()
    }

    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn insert<S: Into<String>>(&mut self, path: S, entry: IndexEntry) {
        let path = path.into();
        self.conflicts.remove(&path);
        self.entries.insert(path, entry);
    }

    pub fn remove(&mut self, path: &str) -> Option<IndexEntry> {
        self.conflicts.remove(path);
        self.entries.remove(path)
    }

    pub(crate) fn mark_conflicted<S: Into<String>>(&mut self, path: S) {
        self.conflicts.insert(path.into());
    }

    /// Paths that still have unmerged (stage 1-3) entries.
    pub fn conflicts(&self) -> impl Iterator<Item = &str> {
        self.conflicts.iter().map(String::as_str)
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Fails with [`Error::UnmergedIndex`] while any conflict is unresolved.
    ///
    /// [`Error::UnmergedIndex`]: crate::Error::UnmergedIndex
    pub fn check_merged(&self) -> Result<()> {
        if self.conflicts.is_empty() {
            return Ok(());
        }

        Err(Error::UnmergedIndex(self.conflicts.iter().cloned().collect()))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.entries.iter().map(|(path, entry)| (path.as_str(), entry))
    }

    /// Staged paths mapped to mode and blob, the shape tree snapshots take.
    pub fn to_snapshot(&self) -> BTreeMap<String, (FileMode, Id)> {
        self.iter()
            .map(|(path, entry)| (path.to_string(), (entry.mode, entry.id)))
            .collect()
    }

    /// Build an index that stages exactly `snapshot`.
    pub fn from_snapshot(snapshot: &BTreeMap<String, (FileMode, Id)>) -> Index {
        let entries = snapshot
            .iter()
            .map(|(path, (mode, id))| (path.clone(), IndexEntry::new(*mode, *id)))
            .collect();

        Index {
            entries,
            conflicts: BTreeSet::new(),
        }
    }
}

/// Content of a file in the working tree.
///
/// For symbolic links, `content` is the link target.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkFile {
    pub mode: FileMode,
    pub content: Vec<u8>,
}

impl WorkFile {
    /// A regular, non-executable file.
    pub fn normal<C: Into<Vec<u8>>>(content: C) -> WorkFile {
        WorkFile {
            mode: FileMode::Normal,
            content: content.into(),
        }
    }

    /// ID of the blob this file would be stored as.
    pub fn blob_id(&self) -> Id {
        Id::hash_object("blob", &self.content)
    }
}

/// A struct that implements `Workdir` represents a particular mechanism
/// for holding a working tree and its index.
///
/// Paths are always relative to the top of the working tree and use `/`
/// as separator. The `.git` directory is never part of the working tree.
pub trait Workdir: Send + Sync {
    /// Read the index. A missing index is an empty one.
    fn read_index(&self) -> Result<Index>;

    /// Replace the index.
    fn write_index(&self, index: &Index) -> Result<()>;

    /// Every file in the working tree, ignored or not, in path order.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Read a file. Returns `Ok(None)` if there is no file at `path`.
    fn read_file(&self, path: &str) -> Result<Option<WorkFile>>;

    /// Create or overwrite a file, creating parent directories as needed.
    fn write_file(&self, path: &str, file: &WorkFile) -> Result<()>;

    /// Remove a file, and any parent directories left empty by its removal.
    /// Removing a file that doesn't exist is not an error.
    fn remove_file(&self, path: &str) -> Result<()>;

    /// Returns true if `path` is excluded by `.gitignore` or `info/exclude`.
    fn is_ignored(&self, path: &str) -> Result<bool>;
}

/// Gather the ignore rules that apply to `path`: `exclude` first, then each
/// `.gitignore` from the top of the tree down to the file's directory.
pub(crate) fn rules_for<F>(
    path: &str,
    exclude: Option<&str>,
    mut read_gitignore: F,
) -> Result<IgnoreRules>
where
    F: FnMut(&str) -> Result<Option<Vec<u8>>>,
{
    let mut rules = IgnoreRules::new();
    if let Some(exclude) = exclude {
        rules.add_source("", exclude);
    }

    let mut base = String::new();
    let mut dirs = path.split('/').collect::<Vec<_>>();
    dirs.pop();

    for dir in std::iter::once("").chain(dirs) {
        if !dir.is_empty() {
            base.push_str(dir);
            base.push('/');
        }

        if let Some(text) = read_gitignore(&format!("{}.gitignore", base))? {
            rules.add_source(&base, &String::from_utf8_lossy(&text));
        }
    }

    Ok(rules)
}
