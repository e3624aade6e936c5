//! Represents an abstract git repository.
//!
//! ## Design Goals
//!
//! Repositories may be stored in multiple different mechanisms. A
//! [`Repository`] is assembled from three parts, each behind a trait:
//! an [`ObjectStore`] for content, a [`RefStore`] for references and their
//! logs, and a [`Workdir`] for the working tree and index. Built-in
//! backends keep everything in memory ([`Repository::in_memory`]) or use
//! the same `.git` folder format as command-line git ([`Repository::init`],
//! [`Repository::open`]).
//!
//! The operations on `Repository` are the common "porcelain" and "plumbing"
//! operations for a git repo, regardless of its storage mechanism.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::object::{Id, Signature};
use crate::refs::{FileRefs, Head, MemoryRefs, RefStore, ReflogEntry};
use crate::store::{LooseStore, MemoryStore, ObjectStore};
use crate::workdir::{MemoryWorkdir, OnDiskWorkdir, Workdir};

mod commit;

mod init;

mod tree;
pub use tree::{ResolvedEntry, Snapshot};

/// A git repository: objects, references, working tree and configuration.
///
/// All parts are `Send + Sync`, so a `Repository` can be shared between
/// threads. Concurrent writers coordinate through reference
/// compare-and-swap; see [`Repository::update_ref`].
pub struct Repository {
    objects: Box<dyn ObjectStore>,
    refs: Box<dyn RefStore>,
    workdir: Box<dyn Workdir>,
    config: Config,
    git_dir: Option<PathBuf>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("git_dir", &self.git_dir)
            .finish()
    }
}

impl Repository {
    /// Assemble a repository from its parts.
    pub fn new(
        objects: Box<dyn ObjectStore>,
        refs: Box<dyn RefStore>,
        workdir: Box<dyn Workdir>,
        config: Config,
    ) -> Repository {
        Repository {
            objects,
            refs,
            workdir,
            config,
            git_dir: None,
        }
    }

    /// Create an empty repository that lives only in memory.
    pub fn in_memory() -> Repository {
        Repository::new(
            Box::new(MemoryStore::new()),
            Box::new(MemoryRefs::new()),
            Box::new(MemoryWorkdir::new()),
            Config::new(),
        )
    }

    /// Creates a new, empty git repository on the local file system.
    ///
    /// Analogous to [`git init`](https://git-scm.com/docs/git-init).
    pub fn init(work_dir: &Path) -> Result<Repository> {
        init::create_git_dir(work_dir)?;
        Repository::open(work_dir)
    }

    /// Open an existing on-disk repository.
    ///
    /// `work_dir` should be the top-level working directory. A `.git`
    /// directory should exist at this path.
    pub fn open(work_dir: &Path) -> Result<Repository> {
        let work_dir = work_dir.to_path_buf();
        if !work_dir.exists() {
            return Err(Error::WorkDirDoesntExist(work_dir));
        }

        let git_dir = work_dir.join(".git");
        if !git_dir.is_dir() {
            return Err(Error::GitDirDoesntExist(git_dir));
        }

        let config = Config::load(&git_dir.join("config"))?;

        tracing::debug!(path = %work_dir.display(), "opened repository");

        Ok(Repository {
            objects: Box::new(LooseStore::new(git_dir.join("objects"))),
            refs: Box::new(FileRefs::new(&git_dir)),
            workdir: Box::new(OnDiskWorkdir::new(&work_dir, &git_dir)),
            config,
            git_dir: Some(git_dir),
        })
    }

    /// Return the path to the `.git` directory, if the repository is on disk.
    pub fn git_dir(&self) -> Option<&Path> {
        self.git_dir.as_deref()
    }

    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    pub fn refs(&self) -> &dyn RefStore {
        self.refs.as_ref()
    }

    pub fn workdir(&self) -> &dyn Workdir {
        self.workdir.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access to the in-memory configuration. Changes are not
    /// written back to `.git/config`.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// The configured identity, stamped with the current time.
    pub fn default_signature(&self) -> Result<Signature> {
        self.config.user_signature_now()
    }

    /// Read a reference. `HEAD` is resolved through its branch.
    pub fn read_ref(&self, name: &str) -> Result<Option<Id>> {
        self.refs.read(name)
    }

    /// What `HEAD` points at.
    pub fn head(&self) -> Result<Head> {
        self.refs.head()
    }

    /// Short name of the checked-out branch, or `None` if `HEAD` is detached.
    pub fn head_branch(&self) -> Result<Option<String>> {
        Ok(self.refs.head()?.branch_name().map(str::to_string))
    }

    /// The commit `HEAD` resolves to. Fails with [`Error::UnbornHead`] on a
    /// branch that has no commits yet.
    pub fn head_commit_id(&self) -> Result<Id> {
        self.refs.read("HEAD")?.ok_or(Error::UnbornHead)
    }

    /// Atomically move `name` to `new` if it currently holds `expected_old`
    /// (`None`: if it doesn't exist yet).
    ///
    /// `HEAD` is followed to its branch. The reflog entry is signed with the
    /// configured identity.
    pub fn update_ref(
        &self,
        name: &str,
        new: &Id,
        expected_old: Option<&Id>,
        message: &str,
    ) -> Result<()> {
        let committer = self.default_signature()?;
        self.update_ref_as(name, new, expected_old, &committer, message)
    }

    pub(crate) fn update_ref_as(
        &self,
        name: &str,
        new: &Id,
        expected_old: Option<&Id>,
        committer: &Signature,
        message: &str,
    ) -> Result<()> {
        let target = self.resolve_ref_name(name)?;
        self.refs
            .update(&target, new, expected_old, committer, message)
    }

    /// Delete `name` if it currently holds `expected_old`.
    pub fn delete_ref(&self, name: &str, expected_old: &Id) -> Result<()> {
        let target = self.resolve_ref_name(name)?;
        self.refs.delete(&target, expected_old)
    }

    /// The log of `name`, oldest entry first.
    pub fn reflog(&self, name: &str) -> Result<Vec<ReflogEntry>> {
        self.refs.reflog(name)
    }

    /// Follow `HEAD` to the branch it names; other names are returned as is.
    fn resolve_ref_name(&self, name: &str) -> Result<String> {
        if name == "HEAD" {
            if let Head::Branch(branch) = self.refs.head()? {
                return Ok(branch);
            }
        }

        Ok(name.to_string())
    }
}
