use std::path::PathBuf;

use thiserror::Error;

use crate::object::{Id, Kind};

/// Describes the potential error conditions that might arise from repository operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("object {0} not found")]
    ObjectNotFound(Id),

    #[error("reference `{0}` not found")]
    RefNotFound(String),

    #[error("path `{0}` does not exist in the tree")]
    PathNotFound(String),

    #[error("path component `{0}` is not a tree")]
    NotATree(String),

    #[error("tree {0} not found")]
    TreeNotFound(Id),

    #[error("parent commit {0} not found")]
    ParentNotFound(Id),

    #[error("object {id} is a {actual}, expected a {expected}")]
    UnexpectedKind { id: Id, expected: Kind, actual: Kind },

    /// Stored bytes don't hash to the requested ID, or don't parse as the
    /// object type they claim to be.
    #[error("object {id} is corrupt: {reason}")]
    Corrupt { id: Id, reason: String },

    #[error("index file is corrupt: {0}")]
    CorruptIndex(String),

    /// The index still holds conflicts from a merge.
    #[error("index has unmerged entries: {}", .0.join(", "))]
    UnmergedIndex(Vec<String>),

    #[error("invalid tree entry: {0}")]
    InvalidEntry(String),

    #[error("invalid reference name `{0}`")]
    InvalidRefName(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The reference did not hold the value the caller expected.
    ///
    /// `None` on either side means "the reference does not exist".
    #[error("reference `{name}` changed concurrently (expected {}, found {})",
        fmt_opt_id(.expected), fmt_opt_id(.actual))]
    RefConflict {
        name: String,
        expected: Option<Id>,
        actual: Option<Id>,
    },

    #[error("reference `{0}` is locked by another writer")]
    RefLocked(String),

    #[error("applying stash would conflict with local changes in: {}", .0.join(", "))]
    ApplyConflict(Vec<String>),

    #[error("no local changes to save")]
    NothingToStash,

    #[error("the stash list is empty")]
    EmptyStash,

    #[error("stash@{{{index}}} does not exist; the stash list has {len} entries")]
    StashIndexOutOfRange { index: usize, len: usize },

    #[error("operation cancelled by callback")]
    Cancelled,

    #[error("HEAD does not point to a commit yet")]
    UnbornHead,

    #[error("bad config line {line}: {reason}")]
    BadConfig { line: usize, reason: String },

    #[error("no user identity configured (set user.name and user.email)")]
    MissingIdentity,

    #[error("work_dir/.git should not exist: {0}")]
    GitDirShouldntExist(PathBuf),

    #[error("work_dir doesn't exist: {0}")]
    WorkDirDoesntExist(PathBuf),

    #[error("not a git repository: {0}")]
    GitDirDoesntExist(PathBuf),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

fn fmt_opt_id(id: &Option<Id>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => "<none>".to_string(),
    }
}

/// A specialized `Result` type for repository operations.
pub type Result<T> = std::result::Result<T, Error>;
