//! A git-compatible object store, reference updater and stash engine.
//!
//! The crate models the parts of a git repository needed to create commits
//! and to save, list, apply, pop and drop stashes:
//!
//! * [`object`]: content-addressed blobs, trees, commits and tags.
//! * [`store`]: where those objects live (memory or loose files on disk).
//! * [`refs`]: named references with compare-and-swap updates and reflogs.
//! * [`workdir`]: the working tree and the staging index.
//! * [`repo`]: the [`Repository`] facade tying everything together.
//! * [`stash`]: stash types; the operations themselves are on [`Repository`].
//!
//! The on-disk layout intentionally matches command-line git so that results
//! may be compared for similar operations.

pub mod config;
pub mod error;
pub mod object;
pub mod path;
pub mod refs;
pub mod repo;
pub mod stash;
pub mod store;
pub mod workdir;

pub use config::Config;
pub use error::{Error, Result};
pub use object::{Commit, Id, Kind, Object, Signature, Tag, Tree, TreeEntry};
pub use repo::Repository;

#[cfg(test)]
pub(crate) mod test_support;
