//! Stashes: the working tree and index saved as commits.
//!
//! A stash is a commit whose first parent is the `HEAD` commit at the time
//! of the save, whose second parent records the index, and whose optional
//! third parent records untracked (and possibly ignored) files. Its tree is
//! the working tree. The stash list is the reflog of `refs/stash`, newest
//! entry first, so `stash@{0}` is always the most recent save.
//!
//! The operations live on [`Repository`](crate::Repository):
//! [`stash_save`], [`enumerate_stashes`], [`stash_list`], [`apply_stash`],
//! [`pop_stash`] and [`drop_stash`].
//!
//! [`stash_save`]: crate::Repository::stash_save
//! [`enumerate_stashes`]: crate::Repository::enumerate_stashes
//! [`stash_list`]: crate::Repository::stash_list
//! [`apply_stash`]: crate::Repository::apply_stash
//! [`pop_stash`]: crate::Repository::pop_stash
//! [`drop_stash`]: crate::Repository::drop_stash

use std::fmt;

use crate::error::Result;
use crate::object::Id;
use crate::path::FileMode;
use crate::workdir::WorkFile;
use crate::Repository;

mod apply;
mod list;
mod save;

/// What [`stash_save`](crate::Repository::stash_save) includes besides
/// tracked changes, and what it leaves behind.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StashFlags {
    /// Leave staged changes in the index and the working tree.
    pub keep_index: bool,

    /// Also stash files that are neither tracked nor ignored.
    pub include_untracked: bool,

    /// Also stash ignored files.
    pub include_ignored: bool,
}

/// How applying a stash treats local changes to the same paths.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CheckoutStrategy {
    /// Refuse to touch a path whose local content differs from both the
    /// stash and its base.
    Safe,

    /// Overwrite local changes with the stashed version.
    Force,
}

impl Default for CheckoutStrategy {
    fn default() -> Self {
        CheckoutStrategy::Safe
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CheckoutOptions {
    pub strategy: CheckoutStrategy,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ApplyOptions {
    /// Restore the stashed index instead of keeping the current one.
    pub reinstate_index: bool,

    pub checkout: CheckoutOptions,
}

/// Phases of [`apply_stash`](crate::Repository::apply_stash), reported in
/// this order.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ApplyProgress {
    LoadingStash,
    AnalyzeIndex,
    AnalyzeModified,
    AnalyzeUntracked,
    CheckoutUntracked,
    CheckoutModified,
    Done,
}

impl fmt::Display for ApplyProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApplyProgress::LoadingStash => "loading stash",
            ApplyProgress::AnalyzeIndex => "analyzing index",
            ApplyProgress::AnalyzeModified => "analyzing modified files",
            ApplyProgress::AnalyzeUntracked => "analyzing untracked files",
            ApplyProgress::CheckoutUntracked => "checking out untracked files",
            ApplyProgress::CheckoutModified => "checking out modified files",
            ApplyProgress::Done => "done",
        };

        f.write_str(name)
    }
}

/// One entry of the stash list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StashEntry {
    index: usize,
    message: String,
    id: Id,
}

impl StashEntry {
    pub(crate) fn new(index: usize, message: &str, id: Id) -> StashEntry {
        StashEntry {
            index,
            message: message.to_string(),
            id,
        }
    }

    /// Position in the stash list; 0 is the most recent.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The reflog message, e.g. `On master: wip`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The message given to [`stash_save`](crate::Repository::stash_save),
    /// without the `On <branch>: ` prefix. Generated `WIP on` messages are
    /// returned whole.
    pub fn user_message(&self) -> &str {
        match self.message.strip_prefix("On ") {
            Some(rest) => match rest.find(": ") {
                Some(pos) => &rest[pos + 2..],
                None => &self.message,
            },
            None => &self.message,
        }
    }

    /// ID of the stash commit.
    pub fn id(&self) -> &Id {
        &self.id
    }
}

impl fmt::Display for StashEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stash@{{{}}}: {}", self.index, self.message)
    }
}

impl Repository {
    /// Write one snapshot entry to the working tree, or remove the file for
    /// `None`. Gitlinks have no content here and are skipped.
    fn checkout_file(&self, path: &str, entry: Option<&(FileMode, Id)>) -> Result<()> {
        match entry {
            None => self.workdir().remove_file(path),
            Some((FileMode::Submodule, _)) => Ok(()),
            Some((mode, id)) => {
                let content = self.lookup_blob(id)?;
                self.workdir()
                    .write_file(path, &WorkFile { mode: *mode, content })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message() {
        let id = Id::from_hex("3cd9329ac53613a0bfa198ae28f3af957e49573c").unwrap();

        let e = StashEntry::new(0, "On master: wip", id);
        assert_eq!(e.user_message(), "wip");
        assert_eq!(e.to_string(), "stash@{0}: On master: wip");

        let e = StashEntry::new(2, "On feature/x: fix: the thing", id);
        assert_eq!(e.user_message(), "fix: the thing");

        let e = StashEntry::new(1, "WIP on master: 3cd9329 first", id);
        assert_eq!(e.user_message(), "WIP on master: 3cd9329 first");
    }

    #[test]
    fn defaults() {
        let opts = ApplyOptions::default();
        assert!(!opts.reinstate_index);
        assert_eq!(opts.checkout.strategy, CheckoutStrategy::Safe);
        assert!(!StashFlags::default().keep_index);
    }

    #[test]
    fn progress_order() {
        assert!(ApplyProgress::LoadingStash < ApplyProgress::AnalyzeIndex);
        assert!(ApplyProgress::CheckoutModified < ApplyProgress::Done);
        assert_eq!(ApplyProgress::AnalyzeUntracked.to_string(), "analyzing untracked files");
    }
}
