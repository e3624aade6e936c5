use std::ops::ControlFlow;

use super::{ApplyOptions, ApplyProgress, StashEntry};
use crate::error::{Error, Result};
use crate::object::Id;
use crate::refs::{check_expected, ReflogEntry, STASH_REF};
use crate::Repository;

impl Repository {
    /// Visit the stash list from the most recent entry to the oldest.
    ///
    /// The list is read afresh on every call. Returning
    /// `ControlFlow::Break` from `visitor` stops the walk early; that is not
    /// an error.
    pub fn enumerate_stashes<F>(&self, mut visitor: F) -> Result<()>
    where
        F: FnMut(&StashEntry) -> ControlFlow<()>,
    {
        let log = self.reflog(STASH_REF)?;

        for (index, entry) in log.iter().rev().enumerate() {
            let stash = StashEntry::new(index, entry.message(), *entry.new_id());
            if visitor(&stash).is_break() {
                break;
            }
        }

        Ok(())
    }

    /// The whole stash list, most recent first.
    pub fn stash_list(&self) -> Result<Vec<StashEntry>> {
        let mut stashes = Vec::new();
        self.enumerate_stashes(|stash| {
            stashes.push(stash.clone());
            ControlFlow::Continue(())
        })?;
        Ok(stashes)
    }

    /// Remove the stash at `index` from the list and return its ID. Later
    /// (older) entries move up by one.
    ///
    /// Fails with [`Error::RefConflict`] if another writer changed the list
    /// after it was read here. Nothing is removed in that case; read the
    /// list again and retry.
    pub fn drop_stash(&self, index: usize) -> Result<Id> {
        self.drop_stash_checked(index, None)
    }

    /// [`apply_stash`](Repository::apply_stash), then drop the entry if the
    /// apply succeeded.
    ///
    /// The drop only goes ahead if `stash@{index}` is still the stash that
    /// was applied; otherwise it fails with [`Error::RefConflict`] and the
    /// list is left alone, with the working tree already updated.
    pub fn pop_stash<F>(&self, index: usize, options: &ApplyOptions, progress: F) -> Result<()>
    where
        F: FnMut(ApplyProgress) -> ControlFlow<()>,
    {
        let applied = self.apply_stash_at(index, options, progress)?;
        self.drop_stash_checked(index, Some(&applied))?;
        Ok(())
    }

    /// ID of the stash at `index`.
    pub(super) fn stash_id_at(&self, index: usize) -> Result<Id> {
        let log = self.reflog(STASH_REF)?;
        let pos = position(&log, index)?;
        Ok(*log[pos].new_id())
    }

    fn drop_stash_checked(&self, index: usize, expected: Option<&Id>) -> Result<Id> {
        let read = self.reflog(STASH_REF)?;
        let pos = position(&read, index)?;
        let mut log = read.clone();

        if let Some(expected) = expected {
            check_expected(
                &format!("stash@{{{}}}", index),
                Some(expected),
                Some(log[pos].new_id()),
            )?;
        }

        let removed = log.remove(pos);

        // The entry that was pushed right after the removed one now follows
        // whatever came before it.
        if pos < log.len() {
            let next = log.remove(pos).with_old(removed.old().copied());
            log.insert(pos, next);
        }

        self.refs().rewrite_reflog(STASH_REF, &read, log)?;

        tracing::info!(index, id = %removed.new_id(), "dropped stash");

        Ok(*removed.new_id())
    }
}

/// Position in the oldest-first reflog of stash `index`.
fn position(log: &[ReflogEntry], index: usize) -> Result<usize> {
    if log.is_empty() {
        return Err(Error::EmptyStash);
    }

    if index >= log.len() {
        return Err(Error::StashIndexOutOfRange {
            index,
            len: log.len(),
        });
    }

    Ok(log.len() - 1 - index)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::stash::StashFlags;
    use crate::test_support::{commit_files, read, sig, test_repo, write};

    fn save(repo: &Repository, content: &str, message: &str) -> Id {
        write(repo, "a.txt", content);
        repo.stash_save(Some(&sig()), Some(message), StashFlags::default())
            .unwrap()
    }

    fn messages(repo: &Repository) -> Vec<String> {
        repo.stash_list()
            .unwrap()
            .iter()
            .map(|s| s.user_message().to_string())
            .collect()
    }

    #[test]
    fn newest_first() {
        let repo = test_repo();
        commit_files(&repo, &[("a.txt", "0\n")], "first\n");

        let s1 = save(&repo, "1\n", "one");
        let s2 = save(&repo, "2\n", "two");
        let s3 = save(&repo, "3\n", "three");

        let list = repo.stash_list().unwrap();
        let ids: Vec<_> = list.iter().map(|s| *s.id()).collect();
        assert_eq!(ids, vec![s3, s2, s1]);

        let indexes: Vec<_> = list.iter().map(|s| s.index()).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(messages(&repo), vec!["three", "two", "one"]);
    }

    #[test]
    fn enumeration_stops_early() {
        let repo = test_repo();
        commit_files(&repo, &[("a.txt", "0\n")], "first\n");
        save(&repo, "1\n", "one");
        save(&repo, "2\n", "two");

        let mut seen = Vec::new();
        repo.enumerate_stashes(|stash| {
            seen.push(stash.index());
            ControlFlow::Break(())
        })
        .unwrap();

        assert_eq!(seen, vec![0]);
    }

    #[test]
    fn drop_middle() {
        let repo = test_repo();
        commit_files(&repo, &[("a.txt", "0\n")], "first\n");

        let s1 = save(&repo, "1\n", "one");
        let s2 = save(&repo, "2\n", "two");
        let s3 = save(&repo, "3\n", "three");

        assert_eq!(repo.drop_stash(1).unwrap(), s2);
        assert_eq!(messages(&repo), vec!["three", "one"]);

        let log = repo.reflog(STASH_REF).unwrap();
        assert_eq!(log[0].old(), None);
        assert_eq!(log[1].old(), Some(&s1));
        assert_eq!(log[1].new_id(), &s3);
        assert_eq!(repo.read_ref(STASH_REF).unwrap(), Some(s3));
    }

    #[test]
    fn drop_newest_moves_ref() {
        let repo = test_repo();
        commit_files(&repo, &[("a.txt", "0\n")], "first\n");

        let s1 = save(&repo, "1\n", "one");
        save(&repo, "2\n", "two");

        repo.drop_stash(0).unwrap();
        assert_eq!(repo.read_ref(STASH_REF).unwrap(), Some(s1));

        repo.drop_stash(0).unwrap();
        assert_eq!(repo.read_ref(STASH_REF).unwrap(), None);
        assert!(repo.stash_list().unwrap().is_empty());

        let err = repo.drop_stash(0).unwrap_err();
        assert!(matches!(err, Error::EmptyStash), "wrong error: {:?}", err);
    }

    #[test]
    fn drop_out_of_range() {
        let repo = test_repo();
        commit_files(&repo, &[("a.txt", "0\n")], "first\n");
        save(&repo, "1\n", "one");

        let err = repo.drop_stash(5).unwrap_err();
        assert!(
            matches!(err, Error::StashIndexOutOfRange { index: 5, len: 1 }),
            "wrong error: {:?}",
            err
        );
        assert_eq!(repo.stash_list().unwrap().len(), 1);
    }

    #[test]
    fn pop_applies_then_drops() {
        let repo = test_repo();
        commit_files(&repo, &[("a.txt", "0\n")], "first\n");
        save(&repo, "1\n", "one");
        save(&repo, "2\n", "two");

        repo.pop_stash(1, &ApplyOptions::default(), |_| ControlFlow::Continue(()))
            .unwrap();

        assert_eq!(read(&repo, "a.txt").unwrap(), "1\n");
        assert_eq!(messages(&repo), vec!["two"]);
    }

    #[test]
    fn pop_completes_despite_late_cancel() {
        let repo = test_repo();
        commit_files(&repo, &[("a.txt", "0\n")], "first\n");
        save(&repo, "1\n", "one");

        repo.pop_stash(0, &ApplyOptions::default(), |phase| match phase {
            ApplyProgress::Done => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        })
        .unwrap();

        assert_eq!(read(&repo, "a.txt").unwrap(), "1\n");
        assert!(messages(&repo).is_empty());
    }

    #[test]
    fn failed_pop_keeps_entry() {
        let repo = test_repo();
        commit_files(&repo, &[("a.txt", "0\n")], "first\n");
        save(&repo, "1\n", "one");

        write(&repo, "a.txt", "local\n");
        let err = repo
            .pop_stash(0, &ApplyOptions::default(), |_| ControlFlow::Continue(()))
            .unwrap_err();
        assert!(matches!(err, Error::ApplyConflict(_)), "wrong error: {:?}", err);
        assert_eq!(messages(&repo), vec!["one"]);

        write(&repo, "a.txt", "0\n");
        let err = repo
            .pop_stash(0, &ApplyOptions::default(), |_| ControlFlow::Break(()))
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled), "wrong error: {:?}", err);
        assert_eq!(messages(&repo), vec!["one"]);
    }

    #[test]
    fn drop_checks_applied_id() {
        let repo = test_repo();
        commit_files(&repo, &[("a.txt", "0\n")], "first\n");
        let s1 = save(&repo, "1\n", "one");
        let s2 = save(&repo, "2\n", "two");

        let err = repo.drop_stash_checked(0, Some(&s1)).unwrap_err();
        match err {
            Error::RefConflict {
                expected, actual, ..
            } => {
                assert_eq!(expected, Some(s1));
                assert_eq!(actual, Some(s2));
            }
            err => panic!("wrong error: {:?}", err),
        }
        assert_eq!(repo.stash_list().unwrap().len(), 2);
    }
}
