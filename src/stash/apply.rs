use std::collections::BTreeSet;
use std::ops::ControlFlow;

use super::{ApplyOptions, ApplyProgress, CheckoutStrategy};
use crate::error::{Error, Result};
use crate::object::Id;
use crate::path::FileMode;
use crate::repo::Snapshot;
use crate::workdir::IndexEntry;
use crate::Repository;

/// Changes to make so that one side of a merge takes the other side's edits.
type Plan = Vec<(String, Option<(FileMode, Id)>)>;

impl Repository {
    /// Apply the stash at `index` to the working tree (and, on request, the
    /// index) without removing it from the stash list.
    ///
    /// Each path the stash changed relative to the commit it was saved on
    /// is merged with the current state: if only the stash changed it, the
    /// stashed version is taken; if both sides made the same change there
    /// is nothing to do; otherwise the path conflicts. Conflicts fail with
    /// [`Error::ApplyConflict`] before anything is written, unless the
    /// checkout strategy is [`CheckoutStrategy::Force`].
    ///
    /// `progress` is called at the start of each phase; returning
    /// `ControlFlow::Break` stops with [`Error::Cancelled`]. Stopping
    /// after [`ApplyProgress::CheckoutUntracked`] has been reported may
    /// leave restored untracked files behind. [`ApplyProgress::Done`] is
    /// reported once every change has been written, so a `Break` returned
    /// for it is ignored and the apply (or pop) completes.
    ///
    /// Fails with [`Error::UnmergedIndex`] if the index has unresolved
    /// conflicts.
    pub fn apply_stash<F>(&self, index: usize, options: &ApplyOptions, progress: F) -> Result<()>
    where
        F: FnMut(ApplyProgress) -> ControlFlow<()>,
    {
        self.apply_stash_at(index, options, progress).map(|_| ())
    }

    /// [`apply_stash`](Repository::apply_stash), returning the ID of the
    /// stash that was applied.
    pub(super) fn apply_stash_at<F>(
        &self,
        index: usize,
        options: &ApplyOptions,
        mut progress: F,
    ) -> Result<Id>
    where
        F: FnMut(ApplyProgress) -> ControlFlow<()>,
    {
        let force = options.checkout.strategy == CheckoutStrategy::Force;
        let mut conflicts = BTreeSet::new();

        report(&mut progress, ApplyProgress::LoadingStash)?;

        let stash_id = self.stash_id_at(index)?;
        let stash = self.lookup_commit(&stash_id)?;
        if stash.parents().len() < 2 {
            return Err(Error::Corrupt {
                id: stash_id,
                reason: "stash commit has fewer than two parents".to_string(),
            });
        }

        let base = self.commit_snapshot(&stash.parents()[0])?;
        let stashed_index = self.commit_snapshot(&stash.parents()[1])?;
        let stashed_work = self.flatten_tree(stash.tree())?;
        let untracked = match stash.parents().get(2) {
            Some(u) => self.commit_snapshot(u)?,
            None => Snapshot::new(),
        };

        report(&mut progress, ApplyProgress::AnalyzeIndex)?;

        let mut index_file = self.workdir().read_index()?;
        index_file.check_merged()?;
        let current_index = index_file.to_snapshot();

        let index_plan = if options.reinstate_index {
            merge_plan(&base, &stashed_index, &current_index, force, &mut conflicts)
        } else {
            stashed_work
                .iter()
                .filter(|(path, _)| !base.contains_key(*path) && !current_index.contains_key(*path))
                .map(|(path, entry)| (path.clone(), Some(*entry)))
                .collect()
        };

        report(&mut progress, ApplyProgress::AnalyzeModified)?;

        let current_work = self.work_snapshot(base.keys().chain(stashed_work.keys()))?;
        let work_plan: Plan = merge_plan(&base, &stashed_work, &current_work, force, &mut conflicts)
            .into_iter()
            .filter(|(path, entry)| !is_gitlink(entry.as_ref()) && !is_gitlink(base.get(path)))
            .collect();

        report(&mut progress, ApplyProgress::AnalyzeUntracked)?;

        let mut untracked_plan = Plan::new();
        for (path, entry) in &untracked {
            match self.workdir().read_file(path)? {
                Some(file) if file.mode == entry.0 && file.blob_id() == entry.1 => {}
                Some(_) if !force => {
                    conflicts.insert(path.clone());
                }
                _ => untracked_plan.push((path.clone(), Some(*entry))),
            }
        }

        if !conflicts.is_empty() {
            let paths: Vec<String> = conflicts.into_iter().collect();
            tracing::warn!(stash = %stash_id, ?paths, "stash apply conflicts with local changes");
            return Err(Error::ApplyConflict(paths));
        }

        report(&mut progress, ApplyProgress::CheckoutUntracked)?;

        for (path, entry) in &untracked_plan {
            self.checkout_file(path, entry.as_ref())?;
        }

        report(&mut progress, ApplyProgress::CheckoutModified)?;

        for (path, entry) in &work_plan {
            self.checkout_file(path, entry.as_ref())?;
        }

        for (path, entry) in index_plan {
            match entry {
                Some((mode, id)) => index_file.insert(path, IndexEntry::new(mode, id)),
                None => {
                    index_file.remove(&path);
                }
            }
        }
        self.workdir().write_index(&index_file)?;

        // Everything is written by now; there is nothing left to cancel.
        if progress(ApplyProgress::Done).is_break() {
            tracing::debug!(stash = %stash_id, "ignoring cancel after apply finished");
        }

        tracing::info!(
            stash = %stash_id,
            index,
            files = work_plan.len() + untracked_plan.len(),
            "applied stash"
        );

        Ok(stash_id)
    }

    fn commit_snapshot(&self, commit: &Id) -> Result<Snapshot> {
        let commit = self.lookup_commit(commit)?;
        self.flatten_tree(commit.tree())
    }

    /// What the working tree currently holds at `paths`, hashed but not
    /// stored.
    fn work_snapshot<'a, I>(&self, paths: I) -> Result<Snapshot>
    where
        I: Iterator<Item = &'a String>,
    {
        let mut snapshot = Snapshot::new();
        for path in paths {
            if snapshot.contains_key(path) {
                continue;
            }

            if let Some(file) = self.workdir().read_file(path)? {
                let id = file.blob_id();
                snapshot.insert(path.clone(), (file.mode, id));
            }
        }

        Ok(snapshot)
    }
}

fn report<F>(progress: &mut F, phase: ApplyProgress) -> Result<()>
where
    F: FnMut(ApplyProgress) -> ControlFlow<()>,
{
    tracing::debug!(%phase, "stash apply");

    match progress(phase) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(()) => Err(Error::Cancelled),
    }
}

/// Path-level three-way merge: the changes `ours` needs to pick up what
/// `theirs` changed relative to `base`. Paths changed differently on both
/// sides are added to `conflicts`, or taken from `theirs` when `force`.
fn merge_plan(
    base: &Snapshot,
    theirs: &Snapshot,
    ours: &Snapshot,
    force: bool,
    conflicts: &mut BTreeSet<String>,
) -> Plan {
    let paths: BTreeSet<&String> = base.keys().chain(theirs.keys()).collect();
    let mut plan = Plan::new();

    for path in paths {
        let b = base.get(path);
        let t = theirs.get(path);
        if t == b {
            continue;
        }

        let o = ours.get(path);
        if o == t {
            continue;
        }

        if o == b || force {
            plan.push((path.clone(), t.copied()));
        } else {
            conflicts.insert(path.clone());
        }
    }

    plan
}

fn is_gitlink(entry: Option<&(FileMode, Id)>) -> bool {
    matches!(entry, Some((FileMode::Submodule, _)))
}
