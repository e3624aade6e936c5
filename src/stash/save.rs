use super::StashFlags;
use crate::error::{Error, Result};
use crate::object::{Id, Object, Signature};
use crate::path::FileMode;
use crate::refs::STASH_REF;
use crate::repo::Snapshot;
use crate::workdir::Index;
use crate::Repository;

impl Repository {
    /// Save local modifications to a new stash and reset the working tree.
    ///
    /// `stasher` signs the stash commits and the stash list entry; when
    /// `None`, the configured identity is used. Without a `message` the
    /// entry is described as `WIP on <branch>: <short id> <subject>`.
    ///
    /// Fails with [`Error::UnbornHead`] when there is no commit to stash on
    /// top of and [`Error::NothingToStash`] when the index and the working
    /// tree match `HEAD` (and there are no untracked files to include).
    /// An index with unresolved conflicts fails with
    /// [`Error::UnmergedIndex`].
    ///
    /// The stash list only changes once every commit has been written; if
    /// `refs/stash` moved in the meantime this fails with
    /// [`Error::RefConflict`] and the working tree is left as it was.
    pub fn stash_save(
        &self,
        stasher: Option<&Signature>,
        message: Option<&str>,
        flags: StashFlags,
    ) -> Result<Id> {
        let stasher = match stasher {
            Some(sig) => sig.clone(),
            None => self.default_signature()?,
        };

        let old_stash = self.read_ref(STASH_REF)?;

        let head_id = self.head_commit_id()?;
        let head_commit = self.lookup_commit(&head_id)?;
        let head_tree = self.flatten_tree(head_commit.tree())?;
        let branch = self
            .head_branch()?
            .unwrap_or_else(|| "(no branch)".to_string());

        let index = self.workdir().read_index()?;
        index.check_merged()?;
        let index_tree = index.to_snapshot();
        let work_tree = self.snapshot_tracked(&index_tree)?;
        let untracked = self.snapshot_untracked(&index_tree, flags)?;

        if index_tree == head_tree && work_tree == index_tree && untracked.is_empty() {
            return Err(Error::NothingToStash);
        }

        let on_branch = format!("{}: {} {}", branch, head_id.short(), head_commit.summary());

        let i_tree = self.write_snapshot(&index_tree)?;
        let i_commit = self.create_commit(
            &i_tree,
            &[head_id],
            &stasher,
            &stasher,
            &format!("index on {}\n", on_branch),
            None,
        )?;

        let mut parents = vec![head_id, i_commit];

        if !untracked.is_empty() {
            let u_tree = self.write_snapshot(&untracked)?;
            let u_commit = self.create_commit(
                &u_tree,
                &[],
                &stasher,
                &stasher,
                &format!("untracked files on {}\n", on_branch),
                None,
            )?;
            parents.push(u_commit);
        }

        let message = match message {
            Some(message) => format!("On {}: {}", branch, message),
            None => format!("WIP on {}", on_branch),
        };

        let w_tree = self.write_snapshot(&work_tree)?;
        let stash_id = self.create_commit(
            &w_tree,
            &parents,
            &stasher,
            &stasher,
            &format!("{}\n", message),
            None,
        )?;

        self.refs()
            .update(STASH_REF, &stash_id, old_stash.as_ref(), &stasher, &message)?;

        if flags.keep_index {
            self.checkout_snapshot(&work_tree, &index_tree)?;
        } else {
            self.workdir().write_index(&Index::from_snapshot(&head_tree))?;
            self.checkout_snapshot(&work_tree, &head_tree)?;
        }

        for path in untracked.keys() {
            self.workdir().remove_file(path)?;
        }

        tracing::info!(
            id = %stash_id,
            untracked = untracked.len(),
            %message,
            "saved working directory and index state"
        );

        Ok(stash_id)
    }

    /// The working tree version of every path in the index. Files missing
    /// from the working tree are left out.
    fn snapshot_tracked(&self, index_tree: &Snapshot) -> Result<Snapshot> {
        let mut work_tree = Snapshot::new();

        for (path, (mode, id)) in index_tree {
            if *mode == FileMode::Submodule {
                work_tree.insert(path.clone(), (*mode, *id));
                continue;
            }

            if let Some(file) = self.workdir().read_file(path)? {
                let file_id = if file.mode == *mode && file.blob_id() == *id {
                    *id
                } else {
                    self.objects().put(&Object::Blob(file.content))?
                };
                work_tree.insert(path.clone(), (file.mode, file_id));
            }
        }

        Ok(work_tree)
    }

    /// Files outside the index that `flags` asks to include, stored as blobs.
    fn snapshot_untracked(&self, index_tree: &Snapshot, flags: StashFlags) -> Result<Snapshot> {
        let mut untracked = Snapshot::new();
        if !flags.include_untracked && !flags.include_ignored {
            return Ok(untracked);
        }

        for path in self.workdir().list_files()? {
            if index_tree.contains_key(&path) {
                continue;
            }

            let wanted = if self.workdir().is_ignored(&path)? {
                flags.include_ignored
            } else {
                flags.include_untracked
            };

            if wanted {
                if let Some(file) = self.workdir().read_file(&path)? {
                    let id = self.objects().put(&Object::Blob(file.content))?;
                    untracked.insert(path, (file.mode, id));
                }
            }
        }

        Ok(untracked)
    }

    /// Make the working tree go from `current` to `target`: files only in
    /// `current` are removed, the others are written where they differ.
    fn checkout_snapshot(&self, current: &Snapshot, target: &Snapshot) -> Result<()> {
        for path in current.keys() {
            if !target.contains_key(path) {
                self.workdir().remove_file(path)?;
            }
        }

        for (path, entry) in target {
            if current.get(path) != Some(entry) {
                self.checkout_file(path, Some(entry))?;
            }
        }

        Ok(())
    }
}
