use super::Repository;
use crate::error::{Error, Result};
use crate::object::{Commit, Id, Kind, Object, Signature};

impl Repository {
    /// Create and store a commit.
    ///
    /// `tree` must name a tree and every parent must name a commit, or this
    /// fails with [`Error::TreeNotFound`] / [`Error::ParentNotFound`] before
    /// anything is written.
    ///
    /// If `update_ref` is given (`HEAD` follows its branch), the reference
    /// is moved to the new commit, provided it still points at the first
    /// parent (or doesn't exist yet, for a root commit). If that fails the
    /// commit stays in the object store, unreferenced.
    pub fn create_commit(
        &self,
        tree: &Id,
        parents: &[Id],
        author: &Signature,
        committer: &Signature,
        message: &str,
        update_ref: Option<&str>,
    ) -> Result<Id> {
        if !self.is_kind(tree, Kind::Tree)? {
            return Err(Error::TreeNotFound(*tree));
        }

        for parent in parents {
            if !self.is_kind(parent, Kind::Commit)? {
                return Err(Error::ParentNotFound(*parent));
            }
        }

        let commit = Commit::new(
            *tree,
            parents.to_vec(),
            author.clone(),
            committer.clone(),
            message,
        );
        let id = self.objects.put(&Object::Commit(commit))?;

        tracing::debug!(%id, %tree, parents = parents.len(), "created commit");

        if let Some(name) = update_ref {
            let subject = message.lines().next().unwrap_or("");
            let log_message = if parents.is_empty() {
                format!("commit (initial): {}", subject)
            } else {
                format!("commit: {}", subject)
            };

            self.update_ref_as(name, &id, parents.first(), committer, &log_message)?;
        }

        Ok(id)
    }

    /// [`create_commit`] with the configured identity as author and
    /// committer, at the current time.
    ///
    /// [`create_commit`]: Repository::create_commit
    pub fn create_commit_now(
        &self,
        tree: &Id,
        parents: &[Id],
        message: &str,
        update_ref: Option<&str>,
    ) -> Result<Id> {
        let sig = self.default_signature()?;
        self.create_commit(tree, parents, &sig, &sig, message, update_ref)
    }

    /// Returns false if `id` is missing or names another kind of object.
    fn is_kind(&self, id: &Id, kind: Kind) -> Result<bool> {
        match self.objects.get(id) {
            Ok(object) => Ok(object.kind() == kind),
            Err(Error::ObjectNotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
