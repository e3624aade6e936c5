// Items in this module are only used in test code.

use crate::object::{Id, Object, Signature};
use crate::workdir::{IndexEntry, WorkFile};
use crate::Repository;

/// A fixed signature so that object IDs are reproducible.
pub(crate) fn sig() -> Signature {
    Signature::new("A U Thor", "author@example.com", 1_112_911_993, -420).unwrap()
}

/// An in-memory repository with a configured identity.
pub(crate) fn test_repo() -> Repository {
    let mut repo = Repository::in_memory();
    repo.config_mut().set("user.name", "A U Thor");
    repo.config_mut().set("user.email", "author@example.com");
    repo
}

pub(crate) fn blob(repo: &Repository, content: &str) -> Id {
    repo.objects()
        .put(&Object::Blob(content.as_bytes().to_vec()))
        .unwrap()
}

pub(crate) fn write(repo: &Repository, path: &str, content: &str) {
    repo.workdir()
        .write_file(path, &WorkFile::normal(content))
        .unwrap();
}

pub(crate) fn read(repo: &Repository, path: &str) -> Option<String> {
    repo.workdir()
        .read_file(path)
        .unwrap()
        .map(|f| String::from_utf8(f.content).unwrap())
}

/// Stage the working tree version of `path`, like `git add`.
pub(crate) fn stage(repo: &Repository, path: &str) {
    let file = repo.workdir().read_file(path).unwrap().unwrap();
    let id = repo
        .objects()
        .put(&Object::Blob(file.content.clone()))
        .unwrap();

    let mut index = repo.workdir().read_index().unwrap();
    index.insert(path, IndexEntry::new(file.mode, id));
    repo.workdir().write_index(&index).unwrap();
}

/// Write, stage and commit files on the current branch.
pub(crate) fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) -> Id {
    for (path, content) in files {
        write(repo, path, content);
        stage(repo, path);
    }

    let index = repo.workdir().read_index().unwrap();
    let tree = repo.write_snapshot(&index.to_snapshot()).unwrap();
    let parents: Vec<Id> = repo.read_ref("HEAD").unwrap().into_iter().collect();

    repo.create_commit(&tree, &parents, &sig(), &sig(), message, Some("HEAD"))
        .unwrap()
}
