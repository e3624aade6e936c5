use std::fs;
use std::path::Path;

use rsgit_stash::object::{Id, Object, Signature};
use rsgit_stash::workdir::{IndexEntry, WorkFile};
use rsgit_stash::Repository;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn sig() -> Signature {
    Signature::new("A U Thor", "author@example.com", 1_112_911_993, -420).unwrap()
}

/// A freshly initialized on-disk repository with an identity configured.
#[allow(dead_code)]
pub fn temp_repo() -> (TempDir, Repository) {
    let dir = tempfile::tempdir().unwrap();
    let mut repo = Repository::init(dir.path()).unwrap();
    set_identity(&mut repo);
    (dir, repo)
}

/// An in-memory repository with an identity configured.
#[allow(dead_code)]
pub fn memory_repo() -> Repository {
    let mut repo = Repository::in_memory();
    set_identity(&mut repo);
    repo
}

fn set_identity(repo: &mut Repository) {
    repo.config_mut().set("user.name", "A U Thor");
    repo.config_mut().set("user.email", "author@example.com");
}

#[allow(dead_code)]
pub fn write(repo: &Repository, path: &str, content: &str) {
    repo.workdir()
        .write_file(path, &WorkFile::normal(content))
        .unwrap();
}

#[allow(dead_code)]
pub fn read(repo: &Repository, path: &str) -> Option<String> {
    repo.workdir()
        .read_file(path)
        .unwrap()
        .map(|f| String::from_utf8(f.content).unwrap())
}

/// Stage the working tree version of `path`.
#[allow(dead_code)]
pub fn stage(repo: &Repository, path: &str) {
    let file = repo.workdir().read_file(path).unwrap().unwrap();
    let id = repo
        .objects()
        .put(&Object::Blob(file.content.clone()))
        .unwrap();

    let mut index = repo.workdir().read_index().unwrap();
    index.insert(path, IndexEntry::new(file.mode, id));
    repo.workdir().write_index(&index).unwrap();
}

/// Write, stage and commit `files` on the current branch.
#[allow(dead_code)]
pub fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) -> Id {
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

/// Copy the working tree (without `.git`) into a new temporary directory
/// so it can be compared later with `dir_diff`.
#[allow(dead_code)]
pub fn copy_work_tree(repo: &Repository) -> TempDir {
    let copy = tempfile::tempdir().unwrap();

    for path in repo.workdir().list_files().unwrap() {
        let file = repo.workdir().read_file(&path).unwrap().unwrap();
        let dest = copy.path().join(&path);
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(dest, file.content).unwrap();
    }

    copy
}

#[allow(dead_code)]
pub fn same_tree(a: &Path, b: &Path) -> bool {
    !dir_diff::is_different(a, b).unwrap()
}
