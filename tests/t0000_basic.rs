use std::fs;

use rsgit_stash::object::{Id, Object, Tree, TreeEntry};
use rsgit_stash::path::FileMode;
use rsgit_stash::store::{LooseStore, ObjectStore};
use rsgit_stash::{Error, Repository};

mod common;
use common::{sig, temp_repo};

const EMPTY_BLOB: &str = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391";
const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";
const TEST_CONTENT: &str = "d670460b4b4aece5915caf5c68d12f560a9fe3e4";

#[test]
fn objects_dir_is_empty() {
    let (dir, _repo) = temp_repo();

    let objects_dir = dir.path().join(".git/objects");
    assert!(objects_dir.is_dir());
    assert_eq!(
        fs::read_dir(objects_dir)
            .unwrap()
            .filter(|x| !x.as_ref().unwrap().path().is_dir())
            .count(),
        0
    );
}

#[test]
fn objects_dir_has_two_subdirs() {
    let (dir, _repo) = temp_repo();

    let objects_dir = dir.path().join(".git/objects");
    assert_eq!(
        fs::read_dir(objects_dir)
            .unwrap()
            .filter(|x| x.as_ref().unwrap().path().is_dir())
            .count(),
        2
    );
}

#[test]
fn well_known_ids() {
    assert_eq!(Object::Blob(Vec::new()).id().to_string(), EMPTY_BLOB);
    assert_eq!(Object::Tree(Tree::empty()).id().to_string(), EMPTY_TREE);
    assert_eq!(
        Object::Blob(b"test content\n".to_vec()).id().to_string(),
        TEST_CONTENT
    );
}

#[test]
fn loose_object_layout() {
    let (dir, repo) = temp_repo();

    let id = repo
        .objects()
        .put(&Object::Blob(b"test content\n".to_vec()))
        .unwrap();
    assert_eq!(id.to_string(), TEST_CONTENT);

    let path = dir
        .path()
        .join(".git/objects/d6/70460b4b4aece5915caf5c68d12f560a9fe3e4");
    assert!(path.is_file());

    // Writing it again is a no-op.
    assert_eq!(
        repo.objects()
            .put(&Object::Blob(b"test content\n".to_vec()))
            .unwrap(),
        id
    );

    // Another store over the same directory sees it.
    let other = LooseStore::new(dir.path().join(".git/objects"));
    assert_eq!(
        other.get(&id).unwrap(),
        Object::Blob(b"test content\n".to_vec())
    );
}

#[test]
fn missing_and_corrupt_objects() {
    let (dir, repo) = temp_repo();

    let missing = Id::from_hex(EMPTY_BLOB).unwrap();
    assert!(matches!(
        repo.objects().get(&missing),
        Err(Error::ObjectNotFound(_))
    ));
    assert!(!repo.objects().contains(&missing).unwrap());

    let id = repo
        .objects()
        .put(&Object::Blob(b"test content\n".to_vec()))
        .unwrap();

    // Swap in a different, validly compressed object under the same name.
    let path = dir
        .path()
        .join(".git/objects/d6/70460b4b4aece5915caf5c68d12f560a9fe3e4");
    let other = repo
        .objects()
        .put(&Object::Blob(b"other content\n".to_vec()))
        .unwrap();
    let other_path = LooseStore::new(dir.path().join(".git/objects")).object_path(&other);

    fs::copy(other_path, &path).unwrap();

    assert!(matches!(
        repo.objects().get(&id),
        Err(Error::Corrupt { .. })
    ));
}

#[test]
fn known_commit_id() {
    let (dir, repo) = temp_repo();

    let tree = repo.build_tree(Vec::new()).unwrap();
    assert_eq!(tree.to_string(), EMPTY_TREE);

    let commit = repo
        .create_commit(&tree, &[], &sig(), &sig(), "initial\n", Some("HEAD"))
        .unwrap();
    assert_eq!(
        commit.to_string(),
        "551742545a1086034ca8929263580794c5a96a33"
    );

    let reopened = Repository::open(dir.path()).unwrap();
    assert_eq!(reopened.head_commit_id().unwrap(), commit);
    assert_eq!(reopened.lookup_commit(&commit).unwrap().summary(), "initial");
}

#[test]
fn known_tree_id() {
    let (_dir, repo) = temp_repo();

    let blob = repo
        .objects()
        .put(&Object::Blob(b"test content\n".to_vec()))
        .unwrap();
    let tree = repo
        .build_tree(vec![TreeEntry::new("a", FileMode::Normal, blob)])
        .unwrap();

    assert_eq!(
        tree.to_string(),
        "c1c7c5efcca41d44c50c041c3de57a6bff3748aa"
    );

    let entry = repo.resolve_entry(&tree, "a").unwrap();
    assert_eq!(entry.tree(), &tree);
    assert_eq!(
        repo.entry_to_object(entry.entry()).unwrap(),
        Object::Blob(b"test content\n".to_vec())
    );
}
