use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{index_file, rules_for, Index, IndexEntry, StatData, WorkFile, Workdir};
use crate::error::{Error, Result};
use crate::path::{check_path, FileMode};

/// A working tree on the local file system, with its index stored in
/// `.git/index` in the same format command-line git uses.
#[derive(Debug)]
pub struct OnDiskWorkdir {
    work_dir: PathBuf,
    git_dir: PathBuf,
}

impl OnDiskWorkdir {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(work_dir: P, git_dir: Q) -> OnDiskWorkdir {
        OnDiskWorkdir {
            work_dir: work_dir.into(),
            git_dir: git_dir.into(),
        }
    }

    /// Return the working directory.
    pub fn work_dir(&self) -> &Path {
        self.work_dir.as_path()
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.work_dir.join(path)
    }

    /// Like `full_path`, but refuses paths that could escape the working
    /// tree or reach into `.git`.
    fn checked_path(&self, path: &str) -> Result<PathBuf> {
        check_path(path.as_bytes())
            .map_err(|err| Error::InvalidEntry(format!("`{}`: {}", path, err)))?;
        Ok(self.full_path(path))
    }

    fn index_path(&self) -> PathBuf {
        self.git_dir.join("index")
    }

    fn walk(&self, dir: &Path, prefix: &str, files: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(name) => {
                    tracing::warn!(?name, "skipping file with non-UTF-8 name");
                    continue;
                }
            };

            if prefix.is_empty() && name == ".git" {
                continue;
            }

            let path = format!("{}{}", prefix, name);
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                // A nested repository is not part of this working tree.
                if entry.path().join(".git").exists() {
                    continue;
                }
                self.walk(&entry.path(), &format!("{}/", path), files)?;
            } else {
                files.push(path);
            }
        }

        Ok(())
    }

    /// Stat data for `path`, if the file there still holds the staged blob.
    /// Otherwise zeros, so git rehashes the file instead of trusting it.
    fn refresh_stat(&self, path: &str, entry: &IndexEntry) -> Result<StatData> {
        match self.read_file(path)? {
            Some(file) if file.mode == entry.mode() && file.blob_id() == *entry.id() => {
                let meta = fs::symlink_metadata(self.full_path(path))?;
                Ok(stat_data(&meta))
            }
            _ => Ok(StatData::default()),
        }
    }

    fn prune_empty_dirs(&self, path: &str) {
        let mut dir = Path::new(path).parent();
        while let Some(d) = dir {
            if d.as_os_str().is_empty() {
                break;
            }

            // Fails (and stops the walk) once a directory isn't empty.
            if fs::remove_dir(self.work_dir.join(d)).is_err() {
                break;
            }
            dir = d.parent();
        }
    }
}

impl Workdir for OnDiskWorkdir {
    fn read_index(&self) -> Result<Index> {
        match fs::read(self.index_path()) {
            Ok(data) => index_file::parse(&data),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Index::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_index(&self, index: &Index) -> Result<()> {
        // Unmerged entries can't be written back, so refuse rather than
        // drop the conflict.
        index.check_merged()?;

        let mut refreshed = Index::new();
        for (path, entry) in index.iter() {
            let stat = self.refresh_stat(path, entry)?;
            refreshed.insert(path, entry.clone().with_stat(stat));
        }

        let data = index_file::encode(&refreshed);

        let path = self.index_path();
        let lock_path = self.git_dir.join("index.lock");

        let mut lock = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::RefLocked("index".to_string()))
            }
            Err(err) => return Err(err.into()),
        };

        let written = lock.write_all(&data).and_then(|_| lock.sync_all());
        drop(lock);

        if let Err(err) = written.and_then(|_| fs::rename(&lock_path, &path)) {
            let _ = fs::remove_file(&lock_path);
            return Err(err.into());
        }

        tracing::debug!(entries = index.len(), "wrote index");
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        self.walk(&self.work_dir, "", &mut files)?;
        files.sort();
        Ok(files)
    }

    fn read_file(&self, path: &str) -> Result<Option<WorkFile>> {
        let full_path = self.full_path(path);

        let meta = match fs::symlink_metadata(&full_path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        if meta.file_type().is_symlink() {
            let target = fs::read_link(&full_path)?;
            return Ok(Some(WorkFile {
                mode: FileMode::SymbolicLink,
                content: path_bytes(&target),
            }));
        }

        if !meta.is_file() {
            return Ok(None);
        }

        Ok(Some(WorkFile {
            mode: if is_executable(&meta) {
                FileMode::Executable
            } else {
                FileMode::Normal
            },
            content: fs::read(&full_path)?,
        }))
    }

    fn write_file(&self, path: &str, file: &WorkFile) -> Result<()> {
        let full_path = self.checked_path(path)?;
        if let Some(dir) = full_path.parent() {
            fs::create_dir_all(dir)?;
        }

        tracing::debug!(path, "writing work file");

        if let Ok(meta) = fs::symlink_metadata(&full_path) {
            if meta.file_type().is_symlink() || file.mode == FileMode::SymbolicLink {
                fs::remove_file(&full_path)?;
            }
        }

        if file.mode == FileMode::SymbolicLink {
            return write_symlink(&file.content, &full_path);
        }

        fs::write(&full_path, &file.content)?;
        set_executable(&full_path, file.mode == FileMode::Executable)
    }

    fn remove_file(&self, path: &str) -> Result<()> {
        tracing::debug!(path, "removing work file");

        match fs::remove_file(self.checked_path(path)?) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        self.prune_empty_dirs(path);
        Ok(())
    }

    fn is_ignored(&self, path: &str) -> Result<bool> {
        let exclude = match fs::read_to_string(self.git_dir.join("info/exclude")) {
            Ok(text) => Some(text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        let rules = rules_for(path, exclude.as_deref(), |p| {
            match fs::read(self.full_path(p)) {
                Ok(text) => Ok(Some(text)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err.into()),
            }
        })?;

        Ok(rules.is_ignored(path, false))
    }
}

#[cfg(unix)]
fn stat_data(meta: &fs::Metadata) -> StatData {
    use std::os::unix::fs::MetadataExt;

    // The index stores 32-bit fields; git truncates the same way.
    StatData {
        ctime: (meta.ctime() as u32, meta.ctime_nsec() as u32),
        mtime: (meta.mtime() as u32, meta.mtime_nsec() as u32),
        dev: meta.dev() as u32,
        ino: meta.ino() as u32,
        uid: meta.uid(),
        gid: meta.gid(),
        size: meta.size() as u32,
    }
}

#[cfg(not(unix))]
fn stat_data(meta: &fs::Metadata) -> StatData {
    StatData {
        size: meta.len() as u32,
        ..StatData::default()
    }
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    false
}

#[cfg(unix)]
fn set_executable(path: &Path, executable: bool) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode();
    let mode = if executable {
        mode | ((mode & 0o444) >> 2)
    } else {
        mode & !0o111
    };
    perms.set_mode(mode);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path, _executable: bool) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(unix)]
fn write_symlink(target: &[u8], link: &Path) -> Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    std::os::unix::fs::symlink(OsStr::from_bytes(target), link)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_symlink(target: &[u8], link: &Path) -> Result<()> {
    // Without symlink support git writes the target as a plain file.
    fs::write(link, target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::{tempdir, TempDir};

    fn workdir() -> (TempDir, OnDiskWorkdir) {
        let dir = tempdir().unwrap();
        let git_dir = dir.path().join(".git");
        fs::create_dir_all(git_dir.join("info")).unwrap();
        let wd = OnDiskWorkdir::new(dir.path(), git_dir);
        (dir, wd)
    }

    #[test]
    fn lists_files_outside_git_dir() {
        let (dir, wd) = workdir();
        fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/master\n").unwrap();

        wd.write_file("b.txt", &WorkFile::normal("b")).unwrap();
        wd.write_file("a/deep/c.txt", &WorkFile::normal("c")).unwrap();

        assert_eq!(wd.list_files().unwrap(), vec!["a/deep/c.txt", "b.txt"]);
        assert_eq!(
            fs::read_to_string(dir.path().join("a/deep/c.txt")).unwrap(),
            "c"
        );
    }

    #[test]
    fn remove_prunes_empty_dirs() {
        let (dir, wd) = workdir();
        wd.write_file("a/b/c.txt", &WorkFile::normal("c")).unwrap();
        wd.write_file("a/keep.txt", &WorkFile::normal("k")).unwrap();

        wd.remove_file("a/b/c.txt").unwrap();
        assert!(!dir.path().join("a/b").exists());
        assert!(dir.path().join("a").is_dir());

        // Already gone.
        wd.remove_file("a/b/c.txt").unwrap();
    }

    #[test]
    fn refuses_paths_outside_work_tree() {
        let (dir, wd) = workdir();
        fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/master\n").unwrap();

        for path in &[".git/config", "a/../../x", "/etc/x", "a/.GIT/hooks/pre-commit"] {
            let err = wd.write_file(path, &WorkFile::normal("x")).unwrap_err();
            assert!(matches!(err, Error::InvalidEntry(_)), "wrong error: {:?}", err);
        }

        assert!(matches!(
            wd.remove_file(".git/HEAD"),
            Err(Error::InvalidEntry(_))
        ));
        assert!(dir.path().join(".git/HEAD").exists());
    }

    #[cfg(unix)]
    #[test]
    fn executable_and_symlink() {
        let (_dir, wd) = workdir();

        let exe = WorkFile {
            mode: FileMode::Executable,
            content: b"#!/bin/sh\n".to_vec(),
        };
        wd.write_file("run.sh", &exe).unwrap();
        assert_eq!(wd.read_file("run.sh").unwrap(), Some(exe));

        wd.write_file("run.sh", &WorkFile::normal("plain")).unwrap();
        assert_eq!(
            wd.read_file("run.sh").unwrap().unwrap().mode,
            FileMode::Normal
        );

        let link = WorkFile {
            mode: FileMode::SymbolicLink,
            content: b"run.sh".to_vec(),
        };
        wd.write_file("link", &link).unwrap();
        assert_eq!(wd.read_file("link").unwrap(), Some(link));
    }

    #[test]
    fn index_round_trip_with_stat() {
        let (dir, wd) = workdir();
        assert!(wd.read_index().unwrap().is_empty());

        let file = WorkFile::normal("test content\n");
        wd.write_file("file", &file).unwrap();

        let mut index = Index::new();
        index.insert("file", IndexEntry::new(FileMode::Normal, file.blob_id()));
        index.insert("gone", IndexEntry::new(FileMode::Normal, file.blob_id()));
        wd.write_index(&index).unwrap();

        assert!(dir.path().join(".git/index").is_file());
        assert!(!dir.path().join(".git/index.lock").exists());

        let read = wd.read_index().unwrap();
        assert_eq!(read.to_snapshot(), index.to_snapshot());
        assert_eq!(read.get("file").unwrap().stat().size, 13);
        assert_eq!(read.get("gone").unwrap().stat(), &StatData::default());
    }

    #[test]
    fn unmerged_index_is_not_overwritten() {
        let (dir, wd) = workdir();
        let file = WorkFile::normal("x\n");

        let mut index = Index::new();
        index.insert("file", IndexEntry::new(FileMode::Normal, file.blob_id()));
        index.mark_conflicted("merge.txt");

        assert!(matches!(
            wd.write_index(&index),
            Err(Error::UnmergedIndex(_))
        ));
        assert!(!dir.path().join(".git/index").exists());
        assert!(!dir.path().join(".git/index.lock").exists());
    }

    #[test]
    fn ignores_from_exclude_and_gitignore() {
        let (dir, wd) = workdir();
        fs::write(dir.path().join(".git/info/exclude"), "*.tmp\n").unwrap();
        wd.write_file(".gitignore", &WorkFile::normal("build/\n"))
            .unwrap();

        assert!(wd.is_ignored("x.tmp").unwrap());
        assert!(wd.is_ignored("build/out.o").unwrap());
        assert!(!wd.is_ignored("src/main.rs").unwrap());
    }
}
