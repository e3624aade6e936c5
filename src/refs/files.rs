use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{
    check_expected, check_expected_log, check_ref_name, Head, RefStore, ReflogEntry,
};
use crate::error::{Error, Result};
use crate::object::{Id, Signature};

/// Symbolic references are followed at most this many levels deep.
const MAX_SYMREF_DEPTH: usize = 5;

/// Stores references the way command-line git does: one file per
/// reference under `.git/refs`, an optional `packed-refs` file, and
/// reflogs under `.git/logs`.
///
/// Writers take `<ref>.lock` with an exclusive create, so this store
/// also coordinates with other git processes working on the same
/// repository.
#[derive(Debug)]
pub struct FileRefs {
    git_dir: PathBuf,
}

#[derive(Debug, Eq, PartialEq)]
enum RawRef {
    Direct(Id),
    Symbolic(String),
}

impl FileRefs {
    /// Create a store for the given `.git` directory.
    pub fn new<P: Into<PathBuf>>(git_dir: P) -> FileRefs {
        FileRefs {
            git_dir: git_dir.into(),
        }
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.git_dir.join(name)
    }

    fn log_path(&self, name: &str) -> PathBuf {
        self.git_dir.join("logs").join(name)
    }

    fn packed_refs_path(&self) -> PathBuf {
        self.git_dir.join("packed-refs")
    }

    fn read_raw(&self, name: &str) -> Result<Option<RawRef>> {
        let path = self.ref_path(name);
        if path.is_file() {
            let content = fs::read_to_string(&path)?;
            let content = content.trim_end();

            if let Some(target) = content.strip_prefix("ref: ") {
                return Ok(Some(RawRef::Symbolic(target.trim().to_string())));
            }

            return match Id::from_hex(content) {
                Ok(id) => Ok(Some(RawRef::Direct(id))),
                Err(err) => Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("reference `{}` is malformed: {}", name, err),
                )
                .into()),
            };
        }

        Ok(self.read_packed(name)?.map(RawRef::Direct))
    }

    /// Look `name` up in `packed-refs`.
    fn read_packed(&self, name: &str) -> Result<Option<Id>> {
        let content = match fs::read_to_string(self.packed_refs_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        for line in content.lines() {
            if line.starts_with('#') || line.starts_with('^') {
                continue;
            }

            if let Some((hex, packed_name)) = line.split_once(' ') {
                if packed_name == name {
                    return Ok(Id::from_hex(hex).ok());
                }
            }
        }

        Ok(None)
    }

    /// Resolve `name` through symbolic references to an ID.
    fn resolve(&self, name: &str) -> Result<Option<Id>> {
        let mut name = name.to_string();

        for _ in 0..MAX_SYMREF_DEPTH {
            match self.read_raw(&name)? {
                None => return Ok(None),
                Some(RawRef::Direct(id)) => return Ok(Some(id)),
                Some(RawRef::Symbolic(target)) => name = target,
            }
        }

        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("symbolic reference loop at `{}`", name),
        )
        .into())
    }

    fn append_log(&self, name: &str, entry: &ReflogEntry) -> Result<()> {
        let path = self.log_path(name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }

    /// Append `entry` to each log in `names`, recording each log's previous
    /// length in `appended` before touching it.
    fn append_logs<'a>(
        &self,
        names: &[&'a str],
        entry: &ReflogEntry,
        appended: &mut Vec<(&'a str, Option<u64>)>,
    ) -> Result<()> {
        for &name in names {
            appended.push((name, self.log_len(name)?));
            self.append_log(name, entry)?;
        }
        Ok(())
    }

    /// Current length of the log of `name`, `None` if there is no log.
    fn log_len(&self, name: &str) -> Result<Option<u64>> {
        match fs::metadata(self.log_path(name)) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Cut the log of `name` back to a length taken with `log_len`.
    fn truncate_log(&self, name: &str, len: Option<u64>) {
        let path = self.log_path(name);
        let result = match len {
            Some(len) => OpenOptions::new()
                .write(true)
                .open(&path)
                .and_then(|file| file.set_len(len)),
            None => fs::remove_file(&path),
        };

        match result {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::error!(name, %err, "could not roll back reflog");
            }
        }
    }

    fn write_log(&self, name: &str, entries: &[ReflogEntry]) -> Result<()> {
        let path = self.log_path(name);
        let dir = match path.parent() {
            Some(dir) => dir,
            None => &self.git_dir,
        };
        fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        for entry in entries {
            writeln!(temp, "{}", entry)?;
        }

        temp.persist(&path).map_err(|err| err.error)?;
        Ok(())
    }

    fn remove_log(&self, name: &str) -> Result<()> {
        remove_if_exists(&self.log_path(name))
    }

    /// Drop `name` from `packed-refs`, if it's there.
    fn remove_packed(&self, name: &str) -> Result<()> {
        if self.read_packed(name)?.is_none() {
            return Ok(());
        }

        let path = self.packed_refs_path();
        let lock = RefLock::acquire("packed-refs", &path)?;
        let content = fs::read_to_string(&path)?;

        let mut kept = String::with_capacity(content.len());
        let mut skip_peeled = false;
        for line in content.lines() {
            if line.starts_with('^') {
                if !skip_peeled {
                    kept.push_str(line);
                    kept.push('\n');
                }
                continue;
            }

            skip_peeled = matches!(line.split_once(' '), Some((_, n)) if n == name);
            if !skip_peeled {
                kept.push_str(line);
                kept.push('\n');
            }
        }

        lock.commit(kept.as_bytes())
    }

    /// Current value of `name`. Callers hold its lock.
    fn current_locked(&self, name: &str) -> Result<Option<Id>> {
        match self.read_raw(name)? {
            Some(RawRef::Symbolic(_)) => self.resolve(name),
            Some(RawRef::Direct(id)) => Ok(Some(id)),
            None => Ok(None),
        }
    }
}

impl RefStore for FileRefs {
    fn read(&self, name: &str) -> Result<Option<Id>> {
        check_ref_name(name)?;
        self.resolve(name)
    }

    fn head(&self) -> Result<Head> {
        match self.read_raw("HEAD")? {
            Some(RawRef::Symbolic(target)) => Ok(Head::Branch(target)),
            Some(RawRef::Direct(id)) => Ok(Head::Detached(id)),
            None => Err(Error::GitDirDoesntExist(self.git_dir.clone())),
        }
    }

    fn set_head(&self, head: &Head) -> Result<()> {
        let content = match head {
            Head::Branch(name) => {
                check_ref_name(name)?;
                format!("ref: {}\n", name)
            }
            Head::Detached(id) => format!("{}\n", id),
        };

        let lock = RefLock::acquire("HEAD", &self.ref_path("HEAD"))?;
        lock.commit(content.as_bytes())
    }

    fn update(
        &self,
        name: &str,
        new: &Id,
        expected_old: Option<&Id>,
        committer: &Signature,
        message: &str,
    ) -> Result<()> {
        check_ref_name(name)?;

        let lock = RefLock::acquire(name, &self.ref_path(name))?;

        let old = self.current_locked(name)?;
        check_expected(name, expected_old, old.as_ref())?;

        tracing::debug!(name, %new, "updating reference");

        let entry = ReflogEntry::new(old, *new, committer.clone(), message);

        let mut logs = vec![name];
        if name != "HEAD" && matches!(self.head(), Ok(Head::Branch(branch)) if branch == name) {
            logs.push("HEAD");
        }

        let mut appended = Vec::with_capacity(logs.len());
        let result = self.append_logs(&logs, &entry, &mut appended);
        let result = result.and_then(|()| lock.commit(format!("{}\n", new).as_bytes()));

        // The logs must only record moves that happened.
        if result.is_err() {
            for (log, mark) in appended {
                self.truncate_log(log, mark);
            }
        }

        result
    }

    fn delete(&self, name: &str, expected_old: &Id) -> Result<()> {
        check_ref_name(name)?;

        let path = self.ref_path(name);
        let lock = RefLock::acquire(name, &path)?;

        let old = self.current_locked(name)?;
        check_expected(name, Some(expected_old), old.as_ref())?;

        tracing::debug!(name, "deleting reference");

        self.remove_packed(name)?;
        remove_if_exists(&path)?;
        self.remove_log(name)?;

        lock.release();
        Ok(())
    }

    fn reflog(&self, name: &str) -> Result<Vec<ReflogEntry>> {
        check_ref_name(name)?;

        let content = match fs::read(self.log_path(name)) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        Ok(content
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let entry = ReflogEntry::parse(line);
                if entry.is_none() {
                    tracing::warn!(name, "skipping malformed reflog line");
                }
                entry
            })
            .collect())
    }

    fn rewrite_reflog(
        &self,
        name: &str,
        expected: &[ReflogEntry],
        entries: Vec<ReflogEntry>,
    ) -> Result<()> {
        check_ref_name(name)?;

        let path = self.ref_path(name);
        let lock = RefLock::acquire(name, &path)?;

        let old = self.current_locked(name)?;
        let log = self.reflog(name)?;
        check_expected_log(name, expected, old.as_ref(), &log)?;

        match entries.last() {
            Some(newest) => {
                let newest = *newest.new_id();
                self.write_log(name, &entries)?;
                lock.commit(format!("{}\n", newest).as_bytes())
            }
            None => {
                self.remove_packed(name)?;
                remove_if_exists(&path)?;
                self.remove_log(name)?;
                lock.release();
                Ok(())
            }
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// An exclusive `<path>.lock` file. Committing renames it over `path`;
/// dropping it without committing removes it.
#[derive(Debug)]
struct RefLock {
    path: PathBuf,
    lock_path: PathBuf,
    file: Option<File>,
    committed: bool,
}

impl RefLock {
    fn acquire(name: &str, path: &Path) -> Result<RefLock> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut lock_path = OsString::from(path.as_os_str());
        lock_path.push(".lock");
        let lock_path = PathBuf::from(lock_path);

        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::RefLocked(name.to_string()))
            }
            Err(err) => return Err(err.into()),
        };

        Ok(RefLock {
            path: path.to_path_buf(),
            lock_path,
            file: Some(file),
            committed: false,
        })
    }

    fn commit(mut self, content: &[u8]) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.write_all(content)?;
            file.sync_all()?;
        }

        fs::rename(&self.lock_path, &self.path)?;
        self.committed = true;
        Ok(())
    }

    fn release(self) {}
}

impl Drop for RefLock {
    fn drop(&mut self) {
        self.file.take();
        if !self.committed {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}
