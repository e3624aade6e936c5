use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{rules_for, Index, WorkFile, Workdir};
use crate::error::Result;

#[derive(Debug, Default)]
struct Inner {
    files: BTreeMap<String, WorkFile>,
    index: Index,
    exclude: String,
}

/// A working tree and index held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryWorkdir {
    inner: RwLock<Inner>,
}

impl MemoryWorkdir {
    pub fn new() -> MemoryWorkdir {
        MemoryWorkdir::default()
    }

    /// Set the repository-wide exclude patterns (what `.git/info/exclude`
    /// holds on disk).
    pub fn set_exclude(&self, patterns: &str) {
        self.inner.write().exclude = patterns.to_string();
    }
}

impl Workdir for MemoryWorkdir {
    fn read_index(&self) -> Result<Index> {
        Ok(self.inner.read().index.clone())
    }

    fn write_index(&self, index: &Index) -> Result<()> {
        self.inner.write().index = index.clone();
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.inner.read().files.keys().cloned().collect())
    }

    fn read_file(&self, path: &str) -> Result<Option<WorkFile>> {
        Ok(self.inner.read().files.get(path).cloned())
    }

    fn write_file(&self, path: &str, file: &WorkFile) -> Result<()> {
        tracing::debug!(path, "writing work file");
        self.inner
            .write()
            .files
            .insert(path.to_string(), file.clone());
        Ok(())
    }

    fn remove_file(&self, path: &str) -> Result<()> {
        tracing::debug!(path, "removing work file");
        self.inner.write().files.remove(path);
        Ok(())
    }

    fn is_ignored(&self, path: &str) -> Result<bool> {
        let inner = self.inner.read();
        let rules = rules_for(path, Some(inner.exclude.as_str()), |p| {
            Ok(inner.files.get(p).map(|f| f.content.clone()))
        })?;

        Ok(rules.is_ignored(path, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::path::FileMode;

    #[test]
    fn files_and_ignores() {
        let wd = MemoryWorkdir::new();
        wd.write_file("b.txt", &WorkFile::normal("b")).unwrap();
        wd.write_file("a/x.log", &WorkFile::normal("x")).unwrap();
        wd.write_file(".gitignore", &WorkFile::normal("*.log\n")).unwrap();

        assert_eq!(wd.list_files().unwrap(), vec![".gitignore", "a/x.log", "b.txt"]);
        assert!(wd.is_ignored("a/x.log").unwrap());
        assert!(!wd.is_ignored("b.txt").unwrap());

        wd.set_exclude("b.*\n");
        assert!(wd.is_ignored("b.txt").unwrap());

        wd.remove_file("a/x.log").unwrap();
        wd.remove_file("a/x.log").unwrap();
        assert_eq!(wd.read_file("a/x.log").unwrap(), None);

        let exe = WorkFile {
            mode: FileMode::Executable,
            content: b"#!/bin/sh\n".to_vec(),
        };
        wd.write_file("run.sh", &exe).unwrap();
        assert_eq!(wd.read_file("run.sh").unwrap(), Some(exe));
    }
}
