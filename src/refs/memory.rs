use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use super::{
    check_expected, check_expected_log, check_ref_name, Head, RefStore, ReflogEntry,
};
use crate::error::Result;
use crate::object::{Id, Signature};

#[derive(Debug)]
struct Inner {
    head: Head,
    refs: BTreeMap<String, Id>,
    logs: HashMap<String, Vec<ReflogEntry>>,
}

/// Keeps references and their logs in memory.
///
/// A single lock covers every reference, so each update observes and
/// replaces the current value in one step.
#[derive(Debug)]
pub struct MemoryRefs {
    inner: Mutex<Inner>,
}

impl MemoryRefs {
    /// Create an empty reference store with `HEAD` on an unborn `master`.
    pub fn new() -> MemoryRefs {
        MemoryRefs {
            inner: Mutex::new(Inner {
                head: Head::Branch("refs/heads/master".to_string()),
                refs: BTreeMap::new(),
                logs: HashMap::new(),
            }),
        }
    }
}

impl Default for MemoryRefs {
    fn default() -> Self {
        MemoryRefs::new()
    }
}

impl Inner {
    /// Map `HEAD` to the name that actually stores its value.
    fn resolve<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        match (name, &self.head) {
            ("HEAD", Head::Branch(branch)) => Some(branch.as_str()),
            ("HEAD", Head::Detached(_)) => None,
            (name, _) => Some(name),
        }
    }

    fn current(&self, name: &str) -> Option<Id> {
        match self.resolve(name) {
            Some(name) => self.refs.get(name).copied(),
            None => match &self.head {
                Head::Detached(id) => Some(*id),
                Head::Branch(_) => None,
            },
        }
    }
}

impl RefStore for MemoryRefs {
    fn read(&self, name: &str) -> Result<Option<Id>> {
        check_ref_name(name)?;
        Ok(self.inner.lock().current(name))
    }

    fn head(&self) -> Result<Head> {
        Ok(self.inner.lock().head.clone())
    }

    fn set_head(&self, head: &Head) -> Result<()> {
        if let Head::Branch(name) = head {
            check_ref_name(name)?;
        }

        self.inner.lock().head = head.clone();
        Ok(())
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

        let mut inner = self.inner.lock();
        let old = inner.current(name);
        check_expected(name, expected_old, old.as_ref())?;

        tracing::debug!(name, %new, "updating reference");

        if name == "HEAD" {
            inner.head = Head::Detached(*new);
        } else {
            inner.refs.insert(name.to_string(), *new);
        }

        let entry = ReflogEntry::new(old, *new, committer.clone(), message);

        // Moving the checked-out branch moves HEAD too.
        let on_branch = matches!(&inner.head, Head::Branch(branch) if branch == name);
        if on_branch {
            inner
                .logs
                .entry("HEAD".to_string())
                .or_default()
                .push(entry.clone());
        }

        inner.logs.entry(name.to_string()).or_default().push(entry);

        Ok(())
    }

    fn delete(&self, name: &str, expected_old: &Id) -> Result<()> {
        check_ref_name(name)?;

        let mut inner = self.inner.lock();
        let old = inner.refs.get(name).copied();
        check_expected(name, Some(expected_old), old.as_ref())?;

        tracing::debug!(name, "deleting reference");

        inner.refs.remove(name);
        inner.logs.remove(name);
        Ok(())
    }

    fn reflog(&self, name: &str) -> Result<Vec<ReflogEntry>> {
        check_ref_name(name)?;
        Ok(self
            .inner
            .lock()
            .logs
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    fn rewrite_reflog(
        &self,
        name: &str,
        expected: &[ReflogEntry],
        entries: Vec<ReflogEntry>,
    ) -> Result<()> {
        check_ref_name(name)?;

        let mut inner = self.inner.lock();
        let old = inner.refs.get(name).copied();
        let log = inner.logs.get(name).map(Vec::as_slice).unwrap_or_default();
        check_expected_log(name, expected, old.as_ref(), log)?;

        match entries.last() {
            Some(newest) => {
                let newest = *newest.new_id();
                inner.refs.insert(name.to_string(), newest);
                inner.logs.insert(name.to_string(), entries);
            }
            None => {
                inner.refs.remove(name);
                inner.logs.remove(name);
            }
        }

        Ok(())
    }
}
