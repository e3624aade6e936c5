//! Named references, their reflogs, and compare-and-swap updates.
//!
//! Every mutation of a reference states the value the caller expects the
//! reference to hold. If another writer got there first the update fails
//! with [`Error::RefConflict`] and nothing changes; the caller re-reads and
//! decides whether to try again. This is the only point where concurrent
//! writers to one repository need to coordinate.

use std::fmt;

use crate::error::{Error, Result};
use crate::object::{Id, Signature};

mod files;
pub use files::FileRefs;

mod memory;
pub use memory::MemoryRefs;

/// Name of the reference holding the most recent stash.
pub const STASH_REF: &str = "refs/stash";

/// What `HEAD` points at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Head {
    /// `HEAD` names a branch (which may not exist yet).
    Branch(String),

    /// `HEAD` names a commit directly.
    Detached(Id),
}

impl Head {
    /// Short branch name (`master` for `refs/heads/master`), if on a branch.
    pub fn branch_name(&self) -> Option<&str> {
        match self {
            Head::Branch(name) => Some(name.strip_prefix("refs/heads/").unwrap_or(name)),
            Head::Detached(_) => None,
        }
    }
}

/// One line of a reference's log.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReflogEntry {
    old: Option<Id>,
    new: Id,
    committer: Signature,
    message: String,
}

impl ReflogEntry {
    pub fn new(old: Option<Id>, new: Id, committer: Signature, message: &str) -> ReflogEntry {
        // A reflog line ends at the first newline; git keeps only the first line.
        let message = message.lines().next().unwrap_or("").to_string();
        ReflogEntry {
            old,
            new,
            committer,
            message,
        }
    }

    /// Previous value of the reference (`None` if it was just created).
    pub fn old(&self) -> Option<&Id> {
        self.old.as_ref()
    }

    /// Value the reference was set to.
    pub fn new_id(&self) -> &Id {
        &self.new
    }

    pub fn committer(&self) -> &Signature {
        &self.committer
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn with_old(mut self, old: Option<Id>) -> ReflogEntry {
        self.old = old;
        self
    }

    /// Parse one reflog line (without its trailing newline).
    pub fn parse(line: &[u8]) -> Option<ReflogEntry> {
        if line.len() < 82 || line[40] != b' ' || line[81] != b' ' {
            return None;
        }

        let old = Id::from_hex_or_zero(&line[..40]).ok()?;
        let new = Id::from_hex(&line[41..81]).ok()?;

        let rest = &line[82..];
        let (sig, message) = match rest.iter().position(|b| *b == b'\t') {
            Some(n) => (&rest[..n], &rest[n + 1..]),
            None => (rest, &b""[..]),
        };

        let committer = Signature::parse(sig)?;
        let message = String::from_utf8(message.to_vec()).ok()?;

        Some(ReflogEntry {
            old,
            new,
            committer,
            message,
        })
    }
}

impl fmt::Display for ReflogEntry {
    /// Formats the entry as a reflog line, without the trailing newline.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}\t{}",
            Id::hex_or_zero(self.old.as_ref()),
            self.new,
            self.committer,
            self.message
        )
    }
}

/// A struct that implements `RefStore` represents a particular mechanism
/// for storing references and their logs.
///
/// All mutating methods are atomic with respect to each other for the
/// same reference name.
pub trait RefStore: Send + Sync {
    /// Read a reference. `HEAD` is resolved through its branch.
    ///
    /// Returns `Ok(None)` if the reference does not exist.
    fn read(&self, name: &str) -> Result<Option<Id>>;

    /// Read what `HEAD` points at.
    fn head(&self) -> Result<Head>;

    /// Point `HEAD` at a branch or commit.
    fn set_head(&self, head: &Head) -> Result<()>;

    /// Set `name` to `new` if it currently holds `expected_old`
    /// (`None`: if it doesn't exist yet), and append a reflog entry.
    ///
    /// Passing `HEAD` detaches it.
    fn update(
        &self,
        name: &str,
        new: &Id,
        expected_old: Option<&Id>,
        committer: &Signature,
        message: &str,
    ) -> Result<()>;

    /// Delete `name` and its log if it currently holds `expected_old`.
    fn delete(&self, name: &str, expected_old: &Id) -> Result<()>;

    /// The log of `name`, oldest entry first. Empty if there is none.
    fn reflog(&self, name: &str) -> Result<Vec<ReflogEntry>>;

    /// Replace the log of `name` if both the log and the reference are
    /// still exactly `expected`, as read by the caller. The reference moves
    /// to the newest entry's new value, or is deleted when `entries` is
    /// empty.
    ///
    /// Fails with [`Error::RefConflict`] if anything was pushed, dropped or
    /// moved in between; the caller should re-read and retry.
    fn rewrite_reflog(
        &self,
        name: &str,
        expected: &[ReflogEntry],
        entries: Vec<ReflogEntry>,
    ) -> Result<()>;
}

/// Check a reference name against git's `check-ref-format` rules.
pub fn check_ref_name(name: &str) -> Result<()> {
    let invalid = || Err(Error::InvalidRefName(name.to_string()));

    if name == "HEAD" {
        return Ok(());
    }

    if !name.starts_with("refs/")
        || name.ends_with('/')
        || name.ends_with('.')
        || name.contains("..")
        || name.contains("//")
        || name.contains("@{")
    {
        return invalid();
    }

    let bad_char = |c: char| c.is_ascii_control() || " ~^:?*[\\".contains(c);
    if name.chars().any(bad_char) {
        return invalid();
    }

    if name
        .split('/')
        .any(|part| part.is_empty() || part.starts_with('.') || part.ends_with(".lock"))
    {
        return invalid();
    }

    Ok(())
}

/// Compare a reference and its whole log against what the caller read.
pub(crate) fn check_expected_log(
    name: &str,
    expected: &[ReflogEntry],
    actual: Option<&Id>,
    actual_log: &[ReflogEntry],
) -> Result<()> {
    let expected_id = expected.last().map(ReflogEntry::new_id);
    check_expected(name, expected_id, actual)?;

    if actual_log != expected {
        tracing::warn!(
            name,
            expected = expected.len(),
            actual = actual_log.len(),
            "reflog changed since it was read"
        );

        return Err(Error::RefConflict {
            name: name.to_string(),
            expected: expected_id.copied(),
            actual: actual.copied(),
        });
    }

    Ok(())
}

/// Compare the current value of a reference against the caller's expectation.
pub(crate) fn check_expected(
    name: &str,
    expected: Option<&Id>,
    actual: Option<&Id>,
) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        tracing::warn!(
            name,
            expected = %Id::hex_or_zero(expected),
            actual = %Id::hex_or_zero(actual),
            "reference compare-and-swap failed"
        );

        Err(Error::RefConflict {
            name: name.to_string(),
            expected: expected.copied(),
            actual: actual.copied(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_names() {
        for good in &["HEAD", "refs/heads/master", "refs/stash", "refs/heads/a-b_c/d.e"] {
            assert!(check_ref_name(good).is_ok(), "rejected {}", good);
        }

        for bad in &[
            "master",
            "refs/heads/",
            "refs/heads/a..b",
            "refs/heads//a",
            "refs/heads/.hidden",
            "refs/heads/a.lock",
            "refs/heads/a b",
            "refs/heads/a~1",
            "refs/heads/a@{1}",
            "refs/heads/a.",
        ] {
            assert!(
                matches!(check_ref_name(bad), Err(Error::InvalidRefName(_))),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn reflog_line() {
        let new = Id::from_hex("3cd9329ac53613a0bfa198ae28f3af957e49573c").unwrap();
        let sig = Signature::new("A U Thor", "author@example.com", 1_142_878_501, 150).unwrap();
        let entry = ReflogEntry::new(None, new, sig, "On master: wip\nsecond line");

        let line = entry.to_string();
        assert_eq!(
            line,
            "0000000000000000000000000000000000000000 \
             3cd9329ac53613a0bfa198ae28f3af957e49573c \
             A U Thor <author@example.com> 1142878501 +0230\tOn master: wip"
        );

        assert_eq!(ReflogEntry::parse(line.as_bytes()).unwrap(), entry);
        assert_eq!(entry.message(), "On master: wip");
        assert!(entry.old().is_none());
    }

    #[test]
    fn reflog_line_garbage() {
        assert!(ReflogEntry::parse(b"").is_none());
        assert!(ReflogEntry::parse(&[b'x'; 100]).is_none());
    }

    #[test]
    fn head_branch_name() {
        assert_eq!(
            Head::Branch("refs/heads/topic".to_string()).branch_name(),
            Some("topic")
        );

        let id = Id::from_hex("3cd9329ac53613a0bfa198ae28f3af957e49573c").unwrap();
        assert_eq!(Head::Detached(id).branch_name(), None);
    }
}
