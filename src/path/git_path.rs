use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Reasons why a given byte sequence can not be accepted as a git repo path
/// or as the name of a single tree entry.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum GitPathError {
    #[error("path is empty")]
    EmptyPath,

    #[error("path is absolute")]
    AbsolutePath,

    #[error("path ends with a slash")]
    TrailingSlash,

    #[error("path contains an empty component")]
    DuplicateSlash,

    #[error("name contains a slash")]
    ContainsSlash,

    #[error("name contains a NUL byte")]
    ContainsNull,

    #[error("name is `.` or `..`")]
    DotOrDotDot,

    #[error("name refers to the .git directory")]
    DotGit,
}

/// Check that `path` is acceptable as a `/`-separated path inside a repo.
///
/// Every component must itself pass [`check_name`].
pub fn check_path(path: &[u8]) -> Result<(), GitPathError> {
    if path.is_empty() {
        Err(GitPathError::EmptyPath)
    } else if path.starts_with(b"/") {
        Err(GitPathError::AbsolutePath)
    } else if path.ends_with(b"/") {
        Err(GitPathError::TrailingSlash)
    } else {
        for segment in path.split(|c| *c == b'/') {
            match check_name(segment) {
                Err(GitPathError::EmptyPath) => Err(GitPathError::DuplicateSlash),
                x => x,
            }?;
        }
        Ok(())
    }
}

/// Check that `name` is acceptable as a single tree entry name.
pub fn check_name(name: &[u8]) -> Result<(), GitPathError> {
    if name.is_empty() {
        Err(GitPathError::EmptyPath)
    } else if name.contains(&0) {
        Err(GitPathError::ContainsNull)
    } else if name.contains(&b'/') {
        Err(GitPathError::ContainsSlash)
    } else if name == b"." || name == b".." {
        Err(GitPathError::DotOrDotDot)
    } else if is_dot_git_alias(name) {
        Err(GitPathError::DotGit)
    } else {
        Ok(())
    }
}

/// Returns true if some file system would open `name` as `.git`.
///
/// Covers case folding, the NTFS short name `git~1`, NTFS dropping trailing
/// dots and spaces, and HFS+ ignoring some zero-width code points.
fn is_dot_git_alias(name: &[u8]) -> bool {
    if name.eq_ignore_ascii_case(b"git~1") {
        return true;
    }

    let trimmed = match name.iter().rposition(|c| *c != b'.' && *c != b' ') {
        Some(end) => &name[..=end],
        None => return false,
    };
    if trimmed.eq_ignore_ascii_case(b".git") {
        return true;
    }

    match std::str::from_utf8(name) {
        Ok(name) if name.is_ascii() => false,
        Ok(name) => {
            let visible: String = name.chars().filter(|c| !is_hfs_ignorable(*c)).nfc().collect();
            visible.to_lowercase() == ".git"
        }
        // HFS+ would refuse this name anyway; treat `.git` followed by
        // garbage as an attempt at the real thing.
        Err(_) => name.len() > 4 && name[..4].eq_ignore_ascii_case(b".git"),
    }
}

fn is_hfs_ignorable(c: char) -> bool {
    matches!(c,
        '\u{200C}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{206A}'..='\u{206F}' | '\u{FEFF}')
}
