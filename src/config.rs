//! Git configuration files (`.git/config`).

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};
use crate::object::Signature;

#[derive(Clone, Debug, Eq, PartialEq)]
struct Entry {
    /// Lowercased section name.
    section: String,
    /// Subsection names are case-sensitive.
    subsection: Option<String>,
    /// Lowercased key.
    key: String,
    value: String,
}

/// A parsed git configuration file.
///
/// Keys are addressed as `section.key` or `section.subsection.key`.
/// When a key appears more than once the last value wins.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Config {
    entries: Vec<Entry>,
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Read a configuration file. A missing file is an empty configuration.
    pub fn load(path: &Path) -> Result<Config> {
        match fs::read_to_string(path) {
            Ok(text) => Config::parse(&text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Config::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Parse the text of a configuration file.
    pub fn parse(text: &str) -> Result<Config> {
        let mut entries = Vec::new();
        let mut section: Option<(String, Option<String>)> = None;

        let mut lines = text.lines().enumerate();
        while let Some((n, line)) = lines.next() {
            let line_no = n + 1;
            let bad = |reason: &str| Error::BadConfig {
                line: line_no,
                reason: reason.to_string(),
            };

            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let close = rest
                    .find(']')
                    .ok_or_else(|| bad("unterminated section header"))?;
                let header = parse_section(&rest[..close]).ok_or_else(|| bad("bad section header"))?;
                section = Some(header);

                // Keys start on their own line.
                let rest = rest[close + 1..].trim();
                if rest.is_empty() || rest.starts_with('#') || rest.starts_with(';') {
                    continue;
                }
                return Err(bad("text after section header"));
            }

            let (section, subsection) = section
                .clone()
                .ok_or_else(|| bad("key outside of any section"))?;

            let (key, raw) = match line.find('=') {
                Some(n) => (line[..n].trim(), Some(line[n + 1..].to_string())),
                None => (line, None),
            };

            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return Err(bad("bad key name"));
            }

            let value = match raw {
                // A bare key is boolean true.
                None => "true".to_string(),
                Some(mut raw) => {
                    while raw.trim_end().ends_with('\\') && !raw.trim_end().ends_with("\\\\") {
                        let trimmed = raw.trim_end();
                        raw = trimmed[..trimmed.len() - 1].to_string();
                        match lines.next() {
                            Some((_, next)) => raw.push_str(next),
                            None => break,
                        }
                    }
                    parse_value(&raw).ok_or_else(|| bad("bad value"))?
                }
            };

            entries.push(Entry {
                section,
                subsection,
                key: key.to_ascii_lowercase(),
                value,
            });
        }

        Ok(Config { entries })
    }

    /// Look up a value by its dotted name.
    pub fn get(&self, name: &str) -> Option<&str> {
        let (section, subsection, key) = split_name(name)?;

        self.entries
            .iter()
            .rev()
            .find(|e| {
                e.section == section && e.subsection.as_deref() == subsection && e.key == key
            })
            .map(|e| e.value.as_str())
    }

    /// Look up a boolean value (`true`/`yes`/`on`/`1` or their opposites).
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)?.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" | "" => Some(false),
            _ => None,
        }
    }

    /// Set a value, replacing any existing ones.
    pub fn set(&mut self, name: &str, value: &str) {
        let (section, subsection, key) = match split_name(name) {
            Some(parts) => parts,
            None => return,
        };

        self.entries.retain(|e| {
            !(e.section == section && e.subsection.as_deref() == subsection && e.key == key)
        });

        self.entries.push(Entry {
            section,
            subsection: subsection.map(str::to_string),
            key,
            value: value.to_string(),
        });
    }

    /// The user's identity at the current local time.
    ///
    /// `GIT_COMMITTER_NAME` and `GIT_COMMITTER_EMAIL` take precedence over
    /// `user.name` and `user.email`.
    pub fn user_signature_now(&self) -> Result<Signature> {
        let (name, email) = self.identity(|var| std::env::var(var).ok())?;
        Signature::now(&name, &email)
    }

    fn identity<F>(&self, env: F) -> Result<(String, String)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name =
            env("GIT_COMMITTER_NAME").or_else(|| self.get("user.name").map(str::to_string));
        let email =
            env("GIT_COMMITTER_EMAIL").or_else(|| self.get("user.email").map(str::to_string));

        match (name, email) {
            (Some(name), Some(email)) => Ok((name, email)),
            _ => Err(Error::MissingIdentity),
        }
    }
}

fn split_name(name: &str) -> Option<(String, Option<&str>, String)> {
    let first = name.find('.')?;
    let last = name.rfind('.')?;

    let section = name[..first].to_ascii_lowercase();
    let key = name[last + 1..].to_ascii_lowercase();
    let subsection = if first == last {
        None
    } else {
        Some(&name[first + 1..last])
    };

    Some((section, subsection, key))
}

/// Parse `name` or `name "subsection"` (or the old `name.subsection`).
fn parse_section(header: &str) -> Option<(String, Option<String>)> {
    let header = header.trim();

    if let Some(quote) = header.find('"') {
        let name = header[..quote].trim();
        let sub = header[quote + 1..].strip_suffix('"')?;

        let mut subsection = String::new();
        let mut chars = sub.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => subsection.push(chars.next()?),
                '"' => return None,
                c => subsection.push(c),
            }
        }

        return valid_section(name).then(|| (name.to_ascii_lowercase(), Some(subsection)));
    }

    match header.split_once('.') {
        Some((name, sub)) => valid_section(name)
            .then(|| (name.to_ascii_lowercase(), Some(sub.to_ascii_lowercase()))),
        None => valid_section(header).then(|| (header.to_ascii_lowercase(), None)),
    }
}

fn valid_section(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

/// Unquote a value, drop trailing comments and apply escapes.
fn parse_value(raw: &str) -> Option<String> {
    let mut value = String::new();
    let mut in_quotes = false;
    // Whitespace is kept only between words, never at the ends.
    let mut pending_space = String::new();

    let mut chars = raw.trim_start().chars();
    while let Some(c) = chars.next() {
        match c {
            '#' | ';' if !in_quotes => break,
            '"' => {
                value.push_str(&pending_space);
                pending_space.clear();
                in_quotes = !in_quotes;
            }
            '\\' => {
                value.push_str(&pending_space);
                pending_space.clear();
                match chars.next()? {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'b' => {
                        value.pop();
                    }
                    c @ ('\\' | '"') => value.push(c),
                    _ => return None,
                }
            }
            c if c.is_whitespace() && !in_quotes => pending_space.push(c),
            c => {
                value.push_str(&pending_space);
                pending_space.clear();
                value.push(c);
            }
        }
    }

    if in_quotes {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    const INIT_CONFIG: &str = "[core]\n\trepositoryformatversion = 0\n\tfilemode = true\n\tbare = false\n\tlogallrefupdates = true\n";

    #[test]
    fn reads_init_config() {
        let c = Config::parse(INIT_CONFIG).unwrap();
        assert_eq!(c.get("core.repositoryformatversion"), Some("0"));
        assert_eq!(c.get_bool("core.bare"), Some(false));
        assert_eq!(c.get_bool("core.logAllRefUpdates"), Some(true));
        assert_eq!(c.get("user.name"), None);
    }

    #[test]
    fn sections_and_values() {
        let c = Config::parse(
            "[User]\n\
             \tName = \"A U Thor\"  ; trailing comment\n\
             \temail=author@example.com\n\
             [remote \"Origin\"]\n\
             \turl = git://example.com/x.git\n\
             [core]\n\
             \tbare\n\
             \tpath = a\\\\b \"  x \"\n\
             \tnote = one\\ttwo # comment\n",
        )
        .unwrap();

        assert_eq!(c.get("user.name"), Some("A U Thor"));
        assert_eq!(c.get("USER.EMAIL"), Some("author@example.com"));
        assert_eq!(c.get("remote.Origin.url"), Some("git://example.com/x.git"));
        assert_eq!(c.get("remote.origin.url"), None);
        assert_eq!(c.get_bool("core.bare"), Some(true));
        assert_eq!(c.get("core.path"), Some("a\\b   x "));
        assert_eq!(c.get("core.note"), Some("one\ttwo"));
    }

    #[test]
    fn last_value_wins_and_set() {
        let mut c = Config::parse("[user]\n\tname = one\n\tname = two\n").unwrap();
        assert_eq!(c.get("user.name"), Some("two"));

        c.set("user.name", "three");
        c.set("user.email", "three@example.com");
        assert_eq!(c.get("user.name"), Some("three"));
        assert_eq!(c.get("user.email"), Some("three@example.com"));
    }

    #[test]
    fn continuation_lines() {
        let c = Config::parse("[alias]\n\tlong = one \\\ntwo\n").unwrap();
        assert_eq!(c.get("alias.long"), Some("one two"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Config::parse("key = value\n"),
            Err(Error::BadConfig { line: 1, .. })
        ));
        assert!(matches!(
            Config::parse("[core\n"),
            Err(Error::BadConfig { line: 1, .. })
        ));
        assert!(matches!(
            Config::parse("[core]\n\tx = \"open\n"),
            Err(Error::BadConfig { line: 2, .. })
        ));
        assert!(matches!(
            Config::parse("# header\n[core] bare = true\n"),
            Err(Error::BadConfig { line: 2, .. })
        ));
    }

    #[test]
    fn identity_precedence() {
        let mut c = Config::new();
        assert!(matches!(c.identity(|_| None), Err(Error::MissingIdentity)));

        c.set("user.name", "Config Name");
        c.set("user.email", "config@example.com");
        assert_eq!(
            c.identity(|_| None).unwrap(),
            ("Config Name".to_string(), "config@example.com".to_string())
        );

        let env = |var: &str| match var {
            "GIT_COMMITTER_NAME" => Some("Env Name".to_string()),
            _ => None,
        };
        assert_eq!(
            c.identity(env).unwrap(),
            ("Env Name".to_string(), "config@example.com".to_string())
        );
    }

    #[test]
    fn load_missing_file() {
        let dir = tempdir().unwrap();
        assert_eq!(Config::load(&dir.path().join("config")).unwrap(), Config::new());

        let path = dir.path().join("config");
        fs::write(&path, INIT_CONFIG).unwrap();
        assert_eq!(Config::load(&path).unwrap().get("core.filemode"), Some("true"));
    }
}
