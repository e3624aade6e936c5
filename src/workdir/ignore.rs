/// A single line of an ignore file.
#[derive(Clone, Debug)]
struct Rule {
    /// Directory the rule was read from, with trailing `/` (empty for the top).
    base: String,
    pattern: Vec<u8>,
    negated: bool,
    dir_only: bool,
    anchored: bool,
}

impl Rule {
    fn parse(base: &str, line: &str) -> Option<Rule> {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (negated, line) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line.strip_prefix('\\').unwrap_or(line)),
        };

        let (dir_only, line) = match line.strip_suffix('/') {
            Some(rest) => (true, rest),
            None => (false, line),
        };

        let (anchored, line) = match line.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (line.contains('/'), line),
        };

        if line.is_empty() {
            return None;
        }

        Some(Rule {
            base: base.to_string(),
            pattern: line.as_bytes().to_vec(),
            negated,
            dir_only,
            anchored,
        })
    }

    fn matches(&self, path: &str, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }

        let rel = match path.strip_prefix(self.base.as_str()) {
            Some(rel) => rel,
            None => return false,
        };

        if self.anchored {
            glob_match(&self.pattern, rel.as_bytes())
        } else {
            let name = rel.rsplit('/').next().unwrap_or(rel);
            glob_match(&self.pattern, name.as_bytes())
        }
    }
}

/// Patterns from `.gitignore` files and `info/exclude`.
///
/// Later rules take precedence over earlier ones, so sources are added from
/// lowest to highest priority. A file inside an ignored directory is ignored
/// no matter what rules say about the file itself.
#[derive(Clone, Debug, Default)]
pub struct IgnoreRules {
    rules: Vec<Rule>,
}

impl IgnoreRules {
    pub fn new() -> IgnoreRules {
        IgnoreRules::default()
    }

    /// Add the lines of one ignore file read from directory `base`
    /// (`""` for the top of the tree, otherwise ending in `/`).
    pub fn add_source(&mut self, base: &str, text: &str) {
        self.rules
            .extend(text.lines().filter_map(|line| Rule::parse(base, line)));
    }

    pub fn is_ignored(&self, path: &str, is_dir: bool) -> bool {
        let mut end = 0;
        while let Some(n) = path[end..].find('/') {
            end += n;
            if self.last_match(&path[..end], true) {
                return true;
            }
            end += 1;
        }

        self.last_match(path, is_dir)
    }

    fn last_match(&self, path: &str, is_dir: bool) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(path, is_dir))
            .map_or(false, |rule| !rule.negated)
    }
}

/// Match `text` against a gitignore glob.
///
/// `*` and `?` never match `/`. `**` matches across directories.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.first() {
        None => text.is_empty(),

        Some(b'*') if pattern.get(1) == Some(&b'*') => {
            let after = &pattern[2..];
            match after.strip_prefix(b"/") {
                Some(rest) => {
                    glob_match(rest, text)
                        || text
                            .iter()
                            .enumerate()
                            .any(|(i, c)| *c == b'/' && glob_match(rest, &text[i + 1..]))
                }
                None => (0..=text.len()).any(|i| glob_match(after, &text[i..])),
            }
        }

        Some(b'*') => {
            for i in 0..=text.len() {
                if glob_match(&pattern[1..], &text[i..]) {
                    return true;
                }
                if i < text.len() && text[i] == b'/' {
                    break;
                }
            }
            false
        }

        Some(b'?') => match text.first() {
            Some(c) if *c != b'/' => glob_match(&pattern[1..], &text[1..]),
            _ => false,
        },

        Some(b'[') => match (class_match(&pattern[1..], text.first()), text.first()) {
            (Some((true, len)), Some(_)) => glob_match(&pattern[len + 1..], &text[1..]),
            (Some((false, _)), _) | (_, None) => false,
            (None, Some(c)) => *c == b'[' && glob_match(&pattern[1..], &text[1..]),
        },

        Some(b'\\') if pattern.len() > 1 => {
            text.first() == Some(&pattern[1]) && glob_match(&pattern[2..], &text[1..])
        }

        Some(c) => text.first() == Some(c) && glob_match(&pattern[1..], &text[1..]),
    }
}

/// Match one character against a `[...]` class whose body starts at
/// `class`. Returns whether it matched and the length of the class body
/// including the closing `]`, or `None` if the class isn't terminated.
fn class_match(class: &[u8], c: Option<&u8>) -> Option<(bool, usize)> {
    let (negated, start) = match class.first() {
        Some(b'!') | Some(b'^') => (true, 1),
        _ => (false, 0),
    };

    // A `]` right after the opening bracket is a literal.
    let close = class
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, b)| **b == b']')
        .map(|(i, _)| i)?;

    let c = match c {
        Some(c) if *c != b'/' => *c,
        _ => return Some((false, close + 1)),
    };

    let body = &class[start..close];
    let mut matched = false;
    let mut i = 0;
    while i < body.len() {
        if i + 2 < body.len() && body[i + 1] == b'-' {
            if body[i] <= c && c <= body[i + 2] {
                matched = true;
            }
            i += 3;
        } else {
            if body[i] == c {
                matched = true;
            }
            i += 1;
        }
    }

    Some((matched != negated, close + 1))
}
