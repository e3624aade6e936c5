use std::fmt;
use std::str::{self, FromStr};

use chrono::{Local, Offset};

use super::parse_utils::split_once;
use crate::error::{Error, Result};

/// A `Signature` combines a person's identity (name and e-mail address)
/// with the timestamp for a particular action.
///
/// Signatures appear as the author and committer of commits, the tagger
/// of tags, and on every reflog line.
///
/// The `timestamp` value is in seconds relative to the Unix epoch and
/// `tz_offset` is in minutes relative to GMT.
///
/// A signature parsed from an existing object keeps its original text when
/// that text is not what git would write today (`-0000`, missing dates,
/// odd spacing), so re-encoding the object reproduces its ID.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Signature {
    name: String,
    email: String,
    timestamp: i64,
    tz_offset: i16,
    raw: Option<String>,
}

impl Signature {
    /// Creates a new signature.
    ///
    /// Fails if the name or e-mail address can't be written into an object
    /// unchanged (angle brackets, control characters, or leading and
    /// trailing whitespace) or if the time zone offset is outside
    /// -12:00..=+14:00.
    pub fn new(name: &str, email: &str, timestamp: i64, tz_offset: i16) -> Result<Signature> {
        check_identity("name", name)?;
        check_identity("email", email)?;

        if !(-720..=840).contains(&tz_offset) {
            return Err(Error::InvalidSignature(format!(
                "illegal time zone offset: {}",
                tz_offset
            )));
        }

        Ok(Signature {
            name: name.to_string(),
            email: email.to_string(),
            timestamp,
            tz_offset,
            raw: None,
        })
    }

    /// Creates a signature stamped with the current local time.
    pub fn now(name: &str, email: &str) -> Result<Signature> {
        let now = Local::now();
        let tz_offset = (now.offset().fix().local_minus_utc() / 60) as i16;
        Signature::new(name, email, now.timestamp(), tz_offset)
    }

    /// Parse a name line (e.g. author, committer, tagger) into a `Signature`.
    /// Returns `None` if unable to parse the line properly.
    ///
    /// Missing or garbled timestamps and time zones parse as zero, the same
    /// leniency command-line git applies when reading old objects. The line
    /// itself is kept and written back verbatim.
    pub fn parse(line: &[u8]) -> Option<Signature> {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let text = str::from_utf8(line).ok()?;

        let (name, rest) = split_once(line, &b'<');
        let name = name.strip_suffix(b" ").unwrap_or(name);
        let name = str::from_utf8(name).ok()?.to_string();

        if !rest.contains(&b'>') {
            return None;
        }

        let (email, rest) = split_once(rest, &b'>');
        let email = str::from_utf8(email).ok()?.to_string();

        let mut words = rest
            .split(|b| *b == b' ')
            .filter(|w| !w.is_empty())
            .rev();

        let (timestamp, tz_offset) = match (words.next(), words.next()) {
            (Some(tz), Some(ts)) => match parse_timestamp(ts) {
                Some(ts) => (ts, parse_tz(tz).unwrap_or(0)),
                None => (0, 0),
            },
            _ => (0, 0),
        };

        let mut sig = Signature {
            name,
            email,
            timestamp,
            tz_offset,
            raw: None,
        };

        if sig.to_string() != text {
            sig.raw = Some(text.to_string());
        }

        Some(sig)
    }

    /// Returns the person's human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the person's email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the timestamp.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Returns the timezone offset (minutes relative to GMT).
    pub fn tz_offset(&self) -> i16 {
        self.tz_offset
    }

    /// Returns the timezone formatted as a human readable offset from GMT.
    pub fn format_tz(&self) -> String {
        let sign = if self.tz_offset < 0 { "-" } else { "+" };

        let offset = self.tz_offset.abs();
        format!("{}{:02}{:02}", sign, offset / 60, offset % 60)
    }
}

fn check_identity(field: &str, value: &str) -> Result<()> {
    let bad = value.trim() != value
        || value.chars().any(|c| c == '<' || c == '>' || c.is_control());

    if bad {
        return Err(Error::InvalidSignature(format!(
            "{} `{}` can't be written into an object",
            field,
            value.escape_debug()
        )));
    }

    Ok(())
}

fn parse_timestamp(s: &[u8]) -> Option<i64> {
    i64::from_str(str::from_utf8(s).ok()?).ok()
}

fn parse_tz(s: &[u8]) -> Option<i16> {
    if s.len() != 5 {
        return None;
    }

    let sign: i16 = match s[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };

    let digits = s[1..]
        .iter()
        .map(|c| match c {
            b'0'..=b'9' => Some((c - b'0') as i16),
            _ => None,
        })
        .collect::<Option<Vec<i16>>>()?;

    let hh = digits[0] * 10 + digits[1];
    let mm = digits[2] * 10 + digits[3];
    Some(sign * (hh * 60 + mm))
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(raw) = &self.raw {
            return f.write_str(raw);
        }

        write!(
            f,
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp,
            self.format_tz()
        )
    }
}
