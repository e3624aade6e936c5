use std::fmt::{self, Write};
use std::str::FromStr;

use sha1::{Digest, Sha1};
use thiserror::Error;

/// Length in bytes of a SHA-1 object ID.
pub const ID_LEN: usize = 20;

/// An error which can be returned when parsing a git object ID.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ParseIdError {
    /// Value being parsed is empty.
    #[error("cannot parse object ID from empty string")]
    Empty,

    /// Contains an invalid digit.
    ///
    /// Among other causes, this variant will be constructed when parsing a string that
    /// contains an uppercase letter.
    #[error("value contains invalid digit `{0}`")]
    InvalidDigit(char),

    /// ID is longer than 20 bytes (40 hex digits).
    #[error("value is more than 40 digits long")]
    Overflow,

    /// ID is shorter than 20 bytes (40 hex digits).
    #[error("value is less than 40 digits long")]
    Underflow,

    /// Value was zero.
    #[error("ID would be zero")]
    Zero,
}

/// An object ID is the SHA-1 hash that identifies an object within a repository.
/// It is stored as a 20-byte signature, but can also be represented as 40 hex digits.
///
/// IDs are plain values. Holding one does not keep the object it names alive.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Id {
    id: [u8; ID_LEN],
}

impl Id {
    /// Create a new ID from a 20-byte slice.
    ///
    /// It is an error if the slice contains anything other than 20 bytes.
    pub fn new(id: &[u8]) -> Result<Id, ParseIdError> {
        match id.len() {
            ID_LEN => {
                let mut bytes = [0u8; ID_LEN];
                bytes.copy_from_slice(id);
                Ok(Id { id: bytes })
            }
            0 => Err(ParseIdError::Empty),
            n if n < ID_LEN => Err(ParseIdError::Underflow),
            _ => Err(ParseIdError::Overflow),
        }
    }

    /// Convert a 40-character hex ID to an object ID.
    ///
    /// It is an error if the ID contains anything other than 40 lowercase hex digits,
    /// or if every digit is zero (git uses the all-zero ID to mean "no object").
    pub fn from_hex<T: AsRef<[u8]>>(id: T) -> Result<Id, ParseIdError> {
        let hex = id.as_ref();

        match hex.len() {
            40 => {
                let mut bytes = [0u8; ID_LEN];
                for (byte, pair) in bytes.iter_mut().zip(hex.chunks(2)) {
                    *byte = digit_value(pair[0])? << 4 | digit_value(pair[1])?;
                }

                if bytes.iter().all(|x| *x == 0) {
                    Err(ParseIdError::Zero)
                } else {
                    Ok(Id { id: bytes })
                }
            }
            0 => Err(ParseIdError::Empty),
            n if n < 40 => Err(ParseIdError::Underflow),
            _ => Err(ParseIdError::Overflow),
        }
    }

    /// Parse a hex ID where 40 zeros stand for "no object", as in reflog lines.
    pub fn from_hex_or_zero<T: AsRef<[u8]>>(id: T) -> Result<Option<Id>, ParseIdError> {
        match Id::from_hex(id) {
            Ok(id) => Ok(Some(id)),
            Err(ParseIdError::Zero) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Hash a complete git object: `"<kind> <len>\0"` followed by `body`.
    pub fn hash_object(kind: &str, body: &[u8]) -> Id {
        let mut hasher = Sha1::new();

        hasher.update(kind.as_bytes());
        hasher.update(b" ");
        hasher.update(body.len().to_string().as_bytes());
        hasher.update(b"\0");
        hasher.update(body);

        let mut id = [0u8; ID_LEN];
        id.copy_from_slice(hasher.finalize().as_slice());
        Id { id }
    }

    /// Return the raw 20 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.id
    }

    /// The first seven hex digits, as git prints in one-line summaries.
    pub fn short(&self) -> String {
        let mut s = self.to_string();
        s.truncate(7);
        s
    }

    /// Render an optional ID the way reflogs do: 40 zeros for `None`.
    pub(crate) fn hex_or_zero(id: Option<&Id>) -> String {
        match id {
            Some(id) => id.to_string(),
            None => "0".repeat(40),
        }
    }
}

impl FromStr for Id {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Id::from_hex(s.as_bytes())
    }
}

static CHARS: &[u8] = b"0123456789abcdef";

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in self.id.iter() {
            f.write_char(CHARS[(byte >> 4) as usize].into())?;
            f.write_char(CHARS[(byte & 0xf) as usize].into())?;
        }

        Ok(())
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

fn digit_value(c: u8) -> Result<u8, ParseIdError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(ParseIdError::InvalidDigit(c as char)),
    }
}
