//! Reads and writes git's binary index file (`.git/index`).
//!
//! Versions 2 and 3 are understood. Extensions are skipped on read and not
//! written back; git rebuilds the ones it needs. Entries in stages 1-3 are
//! not kept, but their paths are recorded as conflicts on the [`Index`].

use sha1::{Digest, Sha1};

use super::{Index, IndexEntry, StatData};
use crate::error::{Error, Result};
use crate::object::{Id, ID_LEN};
use crate::path::FileMode;

const SIGNATURE: &[u8; 4] = b"DIRC";
const HEADER_LEN: usize = 12;

/// Fixed-size part of an entry, before the path name.
const ENTRY_FIXED_LEN: usize = 62;

const FLAG_EXTENDED: u16 = 0x4000;
const FLAG_STAGE_MASK: u16 = 0x3000;
const NAME_MASK: u16 = 0x0fff;

fn corrupt<T>(reason: &str) -> Result<T> {
    Err(Error::CorruptIndex(reason.to_string()))
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return corrupt("unexpected end of file");
        }

        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }
}

/// Parse the content of an index file.
pub(crate) fn parse(data: &[u8]) -> Result<Index> {
    if data.len() < HEADER_LEN + ID_LEN {
        return corrupt("file too short");
    }

    let (content, trailer) = data.split_at(data.len() - ID_LEN);
    if Sha1::digest(content).as_slice() != trailer {
        return corrupt("checksum mismatch");
    }

    let mut r = Reader {
        data: content,
        pos: 0,
    };

    if r.take(4)? != SIGNATURE {
        return corrupt("bad signature");
    }

    let version = r.u32()?;
    if version != 2 && version != 3 {
        return corrupt(&format!("unsupported version {}", version));
    }

    let count = r.u32()?;
    let mut index = Index::new();

    for _ in 0..count {
        let start = r.pos;

        let ctime = (r.u32()?, r.u32()?);
        let mtime = (r.u32()?, r.u32()?);
        let dev = r.u32()?;
        let ino = r.u32()?;
        let mode = r.u32()?;
        let uid = r.u32()?;
        let gid = r.u32()?;
        let size = r.u32()?;

        let id = r.take(ID_LEN)?;
        let flags = r.u16()?;

        let mut fixed = ENTRY_FIXED_LEN;
        if flags & FLAG_EXTENDED != 0 {
            if version < 3 {
                return corrupt("extended flags in a version 2 index");
            }
            r.u16()?;
            fixed += 2;
        }

        let name_len = match flags & NAME_MASK {
            NAME_MASK => match content[r.pos..].iter().position(|b| *b == 0) {
                Some(n) => n,
                None => return corrupt("unterminated path name"),
            },
            n => n as usize,
        };

        let name = r.take(name_len)?;
        let name = match std::str::from_utf8(name) {
            Ok(name) => name.to_string(),
            Err(_) => return corrupt("path name is not UTF-8"),
        };

        // Entries are NUL-padded to a multiple of eight bytes.
        let padded = (fixed + name_len + 8) & !7;
        r.take(start + padded - r.pos)?;

        let mode = match FileMode::from_value(mode) {
            Some(mode) => mode,
            None => return corrupt(&format!("unsupported mode {:o} for `{}`", mode, name)),
        };

        let id = match Id::new(id) {
            Ok(id) => id,
            Err(_) => return corrupt("bad object ID"),
        };

        if flags & FLAG_STAGE_MASK != 0 {
            tracing::debug!(path = %name, "unmerged index entry");
            index.mark_conflicted(name);
            continue;
        }

        let stat = StatData {
            ctime,
            mtime,
            dev,
            ino,
            uid,
            gid,
            size,
        };

        index.insert(name, IndexEntry::new(mode, id).with_stat(stat));
    }

    // Whatever is left are extensions, which we don't use.
    Ok(index)
}

/// Serialize an index as a version 2 index file.
pub(crate) fn encode(index: &Index) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + index.len() * 96 + ID_LEN);

    out.extend_from_slice(SIGNATURE);
    out.extend_from_slice(&2u32.to_be_bytes());
    out.extend_from_slice(&(index.len() as u32).to_be_bytes());

    for (path, entry) in index.iter() {
        let start = out.len();
        let stat = entry.stat();

        for value in &[
            stat.ctime.0,
            stat.ctime.1,
            stat.mtime.0,
            stat.mtime.1,
            stat.dev,
            stat.ino,
            entry.mode().to_value(),
            stat.uid,
            stat.gid,
            stat.size,
        ] {
            out.extend_from_slice(&value.to_be_bytes());
        }

        out.extend_from_slice(entry.id().as_bytes());

        let flags = path.len().min(NAME_MASK as usize) as u16;
        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(path.as_bytes());

        let padded = (ENTRY_FIXED_LEN + path.len() + 8) & !7;
        out.resize(start + padded, 0);
    }

    let checksum = Sha1::digest(&out);
    out.extend_from_slice(checksum.as_slice());
    out
}
