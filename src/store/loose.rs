use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;

use super::{verify_raw, ObjectStore};
use crate::error::{Error, Result};
use crate::object::{Id, Object};

/// Stores objects as zlib-compressed loose files under `.git/objects`,
/// using the same layout as command-line git (`objects/d6/70460b...`).
#[derive(Debug)]
pub struct LooseStore {
    objects_dir: PathBuf,
}

impl LooseStore {
    /// Create a store rooted at an existing `objects` directory.
    pub fn new<P: Into<PathBuf>>(objects_dir: P) -> LooseStore {
        LooseStore {
            objects_dir: objects_dir.into(),
        }
    }

    /// Return the path where the object with the given ID lives.
    pub fn object_path(&self, id: &Id) -> PathBuf {
        let hex = id.to_string();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    fn write_new(&self, path: &Path, raw_header: &[u8], body: &[u8]) -> io::Result<()> {
        let dir = path.parent().unwrap_or(&self.objects_dir);
        fs::create_dir_all(dir)?;

        // Write to a temporary file in the same directory, then link it into
        // place. A reader never sees a partially written object.
        let temp = NamedTempFile::new_in(dir)?;
        {
            let mut encoder = ZlibEncoder::new(temp.as_file(), Compression::default());
            encoder.write_all(raw_header)?;
            encoder.write_all(body)?;
            encoder.finish()?;
        }

        match temp.persist_noclobber(path) {
            Ok(_) => Ok(()),
            // Someone else stored the same content first. Same ID, same bytes.
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(err) => Err(err.error),
        }
    }
}

impl ObjectStore for LooseStore {
    fn put(&self, object: &Object) -> Result<Id> {
        let body = object.encode();
        let kind = object.kind();
        let id = Id::hash_object(kind.as_str(), &body);

        let path = self.object_path(&id);
        if path.is_file() {
            return Ok(id);
        }

        tracing::debug!(%id, %kind, path = %path.display(), "writing loose object");

        let header = format!("{} {}\0", kind, body.len());
        self.write_new(&path, header.as_bytes(), &body)?;

        Ok(id)
    }

    fn get(&self, id: &Id) -> Result<Object> {
        let compressed = match fs::read(self.object_path(id)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::ObjectNotFound(*id))
            }
            Err(err) => return Err(err.into()),
        };

        let mut raw = Vec::new();
        if let Err(err) = ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut raw) {
            return Err(Error::Corrupt {
                id: *id,
                reason: format!("cannot inflate object: {}", err),
            });
        }

        verify_raw(id, &raw)
    }

    fn contains(&self, id: &Id) -> Result<bool> {
        Ok(self.object_path(id).is_file())
    }
}
