//! Content-addressed object storage.
//!
//! An [`ObjectStore`] maps object IDs to objects. The store is append-only:
//! objects are never modified once written, and writing an object that is
//! already present is a no-op. That makes concurrent writers safe without
//! any locking beyond what the backend needs internally.

use crate::error::Result;
use crate::object::{Id, Object};

mod loose;
pub use loose::LooseStore;

mod memory;
pub use memory::MemoryStore;

/// A struct that implements `ObjectStore` represents a particular mechanism
/// for storing git objects.
pub trait ObjectStore: Send + Sync {
    /// Store `object` and return its ID.
    ///
    /// Storing an object that already exists returns the same ID and does
    /// not write anything.
    fn put(&self, object: &Object) -> Result<Id>;

    /// Read the object with the given ID.
    ///
    /// Fails with [`Error::ObjectNotFound`] if there is no such object and
    /// [`Error::Corrupt`] if the stored bytes don't hash back to `id`.
    ///
    /// [`Error::ObjectNotFound`]: crate::Error::ObjectNotFound
    /// [`Error::Corrupt`]: crate::Error::Corrupt
    fn get(&self, id: &Id) -> Result<Object>;

    /// Returns true if an object with this ID is stored.
    fn contains(&self, id: &Id) -> Result<bool>;
}

/// Split a raw loose object (`"<kind> <len>\0<body>"`) into kind and body,
/// verifying that it hashes to `id`.
pub(crate) fn verify_raw(id: &Id, raw: &[u8]) -> Result<Object> {
    use crate::error::Error;
    use crate::object::Kind;

    let corrupt = |reason: &str| Error::Corrupt {
        id: *id,
        reason: reason.to_string(),
    };

    let nul = raw
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| corrupt("missing object header"))?;

    let (kind, len) = crate::object::parse_utils::split_once(&raw[..nul], &b' ');
    let kind = Kind::from_bytes(kind).ok_or_else(|| corrupt("unknown object type"))?;

    let body = &raw[nul + 1..];
    if len != body.len().to_string().as_bytes() {
        return Err(corrupt("object length does not match header"));
    }

    if Id::hash_object(kind.as_str(), body) != *id {
        return Err(corrupt("content does not hash to object ID"));
    }

    let object = Object::decode(kind, body).map_err(|reason| corrupt(&reason))?;
    if object.encode() != body {
        return Err(corrupt("object does not re-encode to its stored bytes"));
    }

    Ok(object)
}
