use std::collections::HashMap;

use parking_lot::RwLock;

use super::{verify_raw, ObjectStore};
use crate::error::{Error, Result};
use crate::object::{Id, Object};

/// Keeps objects in memory, in the same raw form a loose object file holds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<Id, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Number of distinct objects stored.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn overwrite_raw(&self, id: Id, raw: Vec<u8>) {
        self.objects.write().insert(id, raw);
    }
}

impl ObjectStore for MemoryStore {
    fn put(&self, object: &Object) -> Result<Id> {
        let body = object.encode();
        let kind = object.kind();
        let id = Id::hash_object(kind.as_str(), &body);

        let mut objects = self.objects.write();
        objects.entry(id).or_insert_with(|| {
            tracing::debug!(%id, %kind, "storing object in memory");

            let mut raw = format!("{} {}\0", kind, body.len()).into_bytes();
            raw.extend_from_slice(&body);
            raw
        });

        Ok(id)
    }

    fn get(&self, id: &Id) -> Result<Object> {
        let objects = self.objects.read();
        match objects.get(id) {
            Some(raw) => verify_raw(id, raw),
            None => Err(Error::ObjectNotFound(*id)),
        }
    }

    fn contains(&self, id: &Id) -> Result<bool> {
        Ok(self.objects.read().contains_key(id))
    }
}
