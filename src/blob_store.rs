use crate::{
    error::{Error, Missing, Result},
    object_id::ObjectId,
    object_store::ObjectStore,
};

/// Deduplicated storage of raw file snapshots.
#[derive(Debug, Clone)]
pub struct BlobStore<S> {
    objects: S,
}

impl<S> BlobStore<S>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    pub fn new(objects: S) -> Self {
        Self { objects }
    }

    pub fn put(&mut self, bytes: &[u8]) -> Result<ObjectId> {
        Ok(self.objects.insert(bytes)?)
    }

    pub fn get(&self, id: ObjectId) -> Result<Vec<u8>> {
        self.objects
            .read(id)?
            .ok_or(Error::NotFound(Missing::Blob(id)))
    }

    pub fn has(&self, id: ObjectId) -> Result<bool> {
        Ok(self.objects.has(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::in_memory::InMemoryObjectStore;

    #[test]
    fn put_is_idempotent() {
        let mut blobs = BlobStore::new(InMemoryObjectStore::new());
        let first = blobs.put(b"hello").unwrap();
        let second = blobs.put(b"hello").unwrap();
        assert_eq!(first, second);
        assert_eq!(blobs.objects.len(), 1);
        assert_eq!(blobs.get(first).unwrap(), b"hello".to_vec());
    }

    #[test]
    fn get_missing_blob() {
        let blobs = BlobStore::new(InMemoryObjectStore::new());
        let id = ObjectId::of(b"never stored");
        assert!(matches!(
            blobs.get(id),
            Err(Error::NotFound(Missing::Blob(missing))) if missing == id
        ));
    }
}
