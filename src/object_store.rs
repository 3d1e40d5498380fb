use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::{self, Error},
    object_id::ObjectId,
};

pub mod directory;
pub mod in_memory;

/// A content addressable store of immutable binary objects keyed by the
/// [`ObjectId`] of their bytes. Objects are never updated or deleted.
pub trait ObjectStore {
    type Error;

    fn has(&self, id: ObjectId) -> Result<bool, Self::Error>;

    fn read(&self, id: ObjectId) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Stores `object` if absent. Inserting the same bytes twice is a no-op
    /// returning the same id.
    fn insert(&mut self, object: &[u8]) -> Result<ObjectId, Self::Error>;

    /// Every stored id, in ascending order.
    fn ids(&self) -> Result<Vec<ObjectId>, Self::Error>;
}

/// A convenience trait for writing and reading JSON from any [`ObjectStore`].
pub trait InsertJson {
    /// Inserts a pretty JSON encoded version of the thing into the store.
    fn insert_json<A: Serialize>(&mut self, thing: &A) -> error::Result<ObjectId>;

    /// Reads a JSON encoded thing of the given type from the store at that given [`ObjectId`].
    fn read_json<A: DeserializeOwned>(&self, object_id: ObjectId) -> error::Result<Option<A>>;
}

impl<S> InsertJson for S
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    fn insert_json<A: Serialize>(&mut self, thing: &A) -> error::Result<ObjectId> {
        Ok(self.insert(&serde_json::to_vec_pretty(thing)?)?)
    }

    fn read_json<A: DeserializeOwned>(&self, object_id: ObjectId) -> error::Result<Option<A>> {
        match self.read(object_id)? {
            None => Ok(None),
            Some(obj) => Ok(Some(serde_json::from_slice(&obj)?)),
        }
    }
}
