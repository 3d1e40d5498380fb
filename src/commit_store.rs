use crate::{
    commit::Commit,
    error::{Error, Missing, Result},
    object_id::ObjectId,
    object_store::{InsertJson, ObjectStore},
};

/// Content addressed storage of [`Commit`]s, keyed by [`Commit::id`].
#[derive(Debug, Clone)]
pub struct CommitStore<S> {
    objects: S,
}

impl<S> CommitStore<S>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    pub fn new(objects: S) -> Self {
        Self { objects }
    }

    /// Stores `commit` under its id. Storing an identical commit again is a
    /// no-op.
    pub fn put(&mut self, commit: &Commit) -> Result<ObjectId> {
        let id = self.objects.insert(&commit.render()?)?;
        log::debug!("stored commit {} ({:?})", id, commit.message);
        Ok(id)
    }

    pub fn get(&self, id: ObjectId) -> Result<Commit> {
        self.objects
            .read_json(id)?
            .ok_or_else(|| Error::NotFound(Missing::Commit(id.to_hex())))
    }

    /// Resolves an abbreviated id to the single stored commit id starting
    /// with `prefix`.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<ObjectId> {
        let prefix = prefix.to_ascii_lowercase();
        let not_found = || Error::NotFound(Missing::Commit(prefix.clone()));
        if prefix.is_empty() {
            return Err(not_found());
        }
        if let Ok(id) = prefix.parse::<ObjectId>() {
            return if self.objects.has(id)? {
                Ok(id)
            } else {
                Err(not_found())
            };
        }
        let mut matches = self
            .objects
            .ids()?
            .into_iter()
            .filter(|id| id.to_hex().starts_with(&prefix));
        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id),
            (None, _) => Err(not_found()),
            (Some(_), Some(_)) => Err(Error::Ambiguous(prefix)),
        }
    }

    /// Every stored commit, in id order.
    pub fn all(&self) -> Result<Vec<(ObjectId, Commit)>> {
        self.objects
            .ids()?
            .into_iter()
            .map(|id| Ok((id, self.get(id)?)))
            .collect()
    }

    /// The ids of every commit whose message is exactly `message`.
    pub fn find(&self, message: &str) -> Result<Vec<ObjectId>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|(_, commit)| commit.message == message)
            .map(|(id, _)| id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use super::*;
    use crate::{commit::FileTable, object_store::in_memory::InMemoryObjectStore};

    fn store_with_children(n: i64) -> (CommitStore<InMemoryObjectStore>, Vec<ObjectId>) {
        let mut store = CommitStore::new(InMemoryObjectStore::new());
        let root = store.put(&Commit::initial()).unwrap();
        let mut ids = vec![root];
        for i in 0..n {
            let at = DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(i + 1);
            let commit = Commit::child(format!("c{}", i), at, root, FileTable::new());
            ids.push(store.put(&commit).unwrap());
        }
        (store, ids)
    }

    #[test]
    fn put_returns_the_commit_id() {
        let (mut store, ids) = store_with_children(0);
        assert_eq!(ids[0], Commit::initial().id().unwrap());
        assert_eq!(store.put(&Commit::initial()).unwrap(), ids[0]);
        assert_eq!(store.get(ids[0]).unwrap(), Commit::initial());
        assert_eq!(store.all().unwrap().len(), 1);
    }

    #[test]
    fn get_missing_commit() {
        let (store, _) = store_with_children(0);
        assert!(matches!(
            store.get(ObjectId::of(b"nope")),
            Err(Error::NotFound(Missing::Commit(_)))
        ));
    }

    #[test]
    fn resolve_prefix_cases() {
        let (store, ids) = store_with_children(40);
        for id in &ids {
            let hex = id.to_hex();
            assert_eq!(store.resolve_prefix(&hex).unwrap(), *id);
            // 12 hex characters are unique among a few dozen ids.
            assert_eq!(store.resolve_prefix(&hex[..12]).unwrap(), *id);
        }
        // Among 41 ids, some pair shares its first hex digit.
        let ambiguous = (0..16)
            .map(|d| format!("{:x}", d))
            .find(|p| ids.iter().filter(|id| id.to_hex().starts_with(p)).count() > 1)
            .unwrap();
        assert!(matches!(store.resolve_prefix(&ambiguous), Err(Error::Ambiguous(_))));
        assert!(matches!(
            store.resolve_prefix(""),
            Err(Error::NotFound(Missing::Commit(_)))
        ));
        let absent = ObjectId::of(b"absent").to_hex();
        assert!(matches!(
            store.resolve_prefix(&absent),
            Err(Error::NotFound(Missing::Commit(_)))
        ));
    }

    #[test]
    fn find_by_message() {
        let (store, ids) = store_with_children(3);
        assert_eq!(store.find("c1").unwrap(), vec![ids[2]]);
        assert_eq!(store.find("initial commit").unwrap(), vec![ids[0]]);
        assert!(store.find("c").unwrap().is_empty());
    }
}
