use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    commit::FileTable,
    dot_rev::{read_json, write_json},
    error::{Error, Result},
    object_id::ObjectId,
};

/// Pending changes relative to the active branch's tip.
///
/// Staged content is already in the blob store; the index only remembers
/// which blob each path should point at. A path is never in both sets.
#[derive(PartialEq, Eq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagingIndex {
    to_add: BTreeMap<String, ObjectId>,
    to_remove: BTreeSet<String>,
}

/// What [`StagingIndex::stage_add`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staged {
    /// The content was recorded for the next commit.
    Staged,
    /// The content matches the tip, so nothing is pending for the path.
    Unchanged,
    /// Identical content was already staged.
    AlreadyStaged,
}

/// What [`StagingIndex::stage_remove`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// A pending addition was dropped; the path is not tracked.
    Unstaged,
    /// The tracked path will be absent from the next commit.
    MarkedForRemoval,
}

impl StagingIndex {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.try_exists()? {
            return Ok(Self::default());
        }
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }

    /// Stages `blob` as the new content of `path`, given the blob `tracked`
    /// for it in the tip, if any.
    pub fn stage_add(&mut self, path: &str, blob: ObjectId, tracked: Option<ObjectId>) -> Staged {
        if tracked == Some(blob) {
            self.to_add.remove(path);
            self.to_remove.remove(path);
            return Staged::Unchanged;
        }
        if self.to_add.get(path) == Some(&blob) {
            return Staged::AlreadyStaged;
        }
        self.stage(path, blob);
        Staged::Staged
    }

    /// Fails with [`Error::NothingToRemove`] when `path` is neither staged
    /// nor `tracked`. The caller deletes the working file on
    /// [`Removal::MarkedForRemoval`].
    pub fn stage_remove(&mut self, path: &str, tracked: bool) -> Result<Removal> {
        let was_staged = self.to_add.remove(path).is_some();
        if tracked {
            self.mark_removed(path);
            Ok(Removal::MarkedForRemoval)
        } else if was_staged {
            Ok(Removal::Unstaged)
        } else {
            Err(Error::NothingToRemove(path.to_string()))
        }
    }

    /// Unconditionally records `blob` for `path`.
    pub fn stage(&mut self, path: &str, blob: ObjectId) {
        self.to_remove.remove(path);
        self.to_add.insert(path.to_string(), blob);
    }

    /// Unconditionally records `path` for removal.
    pub fn mark_removed(&mut self, path: &str) {
        self.to_add.remove(path);
        self.to_remove.insert(path.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    pub fn clear(&mut self) {
        self.to_add.clear();
        self.to_remove.clear();
    }

    pub fn to_add(&self) -> &BTreeMap<String, ObjectId> {
        &self.to_add
    }

    pub fn to_remove(&self) -> &BTreeSet<String> {
        &self.to_remove
    }

    pub fn staged(&self, path: &str) -> Option<ObjectId> {
        self.to_add.get(path).copied()
    }

    pub fn is_removed(&self, path: &str) -> bool {
        self.to_remove.contains(path)
    }

    /// `files` with the pending additions and removals applied.
    pub fn apply(&self, files: &FileTable) -> FileTable {
        let mut files = files.clone();
        files.extend(self.to_add.iter().map(|(path, blob)| (path.clone(), *blob)));
        for path in &self.to_remove {
            files.remove(path);
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_tracked_content_cancels() {
        let mut index = StagingIndex::default();
        let tracked = ObjectId::of(b"X");
        let edited = ObjectId::of(b"Y");
        assert_eq!(index.stage_add("f", edited, Some(tracked)), Staged::Staged);
        assert_eq!(index.stage_add("f", edited, Some(tracked)), Staged::AlreadyStaged);
        assert_eq!(index.stage_add("f", tracked, Some(tracked)), Staged::Unchanged);
        assert!(index.is_empty());
    }

    #[test]
    fn staging_tracked_content_clears_removal() {
        let mut index = StagingIndex::default();
        let tracked = ObjectId::of(b"X");
        index.stage_remove("f", true).unwrap();
        assert!(index.is_removed("f"));
        assert_eq!(index.stage_add("f", tracked, Some(tracked)), Staged::Unchanged);
        assert!(index.is_empty());
    }

    #[test]
    fn adding_clears_removal() {
        let mut index = StagingIndex::default();
        index.mark_removed("f");
        let blob = ObjectId::of(b"new");
        assert_eq!(index.stage_add("f", blob, Some(ObjectId::of(b"old"))), Staged::Staged);
        assert!(!index.is_removed("f"));
        assert_eq!(index.staged("f"), Some(blob));
    }

    #[test]
    fn remove_cases() {
        let mut index = StagingIndex::default();
        assert!(matches!(
            index.stage_remove("f", false),
            Err(Error::NothingToRemove(path)) if path == "f"
        ));
        index.stage("f", ObjectId::of(b"x"));
        assert_eq!(index.stage_remove("f", false).unwrap(), Removal::Unstaged);
        assert!(index.is_empty());
        index.stage("g", ObjectId::of(b"x"));
        assert_eq!(index.stage_remove("g", true).unwrap(), Removal::MarkedForRemoval);
        assert!(index.staged("g").is_none());
        assert!(index.is_removed("g"));
    }

    #[test]
    fn apply_to_table() {
        let mut files = FileTable::new();
        files.insert(String::from("keep"), ObjectId::of(b"k"));
        files.insert(String::from("gone"), ObjectId::of(b"g"));
        files.insert(String::from("edit"), ObjectId::of(b"e"));
        let mut index = StagingIndex::default();
        index.mark_removed("gone");
        index.stage("edit", ObjectId::of(b"e2"));
        index.stage("new", ObjectId::of(b"n"));
        let applied = index.apply(&files);
        assert_eq!(applied.len(), 3);
        assert_eq!(applied["edit"], ObjectId::of(b"e2"));
        assert_eq!(applied["new"], ObjectId::of(b"n"));
        assert!(!applied.contains_key("gone"));
    }

    #[test]
    fn persists_as_json() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("index");
        assert_eq!(StagingIndex::load(&path).unwrap(), StagingIndex::default());
        let mut index = StagingIndex::default();
        index.stage("a", ObjectId::of(b"a"));
        index.mark_removed("b");
        index.save(&path).unwrap();
        assert_eq!(StagingIndex::load(&path).unwrap(), index);
        index.clear();
        index.save(&path).unwrap();
        assert!(StagingIndex::load(&path).unwrap().is_empty());
    }
}
