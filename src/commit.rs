use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::Result, object_id::ObjectId};

/// Maps each tracked path, `/`-separated and relative to the repository
/// root, to the [`ObjectId`] of its blob.
pub type FileTable = BTreeMap<String, ObjectId>;

/// An immutable record of one version of the tracked files.
///
/// Parents are referenced by id and resolved through the commit store. The
/// field order here is the order of the canonical rendering that the commit's
/// id is computed over, so it must not change.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// The message added with the commit.
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// The previous commit on this line of history, absent only for the
    /// initial commit.
    pub parent: Option<ObjectId>,
    pub files: FileTable,
    /// The tip of the merged-in branch. Present iff this is a merge commit.
    pub merge_parent: Option<ObjectId>,
}

impl Commit {
    pub const INITIAL_MESSAGE: &'static str = "initial commit";

    /// The root of every repository's history: no parent, no files, and the
    /// Unix epoch as its timestamp so that every fresh repository starts from
    /// the same id.
    pub fn initial() -> Self {
        Commit {
            message: String::from(Self::INITIAL_MESSAGE),
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            parent: None,
            files: FileTable::new(),
            merge_parent: None,
        }
    }

    pub fn child(
        message: String,
        timestamp: DateTime<Utc>,
        parent: ObjectId,
        files: FileTable,
    ) -> Self {
        Commit {
            message,
            timestamp,
            parent: Some(parent),
            files,
            merge_parent: None,
        }
    }

    pub fn merge(
        message: String,
        timestamp: DateTime<Utc>,
        parent: ObjectId,
        merge_parent: ObjectId,
        files: FileTable,
    ) -> Self {
        Commit {
            message,
            timestamp,
            parent: Some(parent),
            files,
            merge_parent: Some(merge_parent),
        }
    }

    pub fn is_merge(&self) -> bool {
        self.merge_parent.is_some()
    }

    /// The first parent followed by the merge parent, if any.
    pub fn parents(&self) -> impl Iterator<Item = ObjectId> {
        self.parent.into_iter().chain(self.merge_parent)
    }

    pub fn blob(&self, path: &str) -> Option<ObjectId> {
        self.files.get(path).copied()
    }

    pub fn tracks(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// The canonical bytes this commit is stored as.
    pub fn render(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// The content hash of [`Commit::render`].
    pub fn id(&self) -> Result<ObjectId> {
        Ok(ObjectId::of(&self.render()?))
    }
}

#[test]
fn test_identical_fields_share_an_id() {
    let blob = ObjectId::of(b"contents");
    let files: FileTable = [(String::from("a.txt"), blob)].into_iter().collect();
    let parent = Commit::initial().id().unwrap();
    let at = DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(42);
    let a = Commit::child(String::from("m"), at, parent, files.clone());
    let b = Commit::child(String::from("m"), at, parent, files);
    assert_eq!(a.id().unwrap(), b.id().unwrap());
}

#[test]
fn test_every_field_feeds_the_id() {
    let parent = Commit::initial().id().unwrap();
    let at = DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(42);
    let base = Commit::child(String::from("m"), at, parent, FileTable::new());
    let id = base.id().unwrap();

    let mut other = base.clone();
    other.message.push('!');
    assert_ne!(other.id().unwrap(), id);

    let mut other = base.clone();
    other.timestamp = at + chrono::Duration::seconds(1);
    assert_ne!(other.id().unwrap(), id);

    let mut other = base.clone();
    other.files.insert(String::from("f"), ObjectId::of(b"f"));
    assert_ne!(other.id().unwrap(), id);

    let mut other = base.clone();
    other.merge_parent = Some(ObjectId::of(b"elsewhere"));
    assert_ne!(other.id().unwrap(), id);
    assert_eq!(other.parents().count(), 2);
}

#[test]
fn test_rendering_round_trips() {
    let commit = Commit::initial();
    let back: Commit = serde_json::from_slice(&commit.render().unwrap()).unwrap();
    assert_eq!(back, commit);
    assert!(!back.is_merge());
    assert_eq!(back.parents().count(), 0);
}
