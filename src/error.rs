use std::{convert::Infallible, path::PathBuf};

use derive_more::{Display, From};

use crate::object_id::ObjectId;

/// The thing a [`Error::NotFound`] failed to find.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Missing {
    #[display(fmt = "blob {}", _0)]
    Blob(ObjectId),
    #[display(fmt = "commit {}", _0)]
    Commit(String),
    #[display(fmt = "branch {}", _0)]
    Branch(String),
    #[display(fmt = "file {}", _0)]
    File(String),
}

#[derive(Debug, From, Display)]
pub enum Error {
    #[from]
    #[display(fmt = "io error: {}", _0)]
    IO(std::io::Error),
    #[from]
    #[display(fmt = "malformed repository data: {}", _0)]
    Serde(serde_json::Error),
    #[display(fmt = "no repository at {:?}", _0)]
    NotARepository(PathBuf),
    #[display(fmt = "a repository already exists at {:?}", _0)]
    AlreadyInitialized(PathBuf),

    #[from]
    #[display(fmt = "no such {}", _0)]
    NotFound(Missing),
    #[display(fmt = "prefix {} matches more than one commit", _0)]
    Ambiguous(String),
    #[display(fmt = "branch {} already exists", _0)]
    AlreadyExists(String),
    #[display(fmt = "{:?} cannot be used as a branch name", _0)]
    InvalidBranchName(String),
    #[display(fmt = "cannot delete the active branch {}", _0)]
    CannotDeleteActive(String),
    #[display(fmt = "{} is neither staged nor tracked", _0)]
    NothingToRemove(String),
    #[display(fmt = "the staging index has uncommitted changes")]
    UncommittedChanges,
    #[display(fmt = "cannot merge a branch with itself")]
    SelfMerge,
    #[display(fmt = "no branch named {}", _0)]
    NoSuchBranch(String),
    #[display(fmt = "the given branch is an ancestor of the current branch")]
    AlreadyAncestor,
    #[display(fmt = "untracked file {} would be overwritten", _0)]
    UntrackedConflict(String),
    #[display(fmt = "{} is not tracked by that commit", _0)]
    FileNotInCommit(String),
    #[display(fmt = "nothing is staged")]
    EmptyStagingArea,
    #[display(fmt = "empty commit message")]
    EmptyMessage,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IO(err) => Some(err),
            Error::Serde(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[test]
fn test_messages_name_their_subject() {
    let err = Error::NotFound(Missing::Branch(String::from("dev")));
    assert_eq!(err.to_string(), "no such branch dev");
    let err: Error = Missing::File(String::from("a.txt")).into();
    assert!(matches!(err, Error::NotFound(Missing::File(ref p)) if p == "a.txt"));
}
