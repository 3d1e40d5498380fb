use std::{
    fs::{create_dir_all, File},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::{Error, Result},
    working_tree::Ignores,
};

/// A wrapper for the path of the .rev directory which has a number of utilities defined on it.
///
/// ```text
/// .rev/
///   HEAD                 name of the active branch
///   branches/<name>      tip commit id of each branch
///   objects/blobs/       file snapshots
///   objects/commits/     commit records
///   index                staging index
///   ignores              names skipped when scanning the working tree
/// ```
#[derive(Debug, Clone)]
pub struct DotRev {
    root: PathBuf,
}

impl DotRev {
    pub const NAME: &'static str = ".rev";

    /// Creates an empty layout inside `worktree`. Populating the initial
    /// commit and branch is left to the caller.
    pub fn init(worktree: &Path) -> Result<Self> {
        let root = worktree.join(Self::NAME);
        if root.try_exists()? {
            return Err(Error::AlreadyInitialized(root));
        }
        log::info!("initializing {:?}", root);
        let dot_rev = DotRev { root };
        create_dir_all(dot_rev.branches_dir())?;
        create_dir_all(dot_rev.blobs_dir())?;
        create_dir_all(dot_rev.commits_dir())?;
        write_json(&Ignores::default(), &dot_rev.ignores_path())?;
        Ok(dot_rev)
    }

    pub fn existing(worktree: &Path) -> Result<Self> {
        let root = worktree.join(Self::NAME);
        if !root.is_dir() {
            return Err(Error::NotARepository(worktree.to_path_buf()));
        }
        Ok(DotRev { root })
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn head_path(&self) -> PathBuf {
        self.root.join("HEAD")
    }

    pub fn branches_dir(&self) -> PathBuf {
        self.root.join("branches")
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join("objects").join("blobs")
    }

    pub fn commits_dir(&self) -> PathBuf {
        self.root.join("objects").join("commits")
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("index")
    }

    pub fn ignores_path(&self) -> PathBuf {
        self.root.join("ignores")
    }

    pub fn ignores(&self) -> Result<Ignores> {
        read_json(&self.ignores_path())
    }
}

pub(crate) fn read_json<A: DeserializeOwned>(path: &Path) -> Result<A> {
    Ok(serde_json::from_reader(BufReader::new(
        File::options().read(true).open(path)?,
    ))?)
}

pub(crate) fn write_json<A: Serialize>(thing: &A, path: &Path) -> Result<()> {
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(&serde_json::to_vec_pretty(thing)?)?;
    Ok(())
}

#[test]
fn test_init_then_existing() {
    let tempdir = tempfile::tempdir().unwrap();
    let dot_rev = DotRev::init(tempdir.path()).unwrap();
    assert!(dot_rev.blobs_dir().is_dir());
    assert!(dot_rev.commits_dir().is_dir());
    assert_eq!(dot_rev.ignores().unwrap(), Ignores::default());
    assert!(matches!(
        DotRev::init(tempdir.path()),
        Err(Error::AlreadyInitialized(_))
    ));
    let existing = DotRev::existing(tempdir.path()).unwrap();
    assert_eq!(existing.root(), dot_rev.root());
}

#[test]
fn test_existing_requires_layout() {
    let tempdir = tempfile::tempdir().unwrap();
    assert!(matches!(
        DotRev::existing(tempdir.path()),
        Err(Error::NotARepository(_))
    ));
}
