use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::{
    blob_store::BlobStore,
    branches::Branches,
    commit::Commit,
    commit_store::CommitStore,
    dot_rev::DotRev,
    error::{Error, Missing, Result},
    object_id::ObjectId,
    object_store::directory::DirectoryObjectStore,
    staging::{Removal, Staged, StagingIndex},
    working_tree::WorkingTree,
};

/// The branch a fresh repository starts on.
pub const DEFAULT_BRANCH: &str = "main";

/// What [`Repository::switch`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switched {
    Switched,
    AlreadyCurrent,
}

/// A handle on one repository: its `.rev` state and its working tree.
///
/// Every operation goes through a handle, so independent repositories can
/// coexist in one process.
#[derive(Debug)]
pub struct Repository {
    pub(crate) dot_rev: DotRev,
    pub(crate) blobs: BlobStore<DirectoryObjectStore>,
    pub(crate) commits: CommitStore<DirectoryObjectStore>,
    pub(crate) branches: Branches,
    pub(crate) index: StagingIndex,
    pub(crate) tree: WorkingTree,
}

impl Repository {
    /// Creates `.rev` inside `worktree` with the initial commit on
    /// [`DEFAULT_BRANCH`].
    pub fn init(worktree: &Path) -> Result<Self> {
        DotRev::init(worktree)?;
        let mut repo = Self::open(worktree)?;
        let initial = repo.commits.put(&Commit::initial())?;
        repo.branches.create(DEFAULT_BRANCH, initial)?;
        repo.branches.set_head(DEFAULT_BRANCH)?;
        repo.save_index()?;
        Ok(repo)
    }

    pub fn open(worktree: &Path) -> Result<Self> {
        let dot_rev = DotRev::existing(worktree)?;
        let blobs = BlobStore::new(DirectoryObjectStore::new(dot_rev.blobs_dir())?);
        let commits = CommitStore::new(DirectoryObjectStore::new(dot_rev.commits_dir())?);
        let branches = Branches::new(&dot_rev);
        let index = StagingIndex::load(&dot_rev.index_path())?;
        let tree = WorkingTree::new(worktree.to_path_buf(), dot_rev.ignores()?);
        Ok(Self {
            dot_rev,
            blobs,
            commits,
            branches,
            index,
            tree,
        })
    }

    pub fn root(&self) -> &Path {
        self.tree.root()
    }

    pub fn dot_rev(&self) -> &PathBuf {
        self.dot_rev.root()
    }

    pub fn blobs(&self) -> &BlobStore<DirectoryObjectStore> {
        &self.blobs
    }

    pub fn commits(&self) -> &CommitStore<DirectoryObjectStore> {
        &self.commits
    }

    pub fn branches(&self) -> &Branches {
        &self.branches
    }

    pub fn index(&self) -> &StagingIndex {
        &self.index
    }

    pub fn tree(&self) -> &WorkingTree {
        &self.tree
    }

    pub(crate) fn save_index(&self) -> Result<()> {
        self.index.save(&self.dot_rev.index_path())
    }

    pub fn current_branch(&self) -> Result<String> {
        self.branches.current()
    }

    pub fn head(&self) -> Result<(ObjectId, Commit)> {
        let id = self.branches.current_tip()?;
        Ok((id, self.commits.get(id)?))
    }

    /// Stages `bytes` as the new content of `path`.
    pub fn stage_add(&mut self, path: &str, bytes: &[u8]) -> Result<Staged> {
        let (_, head) = self.head()?;
        let blob = self.blobs.put(bytes)?;
        let staged = self.index.stage_add(path, blob, head.blob(path));
        self.save_index()?;
        log::debug!("add {}: {:?}", path, staged);
        Ok(staged)
    }

    /// Stages the working copy of `path`.
    pub fn add(&mut self, path: &str) -> Result<Staged> {
        let path = normalize(path);
        let bytes = self
            .tree
            .read(&path)?
            .ok_or_else(|| Error::NotFound(Missing::File(path.clone())))?;
        self.stage_add(&path, &bytes)
    }

    /// Unstages `path`, and if the tip tracks it, stages its removal and
    /// deletes the working copy.
    pub fn rm(&mut self, path: &str) -> Result<Removal> {
        let path = normalize(path);
        let (_, head) = self.head()?;
        let removal = self.index.stage_remove(&path, head.tracks(&path))?;
        if removal == Removal::MarkedForRemoval {
            self.tree.remove(&path)?;
        }
        self.save_index()?;
        Ok(removal)
    }

    pub fn commit(&mut self, message: &str) -> Result<ObjectId> {
        self.commit_at(message, Utc::now())
    }

    /// [`Repository::commit`] with an explicit timestamp.
    pub fn commit_at(&mut self, message: &str, timestamp: DateTime<Utc>) -> Result<ObjectId> {
        if message.is_empty() {
            return Err(Error::EmptyMessage);
        }
        if self.index.is_empty() {
            return Err(Error::EmptyStagingArea);
        }
        let branch = self.branches.current()?;
        let (parent, head) = self.head()?;
        let files = self.index.apply(&head.files);
        let commit = Commit::child(message.to_string(), timestamp, parent, files);
        let id = self.commits.put(&commit)?;
        self.branches.move_pointer(&branch, id)?;
        self.index.clear();
        self.save_index()?;
        log::info!("committed {} on {}", id, branch);
        Ok(id)
    }

    /// Overwrites the working copy of `path` with its version at the tip.
    pub fn restore(&self, path: &str) -> Result<()> {
        let (_, head) = self.head()?;
        self.tree.restore_single(&head, &normalize(path), &self.blobs)
    }

    /// Overwrites the working copy of `path` with its version in the commit
    /// whose id starts with `prefix`.
    pub fn restore_from(&self, prefix: &str, path: &str) -> Result<()> {
        let commit = self.commits.get(self.commits.resolve_prefix(prefix)?)?;
        self.tree.restore_single(&commit, &normalize(path), &self.blobs)
    }

    /// The first-parent history of the tip, newest first.
    pub fn log(&self) -> Result<Vec<(ObjectId, Commit)>> {
        let mut history = Vec::new();
        let mut next = Some(self.branches.current_tip()?);
        while let Some(id) = next {
            let commit = self.commits.get(id)?;
            next = commit.parent;
            history.push((id, commit));
        }
        Ok(history)
    }

    /// Every commit ever made, in id order.
    pub fn global_log(&self) -> Result<Vec<(ObjectId, Commit)>> {
        self.commits.all()
    }

    pub fn find(&self, message: &str) -> Result<Vec<ObjectId>> {
        self.commits.find(message)
    }

    /// Creates `name` pointing at the tip.
    pub fn branch(&self, name: &str) -> Result<()> {
        self.branches.create(name, self.branches.current_tip()?)
    }

    pub fn rm_branch(&self, name: &str) -> Result<()> {
        self.branches.delete(name)
    }

    /// Makes `name` the active branch and checks out its tip.
    pub fn switch(&mut self, name: &str) -> Result<Switched> {
        let target_id = self.branches.tip_of(name)?;
        if self.branches.current()? == name {
            return Ok(Switched::AlreadyCurrent);
        }
        let (_, current) = self.head()?;
        let target = self.commits.get(target_id)?;
        self.check_out(&current, &target)?;
        self.branches.set_head(name)?;
        Ok(Switched::Switched)
    }

    /// Checks out the commit whose id starts with `prefix` and moves the
    /// active branch to it.
    pub fn reset(&mut self, prefix: &str) -> Result<ObjectId> {
        let target_id = self.commits.resolve_prefix(prefix)?;
        let target = self.commits.get(target_id)?;
        let (_, current) = self.head()?;
        self.check_out(&current, &target)?;
        self.branches.move_pointer(&self.branches.current()?, target_id)?;
        Ok(target_id)
    }

    /// Replaces the files of `current` in the working tree with those of
    /// `target` and clears the index. Nothing is touched if an untracked
    /// file is in the way.
    pub(crate) fn check_out(&mut self, current: &Commit, target: &Commit) -> Result<()> {
        self.tree.guard_overwrite(&current.files, &target.files)?;
        self.tree.materialize(&target.files, &self.blobs)?;
        self.tree.prune_stale_tracked(&current.files, &target.files)?;
        self.index.clear();
        self.save_index()
    }
}

/// Strips a leading `./` so user-supplied paths match file table keys.
fn normalize(path: &str) -> String {
    let mut path = path;
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path.to_string()
}
