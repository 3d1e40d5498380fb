use std::{
    collections::BTreeSet,
    fs::{create_dir_all, read_dir, remove_file},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    blob_store::BlobStore,
    commit::{Commit, FileTable},
    dot_rev::DotRev,
    error::{Error, Result},
    object_store::ObjectStore,
};

/// File and directory names skipped when scanning the working tree.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Ignores {
    set: BTreeSet<String>,
}

impl Default for Ignores {
    fn default() -> Self {
        Ignores {
            set: BTreeSet::from([DotRev::NAME.to_string()]),
        }
    }
}

impl Ignores {
    pub fn contains(&self, name: &str) -> bool {
        name == DotRev::NAME || self.set.contains(name)
    }
}

/// The files a user edits directly, addressed by `/`-separated paths
/// relative to `root`.
#[derive(Debug, Clone)]
pub struct WorkingTree {
    root: PathBuf,
    ignores: Ignores,
}

impl WorkingTree {
    pub fn new(root: PathBuf, ignores: Ignores) -> Self {
        Self { root, ignores }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Every regular file under the root, skipping ignored names.
    pub fn files(&self) -> Result<BTreeSet<String>> {
        let mut files = BTreeSet::new();
        self.scan(&self.root, "", &mut files)?;
        Ok(files)
    }

    fn scan(&self, dir: &Path, prefix: &str, files: &mut BTreeSet<String>) -> Result<()> {
        for entry in read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.ignores.contains(&name) {
                continue;
            }
            let path = format!("{}{}", prefix, name);
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.scan(&entry.path(), &format!("{}/", path), files)?;
            } else if file_type.is_file() {
                files.insert(path);
            } else {
                log::debug!("skipping {:?}, neither a file nor a directory", entry.path());
            }
        }
        Ok(())
    }

    pub fn exists(&self, path: &str) -> bool {
        self.full_path(path).is_file()
    }

    pub fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match std::fs::read(self.full_path(path)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            create_dir_all(parent)?;
        }
        log::debug!("writing {:?}", full);
        Ok(std::fs::write(full, bytes)?)
    }

    /// Deletes `path` if present.
    pub fn remove(&self, path: &str) -> Result<()> {
        match remove_file(self.full_path(path)) {
            Ok(()) => {
                log::debug!("removed {}", path);
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Working files that `tracked` has no entry for.
    pub fn untracked(&self, tracked: &FileTable) -> Result<Vec<String>> {
        Ok(self
            .files()?
            .into_iter()
            .filter(|path| !tracked.contains_key(path))
            .collect())
    }

    /// Writes every file of `files`, overwriting what is there.
    pub fn materialize<S>(&self, files: &FileTable, blobs: &BlobStore<S>) -> Result<()>
    where
        S: ObjectStore,
        Error: From<S::Error>,
    {
        for (path, blob) in files {
            self.write(path, &blobs.get(*blob)?)?;
        }
        Ok(())
    }

    /// Fails if moving from `current` to `target` would overwrite a file
    /// that `current` does not track. Must run before [`Self::materialize`].
    ///
    /// Paths are checked directly rather than through [`Self::files`], so an
    /// ignored name is guarded like any other.
    pub fn guard_overwrite(&self, current: &FileTable, target: &FileTable) -> Result<()> {
        match target
            .keys()
            .find(|path| !current.contains_key(*path) && self.exists(path))
        {
            Some(path) => Err(Error::UntrackedConflict(path.clone())),
            None => Ok(()),
        }
    }

    /// Deletes files tracked by `current` that `target` does not have.
    pub fn prune_stale_tracked(&self, current: &FileTable, target: &FileTable) -> Result<()> {
        for path in current.keys().filter(|path| !target.contains_key(*path)) {
            self.remove(path)?;
        }
        Ok(())
    }

    /// Overwrites `path` with its version in `commit`.
    pub fn restore_single<S>(&self, commit: &Commit, path: &str, blobs: &BlobStore<S>) -> Result<()>
    where
        S: ObjectStore,
        Error: From<S::Error>,
    {
        let blob = commit
            .blob(path)
            .ok_or_else(|| Error::FileNotInCommit(path.to_string()))?;
        self.write(path, &blobs.get(blob)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{object_id::ObjectId, object_store::in_memory::InMemoryObjectStore};

    fn tree() -> (tempfile::TempDir, WorkingTree) {
        let tempdir = tempfile::tempdir().unwrap();
        let tree = WorkingTree::new(tempdir.path().to_path_buf(), Ignores::default());
        (tempdir, tree)
    }

    fn table(blobs: &mut BlobStore<InMemoryObjectStore>, files: &[(&str, &str)]) -> FileTable {
        files
            .iter()
            .map(|(path, contents)| (path.to_string(), blobs.put(contents.as_bytes()).unwrap()))
            .collect()
    }

    #[test]
    fn scan_skips_ignored_and_recurses() {
        let (_dir, tree) = tree();
        tree.write("a.txt", b"a").unwrap();
        tree.write("sub/b.txt", b"b").unwrap();
        tree.write(".rev/HEAD", b"main").unwrap();
        tree.write("target/debug/out", b"").unwrap();
        let files: Vec<String> = tree.files().unwrap().into_iter().collect();
        assert_eq!(files, vec!["a.txt", "sub/b.txt", "target/debug/out"]);
    }

    #[test]
    fn materialize_and_prune() {
        let (_dir, tree) = tree();
        let mut blobs = BlobStore::new(InMemoryObjectStore::new());
        let current = table(&mut blobs, &[("a", "1"), ("b", "2")]);
        let target = table(&mut blobs, &[("a", "one"), ("c", "3")]);
        tree.materialize(&current, &blobs).unwrap();
        tree.guard_overwrite(&current, &target).unwrap();
        tree.materialize(&target, &blobs).unwrap();
        tree.prune_stale_tracked(&current, &target).unwrap();
        assert_eq!(tree.read("a").unwrap(), Some(b"one".to_vec()));
        assert_eq!(tree.read("b").unwrap(), None);
        assert_eq!(tree.read("c").unwrap(), Some(b"3".to_vec()));
    }

    #[test]
    fn guard_blocks_untracked_overwrite() {
        let (_dir, tree) = tree();
        let mut blobs = BlobStore::new(InMemoryObjectStore::new());
        let current = table(&mut blobs, &[("a", "1")]);
        let target = table(&mut blobs, &[("a", "1"), ("u", "theirs")]);
        tree.write("u", b"mine").unwrap();
        assert!(matches!(
            tree.guard_overwrite(&current, &target),
            Err(Error::UntrackedConflict(path)) if path == "u"
        ));
        // Untracked files the target lacks are left alone.
        tree.guard_overwrite(&current, &current).unwrap();
    }

    #[test]
    fn guard_sees_ignored_names() {
        let tempdir = tempfile::tempdir().unwrap();
        let ignores = Ignores {
            set: BTreeSet::from([String::from("target")]),
        };
        let tree = WorkingTree::new(tempdir.path().to_path_buf(), ignores);
        let mut blobs = BlobStore::new(InMemoryObjectStore::new());
        let target = table(&mut blobs, &[("target", "theirs")]);
        tree.write("target", b"mine").unwrap();
        assert!(tree.files().unwrap().is_empty());
        assert!(matches!(
            tree.guard_overwrite(&FileTable::new(), &target),
            Err(Error::UntrackedConflict(path)) if path == "target"
        ));
        assert_eq!(tree.read("target").unwrap(), Some(b"mine".to_vec()));
    }

    #[test]
    fn restore_single_file() {
        let (_dir, tree) = tree();
        let mut blobs = BlobStore::new(InMemoryObjectStore::new());
        let files = table(&mut blobs, &[("a", "committed")]);
        let commit = Commit::child(
            String::from("m"),
            chrono::Utc::now(),
            ObjectId::of(b"parent"),
            files,
        );
        tree.write("a", b"edited").unwrap();
        tree.restore_single(&commit, "a", &blobs).unwrap();
        assert_eq!(tree.read("a").unwrap(), Some(b"committed".to_vec()));
        assert!(matches!(
            tree.restore_single(&commit, "b", &blobs),
            Err(Error::FileNotInCommit(path)) if path == "b"
        ));
    }
}
