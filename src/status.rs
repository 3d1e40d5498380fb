use std::collections::BTreeSet;

use crate::{error::Result, object_id::ObjectId, repository::Repository};

/// How a working file differs from what would be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Modification {
    Modified,
    Deleted,
}

/// A snapshot of the repository's pending state. Every list is sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub current: String,
    pub branches: Vec<String>,
    pub staged: Vec<String>,
    pub removed: Vec<String>,
    pub unstaged: Vec<(String, Modification)>,
    pub untracked: Vec<String>,
}

impl Repository {
    pub fn status(&self) -> Result<Status> {
        let (_, head) = self.head()?;
        let files = self.tree.files()?;
        let index = &self.index;

        let differs = |path: &str, expected: ObjectId| -> Result<Option<Modification>> {
            Ok(match self.tree.read(path)? {
                None => Some(Modification::Deleted),
                Some(bytes) if ObjectId::of(&bytes) != expected => Some(Modification::Modified),
                Some(_) => None,
            })
        };

        let mut unstaged = Vec::new();
        let candidates: BTreeSet<&String> =
            head.files.keys().chain(index.to_add().keys()).collect();
        for path in candidates {
            let expected = match (index.staged(path), head.blob(path)) {
                (Some(staged), _) => staged,
                (None, Some(_)) if index.is_removed(path) => continue,
                (None, Some(tracked)) => tracked,
                (None, None) => continue,
            };
            if let Some(modification) = differs(path.as_str(), expected)? {
                unstaged.push((path.clone(), modification));
            }
        }

        let untracked = files
            .iter()
            .filter(|path| {
                (index.staged(path).is_none() && !head.tracks(path)) || index.is_removed(path)
            })
            .cloned()
            .collect();

        Ok(Status {
            current: self.branches.current()?,
            branches: self.branches.list()?,
            staged: index.to_add().keys().cloned().collect(),
            removed: index.to_remove().iter().cloned().collect(),
            unstaged,
            untracked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_sections() {
        let tempdir = tempfile::tempdir().unwrap();
        let mut repo = Repository::init(tempdir.path()).unwrap();
        for name in ["edited", "gone", "removed", "clean"] {
            repo.tree().write(name, name.as_bytes()).unwrap();
            repo.add(name).unwrap();
        }
        repo.commit("base").unwrap();
        repo.branch("dev").unwrap();

        repo.tree().write("edited", b"changed").unwrap();
        repo.tree().remove("gone").unwrap();
        repo.rm("removed").unwrap();
        repo.tree().write("staged", b"v1").unwrap();
        repo.add("staged").unwrap();
        repo.tree().write("staged", b"v2").unwrap();
        repo.tree().write("loose", b"?").unwrap();

        let status = repo.status().unwrap();
        assert_eq!(status.current, "main");
        assert_eq!(status.branches, vec!["dev", "main"]);
        assert_eq!(status.staged, vec!["staged"]);
        assert_eq!(status.removed, vec!["removed"]);
        assert_eq!(
            status.unstaged,
            vec![
                (String::from("edited"), Modification::Modified),
                (String::from("gone"), Modification::Deleted),
                (String::from("staged"), Modification::Modified),
            ]
        );
        assert_eq!(status.untracked, vec!["loose"]);

        // A file staged for removal but recreated shows up as untracked.
        repo.tree().write("removed", b"back").unwrap();
        assert_eq!(repo.status().unwrap().untracked, vec!["loose", "removed"]);
    }
}
