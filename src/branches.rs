use std::{
    fs::{read_dir, read_to_string, remove_file, File},
    io::Write,
    path::PathBuf,
};

use crate::{
    dot_rev::{read_json, write_json, DotRev},
    error::{Error, Missing, Result},
    object_id::ObjectId,
};

/// The registry of branch pointers and the HEAD naming the active one.
///
/// Each branch is a file under `.rev/branches` holding its tip id. Old tips
/// are overwritten, not versioned.
#[derive(Debug, Clone)]
pub struct Branches {
    dir: PathBuf,
    head: PathBuf,
}

impl Branches {
    pub fn new(dot_rev: &DotRev) -> Self {
        Self {
            dir: dot_rev.branches_dir(),
            head: dot_rev.head_path(),
        }
    }

    fn tip_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(!name.is_empty() && self.tip_path(name).is_file())
    }

    /// Names are single file names under the branch directory.
    fn valid_name(name: &str) -> bool {
        !matches!(name, "" | "." | "..") && !name.contains(['/', '\\'])
    }

    pub fn create(&self, name: &str, at: ObjectId) -> Result<()> {
        if !Self::valid_name(name) {
            return Err(Error::InvalidBranchName(name.to_string()));
        }
        if self.exists(name)? {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        log::info!("creating branch {} at {}", name, at);
        write_json(&at, &self.tip_path(name))
    }

    /// Removes the pointer only; commits reachable from nowhere else stay in
    /// the store.
    pub fn delete(&self, name: &str) -> Result<()> {
        if !self.exists(name)? {
            return Err(Missing::Branch(name.to_string()).into());
        }
        if self.current()? == name {
            return Err(Error::CannotDeleteActive(name.to_string()));
        }
        log::info!("deleting branch {}", name);
        Ok(remove_file(self.tip_path(name))?)
    }

    pub fn move_pointer(&self, name: &str, to: ObjectId) -> Result<()> {
        log::info!("moving branch {} to {}", name, to);
        write_json(&to, &self.tip_path(name))
    }

    pub fn set_head(&self, name: &str) -> Result<()> {
        if !self.exists(name)? {
            return Err(Missing::Branch(name.to_string()).into());
        }
        log::info!("HEAD is now {}", name);
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.head)?;
        file.write_all(name.as_bytes())?;
        Ok(())
    }

    pub fn current(&self) -> Result<String> {
        Ok(read_to_string(&self.head)?.trim().to_string())
    }

    pub fn tip_of(&self, name: &str) -> Result<ObjectId> {
        if !self.exists(name)? {
            return Err(Missing::Branch(name.to_string()).into());
        }
        read_json(&self.tip_path(name))
    }

    pub fn current_tip(&self) -> Result<ObjectId> {
        self.tip_of(&self.current()?)
    }

    /// Every branch name, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (tempfile::TempDir, Branches) {
        let tempdir = tempfile::tempdir().unwrap();
        let dot_rev = DotRev::init(tempdir.path()).unwrap();
        let branches = Branches::new(&dot_rev);
        branches.create("main", ObjectId::of(b"root")).unwrap();
        branches.set_head("main").unwrap();
        (tempdir, branches)
    }

    #[test]
    fn create_and_read_back() {
        let (_dir, branches) = registry();
        let at = ObjectId::of(b"c1");
        branches.create("dev", at).unwrap();
        assert_eq!(branches.tip_of("dev").unwrap(), at);
        assert_eq!(branches.list().unwrap(), vec!["dev", "main"]);
        assert!(matches!(
            branches.create("dev", at),
            Err(Error::AlreadyExists(name)) if name == "dev"
        ));
    }

    #[test]
    fn names_must_be_plain_file_names() {
        let (_dir, branches) = registry();
        let at = ObjectId::of(b"c1");
        for name in ["feature/x", "", ".", "..", "../escape", "a\\b"] {
            assert!(matches!(
                branches.create(name, at),
                Err(Error::InvalidBranchName(ref n)) if n == name
            ));
        }
        branches.create("feature-x", at).unwrap();
        assert_eq!(branches.list().unwrap(), vec!["feature-x", "main"]);
    }

    #[test]
    fn delete_rules() {
        let (_dir, branches) = registry();
        branches.create("dev", ObjectId::of(b"c1")).unwrap();
        assert!(matches!(
            branches.delete("main"),
            Err(Error::CannotDeleteActive(_))
        ));
        assert!(matches!(
            branches.delete("nope"),
            Err(Error::NotFound(Missing::Branch(_)))
        ));
        branches.delete("dev").unwrap();
        assert_eq!(branches.list().unwrap(), vec!["main"]);
    }

    #[test]
    fn head_and_pointer_moves() {
        let (_dir, branches) = registry();
        assert!(matches!(
            branches.set_head("nope"),
            Err(Error::NotFound(Missing::Branch(_)))
        ));
        let next = ObjectId::of(b"c2");
        branches.move_pointer("main", next).unwrap();
        assert_eq!(branches.current().unwrap(), "main");
        assert_eq!(branches.current_tip().unwrap(), next);
        branches.create("dev", next).unwrap();
        branches.set_head("dev").unwrap();
        assert_eq!(branches.current().unwrap(), "dev");
    }
}
