use std::fs;
use std::path::{Path, PathBuf};

use git2::{Commit, ErrorCode, Oid, Repository};
use serde::de::DeserializeOwned;
use serde::Serialize;
use walkdir::WalkDir;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::ns::Ns;

/// A view over the working tree of a non-bare repository: file IO addressed
/// by [`Ns`], staging, and committing with the context author.
pub struct WorkTree<'r> {
    repo: &'r Repository,
}

impl<'r> WorkTree<'r> {
    pub fn new(repo: &'r Repository) -> Self {
        WorkTree { repo }
    }

    pub fn repo(&self) -> &Repository {
        self.repo
    }

    /// Root directory of the working tree on disk.
    pub fn root(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .ok_or_else(|| Error::Invariant("bare repository has no working tree".into()))
    }

    fn abs(&self, path: &Ns) -> Result<PathBuf> {
        Ok(self.root()?.join(path.os_path()))
    }

    pub fn mkdir_all(&self, dir: &Ns) -> Result<()> {
        fs::create_dir_all(self.abs(dir)?)?;
        Ok(())
    }

    pub fn write_bytes(&self, path: &Ns, content: &[u8]) -> Result<()> {
        let abs = self.abs(path)?;
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(abs, content)?;
        Ok(())
    }

    pub fn read_bytes(&self, path: &Ns) -> Result<Vec<u8>> {
        Ok(fs::read(self.abs(path)?)?)
    }

    pub fn write_string(&self, path: &Ns, content: &str) -> Result<()> {
        self.write_bytes(path, content.as_bytes())
    }

    pub fn read_string(&self, path: &Ns) -> Result<String> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::Invariant(format!("file {path} is not utf-8: {e}")))
    }

    pub fn write_json<T: Serialize>(&self, path: &Ns, value: &T) -> Result<()> {
        let data = serde_json::to_vec_pretty(value)?;
        self.write_bytes(path, &data)
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: &Ns) -> Result<T> {
        let data = self.read_bytes(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Adds the file at `path` to the index.
    pub fn stage(&self, path: &Ns) -> Result<()> {
        let mut index = self.repo.index()?;
        index.add_path(&path.os_path())?;
        index.write()?;
        Ok(())
    }

    pub fn write_bytes_stage(&self, path: &Ns, content: &[u8]) -> Result<()> {
        self.write_bytes(path, content)?;
        self.stage(path)
    }

    pub fn write_string_stage(&self, path: &Ns, content: &str) -> Result<()> {
        self.write_string(path, content)?;
        self.stage(path)
    }

    pub fn write_json_stage<T: Serialize>(&self, path: &Ns, value: &T) -> Result<()> {
        self.write_json(path, value)?;
        self.stage(path)
    }

    /// Moves a file and records the move in the index.
    pub fn rename_stage(&self, from: &Ns, to: &Ns) -> Result<()> {
        let to_abs = self.abs(to)?;
        if let Some(parent) = to_abs.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(self.abs(from)?, to_abs)?;
        let mut index = self.repo.index()?;
        index.remove_path(&from.os_path())?;
        index.add_path(&to.os_path())?;
        index.write()?;
        Ok(())
    }

    /// Deletes a file and records the deletion in the index.
    pub fn remove_stage(&self, path: &Ns) -> Result<()> {
        fs::remove_file(self.abs(path)?)?;
        let mut index = self.repo.index()?;
        index.remove_path(&path.os_path())?;
        index.write()?;
        Ok(())
    }

    /// All files under `dir`, recursively, as namespaces rooted at the
    /// working tree. The `.git` directory is not listed.
    pub fn list_files(&self, dir: &Ns) -> Result<Vec<Ns>> {
        let root = self.root()?.to_path_buf();
        let mut out = Vec::new();
        for entry in WalkDir::new(self.abs(dir)?)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
        {
            let entry = entry.map_err(|e| Error::Invariant(format!("walking {dir}: {e}")))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&root)
                .map_err(|e| Error::Invariant(format!("path outside working tree: {e}")))?;
            let segments = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned());
            out.push(Ns::new(segments));
        }
        Ok(out)
    }

    /// Commits the index as a child of HEAD (or as a root commit on an unborn
    /// branch), authored by the context identity.
    pub fn commit(&self, ctx: &Context, message: &str) -> Result<Oid> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                None
            }
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&Commit> = parent.iter().collect();
        let signature = ctx.author_signature()?;
        Ok(self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::repo::init_scratch;
    use serde::Deserialize;

    #[test]
    fn write_stage_commit_read() {
        let ctx = Context::new();
        let (_scratch, repo) = init_scratch().unwrap();
        let tree = WorkTree::new(&repo);
        tree.write_string_stage(&Ns::new(["dir", "file.txt"]), "hello")
            .unwrap();
        let commit_id = tree.commit(&ctx, "first").unwrap();

        let commit = tree.repo().find_commit(commit_id).unwrap();
        assert_eq!(commit.parent_count(), 0);
        assert!(commit
            .tree()
            .unwrap()
            .get_path(Path::new("dir/file.txt"))
            .is_ok());
        assert_eq!(tree.read_string(&Ns::new(["dir", "file.txt"])).unwrap(), "hello");

        // a second commit has the first as parent
        tree.write_string_stage(&Ns::new(["other"]), "x").unwrap();
        let second = tree.commit(&ctx, "second").unwrap();
        assert_eq!(repo.find_commit(second).unwrap().parent_id(0).unwrap(), commit_id);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
        count: u32,
    }

    #[test]
    fn json_round_trip() {
        let ctx = Context::new();
        let (_scratch, repo) = init_scratch().unwrap();
        let tree = WorkTree::new(&repo);
        tree.mkdir_all(&Ns::new(["meta"])).unwrap();
        let payload = Payload {
            name: "x".into(),
            count: 3,
        };
        let path = Ns::new(["meta", "payload.json"]);
        tree.write_json_stage(&path, &payload).unwrap();
        let commit = tree.commit(&ctx, "meta").unwrap();
        assert!(repo
            .find_commit(commit)
            .unwrap()
            .tree()
            .unwrap()
            .get_path(Path::new("meta/payload.json"))
            .is_ok());
        let back: Payload = tree.read_json(&path).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn list_files_skips_git_dir() {
        let (_scratch, repo) = init_scratch().unwrap();
        let tree = WorkTree::new(&repo);
        tree.write_string(&Ns::new(["a"]), "1").unwrap();
        tree.write_string(&Ns::new(["sub", "b"]), "2").unwrap();
        let mut files = tree.list_files(&Ns::root()).unwrap();
        files.sort();
        assert_eq!(files, vec![Ns::new(["a"]), Ns::new(["sub", "b"])]);
    }

    #[test]
    fn rename_and_remove_update_index() {
        let ctx = Context::new();
        let (_scratch, repo) = init_scratch().unwrap();
        let tree = WorkTree::new(&repo);
        tree.write_string_stage(&Ns::new(["old"]), "v").unwrap();
        tree.commit(&ctx, "add").unwrap();

        tree.rename_stage(&Ns::new(["old"]), &Ns::new(["new"])).unwrap();
        let moved = tree.commit(&ctx, "move").unwrap();
        let tree_obj = repo.find_commit(moved).unwrap().tree().unwrap();
        assert!(tree_obj.get_path(Path::new("new")).is_ok());
        assert!(tree_obj.get_path(Path::new("old")).is_err());

        tree.remove_stage(&Ns::new(["new"])).unwrap();
        let removed = tree.commit(&ctx, "rm").unwrap();
        assert_eq!(repo.find_commit(removed).unwrap().tree().unwrap().len(), 0);
    }
}
