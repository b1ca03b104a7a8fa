use std::fs;
use std::path::PathBuf;

use git2::Repository;
use tempfile::TempDir;

use crate::address::Address;
use crate::context::Context;
use crate::error::Result;
use crate::proxy::{Cloned, Proxy};
use crate::repo::{init_scratch, open_or_init, switch_to_branch, ORIGIN};
use crate::transport::{clone_pull_refspecs, mirror_refspecs, nonce_name, pull_once, push_once};

/// The default proxy: clones straight from the remote into a scratch
/// repository, with no cache in between.
#[derive(Debug, Default)]
pub struct NoCache {
    dir: Option<PathBuf>,
}

impl NoCache {
    /// Clones into ephemeral temporary directories, removed with the handle.
    pub fn new() -> Self {
        NoCache { dir: None }
    }

    /// Clones into nonce-named directories under `dir`, left on disk.
    pub fn on_disk<P: Into<PathBuf>>(dir: P) -> Self {
        NoCache {
            dir: Some(dir.into()),
        }
    }

    fn make_repo(&self) -> Result<(Repository, Option<TempDir>)> {
        match &self.dir {
            None => {
                let (scratch, repo) = init_scratch()?;
                Ok((repo, Some(scratch)))
            }
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let path = dir.join(nonce_name("clone"));
                Ok((open_or_init(&path, false)?, None))
            }
        }
    }

    fn clone(&self, ctx: &Context, addr: &Address, all_branches: bool) -> Result<Box<dyn Cloned>> {
        ctx.check()?;
        let (repo, scratch) = self.make_repo()?;
        repo.remote(ORIGIN, addr.url.as_str())?;
        let mut cloned = NoCacheCloned {
            all_branches,
            addr: addr.clone(),
            repo,
            _scratch: scratch,
        };
        cloned.pull(ctx)?;
        switch_to_branch(&cloned.repo, &addr.branch)?;
        Ok(Box::new(cloned))
    }
}

impl Proxy for NoCache {
    fn clone_one(&self, ctx: &Context, addr: &Address) -> Result<Box<dyn Cloned>> {
        self.clone(ctx, addr, false)
    }

    fn clone_all(&self, ctx: &Context, addr: &Address) -> Result<Box<dyn Cloned>> {
        self.clone(ctx, addr, true)
    }
}

/// A direct clone. Pull refspecs follow the clone mode; push mirrors all
/// branches to the remote.
pub struct NoCacheCloned {
    all_branches: bool,
    addr: Address,
    repo: Repository,
    _scratch: Option<TempDir>,
}

impl Cloned for NoCacheCloned {
    fn address(&self) -> &Address {
        &self.addr
    }

    fn repo(&self) -> &Repository {
        &self.repo
    }

    fn pull(&mut self, ctx: &Context) -> Result<()> {
        let refspecs = clone_pull_refspecs(&self.addr, self.all_branches);
        pull_once(ctx, &self.repo, &self.addr.url, &refspecs)
    }

    fn push(&mut self, ctx: &Context) -> Result<()> {
        push_once(ctx, &self.repo, &self.addr.url, &mirror_refspecs())
    }
}
