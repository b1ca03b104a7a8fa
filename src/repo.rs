use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{BranchType, ErrorCode, Oid, Repository, RepositoryInitOptions};
use tempfile::TempDir;

use crate::address::{Branch, MAIN_BRANCH};
use crate::error::Result;

/// Canonical name of the remote a direct clone is registered under.
pub const ORIGIN: &str = "origin";

/// Initializes a repository at `path` with `main` as its default branch.
pub fn init_plain(path: &Path, bare: bool) -> Result<Repository> {
    let mut opts = RepositoryInitOptions::new();
    opts.bare(bare).initial_head(MAIN_BRANCH);
    Ok(Repository::init_opts(path, &opts)?)
}

/// Opens the repository at `path`, initializing it if there is none.
pub fn open_or_init(path: &Path, bare: bool) -> Result<Repository> {
    match Repository::open(path) {
        Ok(repo) => Ok(repo),
        Err(e) if e.code() == ErrorCode::NotFound => init_plain(path, bare),
        Err(e) => Err(e.into()),
    }
}

/// Creates an ephemeral working repository in a fresh temporary directory.
/// The directory lives as long as the returned `TempDir`.
pub fn init_scratch() -> Result<(TempDir, Repository)> {
    let dir = TempDir::new()?;
    let repo = init_plain(dir.path(), false)?;
    Ok((dir, repo))
}

/// Checks out `branch`, or prepares it to be born if it does not exist yet:
/// HEAD is pointed at the unborn branch and the working tree is left as is,
/// so the next commit starts the branch.
pub fn switch_to_branch(repo: &Repository, branch: &Branch) -> Result<()> {
    match repo.find_branch(branch.as_str(), BranchType::Local) {
        Ok(_) => {
            repo.set_head(&branch.reference_name())?;
            let mut checkout = CheckoutBuilder::new();
            checkout.force();
            repo.checkout_head(Some(&mut checkout))?;
        }
        Err(e) if e.code() == ErrorCode::NotFound => {
            repo.set_head(&branch.reference_name())?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// The commit HEAD resolves to.
pub fn head_commit(repo: &Repository) -> Result<Oid> {
    Ok(repo.head()?.peel_to_commit()?.id())
}

/// Names of all local branches.
pub fn local_branches(repo: &Repository) -> Result<Vec<Branch>> {
    let mut out = Vec::new();
    for entry in repo.branches(Some(BranchType::Local))? {
        let (branch, _) = entry?;
        if let Some(name) = branch.name()? {
            out.push(Branch::new(name));
        }
    }
    Ok(out)
}
