#![allow(dead_code)]

mod debug_temp_dir;

use std::path::Path;

use git2::Repository;

use git_replica::repo::init_plain;
use git_replica::{Address, Branch, Context, Ns, Result, Url, WorkTree};

pub use debug_temp_dir::DebugTempDir;

/// A fresh context with test logging installed. Set `RUST_LOG` to see it.
pub fn test_context() -> Context {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Context::new()
}

/// A bare repository acting as a remote, plus the address of `branch` on it.
pub fn init_bare_origin(path: &Path, branch: &str) -> Result<(Repository, Address)> {
    let repo = init_plain(path, true)?;
    Ok((repo, Address::new(Url::from(path), Branch::new(branch))))
}

/// Commits a one-file change named `nonce` onto `branch` of a non-bare
/// repository, creating the branch on first use.
pub fn populate(ctx: &Context, repo: &Repository, branch: &str, nonce: &str) -> Result<()> {
    repo.set_head(&Branch::new(branch).reference_name())?;
    let tree = WorkTree::new(repo);
    tree.write_string_stage(&Ns::new([nonce]), nonce)?;
    tree.commit(ctx, nonce)?;
    Ok(())
}

/// True if the committed tree at the tip of `branch` contains `path`.
pub fn branch_tree_contains(repo: &Repository, branch: &str, path: &str) -> bool {
    let tip = repo
        .find_reference(&Branch::new(branch).reference_name())
        .and_then(|r| r.peel_to_commit());
    match tip {
        Ok(commit) => commit
            .tree()
            .map(|t| t.get_path(Path::new(path)).is_ok())
            .unwrap_or(false),
        Err(_) => false,
    }
}
