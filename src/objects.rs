use git2::build::CheckoutBuilder;
use git2::{Commit, ErrorCode, Oid, Repository};

use crate::address::Branch;
use crate::context::Context;
use crate::error::Result;
use crate::ns::Ns;

/// Raw git filemode of a tree (directory) entry.
pub const TREE_MODE: i32 = 0o040000;

/// Writes the empty tree object and returns its id.
pub fn make_empty_tree(repo: &Repository) -> Result<Oid> {
    Ok(repo.treebuilder(None)?.write()?)
}

/// Creates a commit object from a tree and a parent list without updating
/// HEAD or any reference.
pub fn create_commit(
    ctx: &Context,
    repo: &Repository,
    message: &str,
    tree_id: Oid,
    parent_ids: &[Oid],
) -> Result<Oid> {
    let tree = repo.find_tree(tree_id)?;
    let parents = parent_ids
        .iter()
        .map(|id| repo.find_commit(*id))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let parent_refs: Vec<&Commit> = parents.iter().collect();
    let signature = ctx.author_signature()?;
    Ok(repo.commit(None, &signature, &signature, message, &tree, &parent_refs)?)
}

/// Wraps `tree_id` in a chain of single-entry trees realizing `prefix` as
/// directories, so the original tree appears at that path. An empty prefix
/// returns the tree unchanged.
pub fn prefix_tree(repo: &Repository, prefix: &Ns, tree_id: Oid) -> Result<Oid> {
    let mut id = tree_id;
    for segment in prefix.segments().iter().rev() {
        let mut builder = repo.treebuilder(None)?;
        builder.insert(segment, id, TREE_MODE)?;
        id = builder.write()?;
    }
    Ok(id)
}

/// The commit at the tip of `branch`, creating the branch with an empty
/// initial commit if it does not exist.
pub fn resolve_create_branch(ctx: &Context, repo: &Repository, branch: &Branch) -> Result<Oid> {
    match repo.find_reference(&branch.reference_name()) {
        Ok(reference) => Ok(reference.peel_to_commit()?.id()),
        Err(e) if e.code() == ErrorCode::NotFound => create_empty_branch(ctx, repo, branch),
        Err(e) => Err(e.into()),
    }
}

/// Creates `branch` pointing at a fresh parentless commit with an empty tree.
pub fn create_empty_branch(ctx: &Context, repo: &Repository, branch: &Branch) -> Result<Oid> {
    let tree_id = make_empty_tree(repo)?;
    let commit_id = create_commit(ctx, repo, "init empty branch", tree_id, &[])?;
    update_branch(repo, branch, commit_id)?;
    Ok(commit_id)
}

/// Points `branch` at `commit_id`, creating or moving it.
pub fn update_branch(repo: &Repository, branch: &Branch, commit_id: Oid) -> Result<()> {
    repo.reference(
        &branch.reference_name(),
        commit_id,
        true,
        &format!("update branch {branch}"),
    )?;
    Ok(())
}

/// The commit at the tip of `branch`.
pub fn branch_commit(repo: &Repository, branch: &Branch) -> Result<Oid> {
    Ok(repo
        .find_reference(&branch.reference_name())?
        .peel_to_commit()?
        .id())
}

/// Checks `branch` out, discarding local working tree changes.
pub fn reset_to_branch(repo: &Repository, branch: &Branch) -> Result<()> {
    repo.set_head(&branch.reference_name())?;
    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_head(Some(&mut checkout))?;
    Ok(())
}
