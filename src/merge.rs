use git2::{ObjectType, Oid, Repository, TreeEntry};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::ns::Ns;
use crate::objects::{make_empty_tree, TREE_MODE};

/// What to do when both sides of a merge claim the same entry name and at
/// least one side is not a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// The right side replaces the left.
    Override,
    /// The left side is kept; the collision is logged once per entry.
    KeepLeft,
    /// The merge fails with [`Error::MergeCollision`].
    Fail,
}

/// Decides which entries of the right-hand tree take part in a merge. Called
/// with the namespace of the containing tree and the candidate entry.
pub type MergeFilter<'f> = &'f dyn Fn(&Ns, &TreeEntry<'_>) -> bool;

/// A filter that admits every entry.
pub fn pass_filter(_at: &Ns, _entry: &TreeEntry<'_>) -> bool {
    true
}

/// Left-folds `tree_ids` into a single tree, starting from the empty tree.
pub fn merge_trees(
    ctx: &Context,
    repo: &Repository,
    tree_ids: &[Oid],
    policy: CollisionPolicy,
    filter: MergeFilter<'_>,
) -> Result<Oid> {
    let mut aggregate = make_empty_tree(repo)?;
    for &tree_id in tree_ids {
        aggregate = merge_tree_pair(ctx, repo, &Ns::root(), aggregate, tree_id, policy, filter)?;
    }
    Ok(aggregate)
}

/// Merges the right tree into the left one at namespace `at`.
///
/// Directory meets directory by recursion; any other name collision is
/// resolved by `policy`. Entries of the right tree rejected by `filter` are
/// ignored. Returns the id of the merged tree written to the object store;
/// the inputs are untouched.
pub fn merge_tree_pair(
    ctx: &Context,
    repo: &Repository,
    at: &Ns,
    left_id: Oid,
    right_id: Oid,
    policy: CollisionPolicy,
    filter: MergeFilter<'_>,
) -> Result<Oid> {
    ctx.check()?;
    let left = repo.find_tree(left_id)?;
    let right = repo.find_tree(right_id)?;

    // Seeding the builder with the left tree indexes its entries by name.
    let mut builder = repo.treebuilder(Some(&left))?;
    for entry in right.iter() {
        if !filter(at, &entry) {
            continue;
        }
        let name = entry
            .name()
            .ok_or_else(|| Error::Invariant(format!("non-utf8 tree entry under {at}")))?;
        let existing = builder.get(name)?.map(|e| (e.id(), e.kind()));
        match existing {
            None => {
                builder.insert(name, entry.id(), entry.filemode())?;
            }
            Some((left_entry_id, left_kind))
                if left_kind == Some(ObjectType::Tree) && entry.kind() == Some(ObjectType::Tree) =>
            {
                let merged = merge_tree_pair(
                    ctx,
                    repo,
                    &at.sub(name),
                    left_entry_id,
                    entry.id(),
                    policy,
                    filter,
                )?;
                builder.insert(name, merged, TREE_MODE)?;
            }
            Some(_) => match policy {
                CollisionPolicy::Override => {
                    builder.insert(name, entry.id(), entry.filemode())?;
                }
                CollisionPolicy::KeepLeft => {
                    tracing::info!(entry = %at.sub(name), "tree entry already exists");
                }
                CollisionPolicy::Fail => {
                    return Err(Error::MergeCollision(at.sub(name).git_path()));
                }
            },
        }
    }
    Ok(builder.write()?)
}
