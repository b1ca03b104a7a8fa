use std::path::PathBuf;

use git2::{Oid, Repository};

use crate::address::{Address, Branch};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::merge::{merge_tree_pair, merge_trees, pass_filter, CollisionPolicy, MergeFilter};
use crate::ns::Ns;
use crate::objects::{create_commit, prefix_tree, resolve_create_branch, reset_to_branch, update_branch};
use crate::transport::fetch_refspecs;

const EMBED_COMMIT_MESSAGE: &str = "embed remotes";

/// A successfully fetched embedding source: its tip commit and that commit's
/// tree.
#[derive(Debug, Clone, Copy)]
pub struct FetchedSource {
    pub commit: Oid,
    pub tree: Oid,
}

/// Embeds the remote branches `addrs` into `to_branch` of `repo` and checks
/// the result out into the working tree.
#[allow(clippy::too_many_arguments)]
pub fn embed_on_branch_reset(
    ctx: &Context,
    repo: &Repository,
    addrs: &[Address],
    caches: &[Branch],
    to_branch: &Branch,
    to_ns: &[Ns],
    allow_override: bool,
    filter: MergeFilter<'_>,
) -> Result<Oid> {
    let commit = embed_on_branch(ctx, repo, addrs, caches, to_branch, to_ns, allow_override, filter)?;
    reset_to_branch(repo, to_branch)?;
    Ok(commit)
}

/// Embeds the remote branches `addrs` into `to_branch`, creating the branch
/// (with an empty initial commit) if it does not exist. Neither HEAD nor the
/// working tree are touched.
#[allow(clippy::too_many_arguments)]
pub fn embed_on_branch(
    ctx: &Context,
    repo: &Repository,
    addrs: &[Address],
    caches: &[Branch],
    to_branch: &Branch,
    to_ns: &[Ns],
    allow_override: bool,
    filter: MergeFilter<'_>,
) -> Result<Oid> {
    let parent = resolve_create_branch(ctx, repo, to_branch)?;
    let commit = embed_on_commit(ctx, repo, addrs, caches, parent, to_ns, allow_override, filter)?;
    update_branch(repo, to_branch, commit)?;
    Ok(commit)
}

/// Creates a commit on top of `parent` whose tree is the parent's tree with
/// each fetched remote tree relocated under its namespace and merged in. The
/// parents of the new commit are `parent` followed by the fetched remote
/// commits, in source order. Sources that are unreachable, empty, or missing
/// the requested branch are skipped with a warning.
#[allow(clippy::too_many_arguments)]
pub fn embed_on_commit(
    ctx: &Context,
    repo: &Repository,
    addrs: &[Address],
    caches: &[Branch],
    parent: Oid,
    to_ns: &[Ns],
    allow_override: bool,
    filter: MergeFilter<'_>,
) -> Result<Oid> {
    check_source_arity(addrs, caches, to_ns)?;
    let mut fetched = Vec::with_capacity(addrs.len());
    for i in 0..addrs.len() {
        match fetch_embedding(ctx, repo, &addrs[i], &caches[i]) {
            Ok(source) => fetched.push((source, &to_ns[i])),
            Err(e) if skippable_source_error(&e) => {
                tracing::warn!(source = %addrs[i], error = %e, "skipping embedding source");
            }
            Err(e) => return Err(e),
        }
    }
    synthesize_commit(ctx, repo, &fetched, parent, allow_override, filter)
}

/// [`embed_on_branch`] with the fetch phase spread over a bounded worker pool.
#[allow(clippy::too_many_arguments)]
pub fn embed_on_branch_parallel(
    ctx: &Context,
    repo: &Repository,
    addrs: &[Address],
    caches: &[Branch],
    to_branch: &Branch,
    to_ns: &[Ns],
    allow_override: bool,
    filter: MergeFilter<'_>,
    workers: usize,
) -> Result<Oid> {
    let parent = resolve_create_branch(ctx, repo, to_branch)?;
    let commit = embed_on_commit_parallel(
        ctx, repo, addrs, caches, parent, to_ns, allow_override, filter, workers,
    )?;
    update_branch(repo, to_branch, commit)?;
    Ok(commit)
}

/// [`embed_on_commit`] with the fetch phase spread over a bounded worker
/// pool. Merge order and parent order remain the source order.
#[allow(clippy::too_many_arguments)]
pub fn embed_on_commit_parallel(
    ctx: &Context,
    repo: &Repository,
    addrs: &[Address],
    caches: &[Branch],
    parent: Oid,
    to_ns: &[Ns],
    allow_override: bool,
    filter: MergeFilter<'_>,
    workers: usize,
) -> Result<Oid> {
    check_source_arity(addrs, caches, to_ns)?;
    let results = fetch_embeddings_parallel(ctx, repo, addrs, caches, workers)?;
    let mut fetched = Vec::with_capacity(addrs.len());
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(source) => fetched.push((source, &to_ns[i])),
            Err(e) if skippable_source_error(&e) => {
                tracing::warn!(source = %addrs[i], error = %e, "skipping embedding source");
            }
            Err(e) => return Err(e),
        }
    }
    synthesize_commit(ctx, repo, &fetched, parent, allow_override, filter)
}

/// Embeds each source at `base/<name>`, in the manner of a mirror farm: every
/// remote tree lands whole under its own directory, overriding earlier
/// content of that directory.
pub fn embed_mirrors(
    ctx: &Context,
    repo: &Repository,
    names: &[String],
    addrs: &[Address],
    to_branch: &Branch,
    base: &Ns,
) -> Result<Oid> {
    if names.len() != addrs.len() {
        return Err(Error::Invariant(format!(
            "mirror names and addresses must be the same count, got {} and {}",
            names.len(),
            addrs.len()
        )));
    }
    let caches: Vec<Branch> = names
        .iter()
        .map(|n| Branch::new("mirrors").sub(n))
        .collect();
    let to_ns: Vec<Ns> = names.iter().map(|n| base.sub(n)).collect();
    embed_on_branch(ctx, repo, addrs, &caches, to_branch, &to_ns, true, &pass_filter)
}

/// Fetches `addr`'s branch into the local branch `cache` over a one-shot
/// anonymous remote and reports the fetched tip.
pub fn fetch_embedding(
    ctx: &Context,
    repo: &Repository,
    addr: &Address,
    cache: &Branch,
) -> Result<FetchedSource> {
    let refspec = format!(
        "{}:{}",
        addr.branch.reference_name(),
        cache.reference_name()
    );
    fetch_refspecs(ctx, repo, &addr.url, &[refspec])?;
    let commit = repo
        .find_reference(&cache.reference_name())?
        .peel_to_commit()?;
    Ok(FetchedSource {
        commit: commit.id(),
        tree: commit.tree_id(),
    })
}

/// Fetches all sources concurrently with at most `workers` transfers in
/// flight. Results are positional; one source failing does not abort the
/// others. Every worker opens its own repository handle; handles are not
/// thread-safe and must not be shared.
pub fn fetch_embeddings_parallel(
    ctx: &Context,
    repo: &Repository,
    addrs: &[Address],
    caches: &[Branch],
    workers: usize,
) -> Result<Vec<Result<FetchedSource>>> {
    if addrs.len() != caches.len() {
        return Err(Error::Invariant(format!(
            "cache branches and addresses must be the same count, got {} and {}",
            caches.len(),
            addrs.len()
        )));
    }
    let repo_path: PathBuf = repo.path().to_path_buf();
    let workers = workers.clamp(1, addrs.len().max(1));

    let (work_tx, work_rx) = crossbeam::channel::unbounded::<(usize, Address, Branch)>();
    for (i, (addr, cache)) in addrs.iter().zip(caches.iter()).enumerate() {
        work_tx
            .send((i, addr.clone(), cache.clone()))
            .expect("work queue open");
    }
    drop(work_tx);

    let (result_tx, result_rx) = crossbeam::channel::unbounded::<(usize, Result<FetchedSource>)>();
    std::thread::scope(|scope| {
        for _ in 0..workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let repo_path = repo_path.clone();
            scope.spawn(move || match Repository::open(&repo_path) {
                Ok(repo) => {
                    for (i, addr, cache) in work_rx.iter() {
                        let result = fetch_embedding(ctx, &repo, &addr, &cache);
                        let _ = result_tx.send((i, result));
                    }
                }
                Err(e) => {
                    for (i, _, _) in work_rx.iter() {
                        let _ = result_tx.send((
                            i,
                            Err(Error::Invariant(format!(
                                "worker cannot open host repository: {e}"
                            ))),
                        ));
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut out: Vec<Option<Result<FetchedSource>>> = (0..addrs.len()).map(|_| None).collect();
    for (i, result) in result_rx.iter() {
        out[i] = Some(result);
    }
    Ok(out
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Err(Error::Invariant("fetch result missing".into()))))
        .collect())
}

fn check_source_arity(addrs: &[Address], caches: &[Branch], to_ns: &[Ns]) -> Result<()> {
    if addrs.len() != to_ns.len() || addrs.len() != caches.len() {
        return Err(Error::Invariant(format!(
            "namespaces, cache branches and addresses must be the same count, got {}, {} and {}",
            to_ns.len(),
            caches.len(),
            addrs.len()
        )));
    }
    Ok(())
}

fn skippable_source_error(e: &Error) -> bool {
    e.is_inaccessible() || e.is_empty_remote() || e.is_no_matching_refspec() || e.is_ref_not_found()
}

fn synthesize_commit(
    ctx: &Context,
    repo: &Repository,
    fetched: &[(FetchedSource, &Ns)],
    parent: Oid,
    allow_override: bool,
    filter: MergeFilter<'_>,
) -> Result<Oid> {
    let mut prefixed = Vec::with_capacity(fetched.len());
    let mut remote_commits = Vec::with_capacity(fetched.len());
    for (source, ns) in fetched {
        prefixed.push(prefix_tree(repo, ns, source.tree)?);
        remote_commits.push(source.commit);
    }

    let policy = if allow_override {
        CollisionPolicy::Override
    } else {
        CollisionPolicy::KeepLeft
    };
    let aggregate = merge_trees(ctx, repo, &prefixed, policy, filter)?;

    // Merging into the host tree never overrides: host data must not be
    // silently discarded by the embedding layer.
    let parent_commit = repo.find_commit(parent)?;
    let merged = merge_tree_pair(
        ctx,
        repo,
        &Ns::root(),
        parent_commit.tree_id(),
        aggregate,
        CollisionPolicy::KeepLeft,
        &pass_filter,
    )?;

    let mut parents = Vec::with_capacity(1 + remote_commits.len());
    parents.push(parent);
    parents.extend(remote_commits);
    create_commit(ctx, repo, EMBED_COMMIT_MESSAGE, merged, &parents)
}
