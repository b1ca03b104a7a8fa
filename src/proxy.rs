use git2::Repository;

use crate::address::Address;
use crate::context::Context;
use crate::error::Result;
use crate::files::WorkTree;

/// A factory of working clones, keyed by address. Implementations decide how
/// much caching sits between the caller and the remote.
pub trait Proxy: Send + Sync {
    /// Fetches only the named branch, then checks it out in the working
    /// clone, creating it locally if the remote does not have it.
    fn clone_one(&self, ctx: &Context, addr: &Address) -> Result<Box<dyn Cloned>>;

    /// Fetches all branches; otherwise identical to [`Proxy::clone_one`].
    fn clone_all(&self, ctx: &Context, addr: &Address) -> Result<Box<dyn Cloned>>;
}

/// A live working clone of a remote branch.
///
/// The handle exclusively owns its working repository; it is not thread-safe
/// and must be used from one thread at a time. `push` and `pull` are
/// idempotent on no-op outcomes: already-up-to-date and empty-remote count as
/// success.
pub trait Cloned: Send {
    fn address(&self) -> &Address;

    fn repo(&self) -> &Repository;

    fn tree(&self) -> WorkTree<'_> {
        WorkTree::new(self.repo())
    }

    /// Re-synchronizes from the upstream chain, respecting the clone mode.
    fn pull(&mut self, ctx: &Context) -> Result<()>;

    /// Propagates all local branches upstream.
    fn push(&mut self, ctx: &Context) -> Result<()>;
}

/// Clones the named branch through the context's active proxy.
pub fn clone_one(ctx: &Context, addr: &Address) -> Result<Box<dyn Cloned>> {
    ctx.proxy().clone_one(ctx, addr)
}

/// Clones all branches through the context's active proxy.
pub fn clone_all(ctx: &Context, addr: &Address) -> Result<Box<dyn Cloned>> {
    ctx.proxy().clone_all(ctx, addr)
}
