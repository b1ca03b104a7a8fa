use std::cell::RefCell;

use git2::{AutotagOption, FetchOptions, PushOptions, RemoteCallbacks, Repository};

use crate::address::{Address, Branch, Url};
use crate::auth::install_callbacks;
use crate::context::Context;
use crate::error::{Error, Result};

/// Refspec copying every branch, used for all pushes and all-branch pulls.
/// Tags and remote-tracking refs are not carried.
pub const MIRROR_REFSPEC: &str = "refs/heads/*:refs/heads/*";

pub fn mirror_refspecs() -> Vec<String> {
    vec![MIRROR_REFSPEC.to_string()]
}

/// Refspec restricted to a single branch, used for single-branch pulls.
pub fn branch_refspecs(branch: &Branch) -> Vec<String> {
    vec![format!("{0}:{0}", branch.reference_name())]
}

/// The pull refspecs mandated by a clone's mode.
pub fn clone_pull_refspecs(addr: &Address, all_branches: bool) -> Vec<String> {
    if all_branches {
        mirror_refspecs()
    } else {
        branch_refspecs(&addr.branch)
    }
}

/// Fetches `refspecs` from `from` over a one-shot anonymous remote,
/// propagating every error.
pub fn fetch_refspecs(
    ctx: &Context,
    repo: &Repository,
    from: &Url,
    refspecs: &[String],
) -> Result<()> {
    ctx.check()?;
    let mut remote = repo.remote_anonymous(from.as_str())?;
    let mut callbacks = RemoteCallbacks::new();
    install_callbacks(ctx, from, &mut callbacks);
    let mut options = FetchOptions::new();
    options
        .remote_callbacks(callbacks)
        .download_tags(AutotagOption::None);
    remote.fetch(refspecs, Some(&mut options), None)?;
    Ok(())
}

/// One-shot fetch that treats no-op outcomes (already up to date, empty
/// remote, nothing matching the refspec) as success.
pub fn pull_once(ctx: &Context, repo: &Repository, from: &Url, refspecs: &[String]) -> Result<()> {
    match fetch_refspecs(ctx, repo, from, refspecs) {
        Ok(()) => Ok(()),
        Err(e) if e.is_benign_pull() => {
            tracing::debug!(from = %from, error = %e, "pull had no effect");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// One-shot push of `refspecs` to `to` over an anonymous remote. Pushing
/// nothing new is success; a rejected reference update is an error carrying
/// the remote's status line.
pub fn push_once(ctx: &Context, repo: &Repository, to: &Url, refspecs: &[String]) -> Result<()> {
    ctx.check()?;
    let rejections: RefCell<Vec<(String, String)>> = RefCell::new(Vec::new());
    {
        let mut remote = repo.remote_anonymous(to.as_str())?;
        let mut callbacks = RemoteCallbacks::new();
        install_callbacks(ctx, to, &mut callbacks);
        callbacks.push_update_reference(|refname, status| {
            if let Some(status) = status {
                rejections
                    .borrow_mut()
                    .push((refname.to_string(), status.to_string()));
            }
            Ok(())
        });
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);
        remote.push(refspecs, Some(&mut options))?;
    }
    if let Some((refname, status)) = rejections.into_inner().into_iter().next() {
        return Err(Error::PushRejected { refname, status });
    }
    Ok(())
}

/// Finds or creates the remote persisted under the URL's filename hash. For
/// repositories that keep going back to the same remote; one-shot transfers
/// use anonymous remotes instead.
pub fn ensure_remote<'r>(repo: &'r Repository, url: &Url) -> Result<git2::Remote<'r>> {
    let name = url.cache_key();
    match repo.find_remote(&name) {
        Ok(remote) => Ok(remote),
        Err(e) if e.code() == git2::ErrorCode::NotFound => {
            Ok(repo.remote(&name, url.as_str())?)
        }
        Err(e) => Err(e.into()),
    }
}

/// A process-unique name with `prefix`, for scratch directories and other
/// single-use artifacts. 64 bits of entropy, base36.
pub fn nonce_name(prefix: &str) -> String {
    format!("{prefix}-{}", base36(rand::random::<u64>()))
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}
