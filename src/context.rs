use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use git2::Signature;

use crate::auth::AuthManager;
use crate::error::{Error, Result};
use crate::nocache::NoCache;
use crate::proxy::Proxy;
use crate::replica::ReplicaCache;
use crate::ttl::TtlManager;

pub const DEFAULT_AUTHOR_NAME: &str = "4git";
pub const DEFAULT_AUTHOR_EMAIL: &str = "no-reply@gov4git.xyz";

#[derive(Debug, Clone)]
struct Author {
    name: String,
    email: String,
}

/// Cooperative cancellation handle shared by all derivations of a [`Context`].
#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// The ambient state of every operation: credentials, TTL hints, the active
/// proxy, the commit author, and cancellation. Contexts are cheap to clone;
/// `with_*` methods derive a new context, sharing everything not replaced.
#[derive(Clone)]
pub struct Context {
    auth: AuthManager,
    ttl: TtlManager,
    proxy: Arc<dyn Proxy>,
    author: Arc<Mutex<Author>>,
    cancel_flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Context {
            auth: AuthManager::new(),
            ttl: TtlManager::new(),
            proxy: Arc::new(NoCache::new()),
            author: Arc::new(Mutex::new(Author {
                name: DEFAULT_AUTHOR_NAME.to_string(),
                email: DEFAULT_AUTHOR_EMAIL.to_string(),
            })),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Derives a context with the given proxy selected.
    pub fn with_proxy(&self, proxy: Arc<dyn Proxy>) -> Context {
        Context {
            proxy,
            ..self.clone()
        }
    }

    /// Derives a context whose clones go through a replica cache rooted at `dir`.
    pub fn with_cache<P: Into<PathBuf>>(&self, dir: P) -> Context {
        self.with_proxy(Arc::new(ReplicaCache::new(dir)))
    }

    /// Derives a context with the default direct-clone proxy.
    pub fn without_cache(&self) -> Context {
        self.with_proxy(Arc::new(NoCache::new()))
    }

    /// Derives a context that is canceled `timeout` from now. An already
    /// earlier deadline is kept.
    pub fn with_deadline(&self, timeout: Duration) -> Context {
        let candidate = Instant::now() + timeout;
        let deadline = Some(match self.deadline {
            Some(d) if d < candidate => d,
            _ => candidate,
        });
        Context {
            deadline,
            ..self.clone()
        }
    }

    pub fn proxy(&self) -> Arc<dyn Proxy> {
        Arc::clone(&self.proxy)
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    pub fn ttl(&self) -> &TtlManager {
        &self.ttl
    }

    /// Cancels this context and everything cloned or derived from it.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token().is_cancelled()
    }

    /// Returns the error to surface if this context is done. Every blocking
    /// primitive calls this before (and where possible during) the wait.
    pub fn check(&self) -> Result<()> {
        if self.cancel_flag.load(Ordering::Relaxed) {
            return Err(Error::Canceled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    pub fn cancel_token(&self) -> CancelToken {
        CancelToken {
            flag: Arc::clone(&self.cancel_flag),
            deadline: self.deadline,
        }
    }

    /// Overrides the commit author for this context and its clones.
    pub fn set_author(&self, name: &str, email: &str) {
        let mut author = self.author.lock().unwrap();
        author.name = name.to_string();
        author.email = email.to_string();
    }

    /// The author identity, timestamped now.
    pub fn author_signature(&self) -> Result<Signature<'static>> {
        let author = self.author.lock().unwrap();
        Ok(Signature::now(&author.name, &author.email)?)
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_author() {
        let ctx = Context::new();
        let sig = ctx.author_signature().unwrap();
        assert_eq!(sig.name(), Some(DEFAULT_AUTHOR_NAME));
        assert_eq!(sig.email(), Some(DEFAULT_AUTHOR_EMAIL));
    }

    #[test]
    fn cancellation_propagates_to_derived_contexts() {
        let ctx = Context::new();
        let derived = ctx.with_deadline(Duration::from_secs(3600));
        assert!(derived.check().is_ok());
        ctx.cancel();
        assert!(matches!(derived.check(), Err(Error::Canceled)));
    }

    #[test]
    fn elapsed_deadline_is_reported() {
        let ctx = Context::new().with_deadline(Duration::ZERO);
        assert!(matches!(ctx.check(), Err(Error::DeadlineExceeded)));
        assert!(ctx.is_cancelled());
    }
}
