use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use git2::Repository;
use tempfile::TempDir;

use crate::address::{Address, Url};
use crate::context::Context;
use crate::error::Result;
use crate::lock::{with_file_lock, DEFAULT_LOCK_RETRY_DELAY};
use crate::proxy::{Cloned, Proxy};
use crate::repo::{init_scratch, open_or_init, switch_to_branch};
use crate::transport::{clone_pull_refspecs, mirror_refspecs, pull_once, push_once};

const REPLICA_REPO_DIR: &str = "repo";
const REPLICA_LOCK_FILE: &str = "lock";
const REPLICA_STAMP_FILE: &str = "stamp";

/// A proxy that interposes a per-address replica between the caller and the
/// remote: an on-disk bare mirror shared by all processes using the same
/// cache directory, refreshed on a per-URL TTL, and guarded by a file lock.
#[derive(Debug)]
pub struct ReplicaCache {
    cache_dir: PathBuf,
    lock_retry_delay: Duration,
}

impl ReplicaCache {
    pub fn new<P: Into<PathBuf>>(cache_dir: P) -> Self {
        ReplicaCache {
            cache_dir: cache_dir.into(),
            lock_retry_delay: DEFAULT_LOCK_RETRY_DELAY,
        }
    }

    pub fn with_lock_retry_delay(mut self, delay: Duration) -> Self {
        self.lock_retry_delay = delay;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn clone(&self, ctx: &Context, addr: &Address, all_branches: bool) -> Result<Box<dyn Cloned>> {
        ctx.check()?;
        let ttl = ctx.ttl().get(&addr.url);
        let mut cloned = ReplicaCloned::materialize(
            &self.cache_dir,
            addr,
            all_branches,
            ttl,
            self.lock_retry_delay,
        )?;
        cloned.pull(ctx)?;
        switch_to_branch(&cloned.work_repo, &addr.branch)?;
        Ok(Box::new(cloned))
    }
}

impl Proxy for ReplicaCache {
    fn clone_one(&self, ctx: &Context, addr: &Address) -> Result<Box<dyn Cloned>> {
        self.clone(ctx, addr, false)
    }

    fn clone_all(&self, ctx: &Context, addr: &Address) -> Result<Box<dyn Cloned>> {
        self.clone(ctx, addr, true)
    }
}

/// A clone backed by a replica. Constructed per call: the handle owns its
/// scratch working repository outright and refers to the shared replica only
/// by path, taking the replica's file lock for the duration of every push and
/// pull.
pub struct ReplicaCloned {
    entry_dir: PathBuf,
    addr: Address,
    all_branches: bool,
    ttl: Duration,
    lock_retry_delay: Duration,
    disk_repo: Repository,
    work_repo: Repository,
    _scratch: TempDir,
}

impl ReplicaCloned {
    fn materialize(
        cache_dir: &Path,
        addr: &Address,
        all_branches: bool,
        ttl: Duration,
        lock_retry_delay: Duration,
    ) -> Result<Self> {
        let entry_dir = cache_dir.join(addr.cache_key());
        fs::create_dir_all(&entry_dir)?;
        // The mirror must be bare: a checked-out branch could not be pushed to.
        let disk_repo = open_or_init(&entry_dir.join(REPLICA_REPO_DIR), true)?;
        let (scratch, work_repo) = init_scratch()?;
        Ok(ReplicaCloned {
            entry_dir,
            addr: addr.clone(),
            all_branches,
            ttl,
            lock_retry_delay,
            disk_repo,
            work_repo,
            _scratch: scratch,
        })
    }

    fn repo_path(&self) -> PathBuf {
        self.entry_dir.join(REPLICA_REPO_DIR)
    }

    fn disk_url(&self) -> Url {
        Url::from(self.repo_path().as_path())
    }

    fn lock_path(&self) -> PathBuf {
        self.entry_dir.join(REPLICA_LOCK_FILE)
    }

    fn stamp_path(&self) -> PathBuf {
        self.entry_dir.join(REPLICA_STAMP_FILE)
    }

    fn stamp_fresh(&self) -> Result<bool> {
        if self.ttl.is_zero() {
            return Ok(false);
        }
        let meta = match fs::metadata(self.stamp_path()) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let mtime = meta.modified()?;
        Ok(match SystemTime::now().duration_since(mtime) {
            Ok(age) => age <= self.ttl,
            Err(_) => true,
        })
    }

    fn write_stamp(&self) -> Result<()> {
        fs::write(self.stamp_path(), format!("{:?}", SystemTime::now()))?;
        Ok(())
    }

    fn invalidate_stamp(&self) -> Result<()> {
        match fs::remove_file(self.stamp_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn pull_inner(&mut self, ctx: &Context) -> Result<()> {
        let refspecs = clone_pull_refspecs(&self.addr, self.all_branches);
        if self.stamp_fresh()? {
            tracing::debug!(addr = %self.addr, "replica is fresh, skipping remote fetch");
        } else {
            pull_once(ctx, &self.disk_repo, &self.addr.url, &refspecs)?;
            self.write_stamp()?;
        }
        // mirror the bare replica into the working clone
        pull_once(ctx, &self.work_repo, &self.disk_url(), &refspecs)
    }

    fn push_inner(&mut self, ctx: &Context) -> Result<()> {
        self.invalidate_stamp()?;
        push_once(ctx, &self.work_repo, &self.disk_url(), &mirror_refspecs())?;
        // That push lands in the bare store behind this handle's back over the
        // filesystem transport; reopen so the upstream push reads the new refs
        // instead of a stale snapshot.
        self.disk_repo = Repository::open(self.repo_path())?;
        push_once(ctx, &self.disk_repo, &self.addr.url, &mirror_refspecs())?;
        self.write_stamp()
    }
}

impl Cloned for ReplicaCloned {
    fn address(&self) -> &Address {
        &self.addr
    }

    fn repo(&self) -> &Repository {
        &self.work_repo
    }

    fn pull(&mut self, ctx: &Context) -> Result<()> {
        let lock_path = self.lock_path();
        let retry = self.lock_retry_delay;
        with_file_lock(ctx, &lock_path, retry, || self.pull_inner(ctx))
    }

    fn push(&mut self, ctx: &Context) -> Result<()> {
        let lock_path = self.lock_path();
        let retry = self.lock_retry_delay;
        with_file_lock(ctx, &lock_path, retry, || self.push_inner(ctx))
    }
}
