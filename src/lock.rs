use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::time::Duration;

use crate::context::Context;
use crate::error::Result;

/// Delay between attempts to take a contended replica lock.
pub const DEFAULT_LOCK_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Runs `f` while holding an exclusive, cross-process lock on the file at
/// `path`, creating it if needed. Contention is retried every `retry_delay`
/// until the lock is acquired or `ctx` is done; the lock is released on every
/// exit path, including errors and panics.
pub fn with_file_lock<T>(
    ctx: &Context,
    path: &Path,
    retry_delay: Duration,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?;
    let mut lock = fd_lock::RwLock::new(file);
    loop {
        ctx.check()?;
        match lock.try_write() {
            Ok(_guard) => return f(),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(e.into()),
        }
        std::thread::sleep(retry_delay);
    }
}

/// Non-blocking probe: true if the lock at `path` could be taken right now.
pub fn probe_file_lock(path: &Path) -> Result<bool> {
    let file = File::options()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?;
    let mut lock = fd_lock::RwLock::new(file);
    let result = match lock.try_write() {
        Ok(_guard) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
        Err(e) => Err(e.into()),
    };
    result
}
