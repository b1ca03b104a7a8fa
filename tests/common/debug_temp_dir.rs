use std::path::Path;

use tempfile::TempDir;

// Based on https://gist.github.com/ExpHP/facc0dcbf4399aac7af87dcebae03f7c

#[derive(Debug)]
pub struct DebugTempDir(Option<TempDir>);

impl From<TempDir> for DebugTempDir {
    fn from(tmp: TempDir) -> Self {
        DebugTempDir(Some(tmp))
    }
}

impl DebugTempDir {
    pub fn new() -> std::io::Result<DebugTempDir> {
        TempDir::new().map(Self::from)
    }

    pub fn path(&self) -> &Path {
        self.0.as_ref().unwrap().path()
    }
}

impl AsRef<Path> for DebugTempDir {
    fn as_ref(&self) -> &Path {
        self.0.as_ref().unwrap().as_ref()
    }
}

/// Leaks the inner TempDir if we are unwinding, so a failing test leaves its
/// state on disk for inspection.
impl Drop for DebugTempDir {
    fn drop(&mut self) {
        if std::thread::panicking() {
            if let Some(d) = self.0.as_ref() {
                eprintln!("retaining temporary directory at: {:?}", d);
            }
            std::mem::forget(self.0.take())
        }
    }
}
