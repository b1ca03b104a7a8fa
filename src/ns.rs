use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// An ordered sequence of path segments, used to locate files and directories
/// inside a git tree independently of the host OS path syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ns(Vec<String>);

impl Ns {
    /// The empty namespace, the root of a tree.
    pub fn root() -> Self {
        Ns(Vec::new())
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ns(segments.into_iter().map(Into::into).collect())
    }

    /// Parses a slash-separated git path. Empty segments are dropped, so the
    /// result round-trips with [`Ns::git_path`].
    pub fn parse_git_path(path: &str) -> Self {
        Ns(path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn append<S: Into<String>>(&self, segment: S) -> Ns {
        let mut segs = self.0.clone();
        segs.push(segment.into());
        Ns(segs)
    }

    /// Child namespace; same as [`Ns::append`], named for tree descent.
    pub fn sub<S: Into<String>>(&self, segment: S) -> Ns {
        self.append(segment)
    }

    pub fn join(&self, other: &Ns) -> Ns {
        let mut segs = self.0.clone();
        segs.extend(other.0.iter().cloned());
        Ns(segs)
    }

    /// Parent namespace: everything but the last segment.
    pub fn dir(&self) -> Ns {
        match self.0.split_last() {
            Some((_, init)) => Ns(init.to_vec()),
            None => Ns::root(),
        }
    }

    /// Last segment, if any.
    pub fn base(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Extension of the last segment, without the dot.
    pub fn ext(&self) -> Option<&str> {
        let base = self.base()?;
        match base.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// Slash-joined rendering, as paths appear inside git trees.
    pub fn git_path(&self) -> String {
        self.0.join("/")
    }

    /// OS-native rendering, for paths under a working tree on disk.
    pub fn os_path(&self) -> PathBuf {
        self.0.iter().collect()
    }
}

impl fmt::Display for Ns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.git_path())
    }
}

impl From<&str> for Ns {
    fn from(path: &str) -> Self {
        Ns::parse_git_path(path)
    }
}
