use std::fmt;
use std::path::Path;

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An opaque string identifying a remote repository. Equality of two `Url`s
/// defines repository identity for caching, locking and authentication.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Url(String);

impl Url {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Url(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filename-safe key for this URL, used to name persisted remotes.
    pub fn cache_key(&self) -> String {
        filename_key(&self.0)
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Url {
    fn from(s: &str) -> Self {
        Url(s.to_string())
    }
}

impl From<String> for Url {
    fn from(s: String) -> Self {
        Url(s)
    }
}

impl From<&Path> for Url {
    fn from(p: &Path) -> Self {
        Url(p.to_string_lossy().into_owned())
    }
}

/// The name of a git branch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Branch(String);

pub const MAIN_BRANCH: &str = "main";

impl Branch {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Branch(name.into())
    }

    pub fn main() -> Self {
        Branch(MAIN_BRANCH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Nested branch name, e.g. `Branch::new("cache").sub("r2")` is `cache/r2`.
    pub fn sub<S: AsRef<str>>(&self, name: S) -> Branch {
        Branch(format!("{}/{}", self.0, name.as_ref()))
    }

    /// Fully qualified reference name, `refs/heads/<branch>`.
    pub fn reference_name(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Branch {
    fn from(s: &str) -> Self {
        Branch(s.to_string())
    }
}

impl From<String> for Branch {
    fn from(s: String) -> Self {
        Branch(s)
    }
}

/// The coordinate of a remote branch: which repository, which branch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    pub url: Url,
    pub branch: Branch,
}

impl Address {
    pub fn new<U: Into<Url>, B: Into<Branch>>(url: U, branch: B) -> Self {
        Address {
            url: url.into(),
            branch: branch.into(),
        }
    }

    /// Filename-safe key for this address, used to name replica directories.
    pub fn cache_key(&self) -> String {
        filename_key(&self.to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.url, self.branch)
    }
}

/// Stable filename-safe hash of a string: lowercased, unpadded base32 of its
/// SHA-256 digest.
pub fn filename_key(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    BASE32_NOPAD.encode(&digest).to_ascii_lowercase()
}
