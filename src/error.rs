use git2::{ErrorClass, ErrorCode};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Git(#[from] git2::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// The remote reported a rejected reference update during a push.
    #[error("push of {refname} rejected: {status}")]
    PushRejected { refname: String, status: String },
    /// A tree merge ran into a name collision under [`CollisionPolicy::Fail`].
    ///
    /// [`CollisionPolicy::Fail`]: crate::merge::CollisionPolicy::Fail
    #[error("tree entry {0} already exists")]
    MergeCollision(String),
    #[error("operation canceled")]
    Canceled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    /// Caller-side invariant violation, e.g. mismatched argument lengths.
    #[error("{0}")]
    Invariant(String),
}

// Transport errors are classified by predicates rather than typed variants:
// libgit2 reports most of these as (code, class, message) triples whose exact
// shape varies by transport, so classification inspects all three.
impl Error {
    fn git(&self) -> Option<&git2::Error> {
        match self {
            Error::Git(e) => Some(e),
            _ => None,
        }
    }

    fn git_message(&self) -> &str {
        self.git().map(|e| e.message()).unwrap_or("")
    }

    pub fn is_already_up_to_date(&self) -> bool {
        let m = self.git_message();
        m.contains("up to date") || m.contains("up-to-date")
    }

    pub fn is_empty_remote(&self) -> bool {
        let m = self.git_message();
        m.contains("remote repository is empty")
            || (m.contains("remote HEAD") && m.contains("nonexistent"))
    }

    pub fn is_auth_required(&self) -> bool {
        match self.git() {
            Some(e) => {
                e.code() == ErrorCode::Auth || e.message().contains("authentication required")
            }
            None => false,
        }
    }

    pub fn is_io_timeout(&self) -> bool {
        match self {
            Error::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            Error::Git(e) => e.message().contains("timed out") || e.message().contains("timeout"),
            _ => false,
        }
    }

    pub fn is_repo_not_found(&self) -> bool {
        match self.git() {
            Some(e) => {
                let net = matches!(
                    e.class(),
                    ErrorClass::Net | ErrorClass::Http | ErrorClass::Repository | ErrorClass::Os
                );
                (e.code() == ErrorCode::NotFound && net)
                    || e.message().contains("failed to resolve path")
                    || e.message().contains("repository not found")
            }
            None => false,
        }
    }

    pub fn is_invalid_auth_method(&self) -> bool {
        let m = self.git_message();
        m.contains("authentication method") || (m.contains("invalid") && m.contains("auth"))
    }

    pub fn is_auth_failed(&self) -> bool {
        let m = self.git_message();
        m.contains("authorization failed")
            || m.contains("invalid credentials")
            || m.contains("403")
    }

    pub fn is_no_matching_refspec(&self) -> bool {
        let m = self.git_message();
        (m.contains("refspec") && m.contains("match"))
            || m.contains("couldn't find remote ref")
            || m.contains("no matching remote head")
    }

    pub fn is_ref_not_found(&self) -> bool {
        match self.git() {
            Some(e) => {
                (e.code() == ErrorCode::NotFound && e.class() == ErrorClass::Reference)
                    || e.code() == ErrorCode::UnbornBranch
            }
            None => false,
        }
    }

    pub fn is_non_fast_forward(&self) -> bool {
        match self {
            Error::PushRejected { status, .. } => {
                status.contains("non-fast-forward") || status.contains("fast forward")
            }
            Error::Git(e) => {
                e.code() == ErrorCode::NotFastForward
                    || e.message().contains("non-fastforwardable")
                    || e.message().contains("non-fast-forward")
            }
            _ => false,
        }
    }

    /// Auth required, I/O timeout, or repository not found.
    pub fn is_inaccessible(&self) -> bool {
        self.is_auth_required() || self.is_io_timeout() || self.is_repo_not_found()
    }

    /// Outcomes a pull treats as success with no effect.
    pub fn is_benign_pull(&self) -> bool {
        self.is_already_up_to_date() || self.is_empty_remote() || self.is_no_matching_refspec()
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled | Error::DeadlineExceeded)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn git_err(code: ErrorCode, class: ErrorClass, msg: &str) -> Error {
        Error::Git(git2::Error::new(code, class, msg))
    }

    #[test]
    fn non_fast_forward_classification() {
        let e = git_err(
            ErrorCode::NotFastForward,
            ErrorClass::Reference,
            "cannot push non-fastforwardable reference",
        );
        assert!(e.is_non_fast_forward());
        assert!(!e.is_inaccessible());

        let rejected = Error::PushRejected {
            refname: "refs/heads/main".into(),
            status: "non-fast-forward".into(),
        };
        assert!(rejected.is_non_fast_forward());
    }

    #[test]
    fn inaccessible_composition() {
        let auth = git_err(ErrorCode::Auth, ErrorClass::Http, "authentication required");
        assert!(auth.is_auth_required());
        assert!(auth.is_inaccessible());

        let missing = git_err(
            ErrorCode::NotFound,
            ErrorClass::Os,
            "failed to resolve path '/nope': No such file or directory",
        );
        assert!(missing.is_repo_not_found());
        assert!(missing.is_inaccessible());

        let timeout = Error::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "i/o timeout",
        ));
        assert!(timeout.is_io_timeout());
        assert!(timeout.is_inaccessible());
    }

    #[test]
    fn benign_pull_outcomes() {
        let upd = git_err(ErrorCode::GenericError, ErrorClass::Net, "already up to date");
        assert!(upd.is_already_up_to_date());
        assert!(upd.is_benign_pull());

        let empty = git_err(
            ErrorCode::GenericError,
            ErrorClass::Net,
            "remote repository is empty",
        );
        assert!(empty.is_empty_remote());
        assert!(empty.is_benign_pull());

        let refspec = git_err(
            ErrorCode::NotFound,
            ErrorClass::Net,
            "refspec 'refs/heads/nope' does not match any ref",
        );
        assert!(refspec.is_no_matching_refspec());
        assert!(refspec.is_benign_pull());

        let auth = git_err(ErrorCode::Auth, ErrorClass::Http, "authentication required");
        assert!(!auth.is_benign_pull());
    }

    #[test]
    fn auth_and_reference_classifiers() {
        let refspec_missing = git_err(
            ErrorCode::NotFound,
            ErrorClass::Reference,
            "reference 'refs/heads/x' not found",
        );
        assert!(refspec_missing.is_ref_not_found());

        let invalid = git_err(
            ErrorCode::GenericError,
            ErrorClass::Ssh,
            "unsupported authentication method",
        );
        assert!(invalid.is_invalid_auth_method());

        let denied = git_err(
            ErrorCode::Auth,
            ErrorClass::Http,
            "authorization failed: invalid credentials",
        );
        assert!(denied.is_auth_failed());
    }

    #[test]
    fn cancellation_kinds() {
        assert!(Error::Canceled.is_canceled());
        assert!(Error::DeadlineExceeded.is_canceled());
        assert!(!Error::Invariant("x".into()).is_canceled());
    }
}
