use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use git2::{Cred, RemoteCallbacks};

use crate::address::Url;
use crate::context::Context;

/// A credential for one remote.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// HTTPS basic authentication.
    UserPassword { username: String, password: String },
    /// HTTPS bearer token, sent as basic auth with a dummy username.
    Token { token: String },
    /// SSH private key file with an optional passphrase.
    SshKey {
        username: String,
        private_key: PathBuf,
        passphrase: Option<String>,
    },
}

/// Per-URL credentials. Cheap to clone; clones share the same map. Absence of
/// an entry is not an error: transfers proceed unauthenticated and fail only
/// if the remote demands credentials.
#[derive(Debug, Clone, Default)]
pub struct AuthManager {
    auth: Arc<Mutex<HashMap<Url, AuthMethod>>>,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, url: &Url, method: AuthMethod) {
        self.auth.lock().unwrap().insert(url.clone(), method);
    }

    pub fn set_password(&self, url: &Url, username: &str, password: &str) {
        self.set(
            url,
            AuthMethod::UserPassword {
                username: username.to_string(),
                password: password.to_string(),
            },
        );
    }

    pub fn set_token(&self, url: &Url, token: &str) {
        self.set(
            url,
            AuthMethod::Token {
                token: token.to_string(),
            },
        );
    }

    pub fn set_ssh_key(
        &self,
        url: &Url,
        username: &str,
        private_key: PathBuf,
        passphrase: Option<String>,
    ) {
        self.set(
            url,
            AuthMethod::SshKey {
                username: username.to_string(),
                private_key,
                passphrase,
            },
        );
    }

    pub fn get(&self, url: &Url) -> Option<AuthMethod> {
        self.auth.lock().unwrap().get(url).cloned()
    }
}

/// Installs credential and cancellation callbacks for a transfer to `url`.
pub fn install_callbacks(ctx: &Context, url: &Url, callbacks: &mut RemoteCallbacks<'_>) {
    let auth = ctx.auth().get(url);
    callbacks.credentials(move |_url, username_from_url, _allowed| match &auth {
        Some(AuthMethod::UserPassword { username, password }) => {
            Cred::userpass_plaintext(username, password)
        }
        // The username only has to be non-empty; the token carries the identity.
        Some(AuthMethod::Token { token }) => Cred::userpass_plaintext("token", token),
        Some(AuthMethod::SshKey {
            username,
            private_key,
            passphrase,
        }) => {
            let user = username_from_url.unwrap_or(username.as_str());
            Cred::ssh_key(user, None, private_key, passphrase.as_deref())
        }
        None => Cred::default(),
    });

    let cancel = ctx.cancel_token();
    callbacks.transfer_progress(move |_progress| !cancel.is_cancelled());
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn absent_credentials_are_not_an_error() {
        let auth = AuthManager::new();
        assert!(auth.get(&Url::from("https://example.com/x.git")).is_none());
    }

    #[test]
    fn clones_share_entries() {
        let auth = AuthManager::new();
        let url = Url::from("https://example.com/x.git");
        auth.clone().set_token(&url, "s3cret");
        match auth.get(&url) {
            Some(AuthMethod::Token { token }) => assert_eq!(token, "s3cret"),
            other => panic!("unexpected credential {other:?}"),
        }
    }

    #[test]
    fn latest_credential_wins() {
        let auth = AuthManager::new();
        let url = Url::from("https://example.com/x.git");
        auth.set_password(&url, "user", "pass");
        auth.set_ssh_key(&url, "git", PathBuf::from("/home/u/.ssh/id_ed25519"), None);
        match auth.get(&url) {
            Some(AuthMethod::SshKey { username, .. }) => assert_eq!(username, "git"),
            other => panic!("unexpected credential {other:?}"),
        }
    }
}
