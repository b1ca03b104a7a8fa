pub mod address;
pub mod auth;
pub mod context;
pub mod embed;
mod error;
pub mod files;
pub mod lock;
pub mod merge;
pub mod nocache;
pub mod ns;
pub mod objects;
pub mod proxy;
pub mod replica;
pub mod repo;
pub mod transport;
pub mod ttl;

pub use address::{filename_key, Address, Branch, Url, MAIN_BRANCH};
pub use auth::{AuthManager, AuthMethod};
pub use context::Context;
pub use error::{Error, Result};
pub use files::WorkTree;
pub use merge::{CollisionPolicy, MergeFilter};
pub use ns::Ns;
pub use proxy::{clone_all, clone_one, Cloned, Proxy};
pub use ttl::TtlManager;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
