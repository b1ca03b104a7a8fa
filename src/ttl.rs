use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::address::Url;

/// Per-URL freshness hints for replica caches. Cheap to clone; clones share
/// the same map. A URL with no entry has a TTL of zero, meaning a cached
/// replica is never considered fresh without a re-fetch.
#[derive(Debug, Clone, Default)]
pub struct TtlManager {
    ttl: Arc<Mutex<HashMap<Url, Duration>>>,
}

impl TtlManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, url: &Url, ttl: Duration) {
        self.ttl.lock().unwrap().insert(url.clone(), ttl);
    }

    pub fn get(&self, url: &Url) -> Duration {
        self.ttl
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_ttl_is_zero() {
        let ttl = TtlManager::new();
        assert_eq!(ttl.get(&Url::from("a")), Duration::ZERO);
    }

    #[test]
    fn clones_share_entries() {
        let ttl = TtlManager::new();
        let other = ttl.clone();
        other.set(&Url::from("a"), Duration::from_secs(60));
        assert_eq!(ttl.get(&Url::from("a")), Duration::from_secs(60));
    }
}
