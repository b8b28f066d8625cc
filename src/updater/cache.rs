use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::updater::config::CACHE_PREFIX;
use crate::updater::response::ApiResponse;
use crate::updater::storage::KeyValueStore;
use crate::updater::types::{Action, PackageIdentity, UpdaterError};

/// Time-boxed memoization of vendor responses.
///
/// Entries are namespaced by `(slug, update key, channel)` and then by
/// operation. Packages sharing all three share a namespace. Only concrete
/// responses are cached, never failures.
pub struct ResultCache {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: String, ttl: Duration) -> Self {
        Self {
            store,
            namespace,
            ttl,
        }
    }

    pub fn for_package(
        store: Arc<dyn KeyValueStore>,
        package: &PackageIdentity,
        update_key: &str,
        ttl: Duration,
    ) -> Self {
        Self::new(store, namespace(&package.slug, update_key, package.beta), ttl)
    }

    pub fn key(&self, operation: Action) -> String {
        format!("{}_{}", self.namespace, operation.as_str())
    }

    /// Cached response, `None` on miss, expiry, or an unreadable entry
    pub fn get(&self, operation: Action) -> Option<ApiResponse> {
        let key = self.key(operation);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(%operation, "result cache miss");
                return None;
            }
            Err(e) => {
                warn!(%operation, error = %e, "result cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(response) => {
                debug!(%operation, "result cache hit");
                Some(response)
            }
            Err(e) => {
                warn!(%operation, error = %e, "discarding unreadable cache entry");
                None
            }
        }
    }

    pub fn put(&self, operation: Action, value: &ApiResponse) {
        let key = self.key(operation);
        let stored = serde_json::to_string(value)
            .map_err(UpdaterError::from)
            .and_then(|json| self.store.set(&key, &json, Some(self.ttl)));

        if let Err(e) = stored {
            warn!(%operation, error = %e, "result cache write failed");
        }
    }
}

/// Stable namespace for `(slug, key, beta)`
pub fn namespace(slug: &str, update_key: &str, beta: bool) -> String {
    let mut hasher = Sha256::new();
    hasher.update(slug.as_bytes());
    hasher.update(update_key.as_bytes());
    hasher.update(if beta { b"1".as_slice() } else { b"".as_slice() });
    let digest = hasher.finalize();

    format!("{}_{}", CACHE_PREFIX, hex::encode(&digest[..16]))
}
