use std::sync::Arc;

use crate::updater::config::keys;
use crate::updater::storage::KeyValueStore;
use crate::updater::types::{LicenseStatus, UpdaterResult};

/// Persisted update key and license status of one package
#[derive(Clone)]
pub struct PackageSettings {
    store: Arc<dyn KeyValueStore>,
    key_field: String,
    status_field: String,
}

impl PackageSettings {
    pub fn new(store: Arc<dyn KeyValueStore>, package_id: &str) -> Self {
        Self {
            store,
            key_field: keys::update_key(package_id),
            status_field: keys::update_status(package_id),
        }
    }

    /// Stored key, trimmed; empty when never set
    pub fn update_key(&self) -> UpdaterResult<String> {
        Ok(self
            .store
            .get(&self.key_field)?
            .map(|key| key.trim().to_string())
            .unwrap_or_default())
    }

    /// Persist a key. A changed non-empty key invalidates the stored status.
    pub fn set_update_key(&self, key: &str) -> UpdaterResult<()> {
        let key = key.trim();
        let previous = self.update_key()?;
        if !previous.is_empty() && previous != key {
            self.store.delete(&self.status_field)?;
        }
        self.store.set(&self.key_field, key, None)
    }

    pub fn status(&self) -> UpdaterResult<LicenseStatus> {
        Ok(self
            .store
            .get(&self.status_field)?
            .map(|token| LicenseStatus::from_token(&token))
            .unwrap_or_default())
    }

    /// Store a vendor token; a missing or empty token deletes the status
    pub fn record_status(&self, token: Option<&str>) -> UpdaterResult<LicenseStatus> {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => {
                self.store.set(&self.status_field, token, None)?;
                Ok(LicenseStatus::from_token(token))
            }
            None => {
                self.clear_status()?;
                Ok(LicenseStatus::Unset)
            }
        }
    }

    pub fn clear_status(&self) -> UpdaterResult<()> {
        self.store.delete(&self.status_field)
    }
}

impl std::fmt::Debug for PackageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageSettings")
            .field("key_field", &self.key_field)
            .field("status_field", &self.status_field)
            .finish()
    }
}
