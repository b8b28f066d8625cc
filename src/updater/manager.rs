use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::updater::api::ApiClient;
use crate::updater::cache::ResultCache;
use crate::updater::settings::PackageSettings;
use crate::updater::storage::KeyValueStore;
use crate::updater::types::{Action, LicenseStatus, PackageIdentity, UpdaterResult};

/// License activation state machine for one package.
///
/// The persisted status always mirrors the `license` token of the latest
/// vendor answer. A call that yields no data leaves the status unset.
pub struct LicenseManager {
    package: Arc<PackageIdentity>,
    settings: PackageSettings,
    client: Arc<ApiClient>,
    store: Arc<dyn KeyValueStore>,
    cache_ttl: Duration,
}

impl LicenseManager {
    pub fn new(
        package: Arc<PackageIdentity>,
        settings: PackageSettings,
        client: Arc<ApiClient>,
        store: Arc<dyn KeyValueStore>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            package,
            settings,
            client,
            store,
            cache_ttl,
        }
    }

    pub fn status(&self) -> UpdaterResult<LicenseStatus> {
        self.settings.status()
    }

    pub fn update_key(&self) -> UpdaterResult<String> {
        self.settings.update_key()
    }

    /// Persist a new key, forcing re-validation when it differs
    pub fn set_update_key(&self, key: &str) -> UpdaterResult<()> {
        self.settings.set_update_key(key)
    }

    pub async fn activate(&self, key: &str) -> UpdaterResult<LicenseStatus> {
        self.transition(Action::ActivateLicense, key).await
    }

    pub async fn deactivate(&self, key: &str) -> UpdaterResult<LicenseStatus> {
        self.transition(Action::DeactivateLicense, key).await
    }

    /// Activation and deactivation share one flow: the key is stored no
    /// matter what the vendor answers, then the status follows the answer.
    async fn transition(&self, action: Action, key: &str) -> UpdaterResult<LicenseStatus> {
        let key = key.trim();
        self.settings.set_update_key(key)?;

        let status = match self.client.perform(action, key).await {
            Some(response) => {
                let status = self.settings.record_status(response.license.as_deref())?;
                self.cache(key).put(Action::CheckLicense, &response);
                status
            }
            None => {
                self.settings.clear_status()?;
                LicenseStatus::Unset
            }
        };

        info!(
            package = %self.package.name,
            %action,
            status = status.token().unwrap_or("unset"),
            "license transition"
        );
        Ok(status)
    }

    /// Re-validate a valid license, reconciling drift such as a revoked key.
    ///
    /// Does nothing unless the stored status is `valid`.
    pub async fn check(&self) -> UpdaterResult<LicenseStatus> {
        let status = self.settings.status()?;
        if !status.is_valid() {
            return Ok(status);
        }

        let key = self.settings.update_key()?;
        let cache = self.cache(&key);

        let response = match cache.get(Action::CheckLicense) {
            Some(cached) => Some(cached),
            None => {
                let fresh = self.client.perform(Action::CheckLicense, &key).await;
                if let Some(response) = &fresh {
                    cache.put(Action::CheckLicense, response);
                }
                fresh
            }
        };

        let token = response.as_ref().and_then(|r| r.license.as_deref());
        if token == status.token() {
            debug!(package = %self.package.name, "license still valid");
            return Ok(status);
        }

        let updated = self.settings.record_status(token)?;
        info!(
            package = %self.package.name,
            status = updated.token().unwrap_or("unset"),
            "license status changed on check"
        );
        Ok(updated)
    }

    fn cache(&self, key: &str) -> ResultCache {
        ResultCache::for_package(self.store.clone(), &self.package, key, self.cache_ttl)
    }
}
