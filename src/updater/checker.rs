use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::updater::api::ApiClient;
use crate::updater::cache::ResultCache;
use crate::updater::config::PLUGIN_INFORMATION_ACTION;
use crate::updater::response::ApiResponse;
use crate::updater::settings::PackageSettings;
use crate::updater::storage::{Clock, KeyValueStore};
use crate::updater::types::{
    Action, HostContext, InfoRequest, PackageIdentity, UpdateCheck, UpdateTransient,
};
use crate::updater::version::is_newer;

/// Decides whether the vendor offers a newer version of one package
pub struct UpdateChecker {
    package: Arc<PackageIdentity>,
    settings: PackageSettings,
    client: Arc<ApiClient>,
    store: Arc<dyn KeyValueStore>,
    cache_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl UpdateChecker {
    pub fn new(
        package: Arc<PackageIdentity>,
        settings: PackageSettings,
        client: Arc<ApiClient>,
        store: Arc<dyn KeyValueStore>,
        cache_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            package,
            settings,
            client,
            store,
            cache_ttl,
            clock,
        }
    }

    /// Version metadata from the cache, else from the vendor.
    ///
    /// Fresh responses are stamped with this package's name before caching.
    pub async fn version_info(&self) -> Option<ApiResponse> {
        let key = match self.settings.update_key() {
            Ok(key) => key,
            Err(e) => {
                warn!(package = %self.package.name, error = %e, "could not read update key");
                return None;
            }
        };

        let cache =
            ResultCache::for_package(self.store.clone(), &self.package, &key, self.cache_ttl);
        if let Some(cached) = cache.get(Action::GetVersion) {
            return Some(cached);
        }

        let mut fresh = self.client.perform(Action::GetVersion, &key).await?;
        fresh.stamp(&self.package.name);
        cache.put(Action::GetVersion, &fresh);
        Some(fresh)
    }

    /// Compare `installed` against the vendor's latest version.
    ///
    /// `None` when the vendor gave no data or no `new_version`.
    pub async fn check_for_update(&self, installed: &str) -> Option<UpdateCheck> {
        let metadata = self.version_info().await?;
        let available = metadata.new_version.as_deref()?;
        let has_update = is_newer(installed, available);

        debug!(
            package = %self.package.name,
            installed,
            available,
            has_update,
            "compared versions"
        );
        Some(UpdateCheck {
            has_update,
            metadata,
        })
    }

    /// Record this package's result in the host's pending-updates aggregate
    pub async fn filter_update_transient(
        &self,
        mut transient: UpdateTransient,
        ctx: &HostContext,
    ) -> UpdateTransient {
        if ctx.is_exempt() {
            return transient;
        }

        let name = &self.package.name;
        if transient.response.contains_key(name) && !self.package.host_override {
            debug!(package = %name, "host already has a pending update");
            return transient;
        }

        let installed = &self.package.version;
        if let Some(check) = self.check_for_update(installed).await {
            if check.has_update {
                transient.no_update.remove(name);
                transient.response.insert(name.clone(), check.metadata);
            } else {
                transient.response.remove(name);
                transient.no_update.insert(name.clone(), check.metadata);
            }
        }

        transient.last_checked = Some(self.clock.now());
        transient.checked.insert(name.clone(), installed.clone());
        transient
    }

    /// Full metadata for the host's details dialog, when the request is ours
    pub async fn plugin_information(&self, request: &InfoRequest) -> Option<ApiResponse> {
        if request.action != PLUGIN_INFORMATION_ACTION {
            return None;
        }

        let current = self.version_info().await?;
        match (&current.slug, &request.slug) {
            (Some(ours), Some(requested)) if ours == requested => Some(current),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::availability::HostAvailability;
    use crate::updater::config::UpdaterConfig;
    use crate::updater::storage::{MemoryStore, SystemClock};
    use pretty_assertions::assert_eq;

    const TTL: Duration = Duration::from_secs(3 * 60 * 60);

    /// Checker backed by a pre-filled cache and an unreachable vendor
    fn checker_with_cached(package: PackageIdentity, cached: Option<ApiResponse>) -> UpdateChecker {
        let package = Arc::new(package);
        let config = UpdaterConfig::default();
        let availability = Arc::new(HostAvailability::new());
        availability.record(&config.endpoint(), false);

        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        if let Some(response) = cached {
            ResultCache::for_package(store.clone(), &package, "", TTL)
                .put(Action::GetVersion, &response);
        }

        let client = Arc::new(ApiClient::new(&config, &package, availability).unwrap());
        let settings = PackageSettings::new(store.clone(), &package.id);
        UpdateChecker::new(package, settings, client, store, TTL, Arc::new(SystemClock))
    }

    fn offer(version: &str) -> ApiResponse {
        ApiResponse {
            new_version: Some(version.into()),
            slug: Some("my-plugin".into()),
            ..Default::default()
        }
    }

    fn package(version: &str) -> PackageIdentity {
        PackageIdentity::new("1", "my-plugin/my-plugin.php", "My Plugin", version)
    }

    #[tokio::test]
    async fn newer_offer_is_an_update() {
        let checker = checker_with_cached(package("2.0.0"), Some(offer("2.1.0")));
        let check = checker.check_for_update("2.0.0").await.unwrap();
        assert!(check.has_update);
        assert_eq!(check.metadata.new_version.as_deref(), Some("2.1.0"));
    }

    #[tokio::test]
    async fn same_version_is_not_an_update() {
        let checker = checker_with_cached(package("2.1.0"), Some(offer("2.1.0")));
        let check = checker.check_for_update("2.1.0").await.unwrap();
        assert!(!check.has_update);
    }

    #[tokio::test]
    async fn no_data_means_no_result() {
        let checker = checker_with_cached(package("2.1.0"), None);
        assert!(checker.check_for_update("2.1.0").await.is_none());

        let no_version = ApiResponse {
            slug: Some("my-plugin".into()),
            ..Default::default()
        };
        let checker = checker_with_cached(package("2.1.0"), Some(no_version));
        assert!(checker.check_for_update("2.1.0").await.is_none());
    }

    #[tokio::test]
    async fn transient_gets_bucket_and_tracking() {
        let checker = checker_with_cached(package("2.0.0"), Some(offer("2.1.0")));
        let transient = checker
            .filter_update_transient(UpdateTransient::default(), &HostContext::default())
            .await;

        let name = "my-plugin/my-plugin.php";
        assert!(transient.response.contains_key(name));
        assert!(!transient.no_update.contains_key(name));
        assert_eq!(transient.checked.get(name).map(String::as_str), Some("2.0.0"));
        assert!(transient.last_checked.is_some());
    }

    #[tokio::test]
    async fn up_to_date_goes_to_no_update() {
        let checker = checker_with_cached(package("2.1.0"), Some(offer("2.1.0")));
        let transient = checker
            .filter_update_transient(UpdateTransient::default(), &HostContext::default())
            .await;

        assert!(transient.response.is_empty());
        assert!(transient.no_update.contains_key("my-plugin/my-plugin.php"));
    }

    #[tokio::test]
    async fn tracking_is_stamped_even_without_data() {
        let checker = checker_with_cached(package("2.1.0"), None);
        let transient = checker
            .filter_update_transient(UpdateTransient::default(), &HostContext::default())
            .await;

        assert!(transient.response.is_empty());
        assert!(transient.no_update.is_empty());
        assert!(transient.last_checked.is_some());
        assert_eq!(transient.checked.len(), 1);
    }

    #[tokio::test]
    async fn exempt_context_returns_input() {
        let checker = checker_with_cached(package("2.0.0"), Some(offer("2.1.0")));
        let ctx = HostContext {
            multisite: true,
            page: Some("plugins.php".into()),
        };
        let transient = checker
            .filter_update_transient(UpdateTransient::default(), &ctx)
            .await;
        assert_eq!(transient, UpdateTransient::default());
    }

    #[tokio::test]
    async fn pending_host_update_is_respected_unless_overridden() {
        let mut pending = UpdateTransient::default();
        pending
            .response
            .insert("my-plugin/my-plugin.php".into(), offer("9.9.9"));

        let checker = checker_with_cached(package("2.0.0"), Some(offer("2.1.0")));
        let kept = checker
            .filter_update_transient(pending.clone(), &HostContext::default())
            .await;
        assert_eq!(kept, pending);

        let overriding = checker_with_cached(
            package("2.0.0").with_host_override(true),
            Some(offer("2.1.0")),
        );
        let replaced = overriding
            .filter_update_transient(pending, &HostContext::default())
            .await;
        assert_eq!(
            replaced.response["my-plugin/my-plugin.php"].new_version.as_deref(),
            Some("2.1.0")
        );
    }

    #[tokio::test]
    async fn information_only_for_matching_slug() {
        let checker = checker_with_cached(package("2.0.0"), Some(offer("2.1.0")));

        let ours = checker
            .plugin_information(&InfoRequest::plugin_information("my-plugin"))
            .await;
        assert_eq!(ours, Some(offer("2.1.0")));

        let other = checker
            .plugin_information(&InfoRequest::plugin_information("someone-else"))
            .await;
        assert_eq!(other, None);

        let wrong_action = InfoRequest {
            action: "query_plugins".into(),
            slug: Some("my-plugin".into()),
        };
        assert_eq!(checker.plugin_information(&wrong_action).await, None);
    }
}
