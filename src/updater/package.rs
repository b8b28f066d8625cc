use async_trait::async_trait;
use std::sync::Arc;

use crate::updater::api::ApiClient;
use crate::updater::availability::HostAvailability;
use crate::updater::checker::UpdateChecker;
use crate::updater::config::UpdaterConfig;
use crate::updater::hooks::{HookOutcome, UpdateHook};
use crate::updater::manager::LicenseManager;
use crate::updater::response::ApiResponse;
use crate::updater::settings::PackageSettings;
use crate::updater::storage::{Clock, KeyValueStore, SystemClock};
use crate::updater::types::{
    HostContext, InfoRequest, PackageIdentity, UpdateTransient, UpdaterResult,
};

/// Everything the host needs for one installed package
pub struct PackageUpdater {
    package: Arc<PackageIdentity>,
    config: UpdaterConfig,
    settings: PackageSettings,
    license: LicenseManager,
    checker: UpdateChecker,
}

impl PackageUpdater {
    pub fn new(
        package: PackageIdentity,
        config: UpdaterConfig,
        store: Arc<dyn KeyValueStore>,
        availability: Arc<HostAvailability>,
    ) -> UpdaterResult<Self> {
        Self::with_clock(package, config, store, availability, Arc::new(SystemClock))
    }

    pub fn with_clock(
        package: PackageIdentity,
        config: UpdaterConfig,
        store: Arc<dyn KeyValueStore>,
        availability: Arc<HostAvailability>,
        clock: Arc<dyn Clock>,
    ) -> UpdaterResult<Self> {
        let package = Arc::new(package);
        let client = Arc::new(ApiClient::new(&config, &package, availability)?);
        let settings = PackageSettings::new(store.clone(), &package.id);

        let license = LicenseManager::new(
            package.clone(),
            settings.clone(),
            client.clone(),
            store.clone(),
            config.cache_ttl,
        );
        let checker = UpdateChecker::new(
            package.clone(),
            settings.clone(),
            client,
            store,
            config.cache_ttl,
            clock,
        );

        Ok(Self {
            package,
            config,
            settings,
            license,
            checker,
        })
    }

    pub fn package(&self) -> &PackageIdentity {
        &self.package
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn license(&self) -> &LicenseManager {
        &self.license
    }

    pub fn checker(&self) -> &UpdateChecker {
        &self.checker
    }

    pub(crate) fn settings(&self) -> &PackageSettings {
        &self.settings
    }
}

#[async_trait]
impl UpdateHook for PackageUpdater {
    async fn on_update_check(
        &self,
        transient: &UpdateTransient,
        ctx: &HostContext,
    ) -> HookOutcome<UpdateTransient> {
        if ctx.is_exempt() {
            return HookOutcome::Pass;
        }
        let updated = self
            .checker
            .filter_update_transient(transient.clone(), ctx)
            .await;
        HookOutcome::Replace(updated)
    }

    async fn on_plugin_info(
        &self,
        _current: Option<&ApiResponse>,
        request: &InfoRequest,
    ) -> HookOutcome<ApiResponse> {
        HookOutcome::from_option(self.checker.plugin_information(request).await)
    }
}

impl std::fmt::Debug for PackageUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageUpdater")
            .field("package", &self.package)
            .field("config", &self.config)
            .finish()
    }
}
