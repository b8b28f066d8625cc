use std::time::Duration;
use url::Url;

use crate::updater::site::Environment;
use crate::updater::types::{UpdaterError, UpdaterResult};

/// Vendor update server URL
pub const DEFAULT_API_URL: &str = "https://wpcommon.com";

/// Network timeout for both the reachability probe and API calls
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Cached API responses live for three hours
pub const CACHE_TTL_SECS: u64 = 3 * 60 * 60;

/// Prefix for persisted settings, form fields and nonce actions
pub const SETTINGS_PREFIX: &str = "updater";

/// Prefix for result cache keys
pub const CACHE_PREFIX: &str = "updater_cache";

/// Management page the admin flow redirects back to
pub const DEFAULT_MANAGEMENT_URL: &str = "admin.php?page=updater";

/// Where customers find their keys and key-less downloads
pub const DEFAULT_DOWNLOADS_URL: &str = "https://wpcommon.com/my-account/downloads/";

/// Host page on which network installs skip the update check
pub const PLUGIN_LIST_PAGE: &str = "plugins.php";

/// Host action name for the package details dialog
pub const PLUGIN_INFORMATION_ACTION: &str = "plugin_information";

/// Persisted settings keys
pub mod keys {
    use super::SETTINGS_PREFIX;

    pub fn update_key(id: &str) -> String {
        format!("{}_{}_update_key", SETTINGS_PREFIX, id)
    }

    pub fn update_status(id: &str) -> String {
        format!("{}_{}_update_status", SETTINGS_PREFIX, id)
    }

    pub fn nonce(id: &str) -> String {
        format!("{}_{}_nonce", SETTINGS_PREFIX, id)
    }

    pub fn activate(id: &str) -> String {
        format!("{}_{}_activate", SETTINGS_PREFIX, id)
    }

    pub fn deactivate(id: &str) -> String {
        format!("{}_{}_deactivate", SETTINGS_PREFIX, id)
    }
}

/// Runtime configuration shared by every package on one host
#[derive(Clone, Debug)]
pub struct UpdaterConfig {
    /// Vendor endpoint; POSTs go to this URL with a trailing slash
    pub api_url: Url,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    /// Reported to the vendor as `url`
    pub home_url: String,
    /// Reported to the vendor as `environment`
    pub environment: Environment,
    pub management_url: String,
    pub downloads_url: String,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(CACHE_TTL_SECS),
            home_url: String::new(),
            environment: Environment::default(),
            management_url: DEFAULT_MANAGEMENT_URL.to_string(),
            downloads_url: DEFAULT_DOWNLOADS_URL.to_string(),
        }
    }
}

impl UpdaterConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `UPDATER_API_URL` (default: `https://wpcommon.com`)
    /// - `UPDATER_TIMEOUT_SECS` (default: 15)
    /// - `UPDATER_CACHE_TTL_SECS` (default: 10800)
    /// - `UPDATER_HOME_URL` (default: empty)
    /// - `UPDATER_ENVIRONMENT` (default: `production`)
    /// - `UPDATER_MANAGEMENT_URL` (default: `admin.php?page=updater`)
    pub fn from_env() -> UpdaterResult<Self> {
        let defaults = Self::default();

        let api_url = match std::env::var("UPDATER_API_URL") {
            Ok(raw) => parse_api_url(&raw)?,
            Err(_) => defaults.api_url,
        };

        Ok(Self {
            api_url,
            timeout: env_secs("UPDATER_TIMEOUT_SECS").unwrap_or(defaults.timeout),
            cache_ttl: env_secs("UPDATER_CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl),
            home_url: std::env::var("UPDATER_HOME_URL").unwrap_or(defaults.home_url),
            environment: Environment::from_env(),
            management_url: std::env::var("UPDATER_MANAGEMENT_URL")
                .unwrap_or(defaults.management_url),
            downloads_url: defaults.downloads_url,
        })
    }

    pub fn with_api_url(mut self, raw: &str) -> UpdaterResult<Self> {
        self.api_url = parse_api_url(raw)?;
        Ok(self)
    }

    pub fn with_home_url(mut self, home_url: impl Into<String>) -> Self {
        self.home_url = home_url.into();
        self
    }

    /// POST target, always with a trailing slash
    pub fn endpoint(&self) -> String {
        let raw = self.api_url.as_str();
        if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{}/", raw)
        }
    }
}

pub fn parse_api_url(raw: &str) -> UpdaterResult<Url> {
    Url::parse(raw.trim()).map_err(|e| UpdaterError::Config(format!("invalid API URL {raw:?}: {e}")))
}

fn env_secs(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}
