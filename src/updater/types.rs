use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::updater::response::ApiResponse;

/// Identity of the package being version-checked
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PackageIdentity {
    /// Namespace for persisted settings and form fields
    pub id: String,
    /// Host-relative identifier, e.g. `my-plugin/my-plugin.php`
    pub name: String,
    /// File stem of `name`, used as cache and API namespace
    pub slug: String,
    /// Installed version
    pub version: String,
    /// Human readable name, sent to the vendor as `item_name`
    pub display_name: String,
    /// Pre-release channel
    pub beta: bool,
    /// Re-check even when the host already recorded a pending update
    pub host_override: bool,
}

impl PackageIdentity {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        display_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let slug = derive_slug(&name);

        Self {
            id: id.into(),
            name,
            slug,
            version: version.into(),
            display_name: display_name.into(),
            beta: false,
            host_override: false,
        }
    }

    pub fn with_beta(mut self, beta: bool) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_host_override(mut self, host_override: bool) -> Self {
        self.host_override = host_override;
        self
    }
}

/// Slug is the file stem of the last path component (`dir/plugin.php` -> `plugin`)
fn derive_slug(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| name.to_string())
}

/// Persisted license status.
///
/// Only `Valid` gates behaviour. Every other vendor token is kept verbatim
/// and compared by its token string.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub enum LicenseStatus {
    #[default]
    Unset,
    Valid,
    Invalid,
    Expired,
    Other(String),
}

impl LicenseStatus {
    pub fn from_token(token: &str) -> Self {
        match token {
            "" => LicenseStatus::Unset,
            "valid" => LicenseStatus::Valid,
            "invalid" => LicenseStatus::Invalid,
            "expired" => LicenseStatus::Expired,
            other => LicenseStatus::Other(other.to_string()),
        }
    }

    /// Token as stored and as reported by the vendor. `Unset` has none.
    pub fn token(&self) -> Option<&str> {
        match self {
            LicenseStatus::Unset => None,
            LicenseStatus::Valid => Some("valid"),
            LicenseStatus::Invalid => Some("invalid"),
            LicenseStatus::Expired => Some("expired"),
            LicenseStatus::Other(token) => Some(token),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, LicenseStatus::Valid)
    }
}

impl Serialize for LicenseStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.token().unwrap_or("unset"))
    }
}

/// Operations understood by the vendor endpoint
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    GetVersion,
    CheckLicense,
    ActivateLicense,
    DeactivateLicense,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::GetVersion => "get_version",
            Action::CheckLicense => "check_license",
            Action::ActivateLicense => "activate_license",
            Action::DeactivateLicense => "deactivate_license",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of comparing the installed version against the vendor's
#[derive(Serialize, Clone, Debug)]
pub struct UpdateCheck {
    pub has_update: bool,
    pub metadata: ApiResponse,
}

/// The host's in-progress "pending updates" aggregate
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UpdateTransient {
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default)]
    pub checked: BTreeMap<String, String>,
    #[serde(default)]
    pub response: BTreeMap<String, ApiResponse>,
    #[serde(default)]
    pub no_update: BTreeMap<String, ApiResponse>,
}

/// Where in the host the current request originates
#[derive(Clone, Debug, Default)]
pub struct HostContext {
    pub multisite: bool,
    pub page: Option<String>,
}

impl HostContext {
    /// Network installs defer to host defaults on the plugin listing page
    pub fn is_exempt(&self) -> bool {
        self.multisite && self.page.as_deref() == Some(crate::updater::config::PLUGIN_LIST_PAGE)
    }
}

/// Request for package details (host "plugin information" dialog)
#[derive(Clone, Debug, Default)]
pub struct InfoRequest {
    pub action: String,
    pub slug: Option<String>,
}

impl InfoRequest {
    pub fn plugin_information(slug: impl Into<String>) -> Self {
        Self {
            action: crate::updater::config::PLUGIN_INFORMATION_ACTION.to_string(),
            slug: Some(slug.into()),
        }
    }
}

/// Error types for updater operations
#[derive(thiserror::Error, Debug)]
pub enum UpdaterError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Host unreachable: {0}")]
    Unreachable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type UpdaterResult<T> = Result<T, UpdaterError>;
