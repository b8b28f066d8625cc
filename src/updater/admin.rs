//! Key management form and the "not receiving updates" notice.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::updater::config::keys;
use crate::updater::package::PackageUpdater;
use crate::updater::types::UpdaterResult;

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    Activate,
    Deactivate,
}

/// A submitted key management form
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyForm {
    /// `None` when neither submit button was pressed
    pub action: Option<KeyAction>,
    pub update_key: String,
    pub nonce: Option<String>,
}

impl KeyForm {
    /// Read the form fields namespaced by package `id`.
    ///
    /// Activation wins when both submit fields are present.
    pub fn from_fields(id: &str, fields: &HashMap<String, String>) -> Self {
        let action = if fields.contains_key(&keys::activate(id)) {
            Some(KeyAction::Activate)
        } else if fields.contains_key(&keys::deactivate(id)) {
            Some(KeyAction::Deactivate)
        } else {
            None
        };

        Self {
            action,
            update_key: fields.get(&keys::update_key(id)).cloned().unwrap_or_default(),
            nonce: fields.get(&keys::nonce(id)).cloned(),
        }
    }
}

/// Host-side anti-forgery check
pub trait CsrfVerifier: Send + Sync {
    fn verify(&self, action: &str, token: &str) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdminResponse {
    /// Nothing happened; the host renders its page as usual
    Ignored,
    /// State changed; send the user to this location
    Redirect(String),
}

/// Shown on every admin page while the license is not valid
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct AdminNotice {
    pub display_name: String,
    pub message: String,
    pub management_url: String,
    pub downloads_url: String,
}

impl PackageUpdater {
    pub async fn handle_key_form(
        &self,
        form: &KeyForm,
        csrf: &dyn CsrfVerifier,
    ) -> UpdaterResult<AdminResponse> {
        let Some(action) = form.action else {
            return Ok(AdminResponse::Ignored);
        };

        let nonce_action = keys::nonce(&self.package().id);
        let verified = form
            .nonce
            .as_deref()
            .is_some_and(|token| csrf.verify(&nonce_action, token));
        if !verified {
            warn!(package = %self.package().name, "rejected key form with bad token");
            return Ok(AdminResponse::Ignored);
        }

        let status = match action {
            KeyAction::Activate => self.license().activate(&form.update_key).await?,
            KeyAction::Deactivate => self.license().deactivate(&form.update_key).await?,
        };
        debug!(package = %self.package().name, ?action, ?status, "key form handled");

        Ok(AdminResponse::Redirect(self.config().management_url.clone()))
    }

    pub fn admin_notice(&self) -> UpdaterResult<Option<AdminNotice>> {
        if self.settings().status()?.is_valid() {
            return Ok(None);
        }

        let display_name = self.package().display_name.clone();
        let message = format!(
            "{} is installed but not receiving updates. Activate your update key or download the build without automatic updates.",
            display_name
        );
        Ok(Some(AdminNotice {
            display_name,
            message,
            management_url: self.config().management_url.clone(),
            downloads_url: self.config().downloads_url.clone(),
        }))
    }
}
