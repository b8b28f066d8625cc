use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::updater::availability::HostAvailability;
use crate::updater::config::UpdaterConfig;
use crate::updater::response::ApiResponse;
use crate::updater::site::Environment;
use crate::updater::types::{Action, PackageIdentity, UpdaterError, UpdaterResult};

/// Form body posted to the vendor endpoint
#[derive(Serialize, Debug)]
struct ApiRequest<'a> {
    edd_action: &'a str,
    license: &'a str,
    item_name: &'a str,
    url: &'a str,
    environment: &'a str,
}

/// HTTP client for the vendor update API
pub struct ApiClient {
    client: reqwest::Client,
    endpoint: String,
    probe_url: Option<String>,
    item_name: String,
    home_url: String,
    environment: Environment,
    availability: Arc<HostAvailability>,
}

impl ApiClient {
    pub fn new(
        config: &UpdaterConfig,
        package: &PackageIdentity,
        availability: Arc<HostAvailability>,
    ) -> UpdaterResult<Self> {
        // Certificate verification stays on (reqwest default)
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpdaterError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            probe_url: probe_url(&config.api_url),
            // Vendor expects the name URL-encoded inside the form body
            item_name: urlencoding::encode(&package.display_name).into_owned(),
            home_url: config.home_url.clone(),
            environment: config.environment,
            availability,
        })
    }

    /// Perform an API action, collapsing every failure to `None`.
    ///
    /// Callers treat `None` as "no usable data"; nothing is surfaced to the user.
    pub async fn perform(&self, action: Action, key: &str) -> Option<ApiResponse> {
        match self.request(action, key).await {
            Ok(response) => Some(response),
            Err(UpdaterError::Unreachable(endpoint)) => {
                debug!(%action, %endpoint, "skipping request to unreachable host");
                None
            }
            Err(e) => {
                warn!(%action, error = %e, "vendor request failed");
                None
            }
        }
    }

    /// Perform an API action, keeping the failure reason
    pub async fn request(&self, action: Action, key: &str) -> UpdaterResult<ApiResponse> {
        self.ensure_reachable().await?;

        let body = ApiRequest {
            edd_action: action.as_str(),
            license: key,
            item_name: &self.item_name,
            url: &self.home_url,
            environment: self.environment.as_str(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .form(&body)
            .send()
            .await
            .map_err(|e| UpdaterError::Transport(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(UpdaterError::Status(response.status().as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| UpdaterError::Transport(e.to_string()))?;

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| UpdaterError::Malformed(format!("Failed to parse response: {}", e)))?;

        match value {
            Value::Object(object) => {
                debug!(%action, "vendor response decoded");
                Ok(ApiResponse::from_json(object))
            }
            other => Err(UpdaterError::Malformed(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Probe the host once per process; later calls reuse the recorded answer
    async fn ensure_reachable(&self) -> UpdaterResult<()> {
        let reachable = match self.availability.get(&self.endpoint) {
            Some(known) => known,
            None => {
                let probed = self.probe().await;
                self.availability.record(&self.endpoint, probed)
            }
        };

        if reachable {
            Ok(())
        } else {
            Err(UpdaterError::Unreachable(self.endpoint.clone()))
        }
    }

    /// Any HTTP answer from the bare host counts as reachable
    async fn probe(&self) -> bool {
        let Some(url) = &self.probe_url else {
            warn!(endpoint = %self.endpoint, "API URL has no host");
            return false;
        };

        match self.client.get(url).send().await {
            Ok(response) => {
                debug!(%url, status = response.status().as_u16(), "vendor host reachable");
                true
            }
            Err(e) => {
                warn!(%url, error = %e, "vendor host unreachable, disabling requests for this process");
                false
            }
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("endpoint", &self.endpoint)
            .field("item_name", &self.item_name)
            .field("environment", &self.environment)
            .finish()
    }
}

/// `scheme://host[:port]` of the API URL, `None` when there is no host
fn probe_url(api_url: &Url) -> Option<String> {
    let host = api_url.host_str().filter(|h| !h.is_empty())?;
    let port = api_url
        .port()
        .map(|p| format!(":{}", p))
        .unwrap_or_default();
    Some(format!("{}://{}{}", api_url.scheme(), host, port))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
