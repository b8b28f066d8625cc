//! Wire-level tests for the vendor API client.
//!
//! The client probes the bare host with a GET before its first POST, so
//! every server here answers `GET /` as well as the form POST.

use std::sync::Arc;

use license_updater::updater::api::ApiClient;
use license_updater::{Action, HostAvailability, PackageIdentity, UpdaterConfig, UpdaterError};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn package() -> PackageIdentity {
    PackageIdentity::new("3", "my-plugin/my-plugin.php", "My Plugin", "2.0.0")
}

fn config(server: &MockServer) -> UpdaterConfig {
    UpdaterConfig::default()
        .with_api_url(&server.uri())
        .unwrap()
        .with_home_url("https://shop.example.com")
}

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&config(server), &package(), Arc::new(HostAvailability::new())).unwrap()
}

async fn mount_probe(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn posts_form_and_decodes_object() {
    let server = MockServer::start().await;
    mount_probe(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("edd_action=get_version"))
        .and(body_string_contains("license=KEY-1"))
        .and(body_string_contains("url=https%3A%2F%2Fshop.example.com"))
        .and(body_string_contains("environment=production"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "new_version": "2.1.0",
            "slug": "my-plugin",
            "sections": { "description": "Does things" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .perform(Action::GetVersion, "KEY-1")
        .await
        .unwrap();
    assert_eq!(response.new_version.as_deref(), Some("2.1.0"));
    assert_eq!(response.field("description"), Some(&json!("Does things")));
}

#[tokio::test]
async fn item_name_is_encoded_twice_on_the_wire() {
    let server = MockServer::start().await;
    mount_probe(&server, 1).await;

    Mock::given(method("POST"))
        .and(body_string_contains("item_name=My%2520Plugin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "license": "valid" })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server).perform(Action::CheckLicense, "").await;
    assert_eq!(response.and_then(|r| r.license).as_deref(), Some("valid"));
}

#[tokio::test]
async fn host_is_probed_once_per_process() {
    let server = MockServer::start().await;
    mount_probe(&server, 1).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "license": "valid" })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.perform(Action::CheckLicense, "K").await.is_some());
    assert!(client.perform(Action::CheckLicense, "K").await.is_some());
}

#[tokio::test]
async fn non_200_yields_no_data() {
    let server = MockServer::start().await;
    mount_probe(&server, 1).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "license": "valid" })))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client.request(Action::CheckLicense, "K").await.unwrap_err();
    assert!(matches!(err, UpdaterError::Status(500)));
    assert!(client.perform(Action::CheckLicense, "K").await.is_none());
}

#[tokio::test]
async fn undecodable_or_non_object_body_yields_no_data() {
    let server = MockServer::start().await;
    mount_probe(&server, 1).await;

    Mock::given(method("POST"))
        .and(body_string_contains("edd_action=get_version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("edd_action=check_license"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["valid"])))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client.request(Action::GetVersion, "K").await.unwrap_err();
    assert!(matches!(err, UpdaterError::Malformed(_)));
    let err = client.request(Action::CheckLicense, "K").await.unwrap_err();
    assert!(matches!(err, UpdaterError::Malformed(_)));
}

#[tokio::test]
async fn any_probe_status_counts_as_reachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "license": "expired" })))
        .mount(&server)
        .await;

    let response = client(&server).perform(Action::CheckLicense, "K").await;
    assert_eq!(response.and_then(|r| r.license).as_deref(), Some("expired"));
}

#[tokio::test]
async fn unreachable_host_is_remembered() {
    // Nothing listens on port 1
    let config = UpdaterConfig::default()
        .with_api_url("http://127.0.0.1:1/api")
        .unwrap();
    let availability = Arc::new(HostAvailability::new());
    let client = ApiClient::new(&config, &package(), availability.clone()).unwrap();

    assert!(client.perform(Action::GetVersion, "").await.is_none());
    assert_eq!(availability.get(&config.endpoint()), Some(false));

    let err = client.request(Action::CheckLicense, "").await.unwrap_err();
    assert!(matches!(err, UpdaterError::Unreachable(_)));
}
