//! Normalized vendor response.
//!
//! Vendor servers return the same logical fields in several shapes: plain
//! JSON objects, arrays, JSON-encoded strings or serialized wrappers.
//! [`ApiResponse::from_json`] folds all of them into plain
//! `name -> value` mappings so hosts can render them uniformly.
//!
//! Section keys are also copied to the top level (`description`,
//! `changelog`, ...). Renderers address them directly and the
//! duplication is intentional.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use crate::updater::serialized;

/// Plain key -> value mapping used for every object-shaped field
pub type Mapping = BTreeMap<String, Value>;

const MAPPING_FIELDS: [&str; 4] = ["sections", "banners", "icons", "contributors"];

/// Names with a typed field; sections never shadow them at the top level
const TYPED_FIELDS: [&str; 9] = [
    "license",
    "new_version",
    "slug",
    "plugin",
    "id",
    "sections",
    "banners",
    "icons",
    "contributors",
];

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ApiResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Host-relative package name, stamped by the update checker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banners: Option<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributors: Option<Mapping>,
    /// Every other top-level field, plus the promoted section keys
    #[serde(flatten)]
    pub extra: Mapping,
}

impl ApiResponse {
    /// Build a normalized response from a decoded JSON object
    pub fn from_json(mut object: Map<String, Value>) -> Self {
        let mut response = ApiResponse {
            license: object.remove("license").and_then(scalar_text),
            new_version: object.remove("new_version").and_then(scalar_text),
            slug: object.remove("slug").and_then(scalar_text),
            plugin: object.remove("plugin").and_then(scalar_text),
            id: object.remove("id").and_then(scalar_text),
            ..Default::default()
        };

        for field in MAPPING_FIELDS {
            let Some(raw) = object.remove(field) else {
                continue;
            };
            let mapping = unwrap_mapping(raw);
            if mapping.is_none() {
                warn!(field, "dropping unrecognized mapping shape in vendor response");
            }
            match field {
                "sections" => response.sections = mapping,
                "banners" => response.banners = mapping,
                "icons" => response.icons = mapping,
                _ => response.contributors = mapping,
            }
        }

        response.extra = object.into_iter().collect();
        response.promote_sections();
        response
    }

    /// Copy sections onto the top level so they can be looked up by name.
    ///
    /// A section named like a typed field stays reachable through
    /// [`ApiResponse::section`] only.
    fn promote_sections(&mut self) {
        if let Some(sections) = &self.sections {
            for (key, value) in sections {
                if TYPED_FIELDS.contains(&key.as_str()) {
                    warn!(section = %key, "not promoting section that shadows a typed field");
                    continue;
                }
                self.extra.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.as_ref()?.get(name)
    }

    /// Top-level field that is not one of the typed ones
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Record which installed package this response belongs to
    pub fn stamp(&mut self, package_name: &str) {
        self.plugin = Some(package_name.to_string());
        self.id = Some(package_name.to_string());
    }
}

/// Fold any of the accepted wire shapes into a plain mapping
pub fn unwrap_mapping(value: Value) -> Option<Mapping> {
    match value {
        Value::Object(map) => Some(map.into_iter().collect()),
        Value::Array(items) => Some(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
        ),
        Value::String(text) => {
            if serialized::looks_serialized(&text) {
                return serialized::decode(&text).and_then(unwrap_mapping);
            }
            match serde_json::from_str::<Value>(&text) {
                Ok(inner @ (Value::Object(_) | Value::Array(_))) => unwrap_mapping(inner),
                _ => None,
            }
        }
        _ => None,
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn plain_fields_are_extracted() {
        let response = ApiResponse::from_json(object(json!({
            "license": "valid",
            "new_version": "2.1.0",
            "slug": "my-plugin",
            "name": "My Plugin",
            "download_link": "https://vendor.example.com/dl.zip"
        })));

        assert_eq!(response.license.as_deref(), Some("valid"));
        assert_eq!(response.new_version.as_deref(), Some("2.1.0"));
        assert_eq!(response.slug.as_deref(), Some("my-plugin"));
        assert_eq!(response.field("name"), Some(&json!("My Plugin")));
        assert!(response.sections.is_none());
    }

    #[test]
    fn numeric_version_becomes_text() {
        let response = ApiResponse::from_json(object(json!({"new_version": 2.1})));
        assert_eq!(response.new_version.as_deref(), Some("2.1"));
    }

    #[test]
    fn serialized_sections_are_unwrapped_and_promoted() {
        let raw = r#"a:2:{s:11:"description";s:5:"Hello";s:9:"changelog";s:3:"1.1";}"#;
        let response = ApiResponse::from_json(object(json!({"sections": raw})));

        assert_eq!(response.section("description"), Some(&json!("Hello")));
        assert_eq!(response.field("description"), Some(&json!("Hello")));
        assert_eq!(response.field("changelog"), Some(&json!("1.1")));
    }

    #[test]
    fn object_banners_and_json_string_icons() {
        let response = ApiResponse::from_json(object(json!({
            "banners": {"high": "big.png", "low": "small.png"},
            "icons": "{\"1x\":\"icon.png\"}",
            "contributors": ["alice", "bob"]
        })));

        assert_eq!(
            response.banners.unwrap().get("high"),
            Some(&json!("big.png"))
        );
        assert_eq!(response.icons.unwrap().get("1x"), Some(&json!("icon.png")));
        assert_eq!(
            response.contributors.unwrap().get("1"),
            Some(&json!("bob"))
        );
    }

    #[test]
    fn unrecognized_wrapper_is_dropped() {
        let response = ApiResponse::from_json(object(json!({"banners": "not a mapping"})));
        assert!(response.banners.is_none());
        assert!(response.field("banners").is_none());
    }

    #[test]
    fn serializes_flat_with_promoted_sections() {
        let mut response = ApiResponse::from_json(object(json!({
            "new_version": "1.0.1",
            "sections": {"description": "Hi"}
        })));
        response.stamp("my-plugin/my-plugin.php");

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["description"], json!("Hi"));
        assert_eq!(value["sections"]["description"], json!("Hi"));
        assert_eq!(value["plugin"], json!("my-plugin/my-plugin.php"));
        assert_eq!(value["id"], json!("my-plugin/my-plugin.php"));
    }

    #[test]
    fn cached_form_deserializes_back() {
        let response = ApiResponse::from_json(object(json!({
            "license": "valid",
            "sections": {"changelog": "x"},
            "homepage": "https://vendor.example.com"
        })));

        let json = serde_json::to_string(&response).unwrap();
        let restored: ApiResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, response);
    }

    #[test]
    fn sections_never_shadow_typed_fields() {
        let response = ApiResponse::from_json(object(json!({
            "slug": "my-plugin",
            "license": "valid",
            "sections": {"slug": "x", "license": "y", "changelog": "z"}
        })));

        assert_eq!(response.slug.as_deref(), Some("my-plugin"));
        assert_eq!(response.section("slug"), Some(&json!("x")));
        assert_eq!(response.field("slug"), None);
        assert_eq!(response.field("license"), None);
        assert_eq!(response.field("changelog"), Some(&json!("z")));

        let json = serde_json::to_string(&response).unwrap();
        let restored: ApiResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, response);
    }
}
