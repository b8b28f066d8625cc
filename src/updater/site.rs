use serde::{Deserialize, Serialize};

/// Variables consulted for the environment tag, in order
const ENVIRONMENT_VARS: [&str; 2] = ["UPDATER_ENVIRONMENT", "WP_ENVIRONMENT_TYPE"];

/// Environment tag reported to the vendor with every request
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Local,
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    /// Detect the environment from process variables.
    ///
    /// Unknown values fall back to `production`, same as an unset variable.
    pub fn from_env() -> Self {
        ENVIRONMENT_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok())
            .and_then(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Environment::Local),
            "development" => Some(Environment::Development),
            "staging" => Some(Environment::Staging),
            "production" => Some(Environment::Production),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
