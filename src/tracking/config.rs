//! Tracking endpoint and credentials

use crate::constants::{DEFAULT_EXPERIMENT_NAME, DEFAULT_TRACKING_URI};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where runs are recorded and how to authenticate
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub tracking_uri: String,
    /// Registry endpoint when it differs from the tracking URI
    pub registry_uri: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub experiment_name: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tracking_uri: DEFAULT_TRACKING_URI.to_string(),
            registry_uri: None,
            username: None,
            password: None,
            experiment_name: DEFAULT_EXPERIMENT_NAME.to_string(),
        }
    }
}

// Keep the token out of logs.
impl fmt::Debug for TrackingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingConfig")
            .field("tracking_uri", &self.tracking_uri)
            .field("registry_uri", &self.registry_uri)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("experiment_name", &self.experiment_name)
            .finish()
    }
}

impl TrackingConfig {
    pub fn new(tracking_uri: impl Into<String>) -> Self {
        Self {
            tracking_uri: tracking_uri.into(),
            ..Self::default()
        }
    }

    /// Read the process environment once
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// `MLFLOW_TRACKING_URI` overrides the default endpoint. Credentials come
    /// from `DAGSHUB_USERNAME`/`DAGSHUB_TOKEN`, falling back to
    /// `MLFLOW_TRACKING_USERNAME`/`MLFLOW_TRACKING_PASSWORD`.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::default();
        if let Some(uri) = get("MLFLOW_TRACKING_URI") {
            config.tracking_uri = uri;
        }
        config.registry_uri = get("MLFLOW_REGISTRY_URI");
        config.username = get("DAGSHUB_USERNAME").or_else(|| get("MLFLOW_TRACKING_USERNAME"));
        config.password = get("DAGSHUB_TOKEN").or_else(|| get("MLFLOW_TRACKING_PASSWORD"));
        if let Some(name) = get("MLFLOW_EXPERIMENT_NAME") {
            config.experiment_name = name;
        }
        config
    }

    pub fn with_experiment(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Base URL for model registry calls
    pub fn registry_base(&self) -> &str {
        self.registry_uri.as_deref().unwrap_or(&self.tracking_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = TrackingConfig::from_vars(vars(&[]));
        assert_eq!(config.tracking_uri, DEFAULT_TRACKING_URI);
        assert_eq!(config.experiment_name, "Default");
        assert!(config.username.is_none());
    }

    #[test]
    fn test_dagshub_credentials_take_precedence() {
        let config = TrackingConfig::from_vars(vars(&[
            ("DAGSHUB_USERNAME", "alice"),
            ("DAGSHUB_TOKEN", "t0k"),
            ("MLFLOW_TRACKING_USERNAME", "bob"),
            ("MLFLOW_TRACKING_PASSWORD", "pw"),
        ]));
        assert_eq!(config.username.as_deref(), Some("alice"));
        assert_eq!(config.password.as_deref(), Some("t0k"));
    }

    #[test]
    fn test_fallback_and_override() {
        let config = TrackingConfig::from_vars(vars(&[
            ("MLFLOW_TRACKING_URI", "file:./mlruns"),
            ("MLFLOW_TRACKING_USERNAME", "bob"),
            ("DAGSHUB_TOKEN", ""),
            ("MLFLOW_TRACKING_PASSWORD", "pw"),
        ]));
        assert_eq!(config.tracking_uri, "file:./mlruns");
        assert_eq!(config.username.as_deref(), Some("bob"));
        assert_eq!(config.password.as_deref(), Some("pw"));
        assert_eq!(config.registry_base(), "file:./mlruns");
    }

    #[test]
    fn test_debug_hides_password() {
        let config = TrackingConfig::default().with_credentials("u", "secret");
        let text = format!("{:?}", config);
        assert!(!text.contains("secret"));
        assert!(text.contains("***"));
    }
}
