//! Provider configuration
//!
//! Settings can come from provider attributes, from `SBC_*` environment
//! variables, or from a JSON file.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use nimbus_core::resource::Value;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Default cloud domain used to build service endpoints
pub const DEFAULT_CLOUD: &str = "hc.sbercloud.ru";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting was not provided
    #[error("Missing required provider setting: {0}")]
    Missing(&'static str),

    #[error("Invalid provider setting {name}: {message}")]
    Invalid { name: &'static str, message: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Connection settings shared by every resource of the provider
#[derive(Clone, Deserialize)]
pub struct ProviderConfig {
    pub region: String,
    pub project_id: String,
    /// Enterprise project applied when a resource does not name one
    #[serde(default)]
    pub enterprise_project_id: Option<String>,
    pub auth_token: String,
    #[serde(default = "default_cloud")]
    pub cloud: String,
    /// Overrides the `https://vpc.{region}.{cloud}/` endpoint
    #[serde(default)]
    pub vpc_endpoint: Option<String>,
    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_cloud() -> String {
    DEFAULT_CLOUD.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("region", &self.region)
            .field("project_id", &self.project_id)
            .field("enterprise_project_id", &self.enterprise_project_id)
            .field("auth_token", &"<redacted>")
            .field("cloud", &self.cloud)
            .field("vpc_endpoint", &self.vpc_endpoint)
            .field("insecure", &self.insecure)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(
        region: impl Into<String>,
        project_id: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            project_id: project_id.into(),
            enterprise_project_id: None,
            auth_token: auth_token.into(),
            cloud: default_cloud(),
            vpc_endpoint: None,
            insecure: false,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    pub fn with_enterprise_project_id(mut self, id: impl Into<String>) -> Self {
        self.enterprise_project_id = Some(id.into());
        self
    }

    pub fn with_vpc_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.vpc_endpoint = Some(endpoint.into());
        self
    }

    /// Build from provider block attributes
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> Result<Self, ConfigError> {
        let get_string = |key: &str| match attributes.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };
        let get_bool = |key: &str| match attributes.get(key) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        };

        let mut config = Self::new(
            get_string("region").ok_or(ConfigError::Missing("region"))?,
            get_string("project_id").ok_or(ConfigError::Missing("project_id"))?,
            get_string("auth_token").ok_or(ConfigError::Missing("auth_token"))?,
        );
        config.enterprise_project_id = get_string("enterprise_project_id");
        config.vpc_endpoint = get_string("vpc_endpoint");
        if let Some(cloud) = get_string("cloud") {
            config.cloud = cloud;
        }
        config.insecure = get_bool("insecure").unwrap_or(false);
        if let Some(Value::Int(secs)) = attributes.get("request_timeout") {
            config.request_timeout_secs = u64::try_from(*secs).map_err(|_| ConfigError::Invalid {
                name: "request_timeout",
                message: "must not be negative".to_string(),
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Build from `SBC_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let mut config = Self::new(
            get("SBC_REGION_NAME").ok_or(ConfigError::Missing("region"))?,
            get("SBC_PROJECT_ID").ok_or(ConfigError::Missing("project_id"))?,
            get("SBC_AUTH_TOKEN").ok_or(ConfigError::Missing("auth_token"))?,
        );
        config.enterprise_project_id = get("SBC_ENTERPRISE_PROJECT_ID");
        config.vpc_endpoint = get("SBC_VPC_ENDPOINT");
        if let Some(cloud) = get("SBC_CLOUD") {
            config.cloud = cloud;
        }
        config.insecure = get("SBC_INSECURE").is_some_and(|v| v == "true" || v == "1");
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.region.is_empty() {
            return Err(ConfigError::Missing("region"));
        }
        if self.project_id.is_empty() {
            return Err(ConfigError::Missing("project_id"));
        }
        if self.auth_token.is_empty() {
            return Err(ConfigError::Missing("auth_token"));
        }
        if let Some(endpoint) = &self.vpc_endpoint {
            Url::parse(endpoint).map_err(|e| ConfigError::Invalid {
                name: "vpc_endpoint",
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// VPC service endpoint for a region, always ending with `/`
    pub fn vpc_endpoint(&self, region: &str) -> Result<Url, ConfigError> {
        let raw = match &self.vpc_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://vpc.{}.{}/", region, self.cloud),
        };
        let raw = if raw.ends_with('/') {
            raw
        } else {
            format!("{}/", raw)
        };
        Url::parse(&raw).map_err(|e| ConfigError::Invalid {
            name: "vpc_endpoint",
            message: e.to_string(),
        })
    }
}
