//! HTTP clients for the SberCloud security group APIs
//!
//! Two API versions are involved:
//! - v1 (`/v1/{project_id}/security-groups`) creates, reads and deletes groups
//! - v2.0 (`/v2.0/security-groups`, `/v2.0/security-group-rules`) updates
//!   groups and deletes individual rules

pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use nimbus_core::provider::{ProviderError, ProviderResult};

use crate::config::ProviderConfig;
use types::{CreateOpts, Envelope, NetworkingSecGroup, SecurityGroup, UpdateOpts};

/// Maximum length of response body kept in error messages and logs
const MAX_BODY_PREVIEW: usize = 200;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("resource not found: {message}")]
    NotFound { message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("unexpected response code {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to decode response: {message}")]
    Decode { message: String },
}

impl ApiError {
    /// Classify an unsuccessful HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => ApiError::NotFound { message },
            409 => ApiError::Conflict { message },
            _ => ApiError::UnexpectedStatus { status, message },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }
}

fn preview(body: &str) -> String {
    if body.len() > MAX_BODY_PREVIEW {
        let mut end = MAX_BODY_PREVIEW;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    }
}

/// Pull a human readable message out of an error body.
///
/// The v1 API answers `{"code": .., "message": ..}`, gateways use
/// `{"error_code": .., "error_msg": ..}` and the v2.0 API wraps errors in
/// `{"NeutronError": {"message": ..}}`.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let candidates = [
            value.pointer("/NeutronError/message"),
            value.pointer("/error_msg"),
            value.pointer("/message"),
            value.pointer("/error/message"),
        ];
        if let Some(msg) = candidates.into_iter().flatten().find_map(|v| v.as_str()) {
            return msg.to_string();
        }
    }
    if body.is_empty() {
        status.to_string()
    } else {
        preview(body)
    }
}

// ── Service client ───────────────────────────────────────────────────

/// Authenticated client bound to one API version's base URL
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ServiceClient {
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        handle_response(resp, &[StatusCode::OK]).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        handle_response(resp, &[StatusCode::OK, StatusCode::CREATED]).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        handle_response(resp, &[StatusCode::OK]).await
    }

    async fn delete(&self, path: &str, ok: &[StatusCode]) -> Result<(), ApiError> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self.http.delete(url).send().await?;
        handle_empty(resp, ok).await
    }
}

async fn handle_response<T: DeserializeOwned>(
    resp: reqwest::Response,
    ok: &[StatusCode],
) -> Result<T, ApiError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !ok.contains(&status) {
        error!("API error: {} - {}", status, preview(&body));
        return Err(ApiError::from_status(
            status.as_u16(),
            error_message(status, &body),
        ));
    }
    serde_json::from_str(&body).map_err(|e| ApiError::Decode {
        message: format!("{e} (body preview: {:?})", preview(&body)),
    })
}

async fn handle_empty(resp: reqwest::Response, ok: &[StatusCode]) -> Result<(), ApiError> {
    let status = resp.status();
    if ok.contains(&status) {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    // Not-found is routine while deleting, keep it out of the error log
    if status != StatusCode::NOT_FOUND {
        error!("API error: {} - {}", status, preview(&body));
    }
    Err(ApiError::from_status(
        status.as_u16(),
        error_message(status, &body),
    ))
}

// ── Security group API ───────────────────────────────────────────────

/// Remote operations the security group resource relies on
#[async_trait]
pub trait SecurityGroupApi: Send + Sync {
    /// Create a group (v1); the response includes the default rules
    async fn create_security_group(&self, opts: &CreateOpts) -> Result<SecurityGroup, ApiError>;

    async fn get_security_group(&self, id: &str) -> Result<SecurityGroup, ApiError>;

    async fn delete_security_group(&self, id: &str) -> Result<(), ApiError>;

    /// Update name and/or description (v2.0)
    async fn update_security_group(
        &self,
        id: &str,
        opts: &UpdateOpts,
    ) -> Result<NetworkingSecGroup, ApiError>;

    /// Delete a single rule (v2.0)
    async fn delete_rule(&self, rule_id: &str) -> Result<(), ApiError>;
}

/// [`SecurityGroupApi`] over HTTP
pub struct HttpSecurityGroupApi {
    security_group_v1: ServiceClient,
    networking_v2: ServiceClient,
}

impl HttpSecurityGroupApi {
    pub fn new(security_group_v1: ServiceClient, networking_v2: ServiceClient) -> Self {
        Self {
            security_group_v1,
            networking_v2,
        }
    }
}

#[async_trait]
impl SecurityGroupApi for HttpSecurityGroupApi {
    async fn create_security_group(&self, opts: &CreateOpts) -> Result<SecurityGroup, ApiError> {
        let body = Envelope {
            security_group: opts,
        };
        let env: Envelope<SecurityGroup> =
            self.security_group_v1.post("security-groups", &body).await?;
        Ok(env.security_group)
    }

    async fn get_security_group(&self, id: &str) -> Result<SecurityGroup, ApiError> {
        let env: Envelope<SecurityGroup> = self
            .security_group_v1
            .get(&format!("security-groups/{id}"))
            .await?;
        Ok(env.security_group)
    }

    async fn delete_security_group(&self, id: &str) -> Result<(), ApiError> {
        self.security_group_v1
            .delete(
                &format!("security-groups/{id}"),
                &[StatusCode::OK, StatusCode::ACCEPTED, StatusCode::NO_CONTENT],
            )
            .await
    }

    async fn update_security_group(
        &self,
        id: &str,
        opts: &UpdateOpts,
    ) -> Result<NetworkingSecGroup, ApiError> {
        let body = Envelope {
            security_group: opts,
        };
        let env: Envelope<NetworkingSecGroup> = self
            .networking_v2
            .put(&format!("security-groups/{id}"), &body)
            .await?;
        Ok(env.security_group)
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<(), ApiError> {
        self.networking_v2
            .delete(
                &format!("security-group-rules/{rule_id}"),
                &[StatusCode::ACCEPTED, StatusCode::NO_CONTENT],
            )
            .await
    }
}

// ── Client factory ───────────────────────────────────────────────────

/// Produces region-bound API clients
pub trait Connector: Send + Sync {
    fn connect(&self, region: &str) -> ProviderResult<Arc<dyn SecurityGroupApi>>;
}

/// Builds authenticated HTTP clients from the provider configuration
pub struct HttpConnector {
    config: ProviderConfig,
}

impl HttpConnector {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn http_client(&self) -> ProviderResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(&self.config.auth_token).map_err(|e| {
            ProviderError::new("Invalid auth token header value").with_cause(e)
        })?;
        token.set_sensitive(true);
        headers.insert("X-Auth-Token", token);

        reqwest::Client::builder()
            .user_agent(concat!("nimbus/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(self.config.request_timeout())
            .danger_accept_invalid_certs(self.config.insecure)
            .build()
            .map_err(|e| ProviderError::new("Failed to build HTTP client").with_cause(e))
    }

    /// v1 client rooted at `/v1/{project_id}/`
    pub fn security_group_v1_client(&self, region: &str) -> ProviderResult<ServiceClient> {
        let wrap = |e: &dyn std::fmt::Display| {
            ProviderError::new(format!(
                "Error creating SberCloud security group client: {}",
                e
            ))
        };
        let endpoint = self.config.vpc_endpoint(region).map_err(|e| wrap(&e))?;
        let base = endpoint
            .join(&format!("v1/{}/", self.config.project_id))
            .map_err(|e| wrap(&e))?;
        Ok(ServiceClient::new(self.http_client()?, base))
    }

    /// v2.0 client rooted at `/v2.0/`
    pub fn networking_v2_client(&self, region: &str) -> ProviderResult<ServiceClient> {
        let wrap = |e: &dyn std::fmt::Display| {
            ProviderError::new(format!("Error creating SberCloud networking client: {}", e))
        };
        let endpoint = self.config.vpc_endpoint(region).map_err(|e| wrap(&e))?;
        let base = endpoint.join("v2.0/").map_err(|e| wrap(&e))?;
        Ok(ServiceClient::new(self.http_client()?, base))
    }
}

impl Connector for HttpConnector {
    fn connect(&self, region: &str) -> ProviderResult<Arc<dyn SecurityGroupApi>> {
        let v1 = self.security_group_v1_client(region)?;
        let v2 = self.networking_v2_client(region)?;
        Ok(Arc::new(HttpSecurityGroupApi::new(v1, v2)))
    }
}
