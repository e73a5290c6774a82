use crate::client::{create_http_client, Config, Credentials};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Capability to supply a valid bearer token and to re-issue one on demand.
///
/// The dispatcher treats implementations as opaque: it asks for a token
/// before each call and for a refresh after an `invalid_token` challenge,
/// never touching token state directly.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get a valid bearer token, obtaining one first if necessary
    async fn access_token(&self) -> Result<String>;

    /// Discard any cached token and obtain a fresh one
    async fn refresh_token(&self) -> Result<String>;
}

/// Fixed token configured up front, bypassing the credential flow.
///
/// Refreshing hands back the same token; a server that keeps rejecting it
/// surfaces the failure to the caller after the single replay.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        StaticTokenProvider {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }

    async fn refresh_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Bearer token issued by the remote token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct BearerToken {
    #[serde(rename = "accessToken")]
    pub access_token: String,

    #[serde(rename = "tokenType", default = "default_token_type")]
    pub token_type: String,

    /// Token lifetime in seconds
    #[serde(rename = "expiresIn", default)]
    pub expires_in: u64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Exchanges client credentials for bearer tokens at the configured token
/// endpoint, caching each token until shortly before it expires. Concurrent
/// refresh attempts are serialized on the cache lock.
pub struct CredentialsTokenProvider {
    endpoint: String,
    credentials: Credentials,
    http: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

const EXPIRY_MARGIN: Duration = Duration::from_secs(5);

impl CredentialsTokenProvider {
    pub fn new(config: &Config, credentials: Credentials) -> Self {
        CredentialsTokenProvider {
            endpoint: config.token_endpoint(),
            credentials,
            http: create_http_client(),
            cache: Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<CachedToken> {
        debug!(endpoint = %self.endpoint, "requesting access token");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "clientId": self.credentials.client_id,
                "secret": self.credentials.secret,
            }))
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            return Err(Error::Auth(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: BearerToken = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);

        Ok(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }
}

#[async_trait]
impl TokenProvider for CredentialsTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.value.clone());
            }
        }

        let fresh = self.request_token().await?;
        let value = fresh.value.clone();
        *cache = Some(fresh);

        Ok(value)
    }

    async fn refresh_token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;
        *cache = None;

        let fresh = self.request_token().await?;
        let value = fresh.value.clone();
        *cache = Some(fresh);

        Ok(value)
    }
}
