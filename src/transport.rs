use crate::client::create_http_client;
use crate::error::Result;
use crate::request::{Body, Request};
use async_trait::async_trait;
use indexmap::IndexMap;

/// Response surfaced by a transport: status code, headers and raw body.
///
/// Header names are lowercase.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: IndexMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to execute a compiled request.
///
/// The dispatcher depends on this seam only, so a chain can be routed
/// through real HTTP or through an in-process double.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<TransportResponse>;
}

/// HTTP transport backed by a pooled reqwest client
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport {
            client: create_http_client(),
        }
    }

    /// Use a preconfigured reqwest client
    pub fn with_client(client: reqwest::Client) -> Self {
        HttpTransport { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> Result<TransportResponse> {
        let mut outbound = self
            .client
            .request(request.method.clone(), request.uri.clone());

        for (name, value) in &request.headers {
            outbound = outbound.header(name, value);
        }

        outbound = match &request.body {
            Some(Body::Json(value)) => outbound.body(serde_json::to_vec(value)?),
            Some(Body::Text(text)) => outbound.body(text.clone()),
            None => outbound,
        };

        let response = outbound.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
