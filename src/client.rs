use crate::builder::Builder;
use crate::error::{Error, Result};
use crate::token::{CredentialsTokenProvider, StaticTokenProvider, TokenProvider};
use crate::transport::{HttpTransport, Transport};
use reqwest::ClientBuilder;
use std::sync::Arc;
use std::time::Duration;

/// Create the default HTTP client for API requests
/// with settings for connection pooling and timeouts
pub fn create_http_client() -> reqwest::Client {
    ClientBuilder::new()
        .pool_max_idle_per_host(50)
        .timeout(Duration::from_secs(300)) // 5 minutes
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to create HTTP client")
}

/// Client credentials exchanged for a bearer token
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub secret: String,
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct Config {
    /// Scheme and host of the API, e.g. "https://api.example.com"
    pub uri: String,
    /// API port
    pub port: u16,
    /// API version used for custom endpoint URLs
    pub version: String,
    /// Default resource namespace for collection URLs
    pub property: Option<String>,
    /// Deprecated alias for `property`
    pub database: Option<String>,
    /// Path of the token-issuance endpoint
    pub token_url: String,
    /// Credentials for the token endpoint
    pub credentials: Option<Credentials>,
    /// Value sent in the `app-id` header
    pub app_id: String,
    /// Static bearer token bypassing the credential flow
    pub access_token: Option<String>,
}

impl Config {
    /// Create a new configuration for the API at the given URI
    pub fn new(uri: impl Into<String>) -> Self {
        Config {
            uri: uri.into(),
            port: 80,
            version: "1.0".to_string(),
            property: None,
            database: None,
            token_url: "/token".to_string(),
            credentials: None,
            app_id: "folio".to_string(),
            access_token: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the default resource namespace
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Deprecated alias for [`Config::with_property`]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            client_id: client_id.into(),
            secret: secret.into(),
        });
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    /// Use a static access token instead of the credential flow
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Scheme, host and port of the API, e.g. "https://api.example.com:80"
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.uri, self.port)
    }

    /// Full URL of the token-issuance endpoint
    pub fn token_endpoint(&self) -> String {
        format!("{}{}", self.base_url(), self.token_url)
    }

    /// Effective resource namespace: `property` wins over the `database` alias
    pub fn namespace(&self) -> Option<&str> {
        self.property.as_deref().or(self.database.as_deref())
    }
}

struct ClientInner {
    config: Config,
    transport: Box<dyn Transport>,
    tokens: Box<dyn TokenProvider>,
}

/// Shared handle to a configured API: transport plus token provider.
///
/// Cloning is cheap; all clones share the same connection pool and token
/// cache. Builder chains are started from here.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Create a client using the HTTP transport and the token provider
    /// implied by the configuration (static token or client credentials)
    pub fn new(config: Config) -> Result<Self> {
        Self::with_transport(config, HttpTransport::new())
    }

    /// Create a client with a custom transport, e.g. an in-process test
    /// double, keeping the configured token provider
    pub fn with_transport<T>(config: Config, transport: T) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let tokens: Box<dyn TokenProvider> = if let Some(token) = &config.access_token {
            Box::new(StaticTokenProvider::new(token.clone()))
        } else if let Some(credentials) = &config.credentials {
            Box::new(CredentialsTokenProvider::new(&config, credentials.clone()))
        } else {
            return Err(Error::MissingCredentials);
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                config,
                transport: Box::new(transport),
                tokens,
            }),
        })
    }

    /// Create a client with both transport and token provider injected
    pub fn with_parts<T, P>(config: Config, transport: T, tokens: P) -> Self
    where
        T: Transport + 'static,
        P: TokenProvider + 'static,
    {
        Client {
            inner: Arc::new(ClientInner {
                config,
                transport: Box::new(transport),
                tokens: Box::new(tokens),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    pub(crate) fn tokens(&self) -> &dyn TokenProvider {
        self.inner.tokens.as_ref()
    }

    /// Start a bare builder chain
    pub fn query(&self) -> Builder {
        Builder::new(self.clone())
    }

    /// Start a chain against a collection
    pub fn in_collection(&self, collection: impl Into<String>) -> Builder {
        self.query().in_collection(collection)
    }

    /// Start a chain against a custom endpoint
    pub fn from_endpoint(&self, endpoint: impl Into<String>) -> Builder {
        self.query().from_endpoint(endpoint)
    }

    /// Start a chain against API client records
    pub fn in_clients(&self) -> Builder {
        self.query().in_clients()
    }

    /// Start a chain against server-side hooks
    pub fn in_hooks(&self) -> Builder {
        self.query().in_hooks()
    }

    /// Start a chain against the default media bucket
    pub fn in_media(&self) -> Builder {
        self.query().in_media()
    }

    /// Start a chain against a named media bucket
    pub fn in_media_bucket(&self, bucket: impl Into<String>) -> Builder {
        self.query().in_media_bucket(bucket)
    }
}
