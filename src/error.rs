use thiserror::Error;

/// Main error type for API operations
#[derive(Debug, Error)]
pub enum Error {
    /// A terminator that needs a query was called before any filter
    #[error("unable to find query for {0}")]
    MissingQuery(&'static str),

    /// `apply()` was called without selecting a collection
    #[error("`apply()` must be used with a collection")]
    MissingCollection,

    /// A clients-mode delete or update would affect every client record
    #[error("unable to run {0} on all clients. Please use the where_client_is() or where_client_is_self() filters")]
    MissingClientFilter(&'static str),

    /// A hooks-mode terminator was called before naming the hook
    #[error("couldn't find hook name. Are you using `where_hook_name_is()`?")]
    MissingHookName,

    /// A client filter was used outside clients mode
    #[error("not in clients mode. Have you used `in_clients()`?")]
    NotInClientsMode,

    /// A hook filter was used outside hooks mode
    #[error("not in hooks mode. Have you used `in_hooks()`?")]
    NotInHooksMode,

    /// Construction without a static token or client credentials
    #[error("no access token or credentials configured")]
    MissingCredentials,

    /// Token endpoint rejected the configured credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The server does not advertise every required feature
    #[error("API does not support features: {}", missing.join(";"))]
    MissingFeatures { missing: Vec<String> },

    /// Non-2xx HTTP response
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Create a new HTTP error from a response status and body
    pub fn http(status: u16, body: String) -> Self {
        Error::Http { status, body }
    }

    /// Stable error code for programmatic matching
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Error::MissingFeatures { .. } => Some("MISSING_FEATURES"),
            _ => None,
        }
    }

    /// Get the HTTP status code if this is a transport error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::Reqwest(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether this error was raised before any network interaction
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::MissingQuery(_)
                | Error::MissingCollection
                | Error::MissingClientFilter(_)
                | Error::MissingHookName
                | Error::NotInClientsMode
                | Error::NotInHooksMode
        )
    }
}

/// Result type for API operations
pub type Result<T> = std::result::Result<T, Error>;
