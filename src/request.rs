use crate::error::Result;
use indexmap::IndexMap;
use reqwest::Method;
use serde_json::Value;
use url::Url;

/// Server-managed document fields that must never be client-supplied
pub const RESERVED_PROPERTIES: [&str; 9] = [
    "_id",
    "_apiVersion",
    "_createdBy",
    "_createdAt",
    "_lastModifiedAt",
    "_lastModifiedBy",
    "_version",
    "_history",
    "_composed",
];

/// Payload of a compiled request
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    /// Raw text, e.g. hook source code
    Text(String),
}

/// Transport-agnostic descriptor of one compiled request.
///
/// Produced fresh by each terminator call and immutable once returned; the
/// parsed [`Url`] gives structured access to scheme, host, port, path and
/// query.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: Url,
    pub body: Option<Body>,
    pub headers: IndexMap<String, String>,
}

impl Request {
    pub(crate) fn new(method: Method, uri: &str) -> Result<Self> {
        Ok(Request {
            method,
            uri: Url::parse(uri)?,
            body: None,
            headers: IndexMap::new(),
        })
    }

    pub(crate) fn with_body(mut self, body: Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    pub(crate) fn with_text_body(mut self, body: String) -> Self {
        self.body = Some(Body::Text(body));
        self
    }

    pub(crate) fn with_headers(mut self, headers: IndexMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// The full URL as a string
    pub fn href(&self) -> &str {
        self.uri.as_str()
    }
}

/// Strip reserved properties from an outbound document, or from each element
/// of an array of documents. Stripping is shallow: nested documents pass
/// through untouched.
pub(crate) fn strip_reserved_properties(document: Value) -> Value {
    match document {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(strip_reserved_properties)
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .filter(|(name, _)| !RESERVED_PROPERTIES.contains(&name.as_str()))
                .collect(),
        ),
        other => other,
    }
}
