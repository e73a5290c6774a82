use serde::Deserialize;
use serde_json::{Map, Value};

/// Standard results envelope returned by document endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultSet {
    /// Matched or affected documents
    #[serde(default)]
    pub results: Vec<Value>,
    /// Match metadata, when the endpoint provides it
    pub metadata: Option<Metadata>,
}

/// Metadata accompanying a result set
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    #[serde(rename = "totalCount")]
    pub total_count: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
