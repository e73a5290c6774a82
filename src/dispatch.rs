use crate::client::Client;
use crate::error::{Error, Result};
use crate::request::Request;
use crate::transport::TransportResponse;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// Outbound header naming the capabilities a chain requires
pub const REQUIRES_HEADER: &str = "x-dadi-requires";

/// Inbound header advertising the capabilities the server supports
pub const SUPPORTS_HEADER: &str = "x-dadi-supports";

impl Client {
    /// Execute a compiled request through the transport with bearer
    /// authentication.
    ///
    /// A failed response carrying an `invalid_token` challenge triggers
    /// exactly one token refresh followed by a replay of the original
    /// descriptor; a second failure propagates. Successful responses are
    /// checked against any required feature flags before the body is
    /// returned.
    pub(crate) async fn dispatch(
        &self,
        request: &Request,
        required_features: &[String],
    ) -> Result<Value> {
        let mut token = self.tokens().access_token().await?;
        let mut refreshed = false;

        loop {
            let outbound = self.finalize(request, &token, required_features);
            debug!(method = %outbound.method, uri = %outbound.href(), "querying API");

            let response = self.transport().send(&outbound).await?;

            if !response.is_success() {
                if !refreshed && is_token_challenge(&response) {
                    debug!("request failed due to an invalid bearer token, requesting a new one");
                    token = self.tokens().refresh_token().await?;
                    refreshed = true;
                    continue;
                }

                return Err(Error::http(response.status, response.body));
            }

            if !required_features.is_empty() {
                check_supported_features(&response, required_features)?;
            }

            return Ok(parse_body(response.body));
        }
    }

    /// Merge ambient headers into the descriptor. Descriptor-level headers
    /// win over the defaults, so a compiled `text/plain` content type
    /// survives the merge.
    fn finalize(&self, request: &Request, token: &str, required_features: &[String]) -> Request {
        let mut headers = IndexMap::new();
        headers.insert("app-id".to_string(), self.config().app_id.clone());
        headers.insert("content-type".to_string(), "application/json".to_string());

        if !required_features.is_empty() {
            headers.insert(REQUIRES_HEADER.to_string(), required_features.join(";"));
        }

        for (name, value) in &request.headers {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }

        headers.insert("authorization".to_string(), format!("Bearer {}", token));

        request.clone().with_headers(headers)
    }
}

fn is_token_challenge(response: &TransportResponse) -> bool {
    response
        .header("www-authenticate")
        .map(|challenge| challenge.contains("invalid_token"))
        .unwrap_or(false)
}

fn check_supported_features(response: &TransportResponse, required: &[String]) -> Result<()> {
    let supported: Vec<&str> = response
        .header(SUPPORTS_HEADER)
        .map(|advertised| advertised.split(';').collect())
        .unwrap_or_default();

    let missing: Vec<String> = required
        .iter()
        .filter(|feature| !supported.contains(&feature.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingFeatures { missing })
    }
}

/// Parse a response body as JSON, falling back to a raw string for
/// non-JSON payloads such as hook source text
fn parse_body(body: String) -> Value {
    if body.is_empty() {
        return Value::Null;
    }

    serde_json::from_str(&body).unwrap_or(Value::String(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    fn response_with_header(name: &str, value: &str) -> TransportResponse {
        let mut headers = IndexMap::new();
        headers.insert(name.to_string(), value.to_string());

        TransportResponse {
            status: 200,
            headers,
            body: String::new(),
        }
    }

    #[test]
    fn test_token_challenge_detection() {
        let response = response_with_header(
            "www-authenticate",
            "Bearer realm=\"/token\", error=\"invalid_token\"",
        );
        assert!(is_token_challenge(&response));

        let response = response_with_header("www-authenticate", "Bearer realm=\"/token\"");
        assert!(!is_token_challenge(&response));

        let response = response_with_header("content-type", "application/json");
        assert!(!is_token_challenge(&response));
    }

    #[test]
    fn test_feature_check_without_supports_header_misses_everything() {
        let response = response_with_header("content-type", "application/json");
        let required = vec!["feature1".to_string(), "feature2".to_string()];

        let err = check_supported_features(&response, &required).unwrap_err();

        match err {
            Error::MissingFeatures { missing } => {
                assert_eq!(missing, vec!["feature1", "feature2"]);
            }
            other => panic!("expected MissingFeatures, got {:?}", other),
        }
    }

    #[test]
    fn test_feature_check_reports_only_missing_names() {
        let response = response_with_header(SUPPORTS_HEADER, "feature1");
        let required = vec!["feature1".to_string(), "feature2".to_string()];

        let err = check_supported_features(&response, &required).unwrap_err();

        match err {
            Error::MissingFeatures { missing } => {
                assert_eq!(missing, vec!["feature2"]);
            }
            other => panic!("expected MissingFeatures, got {:?}", other),
        }
    }

    #[test]
    fn test_feature_check_passes_when_all_supported() {
        let response = response_with_header(SUPPORTS_HEADER, "feature1;feature2");
        let required = vec!["feature1".to_string(), "feature2".to_string()];

        assert!(check_supported_features(&response, &required).is_ok());
    }

    #[test]
    fn test_parse_body_falls_back_to_raw_text() {
        assert_eq!(
            parse_body("{\"results\":[]}".to_string()),
            json!({"results": []})
        );
        assert_eq!(
            parse_body("module.exports = (obj) => obj".to_string()),
            json!("module.exports = (obj) => obj")
        );
        assert_eq!(parse_body(String::new()), Value::Null);
    }
}
