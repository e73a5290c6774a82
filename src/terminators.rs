use crate::builder::{Builder, Mode};
use crate::error::{Error, Result};
use crate::request::{strip_reserved_properties, Request};
use crate::response::ResultSet;
use crate::urls::UrlOptions;
use futures::future::try_join_all;
use indexmap::IndexMap;
use reqwest::Method;
use serde_json::{json, Value};

/// Options for the find terminator
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    /// Resolve with the results array only instead of the whole envelope
    pub extract_results: bool,
    /// Ask the server for match metadata instead of documents
    pub extract_metadata: bool,
}

impl Builder {
    /// Create one or multiple documents, or a hook in hooks mode
    pub async fn create(&self, documents: Value) -> Result<Value> {
        let request = self.compile_create(documents)?;

        self.client.dispatch(&request, &self.required_features).await
    }

    /// Delete the documents affected by the accumulated query
    pub async fn delete(&self) -> Result<Value> {
        let request = self.compile_delete()?;

        self.client.dispatch(&request, &self.required_features).await
    }

    /// Update the documents affected by the accumulated query
    pub async fn update(&self, update: Value) -> Result<Value> {
        let request = self.compile_update(update)?;

        self.client.dispatch(&request, &self.required_features).await
    }

    /// Get the documents affected by the accumulated query
    pub async fn find(&mut self, options: FindOptions) -> Result<Value> {
        let request = self.compile_find(options)?;
        let response = self.client.dispatch(&request, &self.required_features).await?;

        if options.extract_results {
            return Ok(response.get("results").cloned().unwrap_or(Value::Null));
        }

        Ok(response)
    }

    /// Get the config for the selected collection, or for the API if none
    /// is selected
    pub async fn get_config(&self) -> Result<Value> {
        self.execute(
            Method::GET,
            UrlOptions {
                config: true,
                ..Default::default()
            },
        )
        .await
    }

    /// Replace the config for the selected collection, or for the API if
    /// none is selected
    pub async fn set_config(&self, new_config: Value) -> Result<Value> {
        let url = self.build_url(&UrlOptions {
            config: true,
            ..Default::default()
        });
        let request = Request::new(Method::POST, &url)?
            .with_headers(self.headers.clone())
            .with_body(new_config);

        self.client.dispatch(&request, &self.required_features).await
    }

    /// Get collection stats
    pub async fn get_stats(&self) -> Result<Value> {
        self.execute(
            Method::GET,
            UrlOptions {
                stats: true,
                ..Default::default()
            },
        )
        .await
    }

    /// Get the status of the API
    pub async fn get_status(&self) -> Result<Value> {
        self.execute(
            Method::POST,
            UrlOptions {
                status: true,
                ..Default::default()
            },
        )
        .await
    }

    /// Get a list of all collections
    pub async fn get_collections(&self) -> Result<Value> {
        self.execute(
            Method::GET,
            UrlOptions {
                collections: true,
                ..Default::default()
            },
        )
        .await
    }

    /// Get the languages supported by the API
    pub async fn get_languages(&self) -> Result<Value> {
        self.execute(
            Method::GET,
            UrlOptions {
                languages: true,
                ..Default::default()
            },
        )
        .await
    }

    /// Get a signed URL for a media upload
    pub async fn get_signed_url(&self, parameters: Value) -> Result<Value> {
        let url = self.build_url(&UrlOptions {
            sign_url: true,
            ..Default::default()
        });
        let request = Request::new(Method::POST, &url)?
            .with_headers(self.headers.clone())
            .with_body(parameters);

        self.client.dispatch(&request, &self.required_features).await
    }

    /// Fetch every document matching the accumulated query, pass each one
    /// through `callback`, and write the sanitized result back by id.
    ///
    /// The per-document updates are issued concurrently and joined; any
    /// single failure rejects the whole batch. Resolves with the array of
    /// updated documents.
    pub async fn apply<F>(&mut self, callback: F) -> Result<Vec<Value>>
    where
        F: Fn(Value) -> Value,
    {
        let collection = self.collection.clone().ok_or(Error::MissingCollection)?;

        if self.query.is_none() {
            return Err(Error::MissingQuery("apply"));
        }

        let find_request = self.compile_find(FindOptions::default())?;
        let response = self.client.dispatch(&find_request, &self.required_features).await?;
        let envelope: ResultSet = serde_json::from_value(response)?;

        let mut updates = Vec::new();

        for document in envelope.results {
            let id = document.get("_id").cloned().unwrap_or(Value::Null);
            let new_document = strip_reserved_properties(callback(document));

            let mut chain = self.client.query().in_collection(collection.clone());

            if let Some(version) = &self.version {
                chain = chain.use_version(version.clone());
            }

            if let Some(property) = &self.property {
                chain = chain.in_property(property.clone());
            }

            let chain = chain.where_field_is_equal_to("_id", id);

            updates.push(async move { chain.update(new_document).await });
        }

        let responses = try_join_all(updates).await?;
        let mut updated_documents = Vec::new();

        for response in responses {
            if let Ok(set) = serde_json::from_value::<ResultSet>(response) {
                updated_documents.extend(set.results);
            }
        }

        Ok(updated_documents)
    }

    // ------------------------------------------------------------------
    // Request compilation
    // ------------------------------------------------------------------

    pub(crate) fn compile_create(&self, documents: Value) -> Result<Request> {
        let url = self.build_url(&UrlOptions::default());
        let request = Request::new(Method::POST, &url)?;

        if self.hooks_mode_with_name()? {
            return Ok(request
                .with_headers(self.text_headers())
                .with_text_body(text_payload(documents)));
        }

        Ok(request
            .with_headers(self.headers.clone())
            .with_body(strip_reserved_properties(documents)))
    }

    pub(crate) fn compile_delete(&self) -> Result<Request> {
        let url = self.build_url(&UrlOptions::default());
        let request = Request::new(Method::DELETE, &url)?.with_headers(self.headers.clone());

        if self.hooks_mode_with_name()? {
            return Ok(request);
        }

        if let Mode::Clients { id, is_self } = &self.mode {
            if id.is_none() && !*is_self {
                return Err(Error::MissingClientFilter("delete"));
            }

            return Ok(request);
        }

        let query = self.query_value().ok_or(Error::MissingQuery("delete"))?;

        Ok(request.with_body(json!({ "query": query })))
    }

    pub(crate) fn compile_update(&self, update: Value) -> Result<Request> {
        let url = self.build_url(&UrlOptions::default());
        let request = Request::new(Method::PUT, &url)?;

        if self.hooks_mode_with_name()? {
            return Ok(request
                .with_headers(self.text_headers())
                .with_text_body(text_payload(update)));
        }

        if let Mode::Clients { id, is_self } = &self.mode {
            if id.is_none() && !*is_self {
                return Err(Error::MissingClientFilter("update"));
            }

            // The record id comes from the URL, never from the payload
            let mut payload = update;
            if let Value::Object(fields) = &mut payload {
                fields.remove("clientId");
            }

            return Ok(request
                .with_headers(self.headers.clone())
                .with_body(payload));
        }

        let query = self.query_value().ok_or(Error::MissingQuery("update"))?;

        Ok(request.with_headers(self.headers.clone()).with_body(json!({
            "query": query,
            "update": strip_reserved_properties(update),
        })))
    }

    pub(crate) fn compile_find(&mut self, options: FindOptions) -> Result<Request> {
        if options.extract_metadata {
            self.count = true;
        }

        let url = self.build_url(&UrlOptions {
            use_params: true,
            ..Default::default()
        });

        Ok(Request::new(Method::GET, &url)?.with_headers(self.headers.clone()))
    }

    async fn execute(&self, method: Method, options: UrlOptions) -> Result<Value> {
        let url = self.build_url(&options);
        let request = Request::new(method, &url)?.with_headers(self.headers.clone());

        self.client.dispatch(&request, &self.required_features).await
    }

    /// Whether the chain edits hooks; fails if the hook name is missing
    fn hooks_mode_with_name(&self) -> Result<bool> {
        match &self.mode {
            Mode::Hooks { name: Some(_) } => Ok(true),
            Mode::Hooks { name: None } => Err(Error::MissingHookName),
            _ => Ok(false),
        }
    }

    fn text_headers(&self) -> IndexMap<String, String> {
        let mut headers = self.headers.clone();
        headers.insert("content-type".to_string(), "text/plain".to_string());

        headers
    }
}

/// Hook payloads travel as raw text; a string value is sent verbatim,
/// anything else as its JSON rendition
fn text_payload(payload: Value) -> String {
    match payload {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Client, Config};
    use crate::request::Body;

    fn client() -> Client {
        let config = Config::new("http://0.0.0.0")
            .with_port(8000)
            .with_property("test")
            .with_access_token("d08c2efb");

        Client::new(config).unwrap()
    }

    #[test]
    fn test_create_strips_reserved_properties() {
        let b = client().in_collection("collectionOne");
        let request = b
            .compile_create(json!({"_id": "12345", "_version": 3, "name": "John"}))
            .unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body, Some(Body::Json(json!({"name": "John"}))));
    }

    #[test]
    fn test_create_strips_each_document_in_a_batch() {
        let b = client().in_collection("collectionOne");
        let request = b
            .compile_create(json!([
                {"_id": "1", "name": "John"},
                {"_id": "2", "name": "Jane"}
            ]))
            .unwrap();

        assert_eq!(
            request.body,
            Some(Body::Json(json!([{"name": "John"}, {"name": "Jane"}])))
        );
    }

    #[test]
    fn test_delete_requires_query() {
        let b = client().in_collection("collectionOne");

        assert!(matches!(
            b.compile_delete(),
            Err(Error::MissingQuery("delete"))
        ));
    }

    #[test]
    fn test_delete_carries_query_in_body() {
        let b = client()
            .in_collection("collectionOne")
            .where_field_is_equal_to("name", "John");
        let request = b.compile_delete().unwrap();

        assert_eq!(request.method, Method::DELETE);
        assert_eq!(
            request.body,
            Some(Body::Json(json!({"query": {"name": "John"}})))
        );
    }

    #[test]
    fn test_update_requires_query() {
        let b = client().in_collection("collectionOne");

        assert!(matches!(
            b.compile_update(json!({"name": "Jane"})),
            Err(Error::MissingQuery("update"))
        ));
    }

    #[test]
    fn test_update_wraps_query_and_sanitized_payload() {
        let b = client()
            .in_collection("collectionOne")
            .where_field_is_equal_to("name", "John");
        let request = b
            .compile_update(json!({"_id": "12345", "name": "Jane"}))
            .unwrap();

        assert_eq!(request.method, Method::PUT);
        assert_eq!(
            request.body,
            Some(Body::Json(json!({
                "query": {"name": "John"},
                "update": {"name": "Jane"}
            })))
        );
    }

    #[test]
    fn test_clients_delete_requires_id_or_self() {
        let b = client().in_clients();

        assert!(matches!(
            b.compile_delete(),
            Err(Error::MissingClientFilter("delete"))
        ));
    }

    #[test]
    fn test_clients_update_strips_client_id_field() {
        let b = client()
            .in_clients()
            .where_client_is("test-client")
            .unwrap();
        let request = b
            .compile_update(json!({"clientId": "test-client", "secret": "hunter2"}))
            .unwrap();

        assert_eq!(request.uri.path(), "/api/clients/test-client");
        assert_eq!(request.body, Some(Body::Json(json!({"secret": "hunter2"}))));
    }

    #[test]
    fn test_clients_delete_with_self_targets_own_record() {
        let b = client().in_clients().where_client_is_self().unwrap();
        let request = b.compile_delete().unwrap();

        assert_eq!(request.uri.path(), "/api/client");
        assert_eq!(request.body, None);
    }

    #[test]
    fn test_hook_create_sends_raw_text() {
        let b = client()
            .in_hooks()
            .where_hook_name_is("slugify")
            .unwrap();
        let request = b
            .compile_create(json!("module.exports = (obj) => obj"))
            .unwrap();

        assert_eq!(request.uri.path(), "/api/hooks/slugify/config");
        assert_eq!(
            request.body,
            Some(Body::Text("module.exports = (obj) => obj".to_string()))
        );
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some("text/plain")
        );
    }

    #[test]
    fn test_hook_terminators_require_a_name() {
        let b = client().in_hooks();

        assert!(matches!(
            b.compile_create(json!("source")),
            Err(Error::MissingHookName)
        ));
        assert!(matches!(
            b.compile_update(json!("source")),
            Err(Error::MissingHookName)
        ));
        assert!(matches!(b.compile_delete(), Err(Error::MissingHookName)));
    }

    #[test]
    fn test_find_with_metadata_extraction_targets_count() {
        let mut b = client()
            .in_collection("collectionOne")
            .where_field_is_equal_to("name", "John");
        let request = b
            .compile_find(FindOptions {
                extract_metadata: true,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.uri.path(), "/test/collectionOne/count");
    }

    #[test]
    fn test_builder_remains_usable_after_compiling() {
        let b = client()
            .in_collection("collectionOne")
            .where_field_is_equal_to("name", "John");

        let first = b.compile_delete().unwrap();
        let second = b.compile_delete().unwrap();

        assert_eq!(first.href(), second.href());
        assert_eq!(first.body, second.body);
    }
}
