use crate::client::Client;
use crate::error::{Error, Result};
use crate::query::{is_numeric_like, operators, QueryExpression};
use indexmap::IndexMap;
use serde_json::Value;

/// Target regime of a builder chain.
///
/// The variants are mutually exclusive; selecting one replaces the previous
/// regime along with its accumulated identifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Mode {
    /// Documents in a collection or responses from a custom endpoint
    #[default]
    Normal,
    /// API client/credential records
    Clients { id: Option<String>, is_self: bool },
    /// Server-side scripting hooks
    Hooks { name: Option<String> },
    /// Binary asset storage
    Media { bucket: Option<String> },
}

/// Sort direction for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub(crate) fn as_flag(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

/// Mutable accumulator for one query chain.
///
/// Each mutator consumes and returns the builder, so chains read left to
/// right. A terminator compiles the accumulated state into a single request;
/// the state stays in place afterwards, so the builder can be reused.
pub struct Builder {
    pub(crate) client: Client,
    pub(crate) collection: Option<String>,
    pub(crate) endpoint: Option<String>,
    pub(crate) query: Option<QueryExpression>,
    pub(crate) sort: Option<IndexMap<String, i32>>,
    pub(crate) fields: Option<Vec<String>>,
    pub(crate) limit: Option<Value>,
    pub(crate) page: Option<u64>,
    pub(crate) compose: Option<bool>,
    pub(crate) history: Option<bool>,
    pub(crate) property: Option<String>,
    pub(crate) version: Option<String>,
    pub(crate) search: Option<String>,
    pub(crate) lang: Option<String>,
    pub(crate) mode: Mode,
    pub(crate) count: bool,
    pub(crate) required_features: Vec<String>,
    pub(crate) headers: IndexMap<String, String>,
}

impl Builder {
    pub(crate) fn new(client: Client) -> Self {
        Builder {
            client,
            collection: None,
            endpoint: None,
            query: None,
            sort: None,
            fields: None,
            limit: None,
            page: None,
            compose: None,
            history: None,
            property: None,
            version: None,
            search: None,
            lang: None,
            mode: Mode::Normal,
            count: false,
            required_features: Vec::new(),
            headers: IndexMap::new(),
        }
    }

    /// Select a collection
    pub fn in_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Select a custom endpoint
    pub fn from_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Execute commands on API client records instead of documents
    pub fn in_clients(mut self) -> Self {
        self.mode = Mode::Clients {
            id: None,
            is_self: false,
        };
        self
    }

    /// Execute commands on server-side hooks instead of documents
    pub fn in_hooks(mut self) -> Self {
        self.mode = Mode::Hooks { name: None };
        self
    }

    /// Target the default media bucket
    pub fn in_media(mut self) -> Self {
        self.mode = Mode::Media { bucket: None };
        self
    }

    /// Target a named media bucket
    pub fn in_media_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.mode = Mode::Media {
            bucket: Some(bucket.into()),
        };
        self
    }

    /// Override the configured resource namespace for this chain
    pub fn in_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Deprecated alias for [`Builder::in_property`]
    pub fn use_database(mut self, database: impl Into<String>) -> Self {
        self.property = Some(database.into());
        self
    }

    /// Override the configured API version for this chain
    pub fn use_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Select a page
    pub fn go_to_page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    /// Select a document limit.
    ///
    /// The value is carried as-is; anything that does not parse as an
    /// integer is silently dropped from the compiled URL.
    pub fn limit_to(mut self, limit: impl Into<Value>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    /// Select a field to sort on and the sort direction.
    ///
    /// Insertion order across calls is the tie-break order for
    /// multi-field sorts.
    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort
            .get_or_insert_with(IndexMap::new)
            .insert(field.into(), order.as_flag());
        self
    }

    /// Select the fields to retrieve
    pub fn use_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Toggle composition of nested documents
    pub fn with_composition(mut self, value: bool) -> Self {
        self.compose = Some(value);
        self
    }

    /// Toggle inclusion of history revisions
    pub fn include_history(mut self, value: bool) -> Self {
        self.history = Some(value);
        self
    }

    /// Request results in the given language
    pub fn use_language(mut self, language: impl Into<String>) -> Self {
        self.lang = Some(language.into());
        self
    }

    /// Run a free-text search over the collection
    pub fn search_for(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Replace the accumulated filter with a ready-made query expression
    pub fn with_query(mut self, query: Value) -> Self {
        self.query = Some(QueryExpression::from_value(query));
        self
    }

    /// Set a header on the compiled request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Require a named server capability; accumulates across calls
    pub fn require_feature(mut self, feature: impl Into<String>) -> Self {
        self.required_features.push(feature.into());
        self
    }

    // ------------------------------------------------------------------
    // Field filters
    // ------------------------------------------------------------------

    /// Match documents where `field` equals `value` exactly
    pub fn where_field_is_equal_to(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.query
            .get_or_insert_with(QueryExpression::new)
            .set(field, value.into());
        self
    }

    /// Match documents where `field` differs from `value`.
    ///
    /// Numeric values (including numeric strings) use `$ne`; anything else
    /// becomes a case-insensitive full-match regex under `$not`.
    pub fn where_field_is_not_equal_to(self, field: &str, value: impl Into<Value>) -> Self {
        let value = value.into();

        if is_numeric_like(&value) {
            self.add_operator(field, operators::NE, value)
        } else {
            let pattern = match &value {
                Value::String(s) => format!("/^{}$/i", s),
                other => format!("/^{}$/i", other),
            };

            self.add_operator(field, operators::NOT, Value::String(pattern))
        }
    }

    /// Match documents where `field` starts with `value`
    pub fn where_field_begins_with(self, field: &str, value: impl AsRef<str>) -> Self {
        let pattern = format!("^{}", value.as_ref());
        self.add_operator(field, operators::REGEX, Value::String(pattern))
    }

    /// Match documents where `field` ends with `value`
    pub fn where_field_ends_with(self, field: &str, value: impl AsRef<str>) -> Self {
        let pattern = format!("{}$", value.as_ref());
        self.add_operator(field, operators::REGEX, Value::String(pattern))
    }

    /// Match documents where `field` contains `value`
    pub fn where_field_contains(self, field: &str, value: impl AsRef<str>) -> Self {
        self.add_operator(
            field,
            operators::REGEX,
            Value::String(value.as_ref().to_string()),
        )
    }

    /// Match documents where `field` does not contain `value`.
    ///
    /// Stored as the literal string `/value/i` under `$not`, which is what
    /// the server expects; note the asymmetry with
    /// [`Builder::where_field_contains`].
    pub fn where_field_does_not_contain(self, field: &str, value: impl AsRef<str>) -> Self {
        let pattern = format!("/{}/i", value.as_ref());
        self.add_operator(field, operators::NOT, Value::String(pattern))
    }

    /// Match documents where `field` is present
    pub fn where_field_exists(self, field: &str) -> Self {
        self.add_operator(field, operators::NE, Value::Null)
    }

    /// Match documents where `field` is absent
    pub fn where_field_does_not_exist(self, field: &str) -> Self {
        self.add_operator(field, operators::EQ, Value::Null)
    }

    /// Match documents where `field` is greater than `value`
    pub fn where_field_is_greater_than(self, field: &str, value: impl Into<Value>) -> Self {
        self.add_operator(field, operators::GT, value.into())
    }

    /// Match documents where `field` is greater than or equal to `value`
    pub fn where_field_is_greater_than_or_equal_to(
        self,
        field: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_operator(field, operators::GTE, value.into())
    }

    /// Match documents where `field` is less than `value`
    pub fn where_field_is_less_than(self, field: &str, value: impl Into<Value>) -> Self {
        self.add_operator(field, operators::LT, value.into())
    }

    /// Match documents where `field` is less than or equal to `value`
    pub fn where_field_is_less_than_or_equal_to(
        self,
        field: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_operator(field, operators::LTE, value.into())
    }

    /// Match documents where `field` is one of `matches` (a JSON array)
    pub fn where_field_is_one_of(self, field: &str, matches: impl Into<Value>) -> Self {
        self.add_operator(field, operators::IN, matches.into())
    }

    /// Match documents where `field` is none of `matches` (a JSON array)
    pub fn where_field_is_not_one_of(self, field: &str, matches: impl Into<Value>) -> Self {
        self.add_operator(field, operators::NIN, matches.into())
    }

    /// Select a client record by ID; requires clients mode
    pub fn where_client_is(mut self, id: impl Into<String>) -> Result<Self> {
        match &mut self.mode {
            Mode::Clients { id: target, .. } => {
                *target = Some(id.into());
                Ok(self)
            }
            _ => Err(Error::NotInClientsMode),
        }
    }

    /// Select the client record that issued the bearer token; requires
    /// clients mode
    pub fn where_client_is_self(mut self) -> Result<Self> {
        match &mut self.mode {
            Mode::Clients { is_self, .. } => {
                *is_self = true;
                Ok(self)
            }
            _ => Err(Error::NotInClientsMode),
        }
    }

    /// Select a hook by name; requires hooks mode
    pub fn where_hook_name_is(mut self, name: impl Into<String>) -> Result<Self> {
        match &mut self.mode {
            Mode::Hooks { name: target } => {
                *target = Some(name.into());
                Ok(self)
            }
            _ => Err(Error::NotInHooksMode),
        }
    }

    fn add_operator(mut self, field: &str, operator: &str, value: Value) -> Self {
        self.query
            .get_or_insert_with(QueryExpression::new)
            .add(field, operator, value);
        self
    }

    pub(crate) fn query_value(&self) -> Option<Value> {
        self.query.as_ref().map(|q| q.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Config;
    use serde_json::json;

    fn builder() -> Builder {
        let config = Config::new("http://0.0.0.0")
            .with_port(8000)
            .with_access_token("d08c2efb");

        Client::new(config).unwrap().query()
    }

    fn query_of(builder: &Builder) -> Value {
        builder.query_value().expect("query expression")
    }

    #[test]
    fn test_equal_to_stores_plain_value() {
        let b = builder().where_field_is_equal_to("name", "John Doe");
        assert_eq!(query_of(&b), json!({"name": "John Doe"}));
    }

    #[test]
    fn test_not_equal_to_string_uses_anchored_regex() {
        let b = builder().where_field_is_not_equal_to("name", "John Doe");
        assert_eq!(query_of(&b), json!({"name": {"$not": "/^John Doe$/i"}}));
    }

    #[test]
    fn test_not_equal_to_number_uses_ne() {
        let b = builder().where_field_is_not_equal_to("age", 34);
        assert_eq!(query_of(&b), json!({"age": {"$ne": 34}}));
    }

    #[test]
    fn test_not_equal_to_numeric_string_uses_ne() {
        let b = builder().where_field_is_not_equal_to("age", "34");
        assert_eq!(query_of(&b), json!({"age": {"$ne": "34"}}));
    }

    #[test]
    fn test_begins_with() {
        let b = builder().where_field_begins_with("name", "John");
        assert_eq!(query_of(&b), json!({"name": {"$regex": "^John"}}));
    }

    #[test]
    fn test_ends_with() {
        let b = builder().where_field_ends_with("name", "Doe");
        assert_eq!(query_of(&b), json!({"name": {"$regex": "Doe$"}}));
    }

    #[test]
    fn test_contains() {
        let b = builder().where_field_contains("name", "ohn");
        assert_eq!(query_of(&b), json!({"name": {"$regex": "ohn"}}));
    }

    #[test]
    fn test_does_not_contain_stores_literal_pattern() {
        let b = builder().where_field_does_not_contain("name", "ohn");
        assert_eq!(query_of(&b), json!({"name": {"$not": "/ohn/i"}}));
    }

    #[test]
    fn test_exists_and_does_not_exist() {
        let b = builder().where_field_exists("name");
        assert_eq!(query_of(&b), json!({"name": {"$ne": null}}));

        let b = builder().where_field_does_not_exist("name");
        assert_eq!(query_of(&b), json!({"name": {"$eq": null}}));
    }

    #[test]
    fn test_comparison_operators() {
        let b = builder()
            .where_field_is_greater_than("age", 21)
            .where_field_is_less_than_or_equal_to("age", 65);

        assert_eq!(query_of(&b), json!({"age": {"$gt": 21, "$lte": 65}}));

        let b = builder()
            .where_field_is_greater_than_or_equal_to("age", 21)
            .where_field_is_less_than("age", 65);

        assert_eq!(query_of(&b), json!({"age": {"$gte": 21, "$lt": 65}}));
    }

    #[test]
    fn test_one_of_and_not_one_of() {
        let b = builder().where_field_is_one_of("name", json!(["John", "Jane"]));
        assert_eq!(query_of(&b), json!({"name": {"$in": ["John", "Jane"]}}));

        let b = builder().where_field_is_not_one_of("name", json!(["John", "Jane"]));
        assert_eq!(query_of(&b), json!({"name": {"$nin": ["John", "Jane"]}}));
    }

    #[test]
    fn test_equality_overwrites_accumulated_operators() {
        let b = builder()
            .where_field_begins_with("name", "Jo")
            .where_field_is_equal_to("name", "John");

        assert_eq!(query_of(&b), json!({"name": "John"}));
    }

    #[test]
    fn test_with_query_replaces_accumulated_filter() {
        let b = builder()
            .where_field_is_equal_to("name", "John")
            .with_query(json!({"age": {"$gt": 21}}));

        assert_eq!(query_of(&b), json!({"age": {"$gt": 21}}));
    }

    #[test]
    fn test_sort_preserves_insertion_order() {
        let b = builder()
            .sort_by("surname", SortOrder::Ascending)
            .sort_by("age", SortOrder::Descending)
            .sort_by("name", SortOrder::Ascending);

        let sort = b.sort.as_ref().unwrap();
        let order: Vec<(&str, i32)> = sort.iter().map(|(k, v)| (k.as_str(), *v)).collect();

        assert_eq!(order, vec![("surname", 1), ("age", -1), ("name", 1)]);
    }

    #[test]
    fn test_client_filters_require_clients_mode() {
        assert!(matches!(
            builder().where_client_is("test-client"),
            Err(Error::NotInClientsMode)
        ));
        assert!(matches!(
            builder().where_client_is_self(),
            Err(Error::NotInClientsMode)
        ));

        let b = builder().in_clients().where_client_is("test-client").unwrap();
        assert_eq!(
            b.mode,
            Mode::Clients {
                id: Some("test-client".to_string()),
                is_self: false
            }
        );
    }

    #[test]
    fn test_hook_filter_requires_hooks_mode() {
        assert!(matches!(
            builder().where_hook_name_is("slugify"),
            Err(Error::NotInHooksMode)
        ));

        let b = builder().in_hooks().where_hook_name_is("slugify").unwrap();
        assert_eq!(
            b.mode,
            Mode::Hooks {
                name: Some("slugify".to_string())
            }
        );
    }

    #[test]
    fn test_require_feature_accumulates() {
        let b = builder().require_feature("aggregate").require_feature("i18n");
        assert_eq!(b.required_features, vec!["aggregate", "i18n"]);
    }
}
