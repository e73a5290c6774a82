use crate::builder::{Builder, Mode};
use serde_json::{Map, Value};

/// Options controlling URL construction for one terminator call
#[derive(Debug, Clone, Default)]
pub(crate) struct UrlOptions {
    pub sign_url: bool,
    pub config: bool,
    pub status: bool,
    pub collections: bool,
    pub stats: bool,
    pub languages: bool,
    pub id: Option<String>,
    pub use_params: bool,
}

impl Builder {
    /// Compile the accumulated state into a fully qualified URL.
    ///
    /// Construction is deterministic: identical state yields identical
    /// strings. Segments append in a fixed order: resource root (chosen by
    /// mode priority: media, clients, bare API, collection, endpoint), then
    /// the requested suffix, `/count`, `/search`, the hooks short-circuit,
    /// an explicit id, and finally the serialized parameters.
    pub(crate) fn build_url(&self, options: &UrlOptions) -> String {
        let config = self.client.config();
        let mut url = config.base_url();

        match &self.mode {
            Mode::Media { bucket } => {
                url.push_str("/media");

                if let Some(bucket) = bucket {
                    url.push('/');
                    url.push_str(bucket);
                }
            }
            Mode::Clients { id, is_self } => {
                if *is_self {
                    url.push_str("/api/client");
                } else {
                    url.push_str("/api/clients");

                    if let Some(id) = id {
                        url.push('/');
                        url.push_str(id);
                    }
                }
            }
            Mode::Normal | Mode::Hooks { .. } => {
                if self.collection.is_none() && self.endpoint.is_none() {
                    url.push_str("/api");
                } else if let Some(collection) = &self.collection {
                    let namespace = self
                        .property
                        .as_deref()
                        .or_else(|| config.namespace())
                        .unwrap_or_default();

                    url.push('/');
                    url.push_str(namespace);
                    url.push('/');
                    url.push_str(collection);
                } else if let Some(endpoint) = &self.endpoint {
                    let version = self.version.as_deref().unwrap_or(&config.version);

                    url.push('/');
                    url.push_str(version);
                    url.push('/');
                    url.push_str(endpoint);
                }
            }
        }

        if options.sign_url {
            url.push_str("/sign");
        }

        if options.config {
            url.push_str("/config");
        }

        if options.status {
            url.push_str("/status");
        }

        if options.collections {
            url.push_str("/collections");
        }

        if options.stats {
            url.push_str("/stats");
        }

        if options.languages {
            url.push_str("/languages");
        }

        if self.count {
            url.push_str("/count");
        }

        if self.search.is_some() {
            url.push_str("/search");
        }

        // Hooks URLs take no id or parameters
        if let Mode::Hooks { name } = &self.mode {
            url.push_str("/hooks");

            if let Some(name) = name {
                url.push('/');
                url.push_str(name);
                url.push_str("/config");
            }

            return url;
        }

        if let Some(id) = &options.id {
            url.push('/');
            url.push_str(id);
        }

        if options.use_params {
            let params = self.query_params();

            if !params.is_empty() {
                url.push('?');
                url.push_str(&params);
            }
        }

        url
    }

    /// Serialize the accumulated parameters, in stable alphabetical name
    /// order. Values are not form-encoded; the only escaping is the
    /// percent-encoding of string leaves inside `filter`.
    fn query_params(&self) -> String {
        let mut params: Vec<(&str, String)> = Vec::new();

        if let Some(compose) = self.compose {
            params.push(("compose", compose.to_string()));
        }

        if let Some(count) = self.limit.as_ref().and_then(integer_limit) {
            params.push(("count", count.to_string()));
        }

        if let Some(fields) = &self.fields {
            let mut projection = Map::new();

            for field in fields {
                projection.insert(field.clone(), Value::from(1));
            }

            params.push(("fields", Value::Object(projection).to_string()));
        }

        if let Some(query) = &self.query {
            params.push(("filter", query.encoded().to_string()));
        }

        if let Some(history) = self.history {
            params.push(("includeHistory", history.to_string()));
        }

        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }

        if let Some(term) = &self.search {
            params.push(("q", term.clone()));
        }

        if let Some(sort) = &self.sort {
            let serialized: Map<String, Value> = sort
                .iter()
                .map(|(field, order)| (field.clone(), Value::from(*order)))
                .collect();

            params.push(("sort", Value::Object(serialized).to_string()));
        }

        let mut out = params
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&");

        // Language always trails the sorted parameters
        if let Some(lang) = &self.lang {
            if !out.is_empty() {
                out.push('&');
            }

            out.push_str("lang=");
            out.push_str(lang);
        }

        out
    }
}

/// Permissive integer parse for limits: numbers truncate, strings parse
/// their leading integer. Anything else is dropped.
fn integer_limit(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim_start();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let leading: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();

            leading.parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}
