use serde_json::{Map, Value};

/// Operator symbols understood by the remote query engine.
pub mod operators {
    pub const GT: &str = "$gt";
    pub const GTE: &str = "$gte";
    pub const LT: &str = "$lt";
    pub const LTE: &str = "$lte";
    pub const NE: &str = "$ne";
    pub const EQ: &str = "$eq";
    pub const IN: &str = "$in";
    pub const NIN: &str = "$nin";
    pub const REGEX: &str = "$regex";
    pub const NOT: &str = "$not";
}

/// Accumulated filter expression for a builder chain.
///
/// Maps field names to either a literal value (plain equality) or a sub-map
/// of operator conditions. The accumulator is purely syntactic: field names
/// and operand types are passed through without validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryExpression {
    fields: Map<String, Value>,
}

impl QueryExpression {
    pub fn new() -> Self {
        QueryExpression::default()
    }

    /// Wrap an existing filter object, e.g. one assembled by hand.
    ///
    /// Non-object values produce an empty expression.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => QueryExpression { fields },
            _ => QueryExpression::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Set a plain equality condition for `field`.
    ///
    /// Discards any operator sub-map previously accumulated for the field;
    /// equality is a destructive overwrite, not a merge.
    pub fn set(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }

    /// Add an operator condition for `field`.
    ///
    /// Conditions on the same field merge into one sub-map. A previously set
    /// scalar (equality) value is replaced by a fresh sub-map.
    pub fn add(&mut self, field: &str, operator: &str, value: Value) {
        let entry = self
            .fields
            .entry(field.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }

        if let Value::Object(conditions) = entry {
            conditions.insert(operator.to_string(), value);
        }
    }

    /// The expression as a JSON object, in insertion order.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// The expression with string leaves percent-encoded, as sent in the
    /// `filter` parameter. Objects are encoded recursively; arrays and
    /// non-string scalars pass through untouched.
    pub(crate) fn encoded(&self) -> Value {
        encode_string_leaves(&self.fields)
    }
}

fn encode_string_leaves(object: &Map<String, Value>) -> Value {
    let encoded = object
        .iter()
        .map(|(key, value)| {
            let encoded_value = match value {
                Value::Object(inner) => encode_string_leaves(inner),
                Value::String(s) => Value::String(urlencoding::encode(s).into_owned()),
                other => other.clone(),
            };

            (key.clone(), encoded_value)
        })
        .collect();

    Value::Object(encoded)
}

/// Permissive numeric test used by the not-equal-to filter: numbers, booleans
/// and null count as numeric, as do strings that parse as a number.
pub(crate) fn is_numeric_like(value: &Value) -> bool {
    match value {
        Value::Number(_) | Value::Bool(_) | Value::Null => true,
        Value::String(s) => s.trim().is_empty() || s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equality_sets_plain_value() {
        let mut query = QueryExpression::new();
        query.set("name", json!("John"));

        assert_eq!(query.to_value(), json!({"name": "John"}));
    }

    #[test]
    fn test_operator_conditions_merge_per_field() {
        let mut query = QueryExpression::new();
        query.add("age", operators::GTE, json!(18));
        query.add("age", operators::LT, json!(65));

        assert_eq!(query.to_value(), json!({"age": {"$gte": 18, "$lt": 65}}));
    }

    #[test]
    fn test_equality_overwrites_operator_map() {
        let mut query = QueryExpression::new();
        query.add("name", operators::REGEX, json!("^Jo"));
        query.set("name", json!("John"));

        assert_eq!(query.to_value(), json!({"name": "John"}));
    }

    #[test]
    fn test_operator_replaces_scalar_with_sub_map() {
        let mut query = QueryExpression::new();
        query.set("name", json!("John"));
        query.add("name", operators::NE, json!("Jane"));

        assert_eq!(query.to_value(), json!({"name": {"$ne": "Jane"}}));
    }

    #[test]
    fn test_encoded_escapes_string_leaves_only() {
        let mut query = QueryExpression::new();
        query.set("name", json!("John Doe"));
        query.add("email", operators::REGEX, json!("^john@"));
        query.add("tags", operators::IN, json!(["a b", "c"]));
        query.set("age", json!(34));

        assert_eq!(
            query.encoded(),
            json!({
                "name": "John%20Doe",
                "email": {"$regex": "%5Ejohn%40"},
                "tags": {"$in": ["a b", "c"]},
                "age": 34
            })
        );
    }

    #[test]
    fn test_is_numeric_like() {
        assert!(is_numeric_like(&json!(34)));
        assert!(is_numeric_like(&json!(34.5)));
        assert!(is_numeric_like(&json!("34")));
        assert!(is_numeric_like(&json!("34.5")));
        assert!(!is_numeric_like(&json!("John Doe")));
        assert!(!is_numeric_like(&json!(["34"])));
    }
}
