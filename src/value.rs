//! Free-form metadata values.
//!
//! Persons, organizations and edges carry extensible metadata. Instead of an
//! open JSON value, metadata is a map over a restricted value union so that
//! consumers can match on every shape it can take.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata attached to a record.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Possible values a metadata entry can hold.
///
/// # Examples
///
/// ```
/// use warmpath::MetadataValue;
///
/// let city = MetadataValue::from("Berlin");
/// assert_eq!(city.as_str(), Some("Berlin"));
/// assert!(MetadataValue::from(3.5).is_number());
/// ```
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    String(String),
    Map(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
    /// True for a boolean.
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// True for a number.
    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// True for a string.
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// True for a nested map.
    pub const fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// The boolean, if this is one.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The number, if this is one.
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// The nested map, if this is one.
    pub const fn as_map(&self) -> Option<&BTreeMap<String, MetadataValue>> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Converts a JSON value coming from an ingestion adapter.
    ///
    /// Arrays and `null` have no counterpart in the union and yield `None`;
    /// inside objects such entries are dropped.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Object(obj) => Some(Self::Map(
                obj.iter()
                    .filter_map(|(k, v)| Self::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
            Value::Array(_) | Value::Null => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Map(_) => "map",
        }
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Map(v) => write!(f, "map[{}]", v.len()),
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for MetadataValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<BTreeMap<String, MetadataValue>> for MetadataValue {
    fn from(v: BTreeMap<String, MetadataValue>) -> Self {
        Self::Map(v)
    }
}

/// Fills keys missing from `primary` with entries from `secondary`.
///
/// Nested maps are merged recursively; on conflicting scalars `primary` wins.
#[must_use]
pub fn merge_metadata(primary: &Metadata, secondary: &Metadata) -> Metadata {
    let mut out = primary.clone();
    for (key, value) in secondary {
        if let Some(existing) = out.get_mut(key) {
            if let (MetadataValue::Map(a), MetadataValue::Map(b)) = (existing, value) {
                let merged = merge_metadata(a, b);
                *a = merged;
            }
        } else {
            out.insert(key.clone(), value.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(MetadataValue::Bool(true).as_bool(), Some(true));
        assert_eq!(MetadataValue::from(42i64).as_number(), Some(42.0));
        assert_eq!(MetadataValue::from("x").as_str(), Some("x"));
        assert!(MetadataValue::from("x").as_number().is_none());
        assert_eq!(MetadataValue::Map(BTreeMap::new()).type_name(), "map");
    }

    #[test]
    fn test_untagged_json_shape() {
        let json = r#"{"location":"Berlin","vip":true,"score":0.5,"extra":{"team":"infra"}}"#;
        let meta: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta["location"].as_str(), Some("Berlin"));
        assert_eq!(meta["vip"].as_bool(), Some(true));
        assert_eq!(meta["score"].as_number(), Some(0.5));
        assert_eq!(
            meta["extra"].as_map().and_then(|m| m["team"].as_str()),
            Some("infra")
        );
    }

    #[test]
    fn test_from_json_drops_arrays_and_nulls() {
        let json = serde_json::json!({"a": [1, 2], "b": null, "c": "kept"});
        let value = MetadataValue::from_json(&json).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["c"].as_str(), Some("kept"));
        assert!(MetadataValue::from_json(&serde_json::Value::Null).is_none());
    }

    #[test]
    fn test_merge_metadata_primary_wins() {
        let mut a = Metadata::new();
        a.insert("location".into(), "Berlin".into());
        let mut nested_a = BTreeMap::new();
        nested_a.insert("x".to_string(), MetadataValue::from(1i64));
        a.insert("n".into(), MetadataValue::Map(nested_a));

        let mut b = Metadata::new();
        b.insert("location".into(), "Paris".into());
        b.insert("source".into(), "csv".into());
        let mut nested_b = BTreeMap::new();
        nested_b.insert("y".to_string(), MetadataValue::from(2i64));
        b.insert("n".into(), MetadataValue::Map(nested_b));

        let merged = merge_metadata(&a, &b);
        assert_eq!(merged["location"].as_str(), Some("Berlin"));
        assert_eq!(merged["source"].as_str(), Some("csv"));
        assert_eq!(merged["n"].as_map().unwrap().len(), 2);
    }
}
