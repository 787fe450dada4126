use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// A node of an expanded document.
///
/// Expanded output only ever contains arrays, objects keyed by absolute IRIs
/// or keywords, and scalar leaves. "Nothing" (a dropped value) is represented
/// by `Option::None` at the call sites rather than by a variant here.
#[derive(Debug, PartialEq, Clone)]
pub enum ExpandedValue {
    Array(Vec<ExpandedValue>),
    Object(BTreeMap<String, ExpandedValue>),
    /// A string, number, boolean or `null` leaf.
    ScalarPrimitive(Value),
}

impl ExpandedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExpandedValue::ScalarPrimitive(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, ExpandedValue>> {
        match self {
            ExpandedValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ExpandedValue]> {
        match self {
            ExpandedValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ExpandedValue::ScalarPrimitive(Value::Null))
    }

    fn has_key(&self, key: &str) -> bool {
        self.as_object().map_or(false, |map| map.contains_key(key))
    }

    pub fn is_value_object(&self) -> bool {
        self.has_key("@value")
    }

    pub fn is_list_object(&self) -> bool {
        self.has_key("@list")
    }

    /// A map with `@graph` and nothing but `@id` and `@index` besides.
    pub fn is_graph_object(&self) -> bool {
        match self {
            ExpandedValue::Object(map) => {
                map.contains_key("@graph")
                    && map
                        .keys()
                        .all(|k| k == "@graph" || k == "@id" || k == "@index")
            }
            _ => false,
        }
    }

    /// Wraps anything but an array into a one-element array.
    pub fn into_vec(self) -> Vec<ExpandedValue> {
        match self {
            ExpandedValue::Array(items) => items,
            other => vec![other],
        }
    }
}

impl Serialize for ExpandedValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ExpandedValue::Array(items) => {
                let mut state = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    state.serialize_element(item)?;
                }
                state.end()
            }
            ExpandedValue::Object(map) => {
                let mut state = serializer.serialize_map(Some(map.len()))?;
                for (key, val) in map {
                    state.serialize_entry(key, val)?;
                }
                state.end()
            }
            ExpandedValue::ScalarPrimitive(val) => val.serialize(serializer),
        }
    }
}

impl From<ExpandedValue> for Value {
    fn from(value: ExpandedValue) -> Value {
        match value {
            ExpandedValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            ExpandedValue::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
            ExpandedValue::ScalarPrimitive(val) => val,
        }
    }
}

/// Carries JSON over unchanged; used for `@json` literals and for tests.
impl From<Value> for ExpandedValue {
    fn from(value: Value) -> ExpandedValue {
        match value {
            Value::Array(items) => {
                ExpandedValue::Array(items.into_iter().map(ExpandedValue::from).collect())
            }
            Value::Object(map) => ExpandedValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, ExpandedValue::from(v)))
                    .collect(),
            ),
            scalar => ExpandedValue::ScalarPrimitive(scalar),
        }
    }
}

impl From<String> for ExpandedValue {
    fn from(value: String) -> ExpandedValue {
        ExpandedValue::ScalarPrimitive(Value::String(value))
    }
}

impl From<&str> for ExpandedValue {
    fn from(value: &str) -> ExpandedValue {
        ExpandedValue::ScalarPrimitive(Value::String(value.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_like_plain_json() {
        let value = ExpandedValue::from(json!([{"@id": "http://a/", "http://b/": [{"@value": 1}]}]));
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"[{"@id":"http://a/","http://b/":[{"@value":1}]}]"#
        );
    }

    #[test]
    fn graph_object_shapes() {
        let indexed = ExpandedValue::from(json!({"@graph": [], "@index": "x"}));
        let named = ExpandedValue::from(json!({"@graph": [], "@id": "http://g/"}));
        let node = ExpandedValue::from(json!({"@graph": [], "http://p/": []}));

        assert!(indexed.is_graph_object());
        assert!(named.is_graph_object());
        assert!(!node.is_graph_object());
    }
}
