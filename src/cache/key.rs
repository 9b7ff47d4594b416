//! Cache keys derived from an endpoint name and its serialized parameters

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiResult;

/// Identifies one cache entry: `(endpoint, canonical params)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    endpoint: &'static str,
    params: String,
}

impl QueryKey {
    /// Build a key from any serializable parameter value.
    ///
    /// Parameters that are equal in value produce the same key regardless of
    /// field order, and `null` members are dropped so an absent optional
    /// parameter and an explicit `None` coincide.
    pub fn new<P: Serialize + ?Sized>(endpoint: &'static str, params: &P) -> ApiResult<Self> {
        let value = serde_json::to_value(params)?;
        Ok(Self {
            endpoint,
            params: canonical_json(&value),
        })
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    pub fn params(&self) -> &str {
        &self.params
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint, self.params)
    }
}

/// Serialize a JSON value with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> =
                map.iter().filter(|(_, v)| !v.is_null()).collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (name, field)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(field, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}
