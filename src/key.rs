use std::fmt;

use serde_json::Value as JsonValue;

use crate::RequestConfig;

/// Identity of a request for duplicate suppression.
///
/// Built from method, URL, params and body. Objects are serialized with
/// sorted keys so field order never changes the key; headers and pipeline
/// options are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn from_config(config: &RequestConfig) -> Self {
        Self(
            [
                config.method.as_str().to_owned(),
                config.url.clone(),
                canonical(config.params.as_ref()),
                canonical(config.data.as_ref()),
            ]
            .join("&"),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Absent values serialize to the empty string, distinct from `null`.
fn canonical(value: Option<&JsonValue>) -> String {
    let mut out = String::new();
    if let Some(value) = value {
        write_canonical(value, &mut out);
    }
    out
}

fn write_canonical(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Object(object) => {
            let mut entries: Vec<_> = object.iter().collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
            out.push('{');
            for (index, (name, value)) in entries.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&JsonValue::String(name.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        JsonValue::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
