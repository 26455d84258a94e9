use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Envelope code for a successful call.
pub const CODE_OK: i64 = 200;
/// Envelope code for an expired or missing login.
pub const CODE_UNAUTHORIZED: i64 = 401;
/// Envelope code for an application-level server error.
pub const CODE_SERVER_ERROR: i64 = 500;

/// Application envelope carried in every response body: `{code, msg, data}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default, deserialize_with = "nullable_string")]
    pub msg: String,
    #[serde(default)]
    pub data: JsonValue,
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Envelope;

    #[test]
    fn decodes_full_envelope() {
        let envelope: Envelope =
            serde_json::from_value(json!({"code": 200, "msg": "ok", "data": {"id": 7}}))
                .expect("envelope must decode");
        assert_eq!(envelope.code, 200);
        assert_eq!(envelope.msg, "ok");
        assert_eq!(envelope.data, json!({"id": 7}));
    }

    #[test]
    fn missing_or_null_fields_default() {
        let envelope: Envelope = serde_json::from_value(json!({"code": 401, "msg": null}))
            .expect("envelope must decode");
        assert_eq!(envelope.msg, "");
        assert!(envelope.data.is_null());
    }

    #[test]
    fn serializes_bit_exact_field_names() {
        let envelope = Envelope {
            code: 500,
            msg: "boom".to_owned(),
            data: json!(null),
        };
        assert_eq!(
            serde_json::to_value(&envelope).expect("envelope must encode"),
            json!({"code": 500, "msg": "boom", "data": null})
        );
    }
}
