use serde_json::Value;

/// A card's persisted value: always a JSON object.
pub type CardValue = serde_json::Map<String, Value>;

const DATA_PREFIX: &str = "data:";

/// Encode a value for the `data-card-value` attribute.
pub fn encode_card_value(value: &CardValue) -> String {
    let json = Value::Object(value.clone()).to_string();
    format!("{DATA_PREFIX}{}", urlencoding::encode(&json))
}

/// Decode a `data-card-value` attribute. Anything unreadable yields an
/// empty object.
pub fn decode_card_value(raw: &str) -> CardValue {
    let encoded = raw.strip_prefix(DATA_PREFIX).unwrap_or(raw);
    let json = match urlencoding::decode(encoded) {
        Ok(json) => json,
        Err(err) => {
            tracing::warn!(error = %err, "card value is not valid percent-encoding");
            return CardValue::new();
        }
    };
    match serde_json::from_str::<Value>(&json) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::warn!(kind = ?other, "card value is not an object");
            CardValue::new()
        }
        Err(err) => {
            tracing::warn!(error = %err, "card value is not valid JSON");
            CardValue::new()
        }
    }
}

/// The `id` entry of a value, if it is a string.
pub(crate) fn value_id(value: &CardValue) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> CardValue {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_encode_card_value() {
        let value = object(json!({"id": "cd-1", "src": "a b.png"}));
        assert_eq!(
            encode_card_value(&value),
            "data:%7B%22id%22%3A%22cd-1%22%2C%22src%22%3A%22a%20b.png%22%7D"
        );
    }

    #[test]
    fn test_decode_preserves_unicode_and_nesting() {
        let value = object(json!({"title": "héllo & <tag>", "list": [1, {"x": null}]}));
        assert_eq!(decode_card_value(&encode_card_value(&value)), value);
    }

    #[test]
    fn test_decode_failures_are_empty() {
        assert!(decode_card_value("data:%E0%A4%A").is_empty());
        assert!(decode_card_value("data:not-json").is_empty());
        assert!(decode_card_value("data:%5B1%5D").is_empty());
        assert!(decode_card_value("").is_empty());
    }

    #[test]
    fn test_decode_without_prefix() {
        assert_eq!(value_id(&decode_card_value(r#"{"id":"x"}"#)), Some("x"));
    }
}
