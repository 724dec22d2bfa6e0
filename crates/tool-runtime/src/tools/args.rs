//! Lenient argument decoding.
//!
//! Models are sloppy with JSON types: `"season": "2024"` and `"limit": 5.0`
//! both show up in practice. These helpers accept numeric strings and whole
//! floats for integer fields, and treat blank strings as absent.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

pub(crate) fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `"inf"` and `"nan"` parse as floats but are not stats; they are rejected.
pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Integer field. Pair with `#[serde(default = ...)]` for a fallback.
pub fn int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    as_i64(&value).ok_or_else(|| de::Error::custom(format!("expected an integer, got {value}")))
}

/// Optional integer field; `null` is `None`. Pair with `#[serde(default)]`.
pub fn opt_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => as_i64(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected an integer, got {value}"))),
    }
}

/// Optional string field; blank strings are `None`. Pair with `#[serde(default)]`.
pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Params {
        #[serde(default = "ten", deserialize_with = "int")]
        limit: i64,
        #[serde(default, deserialize_with = "opt_int")]
        season: Option<i64>,
        #[serde(default, deserialize_with = "opt_text")]
        team: Option<String>,
    }

    fn ten() -> i64 {
        10
    }

    #[test]
    fn test_accepts_loose_numbers() {
        let params: Params =
            serde_json::from_value(json!({"limit": 5.0, "season": "2024", "team": " KC "})).unwrap();
        assert_eq!(params.limit, 5);
        assert_eq!(params.season, Some(2024));
        assert_eq!(params.team.as_deref(), Some("KC"));
    }

    #[test]
    fn test_missing_and_blank_fields() {
        let params: Params = serde_json::from_value(json!({"season": null, "team": ""})).unwrap();
        assert_eq!(params.limit, 10);
        assert_eq!(params.season, None);
        assert_eq!(params.team, None);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_value::<Params>(json!({"limit": "lots"})).is_err());
        assert!(serde_json::from_value::<Params>(json!({"season": 2024.5})).is_err());
    }

    #[test]
    fn test_non_finite_strings_are_not_numbers() {
        assert_eq!(as_f64(&json!("inf")), None);
        assert_eq!(as_f64(&json!("-Infinity")), None);
        assert_eq!(as_f64(&json!("NaN")), None);
        assert_eq!(as_f64(&json!(" 12.5 ")), Some(12.5));
    }
}
