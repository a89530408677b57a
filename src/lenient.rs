//! Null-coercing field extraction for upstream payloads.
//!
//! The provider sends the same field as an int, a float, a numeric string or
//! null depending on the endpoint and the era of the game. These helpers turn
//! anything unusable into `None` instead of failing the whole record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Integral value of `value`, truncating floats the way the feed's
/// `1629029.0` style ids expect.
pub fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) if n.is_i64() => n.as_i64(),
        _ => number(value).map(|n| n.trunc() as i64),
    }
}

pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) if s.eq_ignore_ascii_case("true") => true,
        _ => integer(value).is_some_and(|n| n != 0),
    }
}

/// Tokens of a collection that may be missing, a single string, or a list.
pub fn tokens(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(integer(&Value::deserialize(deserializer)?))
}

pub fn opt_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    Ok(integer(&Value::deserialize(deserializer)?).and_then(|n| i32::try_from(n).ok()))
}

pub fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(number(&Value::deserialize(deserializer)?))
}

pub fn opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(text(&Value::deserialize(deserializer)?))
}

pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(truthy(&Value::deserialize(deserializer)?))
}

pub fn token_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(tokens(&Value::deserialize(deserializer)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integers_from_mixed_types() {
        assert_eq!(integer(&json!(1629029)), Some(1629029));
        assert_eq!(integer(&json!(1629029.0)), Some(1629029));
        assert_eq!(integer(&json!("1629029")), Some(1629029));
        assert_eq!(integer(&json!(" 77 ")), Some(77));
        assert_eq!(integer(&json!("abc")), None);
        assert_eq!(integer(&json!(null)), None);
        assert_eq!(integer(&json!([1])), None);
    }

    #[test]
    fn numbers_reject_garbage() {
        assert_eq!(number(&json!("0.455")), Some(0.455));
        assert_eq!(number(&json!("")), None);
        assert_eq!(number(&json!("NaN")), None);
        assert_eq!(number(&json!({})), None);
    }

    #[test]
    fn token_collections() {
        assert_eq!(tokens(&json!("team")), vec!["team"]);
        assert_eq!(tokens(&json!(["team", 3, "delay"])), vec!["team", "delay"]);
        assert!(tokens(&json!(null)).is_empty());
    }

    #[test]
    fn truthiness() {
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!("1")));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(null)));
    }
}
