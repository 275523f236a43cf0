//! Tolerant conversions for upstream scalars.
//!
//! The upstream API is inconsistent about scalar types: the same field can be a
//! number in one record and a string in the next, and floats are used for ids.
//! None of these functions fail.
use serde_json::{Number, Value};

pub fn coerce_to_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => number_to_string(n),
        Some(other) => other.to_string(),
    }
}

pub fn coerce_to_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => number_to_i64(n).unwrap_or(0),
        Some(Value::String(s)) => parse_i64(s).unwrap_or(0),
        _ => 0,
    }
}

pub fn coerce_to_f64(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

// None when absent, unlike coerce_to_i64.
pub(crate) fn try_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => number_to_i64(n),
        Value::String(s) => parse_i64(s),
        _ => None,
    }
}

fn number_to_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

fn number_to_i64(n: &Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
            .map(|f| f.trunc() as i64)
    })
}

fn parse_i64(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
            .map(|f| f.trunc() as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_and_null_become_empty() {
        assert_eq!(coerce_to_string(None), "");
        assert_eq!(coerce_to_string(Some(&Value::Null)), "");
    }

    #[test]
    fn strings_pass_through_unchanged() {
        assert_eq!(coerce_to_string(Some(&json!(" 12 "))), " 12 ");
    }

    #[test]
    fn integral_floats_render_without_fraction() {
        assert_eq!(coerce_to_string(Some(&json!(3.0))), "3");
        assert_eq!(coerce_to_string(Some(&json!(1234567.0))), "1234567");
        assert_eq!(coerce_to_string(Some(&json!(42))), "42");
        assert_eq!(coerce_to_string(Some(&json!(7.5))), "7.5");
    }

    #[test]
    fn other_types_use_json_text() {
        assert_eq!(coerce_to_string(Some(&json!(true))), "true");
        assert_eq!(coerce_to_string(Some(&json!([1, 2]))), "[1,2]");
    }

    #[test]
    fn numeric_reads_accept_strings_and_degrade_to_zero() {
        assert_eq!(coerce_to_i64(Some(&json!("2019"))), 2019);
        assert_eq!(coerce_to_i64(Some(&json!(12.0))), 12);
        assert_eq!(coerce_to_i64(Some(&json!("twelve"))), 0);
        assert_eq!(coerce_to_i64(Some(&json!({"n": 1}))), 0);
        assert_eq!(coerce_to_f64(Some(&json!("7.25"))), 7.25);
        assert_eq!(coerce_to_f64(Some(&json!("n/a"))), 0.0);
        assert_eq!(coerce_to_f64(None), 0.0);
    }

    #[test]
    fn strict_read_keeps_absence() {
        assert_eq!(try_i64(None), None);
        assert_eq!(try_i64(Some(&json!(null))), None);
        assert_eq!(try_i64(Some(&json!("610"))), Some(610));
    }
}
