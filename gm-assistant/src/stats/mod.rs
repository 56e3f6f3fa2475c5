// Stat vocabulary: categories, stat-id maps, and lenient numeric parsing of
// raw stat values pulled from the fantasy API.

pub mod category;
pub mod stat_map;

pub use category::{canonical_stat, CanonicalStat, Category};
pub use stat_map::StatMap;

use serde_json::Value;

/// Coerce a raw stat value to a number. Blank, "-", null, and anything
/// unparseable become 0.0, so a missing stat reads the same as a true zero.
pub fn parse_num(value: &Value) -> f64 {
    parse_optional_num(value).unwrap_or(0.0)
}

/// Like [`parse_num`], but distinguishes "no usable value" (`None`) from a
/// parsed number.
pub fn parse_optional_num(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s == "-" {
                None
            } else {
                s.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Parse a "hits/at-bats" value such as `"7/21"`. Anything malformed yields
/// `(0, 0)`.
pub fn parse_hits_at_bats(value: &Value) -> (u32, u32) {
    let Value::String(s) = value else {
        return (0, 0);
    };
    let Some((hits, at_bats)) = s.trim().split_once('/') else {
        return (0, 0);
    };
    match (hits.trim().parse::<u32>(), at_bats.trim().parse::<u32>()) {
        (Ok(h), Ok(ab)) => (h, ab),
        _ => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_num_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_num(&json!(14)), 14.0);
        assert_eq!(parse_num(&json!(3.25)), 3.25);
        assert_eq!(parse_num(&json!(" 1.18 ")), 1.18);
    }

    #[test]
    fn parse_num_zero_fills_garbage() {
        assert_eq!(parse_num(&json!("")), 0.0);
        assert_eq!(parse_num(&json!("-")), 0.0);
        assert_eq!(parse_num(&json!("n/a")), 0.0);
        assert_eq!(parse_num(&Value::Null), 0.0);
        assert_eq!(parse_num(&json!(true)), 0.0);
        assert_eq!(parse_num(&json!("NaN")), 0.0);
    }

    #[test]
    fn parse_optional_num_keeps_absence_visible() {
        assert_eq!(parse_optional_num(&json!("")), None);
        assert_eq!(parse_optional_num(&json!("4.41")), Some(4.41));
        assert_eq!(parse_optional_num(&Value::Null), None);
    }

    #[test]
    fn hits_at_bats_parsing() {
        assert_eq!(parse_hits_at_bats(&json!("7/21")), (7, 21));
        assert_eq!(parse_hits_at_bats(&json!(" 0 / 4 ")), (0, 4));
        assert_eq!(parse_hits_at_bats(&json!("7-21")), (0, 0));
        assert_eq!(parse_hits_at_bats(&json!("x/21")), (0, 0));
        assert_eq!(parse_hits_at_bats(&json!(7)), (0, 0));
    }
}
