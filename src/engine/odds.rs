//! American-odds normalization and conversions.
//!
//! Zero is the "no quote" value throughout: it converts to decimal odds 1.0
//! and implied probability 0.0.

use crate::feed::types::RawQuote;

/// Coerce a raw sportsbook column into integer American odds.
///
/// Numbers pass through (floats are truncated), strings yield their first
/// signed integer (`"+450"`, `"odds -110 DK"`). Anything else, including
/// out-of-range values, is 0.
pub fn normalize_odds(raw: &RawQuote) -> i32 {
    match raw {
        RawQuote::Missing => 0,
        RawQuote::Integer(v) => i32::try_from(*v).unwrap_or(0),
        RawQuote::Float(v) => {
            if v.is_finite() && v.abs() <= i32::MAX as f64 {
                v.trunc() as i32
            } else {
                0
            }
        }
        RawQuote::Text(s) => first_signed_integer(s),
    }
}

/// First `[+-]?\d+` run in `s`, or 0.
pub fn first_signed_integer(s: &str) -> i32 {
    let bytes = s.as_bytes();
    let Some(start) = bytes.iter().position(|b| b.is_ascii_digit()) else {
        return 0;
    };
    let end = bytes[start..]
        .iter()
        .position(|b| !b.is_ascii_digit())
        .map_or(bytes.len(), |n| start + n);

    let Ok(magnitude) = s[start..end].parse::<i64>() else {
        return 0;
    };
    let signed = if start > 0 && bytes[start - 1] == b'-' {
        -magnitude
    } else {
        magnitude
    };
    i32::try_from(signed).unwrap_or(0)
}

/// Decimal odds (total return per unit staked).
/// +150 -> 2.5, -200 -> 1.5, 0 -> 1.0.
pub fn to_decimal_odds(american: i32) -> f64 {
    let odds = american as f64;
    if american > 0 {
        1.0 + odds / 100.0
    } else if american < 0 {
        1.0 + 100.0 / odds.abs()
    } else {
        1.0
    }
}

/// Bookmaker-implied win probability, vig included.
/// Positive odds (e.g., +150): prob = 100 / (odds + 100)
/// Negative odds (e.g., -150): prob = |odds| / (|odds| + 100)
pub fn to_implied_probability(american: i32) -> f64 {
    let odds = american as f64;
    if american > 0 {
        100.0 / (odds + 100.0)
    } else if american < 0 {
        let abs = odds.abs();
        abs / (abs + 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_normalize_numeric_passthrough() {
        assert_eq!(normalize_odds(&RawQuote::Integer(450)), 450);
        assert_eq!(normalize_odds(&RawQuote::Integer(-110)), -110);
        assert_eq!(normalize_odds(&RawQuote::Float(275.0)), 275);
        assert_eq!(normalize_odds(&RawQuote::Float(-162.9)), -162);
    }

    #[test]
    fn test_normalize_absent_values() {
        assert_eq!(normalize_odds(&RawQuote::Missing), 0);
        assert_eq!(normalize_odds(&RawQuote::Integer(0)), 0);
        assert_eq!(normalize_odds(&RawQuote::Text(String::new())), 0);
        assert_eq!(normalize_odds(&RawQuote::Text("EVEN".into())), 0);
        assert_eq!(normalize_odds(&RawQuote::Float(f64::NAN)), 0);
    }

    #[test]
    fn test_normalize_string_embedded() {
        assert_eq!(normalize_odds(&RawQuote::Text("+450".into())), 450);
        assert_eq!(normalize_odds(&RawQuote::Text("-110".into())), -110);
        assert_eq!(normalize_odds(&RawQuote::Text(" odds: -135 (DK)".into())), -135);
        assert_eq!(normalize_odds(&RawQuote::Text("2500/1 futures".into())), 2500);
    }

    #[test]
    fn test_normalize_out_of_range_is_absent() {
        assert_eq!(normalize_odds(&RawQuote::Integer(i64::MAX)), 0);
        assert_eq!(normalize_odds(&RawQuote::Float(1e12)), 0);
        assert_eq!(first_signed_integer("99999999999999999999999"), 0);
    }

    #[test]
    fn test_decimal_odds() {
        assert!((to_decimal_odds(150) - 2.5).abs() < 1e-12);
        assert!((to_decimal_odds(-200) - 1.5).abs() < 1e-12);
        assert!((to_decimal_odds(100) - 2.0).abs() < 1e-12);
        assert!((to_decimal_odds(-100) - 2.0).abs() < 1e-12);
        assert_eq!(to_decimal_odds(0), 1.0);
    }

    #[test]
    fn test_implied_probability() {
        assert!((to_implied_probability(-150) - 0.6).abs() < 0.001);
        assert!((to_implied_probability(150) - 0.4).abs() < 0.001);
        assert_eq!(to_implied_probability(0), 0.0);
    }

    #[test]
    fn test_conversions_over_random_odds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2_000 {
            let odds: i32 = rng.gen_range(-100_000..=100_000);
            let decimal = to_decimal_odds(odds);
            let prob = to_implied_probability(odds);

            assert!(decimal >= 1.0, "decimal {decimal} for {odds}");
            assert_eq!(prob == 0.0, odds == 0, "prob {prob} for {odds}");
            if odds > 0 {
                assert!((decimal - (1.0 + odds as f64 / 100.0)).abs() < 1e-9);
            } else if odds < 0 {
                assert!((decimal - (1.0 + 100.0 / (odds as f64).abs())).abs() < 1e-9);
            }
            if prob > 0.0 {
                assert!((decimal - 1.0 / prob).abs() < 1e-6 * decimal, "odds {odds}");
            }
        }
    }

    #[test]
    fn test_probability_falls_as_price_lengthens() {
        // Favorites: -1000 .. -100, then underdogs +100 .. +1000.
        let ladder = [-1000, -500, -200, -110, -100, 100, 110, 200, 500, 1000];
        for pair in ladder.windows(2) {
            assert!(
                to_implied_probability(pair[0]) >= to_implied_probability(pair[1]),
                "{} vs {}",
                pair[0],
                pair[1]
            );
        }
    }
}
