//! Precision utilities for decimal amounts
//!
//! All functions are stateless and safe for concurrent use. Scaling applies
//! the configured rounding mode; formatting emits thousand-separated strings
//! with exactly the currency's fractional digits.

use crate::config::RoundingMode;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Rescale `value` to exactly `precision` fractional digits
pub fn scale(value: Decimal, precision: u32, mode: RoundingMode) -> Decimal {
    let mut scaled = value.round_dp_with_strategy(precision, mode.strategy());
    if scaled.scale() < precision {
        // rounding only trims; pad the fraction out to the target scale
        scaled.rescale(precision);
    }
    scaled
}

/// Strictly greater than zero
pub fn is_positive(value: Decimal) -> bool {
    value > Decimal::ZERO
}

/// Zero or greater
pub fn is_non_negative(value: Decimal) -> bool {
    value >= Decimal::ZERO
}

/// Parse an amount, tolerating thousand separators and surrounding whitespace
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let cleaned = text.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Thousand-separated rendering with exactly `precision` fractional digits
pub fn format(value: Decimal, precision: u32) -> String {
    group_thousands(&format!("{:.*}", precision as usize, value))
}

/// Same as [`format`], prefixed with the currency symbol
pub fn format_with_symbol(value: Decimal, precision: u32, symbol: &str) -> String {
    format!("{}{}", symbol, format(value, precision))
}

fn group_thousands(fixed: &str) -> String {
    let (sign, rest) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (rest, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 1);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_scale_down_truncates() {
        assert_eq!(scale(dec!(1.239), 2, RoundingMode::Down), dec!(1.23));
        assert_eq!(scale(dec!(-1.239), 2, RoundingMode::Down), dec!(-1.23));
        assert_eq!(scale(dec!(0.004), 2, RoundingMode::Down), dec!(0.00));
    }

    #[test]
    fn test_scale_modes() {
        assert_eq!(scale(dec!(1.231), 2, RoundingMode::Up), dec!(1.24));
        assert_eq!(scale(dec!(-1.231), 2, RoundingMode::Ceiling), dec!(-1.23));
        assert_eq!(scale(dec!(1.231), 2, RoundingMode::Floor), dec!(1.23));
        assert_eq!(scale(dec!(1.235), 2, RoundingMode::HalfUp), dec!(1.24));
        assert_eq!(scale(dec!(1.235), 2, RoundingMode::HalfDown), dec!(1.23));
        assert_eq!(scale(dec!(1.225), 2, RoundingMode::HalfEven), dec!(1.22));
        assert_eq!(scale(dec!(1.235), 2, RoundingMode::HalfEven), dec!(1.24));
    }

    #[test]
    fn test_scale_widens_to_precision() {
        let scaled = scale(dec!(5), 2, RoundingMode::Down);
        assert_eq!(scaled, dec!(5.00));
        assert_eq!(scaled.scale(), 2);
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format(dec!(1234567.5), 2), "1,234,567.50");
        assert_eq!(format(dec!(999), 0), "999");
        assert_eq!(format(dec!(1000), 0), "1,000");
        assert_eq!(format(dec!(-1234.5), 2), "-1,234.50");
        assert_eq!(format(dec!(0), 2), "0.00");
    }

    #[test]
    fn test_format_with_symbol() {
        assert_eq!(format_with_symbol(dec!(1500), 2, "$"), "$1,500.00");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.50"), Some(dec!(1234.50)));
        assert_eq!(parse_amount("  42 "), Some(dec!(42)));
        assert_eq!(parse_amount("-7.1"), Some(dec!(-7.1)));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_sign_predicates() {
        assert!(is_positive(dec!(0.01)));
        assert!(!is_positive(dec!(0)));
        assert!(is_non_negative(dec!(0)));
        assert!(!is_non_negative(dec!(-0.01)));
    }
}
