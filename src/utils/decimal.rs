//! Decimal arithmetic and formatting utilities.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Round a decimal to a specific number of decimal places.
pub fn round_to_precision(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp(decimals)
}

/// Safe division that returns zero if divisor is zero.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator == Decimal::ZERO {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Ratio as a percentage, zero when the whole is zero.
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    safe_div(part, whole) * dec!(100)
}

/// Format a USD amount with two decimals and thousands separators.
pub fn format_usd(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    let fixed = format!("{:.2}", rounded.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", sign, grouped, cents)
}

/// Format a price rounded to four decimals.
pub fn format_price(value: Decimal) -> String {
    format!("${:.4}", value.round_dp(4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_precision() {
        assert_eq!(round_to_precision(dec!(22.2222), 1), dec!(22.2));
        assert_eq!(round_to_precision(dec!(-4.16666), 2), dec!(-4.17));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(dec!(3), dec!(4)), dec!(75));
        assert_eq!(percent_of(dec!(3), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(dec!(0)), "$0.00");
        assert_eq!(format_usd(dec!(20)), "$20.00");
        assert_eq!(format_usd(dec!(1234.5)), "$1,234.50");
        assert_eq!(format_usd(dec!(1234567.891)), "$1,234,567.89");
        assert_eq!(format_usd(dec!(-987654.3)), "-$987,654.30");
        assert_eq!(format_usd(dec!(-0.001)), "$0.00");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(dec!(90)), "$90.0000");
        assert_eq!(format_price(dec!(0.123456)), "$0.1235");
        assert_eq!(format_price(dec!(89.99996)), "$90.0000");
        assert_eq!(format_price(dec!(116.66666666)), "$116.6667");
    }
}
