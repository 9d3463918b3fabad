use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Parses a loosely formatted amount such as `"$250,000"` or `"₦1.5"`.
///
/// Every character that is not an ASCII digit or `.` is dropped before the
/// remainder is parsed, so currency symbols, separators and unit suffixes are
/// ignored. Returns `None` when nothing numeric remains or the remainder is
/// malformed (for example `"1.2.3"`).
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Renders an amount with thousands separators and two decimal places,
/// e.g. `1234567.5` becomes `1,234,567.50`.
pub fn format_price(amount: &Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let fixed = format!("{:.2}", rounded.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{format_price, parse_amount};

    #[test]
    fn parse_amount_strips_symbols_and_separators() {
        assert_eq!(parse_amount("$250,000"), Some(Decimal::new(250_000, 0)));
        assert_eq!(parse_amount("250k"), Some(Decimal::new(250, 0)));
        assert_eq!(parse_amount("N 1,500,000.50"), Some(Decimal::new(1_500_000_50, 2)));
        assert_eq!(parse_amount("150000.0"), Some(Decimal::new(1_500_000, 1)));
    }

    #[test]
    fn parse_amount_rejects_non_numeric_remainders() {
        assert_eq!(parse_amount("about a million"), None);
        assert_eq!(parse_amount("1.2.3"), None);
        assert_eq!(parse_amount("."), None);
    }

    #[test]
    fn format_price_groups_thousands() {
        assert_eq!(format_price(&Decimal::new(185_000_00, 2)), "185,000.00");
        assert_eq!(format_price(&Decimal::new(1_234_567_5, 1)), "1,234,567.50");
        assert_eq!(format_price(&Decimal::new(999, 0)), "999.00");
        assert_eq!(format_price(&Decimal::new(1000, 0)), "1,000.00");
        assert_eq!(format_price(&Decimal::ZERO), "0.00");
    }

    #[test]
    fn format_price_rounds_to_cents() {
        assert_eq!(format_price(&Decimal::new(12_345, 3)), "12.35");
        assert_eq!(format_price(&Decimal::new(-2_500_000, 2)), "-25,000.00");
    }
}
