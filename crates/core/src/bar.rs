use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One instrument's daily bar as reported by the price gateway.
///
/// The reported `date` matters: calendar probing only accepts a bar whose
/// date equals the probed day, because the gateway silently substitutes the
/// nearest session when asked about a holiday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyBar {
    /// Session date the bar was actually priced on.
    pub date: NaiveDate,
    /// Normalized 6-digit instrument code.
    pub code: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

/// Normalizes an instrument code to the fixed-width 6-digit form.
///
/// Accepts decorated forms like `A005930` or 5-digit codes like `35420`:
/// the first run of 5+ digits is taken (capped at 6) and zero-padded.
/// Returns an empty string when no such run exists; rows without a
/// resolvable code cannot be forward-return-enriched.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    let bytes = raw.trim().as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let run = &raw.trim()[start..i];
            if run.len() >= 5 {
                let code = &run[..run.len().min(6)];
                return format!("{code:0>6}");
            }
        } else {
            i += 1;
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_code_strips_prefix_letters() {
        assert_eq!(normalize_code("A005930"), "005930");
    }

    #[test]
    fn normalize_code_zero_pads_short_codes() {
        assert_eq!(normalize_code("5930"), "");
        assert_eq!(normalize_code("35420"), "035420");
    }

    #[test]
    fn normalize_code_caps_long_runs_at_six() {
        assert_eq!(normalize_code("0059301"), "005930");
    }

    #[test]
    fn normalize_code_rejects_non_codes() {
        assert_eq!(normalize_code(""), "");
        assert_eq!(normalize_code("MegaCorp"), "");
        assert_eq!(normalize_code("12"), "");
    }

    #[test]
    fn normalize_code_ignores_short_runs_before_the_code() {
        assert_eq!(normalize_code("12-005930"), "005930");
    }
}
