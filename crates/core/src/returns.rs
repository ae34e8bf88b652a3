//! Forward-return metrics attached to instrument rows and ledger records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price change from a base trading day's close to the next trading day.
///
/// Absence of the whole struct means "no forward data"; it is never
/// collapsed into a zero return.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForwardReturn {
    /// The next trading day the values were taken from.
    pub next_trade_date: NaiveDate,
    /// Close on the next trading day.
    pub next_close: Decimal,
    /// High on the next trading day.
    pub next_high: Decimal,
    /// Base close to next close, in percent (2 dp).
    pub close_rate_pct: Decimal,
    /// Base close to next high, in percent (2 dp).
    pub high_rate_pct: Decimal,
}

impl ForwardReturn {
    /// Computes both return percentages, or `None` when the inputs cannot
    /// produce a meaningful return (base close missing, zero, or negative).
    #[must_use]
    pub fn compute(
        next_trade_date: NaiveDate,
        base_close: Decimal,
        next_close: Decimal,
        next_high: Decimal,
    ) -> Option<Self> {
        if base_close <= Decimal::ZERO {
            return None;
        }
        let close_rate_pct =
            ((next_close - base_close) / base_close * Decimal::ONE_HUNDRED).round_dp(2);
        let high_rate_pct =
            ((next_high - base_close) / base_close * Decimal::ONE_HUNDRED).round_dp(2);
        Some(Self {
            next_trade_date,
            next_close,
            next_high,
            close_rate_pct,
            high_rate_pct,
        })
    }
}

/// Formats a percentage the way the ledger stores it: explicit sign, two
/// decimal places, trailing percent sign (`+10.00%`).
#[must_use]
pub fn format_signed_pct(value: Decimal) -> String {
    let mut v = value.round_dp(2);
    v.rescale(2);
    if v.is_sign_negative() {
        format!("{v}%")
    } else {
        format!("+{v}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn next_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 7).unwrap()
    }

    #[test]
    fn computes_close_and_high_rates() {
        let fwd = ForwardReturn::compute(next_day(), dec!(100), dec!(110), dec!(120)).unwrap();
        assert_eq!(fwd.close_rate_pct, dec!(10.00));
        assert_eq!(fwd.high_rate_pct, dec!(20.00));
    }

    #[test]
    fn zero_base_close_yields_no_return() {
        assert_eq!(
            ForwardReturn::compute(next_day(), dec!(0), dec!(110), dec!(120)),
            None
        );
        assert_eq!(
            ForwardReturn::compute(next_day(), dec!(-5), dec!(110), dec!(120)),
            None
        );
    }

    #[test]
    fn rates_are_rounded_to_two_places() {
        let fwd = ForwardReturn::compute(next_day(), dec!(300), dec!(301), dec!(302)).unwrap();
        assert_eq!(fwd.close_rate_pct, dec!(0.33));
        assert_eq!(fwd.high_rate_pct, dec!(0.67));
    }

    #[test]
    fn formats_signed_percentages() {
        assert_eq!(format_signed_pct(dec!(10)), "+10.00%");
        assert_eq!(format_signed_pct(dec!(-3.5)), "-3.50%");
        assert_eq!(format_signed_pct(dec!(0)), "+0.00%");
    }
}
