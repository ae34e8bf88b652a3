//! Forward-field self-healing for ledger records.
//!
//! A record saved before the next session exists has empty forward
//! columns. Given its (date, code), the calendar resolves the base/next
//! pair and the joiner supplies next-day values; only empty columns are
//! filled in, a non-empty value is never overwritten.

use crate::record::LedgerRecord;
use tema_core::returns::format_signed_pct;
use tema_core::{dates, normalize_code};
use tema_forward::{ForwardReturnJoiner, TradingCalendar};

/// Returns whether the record was modified.
pub async fn backfill_forward_fields(
    record: &mut LedgerRecord,
    calendar: &TradingCalendar,
    joiner: &ForwardReturnJoiner,
) -> bool {
    let mut changed = false;

    if record.date.trim().is_empty() || record.code.trim().is_empty() {
        return false;
    }
    let code = normalize_code(&record.code);
    if code.is_empty() {
        return false;
    }
    if record.code != code {
        record.code = code.clone();
        changed = true;
    }

    let Some(day) = dates::parse_compact(&record.date) else {
        return changed;
    };
    // The ledger stores the short date form.
    let compact = dates::yymmdd(day);
    if record.date.trim() != compact {
        record.date = compact;
        changed = true;
    }

    // A snapshot date that was itself a holiday resolves to the session
    // before it; an unresolvable probe keeps the stored day as base.
    let base = calendar.base_trading_day(day).await.unwrap_or(day);
    let Some(next) = calendar.next_trading_day(base).await else {
        return changed;
    };

    changed |= fill(&mut record.next_trade_date, || dates::yymmdd(next));

    let Some(fwd) = joiner.single_return(&code, base, next).await else {
        return changed;
    };
    changed |= fill(&mut record.next_close, || {
        fwd.next_close.normalize().to_string()
    });
    changed |= fill(&mut record.next_high, || {
        fwd.next_high.normalize().to_string()
    });
    changed |= fill(&mut record.next_close_rate, || {
        format_signed_pct(fwd.close_rate_pct)
    });
    changed |= fill(&mut record.next_high_rate, || {
        format_signed_pct(fwd.high_rate_pct)
    });
    changed
}

fn fill(slot: &mut String, value: impl FnOnce() -> String) -> bool {
    if slot.trim().is_empty() {
        *slot = value();
        true
    } else {
        false
    }
}
