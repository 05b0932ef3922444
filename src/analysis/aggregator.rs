//! Per-recipient aggregation of transfer records within a time window

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::address;
use crate::analysis::amount::{parse_amount, widen};
use crate::analysis::types::{AggregateTotals, TransferRecord};
use crate::error::{Error, Result};

/// Earliest timestamp included in a window of `window_hours` ending at `now`
pub fn window_start(window_hours: f64, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if !window_hours.is_finite() || window_hours < 0.0 {
        return Err(Error::InvalidWindow(window_hours));
    }

    let millis = (window_hours * 3_600_000.0).round();
    // Windows reaching past the representable range include everything
    let start = TimeDelta::try_milliseconds(millis as i64)
        .filter(|_| millis < i64::MAX as f64)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    Ok(start)
}

/// Sum transfer amounts per recipient for records at or after
/// `now - window_hours`.
///
/// Records without a decodable recipient or amount are skipped and counted
/// in [`AggregateTotals::skipped`]. A negative or non-finite window is a
/// caller bug and returns [`Error::InvalidWindow`].
pub fn aggregate<'a, I>(records: I, window_hours: f64, now: DateTime<Utc>) -> Result<AggregateTotals>
where
    I: IntoIterator<Item = &'a TransferRecord>,
{
    let start = window_start(window_hours, now)?;
    let mut totals = AggregateTotals::new(start);

    for record in records {
        if record.block_timestamp < start {
            totals.skipped.outside_window += 1;
            continue;
        }

        let recipient = match record.to.as_deref() {
            None => {
                totals.skipped.missing_recipient += 1;
                continue;
            }
            Some(raw) => match address::normalize(raw) {
                Ok(addr) => addr,
                Err(_) => {
                    totals.skipped.invalid_recipient += 1;
                    continue;
                }
            },
        };

        let amount = match record.amount.as_deref() {
            None => {
                totals.skipped.missing_amount += 1;
                continue;
            }
            Some(raw) => match parse_amount(raw) {
                Some(amount) => amount,
                None => {
                    totals.skipped.invalid_amount += 1;
                    continue;
                }
            },
        };

        totals.add(recipient, widen(amount));
    }

    if totals.skipped.malformed() > 0 {
        debug!(
            consumed = totals.records_consumed,
            skipped = ?totals.skipped,
            "Skipped malformed transfer records"
        );
    }

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U512;
    use chrono::TimeZone;

    const CONTRACT: &str = "0x1fc10ef15e041c5d3c54042e52eb0c54cb9b710c";
    const ALICE: &str = "0x00000000000000000000000000000000000000aa";
    const BOB: &str = "0x00000000000000000000000000000000000000bb";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn record(to: Option<&str>, amount: Option<&str>, hours_ago: i64) -> TransferRecord {
        TransferRecord {
            contract_address: CONTRACT.to_string(),
            from: Some(CONTRACT.to_string()),
            to: to.map(String::from),
            amount: amount.map(String::from),
            block_timestamp: now() - TimeDelta::hours(hours_ago),
            category_hint: None,
        }
    }

    #[test]
    fn test_sums_per_recipient_case_insensitively() {
        let records = vec![
            record(Some(ALICE), Some("100"), 1),
            record(Some(&ALICE.to_uppercase().replacen("0X", "0x", 1)), Some("50"), 2),
            record(Some(BOB), Some("0x10"), 3),
        ];
        let totals = aggregate(&records, 24.0, now()).unwrap();
        let alice = address::normalize(ALICE).unwrap();

        assert_eq!(totals.unique_recipients(), 2);
        assert_eq!(totals.get(&alice), Some(&U512::from(150u64)));
        assert_eq!(totals.total_volume, U512::from(166u64));
        assert_eq!(totals.records_consumed, 3);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let records = vec![
            record(Some(ALICE), Some("1"), 24),
            record(Some(BOB), Some("1"), 25),
        ];
        let totals = aggregate(&records, 24.0, now()).unwrap();
        assert_eq!(totals.unique_recipients(), 1);
        assert_eq!(totals.skipped.outside_window, 1);
        assert_eq!(totals.window_start, now() - TimeDelta::hours(24));
    }

    #[test]
    fn test_fractional_window() {
        let records = vec![record(Some(ALICE), Some("1"), 1)];
        let totals = aggregate(&records, 0.5, now()).unwrap();
        assert!(totals.is_empty());
    }

    #[test]
    fn test_malformed_records_are_counted_not_fatal() {
        let records = vec![
            record(None, Some("1"), 1),
            record(Some("0xshort"), Some("1"), 1),
            record(Some(ALICE), None, 1),
            record(Some(ALICE), Some("12.5"), 1),
            record(Some(ALICE), Some("7"), 1),
        ];
        let totals = aggregate(&records, 24.0, now()).unwrap();
        assert_eq!(totals.records_consumed, 1);
        assert_eq!(totals.skipped.missing_recipient, 1);
        assert_eq!(totals.skipped.invalid_recipient, 1);
        assert_eq!(totals.skipped.missing_amount, 1);
        assert_eq!(totals.skipped.invalid_amount, 1);
        assert_eq!(totals.skipped.malformed(), 4);
    }

    #[test]
    fn test_sums_beyond_u64_exactly() {
        // 10^24 each, far beyond u64 and f64's exact integer range
        let big = "1000000000000000000000000";
        let records = vec![
            record(Some(ALICE), Some(big), 1),
            record(Some(ALICE), Some(big), 1),
            record(Some(ALICE), Some("1"), 1),
        ];
        let totals = aggregate(&records, 24.0, now()).unwrap();
        assert_eq!(totals.total_volume.to_string(), "2000000000000000000000001");
    }

    #[test]
    fn test_empty_input() {
        let totals = aggregate(&Vec::new(), 24.0, now()).unwrap();
        assert!(totals.is_empty());
        assert!(totals.total_volume.is_zero());
    }

    #[test]
    fn test_rejects_invalid_window() {
        assert!(matches!(aggregate(&Vec::new(), -1.0, now()), Err(Error::InvalidWindow(_))));
        assert!(aggregate(&Vec::new(), f64::NAN, now()).is_err());
    }

    #[test]
    fn test_huge_window_includes_everything() {
        let start = window_start(1e300, now()).unwrap();
        assert_eq!(start, DateTime::<Utc>::MIN_UTC);
    }
}
