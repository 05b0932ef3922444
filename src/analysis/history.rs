//! Per-day transfer totals over a trailing period

use alloy_primitives::U512;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::collections::{BTreeMap, HashSet};

use crate::address::{self, Address};
use crate::analysis::amount::{parse_amount, widen};
use crate::analysis::types::TransferRecord;
use crate::error::{Error, Result};

/// Totals for one UTC calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub transfers: usize,
    pub unique_recipients: usize,
    pub volume: U512,
    pub farcaster_transfers: usize,
    pub farcaster_recipients: usize,
    pub farcaster_volume: U512,
}

#[derive(Default)]
struct DayAccumulator {
    transfers: usize,
    recipients: HashSet<Address>,
    volume: U512,
    farcaster_transfers: usize,
    farcaster_recipients: HashSet<Address>,
    farcaster_volume: U512,
}

/// Group records from the last `days` days by UTC date, oldest first.
///
/// Every record in the period counts as a transfer. Only decodable
/// recipients count towards unique recipients and an undecodable amount
/// adds nothing to volume. Days without records are absent. `is_farcaster`
/// decides which records also count towards the Farcaster columns.
pub fn daily_buckets<'a, I, F>(
    records: I,
    days: u32,
    now: DateTime<Utc>,
    is_farcaster: F,
) -> Result<Vec<DailyBucket>>
where
    I: IntoIterator<Item = &'a TransferRecord>,
    F: Fn(&TransferRecord) -> bool,
{
    if days == 0 {
        return Err(Error::InvalidWindow(0.0));
    }
    let start = now
        .checked_sub_signed(TimeDelta::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut by_day: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for record in records {
        if record.block_timestamp < start || record.block_timestamp > now {
            continue;
        }

        let recipient = record.to.as_deref().and_then(|to| address::normalize(to).ok());
        let amount = record
            .amount
            .as_deref()
            .and_then(parse_amount)
            .map(widen)
            .unwrap_or(U512::ZERO);
        let farcaster = is_farcaster(record);

        let day = by_day.entry(record.block_timestamp.date_naive()).or_default();
        day.transfers += 1;
        day.volume = day.volume.saturating_add(amount);
        if let Some(recipient) = &recipient {
            day.recipients.insert(recipient.clone());
        }

        if farcaster {
            day.farcaster_transfers += 1;
            day.farcaster_volume = day.farcaster_volume.saturating_add(amount);
            if let Some(recipient) = recipient {
                day.farcaster_recipients.insert(recipient);
            }
        }
    }

    Ok(by_day
        .into_iter()
        .map(|(date, day)| DailyBucket {
            date,
            transfers: day.transfers,
            unique_recipients: day.recipients.len(),
            volume: day.volume,
            farcaster_transfers: day.farcaster_transfers,
            farcaster_recipients: day.farcaster_recipients.len(),
            farcaster_volume: day.farcaster_volume,
        })
        .collect())
}
