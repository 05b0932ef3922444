//! Data types flowing through an analysis run

use alloy_primitives::U512;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use crate::address::Address;
use crate::analysis::scoring::{ConcentrationAlerts, ManipulationAssessment};
use crate::classifier::Category;

/// A decoded ERC-20 `Transfer` event as supplied by the collector.
///
/// `to` and `amount` are optional because upstream decoding can fail; such
/// records are skipped during aggregation rather than rejected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub contract_address: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    /// Base-unit integer as a string
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amount: Option<String>,
    pub block_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub category_hint: Option<Category>,
}

/// Accept string amounts and exact JSON integers; anything else (floats,
/// booleans, objects) is treated as missing.
fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) if n.is_u64() => Some(n.to_string()),
        _ => None,
    })
}

/// Records excluded from a run, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipCounters {
    pub outside_window: usize,
    pub missing_recipient: usize,
    pub invalid_recipient: usize,
    pub missing_amount: usize,
    pub invalid_amount: usize,
}

impl SkipCounters {
    /// Records dropped for data-quality reasons (window filtering excluded)
    pub fn malformed(&self) -> usize {
        self.missing_recipient + self.invalid_recipient + self.missing_amount + self.invalid_amount
    }
}

/// Per-recipient sums for one window, in first-seen order
#[derive(Debug, Clone)]
pub struct AggregateTotals {
    entries: Vec<(Address, U512)>,
    index: HashMap<Address, usize>,
    pub total_volume: U512,
    pub records_consumed: usize,
    pub skipped: SkipCounters,
    pub window_start: DateTime<Utc>,
}

impl AggregateTotals {
    pub fn new(window_start: DateTime<Utc>) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            total_volume: U512::ZERO,
            records_consumed: 0,
            skipped: SkipCounters::default(),
            window_start,
        }
    }

    /// Build totals directly from recipient amounts, one record per entry
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Address, U512)>,
    {
        let mut totals = Self::new(DateTime::<Utc>::MIN_UTC);
        for (address, amount) in entries {
            totals.add(address, amount);
        }
        totals
    }

    /// Credit `amount` to `recipient`
    pub fn add(&mut self, recipient: Address, amount: U512) {
        match self.index.get(&recipient) {
            Some(&i) => self.entries[i].1 = self.entries[i].1.saturating_add(amount),
            None => {
                self.index.insert(recipient.clone(), self.entries.len());
                self.entries.push((recipient, amount));
            }
        }
        self.total_volume = self.total_volume.saturating_add(amount);
        self.records_consumed += 1;
    }

    /// Recipients with their sums, in first-seen order
    pub fn recipients(&self) -> &[(Address, U512)] {
        &self.entries
    }

    pub fn get(&self, recipient: &Address) -> Option<&U512> {
        self.index.get(recipient).map(|&i| &self.entries[i].1)
    }

    pub fn unique_recipients(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One row of the ranked recipient table
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecipient {
    /// 1-indexed
    pub rank: usize,
    pub address: Address,
    pub amount: U512,
    /// Unrounded share of total volume, 0-1
    pub share: f64,
}

impl RankedRecipient {
    pub fn percentage(&self) -> f64 {
        self.share * 100.0
    }
}

/// Concentration metrics for one set of transfers.
///
/// Share fields are ratios in `[0, 1]`; the `*_pct` accessors and the report
/// assembler expose them as percentages.
#[derive(Debug, Clone)]
pub struct ConcentrationReport {
    pub gini: f64,
    pub top1_share: f64,
    pub top5_share: f64,
    pub top10_share: f64,
    pub largest_recipient_share: f64,
    pub manipulation: ManipulationAssessment,
    pub alerts: ConcentrationAlerts,
    pub ranked_recipients: Vec<RankedRecipient>,
    pub total_transfers: usize,
    pub unique_recipients: usize,
    pub total_volume: U512,
    pub skipped: SkipCounters,
}

impl ConcentrationReport {
    /// All-zero report for windows without volume
    pub fn empty(total_transfers: usize, unique_recipients: usize, skipped: SkipCounters) -> Self {
        Self {
            gini: 0.0,
            top1_share: 0.0,
            top5_share: 0.0,
            top10_share: 0.0,
            largest_recipient_share: 0.0,
            manipulation: ManipulationAssessment::default(),
            alerts: ConcentrationAlerts::default(),
            ranked_recipients: Vec::new(),
            total_transfers,
            unique_recipients,
            total_volume: U512::ZERO,
            skipped,
        }
    }

    pub fn manipulation_score(&self) -> u8 {
        self.manipulation.score
    }

    pub fn top1_share_pct(&self) -> f64 {
        self.top1_share * 100.0
    }

    pub fn top5_share_pct(&self) -> f64 {
        self.top5_share * 100.0
    }

    pub fn top10_share_pct(&self) -> f64 {
        self.top10_share * 100.0
    }

    pub fn largest_recipient_share_pct(&self) -> f64 {
        self.largest_recipient_share * 100.0
    }

    pub fn has_volume(&self) -> bool {
        !self.total_volume.is_zero()
    }
}
