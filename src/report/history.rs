//! Daily history view with running totals

use alloy_primitives::U512;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::ReportAssembler;
use crate::analysis::amount::format_units;
use crate::analysis::DailyBucket;

/// One day, with totals accumulated from the start of the period
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyView {
    pub date: NaiveDate,
    pub total_transfers: usize,
    pub unique_recipients: usize,
    pub total_volume: String,
    pub farcaster_transfers: usize,
    pub farcaster_recipients: usize,
    pub farcaster_volume: String,
    pub cumulative_transfers: usize,
    pub cumulative_volume: String,
    pub cumulative_farcaster_transfers: usize,
    pub cumulative_farcaster_volume: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    /// Days with at least one transfer
    pub total_days: usize,
    pub total_transfers: usize,
    pub total_volume: String,
    pub total_farcaster_transfers: usize,
    pub total_farcaster_volume: String,
    pub average_daily_transfers: usize,
    pub average_daily_volume: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalReport {
    pub timestamp: DateTime<Utc>,
    pub period_days: u32,
    /// Oldest day first
    pub daily_data: Vec<DailyView>,
    pub summary: HistorySummary,
}

impl ReportAssembler {
    /// Attach running totals to each day and summarize the period.
    ///
    /// Averages are taken over days that have data; the volume average is
    /// truncated to whole base units.
    pub fn assemble_history(
        &self,
        buckets: &[DailyBucket],
        period_days: u32,
        timestamp: DateTime<Utc>,
    ) -> HistoricalReport {
        let format = |value: &U512| format_units(value, self.token_decimals);

        let mut transfers = 0usize;
        let mut volume = U512::ZERO;
        let mut farcaster_transfers = 0usize;
        let mut farcaster_volume = U512::ZERO;

        let daily_data = buckets
            .iter()
            .map(|day| {
                transfers += day.transfers;
                volume = volume.saturating_add(day.volume);
                farcaster_transfers += day.farcaster_transfers;
                farcaster_volume = farcaster_volume.saturating_add(day.farcaster_volume);

                DailyView {
                    date: day.date,
                    total_transfers: day.transfers,
                    unique_recipients: day.unique_recipients,
                    total_volume: format(&day.volume),
                    farcaster_transfers: day.farcaster_transfers,
                    farcaster_recipients: day.farcaster_recipients,
                    farcaster_volume: format(&day.farcaster_volume),
                    cumulative_transfers: transfers,
                    cumulative_volume: format(&volume),
                    cumulative_farcaster_transfers: farcaster_transfers,
                    cumulative_farcaster_volume: format(&farcaster_volume),
                }
            })
            .collect::<Vec<_>>();

        let days = buckets.len().max(1);
        let summary = HistorySummary {
            total_days: buckets.len(),
            total_transfers: transfers,
            total_volume: format(&volume),
            total_farcaster_transfers: farcaster_transfers,
            total_farcaster_volume: format(&farcaster_volume),
            average_daily_transfers: (transfers as f64 / days as f64).round() as usize,
            average_daily_volume: format(&(volume / U512::from(days))),
        };

        HistoricalReport {
            timestamp,
            period_days,
            daily_data,
            summary,
        }
    }
}
