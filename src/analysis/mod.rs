//! Concentration analysis engine
//!
//! Pure, synchronous computation: transfer records are aggregated per
//! recipient within a window, then turned into inequality metrics, share
//! metrics and a manipulation score. Daily history and cast activity are
//! computed alongside.

pub mod activity;
pub mod aggregator;
pub mod amount;
pub mod concentration;
pub mod history;
pub mod scoring;
pub mod types;

use serde::{Deserialize, Serialize};

pub use activity::{analyze_activity, ActivityReport, AuthorActivity, CastRecord};
pub use aggregator::aggregate;
pub use concentration::{gini, ConcentrationAnalyzer};
pub use history::{daily_buckets, DailyBucket};
pub use scoring::{
    ConcentrationAlerts, InequalityLevel, ManipulationAssessment, RiskLevel, ScoreBand, ScoringConfig,
};
pub use types::{AggregateTotals, ConcentrationReport, RankedRecipient, SkipCounters, TransferRecord};

/// Analysis window and presentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Trailing window in hours
    #[serde(default = "default_window_hours")]
    pub window_hours: f64,

    /// Length of the ranked recipient table
    #[serde(default = "default_top_recipients")]
    pub top_recipients: usize,

    /// Decimals used to render human-scaled amounts
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,

    /// Length of the daily history in days
    #[serde(default = "default_history_days")]
    pub history_days: u32,
}

fn default_window_hours() -> f64 { 24.0 }
fn default_top_recipients() -> usize { 100 }
fn default_token_decimals() -> u8 { 18 }
fn default_history_days() -> u32 { 90 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            top_recipients: default_top_recipients(),
            token_decimals: default_token_decimals(),
            history_days: default_history_days(),
        }
    }
}
