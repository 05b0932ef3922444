//! Combined report for the dashboard/API
//!
//! This is the presentation boundary: internal share ratios (0-1) become
//! percentages (0-100), big-integer amounts become decimal strings and
//! token decimals are applied. Nothing upstream formats for display.

mod history;

pub use history::{DailyView, HistoricalReport, HistorySummary};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::analysis::amount::format_units;
use crate::analysis::{
    ActivityReport, AuthorActivity, ConcentrationAlerts, ConcentrationReport, RankedRecipient,
    RiskLevel, SkipCounters,
};
use crate::classifier::Category;

/// Whether a category had any data in the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStatus {
    Active,
    /// No transfers seen yet; metrics are zero placeholders
    Monitoring,
}

/// A ranked recipient as exposed externally
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientView {
    pub rank: usize,
    pub address: String,
    /// Base units
    pub amount: String,
    pub amount_formatted: String,
    /// Share of total volume, 0-100, four decimals
    pub percentage: f64,
}

impl RecipientView {
    fn from_ranked(r: &RankedRecipient, token_decimals: u8) -> Self {
        Self {
            rank: r.rank,
            address: r.address.to_string(),
            amount: r.amount.to_string(),
            amount_formatted: format_units(&r.amount, token_decimals),
            percentage: round_to(r.percentage(), 4),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// External form of a [`ConcentrationReport`]; shares are percentages
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    pub gini: f64,
    pub top1_share_pct: f64,
    pub top5_share_pct: f64,
    pub top10_share_pct: f64,
    pub largest_recipient_share_pct: f64,
    pub manipulation_score: u8,
    pub risk_level: RiskLevel,
    pub manipulation_reasons: Vec<String>,
    pub alerts: ConcentrationAlerts,
    pub total_transfers: usize,
    pub unique_recipients: usize,
    pub total_volume: String,
    pub total_volume_formatted: String,
    pub top_recipients: Vec<RecipientView>,
    pub skipped: SkipCounters,
}

impl ReportView {
    fn from_report(report: &ConcentrationReport, token_decimals: u8) -> Self {
        Self {
            gini: report.gini,
            top1_share_pct: report.top1_share_pct(),
            top5_share_pct: report.top5_share_pct(),
            top10_share_pct: report.top10_share_pct(),
            largest_recipient_share_pct: report.largest_recipient_share_pct(),
            manipulation_score: report.manipulation.score,
            risk_level: report.manipulation.risk_level,
            manipulation_reasons: report.manipulation.reasons.clone(),
            alerts: report.alerts,
            total_transfers: report.total_transfers,
            unique_recipients: report.unique_recipients,
            total_volume: report.total_volume.to_string(),
            total_volume_formatted: format_units(&report.total_volume, token_decimals),
            top_recipients: report
                .ranked_recipients
                .iter()
                .map(|r| RecipientView::from_ranked(r, token_decimals))
                .collect(),
            skipped: report.skipped,
        }
    }

    fn placeholder(token_decimals: u8) -> Self {
        Self::from_report(
            &ConcentrationReport::empty(0, 0, SkipCounters::default()),
            token_decimals,
        )
    }
}

/// One category's section of the combined report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySection {
    pub status: CategoryStatus,
    #[serde(flatten)]
    pub report: ReportView,
}

/// Everything the dashboard renders for one analysis run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedReport {
    pub timestamp: DateTime<Utc>,
    pub window_hours: f64,
    /// All transfers in the window, categorized or not
    pub global: ReportView,
    /// Always holds every reported category
    pub categories: BTreeMap<Category, CategorySection>,
}

impl CombinedReport {
    pub fn category(&self, category: Category) -> Option<&CategorySection> {
        self.categories.get(&category)
    }

    /// Highest risk level across the global view and active categories
    pub fn highest_risk(&self) -> RiskLevel {
        self.categories
            .values()
            .filter(|s| s.status == CategoryStatus::Active)
            .map(|s| s.report.risk_level)
            .chain(std::iter::once(self.global.risk_level))
            .max()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub rank: usize,
    pub author: String,
    pub casts: usize,
    /// Share of all casts, 0-100, two decimals
    pub percentage: f64,
}

impl From<&AuthorActivity> for AuthorView {
    fn from(a: &AuthorActivity) -> Self {
        Self {
            rank: a.rank,
            author: a.author.clone(),
            casts: a.casts,
            percentage: round_to(a.share * 100.0, 2),
        }
    }
}

/// External form of an [`ActivityReport`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub timestamp: DateTime<Utc>,
    pub window_hours: f64,
    pub total_casts: usize,
    pub unique_authors: usize,
    pub average_casts_per_author: f64,
    pub top10_share_pct: f64,
    pub manipulation_score: u8,
    pub top_authors: Vec<AuthorView>,
}

/// Packages per-category and global reports
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    token_decimals: u8,
    window_hours: f64,
}

impl ReportAssembler {
    pub fn new(token_decimals: u8, window_hours: f64) -> Self {
        Self {
            token_decimals,
            window_hours,
        }
    }

    /// Assemble with the current time as the report timestamp
    pub fn assemble(
        &self,
        per_category: &HashMap<Category, ConcentrationReport>,
        global: &ConcentrationReport,
    ) -> CombinedReport {
        self.assemble_at(per_category, global, Utc::now())
    }

    /// Assemble with an explicit timestamp.
    ///
    /// Categories missing from `per_category`, or present without any
    /// transfers, get a zeroed `monitoring` section. `unknown` is never
    /// reported as a category; those transfers only count towards `global`.
    pub fn assemble_at(
        &self,
        per_category: &HashMap<Category, ConcentrationReport>,
        global: &ConcentrationReport,
        timestamp: DateTime<Utc>,
    ) -> CombinedReport {
        let mut categories = BTreeMap::new();

        for category in Category::REPORTED {
            let section = match per_category.get(&category) {
                Some(report) if report.total_transfers > 0 => CategorySection {
                    status: CategoryStatus::Active,
                    report: ReportView::from_report(report, self.token_decimals),
                },
                _ => CategorySection {
                    status: CategoryStatus::Monitoring,
                    report: ReportView::placeholder(self.token_decimals),
                },
            };
            categories.insert(category, section);
        }

        if let Some(unknown) = per_category.get(&Category::Unknown) {
            debug!(
                transfers = unknown.total_transfers,
                "Uncategorized transfers only appear in the global view"
            );
        }

        CombinedReport {
            timestamp,
            window_hours: self.window_hours,
            global: ReportView::from_report(global, self.token_decimals),
            categories,
        }
    }

    /// External form of a cast activity analysis
    pub fn assemble_activity(&self, report: &ActivityReport, timestamp: DateTime<Utc>) -> ActivityView {
        ActivityView {
            timestamp,
            window_hours: self.window_hours,
            total_casts: report.total_casts,
            unique_authors: report.unique_authors,
            average_casts_per_author: round_to(report.average_casts_per_author(), 2),
            top10_share_pct: report.top10_share * 100.0,
            manipulation_score: report.manipulation_score,
            top_authors: report.top_authors.iter().map(AuthorView::from).collect(),
        }
    }
}
