//! Manipulation risk scoring
//!
//! Three independent rules (Gini, top-1% share, largest single recipient)
//! each award the points of their highest band that the metric exceeds.
//! The bands are heuristic policy and are configurable; the defaults give a
//! score range of 0-8.
//!
//! Independently of the score, two alert flags are raised: an inequality
//! level from the Gini coefficient and a top-10% share alert. Author
//! activity on Farcaster has its own, smaller band list.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Award `points` when the metric is strictly above `threshold`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub threshold: f64,
    pub points: u8,
}

impl ScoreBand {
    const fn new(threshold: f64, points: u8) -> Self {
        Self { threshold, points }
    }
}

/// Scoring policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Bands on the Gini coefficient, highest threshold first
    #[serde(default = "default_gini_bands")]
    pub gini_bands: Vec<ScoreBand>,

    /// Bands on the top-1% share ratio (0-1)
    #[serde(default = "default_top1_share_bands")]
    pub top1_share_bands: Vec<ScoreBand>,

    /// Bands on the largest single recipient share ratio (0-1)
    #[serde(default = "default_largest_recipient_bands")]
    pub largest_recipient_bands: Vec<ScoreBand>,

    /// Score at or above which risk is `warning`
    #[serde(default = "default_warning_score")]
    pub warning_score: u8,

    /// Score at or above which risk is `critical`
    #[serde(default = "default_critical_score")]
    pub critical_score: u8,

    /// Gini above which inequality is `extreme`
    #[serde(default = "default_gini_alert")]
    pub gini_alert: f64,

    /// Gini above which inequality is `high`
    #[serde(default = "default_gini_warning")]
    pub gini_warning: f64,

    /// Top-10% share ratio at or above which the share alert fires
    #[serde(default = "default_top_share_alert")]
    pub top_share_alert: f64,

    /// Bands on the top-10% author share of cast activity
    #[serde(default = "default_activity_bands")]
    pub activity_bands: Vec<ScoreBand>,
}

fn default_gini_bands() -> Vec<ScoreBand> {
    vec![ScoreBand::new(0.95, 3), ScoreBand::new(0.85, 2), ScoreBand::new(0.75, 1)]
}

fn default_top1_share_bands() -> Vec<ScoreBand> {
    vec![ScoreBand::new(0.50, 3), ScoreBand::new(0.30, 2), ScoreBand::new(0.20, 1)]
}

fn default_largest_recipient_bands() -> Vec<ScoreBand> {
    vec![ScoreBand::new(0.10, 2), ScoreBand::new(0.05, 1)]
}

fn default_warning_score() -> u8 { 3 }
fn default_critical_score() -> u8 { 5 }
fn default_gini_alert() -> f64 { 0.8 }
fn default_gini_warning() -> f64 { 0.6 }
fn default_top_share_alert() -> f64 { 0.5 }

fn default_activity_bands() -> Vec<ScoreBand> {
    vec![ScoreBand::new(0.50, 2), ScoreBand::new(0.30, 1)]
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            gini_bands: default_gini_bands(),
            top1_share_bands: default_top1_share_bands(),
            largest_recipient_bands: default_largest_recipient_bands(),
            warning_score: default_warning_score(),
            critical_score: default_critical_score(),
            gini_alert: default_gini_alert(),
            gini_warning: default_gini_warning(),
            top_share_alert: default_top_share_alert(),
            activity_bands: default_activity_bands(),
        }
    }
}

fn validate_bands(name: &str, bands: &[ScoreBand]) -> Result<()> {
    for band in bands {
        if !band.threshold.is_finite() || band.threshold < 0.0 {
            return Err(Error::Config(format!(
                "{}: threshold {} must be a finite non-negative number",
                name, band.threshold
            )));
        }
    }
    for pair in bands.windows(2) {
        // Higher metric must never earn fewer points
        if pair[1].threshold >= pair[0].threshold || pair[1].points > pair[0].points {
            return Err(Error::Config(format!(
                "{}: bands must have strictly descending thresholds and non-increasing points",
                name
            )));
        }
    }
    Ok(())
}

/// Points of the highest band `value` exceeds
fn band_points(bands: &[ScoreBand], value: f64) -> Option<&ScoreBand> {
    bands.iter().find(|band| value > band.threshold)
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        validate_bands("gini_bands", &self.gini_bands)?;
        validate_bands("top1_share_bands", &self.top1_share_bands)?;
        validate_bands("largest_recipient_bands", &self.largest_recipient_bands)?;
        validate_bands("activity_bands", &self.activity_bands)?;
        for (name, value) in [
            ("gini_alert", self.gini_alert),
            ("gini_warning", self.gini_warning),
            ("top_share_alert", self.top_share_alert),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!("{} {} must be within [0, 1]", name, value)));
            }
        }
        if self.gini_warning > self.gini_alert {
            return Err(Error::Config(format!(
                "gini_warning {} is above gini_alert {}",
                self.gini_warning, self.gini_alert
            )));
        }
        if self.critical_score < self.warning_score {
            return Err(Error::Config(format!(
                "critical_score {} is below warning_score {}",
                self.critical_score, self.warning_score
            )));
        }
        Ok(())
    }

    /// Highest attainable score under this policy
    pub fn max_score(&self) -> u8 {
        [&self.gini_bands, &self.top1_share_bands, &self.largest_recipient_bands]
            .iter()
            .map(|bands| bands.first().map_or(0, |b| b.points))
            .fold(0u8, |acc, p| acc.saturating_add(p))
    }

    pub fn risk_level(&self, score: u8) -> RiskLevel {
        if score >= self.critical_score {
            RiskLevel::Critical
        } else if score >= self.warning_score {
            RiskLevel::Warning
        } else {
            RiskLevel::Normal
        }
    }

    /// Score a distribution from its share ratios (all in `[0, 1]`)
    pub fn assess(&self, gini: f64, top1_share: f64, largest_share: f64) -> ManipulationAssessment {
        let mut score = 0u8;
        let mut reasons = Vec::new();

        if let Some(band) = band_points(&self.gini_bands, gini) {
            score = score.saturating_add(band.points);
            reasons.push(format!("Gini coefficient {:.4} above {}", gini, band.threshold));
        }

        if let Some(band) = band_points(&self.top1_share_bands, top1_share) {
            score = score.saturating_add(band.points);
            reasons.push(format!(
                "Top 1% controls >{}% of rewards",
                band.threshold * 100.0
            ));
        }

        if let Some(band) = band_points(&self.largest_recipient_bands, largest_share) {
            score = score.saturating_add(band.points);
            reasons.push(format!(
                "Single recipient controls >{}% of rewards",
                band.threshold * 100.0
            ));
        }

        ManipulationAssessment {
            score,
            risk_level: self.risk_level(score),
            reasons,
        }
    }

    /// Alert flags from the Gini coefficient and the top-10% share ratio
    pub fn alerts(&self, gini: f64, top10_share: f64) -> ConcentrationAlerts {
        let inequality = if gini > self.gini_alert {
            InequalityLevel::Extreme
        } else if gini > self.gini_warning {
            InequalityLevel::High
        } else {
            InequalityLevel::Fair
        };

        ConcentrationAlerts {
            inequality,
            top_share_alert: top10_share >= self.top_share_alert,
        }
    }

    /// Score of cast activity concentration from the top-10% author share
    pub fn activity_score(&self, top10_share: f64) -> u8 {
        band_points(&self.activity_bands, top10_share).map_or(0, |b| b.points)
    }
}

/// Inequality level from the Gini coefficient alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InequalityLevel {
    #[default]
    Fair,
    High,
    Extreme,
}

impl fmt::Display for InequalityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InequalityLevel::Fair => write!(f, "fair"),
            InequalityLevel::High => write!(f, "high"),
            InequalityLevel::Extreme => write!(f, "extreme"),
        }
    }
}

/// Alerts raised alongside the manipulation score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcentrationAlerts {
    pub inequality: InequalityLevel,
    /// Top 10% of recipients hold at least the configured share
    pub top_share_alert: bool,
}

impl ConcentrationAlerts {
    pub fn any(&self) -> bool {
        self.top_share_alert || self.inequality != InequalityLevel::Fair
    }
}

/// Risk bucket derived from the manipulation score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Normal => write!(f, "normal"),
            RiskLevel::Warning => write!(f, "warning"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Score, risk level and the rules that fired
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManipulationAssessment {
    pub score: u8,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
}
