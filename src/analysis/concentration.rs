//! Concentration metrics over aggregated recipient totals

use alloy_primitives::U512;
use tracing::{debug, warn};

use crate::analysis::amount::{self, ratio};
use crate::analysis::scoring::ScoringConfig;
use crate::analysis::types::{AggregateTotals, ConcentrationReport, RankedRecipient};
use crate::analysis::AnalysisConfig;
use crate::error::Result;

/// Population Gini coefficient of non-negative values.
///
/// Uses `Σ (2(i+1) - n - 1) a[i] / (n² · mean)` over the ascending sort.
/// The weights are antisymmetric around the middle, so the sum is taken as
/// `Σ w[n-1-i] (a[n-1-i] - a[i])` for the lower half; equal values then give
/// exactly zero.
pub fn gini(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let sum: f64 = sorted.iter().sum();
    let mean = sum / n as f64;
    if mean <= 0.0 {
        return 0.0;
    }

    let mut weighted = 0.0;
    for i in 0..n / 2 {
        let j = n - 1 - i;
        let weight = (2 * (j + 1)) as f64 - n as f64 - 1.0;
        weighted += weight * (sorted[j] - sorted[i]);
    }

    (weighted / ((n * n) as f64 * mean)).clamp(0.0, 1.0)
}

/// Number of top recipients covering `fraction` of the population, at least one
fn top_count(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction).floor() as usize).clamp(1, n.max(1))
}

/// Turns aggregated totals into a [`ConcentrationReport`]
#[derive(Debug, Clone)]
pub struct ConcentrationAnalyzer {
    scoring: ScoringConfig,
    top_recipients: usize,
}

impl ConcentrationAnalyzer {
    pub fn new(config: &AnalysisConfig, scoring: ScoringConfig) -> Result<Self> {
        scoring.validate()?;
        Ok(Self {
            scoring,
            top_recipients: config.top_recipients,
        })
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn analyze(&self, totals: &AggregateTotals) -> ConcentrationReport {
        let n = totals.unique_recipients();
        if n == 0 || totals.total_volume.is_zero() {
            debug!(
                recipients = n,
                records = totals.records_consumed,
                "No volume in window, returning empty report"
            );
            return ConcentrationReport::empty(totals.records_consumed, n, totals.skipped);
        }

        let total = &totals.total_volume;
        let values: Vec<f64> = totals.recipients().iter().map(|(_, a)| amount::to_f64(a)).collect();
        let gini = gini(&values);

        // Stable sort keeps first-seen order among equal amounts
        let mut ranked: Vec<_> = totals.recipients().iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let share_of_top = |fraction: f64| -> f64 {
            let sum = ranked
                .iter()
                .take(top_count(n, fraction))
                .fold(U512::ZERO, |acc, (_, a)| acc.saturating_add(*a));
            ratio(&sum, total)
        };

        let top1_share = share_of_top(0.01);
        let top5_share = share_of_top(0.05);
        let top10_share = share_of_top(0.10);
        let largest_recipient_share = ratio(&ranked[0].1, total);

        let manipulation = self.scoring.assess(gini, top1_share, largest_recipient_share);
        let alerts = self.scoring.alerts(gini, top10_share);
        if alerts.any() {
            warn!(
                inequality = %alerts.inequality,
                top_share_alert = alerts.top_share_alert,
                top10_pct = %format!("{:.2}", top10_share * 100.0),
                "High reward concentration detected"
            );
        }

        let ranked_recipients = ranked
            .iter()
            .take(self.top_recipients)
            .enumerate()
            .map(|(i, (address, value))| RankedRecipient {
                rank: i + 1,
                address: address.clone(),
                amount: *value,
                share: ratio(value, total),
            })
            .collect();

        debug!(
            recipients = n,
            gini = %format!("{:.4}", gini),
            top10_pct = %format!("{:.2}", top10_share * 100.0),
            score = manipulation.score,
            "Computed concentration metrics"
        );

        ConcentrationReport {
            gini,
            top1_share,
            top5_share,
            top10_share,
            largest_recipient_share,
            manipulation,
            alerts,
            ranked_recipients,
            total_transfers: totals.records_consumed,
            unique_recipients: n,
            total_volume: *total,
            skipped: totals.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{normalize, Address};
    use crate::analysis::scoring::{InequalityLevel, RiskLevel};

    fn addr(i: usize) -> Address {
        normalize(&format!("0x{:040x}", i + 1)).unwrap()
    }

    fn totals_of(amounts: &[u64]) -> AggregateTotals {
        AggregateTotals::from_entries(
            amounts
                .iter()
                .enumerate()
                .map(|(i, &a)| (addr(i), U512::from(a))),
        )
    }

    fn analyzer() -> ConcentrationAnalyzer {
        ConcentrationAnalyzer::new(&AnalysisConfig::default(), ScoringConfig::default()).unwrap()
    }

    #[test]
    fn test_gini_equal_distribution_is_zero() {
        assert_eq!(gini(&[10.0, 10.0, 10.0, 10.0]), 0.0);
        for n in 1..50 {
            let values = vec![1.5e18; n];
            assert_eq!(gini(&values), 0.0, "n = {}", n);
        }
    }

    #[test]
    fn test_gini_unequal() {
        let g = gini(&[0.0, 0.0, 100.0]);
        assert!((g - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(gini(&[]), 0.0);
        assert_eq!(gini(&[0.0, 0.0]), 0.0);
        assert_eq!(gini(&[7.0]), 0.0);
    }

    #[test]
    fn test_gini_scale_invariant() {
        let base = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let scaled: Vec<f64> = base.iter().map(|v| v * 1e15).collect();
        assert!((gini(&base) - gini(&scaled)).abs() < 1e-12);
    }

    #[test]
    fn test_scenario_equal_amounts() {
        let report = analyzer().analyze(&totals_of(&[10, 10, 10, 10]));
        assert_eq!(report.gini, 0.0);
        assert_eq!(report.top10_share_pct(), 25.0);
        assert_eq!(report.largest_recipient_share_pct(), 25.0);
        // All tie: ranking keeps first-seen order
        let order: Vec<_> = report.ranked_recipients.iter().map(|r| r.address.clone()).collect();
        assert_eq!(order, (0..4).map(addr).collect::<Vec<_>>());
    }

    #[test]
    fn test_scenario_single_winner_with_zero_recipients() {
        let report = analyzer().analyze(&totals_of(&[0, 0, 100]));
        assert!(report.gini > 0.0);
        assert_eq!(report.largest_recipient_share_pct(), 100.0);
        // gini 0.667 hits no band; top-1% (3) + largest (2)
        assert_eq!(report.manipulation_score(), 5);
        assert_eq!(report.manipulation.risk_level, RiskLevel::Critical);
        assert_eq!(report.ranked_recipients[0].rank, 1);
        assert_eq!(report.ranked_recipients[0].address, addr(2));
    }

    #[test]
    fn test_scenario_dominant_recipient_among_thousand() {
        // One recipient holds 2997 of 4995 (60%), 999 others hold 2 each
        let mut amounts = vec![2u64; 999];
        amounts.insert(500, 2997);
        let report = analyzer().analyze(&totals_of(&amounts));

        assert!((report.largest_recipient_share - 0.6).abs() < 1e-12);
        // top 1% of 1000 is ten recipients: 2997 + 9 * 2
        assert!((report.top1_share - 3015.0 / 4995.0).abs() < 1e-12);
        assert!(report.gini < 0.75);
        assert_eq!(report.manipulation_score(), 3 + 2);
        assert_eq!(report.manipulation.reasons.len(), 2);
    }

    #[test]
    fn test_concentration_alerts() {
        let report = analyzer().analyze(&totals_of(&[0, 0, 100]));
        assert_eq!(report.alerts.inequality, InequalityLevel::High);
        assert!(report.alerts.top_share_alert);

        let fair = analyzer().analyze(&totals_of(&[10, 10, 10, 10]));
        assert!(!fair.alerts.any());

        // Ten recipients: top 10% is one recipient holding 46 of 100
        let mut amounts = vec![6u64; 9];
        amounts.push(46);
        let below = analyzer().analyze(&totals_of(&amounts));
        assert!((below.top10_share - 0.46).abs() < 1e-12);
        assert!(!below.alerts.top_share_alert);
    }

    #[test]
    fn test_share_ordering() {
        let cases: [&[u64]; 4] = [
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
            &[100],
            &[5, 5, 5, 1000, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
            &[0, 0, 0, 1],
        ];
        for amounts in cases {
            let r = analyzer().analyze(&totals_of(amounts));
            assert!(r.top1_share <= r.top5_share);
            assert!(r.top5_share <= r.top10_share);
            assert!(r.top10_share <= 1.0);
        }
    }

    #[test]
    fn test_single_recipient() {
        let report = analyzer().analyze(&totals_of(&[123_456]));
        assert_eq!(report.gini, 0.0);
        assert_eq!(report.largest_recipient_share_pct(), 100.0);
        assert_eq!(report.top1_share_pct(), 100.0);
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        // Shares that do not terminate in decimal
        let cases: [&[u64]; 4] = [&[1, 1, 1], &[1, 2, 4], &[1, 1, 2, 4, 8, 4], &[3, 7, 11, 13, 17]];
        for amounts in cases {
            let report = analyzer().analyze(&totals_of(amounts));
            let sum: f64 = report.ranked_recipients.iter().map(|r| r.percentage()).sum();
            assert!((sum - 100.0).abs() < 1e-6, "{:?} sums to {}", amounts, sum);
        }
    }

    #[test]
    fn test_ranked_list_is_truncated() {
        let amounts: Vec<u64> = (1..=150).collect();
        let report = analyzer().analyze(&totals_of(&amounts));
        assert_eq!(report.ranked_recipients.len(), 100);
        assert_eq!(report.unique_recipients, 150);
        assert_eq!(report.ranked_recipients[0].amount, U512::from(150u64));
        assert_eq!(report.ranked_recipients[99].rank, 100);
    }

    #[test]
    fn test_single_recipient_share_is_whole() {
        let report = analyzer().analyze(&totals_of(&[2_500_000_000_000_000_000]));
        assert_eq!(report.ranked_recipients[0].share, 1.0);
        assert_eq!(report.ranked_recipients[0].percentage(), 100.0);
    }

    #[test]
    fn test_empty_and_zero_volume() {
        let empty = analyzer().analyze(&AggregateTotals::from_entries(Vec::new()));
        assert_eq!(empty.gini, 0.0);
        assert_eq!(empty.top10_share, 0.0);
        assert_eq!(empty.manipulation_score(), 0);
        assert!(empty.ranked_recipients.is_empty());

        let zeros = analyzer().analyze(&totals_of(&[0, 0, 0]));
        assert_eq!(zeros.largest_recipient_share, 0.0);
        assert!(zeros.ranked_recipients.is_empty());
        assert!(!zeros.has_volume());
        assert_eq!(zeros.unique_recipients, 3);
    }
}
