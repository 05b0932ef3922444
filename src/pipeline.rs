//! End-to-end analysis run: bucket, aggregate, analyze, assemble

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::address;
use crate::analysis::aggregator::window_start;
use crate::analysis::{
    aggregate, analyze_activity, daily_buckets, CastRecord, ConcentrationAnalyzer,
    ConcentrationReport, TransferRecord,
};
use crate::classifier::{Category, ContractClassifier};
use crate::config::Config;
use crate::error::Result;
use crate::report::{ActivityView, CombinedReport, HistoricalReport, ReportAssembler};

/// Which category a record is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Category(Category),
    /// Contract address could not be parsed; counted in the global view only
    Unattributable,
}

/// Runs one analysis over a batch of transfer records
pub struct AnalysisPipeline {
    classifier: ContractClassifier,
    analyzer: ConcentrationAnalyzer,
    assembler: ReportAssembler,
    window_hours: f64,
    history_days: u32,
}

impl AnalysisPipeline {
    pub fn new(
        classifier: ContractClassifier,
        analyzer: ConcentrationAnalyzer,
        window_hours: f64,
        token_decimals: u8,
    ) -> Result<Self> {
        // Reject bad windows up front rather than on the first run
        window_start(window_hours, Utc::now())?;

        Ok(Self {
            classifier,
            analyzer,
            assembler: ReportAssembler::new(token_decimals, window_hours),
            window_hours,
            history_days: crate::analysis::AnalysisConfig::default().history_days,
        })
    }

    /// Default period for [`AnalysisPipeline::history`]
    pub fn with_history_days(mut self, days: u32) -> Self {
        self.history_days = days;
        self
    }

    /// Build from loaded configuration, optionally overriding the window
    pub fn from_config(config: &Config, window_hours: Option<f64>) -> Result<Self> {
        let classifier = ContractClassifier::new(&config.classifier, &config.categories)?;
        let analyzer = ConcentrationAnalyzer::new(&config.analysis, config.scoring.clone())?;
        Ok(Self::new(
            classifier,
            analyzer,
            window_hours.unwrap_or(config.analysis.window_hours),
            config.analysis.token_decimals,
        )?
        .with_history_days(config.analysis.history_days))
    }

    pub fn window_hours(&self) -> f64 {
        self.window_hours
    }

    pub fn history_days(&self) -> u32 {
        self.history_days
    }

    pub fn classifier(&self) -> &ContractClassifier {
        &self.classifier
    }

    /// Attribute a record: explicit hint first, then the known-address
    /// category of its emitting contract, else `unknown`.
    pub fn bucket(&self, record: &TransferRecord) -> Bucket {
        if let Some(hint) = record.category_hint {
            return Bucket::Category(hint);
        }
        match address::normalize(&record.contract_address) {
            Ok(contract) => Bucket::Category(
                self.classifier
                    .category_of_address(&contract)
                    .unwrap_or(Category::Unknown),
            ),
            Err(_) => Bucket::Unattributable,
        }
    }

    /// Bucket of every unhinted contract, each looked up once
    fn contract_buckets<'a>(&self, records: &'a [TransferRecord]) -> HashMap<&'a str, Bucket> {
        let mut cache = HashMap::new();
        for record in records.iter().filter(|r| r.category_hint.is_none()) {
            cache
                .entry(record.contract_address.as_str())
                .or_insert_with(|| self.bucket(record));
        }
        cache
    }

    fn cached_bucket(record: &TransferRecord, cache: &HashMap<&str, Bucket>) -> Bucket {
        match record.category_hint {
            Some(hint) => Bucket::Category(hint),
            None => cache
                .get(record.contract_address.as_str())
                .copied()
                .unwrap_or(Bucket::Category(Category::Unknown)),
        }
    }

    pub fn run(&self, records: &[TransferRecord], now: DateTime<Utc>) -> Result<CombinedReport> {
        let mut buckets: HashMap<Category, Vec<&TransferRecord>> = HashMap::new();
        let mut unattributable = 0usize;
        let cache = self.contract_buckets(records);

        for record in records {
            match Self::cached_bucket(record, &cache) {
                Bucket::Category(category) => buckets.entry(category).or_default().push(record),
                Bucket::Unattributable => unattributable += 1,
            }
        }

        if unattributable > 0 {
            debug!(
                count = unattributable,
                "Records with malformed contract address kept in global view only"
            );
        }

        let mut per_category: HashMap<Category, ConcentrationReport> = HashMap::new();
        for (category, bucket) in &buckets {
            if category.is_unknown() {
                debug!(transfers = bucket.len(), "Uncategorized transfers");
                continue;
            }
            let totals = aggregate(bucket.iter().copied(), self.window_hours, now)?;
            per_category.insert(*category, self.analyzer.analyze(&totals));
        }

        let global_totals = aggregate(records, self.window_hours, now)?;
        let global = self.analyzer.analyze(&global_totals);

        info!(
            records = records.len(),
            consumed = global.total_transfers,
            recipients = global.unique_recipients,
            score = global.manipulation_score(),
            risk = %global.manipulation.risk_level,
            "Analysis complete"
        );

        Ok(self.assembler.assemble_at(&per_category, &global, now))
    }

    /// Daily totals for the last `days` days (the configured period when
    /// `None`), with Farcaster-attributed transfers broken out
    pub fn history(
        &self,
        records: &[TransferRecord],
        days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<HistoricalReport> {
        let days = days.unwrap_or(self.history_days);
        let cache = self.contract_buckets(records);
        let buckets = daily_buckets(records, days, now, |record| {
            Self::cached_bucket(record, &cache) == Bucket::Category(Category::Farcaster)
        })?;

        info!(days, active_days = buckets.len(), "History complete");
        Ok(self.assembler.assemble_history(&buckets, days, now))
    }

    /// How concentrated cast activity is among authors within the window
    pub fn activity(&self, casts: &[CastRecord], now: DateTime<Utc>) -> Result<ActivityView> {
        let report = analyze_activity(casts, self.window_hours, now, self.analyzer.scoring())?;
        info!(
            casts = report.total_casts,
            authors = report.unique_authors,
            score = report.manipulation_score,
            "Activity analysis complete"
        );
        Ok(self.assembler.assemble_activity(&report, now))
    }
}
