//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::classifier::ContractClassifier;

/// Shipped configuration, the base layer under every loaded file
pub const DEFAULT_CONFIG: &str = include_str!("../config.example.toml");

// Re-export component configs
pub use crate::analysis::{AnalysisConfig, ScoringConfig};
pub use crate::classifier::{CategoryConfig, ClassifierConfig};
pub use crate::ingest::IngestConfig;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Ordered category table; a file that lists categories replaces the
    /// shipped table as a whole
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    /// The shipped configuration without file or environment overrides
    pub fn defaults() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .context("Failed to parse shipped configuration")?;

        settings
            .try_deserialize()
            .context("Failed to deserialize shipped configuration")
    }

    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix REWARD_MONITOR__)
            .add_source(
                config::Environment::with_prefix("REWARD_MONITOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.analysis.window_hours.is_finite() || self.analysis.window_hours < 0.0 {
            anyhow::bail!(
                "window_hours must be a non-negative number, got {}",
                self.analysis.window_hours
            );
        }

        if self.analysis.top_recipients == 0 {
            anyhow::bail!("top_recipients must be at least 1");
        }

        if self.ingest.source_timeout_ms == 0 {
            anyhow::bail!("source_timeout_ms must be positive");
        }

        self.scoring.validate().context("Invalid scoring bands")?;

        // Compiles every pattern and checks the category table. Built quietly:
        // the classifier built for a run logs its own warnings.
        let classifier = tracing::subscriber::with_default(
            tracing::subscriber::NoSubscriber::default(),
            || ContractClassifier::new(&self.classifier, &self.categories),
        )
        .context("Invalid category configuration")?;

        if !classifier.ambiguous_addresses().is_empty() {
            tracing::debug!(
                count = classifier.ambiguous_addresses().len(),
                "Known addresses shared between categories resolve by priority"
            );
        }

        Ok(())
    }

    /// Human-readable summary of the effective configuration
    pub fn display_summary(&self) -> String {
        let mut out = format!(
            r#"Configuration:
  Analysis:
    window: {}h
    top_recipients: {}
    token_decimals: {}
    history_days: {}
  Scoring:
    gini_bands: {}
    top1_share_bands: {}
    largest_recipient_bands: {}
    warning_score: {}
    critical_score: {} (max {})
    gini alerts: >{} high, >{} extreme
    top_share_alert: {}
    activity_bands: {}
  Classifier:
    min_transaction_count: {}
    reward_events: {}
  Ingest:
    source_timeout: {}ms
    inputs: {}
  Categories:
"#,
            self.analysis.window_hours,
            self.analysis.top_recipients,
            self.analysis.token_decimals,
            self.analysis.history_days,
            format_bands(&self.scoring.gini_bands),
            format_bands(&self.scoring.top1_share_bands),
            format_bands(&self.scoring.largest_recipient_bands),
            self.scoring.warning_score,
            self.scoring.critical_score,
            self.scoring.max_score(),
            self.scoring.gini_warning,
            self.scoring.gini_alert,
            self.scoring.top_share_alert,
            format_bands(&self.scoring.activity_bands),
            self.classifier.min_transaction_count,
            self.classifier.reward_event_signatures.join(", "),
            self.ingest.source_timeout_ms,
            if self.ingest.inputs.is_empty() {
                "(none)".to_string()
            } else {
                self.ingest
                    .inputs
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            },
        );

        let mut categories: Vec<&CategoryConfig> = self.categories.iter().collect();
        categories.sort_by_key(|c| (c.priority, c.category));
        for entry in categories {
            out.push_str(&format!(
                "    {} (priority {}): {} known addresses, patterns [{}]\n",
                entry.category,
                entry.priority,
                entry.known_addresses.len(),
                entry.patterns.join(", "),
            ));
        }

        out
    }
}

/// Render bands as `>threshold:+points` pairs
fn format_bands(bands: &[crate::analysis::ScoreBand]) -> String {
    if bands.is_empty() {
        return "(none)".to_string();
    }
    bands
        .iter()
        .map(|b| format!(">{}:+{}", b.threshold, b.points))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Category;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::defaults().unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.analysis.window_hours, 24.0);
        assert_eq!(config.scoring.critical_score, 5);
        assert_eq!(config.categories.len(), 3);
        assert_eq!(config.ingest.source_timeout_ms, 5000);
    }

    #[test]
    fn test_shipped_config_matches_component_defaults() {
        let config = Config::defaults().unwrap();
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.scoring, ScoringConfig::default());
        assert_eq!(config.classifier, ClassifierConfig::default());
        assert_eq!(config.ingest, IngestConfig::default());
    }

    #[test]
    fn test_shipped_category_table() {
        let config = Config::defaults().unwrap();
        let order: Vec<Category> = config.categories.iter().map(|c| c.category).collect();
        assert_eq!(order, vec![Category::Farcaster, Category::BaseApp, Category::BaseBuilder]);
        assert!(config.categories[0]
            .known_addresses
            .iter()
            .any(|a| a == "0x4c79b8c9cB0BD62B047880603a9B0c734f1FF0FcF"));
    }

    #[test]
    fn test_ambiguous_addresses_warned_once_per_run() {
        use crate::pipeline::AnalysisPipeline;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tracing_subscriber::layer::{Context, SubscriberExt};

        struct WarnCounter(Arc<AtomicUsize>);

        impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
            fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
                if *event.metadata().level() == tracing::Level::WARN {
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let mut config = Config::defaults().unwrap();
        let shared = config.categories[1].known_addresses[0].clone();
        config.categories[2].known_addresses.push(shared);

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        tracing::subscriber::with_default(subscriber, || {
            config.validate().unwrap();
            AnalysisPipeline::from_config(&config, None).unwrap();
        });

        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.analysis.top_recipients, 100);
        assert_eq!(config.categories[0].category, Category::Farcaster);
    }

    #[test]
    fn test_load_from_file() {
        let file = write_toml(
            r#"
[analysis]
window_hours = 6.5
token_decimals = 6

[scoring]
critical_score = 6

[[scoring.largest_recipient_bands]]
threshold = 0.2
points = 2

[[categories]]
category = "baseApp"
priority = 0
known_addresses = ["0x1986CC18D8EC757447254310D2604F85741AA732"]
patterns = ["mini.*app"]

[[categories]]
category = "farcaster"
priority = 1
patterns = ["warpcast"]
"#,
        );

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.analysis.window_hours, 6.5);
        assert_eq!(config.analysis.token_decimals, 6);
        assert_eq!(config.analysis.top_recipients, 100);
        assert_eq!(config.scoring.critical_score, 6);
        assert_eq!(config.scoring.largest_recipient_bands.len(), 1);
        assert_eq!(config.scoring.gini_bands.len(), 3);
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[0].category, Category::BaseApp);
    }

    #[test]
    fn test_rejects_bad_regex() {
        let file = write_toml(
            r#"
[[categories]]
category = "farcaster"
patterns = ["(unclosed"]
"#,
        );
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_rejects_unordered_bands() {
        let file = write_toml(
            r#"
[scoring]
gini_bands = [{ threshold = 0.5, points = 1 }, { threshold = 0.9, points = 2 }]
"#,
        );
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_rejects_negative_window() {
        let mut config = Config::defaults().unwrap();
        config.analysis.window_hours = -2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_category() {
        let mut config = Config::defaults().unwrap();
        config.categories.push(config.categories[0].clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_display_summary() {
        let summary = Config::defaults().unwrap().display_summary();
        assert!(summary.contains("window: 24h"));
        assert!(summary.contains("farcaster (priority 0): 5 known addresses"));
        assert!(summary.contains(">0.95:+3"));
        assert!(summary.contains("gini alerts: >0.6 high, >0.8 extreme"));
    }
}
