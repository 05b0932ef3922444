//! Transfer record ingestion
//!
//! Sources hand already-decoded transfer records to the pipeline; casts and
//! contract metadata are read from files alongside. Several
//! sources can be chained; each attempt is bounded by a timeout and the
//! first one to succeed wins.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analysis::{CastRecord, TransferRecord};
use crate::classifier::ContractMetadata;
use crate::error::{Error, Result};

/// Ingestion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Upper bound for a single source attempt
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,

    /// Transfer files tried in order when none are given on the command line
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
}

fn default_source_timeout_ms() -> u64 {
    5000
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_timeout_ms: default_source_timeout_ms(),
            inputs: Vec::new(),
        }
    }
}

/// Something that can produce a batch of transfer records
#[async_trait]
pub trait TransferSource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &str;

    /// Fetch every available record
    async fn fetch(&self) -> Result<Vec<TransferRecord>>;
}

/// Reads transfer records from a JSON array or JSON-lines file
pub struct JsonFileSource {
    path: PathBuf,
    name: String,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("file:{}", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decode records, skipping entries that do not match the record shape.
///
/// A file starting with `[` must be a valid JSON array; otherwise each
/// non-empty line is decoded on its own.
pub fn parse_records<T: DeserializeOwned>(contents: &str) -> Result<(Vec<T>, usize)> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    if contents.trim_start().starts_with('[') {
        let values: Vec<serde_json::Value> = serde_json::from_str(contents)?;
        for (index, value) in values.into_iter().enumerate() {
            match serde_json::from_value::<T>(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!(index, error = %e, "Skipping undecodable entry");
                    skipped += 1;
                }
            }
        }
    } else {
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!(line = line_no + 1, error = %e, "Skipping undecodable line");
                    skipped += 1;
                }
            }
        }
    }

    Ok((records, skipped))
}

pub fn parse_transfers(contents: &str) -> Result<(Vec<TransferRecord>, usize)> {
    parse_records(contents)
}

#[async_trait]
impl TransferSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<TransferRecord>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let (records, skipped) = parse_transfers(&contents)?;

        if skipped > 0 {
            warn!(
                source = %self.name,
                skipped,
                loaded = records.len(),
                "Skipped undecodable transfer records"
            );
        }

        Ok(records)
    }
}

/// Tries sources in order until one succeeds
pub struct FallbackSource {
    sources: Vec<Box<dyn TransferSource>>,
    timeout: Duration,
}

impl FallbackSource {
    pub fn new(sources: Vec<Box<dyn TransferSource>>, timeout: Duration) -> Self {
        Self { sources, timeout }
    }

    pub fn from_config(config: &IngestConfig, sources: Vec<Box<dyn TransferSource>>) -> Self {
        Self::new(sources, Duration::from_millis(config.source_timeout_ms))
    }

    /// Chain of JSON file sources, tried in the given order
    pub fn from_paths<P: AsRef<Path>>(paths: &[P], timeout: Duration) -> Self {
        let sources = paths
            .iter()
            .map(|p| Box::new(JsonFileSource::new(p.as_ref())) as Box<dyn TransferSource>)
            .collect();
        Self::new(sources, timeout)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl TransferSource for FallbackSource {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn fetch(&self) -> Result<Vec<TransferRecord>> {
        let mut failures = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let error = match tokio::time::timeout(self.timeout, source.fetch()).await {
                Ok(Ok(records)) => {
                    info!(source = source.name(), records = records.len(), "Loaded transfers");
                    return Ok(records);
                }
                Ok(Err(e)) => e,
                Err(_) => Error::SourceTimeout {
                    source_name: source.name().to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                },
            };

            warn!(source = source.name(), error = %error, "Transfer source failed");
            if !error.is_retryable() {
                return Err(error);
            }
            failures.push(format!("{}: {}", source.name(), error));
        }

        if failures.is_empty() {
            return Err(Error::SourceExhausted("no sources configured".into()));
        }
        Err(Error::SourceExhausted(failures.join("; ")))
    }
}

/// Read contract metadata (a JSON array) for classification
pub async fn load_contracts(path: impl AsRef<Path>) -> Result<Vec<ContractMetadata>> {
    let contents = tokio::fs::read_to_string(path.as_ref()).await?;
    Ok(serde_json::from_str(&contents)?)
}

/// Read casts from a JSON array or JSON-lines file, skipping bad entries
pub async fn load_casts(path: impl AsRef<Path>) -> Result<Vec<CastRecord>> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;
    let (casts, skipped) = parse_records::<CastRecord>(&contents)?;

    if skipped > 0 {
        warn!(path = %path.display(), skipped, loaded = casts.len(), "Skipped undecodable casts");
    }

    Ok(casts)
}
