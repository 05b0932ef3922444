//! Reward Monitor Library
//!
//! Concentration and manipulation-risk analysis of reward token
//! distributions on Base.

pub mod address;
pub mod analysis;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod report;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::AnalysisPipeline;
pub use report::CombinedReport;
