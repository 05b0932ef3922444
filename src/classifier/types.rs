//! Types shared by the contract classifier and the analysis pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Reward program a contract belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    /// Farcaster ecosystem rewards
    Farcaster,
    /// Base App (mini-app, trading, social) rewards
    BaseApp,
    /// Builder grants and generic reward distributors
    BaseBuilder,
    /// Not attributed to any reward program
    Unknown,
}

impl Category {
    /// Categories that get their own section in the combined report
    pub const REPORTED: [Category; 3] = [Category::Farcaster, Category::BaseApp, Category::BaseBuilder];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Farcaster => "farcaster",
            Category::BaseApp => "baseApp",
            Category::BaseBuilder => "baseBuilder",
            Category::Unknown => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Category::Unknown)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "farcaster" => Ok(Category::Farcaster),
            "baseapp" => Ok(Category::BaseApp),
            "basebuilder" | "builder" => Ok(Category::BaseBuilder),
            "unknown" => Ok(Category::Unknown),
            other => Err(Error::Config(format!("unknown category: {}", other))),
        }
    }
}

/// On-chain metadata the collector gathers about a contract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMetadata {
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    /// Canonical event signatures seen in recent logs, e.g. `Transfer(address,address,uint256)`
    #[serde(default)]
    pub event_signatures: Vec<String>,
    /// Number of recent logs emitted by the contract
    #[serde(default)]
    pub transaction_count: u64,
}

/// Which rule produced a classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "rule", content = "detail")]
pub enum MatchSource {
    /// Listed in the category's known-address set
    KnownAddress,
    /// Name/symbol/address matched a category pattern
    Pattern(String),
    /// Emits reward-like events with enough activity
    RewardEvents,
    /// Nothing matched
    NoMatch,
}

/// Result of classifying one contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub address: String,
    pub category: Category,
    pub matched_by: MatchSource,
}

impl Classification {
    pub fn unknown(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            category: Category::Unknown,
            matched_by: MatchSource::NoMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!("farcaster".parse::<Category>().unwrap(), Category::Farcaster);
        assert_eq!("base_app".parse::<Category>().unwrap(), Category::BaseApp);
        assert_eq!("baseBuilder".parse::<Category>().unwrap(), Category::BaseBuilder);
        assert!("zora".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde_keys() {
        assert_eq!(serde_json::to_string(&Category::BaseApp).unwrap(), r#""baseApp""#);
        let cat: Category = serde_json::from_str(r#""baseBuilder""#).unwrap();
        assert_eq!(cat, Category::BaseBuilder);
    }
}
