//! Contract classification
//!
//! Assigns a reward-program [`Category`] to a contract. Rules are evaluated
//! in a fixed order and the first match wins:
//!
//! 1. membership in a configured known-address set, by category priority
//! 2. a category keyword pattern matching `"{name} {symbol} {address}"`
//! 3. reward-like event signatures plus enough activity -> builder
//! 4. unknown

pub mod types;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::address::{self, Address};
use crate::error::{Error, Result};

pub use types::{Category, Classification, ContractMetadata, MatchSource};

/// Per-category classification inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub category: Category,
    /// Lower value is evaluated first
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub known_addresses: Vec<String>,
    /// Case-insensitive regex patterns
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Heuristic fallback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Contracts need strictly more logs than this for the reward-event fallback
    #[serde(default = "default_min_transaction_count")]
    pub min_transaction_count: u64,

    /// Event signatures treated as reward distribution
    #[serde(default = "default_reward_event_signatures")]
    pub reward_event_signatures: Vec<String>,
}

fn default_min_transaction_count() -> u64 { 10 }

fn default_reward_event_signatures() -> Vec<String> {
    vec![
        "Transfer(address,address,uint256)".into(),
        "Reward(address,uint256)".into(),
        "Claim(address,uint256)".into(),
        "Mint(address,uint256)".into(),
        "Distribute(address,uint256)".into(),
    ]
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_transaction_count: default_min_transaction_count(),
            reward_event_signatures: default_reward_event_signatures(),
        }
    }
}

/// Compiled rules for one category
#[derive(Debug)]
struct CategoryRule {
    category: Category,
    known: HashSet<Address>,
    patterns: Vec<Regex>,
}

/// Pure contract classifier built once from configuration
#[derive(Debug)]
pub struct ContractClassifier {
    /// Sorted by priority, then category declaration order
    rules: Vec<CategoryRule>,
    reward_signatures: HashSet<String>,
    min_transaction_count: u64,
    /// Addresses listed under more than one category
    ambiguous: HashMap<Address, Vec<Category>>,
}

fn canonical_signature(sig: &str) -> String {
    sig.chars().filter(|c| !c.is_whitespace()).collect()
}

impl ContractClassifier {
    /// Build a classifier, validating the category table.
    ///
    /// Known-address lists are normalized and deduplicated here; patterns
    /// are compiled case-insensitively.
    pub fn new(config: &ClassifierConfig, categories: &[CategoryConfig]) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut ordered: Vec<&CategoryConfig> = Vec::with_capacity(categories.len());
        for entry in categories {
            if entry.category.is_unknown() {
                return Err(Error::Config(
                    "the unknown category cannot carry classification rules".into(),
                ));
            }
            if !seen.insert(entry.category) {
                return Err(Error::Config(format!(
                    "category {} is configured more than once",
                    entry.category
                )));
            }
            ordered.push(entry);
        }
        ordered.sort_by_key(|c| (c.priority, c.category));

        let mut rules = Vec::with_capacity(ordered.len());
        for entry in ordered {
            let patterns = entry
                .patterns
                .iter()
                .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::InvalidRegex(format!("{}: {}", entry.category, e)))?;

            rules.push(CategoryRule {
                category: entry.category,
                known: address::dedup_addresses(&entry.known_addresses).into_iter().collect(),
                patterns,
            });
        }

        let mut membership: HashMap<Address, Vec<Category>> = HashMap::new();
        for rule in &rules {
            for addr in &rule.known {
                membership.entry(addr.clone()).or_default().push(rule.category);
            }
        }
        let ambiguous: HashMap<Address, Vec<Category>> = membership
            .into_iter()
            .filter(|(_, cats)| cats.len() > 1)
            .collect();

        for (addr, cats) in &ambiguous {
            warn!(
                address = %addr,
                categories = ?cats,
                resolved = %cats[0],
                "Address listed in several known-address sets"
            );
        }

        Ok(Self {
            rules,
            reward_signatures: config
                .reward_event_signatures
                .iter()
                .map(|s| canonical_signature(s))
                .collect(),
            min_transaction_count: config.min_transaction_count,
            ambiguous,
        })
    }

    /// Category order used for tie-breaking
    pub fn priority_order(&self) -> Vec<Category> {
        self.rules.iter().map(|r| r.category).collect()
    }

    /// Addresses that appear in more than one known-address set
    pub fn ambiguous_addresses(&self) -> &HashMap<Address, Vec<Category>> {
        &self.ambiguous
    }

    /// Known-address lookup only, in priority order
    pub fn category_of_address(&self, address: &Address) -> Option<Category> {
        let category = self
            .rules
            .iter()
            .find(|rule| rule.known.contains(address))
            .map(|rule| rule.category)?;

        if let Some(cats) = self.ambiguous.get(address) {
            warn!(
                address = %address,
                categories = ?cats,
                resolved = %category,
                "Ambiguous known address resolved by priority"
            );
        }

        Some(category)
    }

    /// Classify a contract.
    ///
    /// Fails only when the contract address itself is malformed; callers
    /// skip such contracts.
    pub fn classify(&self, contract: &ContractMetadata) -> Result<Classification> {
        let address = address::normalize(&contract.address)?;

        if let Some(category) = self.category_of_address(&address) {
            return Ok(Classification {
                address: address.to_string(),
                category,
                matched_by: MatchSource::KnownAddress,
            });
        }

        let text = format!("{} {} {}", contract.name, contract.symbol, address).to_lowercase();
        for rule in &self.rules {
            if let Some(pattern) = rule.patterns.iter().find(|p| p.is_match(&text)) {
                debug!(
                    address = %address,
                    category = %rule.category,
                    pattern = %pattern,
                    "Contract matched category pattern"
                );
                return Ok(Classification {
                    address: address.to_string(),
                    category: rule.category,
                    matched_by: MatchSource::Pattern(pattern.to_string()),
                });
            }
        }

        if self.has_reward_events(contract) && contract.transaction_count > self.min_transaction_count {
            return Ok(Classification {
                address: address.to_string(),
                category: Category::BaseBuilder,
                matched_by: MatchSource::RewardEvents,
            });
        }

        Ok(Classification::unknown(address.to_string()))
    }

    /// Does the contract emit any reward-like event?
    pub fn has_reward_events(&self, contract: &ContractMetadata) -> bool {
        contract
            .event_signatures
            .iter()
            .any(|sig| self.reward_signatures.contains(&canonical_signature(sig)))
    }
}
