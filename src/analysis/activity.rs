//! Concentration of Farcaster cast activity among authors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::analysis::aggregator::window_start;
use crate::analysis::scoring::ScoringConfig;
use crate::error::Result;

/// Rows in the most-active author table
pub const TOP_AUTHORS: usize = 10;

/// Author label used when a cast carries none
const UNKNOWN_AUTHOR: &str = "unknown";

/// One already-collected cast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastRecord {
    #[serde(default)]
    pub author: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorActivity {
    pub rank: usize,
    pub author: String,
    pub casts: usize,
    /// Share of all casts, 0-1
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityReport {
    pub total_casts: usize,
    pub unique_authors: usize,
    pub top10_share: f64,
    pub manipulation_score: u8,
    pub top_authors: Vec<AuthorActivity>,
}

impl ActivityReport {
    pub fn average_casts_per_author(&self) -> f64 {
        if self.unique_authors == 0 {
            0.0
        } else {
            self.total_casts as f64 / self.unique_authors as f64
        }
    }
}

/// Count casts per author within the window and score how concentrated
/// the activity is
pub fn analyze_activity<'a, I>(
    casts: I,
    window_hours: f64,
    now: DateTime<Utc>,
    scoring: &ScoringConfig,
) -> Result<ActivityReport>
where
    I: IntoIterator<Item = &'a CastRecord>,
{
    let start = window_start(window_hours, now)?;

    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut total_casts = 0usize;

    for cast in casts {
        if cast.timestamp < start {
            continue;
        }
        let author = cast
            .author
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR);

        match index.get(author) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(author.to_string(), order.len());
                order.push((author.to_string(), 1));
            }
        }
        total_casts += 1;
    }

    if total_casts == 0 {
        debug!("No casts in window");
        return Ok(ActivityReport {
            total_casts: 0,
            unique_authors: 0,
            top10_share: 0.0,
            manipulation_score: 0,
            top_authors: Vec::new(),
        });
    }

    // Stable: ties keep first-seen order
    order.sort_by(|a, b| b.1.cmp(&a.1));

    let top_count = ((order.len() as f64 * 0.1).floor() as usize).max(1);
    let top_sum: usize = order.iter().take(top_count).map(|(_, c)| c).sum();
    let top10_share = top_sum as f64 / total_casts as f64;

    let top_authors = order
        .iter()
        .take(TOP_AUTHORS)
        .enumerate()
        .map(|(i, (author, casts))| AuthorActivity {
            rank: i + 1,
            author: author.clone(),
            casts: *casts,
            share: *casts as f64 / total_casts as f64,
        })
        .collect();

    Ok(ActivityReport {
        total_casts,
        unique_authors: order.len(),
        top10_share,
        manipulation_score: scoring.activity_score(top10_share),
        top_authors,
    })
}
