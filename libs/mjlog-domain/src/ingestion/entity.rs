//! Domain entities for the crawl pipeline
//!
//! `Outcome` is the terminal classification of one item, `RunReport` the tally of a
//! whole run, and `GameSummary` what the summarizer extracts from a log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingestion::{error::ItemError, ids::ItemId, ids::RunId};

/// Terminal state of one item within a run
///
/// Every discovered item produces exactly one Outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The item was already persisted; nothing was fetched or announced
    Skipped(ItemId),
    /// The item was fetched, persisted, summarized and announced
    Ingested(ItemId),
    /// Processing stopped at the first error
    Failed(ItemId, ItemError),
}

impl Outcome {
    /// The item this outcome is about
    pub fn item_id(&self) -> &ItemId {
        match self {
            Outcome::Skipped(id) | Outcome::Ingested(id) | Outcome::Failed(id, _) => id,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(..))
    }
}

/// Summary of a finished pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    /// Number of distinct candidates returned by discovery
    pub discovered: usize,
    pub skipped: usize,
    pub ingested: usize,
    pub failed: Vec<ItemId>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub(crate) fn start(run_id: RunId) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            discovered: 0,
            skipped: 0,
            ingested: 0,
            failed: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// Account for one outcome
    pub(crate) fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Ingested(_) => self.ingested += 1,
            Outcome::Failed(id, _) => self.failed.push(id.clone()),
        }
    }

    /// Number of items that reached a terminal state
    pub fn processed(&self) -> usize {
        self.skipped + self.ingested + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Final result of one player in a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub name: String,
    /// Final score in points (e.g. 25000)
    pub score: i32,
    /// Uma/oka adjusted result (e.g. +45.0)
    pub points: f64,
}

/// Structured summary extracted from a game log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Display name of the game type (e.g. "四鳳南喰赤")
    pub title: String,
    /// Players ordered by final rank
    pub standings: Vec<Standing>,
}

impl GameSummary {
    /// Render the notification text for an ingested log
    ///
    /// ```rust
    /// use mjlog_domain::ingestion::{GameSummary, ItemId, Standing};
    ///
    /// let summary = GameSummary {
    ///     title: "四鳳南喰赤".to_string(),
    ///     standings: vec![Standing { name: "A".to_string(), score: 45000, points: 65.0 }],
    /// };
    /// let text = summary.to_message("http://tenhou.net/0/?log=", &ItemId::from("abc"));
    /// assert_eq!(text, "http://tenhou.net/0/?log=abc\n四鳳南喰赤\nA 45000 (65.0)\n");
    /// ```
    pub fn to_message(&self, replay_url_prefix: &str, id: &ItemId) -> String {
        let mut msg = format!("{}{}\n{}\n", replay_url_prefix, id, self.title);
        for standing in &self.standings {
            msg.push_str(&format!(
                "{} {} ({:.1})\n",
                standing.name, standing.score, standing.points
            ));
        }
        msg
    }
}
