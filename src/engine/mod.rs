//! Core engine: the fetch → normalize → evaluate → filter → record cycle.

pub mod normalizer;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::data::{build_feed, fetch_or_empty, OddsFeed};
use crate::session::Session;
use crate::storage::history::{ev_trend, hit_rate, HitRate, TrendPoint};
use crate::storage::{CsvLedger, HistoryAccumulator};
use crate::strategy::evaluate_all;
use crate::strategy::filter::{top_n, BetFilter};
use crate::types::EvaluatedBet;
use normalizer::{all_teams, normalize};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub run_id: Uuid,
    pub date: String,
    pub generated_at: DateTime<Utc>,
    pub feed: String,
    pub games: usize,
    /// Every evaluated bet, in discovery order.
    pub bets: Vec<EvaluatedBet>,
    /// Bets passing the configured filter, in discovery order.
    pub selected: Vec<EvaluatedBet>,
    /// Best of `selected` by EV%.
    pub top: Vec<EvaluatedBet>,
    pub teams: Vec<String>,
    /// Rows appended to the ledger this run.
    pub recorded: usize,
    /// Ledger size after this run.
    pub history_len: usize,
    pub trend: Vec<TrendPoint>,
    pub hit_rate: Option<HitRate>,
}

impl EvaluationReport {
    /// Report for a run that has not happened yet.
    pub fn empty(date: &str) -> Self {
        Self {
            run_id: Uuid::nil(),
            date: date.to_string(),
            generated_at: Utc::now(),
            feed: String::new(),
            games: 0,
            bets: Vec::new(),
            selected: Vec::new(),
            top: Vec::new(),
            teams: Vec::new(),
            recorded: 0,
            history_len: 0,
            trend: Vec::new(),
            hit_rate: None,
        }
    }
}

/// Today's local date as `YYYY-MM-DD`.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    feed: Box<dyn OddsFeed>,
    history: HistoryAccumulator,
    filter: BetFilter,
    top_n: usize,
    record_filtered_only: bool,
}

impl Pipeline {
    pub fn new(feed: Box<dyn OddsFeed>, history: HistoryAccumulator, filter: BetFilter, top_n: usize) -> Self {
        Self {
            feed,
            history,
            filter,
            top_n,
            record_filtered_only: true,
        }
    }

    /// Whether to append only the filtered bets (default) or every bet.
    pub fn with_record_filtered_only(mut self, filtered_only: bool) -> Self {
        self.record_filtered_only = filtered_only;
        self
    }

    /// Wire up feed, CSV ledger and filter from config.
    pub fn from_config(cfg: &AppConfig, session: &Session) -> Result<Self> {
        let feed = build_feed(&cfg.feed, session)?;
        let history = HistoryAccumulator::new(Box::new(CsvLedger::new(&cfg.ledger.path)));
        Ok(Self::new(feed, history, cfg.filters.to_filter(), cfg.filters.top_n)
            .with_record_filtered_only(cfg.ledger.record_filtered_only))
    }

    pub fn filter(&self) -> &BetFilter {
        &self.filter
    }

    pub fn history(&self) -> &HistoryAccumulator {
        &self.history
    }

    /// Run one cycle for `date`. Feed and ledger failures degrade to empty
    /// data, so this always produces a report.
    pub async fn run(&self, date: &str) -> EvaluationReport {
        let run_id = Uuid::new_v4();
        info!(%run_id, date, feed = self.feed.name(), "Starting evaluation run");

        let games = fetch_or_empty(&*self.feed).await;
        let teams = all_teams(&games);
        let bets = evaluate_all(normalize(&games), date);

        let selected = self.filter.apply(&bets);
        let top = top_n(&selected, self.top_n);

        let to_record = if self.record_filtered_only { &selected } else { &bets };
        let recorded = self.history.record(to_record);

        let history = self.history.load();
        let trend = ev_trend(&history);
        let hit_rate = hit_rate(&history);

        info!(
            %run_id,
            games = games.len(),
            bets = bets.len(),
            selected = selected.len(),
            recorded,
            history = history.len(),
            hit_rate = hit_rate.map(|h| h.pct()),
            "Evaluation run complete"
        );

        EvaluationReport {
            run_id,
            date: date.to_string(),
            generated_at: Utc::now(),
            feed: self.feed.name().to_string(),
            games: games.len(),
            bets,
            selected,
            top,
            teams,
            recorded,
            history_len: history.len(),
            trend,
            hit_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
