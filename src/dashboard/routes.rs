//! Dashboard API route handlers.
//!
//! JSON everywhere except the CSV export. State is shared via
//! `Arc<DashboardState>`; every view is computed from the latest report.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::engine::{today, EvaluationReport};
use crate::storage::csv::to_csv;
use crate::storage::history::{ev_distribution, HistogramBin, TrendPoint};
use crate::strategy::filter::{top_n, BetFilter};
use crate::types::EvaluatedBet;

const DEFAULT_BINS: usize = 20;
const MAX_BINS: usize = 100;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub report: RwLock<EvaluationReport>,
    /// Filter applied when a request does not override it.
    pub default_filter: BetFilter,
    pub default_top_n: usize,
    /// Sport key, used in export file names.
    pub sport: String,
}

impl DashboardState {
    pub fn new(default_filter: BetFilter, default_top_n: usize, sport: impl Into<String>) -> Self {
        Self {
            report: RwLock::new(EvaluationReport::empty(&today())),
            default_filter,
            default_top_n,
            sport: sport.into(),
        }
    }

    /// Swap in the latest run.
    pub async fn update(&self, report: EvaluationReport) {
        *self.report.write().await = report;
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Overrides for the default filter. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    pub min_ev: Option<i32>,
    pub team: Option<String>,
    pub market: Option<String>,
    pub n: Option<usize>,
    pub bins: Option<usize>,
}

impl ViewQuery {
    fn filter(&self, default: &BetFilter) -> BetFilter {
        BetFilter::new(
            self.min_ev.unwrap_or(default.min_ev),
            self.team.as_deref().or(default.team.as_deref()),
            self.market.as_deref().or(default.market.as_deref()),
        )
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub run_id: Uuid,
    pub date: String,
    pub generated_at: DateTime<Utc>,
    pub feed: String,
    pub games: usize,
    pub bets: usize,
    pub selected: usize,
    pub recorded: usize,
    pub history_len: usize,
    pub hit_rate_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HitRateResponse {
    pub wins: usize,
    pub losses: usize,
    pub resolved: usize,
    /// `None` until at least one bet has resolved.
    pub hit_rate_pct: Option<f64>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// Run date and the bets passing the request's filter.
async fn filtered(state: &DashboardState, query: &ViewQuery) -> (String, Vec<EvaluatedBet>) {
    let report = state.report.read().await;
    let bets = query.filter(&state.default_filter).apply(&report.bets);
    (report.date.clone(), bets)
}

/// GET /api/summary
pub async fn get_summary(State(state): State<AppState>) -> Json<SummaryResponse> {
    let report = state.report.read().await;
    Json(SummaryResponse {
        run_id: report.run_id,
        date: report.date.clone(),
        generated_at: report.generated_at,
        feed: report.feed.clone(),
        games: report.games,
        bets: report.bets.len(),
        selected: report.selected.len(),
        recorded: report.recorded,
        history_len: report.history_len,
        hit_rate_pct: report.hit_rate.map(|h| h.pct()),
    })
}

/// GET /api/bets?min_ev&team&market
pub async fn get_bets(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Json<Vec<EvaluatedBet>> {
    let (_, bets) = filtered(&state, &query).await;
    Json(bets)
}

/// GET /api/top?n&min_ev&team&market
pub async fn get_top(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Json<Vec<EvaluatedBet>> {
    let (_, bets) = filtered(&state, &query).await;
    Json(top_n(&bets, query.n.unwrap_or(state.default_top_n)))
}

/// GET /api/teams
pub async fn get_teams(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.report.read().await.teams.clone())
}

/// GET /api/trend
pub async fn get_trend(State(state): State<AppState>) -> Json<Vec<TrendPoint>> {
    Json(state.report.read().await.trend.clone())
}

/// GET /api/hit-rate
pub async fn get_hit_rate(State(state): State<AppState>) -> Json<HitRateResponse> {
    let report = state.report.read().await;
    let (wins, losses) = report.hit_rate.map_or((0, 0), |h| (h.wins, h.losses));
    Json(HitRateResponse {
        wins,
        losses,
        resolved: wins + losses,
        hit_rate_pct: report.hit_rate.map(|h| h.pct()),
    })
}

/// GET /api/ev-distribution?bins&min_ev&team&market
pub async fn get_ev_distribution(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Json<Vec<HistogramBin>> {
    let (_, bets) = filtered(&state, &query).await;
    let bins = query.bins.unwrap_or(DEFAULT_BINS).clamp(1, MAX_BINS);
    Json(ev_distribution(&bets, bins))
}

/// GET /api/export.csv?min_ev&team&market
pub async fn export_csv(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> impl IntoResponse {
    let (date, bets) = filtered(&state, &query).await;
    let disposition = format!("attachment; filename=\"{}_bets_{}.csv\"", state.sport, date);
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        to_csv(&bets),
    )
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
