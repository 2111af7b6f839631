//! End-to-end runs: feed → valuation → filter → ledger → analytics,
//! then the dashboard over the resulting report.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use oddsboard::dashboard::{build_router, DashboardState};
use oddsboard::data::FileFeed;
use oddsboard::engine::Pipeline;
use oddsboard::storage::{CsvLedger, HistoryAccumulator, LedgerStore, MemoryLedger};
use oddsboard::strategy::filter::BetFilter;
use oddsboard::types::BetResult;

use crate::mock_feed::{nba_slate, single_h2h, MockFeed};

fn temp_path(ext: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("oddsboard_it_{}.{ext}", uuid::Uuid::new_v4()));
    p
}

fn memory_pipeline(feed: MockFeed, filter: BetFilter) -> Pipeline {
    Pipeline::new(
        Box::new(feed),
        HistoryAccumulator::new(Box::new(MemoryLedger::new())),
        filter,
        3,
    )
}

#[tokio::test]
async fn test_full_slate_evaluation() {
    let pipeline = memory_pipeline(MockFeed::new(nba_slate()), BetFilter::default());
    let report = pipeline.run("2024-03-01").await;

    assert_eq!(report.games, 3);
    // The away-less game contributes nothing
    assert_eq!(report.bets.len(), 8);
    assert_eq!(
        report.teams,
        vec!["Boston Celtics", "Denver Nuggets", "Miami Heat", "Orlando Magic", "Utah Jazz"]
    );

    let evs: Vec<f64> = report.bets.iter().map(|b| b.expected_value_pct).collect();
    assert_eq!(evs, vec![-40.68, 56.12, -30.64, -30.64, 32.57, 0.0, 354.55, -91.9]);

    // "+105" string price is accepted, null price takes the neutral path
    assert_eq!(report.bets[4].american_odds, 105);
    assert_eq!(report.bets[5].american_odds, 0);
    assert_eq!(report.bets[5].model_probability, 0.5);

    // min_ev 0 keeps the 0.0 neutral bet
    assert_eq!(report.selected.len(), 4);
    let top: Vec<&str> = report.top.iter().map(|b| b.selection.as_str()).collect();
    assert_eq!(top, vec!["Utah Jazz", "Miami Heat", "Boston Celtics"]);
    assert_eq!(report.top[2].market, "spreads");
}

#[tokio::test]
async fn test_implied_probabilities_for_simple_game() {
    let payload = Value::Array(vec![single_h2h("TeamB", "TeamA", 130, -150)]);
    let pipeline = memory_pipeline(MockFeed::new(payload), BetFilter::new(-100, None, None));
    let report = pipeline.run("2024-03-01").await;

    assert_eq!(report.bets.len(), 2);
    assert!(report.bets.iter().all(|b| b.market == "h2h"));
    assert!((report.bets[0].implied_probability - 0.6).abs() < 1e-3);
    assert!((report.bets[1].implied_probability - 0.435).abs() < 1e-3);
}

#[tokio::test]
async fn test_feed_failure_yields_empty_run() {
    let feed = MockFeed::failing("HTTP 401: invalid api key");
    let calls = feed.call_counter();
    let pipeline = memory_pipeline(feed, BetFilter::default());

    let report = pipeline.run("2024-03-01").await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.games, 0);
    assert!(report.bets.is_empty());
    assert!(report.top.is_empty());
    assert_eq!(report.recorded, 0);
    assert!(report.trend.is_empty());
    assert_eq!(report.hit_rate, None);
}

#[tokio::test]
async fn test_csv_ledger_accumulates_across_runs() {
    let ledger_path = temp_path("csv");
    let pipeline = Pipeline::new(
        Box::new(MockFeed::new(nba_slate())),
        HistoryAccumulator::new(Box::new(CsvLedger::new(&ledger_path))),
        BetFilter::default(),
        5,
    );

    let first = pipeline.run("2024-03-01").await;
    assert_eq!(first.recorded, 4);
    assert_eq!(first.history_len, 4);

    let second = pipeline.run("2024-03-02").await;
    assert_eq!(second.history_len, 8);
    assert_eq!(second.trend.len(), 2);
    assert_eq!(second.trend[0].date, "2024-03-01");
    assert_eq!(second.trend[0].count, 4);
    assert_eq!(second.trend[0].mean_ev_pct, second.trend[1].mean_ev_pct);

    // Header written once, rows appended below it
    let text = fs::read_to_string(&ledger_path).unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with("Date,")).count(), 1);
    assert_eq!(text.lines().count(), 9);

    fs::remove_file(&ledger_path).unwrap();
}

#[tokio::test]
async fn test_hit_rate_from_settled_history() {
    let ledger_path = temp_path("csv");
    let ledger = CsvLedger::new(&ledger_path);
    let settled: Vec<_> = [BetResult::Win, BetResult::Win, BetResult::Loss, BetResult::Pending]
        .into_iter()
        .map(|result| oddsboard::types::EvaluatedBet {
            date: "2024-02-28".into(),
            matchup: "Utah Jazz @ Denver Nuggets".into(),
            market: "h2h".into(),
            selection: "Utah Jazz".into(),
            american_odds: 400,
            model_probability: 0.9091,
            implied_probability: 0.2,
            expected_value_pct: 354.55,
            result,
        })
        .collect();
    ledger.append(&settled).unwrap();

    let pipeline = Pipeline::new(
        Box::new(MockFeed::new(nba_slate())),
        HistoryAccumulator::new(Box::new(CsvLedger::new(&ledger_path))),
        BetFilter::default(),
        5,
    );
    let report = pipeline.run("2024-03-01").await;
    let rate = report.hit_rate.unwrap();
    assert_eq!((rate.wins, rate.losses), (2, 1));
    assert_eq!(rate.pct(), 66.7);
    assert_eq!(report.trend[0].date, "2024-02-28");

    fs::remove_file(&ledger_path).unwrap();
}

#[tokio::test]
async fn test_file_feed_replay() {
    let payload_path = temp_path("json");
    fs::write(&payload_path, nba_slate().to_string()).unwrap();

    let pipeline = Pipeline::new(
        Box::new(FileFeed::new(&payload_path)),
        HistoryAccumulator::new(Box::new(MemoryLedger::new())),
        BetFilter::new(20, Some("Miami Heat"), None),
        5,
    )
    .with_record_filtered_only(false);

    let report = pipeline.run("2024-03-01").await;
    assert_eq!(report.feed, "file");
    assert_eq!(report.bets.len(), 8);
    // Celtics @ Heat bets at or above 20%: Heat h2h and Celtics spread
    assert_eq!(report.selected.len(), 2);
    assert_eq!(report.recorded, 8);

    fs::remove_file(&payload_path).unwrap();
}

#[tokio::test]
async fn test_dashboard_serves_latest_report() {
    let pipeline = memory_pipeline(MockFeed::new(nba_slate()), BetFilter::default());
    let state = Arc::new(DashboardState::new(pipeline.filter().clone(), 3, "basketball_nba"));
    state.update(pipeline.run("2024-03-01").await).await;

    let app = build_router(state);
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/top?team=Boston%20Celtics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    let top: Vec<Value> = serde_json::from_slice(&body).unwrap();
    let selections: Vec<&str> = top.iter().map(|b| b["selection"].as_str().unwrap()).collect();
    assert_eq!(selections, vec!["Miami Heat", "Boston Celtics", "Miami Heat"]);

    let resp = app
        .oneshot(Request::builder().uri("/api/export.csv?market=h2h").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    let csv = String::from_utf8(body.to_vec()).unwrap();
    // Header plus Heat h2h and Jazz h2h
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn test_memory_ledger_trait_object() {
    let store: Box<dyn LedgerStore> = Box::new(MemoryLedger::new());
    assert!(store.read_all().unwrap().is_empty());
}
