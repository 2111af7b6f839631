//! ODDSBOARD: sports odds valuation engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! runs the evaluation pipeline and keeps the dashboard snapshot fresh
//! until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use oddsboard::config;
use oddsboard::dashboard::{self, DashboardState};
use oddsboard::engine::{today, EvaluationReport, Pipeline};
use oddsboard::session::Session;

const BANNER: &str = r#"
  ___  ____  ____  ____  ____   ___    _    ____  ____
 / _ \|  _ \|  _ \/ ___|| __ ) / _ \  / \  |  _ \|  _ \
| | | | | | | | | \___ \|  _ \| | | |/ _ \ | |_) | | | |
| |_| | |_| | |_| |___) | |_) | |_| / ___ \|  _ <| |_| |
 \___/|____/|____/|____/|____/ \___/_/   \_\_| \_\____/

  Sports odds valuation engine
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        sport = %cfg.feed.sport,
        source = ?cfg.feed.source,
        markets = %cfg.feed.markets,
        ledger = %cfg.ledger.path,
        refresh_interval_secs = cfg.refresh_interval_secs,
        "ODDSBOARD starting up"
    );

    // -- Initialise components -------------------------------------------

    let session = Session::from_env(&cfg.feed.api_key_env);
    let pipeline = Pipeline::from_config(&cfg, &session)?;

    let dashboard_state = Arc::new(DashboardState::new(
        pipeline.filter().clone(),
        cfg.filters.top_n,
        cfg.feed.sport.clone(),
    ));
    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(dashboard_state.clone(), cfg.dashboard.port).await?;
    }

    // -- Single run ------------------------------------------------------

    if cfg.refresh_interval_secs == 0 {
        let report = pipeline.run(&today()).await;
        log_report(&report);
        dashboard_state.update(report).await;

        if cfg.dashboard.enabled {
            info!("Single run complete. Dashboard stays up until Ctrl+C.");
            tokio::signal::ctrl_c().await?;
        }
        info!("ODDSBOARD shut down cleanly.");
        return Ok(());
    }

    // -- Refresh loop ----------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.refresh_interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.refresh_interval_secs,
        "Entering refresh loop. Press Ctrl+C to stop."
    );

    let mut runs: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = pipeline.run(&today()).await;
                log_report(&report);
                if report.games == 0 {
                    warn!("No games this run; dashboard shows an empty slate");
                }
                dashboard_state.update(report).await;
                runs += 1;
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(runs, ledger = %pipeline.history().describe(), "ODDSBOARD shut down cleanly.");
    Ok(())
}

/// Log a human-readable run summary and the top picks.
fn log_report(report: &EvaluationReport) {
    info!(
        run_id = %report.run_id,
        date = %report.date,
        games = report.games,
        bets = report.bets.len(),
        selected = report.selected.len(),
        recorded = report.recorded,
        history = report.history_len,
        hit_rate = ?report.hit_rate.map(|h| format!("{:.1}%", h.pct())),
        "Run complete"
    );
    for (rank, bet) in report.top.iter().enumerate() {
        info!(rank = rank + 1, "{bet}");
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("oddsboard=info"));

    let json_logging = std::env::var("ODDSBOARD_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
