//! The Odds API client.
//!
//! API docs: https://the-odds-api.com/liveapi/guides/v4/
//! Endpoint: `GET {base}/sports/{sport}/odds`
//! Auth: `apiKey` query parameter. Quota is reported in the
//! `x-requests-remaining` / `x-requests-used` response headers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::OddsFeed;
use crate::config::FeedConfig;
use crate::engine::normalizer::parse_payload;
use crate::session::Session;
use crate::types::{GameOdds, OddsboardError};

const FEED_NAME: &str = "the-odds-api";

pub struct OddsApiClient {
    http: Client,
    api_key: Option<SecretString>,
    base_url: String,
    sport: String,
    regions: String,
    markets: String,
}

impl OddsApiClient {
    pub fn new(config: &FeedConfig, session: &Session) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("ODDSBOARD/0.1.0")
            .build()
            .context("Failed to build odds HTTP client")?;

        Ok(Self {
            http,
            api_key: session.api_key().map(|k| SecretString::new(k.to_string())),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            sport: config.sport.clone(),
            regions: config.regions.clone(),
            markets: config.markets.clone(),
        })
    }

    /// Full request URL, American odds format.
    fn odds_url(&self, api_key: &str) -> String {
        format!(
            "{}/sports/{}/odds?apiKey={}&regions={}&markets={}&oddsFormat=american",
            self.base_url,
            urlencoding::encode(&self.sport),
            urlencoding::encode(api_key),
            urlencoding::encode(&self.regions),
            urlencoding::encode(&self.markets),
        )
    }
}

#[async_trait]
impl OddsFeed for OddsApiClient {
    fn name(&self) -> &str {
        FEED_NAME
    }

    async fn fetch_games(&self) -> Result<Vec<GameOdds>> {
        let api_key = self.api_key.as_ref().ok_or_else(|| OddsboardError::Feed {
            feed: FEED_NAME.into(),
            message: "no API key configured".into(),
        })?;

        debug!(sport = %self.sport, markets = %self.markets, "Fetching odds");

        let resp = self
            .http
            .get(self.odds_url(api_key.expose_secret()))
            .send()
            .await
            .context("Odds API request failed")?;

        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("?")
                .to_string()
        };
        debug!(
            remaining = %header("x-requests-remaining"),
            used = %header("x-requests-used"),
            "Odds API quota"
        );

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Odds API error {status}: {body}");
        }

        let payload: Value = resp
            .json()
            .await
            .context("Failed to parse Odds API response")?;

        Ok(parse_payload(payload))
    }
}
