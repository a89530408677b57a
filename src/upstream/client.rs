use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{
    season_label, upstream_game_id, GameLogQuery, GameLogRecord, PlayByPlayAction,
    PlayByPlayResponse, PlayerRecord, ResultSets, StatsProvider,
};
use crate::error::UpstreamError;

/// Base URLs of the two provider surfaces.
#[derive(Debug, Clone)]
pub struct StatsEndpoints {
    /// Tabular stats API (`leaguegamefinder`, `commonallplayers`).
    pub stats_base_url: String,
    /// Static live-data CDN serving play-by-play JSON.
    pub live_base_url: String,
}

impl Default for StatsEndpoints {
    fn default() -> Self {
        Self {
            stats_base_url: "https://stats.nba.com/stats".to_string(),
            live_base_url: "https://cdn.nba.com/static/json/liveData".to_string(),
        }
    }
}

type Pacer = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// HTTP client for the NBA stats provider.
///
/// Every request waits on a pacer that admits one call per pacing period.
pub struct NbaStatsClient {
    endpoints: StatsEndpoints,
    http_client: reqwest::Client,
    pacer: Option<Pacer>,
}

impl NbaStatsClient {
    pub fn new(
        endpoints: StatsEndpoints,
        pacing: Duration,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        // stats.nba.com drops requests that do not look like they come from
        // the website
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://www.nba.com/"));
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://www.nba.com"));
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/124.0 Safari/537.36",
            ),
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(2)
            .build()?;

        let pacer = Quota::with_period(pacing).map(RateLimiter::direct);

        Ok(Self {
            endpoints,
            http_client,
            pacer,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        if let Some(pacer) = &self.pacer {
            pacer.until_ready().await;
        }

        debug!("GET {} {:?}", url, query);
        let response = self.http_client.get(url).query(query).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(UpstreamError::Status { status, body });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl StatsProvider for NbaStatsClient {
    async fn team_game_log(&self, query: GameLogQuery) -> Result<Vec<GameLogRecord>, UpstreamError> {
        let url = format!("{}/leaguegamefinder", self.endpoints.stats_base_url);
        let params = [
            ("PlayerOrTeam", "T".to_string()),
            ("LeagueID", "00".to_string()),
            ("TeamID", query.team_id.to_string()),
            ("SeasonType", query.season_type.upstream_name().to_string()),
            ("Season", query.season.map(season_label).unwrap_or_default()),
            (
                "DateFrom",
                query
                    .date_from
                    .map(|date| date.format("%m/%d/%Y").to_string())
                    .unwrap_or_default(),
            ),
        ];

        let sets: ResultSets = self.get_json(&url, &params).await?;
        let records: Vec<GameLogRecord> = sets.first_records()?;
        info!(
            "Fetched {} {} game log rows for team {}",
            records.len(),
            query.season_type.tag(),
            query.team_id
        );
        Ok(records)
    }

    async fn play_by_play(&self, game_id: i64) -> Result<Vec<PlayByPlayAction>, UpstreamError> {
        let url = format!(
            "{}/playbyplay/playbyplay_{}.json",
            self.endpoints.live_base_url,
            upstream_game_id(game_id)
        );

        let response: PlayByPlayResponse = self.get_json(&url, &[]).await?;
        Ok(response.game.actions)
    }

    async fn player_index(&self, season: i32) -> Result<Vec<PlayerRecord>, UpstreamError> {
        let url = format!("{}/commonallplayers", self.endpoints.stats_base_url);
        let params = [
            ("LeagueID", "00".to_string()),
            ("Season", season_label(season)),
            ("IsOnlyCurrentSeason", "0".to_string()),
        ];

        let sets: ResultSets = self.get_json(&url, &params).await?;
        sets.first_records()
    }
}
