use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;

use crate::mode::{season_for_date, DEFAULT_INCREMENTAL_WINDOW_DAYS};
use crate::retry::RetryPolicy;
use crate::upstream::StatsEndpoints;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub endpoints: StatsEndpoints,
    /// Fixed delay between two provider calls.
    pub pacing: Duration,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    /// Start year override, e.g. `2025` for 2025-26.
    pub current_season: Option<i32>,
    pub incremental_window_days: i64,
    pub db_connect_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = match env::var("DATABASE_URL") {
            Ok(v) if !v.trim().is_empty() => v,
            Ok(_) => return Err(anyhow!("DATABASE_URL is set but empty")),
            Err(_) => {
                let db_user = env::var("DB_USER").unwrap_or_else(|_| "nba".to_string());
                let db_name = env::var("DB_NAME").unwrap_or_else(|_| "nba".to_string());
                let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
                let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
                let db_password = match env::var("DB_PASSWORD") {
                    Ok(v) => v,
                    Err(_) => read_secret_file("/run/secrets/db_password", "db_password")?,
                };
                format!(
                    "postgresql://{}:{}@{}:{}/{}",
                    db_user, db_password, db_host, db_port, db_name
                )
            }
        };

        let defaults = StatsEndpoints::default();
        let endpoints = StatsEndpoints {
            stats_base_url: env::var("STATS_BASE_URL").unwrap_or(defaults.stats_base_url),
            live_base_url: env::var("LIVE_BASE_URL").unwrap_or(defaults.live_base_url),
        };

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: env_or("RETRY_MAX_ATTEMPTS", retry_defaults.max_attempts)?,
            base_delay: Duration::from_millis(env_or(
                "RETRY_BASE_DELAY_MS",
                retry_defaults.base_delay.as_millis() as u64,
            )?),
            max_delay: Duration::from_millis(env_or(
                "RETRY_MAX_DELAY_MS",
                retry_defaults.max_delay.as_millis() as u64,
            )?),
            jitter: retry_defaults.jitter,
        };

        let current_season = match env::var("CURRENT_SEASON") {
            Ok(v) if !v.trim().is_empty() => Some(
                v.trim()
                    .parse()
                    .with_context(|| format!("CURRENT_SEASON is not a year: {:?}", v))?,
            ),
            _ => None,
        };

        Ok(Self {
            database_url,
            endpoints,
            pacing: Duration::from_millis(env_or("PACING_MS", 600)?),
            http_timeout: Duration::from_secs(env_or("HTTP_TIMEOUT_SECONDS", 30)?),
            retry,
            current_season,
            incremental_window_days: check_window_days(env_or(
                "INCREMENTAL_WINDOW_DAYS",
                DEFAULT_INCREMENTAL_WINDOW_DAYS,
            )?)?,
            db_connect_retries: env_or("DB_CONNECT_RETRIES", 5)?,
        })
    }

    /// Configured season, or the one `today` falls in.
    pub fn season(&self, today: NaiveDate) -> i32 {
        self.current_season
            .unwrap_or_else(|| season_for_date(today))
    }
}

/// Longest trailing window an incremental run accepts.
const MAX_INCREMENTAL_WINDOW_DAYS: i64 = 366;

fn check_window_days(days: i64) -> Result<i64> {
    if !(0..=MAX_INCREMENTAL_WINDOW_DAYS).contains(&days) {
        return Err(anyhow!(
            "INCREMENTAL_WINDOW_DAYS must be between 0 and {}, got {}",
            MAX_INCREMENTAL_WINDOW_DAYS,
            days
        ));
    }
    Ok(days)
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, v)),
        _ => Ok(default),
    }
}

fn read_secret_file(file_path: &str, secret_name: &str) -> Result<String> {
    std::fs::read_to_string(file_path)
        .map(|s| s.trim().to_string())
        .with_context(|| {
            format!(
                "Neither DATABASE_URL nor DB_PASSWORD is set and no secret file at {} ({})",
                file_path, secret_name
            )
        })
}
