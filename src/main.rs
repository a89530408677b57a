//! NBA play-by-play ingestion job.
//!
//! One invocation runs one pass: backfill by default, the trailing window of
//! the current season with `--update`, or the whole current season with
//! `--whole-current-season`.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{error, info};

use pbp_ingestion::{Config, NbaStatsClient, PgStore, Pipeline, RunMode, SeasonScope};

#[derive(Debug, Parser)]
#[command(name = "pbp-ingestion", version, about)]
struct Args {
    /// Only ingest the current season's games from the last few days.
    #[arg(long, env = "PBP_UPDATE")]
    update: bool,

    /// Ingest the entire current season. Takes precedence over --update.
    #[arg(long, env = "PBP_WHOLE_CURRENT_SEASON")]
    whole_current_season: bool,

    /// Seed the team index and refresh the player index before ingesting.
    #[arg(long, env = "PBP_REFRESH_REFERENCE")]
    refresh_reference: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pbp_ingestion=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let today = Local::now().date_naive();
    let season = config.season(today);
    let mode = RunMode::from_flags(args.update, args.whole_current_season);
    let scope = SeasonScope::new(mode, today, season, config.incremental_window_days);
    info!("NBA play-by-play ingestion: {:?} mode, current season {}", mode, season);

    let store = PgStore::connect_with_retry(&config.database_url, config.db_connect_retries)
        .await
        .context("Failed to connect to database")?;
    let client = NbaStatsClient::new(config.endpoints.clone(), config.pacing, config.http_timeout)
        .context("Failed to build stats client")?;

    let pipeline = Pipeline::new(&client, &store, config.retry);
    if args.refresh_reference {
        pipeline
            .refresh_reference(season)
            .await
            .context("Reference refresh failed")?;
    }

    match pipeline.run(&scope).await {
        Ok(summary) => {
            info!(
                "Ingestion complete: {} teams, {} game logs, {} games, {} new events",
                summary.teams, summary.game_logs, summary.games, summary.events
            );
            Ok(())
        }
        Err(e) => {
            error!("Ingestion aborted: {}", e);
            Err(e.into())
        }
    }
}
