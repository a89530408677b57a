//! NBA game log and play-by-play ingestion.
//!
//! Team game logs are reconciled into canonical games, each game's
//! play-by-play feed is decoded into flat event rows, and every game is
//! committed to Postgres in its own idempotent transaction.

pub mod clock;
pub mod config;
pub mod decode;
pub mod error;
pub mod lenient;
pub mod mode;
pub mod pipeline;
pub mod reconcile;
pub mod reference;
pub mod retry;
pub mod store;
pub mod upstream;

pub use config::Config;
pub use error::{IngestError, Result};
pub use mode::{RunMode, SeasonScope};
pub use pipeline::{Pipeline, RunSummary};
pub use reference::ReferenceData;
pub use retry::RetryPolicy;
pub use store::{IngestStore, PgStore};
pub use upstream::{NbaStatsClient, StatsProvider};
