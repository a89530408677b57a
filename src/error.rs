//! Error types for the ingestion pipeline.
//!
//! Only `UpstreamError` is ever retried. Everything else propagates to the
//! caller as-is.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the statistics provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed upstream payload: {0}")]
    Malformed(String),
}

impl UpstreamError {
    /// Whether another attempt might succeed.
    ///
    /// Client errors other than 429 are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Transport(_) | UpstreamError::Malformed(_) => true,
            UpstreamError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || !status.is_client_error()
            }
        }
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::Malformed(err.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid ISO 8601 duration: {0:?}")]
pub struct ClockError(pub String);

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("no {0} found in the reference tables")]
    Empty(&'static str),

    #[error("abbreviation {abbreviation} maps to both {first} and {second}")]
    AmbiguousAlias {
        abbreviation: String,
        first: i64,
        second: i64,
    },

    #[error("failed to load reference data: {0}")]
    Store(#[from] sqlx::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("unknown team abbreviation {0:?}")]
    UnknownTeam(String),

    #[error("malformed matchup {0:?}")]
    Matchup(String),

    #[error("game log row is missing {0}")]
    MissingField(&'static str),

    #[error("invalid game date {0:?}")]
    Date(String),
}

/// Top-level error for one run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("reference data bootstrap failed: {0}")]
    Reference(#[from] ReferenceError),

    #[error("upstream call {description} failed: {source}")]
    Upstream {
        description: String,
        #[source]
        source: UpstreamError,
    },

    #[error("could not reconcile game log for team {team_id}: {source}")]
    Reconcile {
        team_id: i64,
        #[source]
        source: ReconcileError,
    },

    #[error("could not decode event {event_num} of game {game_id}: {source}")]
    Decode {
        game_id: i64,
        event_num: i64,
        #[source]
        source: ClockError,
    },

    #[error("persisting game {game_id} failed: {source}")]
    Persist {
        game_id: i64,
        #[source]
        source: sqlx::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        let limited = UpstreamError::Status {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        };
        let unavailable = UpstreamError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        };
        assert!(limited.is_transient());
        assert!(unavailable.is_transient());
        assert!(UpstreamError::Malformed("truncated".into()).is_transient());
    }

    #[test]
    fn client_errors_are_permanent() {
        let missing = UpstreamError::Status {
            status: StatusCode::NOT_FOUND,
            body: "no such game".into(),
        };
        assert!(!missing.is_transient());
    }
}
