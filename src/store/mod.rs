//! Persistence seam.
//!
//! Every write is conflict-ignore on the table's natural key, so replaying
//! the same upstream data is a no-op. All rows of one game are committed in
//! a single transaction.

mod postgres;

pub use postgres::PgStore;

use std::future::Future;

use crate::decode::RawEventRow;
use crate::mode::SeasonScope;
use crate::reconcile::{Game, TeamGamePerformance};
use crate::reference::{Player, TeamAlias};

/// Everything written for one game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameBundle {
    pub game: Game,
    /// Zero rows when the game row was already stored by an earlier run.
    pub performances: Vec<TeamGamePerformance>,
    pub events: Vec<RawEventRow>,
}

/// Rows actually inserted by one commit; duplicates are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    pub games: u64,
    pub performances: u64,
    pub events: u64,
}

pub trait IngestStore: Send + Sync {
    fn load_team_index(
        &self,
    ) -> impl Future<Output = Result<Vec<TeamAlias>, sqlx::Error>> + Send + '_;

    fn load_player_ids(&self) -> impl Future<Output = Result<Vec<i64>, sqlx::Error>> + Send + '_;

    /// Conflict-ignore insert of team index rows. Returns rows inserted.
    fn seed_teams<'a>(
        &'a self,
        teams: &'a [TeamAlias],
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send + 'a;

    /// Conflict-ignore insert of player rows. Returns rows inserted.
    fn upsert_players<'a>(
        &'a self,
        players: &'a [Player],
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send + 'a;

    /// Stored games inside `scope`, oldest first.
    fn select_games<'a>(
        &'a self,
        scope: &'a SeasonScope,
    ) -> impl Future<Output = Result<Vec<Game>, sqlx::Error>> + Send + 'a;

    /// Write one game atomically. On error nothing of the game is kept.
    fn commit_game<'a>(
        &'a self,
        bundle: &'a GameBundle,
    ) -> impl Future<Output = Result<CommitOutcome, sqlx::Error>> + Send + 'a;
}
