//! Run driver: team game logs, then one transaction per game.
//!
//! Processing is strictly sequential. The only suspension points are the
//! provider calls (paced by the client) and the store calls.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::decode::{decode_game, GameContext, RawEventRow};
use crate::error::{IngestError, Result};
use crate::mode::SeasonScope;
use crate::reconcile::{reconcile, Game, TeamGamePerformance};
use crate::reference::{franchise_index, Player, ReferenceData};
use crate::retry::RetryPolicy;
use crate::store::{CommitOutcome, GameBundle, IngestStore};
use crate::upstream::{season_label, StatsProvider};

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub teams: usize,
    /// Game log rows reconciled inside the scope.
    pub game_logs: usize,
    /// Games committed, including ones whose rows already existed.
    pub games: usize,
    /// Event rows actually inserted.
    pub events: u64,
}

/// Rows of one game gathered from the game logs of both teams.
#[derive(Debug)]
struct PendingGame {
    game: Game,
    performances: Vec<TeamGamePerformance>,
}

pub struct Pipeline<'a, P, S> {
    provider: &'a P,
    store: &'a S,
    retry: RetryPolicy,
}

impl<'a, P: StatsProvider, S: IngestStore> Pipeline<'a, P, S> {
    pub fn new(provider: &'a P, store: &'a S, retry: RetryPolicy) -> Self {
        Self {
            provider,
            store,
            retry,
        }
    }

    /// Seed the franchise table and pull the provider's player index.
    pub async fn refresh_reference(&self, season: i32) -> Result<()> {
        let teams = franchise_index();
        let seeded = self.store.seed_teams(&teams).await?;
        info!("Seeded {} of {} team index rows", seeded, teams.len());

        let description = format!("player index {}", season_label(season));
        let records = self
            .retry
            .attempt(&description, || self.provider.player_index(season))
            .await
            .map_err(|source| IngestError::Upstream {
                description,
                source,
            })?;

        let players: Vec<Player> = records.iter().filter_map(Player::from_record).collect();
        if players.len() < records.len() {
            warn!(
                "Dropped {} player index rows without a usable id",
                records.len() - players.len()
            );
        }
        let inserted = self.store.upsert_players(&players).await?;
        info!("Inserted {} of {} players", inserted, players.len());
        Ok(())
    }

    pub async fn run(&self, scope: &SeasonScope) -> Result<RunSummary> {
        let start = Instant::now();
        info!(
            "Starting {:?} run over {} season ids (from date: {:?})",
            scope.mode,
            scope.season_ids.len(),
            scope.date_from
        );

        let reference = ReferenceData::load(self.store).await?;
        let mut summary = RunSummary::default();

        let mut ledger = self.collect_game_logs(scope, &reference, &mut summary).await?;

        let stored = self.store.select_games(scope).await?;
        let mut resumed = 0;
        for game in stored {
            ledger.entry(game.id).or_insert_with(|| {
                resumed += 1;
                PendingGame {
                    game,
                    performances: Vec::new(),
                }
            });
        }
        if resumed > 0 {
            info!("Resuming {} stored games missing from the game logs", resumed);
        }

        let mut pending: Vec<PendingGame> = ledger.into_values().collect();
        pending.sort_by_key(|p| (p.game.date, p.game.id));

        let total = pending.len();
        for (index, game) in pending.into_iter().enumerate() {
            info!(
                "Game {} of {}: {} ({} @ {}, {})",
                index + 1,
                total,
                game.game.id,
                game.game.away_team_abbreviation,
                game.game.home_team_abbreviation,
                game.game.date
            );
            let outcome = self.ingest_game(game, &reference).await?;
            summary.games += 1;
            summary.events += outcome.events;
        }

        info!(
            "Run finished in {:?}: {} teams, {} game logs, {} games, {} new events",
            start.elapsed(),
            summary.teams,
            summary.game_logs,
            summary.games,
            summary.events
        );
        Ok(summary)
    }

    /// Reconcile every team's game logs into one ledger entry per game id.
    async fn collect_game_logs(
        &self,
        scope: &SeasonScope,
        reference: &ReferenceData,
        summary: &mut RunSummary,
    ) -> Result<BTreeMap<i64, PendingGame>> {
        let mut ledger: BTreeMap<i64, PendingGame> = BTreeMap::new();

        for team_id in reference.team_ids() {
            summary.teams += 1;
            for query in scope.game_log_queries(team_id) {
                let description = format!(
                    "{} game log for team {}",
                    query.season_type.tag(),
                    team_id
                );
                let records = self
                    .retry
                    .attempt(&description, || self.provider.team_game_log(query))
                    .await
                    .map_err(|source| IngestError::Upstream {
                        description: description.clone(),
                        source,
                    })?;
                debug!("Fetched {} rows of {}", records.len(), description);

                for record in &records {
                    // Rows outside the scope's seasons may name defunct
                    // franchises, so they are dropped before reconciling.
                    if record
                        .season_id
                        .is_some_and(|id| !scope.season_ids.contains(&id))
                    {
                        continue;
                    }

                    let reconciled = reconcile(record, query.season_type, reference)
                        .map_err(|source| IngestError::Reconcile { team_id, source })?;
                    if !scope.includes(reconciled.game.season_id, reconciled.game.date) {
                        continue;
                    }
                    summary.game_logs += 1;

                    let entry = ledger
                        .entry(reconciled.game.id)
                        .or_insert_with(|| PendingGame {
                            game: reconciled.game,
                            performances: Vec::with_capacity(2),
                        });
                    let performance = reconciled.performance;
                    if !entry
                        .performances
                        .iter()
                        .any(|p| p.team_id == performance.team_id)
                    {
                        entry.performances.push(performance);
                    }
                }
            }
        }

        info!(
            "Reconciled {} game log rows into {} games",
            summary.game_logs,
            ledger.len()
        );
        Ok(ledger)
    }

    /// Fetch, decode and commit one game.
    async fn ingest_game(
        &self,
        pending: PendingGame,
        reference: &ReferenceData,
    ) -> Result<CommitOutcome> {
        let game_id = pending.game.id;
        let description = format!("play-by-play for game {}", game_id);
        let actions = self
            .retry
            .attempt(&description, || self.provider.play_by_play(game_id))
            .await
            .map_err(|source| IngestError::Upstream {
                description,
                source,
            })?;

        let context = GameContext::from(&pending.game);
        let events = decode_game(&context, &actions, reference)?;
        let rows: Vec<RawEventRow> = events
            .iter()
            .map(|event| RawEventRow::new(&context, event))
            .collect();

        let bundle = GameBundle {
            game: pending.game,
            performances: pending.performances,
            events: rows,
        };
        let outcome = self
            .store
            .commit_game(&bundle)
            .await
            .map_err(|source| IngestError::Persist { game_id, source })?;

        info!(
            "Game {}: {} actions, {} new events ({} already stored)",
            game_id,
            actions.len(),
            outcome.events,
            (bundle.events.len() as u64).saturating_sub(outcome.events)
        );
        Ok(outcome)
    }
}
