use std::time::Duration;

use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use super::{CommitOutcome, GameBundle, IngestStore};
use crate::mode::SeasonScope;
use crate::reconcile::Game;
use crate::reference::{Player, TeamAlias};
use crate::upstream::SeasonType;

/// Postgres-backed store over the `game`, `game_team_performance`,
/// `pbp_raw_event`, `modern_team_index` and `player` tables.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

type GameRow = (i64, String, i32, i64, i64, String, String, NaiveDate, i64);

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect_with_retry(url: &str, max_retries: u32) -> Result<Self, sqlx::Error> {
        let mut attempt = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(2)
                .acquire_timeout(Duration::from_secs(10))
                .connect(url)
                .await
            {
                Ok(pool) => {
                    info!("Connected to PostgreSQL");
                    return Ok(Self::new(pool));
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(e);
                    }
                    warn!("Database connection attempt {} failed: {}. Retrying...", attempt, e);
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
            }
        }
    }
}

impl IngestStore for PgStore {
    async fn load_team_index(&self) -> Result<Vec<TeamAlias>, sqlx::Error> {
        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            "SELECT id::bigint, abrev, nickname FROM modern_team_index ORDER BY id, abrev",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(team_id, abbreviation, nickname)| TeamAlias {
                team_id,
                abbreviation,
                nickname,
            })
            .collect())
    }

    async fn load_player_ids(&self) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT DISTINCT id::bigint FROM player")
            .fetch_all(&self.db)
            .await
    }

    async fn seed_teams(&self, teams: &[TeamAlias]) -> Result<u64, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let mut inserted = 0;

        for team in teams {
            inserted += sqlx::query(
                "INSERT INTO modern_team_index (id, abrev, nickname) VALUES ($1, $2, $3) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(team.team_id)
            .bind(&team.abbreviation)
            .bind(&team.nickname)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn upsert_players(&self, players: &[Player]) -> Result<u64, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let mut inserted = 0;

        for player in players {
            inserted += sqlx::query(
                "INSERT INTO player (id, full_name, first_name, last_name, is_active) \
                 VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING",
            )
            .bind(player.id)
            .bind(&player.full_name)
            .bind(&player.first_name)
            .bind(&player.last_name)
            .bind(player.is_active)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn select_games(&self, scope: &SeasonScope) -> Result<Vec<Game>, sqlx::Error> {
        let season_ids: Vec<i32> = scope.season_ids.iter().copied().collect();
        let rows: Vec<GameRow> = sqlx::query_as(
            r#"
            SELECT id::bigint, season_type, season_id::int, home_team_id::bigint,
                   away_team_id::bigint, home_team_abrev, away_team_abrev, date,
                   winner_id::bigint
            FROM game
            WHERE season_id = ANY($1)
              AND ($2::date IS NULL OR date >= $2)
            ORDER BY date, id
            "#,
        )
        .bind(&season_ids)
        .bind(scope.date_from)
        .fetch_all(&self.db)
        .await?;

        let games = rows
            .into_iter()
            .filter_map(|row| {
                let (id, tag, season_id, home_id, away_id, home_abbr, away_abbr, date, winner_id) =
                    row;
                let Some(season_type) =
                    SeasonType::from_tag(&tag).or_else(|| SeasonType::from_season_id(season_id))
                else {
                    warn!("Ignoring game {} with unknown season type {:?}", id, tag);
                    return None;
                };
                Some(Game {
                    id,
                    season_id,
                    season_type,
                    home_team_id: home_id,
                    home_team_abbreviation: home_abbr,
                    away_team_id: away_id,
                    away_team_abbreviation: away_abbr,
                    date,
                    winner_id,
                })
            })
            .collect();

        Ok(games)
    }

    async fn commit_game(&self, bundle: &GameBundle) -> Result<CommitOutcome, sqlx::Error> {
        let game = &bundle.game;
        let mut outcome = CommitOutcome::default();

        // Dropping the transaction on an early return rolls it back.
        let mut tx = self.db.begin().await?;

        outcome.games = sqlx::query(
            r#"
            INSERT INTO game (id, season_id, home_team_id, home_team_abrev, away_team_id,
                              away_team_abrev, date, season_type, winner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(game.id)
        .bind(game.season_id)
        .bind(game.home_team_id)
        .bind(&game.home_team_abbreviation)
        .bind(game.away_team_id)
        .bind(&game.away_team_abbreviation)
        .bind(game.date)
        .bind(game.season_type.tag())
        .bind(game.winner_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        for performance in &bundle.performances {
            outcome.performances += sqlx::query(
                r#"
                INSERT INTO game_team_performance (
                    game_id, team_id, team_abrev, mins, pts, overtime,
                    field_goals_made, field_goals_attempted, field_goal_percentage,
                    three_pointers_made, three_pointers_attempted, three_pointer_percentage,
                    free_throws_made, free_throws_attempted, free_throw_percentage,
                    offensive_rebounds, defensive_rebounds, total_rebounds,
                    assists, steals, blocks, turnovers, personal_fouls, plus_minus
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24
                )
                ON CONFLICT (game_id, team_id) DO NOTHING
                "#,
            )
            .bind(performance.game_id)
            .bind(performance.team_id)
            .bind(&performance.team_abbreviation)
            .bind(performance.minutes)
            .bind(performance.points)
            .bind(performance.overtime)
            .bind(performance.field_goals_made)
            .bind(performance.field_goals_attempted)
            .bind(performance.field_goal_percentage)
            .bind(performance.three_pointers_made)
            .bind(performance.three_pointers_attempted)
            .bind(performance.three_pointer_percentage)
            .bind(performance.free_throws_made)
            .bind(performance.free_throws_attempted)
            .bind(performance.free_throw_percentage)
            .bind(performance.offensive_rebounds)
            .bind(performance.defensive_rebounds)
            .bind(performance.total_rebounds)
            .bind(performance.assists)
            .bind(performance.steals)
            .bind(performance.blocks)
            .bind(performance.turnovers)
            .bind(performance.personal_fouls)
            .bind(performance.plus_minus)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        for event in &bundle.events {
            outcome.events += sqlx::query(
                r#"
                INSERT INTO pbp_raw_event (
                    game_id, season_id, season_type, event_num, event_type, event_subtype,
                    home_score, away_score, period, clock,
                    home_team_id, away_team_id, home_team_abrev, away_team_abrev,
                    possession_team_id, possession_team_abrev, event_team_id, event_team_abrev,
                    is_overtime,
                    shooter_id, assister_id, jump_ball_winner_id, jump_ball_loser_id,
                    jump_ball_recovered_id, rebounder_id, turnover_id, foul_drawn_id, fouler_id,
                    stealer_id, blocker_id, sub_in_id, sub_out_id,
                    foul_is_technical, foul_is_personal, foul_is_offensive,
                    team_turnover, team_rebound, offensive_rebound,
                    side, descriptor, area, area_detail, shot_distance, shot_made, shot_value,
                    shot_x, shot_y
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                    $21, $22, $23, $24, $25, $26, $27, $28, $29, $30,
                    $31, $32, $33, $34, $35, $36, $37, $38, $39, $40,
                    $41, $42, $43, $44, $45, $46, $47
                )
                ON CONFLICT (game_id, event_num) DO NOTHING
                "#,
            )
            .bind(event.game_id)
            .bind(event.season_id)
            .bind(&event.season_type)
            .bind(event.event_num)
            .bind(&event.event_type)
            .bind(&event.event_subtype)
            .bind(event.home_score)
            .bind(event.away_score)
            .bind(event.period)
            .bind(event.clock.map(|clock| clock.to_interval()))
            .bind(event.home_team_id)
            .bind(event.away_team_id)
            .bind(&event.home_team_abrev)
            .bind(&event.away_team_abrev)
            .bind(event.possession_team_id)
            .bind(&event.possession_team_abrev)
            .bind(event.event_team_id)
            .bind(&event.event_team_abrev)
            .bind(event.is_overtime)
            .bind(event.shooter_id)
            .bind(event.assister_id)
            .bind(event.jump_ball_winner_id)
            .bind(event.jump_ball_loser_id)
            .bind(event.jump_ball_recovered_id)
            .bind(event.rebounder_id)
            .bind(event.turnover_id)
            .bind(event.foul_drawn_id)
            .bind(event.fouler_id)
            .bind(event.stealer_id)
            .bind(event.blocker_id)
            .bind(event.sub_in_id)
            .bind(event.sub_out_id)
            .bind(event.foul_is_technical)
            .bind(event.foul_is_personal)
            .bind(event.foul_is_offensive)
            .bind(event.team_turnover)
            .bind(event.team_rebound)
            .bind(event.offensive_rebound)
            .bind(&event.side)
            .bind(&event.descriptor)
            .bind(&event.area)
            .bind(&event.area_detail)
            .bind(event.shot_distance)
            .bind(event.shot_made)
            .bind(event.shot_value)
            .bind(event.shot_x)
            .bind(event.shot_y)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        debug!(
            "Committed game {}: {} game, {} performance, {} event rows inserted",
            game.id, outcome.games, outcome.performances, outcome.events
        );
        Ok(outcome)
    }
}
