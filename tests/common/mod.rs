#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::NaiveDate;
use reqwest::StatusCode;

use pbp_ingestion::decode::RawEventRow;
use pbp_ingestion::error::UpstreamError;
use pbp_ingestion::mode::SeasonScope;
use pbp_ingestion::reconcile::{Game, TeamGamePerformance};
use pbp_ingestion::reference::{Player, TeamAlias};
use pbp_ingestion::store::{CommitOutcome, GameBundle, IngestStore};
use pbp_ingestion::upstream::{
    GameLogQuery, GameLogRecord, PlayByPlayAction, PlayerRecord, SeasonType, StatsProvider,
};

pub const LAKERS: i64 = 1610612747;
pub const CELTICS: i64 = 1610612738;

pub const LEBRON: i64 = 2544;
pub const DAVIS: i64 = 203076;
pub const TATUM: i64 = 1628369;
pub const BROWN: i64 = 1627759;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Tables of the relational store, kept in memory.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub teams: Vec<TeamAlias>,
    pub players: BTreeMap<i64, Player>,
    pub games: BTreeMap<i64, Game>,
    pub performances: BTreeMap<(i64, i64), TeamGamePerformance>,
    pub events: BTreeMap<(i64, i64), RawEventRow>,
}

/// Store whose commits apply to a scratch copy and only replace the tables
/// when the whole game went through.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_commit_of: Mutex<Option<i64>>,
    pub commits: AtomicUsize,
}

impl MemoryStore {
    pub fn with_reference(teams: &[(i64, &str, &str)], players: &[i64]) -> Self {
        let store = Self::default();
        {
            let mut tables = store.tables.lock().unwrap();
            tables.teams = teams
                .iter()
                .map(|(team_id, abbreviation, nickname)| TeamAlias {
                    team_id: *team_id,
                    abbreviation: abbreviation.to_string(),
                    nickname: nickname.to_string(),
                })
                .collect();
            for id in players {
                tables.players.insert(
                    *id,
                    Player {
                        id: *id,
                        full_name: format!("Player {id}"),
                        first_name: "Player".to_string(),
                        last_name: id.to_string(),
                        is_active: true,
                    },
                );
            }
        }
        store
    }

    /// Lakers and Celtics with two players each.
    pub fn lakers_and_celtics() -> Self {
        Self::with_reference(
            &[(LAKERS, "LAL", "Lakers"), (CELTICS, "BOS", "Celtics")],
            &[LEBRON, DAVIS, TATUM, BROWN],
        )
    }

    pub fn fail_commit_of(&self, game_id: i64) {
        *self.fail_commit_of.lock().unwrap() = Some(game_id);
    }

    pub fn insert_game(&self, game: Game) {
        self.tables.lock().unwrap().games.insert(game.id, game);
    }

    pub fn snapshot(&self) -> Tables {
        self.tables.lock().unwrap().clone()
    }

    pub fn events_of(&self, game_id: i64) -> Vec<RawEventRow> {
        self.snapshot()
            .events
            .into_iter()
            .filter(|((id, _), _)| *id == game_id)
            .map(|(_, row)| row)
            .collect()
    }
}

impl IngestStore for MemoryStore {
    async fn load_team_index(&self) -> Result<Vec<TeamAlias>, sqlx::Error> {
        Ok(self.tables.lock().unwrap().teams.clone())
    }

    async fn load_player_ids(&self) -> Result<Vec<i64>, sqlx::Error> {
        Ok(self.tables.lock().unwrap().players.keys().copied().collect())
    }

    async fn seed_teams(&self, teams: &[TeamAlias]) -> Result<u64, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let mut inserted = 0;
        for team in teams {
            if !tables.teams.contains(team) {
                tables.teams.push(team.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn upsert_players(&self, players: &[Player]) -> Result<u64, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let mut inserted = 0;
        for player in players {
            if !tables.players.contains_key(&player.id) {
                tables.players.insert(player.id, player.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn select_games(&self, scope: &SeasonScope) -> Result<Vec<Game>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        let mut games: Vec<Game> = tables
            .games
            .values()
            .filter(|game| scope.includes(game.season_id, game.date))
            .cloned()
            .collect();
        games.sort_by_key(|game| (game.date, game.id));
        Ok(games)
    }

    async fn commit_game(&self, bundle: &GameBundle) -> Result<CommitOutcome, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let mut scratch = tables.clone();
        let mut outcome = CommitOutcome::default();

        if !scratch.games.contains_key(&bundle.game.id) {
            scratch.games.insert(bundle.game.id, bundle.game.clone());
            outcome.games += 1;
        }
        for performance in &bundle.performances {
            let key = (performance.game_id, performance.team_id);
            if !scratch.performances.contains_key(&key) {
                scratch.performances.insert(key, performance.clone());
                outcome.performances += 1;
            }
        }
        for (index, event) in bundle.events.iter().enumerate() {
            if index == bundle.events.len() / 2
                && *self.fail_commit_of.lock().unwrap() == Some(bundle.game.id)
            {
                return Err(sqlx::Error::Protocol("connection reset mid-transaction".into()));
            }
            let key = (event.game_id, event.event_num);
            if !scratch.events.contains_key(&key) {
                scratch.events.insert(key, event.clone());
                outcome.events += 1;
            }
        }

        *tables = scratch;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(outcome)
    }
}

/// Provider serving canned game logs and play-by-play feeds.
#[derive(Debug, Default)]
pub struct FakeProvider {
    pub game_logs: HashMap<(i64, SeasonType), Vec<GameLogRecord>>,
    pub play_by_play: HashMap<i64, Vec<PlayByPlayAction>>,
    pub players: Vec<PlayerRecord>,
    /// Transient failures left before a game's feed is served.
    pub flaky_feeds: Mutex<HashMap<i64, u32>>,
    pub queries: Mutex<Vec<GameLogQuery>>,
    pub feed_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn add_game_log(&mut self, season_type: SeasonType, record: GameLogRecord) {
        let team_id = record.team_id.unwrap_or_default();
        self.game_logs
            .entry((team_id, season_type))
            .or_default()
            .push(record);
    }

    pub fn total_calls(&self) -> usize {
        self.queries.lock().unwrap().len() + self.feed_calls.load(Ordering::SeqCst)
    }
}

impl StatsProvider for FakeProvider {
    async fn team_game_log(&self, query: GameLogQuery) -> Result<Vec<GameLogRecord>, UpstreamError> {
        self.queries.lock().unwrap().push(query);
        let records = self
            .game_logs
            .get(&(query.team_id, query.season_type))
            .cloned()
            .unwrap_or_default();

        Ok(records
            .into_iter()
            .filter(|record| match (query.date_from, record.game_date.as_deref()) {
                (Some(from), Some(date)) => NaiveDate::parse_from_str(&date[..10], "%Y-%m-%d")
                    .map_or(true, |date| date >= from),
                _ => true,
            })
            .collect())
    }

    async fn play_by_play(&self, game_id: i64) -> Result<Vec<PlayByPlayAction>, UpstreamError> {
        self.feed_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut flaky = self.flaky_feeds.lock().unwrap();
            if let Some(remaining) = flaky.get_mut(&game_id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(UpstreamError::Status {
                        status: StatusCode::SERVICE_UNAVAILABLE,
                        body: "upstream busy".to_string(),
                    });
                }
            }
        }
        self.play_by_play
            .get(&game_id)
            .cloned()
            .ok_or_else(|| UpstreamError::Status {
                status: StatusCode::NOT_FOUND,
                body: format!("no feed for {game_id}"),
            })
    }

    async fn player_index(&self, _season: i32) -> Result<Vec<PlayerRecord>, UpstreamError> {
        Ok(self.players.clone())
    }
}

/// One team's side of a game, as the game finder reports it.
pub fn game_log(
    season_id: i32,
    team: (i64, &str),
    game_id: i64,
    date: NaiveDate,
    matchup: &str,
    won: bool,
    points: i32,
) -> GameLogRecord {
    GameLogRecord {
        season_id: Some(season_id),
        team_id: Some(team.0),
        team_abbreviation: Some(team.1.to_string()),
        game_id: Some(game_id),
        game_date: Some(format!("{}T00:00:00", date.format("%Y-%m-%d"))),
        matchup: Some(matchup.to_string()),
        wl: Some(if won { "W" } else { "L" }.to_string()),
        min: Some(240),
        pts: Some(points),
        fgm: Some(40),
        fga: Some(88),
        fg_pct: Some(0.455),
        plus_minus: None,
        ..GameLogRecord::default()
    }
}

/// Both sides of a Lakers home game against the Celtics.
pub fn add_lakers_home_game(
    provider: &mut FakeProvider,
    season_id: i32,
    game_id: i64,
    date: NaiveDate,
) {
    let season_type = SeasonType::from_season_id(season_id).unwrap();
    provider.add_game_log(
        season_type,
        game_log(season_id, (LAKERS, "LAL"), game_id, date, "LAL vs. BOS", true, 112),
    );
    provider.add_game_log(
        season_type,
        game_log(season_id, (CELTICS, "BOS"), game_id, date, "BOS @ LAL", false, 104),
    );
    provider.play_by_play.insert(game_id, opening_sequence());
}

pub fn action(number: i64, action_type: &str, sub_type: &str, clock: &str) -> PlayByPlayAction {
    PlayByPlayAction {
        action_number: Some(number),
        action_type: Some(action_type.to_string()),
        sub_type: Some(sub_type.to_string()).filter(|s| !s.is_empty()),
        clock: Some(clock.to_string()),
        period: Some(1),
        score_home: Some(0),
        score_away: Some(0),
        ..PlayByPlayAction::default()
    }
}

/// Tip-off, a made jumper, a blocked three, a rebound, a team turnover and
/// a shooting foul.
pub fn opening_sequence() -> Vec<PlayByPlayAction> {
    vec![
        PlayByPlayAction {
            jump_ball_won_person_id: Some(DAVIS),
            jump_ball_lost_person_id: Some(BROWN),
            jump_ball_recovered_person_id: Some(LEBRON),
            possession: Some(LAKERS),
            ..action(2, "jumpball", "recovered", "PT11M58.00S")
        },
        PlayByPlayAction {
            is_field_goal: true,
            person_id: Some(LEBRON),
            assist_person_id: Some(DAVIS),
            shot_result: Some("Made".to_string()),
            side: Some("left".to_string()),
            area: Some("Mid-Range".to_string()),
            shot_distance: Some(16.4),
            x: Some(22.1),
            y: Some(61.0),
            team_id: Some(LAKERS),
            team_tricode: Some("LAL".to_string()),
            possession: Some(LAKERS),
            score_home: Some(2),
            ..action(4, "2pt", "jumpshot", "PT11M41.30S")
        },
        PlayByPlayAction {
            is_field_goal: true,
            person_id: Some(TATUM),
            block_person_id: Some(DAVIS),
            shot_result: Some("Missed".to_string()),
            team_id: Some(CELTICS),
            team_tricode: Some("BOS".to_string()),
            possession: Some(CELTICS),
            score_home: Some(2),
            ..action(7, "3pt", "jumpshot", "PT11M20.00S")
        },
        PlayByPlayAction {
            person_id: Some(LEBRON),
            possession: Some(LAKERS),
            score_home: Some(2),
            ..action(8, "rebound", "defensive", "PT11M18.00S")
        },
        PlayByPlayAction {
            team_id: Some(LAKERS),
            possession: Some(LAKERS),
            score_home: Some(2),
            ..action(10, "turnover", "shot clock", "PT10M55.00S")
        },
        PlayByPlayAction {
            person_id: Some(BROWN),
            foul_drawn_person_id: Some(LEBRON),
            possession: Some(LAKERS),
            score_home: Some(2),
            ..action(12, "foul", "personal", "PT10M40.00S")
        },
    ]
}
