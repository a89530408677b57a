//! The statistics provider seam: record shapes and the provider trait.

mod client;

pub use client::{NbaStatsClient, StatsEndpoints};

use std::future::Future;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::UpstreamError;
use crate::lenient;

/// Regular season or playoffs. Encoded in the leading digit of a season id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeasonType {
    Regular,
    Playoff,
}

impl SeasonType {
    pub const ALL: [SeasonType; 2] = [SeasonType::Regular, SeasonType::Playoff];

    /// Tag stored alongside games and events.
    pub fn tag(self) -> &'static str {
        match self {
            SeasonType::Regular => "regular",
            SeasonType::Playoff => "playoff",
        }
    }

    /// Name the provider expects in its `SeasonType` parameter.
    pub fn upstream_name(self) -> &'static str {
        match self {
            SeasonType::Regular => "Regular Season",
            SeasonType::Playoff => "Playoffs",
        }
    }

    /// `22025` for the 2025-26 regular season, `42025` for its playoffs.
    pub fn season_id(self, season: i32) -> i32 {
        match self {
            SeasonType::Regular => 20_000 + season,
            SeasonType::Playoff => 40_000 + season,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "regular" => Some(SeasonType::Regular),
            "playoff" => Some(SeasonType::Playoff),
            _ => None,
        }
    }

    pub fn from_season_id(season_id: i32) -> Option<Self> {
        match season_id / 10_000 {
            2 => Some(SeasonType::Regular),
            4 => Some(SeasonType::Playoff),
            _ => None,
        }
    }
}

/// `2025` -> `"2025-26"`.
pub fn season_label(season: i32) -> String {
    format!("{}-{:02}", season, (season + 1).rem_euclid(100))
}

/// Ten digit, zero padded game id used by the provider's URLs.
pub fn upstream_game_id(game_id: i64) -> String {
    format!("{:010}", game_id)
}

/// Filter for one team's game log request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameLogQuery {
    pub team_id: i64,
    pub season_type: SeasonType,
    /// Starting year of a single season; `None` asks for every season.
    pub season: Option<i32>,
    pub date_from: Option<NaiveDate>,
}

/// One team's line in one game, as returned by the game finder endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct GameLogRecord {
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub season_id: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub team_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub team_abbreviation: Option<String>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub game_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub game_date: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub matchup: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub wl: Option<String>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub min: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub pts: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub fgm: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub fga: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub fg_pct: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub fg3m: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub fg3a: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub fg3_pct: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub ftm: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub fta: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub ft_pct: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub oreb: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub dreb: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub reb: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub ast: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub stl: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub blk: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub tov: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub pf: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub plus_minus: Option<i32>,
}

/// One action from the live play-by-play feed.
///
/// Every field is optional; which ones matter depends on `action_type`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayByPlayAction {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub action_number: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub action_type: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub sub_type: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub clock: Option<String>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub period: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub score_home: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub score_away: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub possession: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub team_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub team_tricode: Option<String>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub person_id: Option<i64>,
    #[serde(deserialize_with = "lenient::flag")]
    pub is_field_goal: bool,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub shot_result: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub side: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub descriptor: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub area: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub area_detail: Option<String>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub shot_distance: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub x: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub y: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub assist_person_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub block_person_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub steal_person_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub foul_drawn_person_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub jump_ball_won_person_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub jump_ball_lost_person_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub jump_ball_recovered_person_id: Option<i64>,
    #[serde(deserialize_with = "lenient::token_list")]
    pub qualifiers: Vec<String>,
}

/// One row of the all-players index.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PlayerRecord {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub person_id: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub display_last_comma_first: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub display_first_last: Option<String>,
    #[serde(deserialize_with = "lenient::opt_i32")]
    pub rosterstatus: Option<i32>,
}

/// Tabular payload shared by the `stats` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultSets {
    #[serde(rename = "resultSets")]
    pub result_sets: Vec<ResultSet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub name: String,
    pub headers: Vec<String>,
    #[serde(rename = "rowSet")]
    pub row_set: Vec<Vec<Value>>,
}

impl ResultSets {
    /// Records of the first result set, which is where the endpoints used
    /// here put their data.
    pub fn first_records<T: DeserializeOwned>(&self) -> Result<Vec<T>, UpstreamError> {
        let set = self
            .result_sets
            .first()
            .ok_or_else(|| UpstreamError::Malformed("response has no result sets".into()))?;
        set.records()
    }
}

impl ResultSet {
    pub fn records<T: DeserializeOwned>(&self) -> Result<Vec<T>, UpstreamError> {
        self.row_set
            .iter()
            .map(|row| {
                if row.len() != self.headers.len() {
                    return Err(UpstreamError::Malformed(format!(
                        "{} row has {} cells for {} headers",
                        self.name,
                        row.len(),
                        self.headers.len()
                    )));
                }
                let record: Map<String, Value> = self
                    .headers
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Ok(serde_json::from_value(Value::Object(record))?)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PlayByPlayResponse {
    pub game: PlayByPlayGame,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PlayByPlayGame {
    #[serde(default)]
    pub actions: Vec<PlayByPlayAction>,
}

/// Upstream statistics provider.
///
/// Implementations make exactly one request per call; retrying is the
/// caller's business.
pub trait StatsProvider: Send + Sync {
    fn team_game_log(
        &self,
        query: GameLogQuery,
    ) -> impl Future<Output = Result<Vec<GameLogRecord>, UpstreamError>> + Send + '_;

    /// Actions of one game in feed order.
    fn play_by_play(
        &self,
        game_id: i64,
    ) -> impl Future<Output = Result<Vec<PlayByPlayAction>, UpstreamError>> + Send + '_;

    fn player_index(
        &self,
        season: i32,
    ) -> impl Future<Output = Result<Vec<PlayerRecord>, UpstreamError>> + Send + '_;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn season_ids_and_labels() {
        assert_eq!(SeasonType::Regular.season_id(2025), 22025);
        assert_eq!(SeasonType::Playoff.season_id(1996), 41996);
        assert_eq!(SeasonType::from_season_id(42010), Some(SeasonType::Playoff));
        assert_eq!(SeasonType::from_season_id(12010), None);
        assert_eq!(season_label(2025), "2025-26");
        assert_eq!(season_label(1999), "1999-00");
        assert_eq!(upstream_game_id(22500001), "0022500001");
    }

    #[test]
    fn game_log_rows_tolerate_drift() {
        let payload = json!({
            "resultSets": [{
                "name": "LeagueGameFinderResults",
                "headers": ["SEASON_ID", "TEAM_ID", "TEAM_ABBREVIATION", "GAME_ID", "GAME_DATE",
                            "MATCHUP", "WL", "MIN", "PTS", "FG_PCT", "PLUS_MINUS"],
                "rowSet": [
                    ["22025", 1610612747, "LAL", "0022500001", "2025-10-21",
                     "LAL vs. GSW", "L", 240, 109, 0.476, -10.0],
                    ["22025", 1610612747, "LAL", "0022500002", "2025-10-23",
                     "LAL @ PHX", "W", "265", 121, null, null]
                ]
            }]
        });
        let sets: ResultSets = serde_json::from_value(payload).unwrap();
        let rows: Vec<GameLogRecord> = sets.first_records().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].season_id, Some(22025));
        assert_eq!(rows[0].game_id, Some(22500001));
        assert_eq!(rows[0].plus_minus, Some(-10));
        assert_eq!(rows[1].min, Some(265));
        assert_eq!(rows[1].fg_pct, None);
        assert_eq!(rows[1].plus_minus, None);
        assert_eq!(rows[1].reb, None);
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let set = ResultSet {
            name: "LeagueGameFinderResults".into(),
            headers: vec!["GAME_ID".into(), "TEAM_ID".into()],
            row_set: vec![vec![json!("0022500001")]],
        };
        let result: Result<Vec<GameLogRecord>, _> = set.records();
        assert!(matches!(result, Err(UpstreamError::Malformed(_))));
    }

    #[test]
    fn actions_accept_alternate_types() {
        let action: PlayByPlayAction = serde_json::from_value(json!({
            "actionNumber": 7,
            "actionType": "2pt",
            "subType": "Jump Shot",
            "clock": "PT11M04.30S",
            "period": 1,
            "scoreHome": "2",
            "scoreAway": "0",
            "personId": "1629029",
            "assistPersonId": "not-a-number",
            "isFieldGoal": 1,
            "x": 41.2,
            "qualifiers": "pointsinthepaint"
        }))
        .unwrap();

        assert_eq!(action.score_home, Some(2));
        assert_eq!(action.person_id, Some(1629029));
        assert_eq!(action.assist_person_id, None);
        assert!(action.is_field_goal);
        assert_eq!(action.qualifiers, vec!["pointsinthepaint"]);
        assert_eq!(action.block_person_id, None);
    }
}
