//! Turns one team's game log line into the canonical game row plus that
//! team's performance row.

use chrono::NaiveDate;

use crate::error::ReconcileError;
use crate::reference::ReferenceData;
use crate::upstream::{GameLogRecord, SeasonType};

/// Team minutes above which a game is assumed to have gone to overtime.
///
/// Regulation is 5 x 48 = 240; one overtime adds 25. Event periods are the
/// authoritative signal.
pub const OVERTIME_MINUTES_THRESHOLD: i32 = 250;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub id: i64,
    pub season_id: i32,
    pub season_type: SeasonType,
    pub home_team_id: i64,
    pub home_team_abbreviation: String,
    pub away_team_id: i64,
    pub away_team_abbreviation: String,
    pub date: NaiveDate,
    pub winner_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamGamePerformance {
    pub game_id: i64,
    pub team_id: i64,
    pub team_abbreviation: String,
    pub minutes: Option<i32>,
    pub points: Option<i32>,
    pub overtime: bool,
    pub field_goals_made: Option<i32>,
    pub field_goals_attempted: Option<i32>,
    pub field_goal_percentage: Option<f64>,
    pub three_pointers_made: Option<i32>,
    pub three_pointers_attempted: Option<i32>,
    pub three_pointer_percentage: Option<f64>,
    pub free_throws_made: Option<i32>,
    pub free_throws_attempted: Option<i32>,
    pub free_throw_percentage: Option<f64>,
    pub offensive_rebounds: Option<i32>,
    pub defensive_rebounds: Option<i32>,
    pub total_rebounds: Option<i32>,
    pub assists: Option<i32>,
    pub steals: Option<i32>,
    pub blocks: Option<i32>,
    pub turnovers: Option<i32>,
    pub personal_fouls: Option<i32>,
    pub plus_minus: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledGame {
    pub game: Game,
    pub performance: TeamGamePerformance,
}

/// Which side of the matchup the reporting team is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Home,
    Away,
}

/// Splits `"LAL @ PHX"` / `"LAL vs. GSW"` into the subject's venue and the
/// opponent abbreviation (the trailing three characters).
pub fn parse_matchup(matchup: &str) -> Result<(Venue, &str), ReconcileError> {
    let malformed = || ReconcileError::Matchup(matchup.to_string());

    let trimmed = matchup.trim();
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() < 3 || trimmed.len() < 3 || !trimmed.is_char_boundary(trimmed.len() - 3) {
        return Err(malformed());
    }

    let venue = if tokens[1] == "@" {
        Venue::Away
    } else {
        Venue::Home
    };
    Ok((venue, &trimmed[trimmed.len() - 3..]))
}

fn parse_game_date(raw: &str) -> Result<NaiveDate, ReconcileError> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| ReconcileError::Date(raw.to_string()))
}

pub fn reconcile(
    record: &GameLogRecord,
    season_type: SeasonType,
    reference: &ReferenceData,
) -> Result<ReconciledGame, ReconcileError> {
    let game_id = record.game_id.ok_or(ReconcileError::MissingField("GAME_ID"))?;
    let season_id = record
        .season_id
        .ok_or(ReconcileError::MissingField("SEASON_ID"))?;
    let subject_abbreviation = record
        .team_abbreviation
        .as_deref()
        .map(str::trim)
        .ok_or(ReconcileError::MissingField("TEAM_ABBREVIATION"))?;
    let subject_id = match record.team_id {
        Some(id) => id,
        None => reference
            .resolve_opponent(subject_abbreviation)
            .ok_or_else(|| ReconcileError::UnknownTeam(subject_abbreviation.to_string()))?,
    };
    let matchup = record
        .matchup
        .as_deref()
        .ok_or(ReconcileError::MissingField("MATCHUP"))?;
    let date = parse_game_date(
        record
            .game_date
            .as_deref()
            .ok_or(ReconcileError::MissingField("GAME_DATE"))?,
    )?;

    let (venue, opponent_abbreviation) = parse_matchup(matchup)?;
    let opponent_id = reference
        .resolve_opponent(opponent_abbreviation)
        .ok_or_else(|| ReconcileError::UnknownTeam(opponent_abbreviation.to_string()))?;

    let subject = (subject_id, subject_abbreviation.to_string());
    let opponent = (opponent_id, opponent_abbreviation.to_string());
    let ((home_team_id, home_team_abbreviation), (away_team_id, away_team_abbreviation)) =
        match venue {
            Venue::Home => (subject, opponent),
            Venue::Away => (opponent, subject),
        };

    let won = record.wl.as_deref().map(str::trim) == Some("W");
    let winner_id = if won { subject_id } else { opponent_id };

    let game = Game {
        id: game_id,
        season_id,
        season_type,
        home_team_id,
        home_team_abbreviation,
        away_team_id,
        away_team_abbreviation,
        date,
        winner_id,
    };

    let performance = TeamGamePerformance {
        game_id,
        team_id: subject_id,
        team_abbreviation: subject_abbreviation.to_string(),
        minutes: record.min,
        points: record.pts,
        overtime: record.min.is_some_and(|m| m > OVERTIME_MINUTES_THRESHOLD),
        field_goals_made: record.fgm,
        field_goals_attempted: record.fga,
        field_goal_percentage: record.fg_pct,
        three_pointers_made: record.fg3m,
        three_pointers_attempted: record.fg3a,
        three_pointer_percentage: record.fg3_pct,
        free_throws_made: record.ftm,
        free_throws_attempted: record.fta,
        free_throw_percentage: record.ft_pct,
        offensive_rebounds: record.oreb,
        defensive_rebounds: record.dreb,
        total_rebounds: record.reb,
        assists: record.ast,
        steals: record.stl,
        blocks: record.blk,
        turnovers: record.tov,
        personal_fouls: record.pf,
        plus_minus: record.plus_minus,
    };

    Ok(ReconciledGame { game, performance })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::franchise_index;

    fn reference() -> ReferenceData {
        ReferenceData::new(franchise_index(), [2544]).unwrap()
    }

    fn lakers_line(matchup: &str, wl: &str, min: i32) -> GameLogRecord {
        GameLogRecord {
            season_id: Some(22025),
            team_id: Some(1610612747),
            team_abbreviation: Some("LAL".into()),
            game_id: Some(22500001),
            game_date: Some("2025-10-21".into()),
            matchup: Some(matchup.into()),
            wl: Some(wl.into()),
            min: Some(min),
            pts: Some(109),
            fg_pct: Some(0.476),
            plus_minus: None,
            ..GameLogRecord::default()
        }
    }

    #[test]
    fn away_matchup_puts_opponent_at_home() {
        let reconciled =
            reconcile(&lakers_line("LAL @ PHX", "W", 240), SeasonType::Regular, &reference())
                .unwrap();
        let game = reconciled.game;

        assert_eq!(game.away_team_id, 1610612747);
        assert_eq!(game.away_team_abbreviation, "LAL");
        assert_eq!(game.home_team_id, 1610612756);
        assert_eq!(game.home_team_abbreviation, "PHX");
        assert_eq!(game.winner_id, 1610612747);
        assert_eq!(game.date, NaiveDate::from_ymd_opt(2025, 10, 21).unwrap());
    }

    #[test]
    fn home_matchup_and_loss() {
        let reconciled =
            reconcile(&lakers_line("LAL vs. GSW", "L", 240), SeasonType::Playoff, &reference())
                .unwrap();
        let game = reconciled.game;

        assert_eq!(game.home_team_id, 1610612747);
        assert_eq!(game.away_team_id, 1610612744);
        assert_eq!(game.away_team_abbreviation, "GSW");
        assert_eq!(game.winner_id, 1610612744);
        assert_eq!(game.season_type, SeasonType::Playoff);
    }

    #[test]
    fn overtime_is_inferred_from_minutes() {
        let regulation =
            reconcile(&lakers_line("LAL vs. GSW", "W", 240), SeasonType::Regular, &reference())
                .unwrap();
        let overtime =
            reconcile(&lakers_line("LAL vs. GSW", "W", 265), SeasonType::Regular, &reference())
                .unwrap();
        assert!(!regulation.performance.overtime);
        assert!(overtime.performance.overtime);
    }

    #[test]
    fn missing_aggregates_stay_null() {
        let reconciled =
            reconcile(&lakers_line("LAL vs. GSW", "W", 240), SeasonType::Regular, &reference())
                .unwrap();
        let performance = reconciled.performance;
        assert_eq!(performance.plus_minus, None);
        assert_eq!(performance.total_rebounds, None);
        assert_eq!(performance.points, Some(109));
        assert_eq!(performance.team_id, 1610612747);
    }

    #[test]
    fn historical_opponent_alias() {
        let mut line = lakers_line("LAL @ SEA", "L", 240);
        line.season_id = Some(21999);
        line.game_date = Some("2000-01-04T00:00:00".into());
        let game = reconcile(&line, SeasonType::Regular, &reference()).unwrap().game;
        assert_eq!(game.home_team_id, 1610612760);
        assert_eq!(game.home_team_abbreviation, "SEA");
        assert_eq!(game.date, NaiveDate::from_ymd_opt(2000, 1, 4).unwrap());
    }

    #[test]
    fn unknown_opponent_is_an_error() {
        let err = reconcile(&lakers_line("LAL vs. XYZ", "W", 240), SeasonType::Regular, &reference())
            .unwrap_err();
        assert_eq!(err, ReconcileError::UnknownTeam("XYZ".into()));
    }

    #[test]
    fn matchup_parsing() {
        assert_eq!(parse_matchup("BOS @ NYK").unwrap(), (Venue::Away, "NYK"));
        assert_eq!(parse_matchup("BOS vs. NYK ").unwrap(), (Venue::Home, "NYK"));
        assert!(parse_matchup("BOS").is_err());
    }

    #[test]
    fn missing_identity_fields() {
        let mut line = lakers_line("LAL vs. GSW", "W", 240);
        line.game_id = None;
        assert_eq!(
            reconcile(&line, SeasonType::Regular, &reference()).unwrap_err(),
            ReconcileError::MissingField("GAME_ID")
        );
    }
}
