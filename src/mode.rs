//! Run modes and the season scope each one selects.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};

use crate::upstream::{GameLogQuery, SeasonType};

/// First season with play-by-play coverage (1996-97).
pub const FIRST_PBP_SEASON: i32 = 1996;

pub const DEFAULT_INCREMENTAL_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Every season of the play-by-play era, no date filter.
    Backfill,
    /// Current season, games inside the trailing window only.
    Incremental,
    /// Current season, no date filter.
    WholeCurrentSeason,
}

impl RunMode {
    /// `whole_current_season` wins over `update` when both are set.
    pub fn from_flags(update: bool, whole_current_season: bool) -> Self {
        if whole_current_season {
            RunMode::WholeCurrentSeason
        } else if update {
            RunMode::Incremental
        } else {
            RunMode::Backfill
        }
    }
}

/// Starting year of the season `today` belongs to. Seasons tip off in
/// October.
pub fn season_for_date(today: NaiveDate) -> i32 {
    if today.month() >= 10 {
        today.year()
    } else {
        today.year() - 1
    }
}

/// Season ids and date predicate a run is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonScope {
    pub mode: RunMode,
    pub season_ids: BTreeSet<i32>,
    /// Single season requested from the provider, when the scope has one.
    pub season: Option<i32>,
    /// Earliest game date included.
    pub date_from: Option<NaiveDate>,
}

impl SeasonScope {
    pub fn new(mode: RunMode, today: NaiveDate, current_season: i32, window_days: i64) -> Self {
        let current_ids = || {
            SeasonType::ALL
                .iter()
                .map(|season_type| season_type.season_id(current_season))
                .collect::<BTreeSet<i32>>()
        };

        match mode {
            RunMode::Backfill => Self {
                mode,
                season_ids: (FIRST_PBP_SEASON..=current_season)
                    .flat_map(|season| {
                        SeasonType::ALL
                            .iter()
                            .map(move |season_type| season_type.season_id(season))
                    })
                    .collect(),
                season: None,
                date_from: None,
            },
            RunMode::Incremental => Self {
                mode,
                season_ids: current_ids(),
                season: Some(current_season),
                date_from: Some(today - Duration::days(window_days)),
            },
            RunMode::WholeCurrentSeason => Self {
                mode,
                season_ids: current_ids(),
                season: Some(current_season),
                date_from: None,
            },
        }
    }

    pub fn includes(&self, season_id: i32, date: NaiveDate) -> bool {
        self.season_ids.contains(&season_id) && self.date_from.map_or(true, |from| date >= from)
    }

    /// Game log requests for one team: regular season, then playoffs.
    pub fn game_log_queries(&self, team_id: i64) -> [GameLogQuery; 2] {
        SeasonType::ALL.map(|season_type| GameLogQuery {
            team_id,
            season_type,
            season: self.season,
            date_from: self.date_from,
        })
    }
}
