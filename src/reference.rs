//! Immutable team and player reference data, loaded once per run.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::info;

use crate::error::ReferenceError;
use crate::store::IngestStore;
use crate::upstream::PlayerRecord;

/// One abbreviation a franchise has used during the play-by-play era.
///
/// Seasons are identified by their starting year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FranchiseAlias {
    pub abbreviation: &'static str,
    pub team_id: i64,
    pub nickname: &'static str,
    pub first_season: u16,
    pub last_season: Option<u16>,
}

impl FranchiseAlias {
    pub fn active_in(&self, season: u16) -> bool {
        season >= self.first_season && self.last_season.map_or(true, |last| season <= last)
    }
}

const fn alias(
    abbreviation: &'static str,
    team_id: i64,
    nickname: &'static str,
    first_season: u16,
    last_season: Option<u16>,
) -> FranchiseAlias {
    FranchiseAlias {
        abbreviation,
        team_id,
        nickname,
        first_season,
        last_season,
    }
}

/// Every abbreviation used since the 1996-97 season.
pub const FRANCHISE_ALIASES: &[FranchiseAlias] = &[
    alias("ATL", 1610612737, "Hawks", 1996, None),
    alias("BOS", 1610612738, "Celtics", 1996, None),
    alias("CLE", 1610612739, "Cavaliers", 1996, None),
    alias("NOH", 1610612740, "Hornets", 2002, Some(2004)),
    alias("NOK", 1610612740, "Hornets", 2005, Some(2006)),
    alias("NOH", 1610612740, "Hornets", 2007, Some(2012)),
    alias("NOP", 1610612740, "Pelicans", 2013, None),
    alias("CHI", 1610612741, "Bulls", 1996, None),
    alias("DAL", 1610612742, "Mavericks", 1996, None),
    alias("DEN", 1610612743, "Nuggets", 1996, None),
    alias("GSW", 1610612744, "Warriors", 1996, None),
    alias("HOU", 1610612745, "Rockets", 1996, None),
    alias("LAC", 1610612746, "Clippers", 1996, None),
    alias("LAL", 1610612747, "Lakers", 1996, None),
    alias("MIA", 1610612748, "Heat", 1996, None),
    alias("MIL", 1610612749, "Bucks", 1996, None),
    alias("MIN", 1610612750, "Timberwolves", 1996, None),
    alias("NJN", 1610612751, "Nets", 1996, Some(2011)),
    alias("BKN", 1610612751, "Nets", 2012, None),
    alias("NYK", 1610612752, "Knicks", 1996, None),
    alias("ORL", 1610612753, "Magic", 1996, None),
    alias("IND", 1610612754, "Pacers", 1996, None),
    alias("PHI", 1610612755, "76ers", 1996, None),
    alias("PHX", 1610612756, "Suns", 1996, None),
    alias("POR", 1610612757, "Trail Blazers", 1996, None),
    alias("SAC", 1610612758, "Kings", 1996, None),
    alias("SAS", 1610612759, "Spurs", 1996, None),
    alias("SEA", 1610612760, "SuperSonics", 1996, Some(2007)),
    alias("OKC", 1610612760, "Thunder", 2008, None),
    alias("TOR", 1610612761, "Raptors", 1996, None),
    alias("UTA", 1610612762, "Jazz", 1996, None),
    alias("VAN", 1610612763, "Grizzlies", 1996, Some(2000)),
    alias("MEM", 1610612763, "Grizzlies", 2001, None),
    alias("WAS", 1610612764, "Wizards", 1996, None),
    alias("DET", 1610612765, "Pistons", 1996, None),
    alias("CHH", 1610612766, "Hornets", 1996, Some(2001)),
    alias("CHA", 1610612766, "Hornets", 2004, None),
];

/// A row of the team index table: one abbreviation of one franchise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamAlias {
    pub team_id: i64,
    pub abbreviation: String,
    pub nickname: String,
}

/// A franchise with every abbreviation it has been known by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: i64,
    pub abbreviation: String,
    pub aliases: Vec<String>,
    pub nickname: String,
}

/// A row of the player table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: i64,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
}

impl Player {
    /// `None` when the record has no usable id.
    pub fn from_record(record: &PlayerRecord) -> Option<Self> {
        let id = record.person_id.filter(|id| *id > 0)?;
        let (last_name, first_name) = match record.display_last_comma_first.as_deref() {
            Some(name) => match name.split_once(',') {
                Some((last, first)) => (last.trim().to_string(), first.trim().to_string()),
                None => (name.trim().to_string(), String::new()),
            },
            None => (String::new(), String::new()),
        };
        let full_name = record
            .display_first_last
            .clone()
            .unwrap_or_else(|| format!("{first_name} {last_name}").trim().to_string());

        Some(Self {
            id,
            full_name,
            first_name,
            last_name,
            is_active: record.rosterstatus == Some(1),
        })
    }
}

/// Rows for the team index table, one per distinct abbreviation.
pub fn franchise_index() -> Vec<TeamAlias> {
    let mut seen = HashSet::new();
    FRANCHISE_ALIASES
        .iter()
        .filter(|alias| seen.insert(alias.abbreviation))
        .map(|alias| TeamAlias {
            team_id: alias.team_id,
            abbreviation: alias.abbreviation.to_string(),
            nickname: alias.nickname.to_string(),
        })
        .collect()
}

/// Franchises as of the latest era, with their historical aliases.
pub fn franchises() -> Vec<Team> {
    let mut teams: Vec<Team> = Vec::new();
    for alias in FRANCHISE_ALIASES {
        let index = match teams.iter().position(|team| team.id == alias.team_id) {
            Some(index) => index,
            None => {
                teams.push(Team {
                    id: alias.team_id,
                    abbreviation: alias.abbreviation.to_string(),
                    aliases: Vec::new(),
                    nickname: alias.nickname.to_string(),
                });
                teams.len() - 1
            }
        };
        let team = &mut teams[index];
        if alias.last_season.is_none() {
            team.abbreviation = alias.abbreviation.to_string();
            team.nickname = alias.nickname.to_string();
        }
        if !team.aliases.iter().any(|a| a == alias.abbreviation) {
            team.aliases.push(alias.abbreviation.to_string());
        }
    }
    teams
}

/// Snapshot of the reference tables for the duration of one run.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    teams_by_abbreviation: HashMap<String, i64>,
    team_ids: BTreeSet<i64>,
    player_ids: HashSet<i64>,
}

impl ReferenceData {
    pub fn new(
        aliases: impl IntoIterator<Item = TeamAlias>,
        player_ids: impl IntoIterator<Item = i64>,
    ) -> Result<Self, ReferenceError> {
        let mut teams_by_abbreviation = HashMap::new();
        let mut team_ids = BTreeSet::new();

        for alias in aliases {
            let abbreviation = alias.abbreviation.trim().to_ascii_uppercase();
            match teams_by_abbreviation.get(&abbreviation) {
                Some(&existing) if existing != alias.team_id => {
                    return Err(ReferenceError::AmbiguousAlias {
                        abbreviation,
                        first: existing,
                        second: alias.team_id,
                    });
                }
                _ => {
                    teams_by_abbreviation.insert(abbreviation, alias.team_id);
                    team_ids.insert(alias.team_id);
                }
            }
        }

        let player_ids: HashSet<i64> = player_ids.into_iter().collect();

        if team_ids.is_empty() {
            return Err(ReferenceError::Empty("teams"));
        }
        if player_ids.is_empty() {
            return Err(ReferenceError::Empty("players"));
        }

        Ok(Self {
            teams_by_abbreviation,
            team_ids,
            player_ids,
        })
    }

    /// Load both reference sets. Any failure aborts the run before a single
    /// game is touched.
    pub async fn load<S: IngestStore>(store: &S) -> Result<Self, ReferenceError> {
        info!("Loading team index");
        let aliases = store.load_team_index().await?;
        info!("Loading player ids");
        let player_ids = store.load_player_ids().await?;

        let reference = Self::new(aliases, player_ids)?;
        info!(
            "Reference data loaded: {} teams, {} abbreviations, {} players",
            reference.team_ids.len(),
            reference.teams_by_abbreviation.len(),
            reference.player_ids.len()
        );
        Ok(reference)
    }

    pub fn resolve_opponent(&self, abbreviation: &str) -> Option<i64> {
        self.teams_by_abbreviation
            .get(abbreviation.trim().to_ascii_uppercase().as_str())
            .copied()
    }

    pub fn is_known_player(&self, id: i64) -> bool {
        self.player_ids.contains(&id)
    }

    /// Keep `candidate` only if it names a known player.
    pub fn known_player(&self, candidate: Option<i64>) -> Option<i64> {
        candidate.filter(|id| self.is_known_player(*id))
    }

    /// Distinct franchise ids in ascending order.
    pub fn team_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.team_ids.iter().copied()
    }
}
