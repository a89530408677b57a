//! Decoding of live play-by-play actions into normalized events.
//!
//! Each action is decoded into a tagged [`EventDetail`] carrying only the
//! fields meaningful for its kind. The nullable-column shape of the
//! `pbp_raw_event` table only appears in [`RawEventRow`], built at the
//! persistence boundary.

use tracing::warn;

use crate::clock::GameClock;
use crate::error::{ClockError, IngestError};
use crate::reconcile::Game;
use crate::reference::ReferenceData;
use crate::upstream::{PlayByPlayAction, SeasonType};

/// Periods beyond this are overtime.
pub const REGULATION_PERIODS: i32 = 4;

/// Game-level values stamped onto every event of the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameContext {
    pub game_id: i64,
    pub season_id: i32,
    pub season_type: SeasonType,
    pub home_team_id: i64,
    pub home_team_abbreviation: String,
    pub away_team_id: i64,
    pub away_team_abbreviation: String,
}

impl From<&Game> for GameContext {
    fn from(game: &Game) -> Self {
        Self {
            game_id: game.id,
            season_id: game.season_id,
            season_type: game.season_type,
            home_team_id: game.home_team_id,
            home_team_abbreviation: game.home_team_abbreviation.clone(),
            away_team_id: game.away_team_id,
            away_team_abbreviation: game.away_team_abbreviation.clone(),
        }
    }
}

/// Fields every event carries regardless of kind.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBase {
    pub event_num: i64,
    pub event_type: Option<String>,
    pub event_subtype: Option<String>,
    pub period: Option<i32>,
    pub clock: Option<GameClock>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub possession_team_id: Option<i64>,
    pub possession_team_abbreviation: Option<String>,
    pub event_team_id: Option<i64>,
    pub event_team_abbreviation: Option<String>,
    pub is_overtime: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldGoal {
    pub value: i32,
    pub shooter_id: Option<i64>,
    pub assister_id: Option<i64>,
    /// Only set on misses.
    pub blocker_id: Option<i64>,
    pub made: bool,
    pub side: Option<String>,
    pub descriptor: Option<String>,
    pub area: Option<String>,
    pub area_detail: Option<String>,
    pub distance: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventDetail {
    FreeThrow {
        shooter_id: Option<i64>,
        made: bool,
    },
    FieldGoal(FieldGoal),
    JumpBall {
        winner_id: Option<i64>,
        loser_id: Option<i64>,
        recovered_id: Option<i64>,
    },
    Turnover {
        player_id: Option<i64>,
        /// No player was charged.
        team_turnover: bool,
        stealer_id: Option<i64>,
        area: Option<String>,
        area_detail: Option<String>,
    },
    Foul {
        technical: bool,
        offensive: bool,
        personal: bool,
        drawn_by_id: Option<i64>,
        fouler_id: Option<i64>,
    },
    Substitution {
        sub_in_id: Option<i64>,
        sub_out_id: Option<i64>,
    },
    Rebound {
        rebounder_id: Option<i64>,
        team_rebound: bool,
        offensive: bool,
    },
    Violation {
        team_turnover: bool,
    },
    /// Any action type without kind-specific fields.
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub base: EventBase,
    pub detail: EventDetail,
}

fn is(value: &Option<String>, expected: &str) -> bool {
    value.as_deref() == Some(expected)
}

/// Decode one action. Malformed actor ids and numbers become `None`; only a
/// malformed clock is an error.
pub fn decode_event(
    event_num: i64,
    action: &PlayByPlayAction,
    game: &GameContext,
    reference: &ReferenceData,
) -> Result<DecodedEvent, ClockError> {
    let player = |candidate: Option<i64>| reference.known_player(candidate);

    let clock = action
        .clock
        .as_deref()
        .map(str::parse::<GameClock>)
        .transpose()?;

    let possession_team_abbreviation = match action.possession {
        Some(id) if id == game.home_team_id => Some(game.home_team_abbreviation.clone()),
        Some(id) if id == game.away_team_id => Some(game.away_team_abbreviation.clone()),
        _ => None,
    };

    let base = EventBase {
        event_num,
        event_type: action.action_type.clone(),
        event_subtype: action.sub_type.clone(),
        period: action.period,
        clock,
        home_score: action.score_home,
        away_score: action.score_away,
        possession_team_id: action.possession,
        possession_team_abbreviation,
        event_team_id: action.team_id,
        event_team_abbreviation: action.team_tricode.clone(),
        is_overtime: action.period.is_some_and(|period| period > REGULATION_PERIODS),
    };

    let made = is(&action.shot_result, "Made");
    let sub_type = &action.sub_type;

    let detail = match action.action_type.as_deref() {
        Some("freethrow") => EventDetail::FreeThrow {
            shooter_id: player(action.person_id),
            made,
        },
        _ if action.is_field_goal => EventDetail::FieldGoal(FieldGoal {
            value: if is(&action.action_type, "2pt") { 2 } else { 3 },
            shooter_id: player(action.person_id),
            assister_id: player(action.assist_person_id),
            blocker_id: if made {
                None
            } else {
                player(action.block_person_id)
            },
            made,
            side: action.side.clone(),
            descriptor: action.descriptor.clone(),
            area: action.area.clone(),
            area_detail: action.area_detail.clone(),
            distance: action.shot_distance,
            x: action.x,
            y: action.y,
        }),
        Some("jumpball") => EventDetail::JumpBall {
            winner_id: player(action.jump_ball_won_person_id),
            loser_id: player(action.jump_ball_lost_person_id),
            recovered_id: player(action.jump_ball_recovered_person_id),
        },
        Some("turnover") => {
            // The feed marks team turnovers with no person or person 0.
            EventDetail::Turnover {
                player_id: player(action.person_id),
                team_turnover: action.person_id.map_or(true, |id| id == 0),
                stealer_id: player(action.steal_person_id),
                area: action.area.clone(),
                area_detail: action.area_detail.clone(),
            }
        }
        Some("foul") => {
            let offensive = is(sub_type, "offensive");
            EventDetail::Foul {
                technical: is(sub_type, "technical"),
                offensive,
                personal: is(sub_type, "personal") || offensive,
                drawn_by_id: player(action.foul_drawn_person_id),
                fouler_id: player(action.person_id),
            }
        }
        Some("substitution") => EventDetail::Substitution {
            sub_in_id: if is(sub_type, "in") {
                player(action.person_id)
            } else {
                None
            },
            sub_out_id: if is(sub_type, "out") {
                player(action.person_id)
            } else {
                None
            },
        },
        Some("rebound") => {
            let rebounder_id = player(action.person_id);
            EventDetail::Rebound {
                rebounder_id,
                team_rebound: rebounder_id.is_none(),
                offensive: is(sub_type, "offensive"),
            }
        }
        Some("violation") => EventDetail::Violation {
            team_turnover: action.qualifiers.iter().any(|q| q == "team"),
        },
        _ => EventDetail::Other,
    };

    Ok(DecodedEvent { base, detail })
}

/// Decode a game's actions in feed order.
///
/// Actions without an action number cannot be keyed and are skipped. A bad
/// clock aborts the whole game.
pub fn decode_game(
    game: &GameContext,
    actions: &[PlayByPlayAction],
    reference: &ReferenceData,
) -> Result<Vec<DecodedEvent>, IngestError> {
    let mut events = Vec::with_capacity(actions.len());
    for action in actions {
        let Some(event_num) = action.action_number else {
            warn!(
                "Skipping action without an action number in game {}: {:?}",
                game.game_id, action.action_type
            );
            continue;
        };
        let event = decode_event(event_num, action, game, reference).map_err(|source| {
            IngestError::Decode {
                game_id: game.game_id,
                event_num,
                source,
            }
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Flat row of the `pbp_raw_event` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEventRow {
    pub game_id: i64,
    pub season_id: i32,
    pub season_type: String,
    pub event_num: i64,
    pub event_type: Option<String>,
    pub event_subtype: Option<String>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub period: Option<i32>,
    pub clock: Option<GameClock>,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub home_team_abrev: String,
    pub away_team_abrev: String,
    pub possession_team_id: Option<i64>,
    pub possession_team_abrev: Option<String>,
    pub event_team_id: Option<i64>,
    pub event_team_abrev: Option<String>,
    pub is_overtime: bool,
    pub shooter_id: Option<i64>,
    pub assister_id: Option<i64>,
    pub jump_ball_winner_id: Option<i64>,
    pub jump_ball_loser_id: Option<i64>,
    pub jump_ball_recovered_id: Option<i64>,
    pub rebounder_id: Option<i64>,
    pub turnover_id: Option<i64>,
    pub foul_drawn_id: Option<i64>,
    pub fouler_id: Option<i64>,
    pub stealer_id: Option<i64>,
    pub blocker_id: Option<i64>,
    pub sub_in_id: Option<i64>,
    pub sub_out_id: Option<i64>,
    pub foul_is_technical: Option<bool>,
    pub foul_is_personal: Option<bool>,
    pub foul_is_offensive: Option<bool>,
    pub team_turnover: Option<bool>,
    pub team_rebound: Option<bool>,
    pub offensive_rebound: Option<bool>,
    pub side: Option<String>,
    pub descriptor: Option<String>,
    pub area: Option<String>,
    pub area_detail: Option<String>,
    pub shot_distance: Option<f64>,
    pub shot_made: Option<bool>,
    pub shot_value: Option<i32>,
    pub shot_x: Option<f64>,
    pub shot_y: Option<f64>,
}

impl RawEventRow {
    pub fn new(game: &GameContext, event: &DecodedEvent) -> Self {
        let base = &event.base;
        let mut row = RawEventRow {
            game_id: game.game_id,
            season_id: game.season_id,
            season_type: game.season_type.tag().to_string(),
            event_num: base.event_num,
            event_type: base.event_type.clone(),
            event_subtype: base.event_subtype.clone(),
            home_score: base.home_score,
            away_score: base.away_score,
            period: base.period,
            clock: base.clock,
            home_team_id: game.home_team_id,
            away_team_id: game.away_team_id,
            home_team_abrev: game.home_team_abbreviation.clone(),
            away_team_abrev: game.away_team_abbreviation.clone(),
            possession_team_id: base.possession_team_id,
            possession_team_abrev: base.possession_team_abbreviation.clone(),
            event_team_id: base.event_team_id,
            event_team_abrev: base.event_team_abbreviation.clone(),
            is_overtime: base.is_overtime,
            ..RawEventRow::default()
        };

        match &event.detail {
            EventDetail::FreeThrow { shooter_id, made } => {
                row.shot_value = Some(1);
                row.shooter_id = *shooter_id;
                row.shot_made = Some(*made);
            }
            EventDetail::FieldGoal(shot) => {
                row.shot_value = Some(shot.value);
                row.shooter_id = shot.shooter_id;
                row.assister_id = shot.assister_id;
                row.blocker_id = shot.blocker_id;
                row.shot_made = Some(shot.made);
                row.side = shot.side.clone();
                row.descriptor = shot.descriptor.clone();
                row.area = shot.area.clone();
                row.area_detail = shot.area_detail.clone();
                row.shot_distance = shot.distance;
                row.shot_x = shot.x;
                row.shot_y = shot.y;
            }
            EventDetail::JumpBall {
                winner_id,
                loser_id,
                recovered_id,
            } => {
                row.jump_ball_winner_id = *winner_id;
                row.jump_ball_loser_id = *loser_id;
                row.jump_ball_recovered_id = *recovered_id;
            }
            EventDetail::Turnover {
                player_id,
                team_turnover,
                stealer_id,
                area,
                area_detail,
            } => {
                row.turnover_id = *player_id;
                row.team_turnover = Some(*team_turnover);
                row.stealer_id = *stealer_id;
                row.area = area.clone();
                row.area_detail = area_detail.clone();
            }
            EventDetail::Foul {
                technical,
                offensive,
                personal,
                drawn_by_id,
                fouler_id,
            } => {
                row.foul_is_technical = Some(*technical);
                row.foul_is_offensive = Some(*offensive);
                row.foul_is_personal = Some(*personal);
                row.foul_drawn_id = *drawn_by_id;
                row.fouler_id = *fouler_id;
            }
            EventDetail::Substitution {
                sub_in_id,
                sub_out_id,
            } => {
                row.sub_in_id = *sub_in_id;
                row.sub_out_id = *sub_out_id;
            }
            EventDetail::Rebound {
                rebounder_id,
                team_rebound,
                offensive,
            } => {
                row.rebounder_id = *rebounder_id;
                row.team_rebound = Some(*team_rebound);
                row.offensive_rebound = Some(*offensive);
            }
            EventDetail::Violation { team_turnover } => {
                row.team_turnover = Some(*team_turnover);
            }
            EventDetail::Other => {}
        }

        row
    }
}
