//! Game clock values as delivered by the live play-by-play feed.
//!
//! The feed encodes the remaining period time as an ISO 8601 duration such
//! as `PT11M04.30S`.

use std::fmt;
use std::str::FromStr;

use sqlx::postgres::types::PgInterval;

use crate::error::ClockError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameClock {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub microseconds: u32,
}

impl GameClock {
    /// `None` when the clock does not fit an interval.
    pub fn checked_total_microseconds(&self) -> Option<i64> {
        i64::from(self.hours)
            .checked_mul(60)?
            .checked_add(i64::from(self.minutes))?
            .checked_mul(60)?
            .checked_add(i64::from(self.seconds))?
            .checked_mul(1_000_000)?
            .checked_add(i64::from(self.microseconds))
    }

    /// Saturates at `i64::MAX`. Parsed clocks always fit.
    pub fn total_microseconds(&self) -> i64 {
        self.checked_total_microseconds().unwrap_or(i64::MAX)
    }

    pub fn to_interval(&self) -> PgInterval {
        PgInterval {
            months: 0,
            days: 0,
            microseconds: self.total_microseconds(),
        }
    }
}

impl fmt::Display for GameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:06}",
            self.hours, self.minutes, self.seconds, self.microseconds
        )
    }
}

impl FromStr for GameClock {
    type Err = ClockError;

    /// Accepts `PT[<n>H][<n>M][<n>[.<n>]S]` with at least one component.
    fn from_str(duration: &str) -> Result<Self, Self::Err> {
        let invalid = || ClockError(duration.to_string());

        let mut rest = duration.strip_prefix("PT").ok_or_else(invalid)?;
        if rest.is_empty() {
            return Err(invalid());
        }

        let mut clock = GameClock::default();
        let mut seen_minutes = false;
        let mut seen_hours = false;

        while !rest.is_empty() {
            let digits = rest
                .find(|c: char| !c.is_ascii_digit() && c != '.')
                .ok_or_else(invalid)?;
            let (number, tail) = rest.split_at(digits);
            if number.is_empty() {
                return Err(invalid());
            }
            let mut chars = tail.chars();
            let designator = chars.next().ok_or_else(invalid)?;
            rest = chars.as_str();

            match designator {
                'H' if !seen_hours && !seen_minutes => {
                    clock.hours = whole(number).ok_or_else(invalid)?;
                    seen_hours = true;
                }
                'M' if !seen_minutes => {
                    clock.minutes = whole(number).ok_or_else(invalid)?;
                    seen_hours = true;
                    seen_minutes = true;
                }
                'S' if rest.is_empty() => {
                    let (seconds, microseconds) = fractional(number).ok_or_else(invalid)?;
                    clock.seconds = seconds;
                    clock.microseconds = microseconds;
                }
                _ => return Err(invalid()),
            }
        }

        clock.checked_total_microseconds().ok_or_else(invalid)?;
        Ok(clock)
    }
}

fn whole(number: &str) -> Option<u32> {
    if number.contains('.') {
        return None;
    }
    number.parse().ok()
}

/// Splits `4.30` into `(4, 300000)`. Digits past microsecond precision are
/// truncated.
fn fractional(number: &str) -> Option<(u32, u32)> {
    let (int_part, frac_part) = match number.split_once('.') {
        Some((int_part, frac_part)) if !frac_part.is_empty() && !frac_part.contains('.') => {
            (int_part, frac_part)
        }
        Some(_) => return None,
        None => (number, ""),
    };
    let seconds = whole(int_part)?;

    let mut micros = String::with_capacity(6);
    micros.extend(frac_part.chars().take(6));
    while micros.len() < 6 {
        micros.push('0');
    }
    Some((seconds, micros.parse().ok()?))
}
