//! Pairs, players and their scores

use crate::decimal::Decimal;
use crate::error::{ConvertError, ConvertResult};
use num_rational::Ratio;
use std::fmt;
use std::str::FromStr;

/// Final and raw percentages closer than this are treated as equal
const ADJUSTMENT_TOLERANCE: Decimal = Decimal::new(1, 2);

/// Fixed seating direction of a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    NorthSouth,
    EastWest,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::NorthSouth, Direction::EastWest];

    /// Decode a Scorer `dir` attribute
    ///
    /// `H` (hesitant/roaming) and a blank or absent code mean the pair moves
    /// between directions during the session.
    pub fn from_code(code: Option<&str>) -> ConvertResult<Option<Direction>> {
        match code.map(str::trim) {
            Some("N") => Ok(Some(Direction::NorthSouth)),
            Some("E") => Ok(Some(Direction::EastWest)),
            Some("H") | Some("") | None => Ok(None),
            Some(other) => Err(ConvertError::InvalidDirection(other.to_string())),
        }
    }

    /// USEBIO direction string
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::NorthSouth => "NS",
            Direction::EastWest => "EW",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Player {
    pub name: String,
    pub national_id: Option<String>,
}

impl Player {
    pub fn new(name: impl Into<String>, national_id: Option<String>) -> Self {
        Self {
            name: name.into(),
            national_id: national_id.filter(|id| !id.is_empty()),
        }
    }
}

/// A master point award, e.g. 3 points of type `a`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterPoints {
    pub award_type: String,
    pub points: Decimal,
}

impl MasterPoints {
    pub fn new(award_type: impl Into<String>, points: Decimal) -> Self {
        Self {
            award_type: award_type.into(),
            points,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    /// 1-based rank, filled in by reconciliation
    pub place: Option<u32>,
    /// Final percentage
    pub total: Decimal,
    pub adjustment: Option<Decimal>,
    /// Zero for unhandicapped sections
    pub handicap: Decimal,
    pub master_points: Vec<MasterPoints>,
}

impl Score {
    /// Build a score, checking the handicap against the section flag
    ///
    /// The adjustment is whatever separates the final score from the raw
    /// score plus handicap, ignoring differences of up to 0.01 (Scorer
    /// rounds the two independently).
    pub fn new(
        total: Decimal,
        raw: Decimal,
        handicap: Decimal,
        handicapped: bool,
        master_points: Vec<MasterPoints>,
    ) -> ConvertResult<Self> {
        if handicapped == handicap.is_zero() {
            return Err(ConvertError::HandicapMismatch {
                handicapped,
                handicap: handicap.to_string(),
            });
        }

        let delta = raw
            .checked_add(handicap)
            .and_then(|expected| total.checked_sub(expected))
            .ok_or_else(|| {
                ConvertError::OutOfRange(format!(
                    "score {} against raw {} and handicap {}",
                    total, raw, handicap
                ))
            })?;
        let adjustment = if delta.abs() > ADJUSTMENT_TOLERANCE {
            Some(delta)
        } else {
            None
        };

        Ok(Self {
            place: None,
            total,
            adjustment,
            handicap,
            master_points,
        })
    }
}

/// A pair's raw match point tally, `scored/available`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPoints {
    pub scored: i64,
    pub available: i64,
}

impl MatchPoints {
    pub fn new(scored: i64, available: i64) -> Self {
        Self { scored, available }
    }

    /// Percentage of available match points, to 2 decimal places
    ///
    /// A pair with nothing available (a sit-out) scores zero.
    pub fn percentage(&self) -> Decimal {
        if self.available == 0 {
            return Decimal::new(0, 2);
        }
        let ratio = Ratio::new(self.scored, self.available) * Ratio::from_integer(100);
        Decimal::from_ratio(*ratio.numer(), *ratio.denom(), 2).unwrap_or_default()
    }
}

impl FromStr for MatchPoints {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConvertError::InvalidMatchPoints(s.to_string());
        let mut parts = s.split('/');
        let (scored, available) = match (parts.next(), parts.next(), parts.next()) {
            (Some(scored), Some(available), None) => (scored, available),
            _ => return Err(invalid()),
        };
        let scored: u32 = scored.trim().parse().map_err(|_| invalid())?;
        let available: u32 = available.trim().parse().map_err(|_| invalid())?;
        Ok(Self::new(scored.into(), available.into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    /// Session-wide identity, e.g. `3 NS` or `(B) 7`
    pub id: String,
    pub number: u32,
    /// `None` for a pair that changes direction during the session
    pub direction: Option<Direction>,
    pub boards_played: u32,
    pub players: [Player; 2],
    pub score: Score,
    pub match_points: Option<MatchPoints>,
}

impl Pair {
    pub fn new(
        number: u32,
        direction: Option<Direction>,
        players: [Player; 2],
        score: Score,
        match_points: Option<MatchPoints>,
    ) -> Self {
        Self {
            id: String::new(),
            number,
            direction,
            boards_played: 0,
            players,
            score,
            match_points,
        }
    }

    /// Whether this pair ever sits in `direction`
    pub fn plays(&self, direction: Direction) -> bool {
        self.direction.map_or(true, |d| d == direction)
    }

    /// Percentage used for ranking
    pub fn ranking_percentage(&self) -> Decimal {
        match &self.match_points {
            Some(mp) => mp.percentage(),
            None => self.score.total,
        }
    }

    /// The two players in a fixed order, so `A & B` and `B & A` compare equal
    pub fn partnership(&self) -> (&Player, &Player) {
        let [first, second] = &self.players;
        if first <= second {
            (first, second)
        } else {
            (second, first)
        }
    }
}
