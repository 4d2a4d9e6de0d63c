//! Traveller lines: one board played between an NS and an EW pair

use crate::decimal::Decimal;
use crate::error::{ConvertError, ConvertResult};

/// Score display Scorer writes for a director-adjusted board
pub const ADJUSTED_SCORE: &str = "Adj";

#[derive(Debug, Clone, PartialEq)]
pub struct Traveller {
    /// Session-wide pair identities
    pub ns: String,
    pub ew: String,
    pub contract: String,
    pub declarer: String,
    pub lead: String,
    pub tricks: u8,
    /// Score display, e.g. `420`, `-50`, or `Adj` until reconciled
    pub score: String,
    pub ns_match_points: Decimal,
    pub ew_match_points: Decimal,
}

impl Traveller {
    pub fn is_adjusted(&self) -> bool {
        self.score == ADJUSTED_SCORE
    }

    /// Match points awarded on this line, both directions together
    pub fn match_point_total(&self) -> Option<Decimal> {
        self.ns_match_points.checked_add(self.ew_match_points)
    }

    /// Tricks taken by declarer
    ///
    /// `contract` is `"<level> <denomination> [X|XX]"`; anything shorter is a
    /// passed-out or void board and takes no tricks. `result` is `=`, `+N`
    /// or `-N` relative to the contract.
    pub fn trick_count(contract: &str, result: &str) -> ConvertResult<u8> {
        let invalid = || ConvertError::InvalidTricks {
            contract: contract.to_string(),
            result: result.to_string(),
        };

        let tokens: Vec<&str> = contract.split_whitespace().collect();
        if tokens.len() < 2 {
            return Ok(0);
        }

        let level: i32 = tokens[0].parse().map_err(|_| invalid())?;
        let offset: i32 = match result.trim() {
            "=" => 0,
            other => other.parse().map_err(|_| invalid())?,
        };

        let tricks = level + 6 + offset;
        if !(0..=13).contains(&tricks) {
            return Err(invalid());
        }
        Ok(tricks as u8)
    }
}
