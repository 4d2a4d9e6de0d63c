//! Normalized event model
//!
//! The reader builds these entities from a Scorer document, the reconciler
//! fills in places and adjusted scores, and the USEBIO writer only reads
//! them. Sections, boards and pairs live in ordered maps so that every walk
//! over the model visits them in the same order.

mod pair;
mod traveller;

pub use pair::{Direction, MasterPoints, MatchPoints, Pair, Player, Score};
pub use traveller::{Traveller, ADJUSTED_SCORE};

use crate::error::{ConvertError, ConvertResult};
use log::debug;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Program version reported when the source document does not carry one
pub const DEFAULT_PROGRAM_VERSION: &str = "140104020";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Club {
    pub name: String,
    pub number: String,
}

/// Scoring types Scorer can export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Individual,
    Pairs,
    SwissPairs,
    Teams,
    SwissTeams,
}

impl EventType {
    /// Map a Scorer `scoring_type` code
    pub fn from_scoring_type(code: &str) -> ConvertResult<Self> {
        match code.trim() {
            "MP" => Ok(EventType::Pairs),
            "INDIVIDUAL" => Ok(EventType::Individual),
            "SWISS_PAIRS" => Ok(EventType::SwissPairs),
            "TEAMS" => Ok(EventType::Teams),
            "SWISS_TEAMS" => Ok(EventType::SwissTeams),
            other => Err(ConvertError::InvalidEventType(format!(
                "unknown scoring type {:?}",
                other
            ))),
        }
    }

    /// USEBIO `EVENT_TYPE` value
    pub fn usebio_name(self) -> &'static str {
        match self {
            EventType::Individual => "INDIVIDUAL",
            EventType::Pairs => "MP_PAIRS",
            EventType::SwissPairs => "SWISS_PAIRS",
            EventType::Teams => "TEAMS_OF_FOUR",
            EventType::SwissTeams => "SWISS_TEAMS",
        }
    }

    /// USEBIO `BOARD_SCORING_METHOD` value, where one applies
    pub fn board_scoring_method(self) -> Option<&'static str> {
        match self {
            EventType::Pairs => Some("MATCH_POINTS"),
            _ => None,
        }
    }

    pub fn is_supported(self) -> bool {
        self == EventType::Pairs
    }

    /// Fail unless the engine can score this event type
    pub fn ensure_supported(self) -> ConvertResult<Self> {
        if self.is_supported() {
            Ok(self)
        } else {
            Err(ConvertError::InvalidEventType(format!(
                "{} events are not supported",
                self.usebio_name()
            )))
        }
    }
}

/// Number of winners: one overall, or one per direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinnerCount {
    One,
    Two,
}

impl WinnerCount {
    pub fn as_u8(self) -> u8 {
        match self {
            WinnerCount::One => 1,
            WinnerCount::Two => 2,
        }
    }
}

impl fmt::Display for WinnerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Section {
    pub id: String,
    pub handicapped: bool,
    /// Identities of the pairs in this section, in source order
    pub pairs: Vec<String>,
    pub boards: BTreeMap<u32, Vec<Traveller>>,
    ns_ids: BTreeMap<u32, String>,
    ew_ids: BTreeMap<u32, String>,
}

impl Section {
    pub fn new(id: impl Into<String>, handicapped: bool) -> Self {
        Self {
            id: id.into(),
            handicapped,
            ..Default::default()
        }
    }

    /// Record that raw pair `number` sitting `direction` is pair `id`
    pub fn set_pair_id(&mut self, direction: Direction, number: u32, id: &str) -> ConvertResult<()> {
        let table = match direction {
            Direction::NorthSouth => &mut self.ns_ids,
            Direction::EastWest => &mut self.ew_ids,
        };
        match table.entry(number) {
            Entry::Occupied(existing) => Err(ConvertError::DuplicatePairMapping {
                section: self.id.clone(),
                direction: direction.to_string(),
                number,
                existing: existing.get().clone(),
                id: id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(id.to_string());
                Ok(())
            }
        }
    }

    pub fn get_pair_id(&self, direction: Direction, number: u32) -> Option<&str> {
        let table = match direction {
            Direction::NorthSouth => &self.ns_ids,
            Direction::EastWest => &self.ew_ids,
        };
        table.get(&number).map(String::as_str)
    }

    /// Give each pair of this section its session-wide identity
    ///
    /// When every pair keeps a fixed direction the raw numbers restart per
    /// direction, so the direction is part of the identity (`3 NS`).
    /// Otherwise numbers are unique within the section and used alone.
    /// Sessions with several sections prefix the section id (`(A) 3`).
    pub fn assign_ids(&mut self, pairs: &mut [Pair], multi_section: bool) -> ConvertResult<()> {
        let consistent = pairs.iter().all(|pair| pair.direction.is_some());

        for pair in pairs.iter_mut() {
            let mut id = match (consistent, pair.direction) {
                (true, Some(direction)) => format!("{} {}", pair.number, direction),
                _ => pair.number.to_string(),
            };
            if multi_section {
                id = format!("({}) {}", self.id, id);
            }

            for direction in Direction::ALL {
                if pair.plays(direction) {
                    self.set_pair_id(direction, pair.number, &id)?;
                }
            }

            self.pairs.push(id.clone());
            pair.id = id;
        }

        debug!("Section {}: assigned {} pair ids", self.id, pairs.len());
        Ok(())
    }

    pub fn travellers(&self) -> impl Iterator<Item = &Traveller> {
        self.boards.values().flatten()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub sections: BTreeMap<String, Section>,
    /// Every pair in the session, keyed by identity
    pub pairs: BTreeMap<String, Pair>,
}

impl Session {
    /// True when no pair changes direction during the session
    pub fn has_consistent_seating(&self) -> bool {
        self.pairs.values().all(|pair| pair.direction.is_some())
    }

    pub fn winner_count(&self) -> WinnerCount {
        if self.has_consistent_seating() {
            WinnerCount::Two
        } else {
            WinnerCount::One
        }
    }

    /// Most boards played by any pair
    pub fn boards_played(&self) -> u32 {
        self.pairs
            .values()
            .map(|pair| pair.boards_played)
            .max()
            .unwrap_or(0)
    }

    pub fn section_pairs<'a>(&'a self, section: &'a Section) -> impl Iterator<Item = &'a Pair> {
        section.pairs.iter().filter_map(move |id| self.pairs.get(id))
    }

    pub fn travellers(&self) -> impl Iterator<Item = &Traveller> {
        self.sections.values().flat_map(Section::travellers)
    }

    pub fn travellers_mut(&mut self) -> impl Iterator<Item = &mut Traveller> {
        self.sections
            .values_mut()
            .flat_map(|section| section.boards.values_mut().flatten())
    }

    /// Reject pairs that share an identity or a partnership
    pub fn check_for_duplicates<'a, I>(pairs: I) -> ConvertResult<()>
    where
        I: IntoIterator<Item = &'a Pair>,
    {
        let mut ids = HashSet::new();
        let mut partnerships = HashSet::new();

        for pair in pairs {
            if !ids.insert(pair.id.as_str()) {
                return Err(ConvertError::DuplicatePair(format!(
                    "pair id {:?} is used more than once",
                    pair.id
                )));
            }
            let (first, second) = pair.partnership();
            if !partnerships.insert((first, second)) {
                return Err(ConvertError::DuplicatePair(format!(
                    "{} & {} appear as more than one pair",
                    first.name, second.name
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub club: Club,
    pub event_type: EventType,
    pub name: String,
    pub date: String,
    pub program_version: String,
    pub winner_count: WinnerCount,
    pub session: Session,
}

impl Event {
    pub fn new(
        club: Club,
        event_type: EventType,
        name: impl Into<String>,
        date: impl Into<String>,
        program_version: impl Into<String>,
        session: Session,
    ) -> ConvertResult<Self> {
        Ok(Self {
            club,
            event_type: event_type.ensure_supported()?,
            name: name.into(),
            date: date.into(),
            program_version: program_version.into(),
            winner_count: session.winner_count(),
            session,
        })
    }

    pub fn boards_played(&self) -> u32 {
        self.session.boards_played()
    }

    pub fn mps_awarded(&self) -> bool {
        self.session
            .pairs
            .values()
            .any(|pair| !pair.score.master_points.is_empty())
    }

    /// Ordering of pairs within a section's participant list
    ///
    /// Two-winner events list all NS pairs before the EW pairs.
    pub fn pair_key(pair: &Pair, two_winners: bool) -> (Option<Direction>, u32) {
        let group = if two_winners { pair.direction } else { None };
        (group, pair.number)
    }

    /// File name for the converted results, e.g.
    /// `16-11-2015-Monday_Afternoon_Pairs.xml`
    pub fn default_filename(&self) -> String {
        format!("{}-{}.xml", sanitise(&self.date), sanitise(&self.name))
    }
}

/// Keep ASCII letters and digits, turn `/` into `-` and spaces into `_`,
/// and drop everything else. The desktop converter kept other punctuation
/// such as `:`; here it is dropped.
fn sanitise(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() => Some(c),
            '/' => Some('-'),
            ' ' => Some('_'),
            _ => None,
        })
        .collect()
}
