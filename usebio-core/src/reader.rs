//! Scorer XML reader
//!
//! Builds a [`Session`] from a Scorer results document in three passes.
//! Sections must exist before pairs can be filed under them, and pair
//! identities must exist before board results can refer to them, so each
//! pass is a separate builder step:
//!
//! ```text
//! SessionBuilder::read_sections ──▶ read_pairs ──▶ PairedSession::read_boards ──▶ Session
//! ```

use crate::decimal::Decimal;
use crate::error::{ConvertError, ConvertResult};
use crate::model::{
    Club, Direction, Event, EventType, MasterPoints, MatchPoints, Pair, Player, Score, Section,
    Session, Traveller, DEFAULT_PROGRAM_VERSION,
};
use log::{debug, error};
use roxmltree::Node;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Raw match point value Scorer writes for a board against a phantom pair
pub const PHANTOM_MATCH_POINTS: i64 = -1;

const MASTER_POINT_TYPES: [&str; 3] = ["a", "b", "c"];

/// Event-level metadata from the root `<session>` element
#[derive(Debug, Clone)]
pub struct EventHeader {
    pub club: Club,
    pub event_type: EventType,
    pub name: String,
    pub date: String,
    pub program_version: String,
}

impl EventHeader {
    /// Read the root attributes, failing early for unscorable event types
    pub fn read(root: Node) -> ConvertResult<Self> {
        let event_type =
            EventType::from_scoring_type(attr(root, "scoring_type").unwrap_or(""))?.ensure_supported()?;

        Ok(Self {
            club: Club {
                name: attr(root, "club").unwrap_or("").to_string(),
                number: attr(root, "club_no").unwrap_or("").to_string(),
            },
            event_type,
            name: attr(root, "event_name").unwrap_or("").to_string(),
            date: attr(root, "event_date").unwrap_or("").to_string(),
            program_version: attr(root, "version")
                .unwrap_or(DEFAULT_PROGRAM_VERSION)
                .to_string(),
        })
    }

    pub fn into_event(self, session: Session) -> ConvertResult<Event> {
        Event::new(
            self.club,
            self.event_type,
            self.name,
            self.date,
            self.program_version,
            session,
        )
    }
}

/// Read all three passes of a session
pub fn read_session(root: Node) -> ConvertResult<Session> {
    SessionBuilder::read_sections(root)?
        .read_pairs(root)?
        .read_boards(root)
}

/// First pass: the declared sections
#[derive(Debug)]
pub struct SessionBuilder {
    sections: BTreeMap<String, Section>,
}

impl SessionBuilder {
    pub fn read_sections(root: Node) -> ConvertResult<Self> {
        let mut sections = BTreeMap::new();

        for node in grandchildren(root, "sections", "section") {
            let id = required(node, "sectid")?;
            let handicapped = attr(node, "handicapped").map_or(false, is_true);
            match sections.entry(id.to_string()) {
                Entry::Occupied(_) => {
                    return Err(invalid_value(node, "sectid", id));
                }
                Entry::Vacant(slot) => {
                    slot.insert(Section::new(id, handicapped));
                }
            }
        }

        debug!("Read {} sections", sections.len());
        Ok(Self { sections })
    }

    /// Second pass: pairs and their scores, with identities assigned
    pub fn read_pairs(mut self, root: Node) -> ConvertResult<PairedSession> {
        let multi_section = self.sections.len() > 1;
        let mut all_pairs = Vec::new();

        for scsection in grandchildren(root, "scores", "scsection") {
            let id = required(scsection, "sectid")?;
            let section = self
                .sections
                .get_mut(id)
                .ok_or_else(|| ConvertError::UnknownSection(id.to_string()))?;

            let mut pairs = children(scsection, "pair")
                .map(|node| read_pair(node, section.handicapped))
                .collect::<ConvertResult<Vec<_>>>()?;
            section.assign_ids(&mut pairs, multi_section)?;
            all_pairs.extend(pairs);
        }

        Session::check_for_duplicates(&all_pairs)?;
        debug!("Read {} pairs", all_pairs.len());

        let pairs = all_pairs
            .into_iter()
            .map(|pair| (pair.id.clone(), pair))
            .collect();
        Ok(PairedSession {
            session: Session {
                sections: self.sections,
                pairs,
            },
        })
    }
}

/// Second pass complete: pairs are known and addressable
#[derive(Debug)]
pub struct PairedSession {
    session: Session,
}

impl PairedSession {
    /// Third pass: board results, counting boards played per pair
    pub fn read_boards(mut self, root: Node) -> ConvertResult<Session> {
        let Session { sections, pairs } = &mut self.session;
        let mut phantoms = 0;

        for brsection in grandchildren(root, "board_results", "brsection") {
            let id = required(brsection, "sectid")?;
            let section = sections
                .get_mut(id)
                .ok_or_else(|| ConvertError::UnknownSection(id.to_string()))?;

            for node in children(brsection, "result") {
                let board: u32 = parse_attr(node, "bd")?;
                let Some(traveller) = read_traveller(node, section)? else {
                    phantoms += 1;
                    continue;
                };

                for pair_id in [&traveller.ns, &traveller.ew] {
                    if let Some(pair) = pairs.get_mut(pair_id) {
                        pair.boards_played += 1;
                    }
                }
                section.boards.entry(board).or_default().push(traveller);
            }
        }

        debug!(
            "Read {} traveller lines ({} phantom results skipped)",
            self.session.travellers().count(),
            phantoms
        );
        Ok(self.session)
    }
}

fn read_pair(node: Node, handicapped: bool) -> ConvertResult<Pair> {
    let number: u32 = parse_attr(node, "no")?;
    let direction = Direction::from_code(attr(node, "dir"))?;
    let score = read_score(node, handicapped)?;
    let match_points = attr(node, "match_points")
        .map(MatchPoints::from_str)
        .transpose()?;
    let players = [read_player(node, 1), read_player(node, 2)];

    Ok(Pair::new(number, direction, players, score, match_points))
}

fn read_player(node: Node, which: u8) -> Player {
    let name = attr(node, &format!("player_name_{}", which)).unwrap_or("");
    let national_id = attr(node, &format!("nzb_no_{}", which)).map(str::to_string);
    Player::new(name, national_id)
}

/// Read the `res`, `raw_score` and `handicap` attributes plus awards
pub fn read_score(node: Node, handicapped: bool) -> ConvertResult<Score> {
    let total: Decimal = parse_attr(node, "res")?;
    let raw: Decimal = parse_attr(node, "raw_score")?;
    let handicap = match attr(node, "handicap") {
        Some(value) => parse_value(node, "handicap", value)?,
        None => Decimal::ZERO,
    };
    Score::new(total, raw, handicap, handicapped, read_master_points(node)?)
}

/// Master point awards, skipping absent and zero awards
pub fn read_master_points(node: Node) -> ConvertResult<Vec<MasterPoints>> {
    let mut awards = Vec::new();
    for award_type in MASTER_POINT_TYPES {
        let name = format!("{}points", award_type);
        let Some(value) = attr(node, &name) else {
            continue;
        };
        let points: Decimal = parse_value(node, &name, value)?;
        if !points.is_zero() {
            awards.push(MasterPoints::new(award_type, points));
        }
    }
    Ok(awards)
}

/// Read one board result, or `None` for a phantom result
fn read_traveller(node: Node, section: &Section) -> ConvertResult<Option<Traveller>> {
    let mp_ns: Decimal = parse_attr(node, "mp_ns")?;
    let mp_ew: Decimal = parse_attr(node, "mp_ew")?;
    let phantom = Decimal::from_int(PHANTOM_MATCH_POINTS);
    if mp_ns == phantom || mp_ew == phantom {
        return Ok(None);
    }

    // Scorer stores match points multiplied by ten and truncated
    let ns_match_points = mp_ns
        .shift_right(1)
        .ok_or_else(|| invalid_value(node, "mp_ns", &mp_ns.to_string()))?;
    let ew_match_points = mp_ew
        .shift_right(1)
        .ok_or_else(|| invalid_value(node, "mp_ew", &mp_ew.to_string()))?;

    let ns = resolve_pair(section, Direction::NorthSouth, parse_attr(node, "ns")?);
    let ew = resolve_pair(section, Direction::EastWest, parse_attr(node, "ew")?);
    let contract = attr(node, "cont").unwrap_or("").trim();
    let tricks = Traveller::trick_count(contract, attr(node, "res").unwrap_or(""))?;

    Ok(Some(Traveller {
        ns,
        ew,
        contract: contract.to_string(),
        declarer: attr(node, "dec").unwrap_or("").trim().to_string(),
        lead: attr(node, "lead").unwrap_or("").trim().to_string(),
        tricks,
        score: attr(node, "score").unwrap_or("").trim().to_string(),
        ns_match_points,
        ew_match_points,
    }))
}

/// Map a raw board-result pair number to its session identity
///
/// An unknown number only spoils one traveller line, so it is logged and
/// given a placeholder identity rather than failing the conversion.
fn resolve_pair(section: &Section, direction: Direction, number: u32) -> String {
    match section.get_pair_id(direction, number) {
        Some(id) => id.to_string(),
        None => {
            error!(
                "Section {}: board result refers to unknown {} pair {}",
                section.id, direction, number
            );
            format!("{}-{}-{}", section.id, direction, number)
        }
    }
}

fn is_true(value: &str) -> bool {
    matches!(value.trim(), "Y" | "y" | "1" | "T" | "true")
}

fn attr<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name)
}

fn required<'a>(node: Node<'a, '_>, name: &str) -> ConvertResult<&'a str> {
    attr(node, name).ok_or_else(|| ConvertError::MissingAttribute {
        element: node.tag_name().name().to_string(),
        attribute: name.to_string(),
    })
}

fn parse_attr<T: FromStr>(node: Node, name: &str) -> ConvertResult<T> {
    parse_value(node, name, required(node, name)?)
}

fn parse_value<T: FromStr>(node: Node, name: &str, value: &str) -> ConvertResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid_value(node, name, value))
}

fn invalid_value(node: Node, name: &str, value: &str) -> ConvertError {
    ConvertError::InvalidValue {
        element: node.tag_name().name().to_string(),
        attribute: name.to_string(),
        value: value.to_string(),
    }
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |child| child.has_tag_name(tag))
}

fn grandchildren<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    container: &'static str,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    children(node, container).flat_map(move |parent| children(parent, tag))
}
