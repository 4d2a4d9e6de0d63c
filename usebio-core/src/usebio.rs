//! USEBIO 1.2 serializer
//!
//! [`usebio_tree`] turns a reconciled [`Event`] into an element tree and
//! [`UsebioDocument`] writes that tree out with quick-xml. Optional fields
//! are left out when empty, and the handicap is left out when it is zero.

use crate::decimal::Decimal;
use crate::error::ConvertResult;
use crate::model::{Event, Pair, Player, Section, Traveller};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event as XmlEvent};
use quick_xml::Writer;
use std::io::Write;

pub const USEBIO_VERSION: &str = "1.2";
pub const PROGRAM_NAME: &str = "Scorer";

/// Document type declaration for USEBIO 1.2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Doctype {
    pub public_id: &'static str,
    pub system_url: &'static str,
}

pub const USEBIO_DOCTYPE: Doctype = Doctype {
    public_id: "-//EBU//DTD USEBIO 1.2//EN",
    system_url: "http://www.usebio.org/files/usebio_v1_2.dtd",
};

/// A named XML element with optional text content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Append `child` and return it for further building
    pub fn push(&mut self, child: Element) -> &mut Element {
        let index = self.children.len();
        self.children.push(child);
        &mut self.children[index]
    }

    /// Append an empty child element
    pub fn element(&mut self, name: &str) -> &mut Element {
        self.push(Element::new(name))
    }

    /// Append a child element holding `text`
    pub fn text_element(&mut self, name: &str, text: impl ToString) -> &mut Element {
        let child = self.element(name);
        child.text = Some(text.to_string());
        child
    }

    /// Append a text child unless `text` is absent or empty
    pub fn non_empty_element(&mut self, name: &str, text: Option<&str>) {
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            self.text_element(name, text);
        }
    }

    /// Append a numeric child unless it is zero
    pub fn non_zero_element(&mut self, name: &str, value: Decimal) {
        if !value.is_zero() {
            self.text_element(name, value);
        }
    }

    /// First child called `name`
    #[cfg(test)]
    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    #[cfg(test)]
    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Options controlling how a document is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Indent nested elements by two spaces
    pub pretty: bool,
}

/// A USEBIO document ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsebioDocument {
    pub root: Element,
    pub doctype: Option<Doctype>,
}

impl UsebioDocument {
    pub fn new(root: Element) -> Self {
        Self {
            root,
            doctype: None,
        }
    }

    pub fn with_doctype(mut self, doctype: Doctype) -> Self {
        self.doctype = Some(doctype);
        self
    }

    /// Write the XML declaration, the doctype if any, and the element tree
    pub fn write<W: Write>(&self, out: W, options: &WriteOptions) -> ConvertResult<()> {
        let mut writer = if options.pretty {
            Writer::new_with_indent(out, b' ', 2)
        } else {
            Writer::new(out)
        };

        writer.write_event(XmlEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        if let Some(doctype) = &self.doctype {
            let declaration = format!(
                "{} PUBLIC \"{}\" \"{}\"",
                self.root.name, doctype.public_id, doctype.system_url
            );
            writer.write_event(XmlEvent::DocType(BytesText::from_escaped(declaration)))?;
        }
        write_element(&mut writer, &self.root)?;
        writer.into_inner().flush()?;
        Ok(())
    }

    pub fn to_bytes(&self, options: &WriteOptions) -> ConvertResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write(&mut bytes, options)?;
        Ok(bytes)
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> ConvertResult<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (name, value) in &element.attributes {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    if element.text.is_none() && element.children.is_empty() {
        writer.write_event(XmlEvent::Empty(start))?;
        return Ok(());
    }

    writer.write_event(XmlEvent::Start(start))?;
    if let Some(text) = &element.text {
        writer.write_event(XmlEvent::Text(BytesText::new(text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(XmlEvent::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

/// Build the USEBIO element tree for a reconciled event
pub fn usebio_tree(event: &Event) -> Element {
    let mut root = Element::new("USEBIO").with_attribute("Version", USEBIO_VERSION);

    let club = root.element("CLUB");
    club.text_element("CLUB_NAME", &event.club.name);
    club.text_element("CLUB_ID_NUMBER", &event.club.number);

    let usebio_event =
        root.push(Element::new("EVENT").with_attribute("EVENT_TYPE", event.event_type.usebio_name()));
    usebio_event.text_element("PROGRAM_NAME", PROGRAM_NAME);
    usebio_event.text_element("PROGRAM_VERSION", &event.program_version);
    usebio_event.text_element("EVENT_DESCRIPTION", &event.name);
    usebio_event.text_element("DATE", &event.date);
    usebio_event.text_element("WINNER_TYPE", event.winner_count);
    usebio_event.non_empty_element("BOARD_SCORING_METHOD", event.event_type.board_scoring_method());
    usebio_event.text_element("BOARDS_PLAYED", event.boards_played());
    usebio_event.text_element("MPS_AWARDED_FLAG", if event.mps_awarded() { "Y" } else { "N" });

    let sections = &event.session.sections;
    if sections.len() == 1 {
        for section in sections.values() {
            add_section_body(usebio_event, event, section);
        }
    } else {
        for section in sections.values() {
            let wrapper =
                usebio_event.push(Element::new("SECTION").with_attribute("SECTION_ID", section.id.as_str()));
            add_section_body(wrapper, event, section);
        }
    }

    root
}

fn add_section_body(parent: &mut Element, event: &Event, section: &Section) {
    let two_winners = event.winner_count.as_u8() == 2;
    let mut pairs: Vec<&Pair> = event.session.section_pairs(section).collect();
    pairs.sort_by(|a, b| {
        Event::pair_key(a, two_winners)
            .cmp(&Event::pair_key(b, two_winners))
            .then_with(|| a.id.cmp(&b.id))
    });

    let participants = parent.element("PARTICIPANTS");
    for pair in pairs {
        participants.push(pair_element(pair));
    }

    for (number, travellers) in &section.boards {
        let board = parent.element("BOARD");
        board.text_element("BOARD_NUMBER", number);
        for traveller in travellers {
            board.push(traveller_element(traveller));
        }
    }
}

fn pair_element(pair: &Pair) -> Element {
    let mut element = Element::new("PAIR");
    element.text_element("PAIR_NUMBER", &pair.id);
    match pair.direction {
        Some(direction) => {
            element.text_element("DIRECTION", direction);
        }
        // Roaming pairs still carry the element, left empty
        None => {
            element.element("DIRECTION");
        }
    }
    element.text_element("BOARDS_PLAYED", pair.boards_played);
    for player in &pair.players {
        element.push(player_element(player));
    }

    let score = &pair.score;
    if let Some(place) = score.place {
        element.text_element("PLACE", place);
    }
    element.text_element("TOTAL_SCORE", score.total);
    element.text_element("PERCENTAGE", score.total);
    for award in &score.master_points {
        let mps = element.element("MASTER_POINTS");
        mps.text_element("MASTER_POINTS_AWARDED", award.points);
        mps.text_element("MASTER_POINT_TYPE", &award.award_type);
    }
    if let Some(adjustment) = score.adjustment {
        element.text_element("ADJUSTMENT", adjustment);
    }
    element.non_zero_element("HANDICAP", score.handicap);
    element
}

fn player_element(player: &Player) -> Element {
    let mut element = Element::new("PLAYER");
    element.text_element("PLAYER_NAME", &player.name);
    element.non_empty_element("NATIONAL_ID_NUMBER", player.national_id.as_deref());
    element
}

fn traveller_element(traveller: &Traveller) -> Element {
    let mut element = Element::new("TRAVELLER_LINE");
    element.text_element("NS_PAIR_NUMBER", &traveller.ns);
    element.text_element("EW_PAIR_NUMBER", &traveller.ew);
    element.non_empty_element("CONTRACT", Some(traveller.contract.as_str()));
    element.non_empty_element("PLAYED_BY", Some(traveller.declarer.as_str()));
    element.non_empty_element("LEAD", Some(traveller.lead.as_str()));
    element.non_empty_element("SCORE", Some(traveller.score.as_str()));
    element.text_element("TRICKS", traveller.tricks);
    element.text_element("NS_MATCH_POINTS", traveller.ns_match_points);
    element.text_element("EW_MATCH_POINTS", traveller.ew_match_points);
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Club, Direction, EventType, MasterPoints, Score, Session};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn names(element: &Element) -> Vec<&str> {
        element.children.iter().map(|c| c.name.as_str()).collect()
    }

    fn sample_pair(id: &str, number: u32, direction: Option<Direction>, handicap: &str) -> Pair {
        let handicapped = handicap != "0";
        let score = Score::new(
            dec("55.00"),
            dec("55.00"),
            dec(handicap),
            handicapped,
            vec![MasterPoints::new("a", dec("2"))],
        )
        .unwrap();
        let players = [
            Player::new(format!("{} North", id), Some("101".to_string())),
            Player::new(format!("{} South", id), None),
        ];
        let mut pair = Pair::new(number, direction, players, score, None);
        pair.id = id.to_string();
        pair.boards_played = 1;
        pair.score.place = Some(1);
        pair
    }

    fn sample_event(section_ids: &[&str]) -> Event {
        let mut session = Session::default();
        for id in section_ids {
            let mut section = Section::new(*id, false);
            let pair = sample_pair(&format!("({}) 1", id), 1, None, "0");
            section.pairs.push(pair.id.clone());
            section.boards.insert(
                1,
                vec![Traveller {
                    ns: pair.id.clone(),
                    ew: "x".to_string(),
                    contract: "3 NT".to_string(),
                    declarer: "N".to_string(),
                    lead: String::new(),
                    tricks: 9,
                    score: "400".to_string(),
                    ns_match_points: dec("3.6"),
                    ew_match_points: dec("2.4"),
                }],
            );
            session.pairs.insert(pair.id.clone(), pair);
            session.sections.insert(id.to_string(), section);
        }
        let club = Club {
            name: "Club & Co".to_string(),
            number: "42".to_string(),
        };
        Event::new(club, EventType::Pairs, "Pairs", "1/2/2020", "1", session).unwrap()
    }

    #[test]
    fn test_element() {
        let mut parent = Element::new("parent");
        assert_eq!(parent.element("a").text, None);
        assert_eq!(parent.text_element("a", "b").text.as_deref(), Some("b"));
        assert_eq!(parent.children.len(), 2);
    }

    #[test]
    fn test_non_empty_element() {
        let mut parent = Element::new("parent");
        parent.non_empty_element("a", None);
        parent.non_empty_element("a", Some(""));
        assert_eq!(parent.children.len(), 0);
        parent.non_empty_element("a", Some("0"));
        assert_eq!(parent.children.len(), 1);
        parent.non_empty_element("a", Some("1"));
        assert_eq!(parent.children.len(), 2);
    }

    #[test]
    fn test_non_zero_element() {
        let mut parent = Element::new("parent");
        parent.non_zero_element("a", Decimal::ZERO);
        parent.non_zero_element("a", dec("0.00"));
        assert_eq!(parent.children.len(), 0);
        parent.non_zero_element("a", dec("1"));
        assert_eq!(parent.children.len(), 1);
    }

    #[test]
    fn test_single_section_is_flattened() {
        let tree = usebio_tree(&sample_event(&["A"]));
        assert_eq!(tree.attributes, vec![("Version".to_string(), "1.2".to_string())]);

        let event = tree.child("EVENT").unwrap();
        assert_eq!(
            names(event),
            vec![
                "PROGRAM_NAME",
                "PROGRAM_VERSION",
                "EVENT_DESCRIPTION",
                "DATE",
                "WINNER_TYPE",
                "BOARD_SCORING_METHOD",
                "BOARDS_PLAYED",
                "MPS_AWARDED_FLAG",
                "PARTICIPANTS",
                "BOARD",
            ]
        );
        assert_eq!(event.child("WINNER_TYPE").unwrap().text.as_deref(), Some("1"));
        assert_eq!(event.child("MPS_AWARDED_FLAG").unwrap().text.as_deref(), Some("Y"));
    }

    #[test]
    fn test_multiple_sections_are_wrapped() {
        let tree = usebio_tree(&sample_event(&["B", "A"]));
        let event = tree.child("EVENT").unwrap();
        let sections: Vec<&Element> = event.children_named("SECTION").collect();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].attributes[0].1, "A");
        assert_eq!(sections[1].attributes[0].1, "B");
        assert_eq!(names(sections[0]), vec!["PARTICIPANTS", "BOARD"]);
        assert!(event.child("PARTICIPANTS").is_none());
    }

    #[test]
    fn test_roaming_pair_has_empty_direction() {
        let pair = pair_element(&sample_pair("3", 3, None, "0"));
        assert_eq!(
            names(&pair),
            vec![
                "PAIR_NUMBER",
                "DIRECTION",
                "BOARDS_PLAYED",
                "PLAYER",
                "PLAYER",
                "PLACE",
                "TOTAL_SCORE",
                "PERCENTAGE",
                "MASTER_POINTS",
            ]
        );
        assert_eq!(pair.children[1].text, None);
        assert!(pair.children[1].children.is_empty());
        assert_eq!(names(&pair.children[3]), vec!["PLAYER_NAME", "NATIONAL_ID_NUMBER"]);
        assert_eq!(names(&pair.children[4]), vec!["PLAYER_NAME"]);
    }

    #[test]
    fn test_pair_with_direction_and_handicap() {
        let pair = pair_element(&sample_pair("3 NS", 3, Some(Direction::NorthSouth), "2.5"));
        assert_eq!(pair.child("DIRECTION").unwrap().text.as_deref(), Some("NS"));
        assert_eq!(pair.child("HANDICAP").unwrap().text.as_deref(), Some("2.5"));
        // 55.00 final against 55.00 raw plus 2.5 handicap
        assert_eq!(pair.child("ADJUSTMENT").unwrap().text.as_deref(), Some("-2.50"));
    }

    #[test]
    fn test_traveller_line() {
        let tree = usebio_tree(&sample_event(&["A"]));
        let line = tree
            .child("EVENT")
            .and_then(|e| e.child("BOARD"))
            .and_then(|b| b.child("TRAVELLER_LINE"))
            .unwrap();
        assert_eq!(
            names(line),
            vec![
                "NS_PAIR_NUMBER",
                "EW_PAIR_NUMBER",
                "CONTRACT",
                "PLAYED_BY",
                "SCORE",
                "TRICKS",
                "NS_MATCH_POINTS",
                "EW_MATCH_POINTS",
            ]
        );
        assert_eq!(line.child("NS_MATCH_POINTS").unwrap().text.as_deref(), Some("3.6"));
    }

    #[test]
    fn test_write_compact() {
        let mut root = Element::new("USEBIO").with_attribute("Version", "1.2");
        root.text_element("CLUB_NAME", "Club & Co");
        root.element("EMPTY");
        let bytes = UsebioDocument::new(root)
            .to_bytes(&WriteOptions::default())
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <USEBIO Version=\"1.2\"><CLUB_NAME>Club &amp; Co</CLUB_NAME><EMPTY/></USEBIO>"
        );
    }

    #[test]
    fn test_write_doctype() {
        let document = UsebioDocument::new(Element::new("USEBIO")).with_doctype(USEBIO_DOCTYPE);
        let text = String::from_utf8(document.to_bytes(&WriteOptions::default()).unwrap()).unwrap();
        assert!(text.contains(
            "<!DOCTYPE USEBIO PUBLIC \"-//EBU//DTD USEBIO 1.2//EN\" \
             \"http://www.usebio.org/files/usebio_v1_2.dtd\">"
        ));
    }

    #[test]
    fn test_write_pretty_indents() {
        let mut root = Element::new("USEBIO");
        root.element("CLUB").text_element("CLUB_NAME", "x");
        let options = WriteOptions { pretty: true };
        let text = String::from_utf8(UsebioDocument::new(root).to_bytes(&options).unwrap()).unwrap();
        assert!(text.contains("\n  <CLUB>\n    <CLUB_NAME>x</CLUB_NAME>\n  </CLUB>\n</USEBIO>"));
    }
}
