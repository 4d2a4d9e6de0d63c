//! End-to-end conversions of Scorer documents

use roxmltree::{Document, Node, ParsingOptions};
use std::path::PathBuf;
use usebio_core::{convert, convert_file, ConvertError, ConvertOptions, WriteOptions};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn to_string(source: &str, options: &ConvertOptions, write: &WriteOptions) -> String {
    let conversion = convert(source, options).unwrap();
    String::from_utf8(conversion.document.to_bytes(write).unwrap()).unwrap()
}

fn parse(text: &str) -> Document<'_> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options).unwrap()
}

/// Compare two element trees, ignoring whitespace between elements
fn assert_same_tree(actual: Node, expected: Node, path: &str) {
    let path = format!("{}/{}", path, expected.tag_name().name());
    assert_eq!(actual.tag_name().name(), expected.tag_name().name(), "at {}", path);

    let attrs = |node: Node| {
        node.attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect::<Vec<_>>()
    };
    assert_eq!(attrs(actual), attrs(expected), "attributes at {}", path);

    let text = |node: Node| node.text().map(str::trim).unwrap_or("").to_string();
    assert_eq!(text(actual), text(expected), "text at {}", path);

    let actual_children: Vec<Node> = actual.children().filter(Node::is_element).collect();
    let expected_children: Vec<Node> = expected.children().filter(Node::is_element).collect();
    let names = |nodes: &[Node]| {
        nodes
            .iter()
            .map(|n| n.tag_name().name().to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(
        names(&actual_children),
        names(&expected_children),
        "children at {}",
        path
    );
    for (a, e) in actual_children.into_iter().zip(expected_children) {
        assert_same_tree(a, e, &path);
    }
}

fn find<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Node<'a, 'input> {
    node.descendants()
        .find(|n| n.has_tag_name(name))
        .unwrap_or_else(|| panic!("no <{}> element", name))
}

#[test]
fn test_pairs_fixture_matches_expected() {
    init_logging();
    let conversion = convert_file(&fixture("pairs.xml"), &ConvertOptions::default()).unwrap();
    let actual = String::from_utf8(
        conversion
            .document
            .to_bytes(&WriteOptions { pretty: true })
            .unwrap(),
    )
    .unwrap();
    let expected = std::fs::read_to_string(fixture("pairs.usebio.xml")).unwrap();

    assert_same_tree(
        parse(&actual).root_element(),
        parse(&expected).root_element(),
        "",
    );
    assert_eq!(
        conversion.event.default_filename(),
        "16-11-2015-Monday_Afternoon_November_Pairs.xml"
    );
}

#[test]
fn test_conversion_is_deterministic() {
    let source = std::fs::read_to_string(fixture("pairs.xml")).unwrap();
    let options = ConvertOptions::new(true);
    for write in [WriteOptions { pretty: false }, WriteOptions { pretty: true }] {
        assert_eq!(
            to_string(&source, &options, &write),
            to_string(&source, &options, &write)
        );
    }
}

#[test]
fn test_pretty_and_compact_hold_the_same_tree() {
    let source = std::fs::read_to_string(fixture("pairs.xml")).unwrap();
    let options = ConvertOptions::default();
    let compact = to_string(&source, &options, &WriteOptions { pretty: false });
    let pretty = to_string(&source, &options, &WriteOptions { pretty: true });

    assert!(!compact.contains('\n'));
    assert!(pretty.contains("\n  <CLUB>"));
    assert_same_tree(parse(&compact).root_element(), parse(&pretty).root_element(), "");
}

#[test]
fn test_doctype_written_when_requested() {
    let source = std::fs::read_to_string(fixture("pairs.xml")).unwrap();
    let with_dtd = to_string(&source, &ConvertOptions::new(true), &WriteOptions::default());
    assert!(with_dtd.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(with_dtd.contains(
        "<!DOCTYPE USEBIO PUBLIC \"-//EBU//DTD USEBIO 1.2//EN\" \
         \"http://www.usebio.org/files/usebio_v1_2.dtd\">"
    ));

    let without = to_string(&source, &ConvertOptions::new(false), &WriteOptions::default());
    assert!(without.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(!without.contains("DOCTYPE"));
}

const TWO_SECTIONS: &str = r#"<?xml version="1.0"?>
<session club="Hilltop" club_no="9" event_name="Howell Night" event_date="2/3/2019" scoring_type="MP">
  <sections>
    <section sectid="B" handicapped="Y"/>
    <section sectid="A" handicapped="N"/>
  </sections>
  <scores>
    <scsection sectid="A">
      <pair no="1" dir="H" res="50.00" raw_score="50.00" match_points="1/2"
            player_name_1="Ann" player_name_2="Ben"/>
      <pair no="2" dir="H" res="50.00" raw_score="50.00" match_points="1/2"
            player_name_1="Col" player_name_2="Dee"/>
    </scsection>
    <scsection sectid="B">
      <pair no="1" dir="H" res="52.50" raw_score="50.00" handicap="2.5" match_points="1/2"
            player_name_1="Eli" player_name_2="Fox"/>
      <pair no="2" dir="H" res="47.00" raw_score="50.00" handicap="-3" match_points="1/2"
            player_name_1="Gil" player_name_2="Hat"/>
    </scsection>
  </scores>
  <board_results>
    <brsection sectid="A">
      <result bd="1" ns="1" ew="2" cont="1 NT" dec="N" res="=" score="90" mp_ns="10" mp_ew="10"/>
    </brsection>
    <brsection sectid="B">
      <result bd="1" ns="2" ew="1" cont="2 H" dec="S" res="=" score="110" mp_ns="10" mp_ew="10"/>
    </brsection>
  </board_results>
</session>"#;

#[test]
fn test_multiple_sections() {
    init_logging();
    let text = to_string(TWO_SECTIONS, &ConvertOptions::default(), &WriteOptions::default());
    let doc = parse(&text);
    let event = find(doc.root_element(), "EVENT");

    assert_eq!(find(event, "WINNER_TYPE").text(), Some("1"));
    assert_eq!(find(event, "MPS_AWARDED_FLAG").text(), Some("N"));

    let sections: Vec<Node> = event
        .children()
        .filter(|n| n.has_tag_name("SECTION"))
        .collect();
    let ids: Vec<&str> = sections
        .iter()
        .filter_map(|s| s.attribute("SECTION_ID"))
        .collect();
    assert_eq!(ids, vec!["A", "B"]);

    let pair_numbers: Vec<&str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("PAIR_NUMBER"))
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(pair_numbers, vec!["(A) 1", "(A) 2", "(B) 1", "(B) 2"]);

    // Roaming pairs keep an empty DIRECTION
    let pairs: Vec<Node> = doc.descendants().filter(|n| n.has_tag_name("PAIR")).collect();
    assert_eq!(pairs.len(), 4);
    for pair in pairs {
        let direction = find(pair, "DIRECTION");
        assert_eq!(direction.text(), None);
        assert_eq!(
            direction.prev_sibling_element().map(|n| n.tag_name().name()),
            Some("PAIR_NUMBER")
        );
    }

    // Handicaps appear only where they are non-zero
    let section_b = sections[1];
    let handicaps: Vec<&str> = section_b
        .descendants()
        .filter(|n| n.has_tag_name("HANDICAP"))
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(handicaps, vec!["2.5", "-3"]);
    assert!(sections[0].descendants().all(|n| !n.has_tag_name("HANDICAP")));

    // 47.00 against 50.00 - 3 is within tolerance; 52.50 against 52.5 is exact
    assert!(doc.descendants().all(|n| !n.has_tag_name("ADJUSTMENT")));

    let line = find(section_b, "TRAVELLER_LINE");
    assert_eq!(find(line, "NS_PAIR_NUMBER").text(), Some("(B) 2"));
    assert_eq!(find(line, "EW_PAIR_NUMBER").text(), Some("(B) 1"));
}

#[test]
fn test_single_winner_places_across_directions() {
    let conversion = convert(TWO_SECTIONS, &ConvertOptions::default()).unwrap();
    let pairs = &conversion.event.session.pairs;
    // Everyone is on 50%, so all share first place
    assert!(pairs.values().all(|p| p.score.place == Some(1)));
}

const ROAMING: &str = r#"<?xml version="1.0"?>
<session club="Hilltop" club_no="9" event_name="Mitchell" event_date="9/3/2019" scoring_type="MP">
  <sections><section sectid="A"/></sections>
  <scores>
    <scsection sectid="A">
      <pair no="1" dir="H" res="55.00" raw_score="55.00" match_points="11/20"
            player_name_1="Ann" player_name_2="Ben"/>
      <pair no="2" res="45.00" raw_score="45.00" match_points="9/20"
            player_name_1="Col" player_name_2="Dee"/>
    </scsection>
  </scores>
  <board_results>
    <brsection sectid="A">
      <result bd="1" ns="1" ew="2" cont="" res="" score="Adj" mp_ns="12345678901234567" mp_ew="8"/>
      <result bd="2" ns="2" ew="1" cont="2 H" dec="S" res="=" score="110" mp_ns="10" mp_ew="10"/>
    </brsection>
  </board_results>
</session>"#;

#[test]
fn test_single_section_roaming_pairs() {
    init_logging();
    let text = to_string(ROAMING, &ConvertOptions::default(), &WriteOptions::default());
    assert!(text.contains(
        "<PAIR><PAIR_NUMBER>1</PAIR_NUMBER><DIRECTION/><BOARDS_PLAYED>2</BOARDS_PLAYED>"
    ));
    assert!(text.contains(
        "<PAIR><PAIR_NUMBER>2</PAIR_NUMBER><DIRECTION/><BOARDS_PLAYED>2</BOARDS_PLAYED>"
    ));

    let doc = parse(&text);
    assert_eq!(find(doc.root_element(), "WINNER_TYPE").text(), Some("1"));
}

#[test]
fn test_oversized_adjusted_match_points_do_not_abort() {
    let conversion = convert(ROAMING, &ConvertOptions::default()).unwrap();
    let board = &conversion.event.session.sections["A"].boards[&1];
    assert_eq!(board[0].ns_match_points.to_string(), "1234567890123456.7");
    assert!(board[0].score.starts_with('A'));
    assert_ne!(board[0].score, "Adj");
}

#[test]
fn test_unsupported_event_type() {
    let source = TWO_SECTIONS.replace("scoring_type=\"MP\"", "scoring_type=\"SWISS_TEAMS\"");
    let err = convert(&source, &ConvertOptions::default()).unwrap_err();
    assert!(err.is_unsupported_event());
    assert!(!err.is_invalid_results());
}

#[test]
fn test_invalid_results_are_reported() {
    let source = TWO_SECTIONS.replace("dir=\"H\" res=\"52.50\"", "dir=\"W\" res=\"52.50\"");
    let err = convert(&source, &ConvertOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::InvalidDirection(_)));
    assert!(err.is_invalid_results());
}

#[test]
fn test_malformed_document() {
    let err = convert("<session><sections>", &ConvertOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::Xml(_)));
}
