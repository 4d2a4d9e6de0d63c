//! Error types for the Scorer to USEBIO conversion

use thiserror::Error;

/// Main error type for conversion operations
///
/// Every variant aborts the conversion of the current file. Unresolvable
/// pair references on traveller lines are not errors; they are logged and
/// replaced with a placeholder identity by the reader.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Scoring type is unknown or not supported
    #[error("Invalid event type: {0}")]
    InvalidEventType(String),

    /// Seating direction code outside N, E, H or blank
    #[error("Invalid direction: {0:?}")]
    InvalidDirection(String),

    /// Match point ratio is not of the form `<int>/<int>`
    #[error("Invalid match points: {0:?}")]
    InvalidMatchPoints(String),

    /// Handicap presence disagrees with the section's handicapped flag
    #[error("Handicap mismatch: section handicapped={handicapped}, pair handicap={handicap}")]
    HandicapMismatch { handicapped: bool, handicap: String },

    /// Two pairs share an identity or the same two players
    #[error("Duplicate pair: {0}")]
    DuplicatePair(String),

    /// Two pairs claim the same direction and number within a section
    #[error("Duplicate pair mapping in section {section}: {direction} {number} -> {existing} and {id}")]
    DuplicatePairMapping {
        section: String,
        direction: String,
        number: u32,
        existing: String,
        id: String,
    },

    /// Contract result token could not be turned into a trick count
    #[error("Invalid result {result:?} for contract {contract:?}")]
    InvalidTricks { contract: String, result: String },

    /// Scores or board results refer to a section that was never declared
    #[error("Unknown section: {0}")]
    UnknownSection(String),

    /// Required attribute is absent
    #[error("Missing attribute {attribute} on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    /// Attribute value could not be parsed
    #[error("Invalid value {value:?} for {attribute} on <{element}>")]
    InvalidValue {
        element: String,
        attribute: String,
        value: String,
    },

    /// Number too large for fixed-point arithmetic
    #[error("Number out of range: {0}")]
    OutOfRange(String),

    /// A DTD was requested but the XML writer cannot emit one
    #[error("DTDs are not supported by the configured XML writer")]
    DtdUnsupported,

    /// Source document is not well-formed XML
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Serialising the USEBIO document failed
    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::Error),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// True when the source is valid but describes an event this engine
    /// does not score.
    pub fn is_unsupported_event(&self) -> bool {
        matches!(self, ConvertError::InvalidEventType(_))
    }

    /// True when the source results themselves are inconsistent.
    pub fn is_invalid_results(&self) -> bool {
        matches!(
            self,
            ConvertError::InvalidDirection(_)
                | ConvertError::InvalidMatchPoints(_)
                | ConvertError::HandicapMismatch { .. }
                | ConvertError::DuplicatePair(_)
                | ConvertError::DuplicatePairMapping { .. }
                | ConvertError::InvalidTricks { .. }
                | ConvertError::UnknownSection(_)
                | ConvertError::MissingAttribute { .. }
                | ConvertError::InvalidValue { .. }
                | ConvertError::OutOfRange(_)
        )
    }

    /// True when writing failed because the reader went away, e.g. stdout
    /// piped into `head`.
    pub fn is_broken_pipe(&self) -> bool {
        let io = match self {
            ConvertError::Io(err) => err,
            ConvertError::XmlWrite(quick_xml::Error::Io(err)) => &**err,
            _ => return false,
        };
        io.kind() == std::io::ErrorKind::BrokenPipe
    }
}

/// Result type alias for conversion operations
pub type ConvertResult<T> = Result<T, ConvertError>;
