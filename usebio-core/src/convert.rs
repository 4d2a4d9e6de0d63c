//! Conversion entry point: Scorer XML in, event model and USEBIO document out

use crate::error::{ConvertError, ConvertResult};
use crate::model::Event;
use crate::reader::{read_session, EventHeader};
use crate::reconcile::reconcile;
use crate::usebio::{usebio_tree, UsebioDocument, USEBIO_DOCTYPE};
use log::{debug, info};
use roxmltree::{Document, ParsingOptions};
use std::path::Path;

/// What the XML writer in use can do, decided once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlCapabilities {
    pub supports_dtd: bool,
}

impl XmlCapabilities {
    /// Capabilities of the built-in quick-xml writer
    pub fn detect() -> Self {
        Self { supports_dtd: true }
    }
}

impl Default for XmlCapabilities {
    fn default() -> Self {
        Self::detect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Attach the USEBIO 1.2 DOCTYPE to the output
    pub include_dtd: bool,
    pub capabilities: XmlCapabilities,
}

impl ConvertOptions {
    pub fn new(include_dtd: bool) -> Self {
        Self {
            include_dtd,
            capabilities: XmlCapabilities::detect(),
        }
    }

    /// Reject option combinations the writer cannot honour
    pub fn validate(&self) -> ConvertResult<()> {
        if self.include_dtd && !self.capabilities.supports_dtd {
            return Err(ConvertError::DtdUnsupported);
        }
        Ok(())
    }
}

/// Result of converting one results file
#[derive(Debug, Clone)]
pub struct Conversion {
    pub event: Event,
    pub document: UsebioDocument,
}

/// Convert a Scorer results document
///
/// Reads the event header and the session, reconciles places and adjusted
/// scores, then builds the USEBIO document. Any domain error aborts the
/// whole conversion; nothing is returned for a partially converted event.
pub fn convert(source: &str, options: &ConvertOptions) -> ConvertResult<Conversion> {
    options.validate()?;

    let parsing = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(source, parsing)?;
    let root = doc.root_element();

    let header = EventHeader::read(root)?;
    let mut session = read_session(root)?;
    reconcile(&mut session);
    let event = header.into_event(session)?;
    debug!(
        "Event {:?}: {} sections, {} pairs, {} boards played, {} winner(s)",
        event.name,
        event.session.sections.len(),
        event.session.pairs.len(),
        event.boards_played(),
        event.winner_count
    );

    let mut document = UsebioDocument::new(usebio_tree(&event));
    if options.include_dtd {
        document = document.with_doctype(USEBIO_DOCTYPE);
    }

    Ok(Conversion { event, document })
}

/// Read and convert a Scorer results file
pub fn convert_file(path: &Path, options: &ConvertOptions) -> ConvertResult<Conversion> {
    options.validate()?;
    info!("Converting {:?}", path);
    let source = std::fs::read_to_string(path)?;
    convert(&source, options)
}
