//! Scorer to USEBIO conversion engine
//!
//! Converts duplicate pairs results exported by the Scorer program into
//! USEBIO 1.2 XML, the interchange format used by national bridge bodies
//! and results upload services.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  reader         │────▶│  reconcile       │────▶│  usebio         │
//! │  (roxmltree)    │model│  places, Adj     │model│  (quick-xml)    │
//! └─────────────────┘     └──────────────────┘     └─────────────────┘
//!         ▲                                                 │
//!   Scorer XML                                         USEBIO XML
//! ```
//!
//! # Modules
//!
//! - [`convert`] - Entry point and options
//! - [`model`] - Event, session, section, pair and traveller types
//! - [`reader`] - Scorer XML reader
//! - [`reconcile`] - Placings and adjusted score reconstruction
//! - [`usebio`] - USEBIO element tree and writer
//! - [`decimal`] - Fixed-point decimal arithmetic
//! - [`error`] - Error types

pub mod convert;
pub mod decimal;
pub mod error;
pub mod model;
pub mod reader;
pub mod reconcile;
pub mod usebio;

pub use convert::{convert, convert_file, Conversion, ConvertOptions, XmlCapabilities};
pub use decimal::Decimal;
pub use error::{ConvertError, ConvertResult};
pub use model::{Event, EventType, Session, WinnerCount};
pub use usebio::{Element, UsebioDocument, WriteOptions};
