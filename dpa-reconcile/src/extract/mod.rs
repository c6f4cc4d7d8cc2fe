//! Extract line parsing
//!
//! Two grammars, one per exporting system:
//! - [`catalog`]: `;`-separated `KEY:VALUE` segments from the catalog export
//! - [`legacy`]: `##`-separated positional fields from the legacy archive export
//!
//! Parsers never panic and never return partially populated records: a line
//! either yields a complete record or a [`LineParseError`](crate::error::LineParseError)
//! that the caller counts and skips.

pub mod catalog;
pub mod legacy;
pub mod lines;

pub use catalog::{CatalogExtractRecord, CatalogField};
pub use legacy::LegacyExtractRecord;
pub use lines::{ExtractLine, ExtractLines, NumberedLine};
