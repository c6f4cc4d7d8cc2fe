//! Legacy archive extract parser
//!
//! One record per line, positional fields separated by `##`:
//!
//! ```text
//! <archive file>##<raw identifier>##<declared size>##<checksum>[##<ignored>...]
//! ```

use crate::error::LineParseError;
use crate::identity::{self, ArchiveId};

const FIELD_SEPARATOR: &str = "##";

/// Minimum number of `##` fields on a valid line
pub const MIN_FIELDS: usize = 4;

/// One parsed line of the legacy archive extract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyExtractRecord {
    archive_file: String,
    id: ArchiveId,
    size: u64,
    checksum: String,
    raw: String,
}

impl LegacyExtractRecord {
    /// Parse one legacy extract line
    pub fn parse(line: &str) -> Result<Self, LineParseError> {
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() < MIN_FIELDS {
            return Err(LineParseError::TooFewFields {
                found: fields.len(),
                required: MIN_FIELDS,
            });
        }

        let size_text = fields[2].trim();
        let size = size_text
            .parse::<u64>()
            .map_err(|_| LineParseError::InvalidSize(size_text.to_string()))?;
        let id = identity::normalize(fields[1].trim())?;

        Ok(Self {
            archive_file: fields[0].trim().to_string(),
            id,
            size,
            checksum: fields[3].trim().to_string(),
            raw: line.to_string(),
        })
    }

    pub fn archive_file(&self) -> &str {
        &self.archive_file
    }

    pub fn id(&self) -> &ArchiveId {
        &self.id
    }

    /// Declared size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Source line exactly as parsed
    pub fn raw_line(&self) -> &str {
        &self.raw
    }
}
