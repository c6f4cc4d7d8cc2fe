//! Catalog extract parser
//!
//! One record per line, `;`-separated segments of the form `KEY:VALUE`. The
//! key is everything before the first `:`, the value everything after it, so
//! values may themselves contain `:`. Segment order is irrelevant.
//!
//! ```text
//! ARCHIVE_FILE:T0042/0001.tar;CATALOG:photo;MASTER_MD5:9e10...;IDENTIFIER:info:cat/obj/u1#0;ARCHIVE_MD5:d41d...;SIZE:10240
//! ```
//!
//! Keys and values are trimmed of surrounding whitespace. Keys outside
//! [`CatalogField`] are ignored; every key in it must appear exactly once.

use crate::error::LineParseError;
use crate::identity::{self, ArchiveId};
use dpa_common::config::ChecksumSource;
use std::fmt;

const SEGMENT_SEPARATOR: char = ';';
const KEY_SEPARATOR: char = ':';

/// Required catalog extract keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogField {
    ArchiveFile,
    CatalogName,
    MasterMd5,
    Identifier,
    ArchiveMd5,
    Size,
}

impl CatalogField {
    pub const ALL: [CatalogField; 6] = [
        CatalogField::ArchiveFile,
        CatalogField::CatalogName,
        CatalogField::MasterMd5,
        CatalogField::Identifier,
        CatalogField::ArchiveMd5,
        CatalogField::Size,
    ];

    /// Key as written in the extract
    pub fn key(self) -> &'static str {
        match self {
            CatalogField::ArchiveFile => "ARCHIVE_FILE",
            CatalogField::CatalogName => "CATALOG",
            CatalogField::MasterMd5 => "MASTER_MD5",
            CatalogField::Identifier => "IDENTIFIER",
            CatalogField::ArchiveMd5 => "ARCHIVE_MD5",
            CatalogField::Size => "SIZE",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CatalogField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Minimum number of `;` segments on a valid line
pub const MIN_SEGMENTS: usize = CatalogField::ALL.len();

/// One parsed line of the catalog extract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogExtractRecord {
    archive_file: String,
    catalog_name: String,
    master_md5: String,
    archive_md5: String,
    id: ArchiveId,
    size: u64,
    raw: String,
}

impl CatalogExtractRecord {
    /// Parse one catalog extract line
    ///
    /// Either every required field is present and valid, or the line is
    /// rejected as a whole.
    pub fn parse(line: &str) -> Result<Self, LineParseError> {
        let segments: Vec<&str> = line.split(SEGMENT_SEPARATOR).collect();
        if segments.len() < MIN_SEGMENTS {
            return Err(LineParseError::TooFewSegments {
                found: segments.len(),
                required: MIN_SEGMENTS,
            });
        }

        let mut values: [Option<&str>; MIN_SEGMENTS] = [None; MIN_SEGMENTS];
        for segment in segments {
            let (key, value) = segment
                .split_once(KEY_SEPARATOR)
                .ok_or_else(|| LineParseError::MissingSeparator(segment.to_string()))?;

            let Some(field) = CatalogField::from_key(key.trim()) else {
                continue;
            };

            let slot = &mut values[field.slot()];
            if slot.is_some() {
                return Err(LineParseError::DuplicateField(field));
            }
            *slot = Some(value.trim());
        }

        let take = |field: CatalogField| -> Result<&str, LineParseError> {
            values[field.slot()].ok_or(LineParseError::MissingField(field))
        };

        let archive_file = take(CatalogField::ArchiveFile)?;
        let catalog_name = take(CatalogField::CatalogName)?;
        let master_md5 = take(CatalogField::MasterMd5)?;
        let raw_id = take(CatalogField::Identifier)?;
        let archive_md5 = take(CatalogField::ArchiveMd5)?;
        let size_text = take(CatalogField::Size)?;

        let size = size_text
            .parse::<u64>()
            .map_err(|_| LineParseError::InvalidSize(size_text.to_string()))?;
        let id = identity::normalize(raw_id)?;

        Ok(Self {
            archive_file: archive_file.to_string(),
            catalog_name: catalog_name.to_string(),
            master_md5: master_md5.to_string(),
            archive_md5: archive_md5.to_string(),
            id,
            size,
            raw: line.to_string(),
        })
    }

    pub fn archive_file(&self) -> &str {
        &self.archive_file
    }

    pub fn catalog_name(&self) -> &str {
        &self.catalog_name
    }

    /// Checksum of the original master file
    pub fn master_md5(&self) -> &str {
        &self.master_md5
    }

    /// Checksum of the archived file
    pub fn archive_md5(&self) -> &str {
        &self.archive_md5
    }

    /// Checksum selected as the counterpart of the legacy checksum
    pub fn checksum(&self, source: ChecksumSource) -> &str {
        match source {
            ChecksumSource::ArchiveMd5 => &self.archive_md5,
            ChecksumSource::MasterMd5 => &self.master_md5,
        }
    }

    pub fn id(&self) -> &ArchiveId {
        &self.id
    }

    /// Declared size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Source line exactly as parsed
    pub fn raw_line(&self) -> &str {
        &self.raw
    }
}
