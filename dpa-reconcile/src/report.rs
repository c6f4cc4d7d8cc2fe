//! Report channels
//!
//! Four append-only, newline-delimited text channels, one per outcome class.
//! Every line is self-contained (the raw extract line, or for mismatches the
//! differing attributes plus both raw lines) so reports can be grepped and
//! audited without the original extracts.
//!
//! | Outcome | File | Line |
//! |---------|------|------|
//! | Verified | `verified.txt` | catalog raw line |
//! | Mismatch | `mismatch.txt` | `<attrs>\t<catalog raw>\t<legacy raw>`, raw lines escaped |
//! | Missing in legacy | `missing_in_legacy.txt` | catalog raw line |
//! | Orphan | `orphan.txt` | legacy raw line |
//!
//! Both grammars allow tabs inside values, so within a mismatch line each raw
//! line is escaped (`\` as `\\`, tab as `\t`) and the line always splits into
//! exactly three tab-separated fields. The other channels carry raw lines
//! verbatim.
//!
//! Writers do no aggregation or deduplication: order within a channel is
//! processing order.

use crate::error::{ReconcileError, ReconcileResult};
use crate::extract::{CatalogExtractRecord, LegacyExtractRecord};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Outcome class, one per report channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Verified,
    Mismatch,
    MissingInLegacy,
    Orphan,
}

impl OutcomeKind {
    pub const ALL: [OutcomeKind; 4] = [
        OutcomeKind::Verified,
        OutcomeKind::Mismatch,
        OutcomeKind::MissingInLegacy,
        OutcomeKind::Orphan,
    ];

    /// Channel file name inside the output directory
    pub fn file_name(self) -> &'static str {
        match self {
            OutcomeKind::Verified => "verified.txt",
            OutcomeKind::Mismatch => "mismatch.txt",
            OutcomeKind::MissingInLegacy => "missing_in_legacy.txt",
            OutcomeKind::Orphan => "orphan.txt",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Attributes that differ between a catalog record and its legacy counterpart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MismatchedAttributes {
    pub size: bool,
    pub checksum: bool,
}

impl MismatchedAttributes {
    pub fn any(self) -> bool {
        self.size || self.checksum
    }

    /// `size`, `checksum` or `size,checksum`
    pub fn label(self) -> &'static str {
        match (self.size, self.checksum) {
            (true, true) => "size,checksum",
            (true, false) => "size",
            (false, true) => "checksum",
            (false, false) => "none",
        }
    }
}

/// One classified record, borrowed for the duration of a write
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    Verified {
        catalog: &'a CatalogExtractRecord,
        legacy: &'a LegacyExtractRecord,
    },
    Mismatch {
        catalog: &'a CatalogExtractRecord,
        legacy: &'a LegacyExtractRecord,
        attributes: MismatchedAttributes,
    },
    MissingInLegacy {
        catalog: &'a CatalogExtractRecord,
    },
    Orphan {
        legacy: &'a LegacyExtractRecord,
    },
}

impl Outcome<'_> {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Verified { .. } => OutcomeKind::Verified,
            Outcome::Mismatch { .. } => OutcomeKind::Mismatch,
            Outcome::MissingInLegacy { .. } => OutcomeKind::MissingInLegacy,
            Outcome::Orphan { .. } => OutcomeKind::Orphan,
        }
    }

    /// Channel line for this outcome, without terminator
    pub fn report_line(&self) -> String {
        match self {
            Outcome::Verified { catalog, .. } => catalog.raw_line().to_string(),
            Outcome::Mismatch {
                catalog,
                legacy,
                attributes,
            } => format!(
                "{}\t{}\t{}",
                attributes.label(),
                escape_field(catalog.raw_line()),
                escape_field(legacy.raw_line())
            ),
            Outcome::MissingInLegacy { catalog } => catalog.raw_line().to_string(),
            Outcome::Orphan { legacy } => legacy.raw_line().to_string(),
        }
    }
}

/// Escape a raw line for use as one tab-separated field
pub fn escape_field(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['\\', '\t']) {
        return Cow::Borrowed(raw);
    }

    let mut escaped = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Destination for classified outcomes
pub trait ReportSink {
    /// Append one outcome to its channel
    fn record(&mut self, outcome: &Outcome<'_>) -> ReconcileResult<()>;

    /// Flush and close every channel
    fn finish(self) -> ReconcileResult<()>
    where
        Self: Sized;

    /// Report directory, for sinks backed by files
    fn output_dir(&self) -> Option<&Path> {
        None
    }
}

struct Channel {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Channel {
    fn create(path: PathBuf) -> ReconcileResult<Self> {
        let file = File::create(&path).map_err(|source| ReconcileError::Report {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    fn write_line(&mut self, line: &str) -> ReconcileResult<()> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|source| ReconcileError::Report {
                path: self.path.clone(),
                source,
            })
    }

    fn flush(&mut self) -> ReconcileResult<()> {
        self.writer.flush().map_err(|source| ReconcileError::Report {
            path: self.path.clone(),
            source,
        })
    }
}

/// File-backed report writer
///
/// All four channel files are created (or truncated) in the constructor, so
/// a writer that never records anything still leaves four empty files behind.
/// Dropping the writer closes every file; [`ReportSink::finish`] additionally
/// surfaces flush failures.
pub struct ReportWriter {
    dir: PathBuf,
    channels: Vec<Channel>,
}

impl ReportWriter {
    /// Create the output directory if needed and open all four channels
    pub fn create(dir: &Path) -> ReconcileResult<Self> {
        std::fs::create_dir_all(dir).map_err(|source| ReconcileError::Report {
            path: dir.to_path_buf(),
            source,
        })?;

        let channels = OutcomeKind::ALL
            .into_iter()
            .map(|kind| Channel::create(channel_path(dir, kind)))
            .collect::<ReconcileResult<Vec<_>>>()?;

        tracing::debug!(dir = %dir.display(), "Report channels created");

        Ok(Self {
            dir: dir.to_path_buf(),
            channels,
        })
    }
}

impl ReportSink for ReportWriter {
    fn record(&mut self, outcome: &Outcome<'_>) -> ReconcileResult<()> {
        self.channels[outcome.kind().slot()].write_line(&outcome.report_line())
    }

    fn finish(mut self) -> ReconcileResult<()> {
        for channel in &mut self.channels {
            channel.flush()?;
        }
        Ok(())
    }

    fn output_dir(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}

/// Path of one channel file inside an output directory
pub fn channel_path(dir: &Path, kind: OutcomeKind) -> PathBuf {
    dir.join(kind.file_name())
}

/// In-memory sink collecting report lines per channel
///
/// For embedding the engine where the job runner wants the outcomes in
/// process rather than on disk.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    lines: [Vec<String>; 4],
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self, kind: OutcomeKind) -> &[String] {
        &self.lines[kind.slot()]
    }
}

impl ReportSink for CollectingSink {
    fn record(&mut self, outcome: &Outcome<'_>) -> ReconcileResult<()> {
        self.lines[outcome.kind().slot()].push(outcome.report_line());
        Ok(())
    }

    fn finish(self) -> ReconcileResult<()> {
        Ok(())
    }
}

impl<S: ReportSink> ReportSink for &mut S {
    fn record(&mut self, outcome: &Outcome<'_>) -> ReconcileResult<()> {
        (**self).record(outcome)
    }

    fn finish(self) -> ReconcileResult<()> {
        // The owner finishes the underlying sink
        Ok(())
    }

    fn output_dir(&self) -> Option<&Path> {
        (**self).output_dir()
    }
}
