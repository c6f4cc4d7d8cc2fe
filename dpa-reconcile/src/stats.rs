//! Reconciliation run statistics
//!
//! Counters accumulated while a run streams both extracts, plus the summary
//! handed back to the job runner when the run completes.

use crate::error::LineParseError;
use crate::report::OutcomeKind;
use chrono::{DateTime, Utc};
use dpa_common::config::ChecksumSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Which extract a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractSide {
    Legacy,
    Catalog,
}

impl fmt::Display for ExtractSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractSide::Legacy => write!(f, "legacy"),
            ExtractSide::Catalog => write!(f, "catalog"),
        }
    }
}

/// Line-level counters for one extract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideStats {
    /// Lines read, including blank and rejected ones
    pub lines_read: usize,
    /// Empty or whitespace-only lines (ignored, not errors)
    pub blank_lines: usize,
    /// Lines that produced a record
    pub records_parsed: usize,
    /// Lines skipped because they did not parse
    pub rejected: usize,
    /// Rejections by error kind
    pub parse_errors: BTreeMap<String, usize>,
}

impl SideStats {
    fn record_reject(&mut self, error: &LineParseError) {
        self.rejected += 1;
        *self.parse_errors.entry(error.kind().to_string()).or_insert(0) += 1;
    }
}

/// Per-outcome counts, one per report channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub verified: usize,
    pub mismatched: usize,
    pub missing_in_legacy: usize,
    pub orphaned: usize,
}

impl OutcomeCounts {
    pub fn get(&self, kind: OutcomeKind) -> usize {
        match kind {
            OutcomeKind::Verified => self.verified,
            OutcomeKind::Mismatch => self.mismatched,
            OutcomeKind::MissingInLegacy => self.missing_in_legacy,
            OutcomeKind::Orphan => self.orphaned,
        }
    }

    fn increment(&mut self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::Verified => self.verified += 1,
            OutcomeKind::Mismatch => self.mismatched += 1,
            OutcomeKind::MissingInLegacy => self.missing_in_legacy += 1,
            OutcomeKind::Orphan => self.orphaned += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.verified + self.mismatched + self.missing_in_legacy + self.orphaned
    }
}

/// Counters for one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub legacy: SideStats,
    pub catalog: SideStats,
    /// Distinct identifiers held in the legacy index
    pub legacy_indexed: usize,
    /// Legacy lines whose identifier was already indexed (first occurrence kept)
    pub legacy_duplicates: usize,
    pub outcomes: OutcomeCounts,
    /// Mismatches where declared sizes differ
    pub size_mismatches: usize,
    /// Mismatches where checksums differ
    pub checksum_mismatches: usize,
}

impl RunStatistics {
    pub fn side(&self, side: ExtractSide) -> &SideStats {
        match side {
            ExtractSide::Legacy => &self.legacy,
            ExtractSide::Catalog => &self.catalog,
        }
    }

    pub(crate) fn side_mut(&mut self, side: ExtractSide) -> &mut SideStats {
        match side {
            ExtractSide::Legacy => &mut self.legacy,
            ExtractSide::Catalog => &mut self.catalog,
        }
    }

    pub(crate) fn record_reject(&mut self, side: ExtractSide, error: &LineParseError) {
        self.side_mut(side).record_reject(error);
    }

    pub(crate) fn record_outcome(&mut self, kind: OutcomeKind) {
        self.outcomes.increment(kind);
    }

    /// Rejected lines across both extracts
    pub fn total_rejected(&self) -> usize {
        self.legacy.rejected + self.catalog.rejected
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} verified, {} mismatched ({} size, {} checksum), {} missing in legacy, {} orphaned; \
             legacy: {} lines, {} indexed, {} duplicates, {} rejected; \
             catalog: {} lines, {} rejected",
            self.outcomes.verified,
            self.outcomes.mismatched,
            self.size_mismatches,
            self.checksum_mismatches,
            self.outcomes.missing_in_legacy,
            self.outcomes.orphaned,
            self.legacy.lines_read,
            self.legacy_indexed,
            self.legacy_duplicates,
            self.legacy.rejected,
            self.catalog.lines_read,
            self.catalog.rejected,
        )
    }
}

/// Result of a completed reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Report directory, when the run wrote to files
    pub output_dir: Option<PathBuf>,
    pub checksum_source: ChecksumSource,
    pub statistics: RunStatistics,
}

impl RunSummary {
    /// True when anything landed outside the verified channel or a line was skipped
    pub fn requires_review(&self) -> bool {
        let outcomes = &self.statistics.outcomes;
        outcomes.mismatched > 0
            || outcomes.missing_in_legacy > 0
            || outcomes.orphaned > 0
            || self.statistics.total_rejected() > 0
            || self.statistics.legacy_duplicates > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IdentityError;

    #[test]
    fn test_reject_breakdown_by_kind() {
        let mut stats = RunStatistics::default();
        stats.record_reject(ExtractSide::Catalog, &LineParseError::InvalidSize("x".into()));
        stats.record_reject(ExtractSide::Catalog, &LineParseError::InvalidSize("y".into()));
        stats.record_reject(ExtractSide::Legacy, &IdentityError::Empty.into());

        assert_eq!(stats.catalog.rejected, 2);
        assert_eq!(stats.catalog.parse_errors.get("invalid_size"), Some(&2));
        assert_eq!(stats.legacy.parse_errors.get("identity"), Some(&1));
        assert_eq!(stats.total_rejected(), 3);
    }

    #[test]
    fn test_outcome_counts() {
        let mut stats = RunStatistics::default();
        stats.record_outcome(OutcomeKind::Verified);
        stats.record_outcome(OutcomeKind::Verified);
        stats.record_outcome(OutcomeKind::Orphan);

        assert_eq!(stats.outcomes.get(OutcomeKind::Verified), 2);
        assert_eq!(stats.outcomes.get(OutcomeKind::Orphan), 1);
        assert_eq!(stats.outcomes.get(OutcomeKind::Mismatch), 0);
        assert_eq!(stats.outcomes.total(), 3);
    }

    #[test]
    fn test_display_string() {
        let mut stats = RunStatistics::default();
        stats.record_outcome(OutcomeKind::Verified);
        stats.legacy.lines_read = 4;
        stats.legacy_indexed = 3;
        stats.legacy_duplicates = 1;

        let text = stats.display_string();
        assert!(text.starts_with("1 verified, 0 mismatched"));
        assert!(text.contains("legacy: 4 lines, 3 indexed, 1 duplicates"));
    }

    #[test]
    fn test_summary_serializes_side_names() {
        let json = serde_json::to_string(&ExtractSide::Legacy).unwrap();
        assert_eq!(json, "\"legacy\"");
    }
}
