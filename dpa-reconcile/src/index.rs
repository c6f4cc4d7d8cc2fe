//! Legacy index
//!
//! In-memory map from normalized identifier to legacy record, built by
//! draining the whole legacy extract before any catalog line is read. Memory
//! is O(legacy records), the bound the two-phase design exists to respect.
//!
//! Duplicate identifiers: the first occurrence is indexed, later occurrences
//! are counted as anomalies and logged, never silently replacing the entry.
//!
//! The index holds no per-run mutable state. Which entries a catalog record
//! referenced is tracked by the compare phase in its own set, so a built index
//! can be shared read-only.

use crate::context::RunContext;
use crate::error::ReconcileResult;
use crate::extract::LegacyExtractRecord;
use crate::identity::ArchiveId;
use crate::stats::ExtractSide;
use std::collections::HashMap;
use std::io::BufRead;
use tracing::warn;

/// Indexed legacy record with the extract line it came from
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    pub line_number: usize,
    pub record: LegacyExtractRecord,
}

/// Outcome of inserting one legacy record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Identifier already indexed from `first_line`; the new record was dropped
    Duplicate { first_line: usize },
}

/// Legacy records keyed by normalized identifier, in extract order
#[derive(Debug, Default)]
pub struct LegacyIndex {
    entries: Vec<IndexedRecord>,
    by_id: HashMap<ArchiveId, usize>,
}

impl LegacyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain a legacy extract into a new index
    ///
    /// Malformed lines are skipped and counted; duplicate identifiers are
    /// counted in `legacy_duplicates`. Fails only on read errors or
    /// cancellation.
    pub fn build<R: BufRead>(reader: R, ctx: &mut RunContext) -> ReconcileResult<Self> {
        let mut index = Self::new();

        ctx.drain_extract(
            reader,
            ExtractSide::Legacy,
            LegacyExtractRecord::parse,
            |ctx, record, line_number| {
                if let InsertOutcome::Duplicate { first_line } = index.insert(record, line_number) {
                    ctx.stats.legacy_duplicates += 1;
                    warn!(
                        line = line_number,
                        first_line,
                        "Duplicate legacy identifier, keeping first occurrence"
                    );
                }
                Ok(())
            },
        )?;

        ctx.stats.legacy_indexed = index.len();
        Ok(index)
    }

    /// Insert a record unless its identifier is already present
    pub fn insert(&mut self, record: LegacyExtractRecord, line_number: usize) -> InsertOutcome {
        if let Some(&slot) = self.by_id.get(record.id()) {
            return InsertOutcome::Duplicate {
                first_line: self.entries[slot].line_number,
            };
        }

        self.by_id.insert(record.id().clone(), self.entries.len());
        self.entries.push(IndexedRecord {
            line_number,
            record,
        });
        InsertOutcome::Inserted
    }

    pub fn get(&self, id: &ArchiveId) -> Option<&LegacyExtractRecord> {
        self.by_id.get(id).map(|&slot| &self.entries[slot].record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed records in legacy extract order
    pub fn iter(&self) -> impl Iterator<Item = &IndexedRecord> {
        self.entries.iter()
    }
}
