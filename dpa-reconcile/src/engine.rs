//! Reconciliation engine
//!
//! Two-phase streaming comparison of the legacy and catalog extracts.
//!
//! # Phases
//! INDEX BUILD → COMPARE → ORPHAN SWEEP
//!
//! - **INDEX BUILD**: drain the legacy extract into a [`LegacyIndex`]. No
//!   comparison starts until the legacy stream is exhausted, which bounds peak
//!   memory to the legacy record count.
//! - **COMPARE**: stream the catalog extract one record at a time and classify
//!   each against the index (verified, mismatch, missing in legacy). Duplicate
//!   catalog records are classified independently.
//! - **ORPHAN SWEEP**: walk the index once, in legacy extract order, and report
//!   every entry no catalog record referenced.
//!
//! Single-threaded and strictly ordered. Report channels are owned by the
//! engine for the whole run and closed on every exit path, including errors
//! and cancellation.

use crate::context::RunContext;
use crate::error::ReconcileResult;
use crate::extract::{CatalogExtractRecord, LegacyExtractRecord};
use crate::identity::ArchiveId;
use crate::index::LegacyIndex;
use crate::options::ReconcileOptions;
use crate::report::{MismatchedAttributes, Outcome, ReportSink, ReportWriter};
use crate::stats::{ExtractSide, RunSummary};
use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span};

/// Classification of one catalog record against the index
///
/// Matched variants carry the legacy counterpart they were compared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    Verified(&'a LegacyExtractRecord),
    Mismatch(&'a LegacyExtractRecord, MismatchedAttributes),
    MissingInLegacy,
}

impl<'a> Classification<'a> {
    /// Legacy record the catalog record was matched with, if any
    pub fn legacy(&self) -> Option<&'a LegacyExtractRecord> {
        match *self {
            Classification::Verified(legacy) | Classification::Mismatch(legacy, _) => {
                Some(legacy)
            }
            Classification::MissingInLegacy => None,
        }
    }
}

/// Classify a catalog record against its legacy counterpart, if any
pub fn classify<'a>(
    catalog: &CatalogExtractRecord,
    legacy: Option<&'a LegacyExtractRecord>,
    options: &ReconcileOptions,
) -> Classification<'a> {
    let Some(legacy) = legacy else {
        return Classification::MissingInLegacy;
    };

    let attributes = MismatchedAttributes {
        size: catalog.size() != legacy.size(),
        checksum: !options
            .checksums_match(catalog.checksum(options.checksum_source), legacy.checksum()),
    };

    if attributes.any() {
        Classification::Mismatch(legacy, attributes)
    } else {
        Classification::Verified(legacy)
    }
}

/// Archive reconciliation engine
///
/// Constructing a file-backed engine with [`ReconciliationEngine::create`]
/// creates the four report files immediately, before any input is read.
pub struct ReconciliationEngine<S: ReportSink = ReportWriter> {
    sink: S,
    options: ReconcileOptions,
    cancel: CancellationToken,
}

impl ReconciliationEngine<ReportWriter> {
    /// Create an engine writing to `output_dir`
    ///
    /// Creates the directory if missing and creates or truncates all four
    /// channel files.
    pub fn create(output_dir: &Path, options: ReconcileOptions) -> ReconcileResult<Self> {
        let sink = ReportWriter::create(output_dir)?;
        Ok(Self::with_sink(sink, options))
    }
}

impl<S: ReportSink> ReconciliationEngine<S> {
    pub fn with_sink(sink: S, options: ReconcileOptions) -> Self {
        Self {
            sink,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the run between records once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Run the full reconciliation
    ///
    /// Consumes the engine: channels are flushed and closed when the run
    /// completes, and closed without further writes when it fails.
    pub fn run<L, C>(self, legacy: L, catalog: C) -> ReconcileResult<RunSummary>
    where
        L: BufRead,
        C: BufRead,
    {
        let Self {
            mut sink,
            options,
            cancel,
        } = self;

        let mut ctx = RunContext::new(cancel);
        let span = info_span!("reconcile", run_id = %ctx.run_id);
        let _enter = span.enter();

        info!(
            checksum_source = %options.checksum_source,
            ignore_checksum_case = options.ignore_checksum_case,
            "Reconciliation started"
        );

        // Phase 1: index build
        let index = LegacyIndex::build(legacy, &mut ctx)?;
        info!(
            indexed = index.len(),
            duplicates = ctx.stats.legacy_duplicates,
            rejected = ctx.stats.legacy.rejected,
            "Legacy index built"
        );

        // Phase 2: compare
        let referenced = compare_catalog(&index, catalog, &mut sink, &options, &mut ctx)?;
        info!(
            verified = ctx.stats.outcomes.verified,
            mismatched = ctx.stats.outcomes.mismatched,
            missing_in_legacy = ctx.stats.outcomes.missing_in_legacy,
            rejected = ctx.stats.catalog.rejected,
            "Catalog compare complete"
        );

        // Phase 3: orphan sweep
        ctx.check_cancelled()?;
        sweep_orphans(&index, &referenced, &mut sink, &mut ctx)?;
        info!(orphaned = ctx.stats.outcomes.orphaned, "Orphan sweep complete");

        let output_dir = sink.output_dir().map(Path::to_path_buf);
        sink.finish()?;

        let finished_at = dpa_common::time::now();
        let summary = RunSummary {
            run_id: ctx.run_id,
            started_at: ctx.started_at,
            finished_at,
            duration_ms: dpa_common::time::elapsed_millis(ctx.started_at, finished_at),
            output_dir,
            checksum_source: options.checksum_source,
            statistics: ctx.stats,
        };

        info!("Reconciliation finished: {}", summary.statistics.display_string());
        Ok(summary)
    }
}

/// Stream the catalog extract against the index
///
/// Returns the identifiers referenced by at least one catalog record, verified
/// or mismatched. The index itself is never mutated.
fn compare_catalog<'i, C, S>(
    index: &'i LegacyIndex,
    catalog: C,
    sink: &mut S,
    options: &ReconcileOptions,
    ctx: &mut RunContext,
) -> ReconcileResult<HashSet<&'i ArchiveId>>
where
    C: BufRead,
    S: ReportSink,
{
    let mut referenced: HashSet<&'i ArchiveId> = HashSet::new();

    ctx.drain_extract(
        catalog,
        ExtractSide::Catalog,
        CatalogExtractRecord::parse,
        |ctx, record, line_number| {
            let classification = classify(&record, index.get(record.id()), options);
            let outcome = match classification {
                Classification::Verified(legacy) => Outcome::Verified {
                    catalog: &record,
                    legacy,
                },
                Classification::Mismatch(legacy, attributes) => {
                    if attributes.size {
                        ctx.stats.size_mismatches += 1;
                    }
                    if attributes.checksum {
                        ctx.stats.checksum_mismatches += 1;
                    }
                    debug!(
                        line = line_number,
                        id = %record.id(),
                        attributes = attributes.label(),
                        "Catalog record disagrees with legacy archive"
                    );
                    Outcome::Mismatch {
                        catalog: &record,
                        legacy,
                        attributes,
                    }
                }
                Classification::MissingInLegacy => Outcome::MissingInLegacy { catalog: &record },
            };

            if let Some(legacy) = classification.legacy() {
                referenced.insert(legacy.id());
            }

            sink.record(&outcome)?;
            ctx.stats.record_outcome(outcome.kind());
            Ok(())
        },
    )?;

    Ok(referenced)
}

/// Report every indexed record no catalog record referenced
fn sweep_orphans<S: ReportSink>(
    index: &LegacyIndex,
    referenced: &HashSet<&ArchiveId>,
    sink: &mut S,
    ctx: &mut RunContext,
) -> ReconcileResult<()> {
    for entry in index.iter() {
        if referenced.contains(entry.record.id()) {
            continue;
        }

        ctx.check_cancelled()?;
        let outcome = Outcome::Orphan {
            legacy: &entry.record,
        };
        sink.record(&outcome)?;
        ctx.stats.record_outcome(outcome.kind());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconcileError;
    use crate::report::{CollectingSink, OutcomeKind};
    use dpa_common::config::ChecksumSource;
    use std::io::Cursor;

    fn catalog_line(id: &str, size: u64, archive_md5: &str) -> String {
        format!(
            "ARCHIVE_FILE:{id}.tar;CATALOG:main;MASTER_MD5:M-{id};IDENTIFIER:info:cat/{id}#0;ARCHIVE_MD5:{archive_md5};SIZE:{size}"
        )
    }

    fn legacy_line(id: &str, size: u64, checksum: &str) -> String {
        format!("{id}.tar##tape://vault/{id}##{size}##{checksum}")
    }

    fn run(legacy: &[String], catalog: &[String]) -> (CollectingSink, RunSummary) {
        run_with(legacy, catalog, ReconcileOptions::default())
    }

    fn run_with(
        legacy: &[String],
        catalog: &[String],
        options: ReconcileOptions,
    ) -> (CollectingSink, RunSummary) {
        let mut sink = CollectingSink::new();
        let summary = ReconciliationEngine::with_sink(&mut sink, options)
            .run(
                Cursor::new(legacy.join("\n")),
                Cursor::new(catalog.join("\n")),
            )
            .unwrap();
        (sink, summary)
    }

    #[test]
    fn test_classify_verified() {
        let c = CatalogExtractRecord::parse(&catalog_line("u1", 10, "A")).unwrap();
        let l = LegacyExtractRecord::parse(&legacy_line("u1", 10, "A")).unwrap();
        let classification = classify(&c, Some(&l), &ReconcileOptions::default());
        assert_eq!(classification, Classification::Verified(&l));
        // The borrowed counterpart is the record passed in, not a copy
        assert!(std::ptr::eq(classification.legacy().unwrap(), &l));
    }

    #[test]
    fn test_classify_missing() {
        let c = CatalogExtractRecord::parse(&catalog_line("u1", 10, "A")).unwrap();
        let classification = classify(&c, None, &ReconcileOptions::default());
        assert_eq!(classification, Classification::MissingInLegacy);
        assert!(classification.legacy().is_none());
    }

    #[test]
    fn test_classify_reports_each_attribute() {
        let c = CatalogExtractRecord::parse(&catalog_line("u1", 10, "A")).unwrap();
        let options = ReconcileOptions::default();

        let size_only = LegacyExtractRecord::parse(&legacy_line("u1", 11, "A")).unwrap();
        assert_eq!(
            classify(&c, Some(&size_only), &options),
            Classification::Mismatch(
                &size_only,
                MismatchedAttributes {
                    size: true,
                    checksum: false
                }
            )
        );

        let both = LegacyExtractRecord::parse(&legacy_line("u1", 11, "B")).unwrap();
        assert_eq!(
            classify(&c, Some(&both), &options),
            Classification::Mismatch(
                &both,
                MismatchedAttributes {
                    size: true,
                    checksum: true
                }
            )
        );
    }

    #[test]
    fn test_single_verified() {
        let (sink, summary) = run(&[legacy_line("u1", 10, "A")], &[catalog_line("u1", 10, "A")]);
        let outcomes = &summary.statistics.outcomes;
        assert_eq!(outcomes.verified, 1);
        assert_eq!(outcomes.mismatched, 0);
        assert_eq!(outcomes.missing_in_legacy, 0);
        assert_eq!(outcomes.orphaned, 0);
        assert_eq!(sink.lines(OutcomeKind::Verified), &[catalog_line("u1", 10, "A")]);
    }

    #[test]
    fn test_mismatch_marks_legacy_referenced() {
        let (sink, summary) = run(&[legacy_line("u1", 10, "A")], &[catalog_line("u1", 10, "B")]);
        assert_eq!(summary.statistics.outcomes.mismatched, 1);
        assert_eq!(summary.statistics.outcomes.orphaned, 0);
        assert_eq!(summary.statistics.checksum_mismatches, 1);
        assert_eq!(summary.statistics.size_mismatches, 0);
        assert!(sink.lines(OutcomeKind::Mismatch)[0].starts_with("checksum\t"));
    }

    #[test]
    fn test_duplicate_catalog_records_classified_independently() {
        let line = catalog_line("u1", 10, "A");
        let (sink, summary) = run(&[legacy_line("u1", 10, "A")], &[line.clone(), line.clone()]);
        assert_eq!(summary.statistics.outcomes.verified, 2);
        assert_eq!(sink.lines(OutcomeKind::Verified), &[line.clone(), line]);
    }

    #[test]
    fn test_master_checksum_source() {
        let options = ReconcileOptions {
            checksum_source: ChecksumSource::MasterMd5,
            ..Default::default()
        };
        // catalog_line sets MASTER_MD5 to "M-<id>"
        let (_, summary) = run_with(
            &[legacy_line("u1", 10, "M-u1")],
            &[catalog_line("u1", 10, "A")],
            options,
        );
        assert_eq!(summary.statistics.outcomes.verified, 1);
        assert_eq!(summary.checksum_source, ChecksumSource::MasterMd5);
    }

    #[test]
    fn test_orphans_in_legacy_order() {
        let (sink, summary) = run(
            &[
                legacy_line("u3", 1, "C"),
                legacy_line("u1", 1, "A"),
                legacy_line("u2", 1, "B"),
            ],
            &[catalog_line("u1", 1, "A")],
        );
        assert_eq!(summary.statistics.outcomes.orphaned, 2);
        assert_eq!(
            sink.lines(OutcomeKind::Orphan),
            &[legacy_line("u3", 1, "C"), legacy_line("u2", 1, "B")]
        );
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let mut sink = CollectingSink::new();

        let result = ReconciliationEngine::with_sink(&mut sink, ReconcileOptions::default())
            .with_cancellation(token)
            .run(
                Cursor::new(legacy_line("u1", 1, "A")),
                Cursor::new(catalog_line("u1", 1, "A")),
            );

        assert!(matches!(result, Err(ReconcileError::Cancelled)));
        for kind in OutcomeKind::ALL {
            assert!(sink.lines(kind).is_empty());
        }
    }

    #[test]
    fn test_summary_without_output_dir_for_memory_sink() {
        let (_, summary) = run(&[], &[]);
        assert!(summary.output_dir.is_none());
        assert_eq!(summary.statistics.outcomes.total(), 0);
        assert!(!summary.requires_review());
    }
}
