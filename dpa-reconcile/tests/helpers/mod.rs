//! Shared helpers for reconciliation integration tests

#![allow(dead_code)]

use dpa_reconcile::report::channel_path;
use dpa_reconcile::{OutcomeKind, ReconcileOptions, ReconciliationEngine, RunSummary};
use std::io::Cursor;
use std::path::Path;

/// Catalog extract line with the usual six keys
pub fn catalog_line(id: &str, size: u64, archive_md5: &str) -> String {
    format!(
        "ARCHIVE_FILE:{id}.tar;CATALOG:main;MASTER_MD5:master-{id};IDENTIFIER:info:dpa/{id}#0;ARCHIVE_MD5:{archive_md5};SIZE:{size}"
    )
}

/// Legacy extract line with a URI-style identifier
pub fn legacy_line(id: &str, size: u64, checksum: &str) -> String {
    format!("{id}.tar##tape://vault/shelf/{id}##{size}##{checksum}")
}

/// Join lines into an extract body with a trailing newline
pub fn extract(lines: &[String]) -> String {
    let mut body = lines.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    body
}

/// Run a file-backed reconciliation into `dir` over in-memory extracts
pub fn reconcile_into(
    dir: &Path,
    legacy: &[String],
    catalog: &[String],
    options: ReconcileOptions,
) -> RunSummary {
    ReconciliationEngine::create(dir, options)
        .unwrap()
        .run(
            Cursor::new(extract(legacy)),
            Cursor::new(extract(catalog)),
        )
        .unwrap()
}

/// Lines written to one report channel
pub fn read_channel(dir: &Path, kind: OutcomeKind) -> Vec<String> {
    std::fs::read_to_string(channel_path(dir, kind))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Every line written to any channel
pub fn all_report_lines(dir: &Path) -> Vec<String> {
    OutcomeKind::ALL
        .into_iter()
        .flat_map(|kind| read_channel(dir, kind))
        .collect()
}
