//! dpa-reconcile library interface
//!
//! Cross-validates the legacy tape-archive extract against the catalog
//! extract before legacy content is trusted for import. Every catalog record
//! lands in exactly one of verified, mismatch or missing-in-legacy; every
//! legacy record no catalog record referenced is reported as an orphan.
//!
//! ```no_run
//! use dpa_reconcile::{ReconcileOptions, ReconciliationEngine};
//! use std::fs::File;
//! use std::io::BufReader;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let legacy = BufReader::new(File::open("legacy.txt")?);
//! let catalog = BufReader::new(File::open("catalog.txt")?);
//!
//! let engine = ReconciliationEngine::create(Path::new("out"), ReconcileOptions::default())?;
//! let summary = engine.run(legacy, catalog)?;
//! println!("{}", summary.statistics.display_string());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod extract;
pub mod identity;
pub mod index;
pub mod options;
pub mod report;
pub mod stats;

pub use crate::engine::{classify, Classification, ReconciliationEngine};
pub use crate::error::{IdentityError, LineParseError, ReconcileError, ReconcileResult};
pub use crate::identity::{normalize, ArchiveId};
pub use crate::index::LegacyIndex;
pub use crate::options::ReconcileOptions;
pub use crate::report::{Outcome, OutcomeKind, ReportSink, ReportWriter};
pub use crate::stats::{RunStatistics, RunSummary};
