//! Per-run context
//!
//! Everything a run mutates besides its report sink lives here: run identity,
//! start time, counters and the cancellation token. A context is created at
//! the start of [`ReconciliationEngine::run`](crate::engine::ReconciliationEngine::run),
//! threaded through each phase, and consumed into the run summary.

use crate::error::{LineParseError, ReconcileError, ReconcileResult};
use crate::extract::{ExtractLine, ExtractLines};
use crate::stats::{ExtractSide, RunStatistics};
use chrono::{DateTime, Utc};
use std::io::BufRead;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// State owned by a single reconciliation run
#[derive(Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub stats: RunStatistics,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: dpa_common::time::now(),
            stats: RunStatistics::default(),
            cancel,
        }
    }

    /// Fail with [`ReconcileError::Cancelled`] once the token has fired
    pub fn check_cancelled(&self) -> ReconcileResult<()> {
        if self.cancel.is_cancelled() {
            Err(ReconcileError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Stream an extract, handing each parsed record to `on_record`
    ///
    /// Blank lines are counted and ignored. Undecodable and malformed lines
    /// are counted as rejects and skipped. Read failures abort the stream.
    /// Cancellation is polled before every line.
    pub fn drain_extract<R, T, P, F>(
        &mut self,
        reader: R,
        side: ExtractSide,
        parse: P,
        mut on_record: F,
    ) -> ReconcileResult<()>
    where
        R: BufRead,
        P: Fn(&str) -> Result<T, LineParseError>,
        F: FnMut(&mut Self, T, usize) -> ReconcileResult<()>,
    {
        for next in ExtractLines::new(reader) {
            self.check_cancelled()?;

            let numbered = next.map_err(|source| ReconcileError::Input { side, source })?;
            self.stats.side_mut(side).lines_read += 1;

            let parsed = match numbered.line {
                ExtractLine::Blank => {
                    self.stats.side_mut(side).blank_lines += 1;
                    continue;
                }
                ExtractLine::Undecodable => Err(LineParseError::InvalidUtf8),
                ExtractLine::Text(text) => parse(&text),
            };

            match parsed {
                Ok(record) => {
                    self.stats.side_mut(side).records_parsed += 1;
                    on_record(self, record, numbered.number)?;
                }
                Err(e) => {
                    debug!(
                        side = %side,
                        line = numbered.number,
                        error = %e,
                        "Skipping malformed extract line"
                    );
                    self.stats.record_reject(side, &e);
                }
            }
        }

        Ok(())
    }
}
