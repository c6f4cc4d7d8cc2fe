//! Error types for dpa-reconcile
//!
//! Two severities:
//! - Recoverable: [`LineParseError`] / [`IdentityError`]. The offending line is
//!   skipped, counted in the run statistics, and processing continues.
//! - Fatal: [`ReconcileError`]. The run aborts; report files written so far
//!   are left in place (the job is read-only on its inputs and safe to re-run).
//!
//! Data disagreements between the two extracts are not errors at all. They are
//! outcomes, reported through the mismatch, missing and orphan channels.

use crate::extract::CatalogField;
use std::path::PathBuf;
use thiserror::Error;

/// Identifier cannot be normalized into a join key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Identifier absent or empty
    #[error("identifier is empty")]
    Empty,

    /// Identifier present but nothing is left after stripping path and fragment
    #[error("identifier '{0}' has no identity after normalization")]
    NoIdentity(String),
}

/// Extract line does not conform to its grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineParseError {
    /// Catalog line has fewer `;` segments than required keys
    #[error("expected at least {required} segments, found {found}")]
    TooFewSegments { found: usize, required: usize },

    /// Catalog segment without a `KEY:VALUE` separator
    #[error("segment '{0}' has no ':' separator")]
    MissingSeparator(String),

    /// Required catalog key absent
    #[error("missing required field {0}")]
    MissingField(CatalogField),

    /// Required catalog key given more than once
    #[error("field {0} appears more than once")]
    DuplicateField(CatalogField),

    /// Legacy line has fewer `##` fields than required
    #[error("expected at least {required} fields, found {found}")]
    TooFewFields { found: usize, required: usize },

    /// Declared size is not an unsigned integer
    #[error("invalid declared size '{0}'")]
    InvalidSize(String),

    /// Identifier could not be normalized
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Line bytes are not valid UTF-8
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

impl LineParseError {
    /// Stable short name used as the statistics breakdown key
    pub fn kind(&self) -> &'static str {
        match self {
            LineParseError::TooFewSegments { .. } => "too_few_segments",
            LineParseError::MissingSeparator(_) => "missing_separator",
            LineParseError::MissingField(_) => "missing_field",
            LineParseError::DuplicateField(_) => "duplicate_field",
            LineParseError::TooFewFields { .. } => "too_few_fields",
            LineParseError::InvalidSize(_) => "invalid_size",
            LineParseError::Identity(_) => "identity",
            LineParseError::InvalidUtf8 => "invalid_utf8",
        }
    }
}

/// Fatal reconciliation failure
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reading an input extract failed
    #[error("Failed to read {side} extract: {source}")]
    Input {
        side: crate::stats::ExtractSide,
        #[source]
        source: std::io::Error,
    },

    /// Creating, writing or flushing a report channel failed
    #[error("Report channel {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Run stopped through its cancellation token
    #[error("Reconciliation cancelled")]
    Cancelled,
}

/// Result type for reconciliation runs
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_error_converts_to_parse_error() {
        let err: LineParseError = IdentityError::Empty.into();
        assert_eq!(err.kind(), "identity");
        assert_eq!(err.to_string(), "identifier is empty");
    }

    #[test]
    fn test_report_error_names_channel() {
        let err = ReconcileError::Report {
            path: PathBuf::from("/out/orphan.txt"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        let message = err.to_string();
        assert!(message.contains("/out/orphan.txt"));
        assert!(message.contains("disk full"));
    }
}
