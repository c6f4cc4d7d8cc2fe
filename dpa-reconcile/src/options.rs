//! Reconciliation options

use dpa_common::config::{ChecksumSource, ReconcileSettings};

/// How catalog and legacy attributes are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Catalog checksum compared against the legacy checksum
    pub checksum_source: ChecksumSource,
    /// Treat `ABC123` and `abc123` as the same checksum
    pub ignore_checksum_case: bool,
}

impl ReconcileOptions {
    pub fn checksums_match(&self, catalog: &str, legacy: &str) -> bool {
        if self.ignore_checksum_case {
            catalog.eq_ignore_ascii_case(legacy)
        } else {
            catalog == legacy
        }
    }
}

impl From<&ReconcileSettings> for ReconcileOptions {
    fn from(settings: &ReconcileSettings) -> Self {
        Self {
            checksum_source: settings.checksum_source,
            ignore_checksum_case: settings.ignore_checksum_case,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_comparison_by_default() {
        let options = ReconcileOptions::default();
        assert!(options.checksums_match("d41d8cd9", "d41d8cd9"));
        assert!(!options.checksums_match("D41D8CD9", "d41d8cd9"));
    }

    #[test]
    fn test_case_insensitive_comparison() {
        let options = ReconcileOptions {
            ignore_checksum_case: true,
            ..Default::default()
        };
        assert!(options.checksums_match("D41D8CD9", "d41d8cd9"));
        assert!(!options.checksums_match("d41d8cd8", "d41d8cd9"));
    }

    #[test]
    fn test_from_settings() {
        let settings = ReconcileSettings {
            checksum_source: ChecksumSource::MasterMd5,
            ignore_checksum_case: true,
        };
        let options = ReconcileOptions::from(&settings);
        assert_eq!(options.checksum_source, ChecksumSource::MasterMd5);
        assert!(options.ignore_checksum_case);
    }
}
