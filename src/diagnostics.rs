//! Non-fatal planning diagnostics.
//!
//! Conditions that do not abort planning are collected as [`PlanWarning`]s on
//! the resulting plan and logged through `tracing` as they are raised.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// A non-fatal condition detected while planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanWarning {
    /// An encryption key was supplied for a data file not published as encrypted.
    EncryptionKeyIgnored { file: String },
    /// The record layout differs but translation was allowed.
    FormatTranslated {
        file: String,
        expected: u32,
        found: u32,
    },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncryptionKeyIgnored { file } => write!(
                f,
                "Full-Keyed-Join: ignoring encryption key provided as file '{file}' was not published as encrypted"
            ),
            Self::FormatTranslated {
                file,
                expected,
                found,
            } => write!(
                f,
                "record layout of '{file}' (crc {found:#010x}) differs from expected (crc {expected:#010x}), translating"
            ),
        }
    }
}

/// Collects warnings raised during one planning pass.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<PlanWarning>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a warning.
    pub fn warn(&mut self, warning: PlanWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    #[must_use]
    pub fn warnings(&self) -> &[PlanWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn into_warnings(self) -> Vec<PlanWarning> {
        self.warnings
    }

    /// Export warnings as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.warnings)
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Diagnostics({} warnings)", self.warning_count())
    }
}
