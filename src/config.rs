//! Planner configuration.
//!
//! Options mirror the operator settings that influence distribution planning.
//! Every field has a default, so partial JSON documents are accepted:
//!
//! ```
//! use partroute::config::JoinPlanOptions;
//!
//! let opts = JoinPlanOptions::from_json_str(r#"{ "assume_primary": true }"#).unwrap();
//! assert!(opts.assume_primary);
//! assert!(opts.remote_keyed_lookup);
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinPlanOptions {
    /// Allow routing lookups to the worker owning each index part.
    pub remote_keyed_lookup: bool,
    /// Keep lookup routing on regardless of the viability heuristic.
    pub force_remote_keyed_lookup: bool,
    /// Allow routing fetches to the worker owning each data part.
    pub remote_keyed_fetch: bool,
    /// Keep fetch routing on regardless of the viability heuristic.
    pub force_remote_keyed_fetch: bool,
    /// Only consider the primary copy of each part and skip existence checks.
    pub assume_primary: bool,
    /// List index parts on every worker holding a local replica.
    pub all_local_index_parts: bool,
    /// List data parts on every worker holding a local replica.
    pub all_local_fetch_parts: bool,
    /// Operator runs in strict local-data mode.
    pub local_data: bool,
    /// Downgrade a record layout CRC mismatch to a warning.
    pub allow_format_translation: bool,
    /// Map the index and data files concurrently.
    pub parallel_mapping: bool,
}

impl Default for JoinPlanOptions {
    fn default() -> Self {
        Self {
            remote_keyed_lookup: true,
            force_remote_keyed_lookup: false,
            remote_keyed_fetch: true,
            force_remote_keyed_fetch: false,
            assume_primary: false,
            all_local_index_parts: false,
            all_local_fetch_parts: false,
            local_data: false,
            allow_format_translation: false,
            parallel_mapping: true,
        }
    }
}

impl JoinPlanOptions {
    /// Parse options from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON or has mistyped fields.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse join plan options")
    }

    /// Load options from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = read_to_string(path)
            .with_context(|| format!("Failed to read options file {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Lookup routing before any heuristic or locality override.
    #[must_use]
    pub fn initial_lookup_routing(&self) -> bool {
        self.remote_keyed_lookup || self.force_remote_keyed_lookup
    }

    /// Fetch routing before any heuristic or locality override.
    #[must_use]
    pub fn initial_fetch_routing(&self) -> bool {
        self.remote_keyed_fetch || self.force_remote_keyed_fetch
    }
}
