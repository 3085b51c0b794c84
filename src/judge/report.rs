//! Failure report written by the payload on the report descriptor.

use crate::config::types::{Result, RunnerError};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Interpreter-level out-of-memory under the address-space ceiling
    Memory,
    /// `Solution` or `Solution.main` not callable without arguments
    EntryPoint,
    /// Any other raised error, including malformed source
    Runtime,
    /// The submission requested a non-zero exit status
    Exit,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PayloadReport {
    pub kind: ReportKind,
    pub message: String,
    #[serde(default)]
    pub trace: Option<String>,
}

impl PayloadReport {
    /// Parse the report channel contents. An empty channel means the payload
    /// reported nothing.
    pub fn parse(text: &str) -> Result<Option<Self>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(text)
            .map(Some)
            .map_err(|e| RunnerError::Report(format!("malformed payload report: {}", e)))
    }
}
