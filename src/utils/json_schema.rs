//! Stable stats record emitted on success
//! Consumers find it by the marker prefix and validate it with
//! [`StatsRecordV1::parse_line`].

use crate::config::types::*;
use serde::{Deserialize, Serialize};

/// Prefix of the stats line on the diagnostic channel
pub const STATS_MARKER: &str = "__EXECUTION_STATS__:";

/// Current record version
pub const SCHEMA_VERSION: u32 = 1;

/// Stats record (v1)
/// This schema is frozen; additions require a new version.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StatsRecordV1 {
    pub schema_version: u32,

    /// Wall-clock runtime, truncated to whole milliseconds
    pub runtime_ms: u64,

    /// Peak-RSS delta in bytes; may be zero or negative
    pub memory_bytes: i64,

    /// Always true: the record is only ever written for a successful run
    pub success: bool,
}

impl StatsRecordV1 {
    pub fn new(runtime_ms: u64, memory_bytes: i64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            runtime_ms,
            memory_bytes,
            success: true,
        }
    }

    /// The stats record of a successful result, `None` for a failure.
    pub fn from_result(result: &ExecutionResult) -> Option<Self> {
        match result {
            ExecutionResult::Success {
                runtime_ms,
                memory_bytes,
            } => Some(Self::new(*runtime_ms, *memory_bytes)),
            ExecutionResult::Failure(_) => None,
        }
    }

    /// Serialize to a compact JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| RunnerError::Config(format!("Failed to serialize stats record: {}", e)))
    }

    /// Marker-prefixed line, without the trailing newline
    pub fn to_line(&self) -> Result<String> {
        Ok(format!("{}{}", STATS_MARKER, self.to_json()?))
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let record: Self = serde_json::from_str(json).map_err(|e| {
            RunnerError::Report(format!("Failed to deserialize stats record: {}", e))
        })?;
        record.validate()?;
        Ok(record)
    }

    /// Parse one diagnostic line. Returns `Ok(None)` for lines without the
    /// marker.
    pub fn parse_line(line: &str) -> Result<Option<Self>> {
        match line.trim_end().strip_prefix(STATS_MARKER) {
            Some(json) => Self::from_json(json).map(Some),
            None => Ok(None),
        }
    }

    /// Validate schema version and the success flag
    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(RunnerError::Report(format!(
                "Unsupported schema version: {}",
                self.schema_version
            )));
        }
        if !self.success {
            return Err(RunnerError::Report(
                "stats record must carry success=true".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_has_marker_and_exact_fields() {
        let line = StatsRecordV1::new(12, 9_437_184).to_line().unwrap();
        assert_eq!(
            line,
            r#"__EXECUTION_STATS__:{"schema_version":1,"runtime_ms":12,"memory_bytes":9437184,"success":true}"#
        );
    }

    #[test]
    fn failures_have_no_record() {
        let failure = Failure::new(FailureKind::DeadlineExceeded, "Code execution timed out");
        assert_eq!(StatsRecordV1::from_result(&failure.into()), None);

        let success = ExecutionResult::Success {
            runtime_ms: 3,
            memory_bytes: -4096,
        };
        assert_eq!(
            StatsRecordV1::from_result(&success),
            Some(StatsRecordV1::new(3, -4096))
        );
    }

    #[test]
    fn parse_line_ignores_other_output() {
        assert_eq!(StatsRecordV1::parse_line("hello from stderr").unwrap(), None);
        assert_eq!(StatsRecordV1::parse_line("").unwrap(), None);
    }

    #[test]
    fn parse_line_is_strict() {
        let extra = r#"__EXECUTION_STATS__:{"schema_version":1,"runtime_ms":1,"memory_bytes":0,"success":true,"cpu":2}"#;
        assert!(StatsRecordV1::parse_line(extra).is_err());

        let future = r#"__EXECUTION_STATS__:{"schema_version":2,"runtime_ms":1,"memory_bytes":0,"success":true}"#;
        assert!(StatsRecordV1::parse_line(future).is_err());

        let unsuccessful = r#"__EXECUTION_STATS__:{"schema_version":1,"runtime_ms":1,"memory_bytes":0,"success":false}"#;
        assert!(StatsRecordV1::parse_line(unsuccessful).is_err());

        let missing = r#"__EXECUTION_STATS__:{"schema_version":1,"runtime_ms":1,"success":true}"#;
        assert!(StatsRecordV1::parse_line(missing).is_err());
    }

    #[test]
    fn parse_line_accepts_trailing_newline() {
        let line = format!("{}\n", StatsRecordV1::new(7, 0).to_line().unwrap());
        assert_eq!(
            StatsRecordV1::parse_line(&line).unwrap(),
            Some(StatsRecordV1::new(7, 0))
        );
    }
}
