//! Core types and structures for the shotbox runner

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Address-space ceiling applied to the payload (128 MiB)
pub const DEFAULT_ADDRESS_SPACE_BYTES: u64 = 128 * 1024 * 1024;
/// CPU-time ceiling applied to the payload
pub const DEFAULT_CPU_TIME_SECS: u64 = 5;
/// Output file size ceiling applied to the payload (64 MiB)
pub const DEFAULT_FILE_SIZE_BYTES: u64 = 64 * 1024 * 1024;
/// Wall-clock deadline
pub const DEFAULT_DEADLINE_SECS: u32 = 5;
/// Submission path used when the caller passes none
pub const DEFAULT_SUBMISSION_PATH: &str = "/tmp/code.py";

/// Resource ceilings installed on the payload, each as soft = hard.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LimitSet {
    /// RLIMIT_AS in bytes
    pub address_space_bytes: u64,
    /// RLIMIT_CPU in seconds
    pub cpu_time_secs: u64,
    /// RLIMIT_FSIZE in bytes
    pub file_size_bytes: u64,
}

impl Default for LimitSet {
    fn default() -> Self {
        Self {
            address_space_bytes: DEFAULT_ADDRESS_SPACE_BYTES,
            cpu_time_secs: DEFAULT_CPU_TIME_SECS,
            file_size_bytes: DEFAULT_FILE_SIZE_BYTES,
        }
    }
}

/// Interpreter used to evaluate submissions
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct InterpreterConfig {
    /// Program name or absolute path
    pub program: String,
    /// Arguments placed before the bootstrap
    pub args: Vec<String>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["-B".to_string()],
        }
    }
}

/// Runner configuration. Every field has a default, so a config file only
/// needs to name what it overrides.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub limits: LimitSet,
    /// Wall-clock deadline in seconds
    pub deadline_secs: u32,
    pub interpreter: InterpreterConfig,
    /// Submission used when no path is given on the command line
    pub default_submission: PathBuf,
    /// Complete environment of the payload process
    pub environment: Vec<(String, String)>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            limits: LimitSet::default(),
            deadline_secs: DEFAULT_DEADLINE_SECS,
            interpreter: InterpreterConfig::default(),
            default_submission: PathBuf::from(DEFAULT_SUBMISSION_PATH),
            environment: vec![
                ("PATH".to_string(), "/usr/local/bin:/usr/bin:/bin".to_string()),
                ("LANG".to_string(), "C.UTF-8".to_string()),
                ("HOME".to_string(), "/tmp".to_string()),
                ("PYTHONIOENCODING".to_string(), "utf-8".to_string()),
            ],
        }
    }
}

/// Custom error types for shotbox
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Resource limit error: {0}")]
    ResourceLimit(String),

    #[error("Deadline error: {0}")]
    Deadline(String),

    /// The interpreter could not be started
    #[error("Spawn error: {0}")]
    Spawn(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Report error: {0}")]
    Report(String),
}

impl From<nix::errno::Errno> for RunnerError {
    fn from(err: nix::errno::Errno) -> Self {
        RunnerError::Process(err.to_string())
    }
}

/// Result type alias for shotbox operations
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Closed failure taxonomy
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Submission missing, ceilings not installable, interpreter not startable
    Precondition,
    /// Wall-clock deadline fired
    DeadlineExceeded,
    /// Address-space ceiling hit
    MemoryExceeded,
    /// CPU-time ceiling hit (payload killed by the kernel)
    CpuTimeExceeded,
    /// `Solution` / `Solution.main` do not satisfy the entry-point contract
    EntryPoint,
    /// Anything else, including malformed source
    Unclassified,
}

/// A failed run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    pub trace: Option<String>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    pub fn missing_submission(path: &std::path::Path) -> Self {
        Self::new(
            FailureKind::Precondition,
            format!("Code file not found at {}", path.display()),
        )
    }
}

impl From<RunnerError> for Failure {
    fn from(err: RunnerError) -> Self {
        // Only errors raised before the payload starts are preconditions.
        let kind = match err {
            RunnerError::ResourceLimit(_)
            | RunnerError::Config(_)
            | RunnerError::Deadline(_)
            | RunnerError::Spawn(_) => FailureKind::Precondition,
            RunnerError::Io(_) | RunnerError::Process(_) | RunnerError::Report(_) => {
                FailureKind::Unclassified
            }
        };
        Failure::new(kind, err.to_string())
    }
}

/// Outcome of one invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionResult {
    Success { runtime_ms: u64, memory_bytes: i64 },
    Failure(Failure),
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    /// Binary exit code: 0 for success, 1 for any failure.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

impl From<Failure> for ExecutionResult {
    fn from(failure: Failure) -> Self {
        ExecutionResult::Failure(failure)
    }
}
