//! shotbox: single-shot runner for untrusted submissions under kernel-enforced ceilings
//!
//! # Architecture
//!
//! One invocation runs one submission in a separate interpreter process and
//! reports exactly one outcome on stderr.
//!
//! ## Kernel Primitives ([`kernel`])
//! - [`kernel::rlimit`]: Address-space, CPU-time and file-size ceilings
//! - [`kernel::signal`]: Wall-clock deadline guard (SIGALRM)
//! - [`kernel::memfd`]: Sealed in-memory files for the source and report channels
//!
//! ## Execution Control ([`exec`])
//! - [`exec::executor`]: Run orchestration
//! - [`exec::preexec`]: Type-state enforced pre-exec ordering
//!
//! ## Judge Adapters ([`judge`])
//! - [`judge::adapter`]: Interpreter adapter trait
//! - [`judge::languages`]: Python bootstrap and entry-point contract
//! - [`judge::report`]: Failure report written by the payload
//!
//! ## Verdict ([`verdict`])
//! - [`verdict::verdict`]: Outcome classification over wait status, report and usage
//!
//! ## Observability ([`observability`])
//! - [`observability::usage`]: Runtime and peak-memory sampling
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: Shared types, errors and the failure taxonomy
//! - [`config::loader`]: JSON configuration overlay
//! - [`config::validator`]: Startup validation
//!
//! ## Utilities ([`utils`])
//! - [`utils::env_hygiene`]: Payload environment sanitization
//! - [`utils::output`]: Result emitter
//! - [`utils::json_schema`]: Versioned stats record
//!
//! # Design Principles
//!
//! 1. **Untrusted code never runs in the harness** - the payload is its own process
//! 2. **Kernel as truth** - ceilings are rlimits, usage is `getrusage`
//! 3. **Types prevent errors** - pre-exec ordering is a type-state chain
//! 4. **One outcome per run** - exit 0 with a stats line, or exit 1 with a message

// Kernel Primitives
pub mod kernel;

// Execution Control
pub mod exec;

// Judge adapters (interpreter-specific launch and bootstrap)
pub mod judge;

// Verdict
pub mod verdict;

// Observability
pub mod observability;

// Configuration
pub mod config;

// Utilities
pub mod utils;

// CLI entrypoint wiring for the shotbox binary.
pub mod cli;

// Re-export commonly used types for convenience
pub use config::types::*;
pub use exec::executor::{ProcessExecutor, Submission};
pub use utils::json_schema::{StatsRecordV1, STATS_MARKER};
