use crate::config::types::InterpreterConfig;
use std::path::Path;

/// Interpreter adapter contract.
///
/// The produced command must make the payload:
/// - read the submission text once from [`super::SOURCE_FD`];
/// - evaluate it in a fresh top-level namespace;
/// - if `Solution` is bound, construct it with no arguments and call its
///   `main` (when present) with no arguments, exactly once, after top-level
///   evaluation; a `Solution` or `main` that cannot be called that way is an
///   entry-point contract violation;
/// - on failure write one [`super::report::PayloadReport`] to
///   [`super::REPORT_FD`] and exit non-zero; on success exit 0 and write nothing.
pub trait InterpreterAdapter: Send + Sync {
    fn language(&self) -> &'static str;
    fn run_command(&self, interpreter: &InterpreterConfig, submission: &Path) -> Vec<String>;
}
