use crate::config::types::InterpreterConfig;
use crate::judge::adapter::InterpreterAdapter;
use std::path::Path;

/// Bootstrap executed with `-c`. It is passed as one argument, so it must stay
/// well under the kernel's per-argument size limit.
pub const BOOTSTRAP: &str = include_str!("bootstrap.py");

#[derive(Debug, Clone, Default)]
pub struct PythonAdapter;

impl InterpreterAdapter for PythonAdapter {
    fn language(&self) -> &'static str {
        "python"
    }

    fn run_command(&self, interpreter: &InterpreterConfig, submission: &Path) -> Vec<String> {
        let mut command = Vec::with_capacity(interpreter.args.len() + 4);
        command.push(interpreter.program.clone());
        command.extend(interpreter.args.iter().cloned());
        command.push("-c".to_string());
        command.push(BOOTSTRAP.to_string());
        // The path is only used as the code object's filename, which keeps
        // tracebacks pointing at the submission.
        command.push(submission.to_string_lossy().to_string());
        command
    }
}
