use crate::config::loader::load_config;
use crate::config::types::{Failure, FailureKind, RunnerConfig};
use crate::exec::executor::ProcessExecutor;
use crate::utils::output::ResultEmitter;
use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the submission source file (defaults to the configured path)
    submission: Option<PathBuf>,
    /// JSON file overriding the built-in limits, deadline and interpreter
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Resolve the configuration and the submission path for one run.
fn prepare(cli: Cli) -> Result<(RunnerConfig, PathBuf)> {
    let config = load_config(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("loading configuration from {}", path.display()),
        None => "validating built-in configuration".to_string(),
    })?;
    let submission = cli
        .submission
        .unwrap_or_else(|| config.default_submission.clone());
    Ok((config, submission))
}

/// Run with the process arguments.
pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    run_from(std::env::args_os())
}

/// Run with explicit arguments. The exit code is always 0 or 1 for a run;
/// `--help` and `--version` exit 0.
pub fn run_from<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut emitter = ResultEmitter::new(std::io::stderr().lock());

    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            let failure = Failure::new(FailureKind::Precondition, err.to_string().trim_end());
            return ExitCode::from(emitter.emit(&failure.into()));
        }
    };

    let (config, submission) = match prepare(cli) {
        Ok(prepared) => prepared,
        Err(err) => {
            log::error!("{:#}", err);
            let failure = Failure::new(FailureKind::Precondition, format!("{:#}", err));
            return ExitCode::from(emitter.emit(&failure.into()));
        }
    };

    let executor = ProcessExecutor::new(config);
    log::debug!("run id {}", executor.run_id());
    ExitCode::from(executor.run(&submission, &mut emitter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn submission_is_optional() {
        let cli = Cli::try_parse_from(["shotbox"]).unwrap();
        assert!(cli.submission.is_none());
        assert!(cli.config.is_none());

        let cli = Cli::try_parse_from(["shotbox", "/tmp/a.py", "--config", "c.json"]).unwrap();
        assert_eq!(cli.submission, Some(PathBuf::from("/tmp/a.py")));
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
    }

    #[test]
    fn omitted_submission_uses_configured_default() {
        let cli = Cli::try_parse_from(["shotbox"]).unwrap();
        let (config, submission) = prepare(cli).unwrap();
        assert_eq!(submission, config.default_submission);
        assert_eq!(submission, PathBuf::from("/tmp/code.py"));
    }

    #[test]
    fn unreadable_config_names_the_file() {
        let cli = Cli::try_parse_from(["shotbox", "--config", "/nonexistent/shotbox.json"]).unwrap();
        let err = prepare(cli).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/shotbox.json"));
    }
}
