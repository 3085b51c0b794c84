//! Single-shot payload execution
//! Drives one submission through precondition check, ceilings, deadline,
//! interpreter run, usage sampling, classification and emission.

use crate::config::types::{
    ExecutionResult, Failure, FailureKind, Result, RunnerConfig, RunnerError,
};
use crate::exec::preexec::PreExec;
use crate::judge::languages::python::PythonAdapter;
use crate::judge::InterpreterAdapter;
use crate::kernel::memfd::MemFile;
use crate::kernel::rlimit;
use crate::kernel::signal::{Deadline, DeadlineGuard};
use crate::observability::usage::UsageSampler;
use crate::utils::env_hygiene::payload_environment;
use crate::utils::fd_closure::mark_inherited_cloexec;
use crate::utils::output::ResultEmitter;
use crate::verdict::{Evidence, VerdictClassifier};
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Submission text, read exactly once
#[derive(Clone, Debug)]
pub struct Submission {
    path: PathBuf,
    source: Vec<u8>,
}

impl Submission {
    /// Load the submission. A missing file is a precondition failure that
    /// names the path.
    pub fn load(path: &Path) -> std::result::Result<Self, Failure> {
        if !path.exists() {
            return Err(Failure::missing_submission(path));
        }
        match std::fs::read(path) {
            Ok(source) => Ok(Self {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Failure::missing_submission(path))
            }
            Err(e) => Err(Failure::new(
                FailureKind::Precondition,
                format!("Cannot read code file at {}: {}", path.display(), e),
            )),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }
}

/// Process executor for one submission per run
pub struct ProcessExecutor {
    config: RunnerConfig,
    adapter: Box<dyn InterpreterAdapter>,
    run_id: String,
}

impl ProcessExecutor {
    /// Create an executor running submissions under the Python adapter
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_adapter(config, Box::new(PythonAdapter))
    }

    pub fn with_adapter(config: RunnerConfig, adapter: Box<dyn InterpreterAdapter>) -> Self {
        Self {
            config,
            adapter,
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run the submission at `path` and emit its outcome.
    ///
    /// Returns the process exit code. The deadline is disarmed on every path
    /// after the outcome has been emitted.
    pub fn run<W: Write>(&self, path: &Path, emitter: &mut ResultEmitter<W>) -> u8 {
        log::info!(
            "[{}] running {} with {} (deadline {}s)",
            self.run_id,
            path.display(),
            self.adapter.language(),
            self.config.deadline_secs
        );

        let submission = match Submission::load(path) {
            Ok(submission) => submission,
            Err(failure) => {
                log::info!("[{}] precondition failed: {}", self.run_id, failure.message);
                return emitter.emit(&failure.into());
            }
        };

        if let Err(err) = rlimit::check_installable(&self.config.limits) {
            log::error!("[{}] {}", self.run_id, err);
            return emitter.emit(&Failure::from(err).into());
        }

        let guard = match Deadline::new(self.config.deadline_secs).arm() {
            Ok(guard) => guard,
            Err(err) => {
                log::error!("[{}] {}", self.run_id, err);
                return emitter.emit(&Failure::from(err).into());
            }
        };

        let result = match self.execute(&submission, &guard) {
            Ok(result) => result,
            Err(err) => {
                log::error!("[{}] execution failed: {}", self.run_id, err);
                Failure::from(err).into()
            }
        };
        log::debug!("[{}] result: {:?}", self.run_id, result);

        let code = emitter.emit(&result);
        guard.disarm();
        code
    }

    /// Spawn, wait, sample and classify. Runs while `guard` is armed.
    fn execute(&self, submission: &Submission, guard: &DeadlineGuard) -> Result<ExecutionResult> {
        mark_inherited_cloexec(3)?;

        let source = MemFile::sealed(
            &format!("shotbox-source-{}", self.run_id),
            submission.source(),
        )?;
        let mut report = MemFile::create(&format!("shotbox-report-{}", self.run_id))?;
        let mut command = self.build_command(submission, &source, &report)?;

        let sampler = UsageSampler::start()?;
        let mut child = command.spawn().map_err(|e| {
            RunnerError::Spawn(format!(
                "failed to start interpreter {}: {}",
                self.config.interpreter.program, e
            ))
        })?;
        let pid = i32::try_from(child.id())
            .map_err(|_| RunnerError::Spawn(format!("pid {} out of range", child.id())))?;
        guard.watch(pid);
        log::debug!("[{}] payload started as pid {}", self.run_id, pid);

        let status = child
            .wait()
            .map_err(|e| RunnerError::Process(format!("failed to wait for payload: {}", e)))?;
        let usage = sampler.finish()?;
        log::debug!("[{}] payload exited: {}", self.run_id, status);

        let evidence = Evidence {
            wait_outcome: status.into(),
            deadline_expired: guard.expired(),
            report: report.read_all()?,
            usage,
            limits: self.config.limits,
        };
        Ok(VerdictClassifier::classify(&evidence))
    }

    fn build_command(
        &self,
        submission: &Submission,
        source: &MemFile,
        report: &MemFile,
    ) -> Result<Command> {
        let argv = self
            .adapter
            .run_command(&self.config.interpreter, submission.path());
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| RunnerError::Config("interpreter command is empty".to_string()))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .env_clear()
            .envs(payload_environment(&self.config.environment))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .process_group(0);

        PreExec::new()
            .bind_channels(source.raw_fd(), report.raw_fd())
            .install_limits(self.config.limits)
            .attach(&mut command);

        Ok(command)
    }
}
