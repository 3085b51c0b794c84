//! Verdict classification
//! Derives the final result as a pure function over what the harness observed
//! after the payload was reaped.

use crate::config::types::*;
use crate::judge::report::{PayloadReport, ReportKind};
use crate::observability::usage::UsageReport;
use nix::sys::signal::Signal;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::time::Duration;

/// How the payload process ended, as reported by wait(2)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitOutcome {
    pub exit_code: Option<i32>,
    pub terminating_signal: Option<i32>,
}

impl From<ExitStatus> for WaitOutcome {
    fn from(status: ExitStatus) -> Self {
        Self {
            exit_code: status.code(),
            terminating_signal: status.signal(),
        }
    }
}

/// Everything the classifier looks at
#[derive(Clone, Debug)]
pub struct Evidence {
    pub wait_outcome: WaitOutcome,
    /// The wall-clock deadline fired before the payload was reaped
    pub deadline_expired: bool,
    /// Raw contents of the report channel
    pub report: String,
    pub usage: UsageReport,
    pub limits: LimitSet,
}

/// Slack for CPU accounting granularity when attributing a SIGKILL to the
/// CPU ceiling.
const CPU_ACCOUNTING_SLACK: Duration = Duration::from_millis(50);

/// Verdict classifier - pure function over evidence
pub struct VerdictClassifier;

impl VerdictClassifier {
    /// Precedence:
    /// 1. deadline expiry
    /// 2. the payload's own report
    /// 3. kernel CPU ceiling (SIGXCPU, or SIGKILL at the hard limit)
    /// 4. any other signal
    /// 5. clean exit
    /// 6. unexplained non-zero exit
    pub fn classify(evidence: &Evidence) -> ExecutionResult {
        if evidence.deadline_expired {
            return Failure::new(FailureKind::DeadlineExceeded, "Code execution timed out").into();
        }

        match PayloadReport::parse(&evidence.report) {
            Ok(Some(report)) => return Self::classify_report(report),
            Ok(None) => {}
            Err(err) => {
                log::warn!("payload report unreadable: {}", err);
                return Failure::new(FailureKind::Unclassified, err.to_string())
                    .with_trace(evidence.report.clone())
                    .into();
            }
        }

        if let Some(signal) = evidence.wait_outcome.terminating_signal {
            return Self::classify_signal(evidence, signal);
        }

        match evidence.wait_outcome.exit_code {
            Some(0) => ExecutionResult::Success {
                runtime_ms: evidence.usage.runtime_ms,
                memory_bytes: evidence.usage.memory_bytes,
            },
            Some(code) => Failure::new(
                FailureKind::Unclassified,
                format!("Interpreter exited with status {}", code),
            )
            .into(),
            None => {
                Failure::new(FailureKind::Unclassified, "Unexpected termination state").into()
            }
        }
    }

    fn classify_report(report: PayloadReport) -> ExecutionResult {
        let failure = match report.kind {
            ReportKind::Memory => Failure::new(FailureKind::MemoryExceeded, "Memory limit exceeded"),
            ReportKind::EntryPoint => Failure::new(FailureKind::EntryPoint, report.message),
            ReportKind::Runtime => {
                let failure = Failure::new(FailureKind::Unclassified, report.message);
                match report.trace {
                    Some(trace) => failure.with_trace(trace),
                    None => failure,
                }
            }
            ReportKind::Exit => Failure::new(FailureKind::Unclassified, report.message),
        };
        failure.into()
    }

    fn classify_signal(evidence: &Evidence, signal: i32) -> ExecutionResult {
        let cpu_limit = Duration::from_secs(evidence.limits.cpu_time_secs);
        let at_cpu_ceiling = evidence.usage.cpu_time + CPU_ACCOUNTING_SLACK >= cpu_limit;

        let signal = Signal::try_from(signal).ok();
        match signal {
            Some(Signal::SIGXCPU) => {
                Failure::new(FailureKind::CpuTimeExceeded, "CPU time limit exceeded").into()
            }
            Some(Signal::SIGKILL) if at_cpu_ceiling => {
                Failure::new(FailureKind::CpuTimeExceeded, "CPU time limit exceeded").into()
            }
            Some(signal) => Failure::new(
                FailureKind::Unclassified,
                format!("Process terminated by signal {}", signal.as_str()),
            )
            .into(),
            None => Failure::new(
                FailureKind::Unclassified,
                format!(
                    "Process terminated by signal {}",
                    evidence.wait_outcome.terminating_signal.unwrap_or_default()
                ),
            )
            .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(exit_code: Option<i32>, signal: Option<i32>) -> Evidence {
        Evidence {
            wait_outcome: WaitOutcome {
                exit_code,
                terminating_signal: signal,
            },
            deadline_expired: false,
            report: String::new(),
            usage: UsageReport {
                runtime_ms: 42,
                memory_bytes: 8192,
                cpu_time: Duration::from_millis(30),
            },
            limits: LimitSet::default(),
        }
    }

    fn failure(result: ExecutionResult) -> Failure {
        match result {
            ExecutionResult::Failure(failure) => failure,
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn clean_exit_carries_usage() {
        let result = VerdictClassifier::classify(&evidence(Some(0), None));
        assert_eq!(
            result,
            ExecutionResult::Success {
                runtime_ms: 42,
                memory_bytes: 8192
            }
        );
    }

    #[test]
    fn deadline_outranks_everything() {
        let mut ev = evidence(None, Some(libc::SIGKILL));
        ev.deadline_expired = true;
        ev.report = r#"{"kind":"memory","message":"MemoryError"}"#.to_string();
        ev.usage.cpu_time = Duration::from_secs(10);

        let failure = failure(VerdictClassifier::classify(&ev));
        assert_eq!(failure.kind, FailureKind::DeadlineExceeded);
        assert_eq!(failure.message, "Code execution timed out");
    }

    #[test]
    fn memory_report_is_memory_exceeded() {
        let mut ev = evidence(Some(1), None);
        ev.report = r#"{"kind":"memory","message":"MemoryError"}"#.to_string();

        let failure = failure(VerdictClassifier::classify(&ev));
        assert_eq!(failure.kind, FailureKind::MemoryExceeded);
        assert_eq!(failure.message, "Memory limit exceeded");
        assert_eq!(failure.trace, None);
    }

    #[test]
    fn runtime_report_keeps_trace() {
        let mut ev = evidence(Some(1), None);
        ev.report = r#"{"kind":"runtime","message":"boom","trace":"Traceback...\nValueError: boom\n"}"#
            .to_string();

        let failure = failure(VerdictClassifier::classify(&ev));
        assert_eq!(failure.kind, FailureKind::Unclassified);
        assert_eq!(failure.message, "boom");
        assert!(failure.trace.unwrap().contains("ValueError"));
    }

    #[test]
    fn entry_point_report_has_no_trace() {
        let mut ev = evidence(Some(1), None);
        ev.report = r#"{"kind":"entry_point","message":"Solution.main is not callable"}"#
            .to_string();

        let failure = failure(VerdictClassifier::classify(&ev));
        assert_eq!(failure.kind, FailureKind::EntryPoint);
        assert_eq!(failure.trace, None);
    }

    #[test]
    fn malformed_report_is_unclassified_with_raw_text() {
        let mut ev = evidence(Some(0), None);
        ev.report = "{not json".to_string();

        let failure = failure(VerdictClassifier::classify(&ev));
        assert_eq!(failure.kind, FailureKind::Unclassified);
        assert_eq!(failure.trace.as_deref(), Some("{not json"));
    }

    #[test]
    fn sigxcpu_is_cpu_exceeded() {
        let failure = failure(VerdictClassifier::classify(&evidence(None, Some(libc::SIGXCPU))));
        assert_eq!(failure.kind, FailureKind::CpuTimeExceeded);
        assert_eq!(failure.message, "CPU time limit exceeded");
    }

    #[test]
    fn sigkill_is_attributed_by_cpu_usage() {
        let mut at_ceiling = evidence(None, Some(libc::SIGKILL));
        at_ceiling.usage.cpu_time = Duration::from_secs(DEFAULT_CPU_TIME_SECS);
        assert_eq!(
            failure(VerdictClassifier::classify(&at_ceiling)).kind,
            FailureKind::CpuTimeExceeded
        );

        let below = evidence(None, Some(libc::SIGKILL));
        let failure = failure(VerdictClassifier::classify(&below));
        assert_eq!(failure.kind, FailureKind::Unclassified);
        assert_eq!(failure.message, "Process terminated by signal SIGKILL");
    }

    #[test]
    fn other_signals_are_named() {
        let failure = failure(VerdictClassifier::classify(&evidence(None, Some(libc::SIGSEGV))));
        assert_eq!(failure.kind, FailureKind::Unclassified);
        assert_eq!(failure.message, "Process terminated by signal SIGSEGV");
    }

    #[test]
    fn unexplained_exit_status_is_reported() {
        let failure = failure(VerdictClassifier::classify(&evidence(Some(2), None)));
        assert_eq!(failure.kind, FailureKind::Unclassified);
        assert_eq!(failure.message, "Interpreter exited with status 2");
    }
}
