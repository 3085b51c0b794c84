//! Result emitter
//! Writes the outcome of a run to the diagnostic channel: the stats line on
//! success, the failure message (and trace when there is one) otherwise.

use crate::config::types::{ExecutionResult, Result};
use crate::utils::json_schema::StatsRecordV1;
use std::io::Write;

/// Emits exactly one outcome per run
pub struct ResultEmitter<W: Write> {
    sink: W,
}

impl<W: Write> ResultEmitter<W> {
    pub fn new(sink: W) -> Self {
        ResultEmitter { sink }
    }

    /// Write `result` and return the process exit code for it.
    ///
    /// A write error is logged and does not change the exit code: the
    /// outcome is decided by the time it is reported.
    pub fn emit(&mut self, result: &ExecutionResult) -> u8 {
        if let Err(err) = self.write_result(result) {
            log::error!("failed to write result: {}", err);
        }
        result.exit_code()
    }

    fn write_result(&mut self, result: &ExecutionResult) -> Result<()> {
        match result {
            ExecutionResult::Success { .. } => {
                if let Some(record) = StatsRecordV1::from_result(result) {
                    // Leading newline: submission output may not end with one.
                    writeln!(self.sink)?;
                    writeln!(self.sink, "{}", record.to_line()?)?;
                }
            }
            ExecutionResult::Failure(failure) => {
                writeln!(self.sink, "Error: {}", failure.message)?;
                if let Some(trace) = &failure.trace {
                    self.sink.write_all(trace.as_bytes())?;
                    if !trace.ends_with('\n') {
                        writeln!(self.sink)?;
                    }
                }
            }
        }
        self.sink.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
