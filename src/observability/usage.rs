//! Usage sampler.
//!
//! Readings come from `getrusage(RUSAGE_CHILDREN)`. Its `ru_maxrss` is the
//! peak resident size of the largest reaped child, a running maximum that
//! never decreases, so the reported memory figure is the delta of two peak
//! readings. That is an approximation: it can read zero, and any other child
//! reaped by the harness would skew it.

use crate::config::types::Result;
use nix::sys::resource::{getrusage, UsageWho};
use nix::sys::time::TimeVal;
use std::time::{Duration, Instant};

/// One reading of the child accounting counters.
#[derive(Clone, Copy, Debug)]
pub struct UsageReading {
    pub taken_at: Instant,
    /// Peak RSS high-water mark in bytes
    pub max_rss_bytes: i64,
    /// Accumulated user + system CPU time of reaped children
    pub cpu_time: Duration,
}

fn timeval_to_duration(tv: TimeVal) -> Duration {
    let secs = u64::try_from(tv.tv_sec()).unwrap_or(0);
    let micros = u64::try_from(tv.tv_usec()).unwrap_or(0);
    Duration::from_secs(secs) + Duration::from_micros(micros)
}

impl UsageReading {
    pub fn take() -> Result<Self> {
        let usage = getrusage(UsageWho::RUSAGE_CHILDREN)?;
        Ok(Self {
            taken_at: Instant::now(),
            // Linux reports ru_maxrss in KiB.
            max_rss_bytes: (usage.max_rss() as i64).saturating_mul(1024),
            cpu_time: timeval_to_duration(usage.user_time())
                + timeval_to_duration(usage.system_time()),
        })
    }
}

/// Usage attributed to one execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UsageReport {
    /// Elapsed wall-clock time, truncated to whole milliseconds
    pub runtime_ms: u64,
    /// Peak-reading delta in bytes; sign not guaranteed
    pub memory_bytes: i64,
    /// CPU time delta
    pub cpu_time: Duration,
}

impl UsageReport {
    pub fn between(before: &UsageReading, after: &UsageReading) -> Self {
        let elapsed = after.taken_at.saturating_duration_since(before.taken_at);
        Self {
            runtime_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            memory_bytes: after.max_rss_bytes - before.max_rss_bytes,
            cpu_time: after.cpu_time.saturating_sub(before.cpu_time),
        }
    }
}

/// Brackets one execution: [`UsageSampler::start`] immediately before,
/// [`UsageSampler::finish`] immediately after.
#[derive(Debug)]
pub struct UsageSampler {
    before: UsageReading,
}

impl UsageSampler {
    pub fn start() -> Result<Self> {
        Ok(Self {
            before: UsageReading::take()?,
        })
    }

    pub fn finish(self) -> Result<UsageReport> {
        let after = UsageReading::take()?;
        let report = UsageReport::between(&self.before, &after);
        log::debug!(
            "usage: runtime_ms={} memory_bytes={} cpu={:?}",
            report.runtime_ms,
            report.memory_bytes,
            report.cpu_time
        );
        Ok(report)
    }
}
