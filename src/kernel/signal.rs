//! Wall-clock deadline built on a one-shot SIGALRM.
//!
//! The alarm and its handler are process-wide, so the deadline is modelled as
//! an owned guard: [`Deadline::arm`] installs both, dropping the
//! [`DeadlineGuard`] cancels the alarm and restores the previous handler.
//! Only one guard can exist at a time.

use log::debug;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::alarm;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use crate::config::types::{Result, RunnerError};

/// Set while a guard exists
static ARMED: AtomicBool = AtomicBool::new(false);

/// Set by the handler when the alarm fires (async-safe atomic)
static EXPIRED: AtomicBool = AtomicBool::new(false);

/// Process group killed on expiry; 0 when nothing is watched
static WATCHED_GROUP: AtomicI32 = AtomicI32::new(0);

/// Serializes tests that touch the process-wide alarm.
#[cfg(test)]
pub(crate) static DEADLINE_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Async-safe alarm handler.
/// Only atomics and kill(2): no allocations, no locks, no I/O.
extern "C" fn on_alarm(_signal: libc::c_int) {
    EXPIRED.store(true, Ordering::SeqCst);

    let group = WATCHED_GROUP.load(Ordering::SeqCst);
    if group > 0 {
        // SAFETY: kill is async-signal-safe.
        unsafe {
            libc::kill(-group, libc::SIGKILL);
        }
    }
}

fn kill_group(group: i32) {
    // SAFETY: plain syscall on a process group we spawned.
    let rc = unsafe { libc::kill(-group, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            "kill(-{}) after expiry failed: {}",
            group,
            std::io::Error::last_os_error()
        );
    }
}

/// Whether a deadline is currently armed in this process
pub fn is_armed() -> bool {
    ARMED.load(Ordering::SeqCst)
}

/// A wall-clock budget in whole seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    seconds: u32,
}

impl Deadline {
    pub fn new(seconds: u32) -> Self {
        Self { seconds }
    }

    /// Install the handler and schedule the alarm.
    ///
    /// Fails if another guard is alive; deadlines do not nest.
    pub fn arm(&self) -> Result<DeadlineGuard> {
        if self.seconds == 0 {
            return Err(RunnerError::Deadline(
                "deadline must be at least one second".to_string(),
            ));
        }

        if ARMED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RunnerError::Deadline(
                "a deadline is already armed".to_string(),
            ));
        }

        EXPIRED.store(false, Ordering::SeqCst);
        WATCHED_GROUP.store(0, Ordering::SeqCst);

        let action = SigAction::new(
            SigHandler::Handler(on_alarm),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );

        // SAFETY: the handler only touches atomics and calls kill(2).
        let previous = match unsafe { signal::sigaction(Signal::SIGALRM, &action) } {
            Ok(previous) => previous,
            Err(e) => {
                ARMED.store(false, Ordering::SeqCst);
                return Err(RunnerError::Deadline(format!(
                    "Failed to install SIGALRM handler: {}",
                    e
                )));
            }
        };

        alarm::set(self.seconds);
        debug!("deadline armed for {}s", self.seconds);

        Ok(DeadlineGuard {
            previous,
            seconds: self.seconds,
        })
    }
}

/// Live deadline. Dropping it disarms.
pub struct DeadlineGuard {
    previous: SigAction,
    seconds: u32,
}

impl std::fmt::Debug for DeadlineGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineGuard")
            .field("seconds", &self.seconds)
            .field("expired", &self.expired())
            .finish()
    }
}

impl DeadlineGuard {
    /// Kill process group `group` when the deadline fires. If it already
    /// fired, the group is killed immediately.
    pub fn watch(&self, group: i32) {
        WATCHED_GROUP.store(group, Ordering::SeqCst);
        if EXPIRED.load(Ordering::SeqCst) {
            kill_group(group);
        }
    }

    /// Whether the alarm has fired
    pub fn expired(&self) -> bool {
        EXPIRED.load(Ordering::SeqCst)
    }

    /// Explicit spelling of drop
    pub fn disarm(self) {}
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        alarm::cancel();
        WATCHED_GROUP.store(0, Ordering::SeqCst);

        // SAFETY: restores the action that was in place before arm().
        if let Err(e) = unsafe { signal::sigaction(Signal::SIGALRM, &self.previous) } {
            debug!("Failed to restore SIGALRM disposition: {}", e);
        }

        ARMED.store(false, Ordering::SeqCst);
        debug!(
            "deadline disarmed (expired: {})",
            EXPIRED.load(Ordering::SeqCst)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::{CommandExt, ExitStatusExt};
    use std::process::Command;
    use std::time::{Duration, Instant};

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        DEADLINE_TEST_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn zero_deadline_is_rejected() {
        let _lock = lock();
        assert!(Deadline::new(0).arm().is_err());
        assert!(!is_armed());
    }

    #[test]
    fn deadlines_do_not_nest() {
        let _lock = lock();
        let guard = Deadline::new(30).arm().unwrap();
        assert!(is_armed());
        assert!(Deadline::new(30).arm().is_err());

        guard.disarm();
        assert!(!is_armed());

        let again = Deadline::new(30).arm().unwrap();
        drop(again);
    }

    #[test]
    fn expiry_is_observed() {
        let _lock = lock();
        let guard = Deadline::new(1).arm().unwrap();
        assert!(!guard.expired());

        std::thread::sleep(Duration::from_millis(1500));
        assert!(guard.expired());
    }

    #[test]
    fn disarm_cancels_pending_alarm() {
        let _lock = lock();
        let guard = Deadline::new(1).arm().unwrap();
        drop(guard);

        // A leaked alarm would hit the restored default disposition and
        // terminate the test process.
        std::thread::sleep(Duration::from_millis(1500));
        assert!(!is_armed());
    }

    #[test]
    fn expiry_kills_watched_group() {
        let _lock = lock();
        let guard = Deadline::new(1).arm().unwrap();
        let started = Instant::now();

        let mut child = Command::new("sleep")
            .arg("30")
            .process_group(0)
            .spawn()
            .unwrap();
        guard.watch(child.id() as i32);

        let status = child.wait().unwrap();
        assert!(guard.expired());
        assert_eq!(status.signal(), Some(libc::SIGKILL));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn watch_after_expiry_kills_immediately() {
        let _lock = lock();
        let guard = Deadline::new(1).arm().unwrap();
        std::thread::sleep(Duration::from_millis(1500));
        assert!(guard.expired());

        let mut child = Command::new("sleep")
            .arg("30")
            .process_group(0)
            .spawn()
            .unwrap();
        guard.watch(child.id() as i32);

        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(libc::SIGKILL));
    }
}
