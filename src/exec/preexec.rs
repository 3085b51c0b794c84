//! Pre-exec ordering enforcement
//!
//! The payload setup sequence between fork and exec is fixed:
//! 1. prctl(PR_SET_PDEATHSIG, SIGKILL) so the payload dies with the harness
//! 2. bind the source and report channels to their agreed descriptors
//! 3. install resource ceilings (always last: nothing may run after them
//!    except exec itself)
//! 4. exec payload
//!
//! The order is carried in the type: `PreExec<Fresh>` can only bind channels,
//! `PreExec<ChannelsBound>` can only install limits, and only
//! `PreExec<Limited>` can be attached to a `Command`. Each transition
//! consumes the previous state, so no step can be skipped or repeated.

use crate::config::types::LimitSet;
use crate::judge::{REPORT_FD, SOURCE_FD};
use crate::kernel::rlimit;
use nix::sys::prctl;
use nix::sys::signal::Signal;
use std::marker::PhantomData;
use std::os::fd::RawFd;
use std::os::unix::process::CommandExt;
use std::process::Command;

pub struct Fresh;
pub struct ChannelsBound;
pub struct Limited;

#[derive(Clone, Copy, Debug)]
struct Channels {
    source: RawFd,
    report: RawFd,
}

pub struct PreExec<State> {
    channels: Option<Channels>,
    limits: Option<LimitSet>,
    _state: PhantomData<State>,
}

impl PreExec<Fresh> {
    pub fn new() -> Self {
        Self {
            channels: None,
            limits: None,
            _state: PhantomData,
        }
    }

    /// Step 2: the payload sees `source` as [`SOURCE_FD`] and `report` as
    /// [`REPORT_FD`]. Both must be above those slots.
    pub fn bind_channels(self, source: RawFd, report: RawFd) -> PreExec<ChannelsBound> {
        PreExec {
            channels: Some(Channels { source, report }),
            limits: self.limits,
            _state: PhantomData,
        }
    }
}

impl Default for PreExec<Fresh> {
    fn default() -> Self {
        Self::new()
    }
}

impl PreExec<ChannelsBound> {
    /// Step 3
    pub fn install_limits(self, limits: LimitSet) -> PreExec<Limited> {
        PreExec {
            channels: self.channels,
            limits: Some(limits),
            _state: PhantomData,
        }
    }
}

/// dup2 that always leaves `target` open across exec.
fn bind_fd(fd: RawFd, target: RawFd) -> std::io::Result<()> {
    if fd == target {
        // dup2 onto itself keeps FD_CLOEXEC; clear it by hand.
        // SAFETY: fcntl on an inherited descriptor.
        if unsafe { libc::fcntl(fd, libc::F_SETFD, 0) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
        return Ok(());
    }
    // SAFETY: both descriptors are valid; dup2 is async-signal-safe.
    if unsafe { libc::dup2(fd, target) } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

impl PreExec<Limited> {
    /// Register the chain as the command's pre-exec hook.
    ///
    /// The hook runs in the forked child, so it only makes
    /// async-signal-safe calls and does not allocate.
    pub fn attach(self, command: &mut Command) {
        let (Some(channels), Some(limits)) = (self.channels, self.limits) else {
            unreachable!("typestate guarantees channels and limits are set");
        };

        // SAFETY: the closure is async-signal-safe (prctl, dup2, fcntl,
        // setrlimit) and touches no shared state.
        unsafe {
            command.pre_exec(move || {
                // Step 1
                prctl::set_pdeathsig(Signal::SIGKILL).map_err(std::io::Error::from)?;

                // Step 2
                bind_fd(channels.source, SOURCE_FD)?;
                bind_fd(channels.report, REPORT_FD)?;

                // Step 3
                rlimit::install(&limits)
            });
        }
    }
}
