//! File descriptor hygiene
//!
//! Descriptors the harness inherited from its own parent must not reach the
//! payload. They are marked close-on-exec in the harness before spawning:
//! - prefer close_range(CLOSE_RANGE_CLOEXEC) (Linux 5.11+)
//! - fall back to iterating /proc/self/fd
//!
//! Closing them inside the pre-exec hook instead would also close the pipe
//! the standard library uses to report exec failures.

use crate::config::types::{Result, RunnerError};
use std::fs;
use std::os::fd::RawFd;

const CLOSE_RANGE_CLOEXEC: libc::c_uint = 1 << 2;

/// Mark every descriptor from `first` upward close-on-exec.
pub fn mark_inherited_cloexec(first: RawFd) -> Result<()> {
    if try_close_range(first) {
        log::debug!("Marked FDs >= {} close-on-exec using close_range", first);
        return Ok(());
    }
    mark_via_proc(first)
}

fn try_close_range(first: RawFd) -> bool {
    let Ok(first) = libc::c_uint::try_from(first) else {
        return false;
    };
    // SAFETY: close_range only changes descriptor flags here.
    let result = unsafe {
        libc::syscall(
            libc::SYS_close_range,
            first,
            libc::c_uint::MAX,
            CLOSE_RANGE_CLOEXEC,
        )
    };
    result == 0
}

fn set_cloexec(fd: RawFd) -> std::io::Result<()> {
    // SAFETY: fcntl on a descriptor number; EBADF is reported, not UB.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: as above.
    if unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

fn mark_via_proc(first: RawFd) -> Result<()> {
    let mut marked = 0;
    let mut failed = Vec::new();

    for fd in get_open_fds()?.into_iter().filter(|fd| *fd >= first) {
        match set_cloexec(fd) {
            Ok(()) => marked += 1,
            // The directory handle used for the listing is gone by now.
            Err(e) if e.raw_os_error() == Some(libc::EBADF) => {}
            Err(e) => failed.push(format!("fd {}: {}", fd, e)),
        }
    }

    if !failed.is_empty() {
        return Err(RunnerError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to mark {} FD(s) close-on-exec: {}", failed.len(), failed.join(", ")),
        )));
    }

    log::debug!("Marked {} inherited FDs close-on-exec via /proc/self/fd", marked);
    Ok(())
}

/// Get list of open file descriptors
pub fn get_open_fds() -> Result<Vec<RawFd>> {
    let fd_dir = "/proc/self/fd";

    let entries = fs::read_dir(fd_dir).map_err(|e| {
        RunnerError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read {}: {}", fd_dir, e),
        ))
    })?;

    let mut fds: Vec<RawFd> = entries
        .flatten()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| name.parse().ok())
        .collect();

    fds.sort();
    Ok(fds)
}
