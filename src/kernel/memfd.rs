//! Anonymous in-memory files used to hand data across exec.
//!
//! The submission text travels to the payload through one of these, and the
//! payload reports failures back through another. Neither touches the
//! filesystem, and a report can be written in full without the harness having
//! to drain a pipe while it waits.

use crate::config::types::{Result, RunnerError};
use nix::fcntl::{fcntl, FcntlArg, SealFlag};
use nix::sys::memfd::{memfd_create, MemFdCreateFlag};
use std::ffi::CString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::fd::{AsRawFd, FromRawFd, RawFd};

/// Lowest descriptor a memfd is moved to, keeping the payload's target slots
/// (3 and 4) free for dup2.
const MIN_FD: RawFd = 10;

fn io_error(errno: nix::errno::Errno) -> RunnerError {
    RunnerError::Io(errno.into())
}

#[derive(Debug)]
pub struct MemFile {
    file: File,
}

impl MemFile {
    /// Create an empty, sealable, close-on-exec memfd.
    pub fn create(name: &str) -> Result<Self> {
        let c_name = CString::new(name)
            .map_err(|_| RunnerError::Config(format!("memfd name contains NUL: {}", name)))?;

        let fd = memfd_create(
            c_name.as_c_str(),
            MemFdCreateFlag::MFD_CLOEXEC | MemFdCreateFlag::MFD_ALLOW_SEALING,
        )
        .map_err(io_error)?;

        // The original descriptor is closed when `fd` drops.
        let relocated =
            fcntl(fd.as_raw_fd(), FcntlArg::F_DUPFD_CLOEXEC(MIN_FD)).map_err(io_error)?;

        // SAFETY: relocated is a fresh descriptor owned by nobody else.
        let file = unsafe { File::from_raw_fd(relocated) };
        Ok(Self { file })
    }

    /// Create a memfd holding `contents`, rewound and sealed against any
    /// further modification.
    pub fn sealed(name: &str, contents: &[u8]) -> Result<Self> {
        let mut memfile = Self::create(name)?;
        memfile.file.write_all(contents)?;
        memfile.file.seek(SeekFrom::Start(0))?;

        let seals = SealFlag::F_SEAL_SEAL
            | SealFlag::F_SEAL_SHRINK
            | SealFlag::F_SEAL_GROW
            | SealFlag::F_SEAL_WRITE;
        fcntl(memfile.raw_fd(), FcntlArg::F_ADD_SEALS(seals)).map_err(io_error)?;

        Ok(memfile)
    }

    pub fn raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Read the whole file from the start, replacing invalid UTF-8.
    pub fn read_all(&mut self) -> Result<String> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        self.file.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
