//! Limit installer.
//!
//! Ceilings are applied with soft = hard, so the payload can never raise them
//! again. Installation happens in the payload between fork and exec; see
//! [`crate::exec::preexec`].

use crate::config::types::{LimitSet, Result, RunnerError};

/// One kernel resource ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ceiling {
    pub name: &'static str,
    pub resource: libc::__rlimit_resource_t,
    pub value: u64,
}

impl LimitSet {
    /// Full ceiling set in installation order. Core dumps are always disabled
    /// so a CPU-ceiling kill does not write a core file.
    pub fn ceilings(&self) -> [Ceiling; 4] {
        [
            Ceiling {
                name: "RLIMIT_CORE",
                resource: libc::RLIMIT_CORE,
                value: 0,
            },
            Ceiling {
                name: "RLIMIT_FSIZE",
                resource: libc::RLIMIT_FSIZE,
                value: self.file_size_bytes,
            },
            Ceiling {
                name: "RLIMIT_CPU",
                resource: libc::RLIMIT_CPU,
                value: self.cpu_time_secs,
            },
            Ceiling {
                name: "RLIMIT_AS",
                resource: libc::RLIMIT_AS,
                value: self.address_space_bytes,
            },
        ]
    }
}

fn current_limit(ceiling: &Ceiling) -> Result<libc::rlimit> {
    let mut current = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `current` is a valid, writable rlimit.
    let rc = unsafe { libc::getrlimit(ceiling.resource, &mut current) };
    if rc != 0 {
        return Err(RunnerError::ResourceLimit(format!(
            "getrlimit({}) failed: {}",
            ceiling.name,
            std::io::Error::last_os_error()
        )));
    }
    Ok(current)
}

/// Verify from the harness that every ceiling can be installed.
///
/// An unprivileged process may lower its hard limits but never raise them,
/// so a ceiling above the inherited hard limit would be refused in the
/// payload. Reporting it here names the offending limit.
pub fn check_installable(limits: &LimitSet) -> Result<()> {
    // SAFETY: geteuid has no preconditions.
    let privileged = unsafe { libc::geteuid() } == 0;

    for ceiling in limits.ceilings() {
        let current = current_limit(&ceiling)?;
        if privileged || current.rlim_max == libc::RLIM_INFINITY {
            continue;
        }
        if ceiling.value as libc::rlim_t > current.rlim_max {
            return Err(RunnerError::ResourceLimit(format!(
                "cannot install {}={}: exceeds inherited hard limit {}",
                ceiling.name, ceiling.value, current.rlim_max
            )));
        }
    }

    log::debug!("all resource ceilings are installable: {:?}", limits);
    Ok(())
}

/// Install every ceiling on the calling process.
///
/// Runs in the forked payload before exec, so it only uses
/// async-signal-safe calls and does not allocate.
pub fn install(limits: &LimitSet) -> std::io::Result<()> {
    for ceiling in limits.ceilings() {
        let limit = libc::rlimit {
            rlim_cur: ceiling.value as libc::rlim_t,
            rlim_max: ceiling.value as libc::rlim_t,
        };
        // SAFETY: `limit` is a valid rlimit and the resource a libc constant.
        if unsafe { libc::setrlimit(ceiling.resource, &limit) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceilings_follow_limit_set() {
        let limits = LimitSet {
            address_space_bytes: 1 << 27,
            cpu_time_secs: 7,
            file_size_bytes: 1 << 20,
        };
        let ceilings = limits.ceilings();

        assert_eq!(ceilings[0].name, "RLIMIT_CORE");
        assert_eq!(ceilings[0].value, 0);
        assert_eq!(ceilings[1].value, 1 << 20);
        assert_eq!(ceilings[2].value, 7);
        assert_eq!(ceilings[3].name, "RLIMIT_AS");
        assert_eq!(ceilings[3].value, 1 << 27);
    }

    #[test]
    fn current_values_are_always_installable() {
        let ceilings = LimitSet::default().ceilings();
        let fsize = current_limit(&ceilings[1]).unwrap();
        let cpu = current_limit(&ceilings[2]).unwrap();
        let as_limit = current_limit(&ceilings[3]).unwrap();

        let limits = LimitSet {
            address_space_bytes: as_limit.rlim_max.min(1 << 30) as u64,
            cpu_time_secs: cpu.rlim_max.min(60) as u64,
            file_size_bytes: fsize.rlim_max.min(1 << 20) as u64,
        };
        check_installable(&limits).unwrap();
    }

    #[test]
    fn ceiling_above_finite_hard_limit_is_refused() {
        if unsafe { libc::geteuid() } == 0 {
            return;
        }
        let cpu = current_limit(&LimitSet::default().ceilings()[2]).unwrap();
        if cpu.rlim_max == libc::RLIM_INFINITY {
            return;
        }

        let limits = LimitSet {
            cpu_time_secs: cpu.rlim_max as u64 + 1,
            ..LimitSet::default()
        };
        let err = check_installable(&limits).unwrap_err();
        assert!(err.to_string().contains("RLIMIT_CPU"));
    }
}
