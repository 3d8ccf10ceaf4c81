use std::ops::RangeInclusive;
use std::{io, mem};

use libc::{c_int, cpu_set_t};

use super::SchedulingPolicy;
use crate::config::PriorityLevel;
use crate::{PoolError, Result};

/// Native priorities accepted under `SCHED_RR`.
const RAW_RANGE: RangeInclusive<i32> = 1..=99;

/// Nice value used for `PriorityLevel::Low`.
const LOW_NICE: c_int = 10;

/// Scheduling through `sched_setaffinity`, `setpriority` and `pthread_setschedparam`.
///
/// `Low` lowers the thread's nice value, `High` moves it to `SCHED_RR` at
/// the middle of the real-time range and `Realtime` to `SCHED_FIFO` at its
/// top. The real-time classes need `CAP_SYS_NICE`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxPolicy;

impl SchedulingPolicy for LinuxPolicy {
    fn bind(&self, core: usize) -> Result<()> {
        let action = format!("pin thread to core {core}");
        if core >= libc::CPU_SETSIZE as usize {
            return Err(PoolError::Scheduling {
                action,
                source: io::Error::new(io::ErrorKind::InvalidInput, "core id exceeds CPU_SETSIZE"),
            });
        }

        // SAFETY: All zeroes is a valid cpu_set_t.
        let mut cpuset: cpu_set_t = unsafe { mem::zeroed() };
        // SAFETY: core is below CPU_SETSIZE, so it fits in the set. 0 means current thread.
        let result = unsafe {
            libc::CPU_SET(core, &mut cpuset);
            libc::sched_setaffinity(0, mem::size_of::<cpu_set_t>(), &cpuset)
        };

        if result == 0 {
            Ok(())
        } else {
            Err(PoolError::Scheduling {
                action,
                source: io::Error::last_os_error(),
            })
        }
    }

    fn apply_level(&self, level: PriorityLevel) -> Result<()> {
        match level {
            PriorityLevel::Low => set_nice(LOW_NICE),
            PriorityLevel::Normal => Ok(()),
            PriorityLevel::High => {
                let (min, max) = priority_bounds(libc::SCHED_RR)?;
                set_scheduler(libc::SCHED_RR, (min + max) / 2)
            }
            PriorityLevel::Realtime => {
                let (_, max) = priority_bounds(libc::SCHED_FIFO)?;
                set_scheduler(libc::SCHED_FIFO, max)
            }
        }
    }

    fn apply_raw(&self, value: i32) -> Result<()> {
        set_scheduler(libc::SCHED_RR, value)
    }

    fn raw_range(&self) -> Option<RangeInclusive<i32>> {
        Some(RAW_RANGE)
    }
}

fn priority_bounds(policy: c_int) -> Result<(c_int, c_int)> {
    // SAFETY: No safety requirements.
    let (min, max) = unsafe {
        (
            libc::sched_get_priority_min(policy),
            libc::sched_get_priority_max(policy),
        )
    };
    if min == -1 || max == -1 {
        return Err(PoolError::Scheduling {
            action: format!("query priority range of policy {policy}"),
            source: io::Error::last_os_error(),
        });
    }
    Ok((min, max))
}

fn set_scheduler(policy: c_int, priority: c_int) -> Result<()> {
    // SAFETY: All zeroes is a valid sched_param.
    let mut param: libc::sched_param = unsafe { mem::zeroed() };
    param.sched_priority = priority;

    // SAFETY: pthread_self() is always a valid handle for the calling thread.
    let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), policy, &param) };

    // pthread functions return the error code instead of setting errno.
    if rc == 0 {
        Ok(())
    } else {
        Err(PoolError::Scheduling {
            action: format!("set scheduling policy {policy} with priority {priority}"),
            source: io::Error::from_raw_os_error(rc),
        })
    }
}

fn set_nice(nice: c_int) -> Result<()> {
    // On Linux PRIO_PROCESS with a thread id targets that single thread.
    // SAFETY: No safety requirements.
    let rc = unsafe {
        let tid = libc::syscall(libc::SYS_gettid) as libc::id_t;
        libc::setpriority(libc::PRIO_PROCESS, tid, nice)
    };

    if rc == 0 {
        Ok(())
    } else {
        Err(PoolError::Scheduling {
            action: format!("set nice value {nice}"),
            source: io::Error::last_os_error(),
        })
    }
}
