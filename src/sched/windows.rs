use std::io;
use std::ops::RangeInclusive;

use windows::Win32::System::Threading::{
    GetCurrentThread, SetThreadAffinityMask, SetThreadPriority, THREAD_PRIORITY,
    THREAD_PRIORITY_ABOVE_NORMAL, THREAD_PRIORITY_BELOW_NORMAL, THREAD_PRIORITY_TIME_CRITICAL,
};

use super::SchedulingPolicy;
use crate::config::PriorityLevel;
use crate::{PoolError, Result};

/// `THREAD_PRIORITY_LOWEST` through `THREAD_PRIORITY_TIME_CRITICAL`.
const RAW_RANGE: RangeInclusive<i32> = -2..=15;

/// Scheduling through `SetThreadAffinityMask` and `SetThreadPriority`.
///
/// Only affinity within the calling thread's processor group is supported.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsPolicy;

impl SchedulingPolicy for WindowsPolicy {
    fn bind(&self, core: usize) -> Result<()> {
        let action = format!("pin thread to core {core}");
        if core >= usize::BITS as usize {
            return Err(PoolError::Scheduling {
                action,
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "core id exceeds the affinity mask width",
                ),
            });
        }

        // SAFETY: The pseudo-handle from GetCurrentThread is always valid.
        let previous = unsafe { SetThreadAffinityMask(GetCurrentThread(), 1usize << core) };

        if previous != 0 {
            Ok(())
        } else {
            Err(PoolError::Scheduling {
                action,
                source: io::Error::last_os_error(),
            })
        }
    }

    fn apply_level(&self, level: PriorityLevel) -> Result<()> {
        let native = match level {
            PriorityLevel::Low => THREAD_PRIORITY_BELOW_NORMAL,
            PriorityLevel::Normal => return Ok(()),
            PriorityLevel::High => THREAD_PRIORITY_ABOVE_NORMAL,
            PriorityLevel::Realtime => THREAD_PRIORITY_TIME_CRITICAL,
        };
        set_priority(native)
    }

    fn apply_raw(&self, value: i32) -> Result<()> {
        set_priority(THREAD_PRIORITY(value))
    }

    fn raw_range(&self) -> Option<RangeInclusive<i32>> {
        Some(RAW_RANGE)
    }
}

fn set_priority(priority: THREAD_PRIORITY) -> Result<()> {
    // SAFETY: The pseudo-handle from GetCurrentThread is always valid.
    unsafe { SetThreadPriority(GetCurrentThread(), priority) }.map_err(|e| PoolError::Scheduling {
        action: format!("set thread priority {}", priority.0),
        source: io::Error::other(e.message()),
    })
}
