use std::ops::RangeInclusive;

use log::debug;

use super::SchedulingPolicy;
use crate::config::PriorityLevel;
use crate::Result;

/// Accepts every request and changes nothing.
///
/// Used on platforms without a native implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPolicy;

impl SchedulingPolicy for NoopPolicy {
    fn bind(&self, core: usize) -> Result<()> {
        debug!("Thread pinning unsupported on this platform, ignoring core {core}");
        Ok(())
    }

    fn apply_level(&self, level: PriorityLevel) -> Result<()> {
        debug!("Thread priority unsupported on this platform, ignoring {level}");
        Ok(())
    }

    fn apply_raw(&self, value: i32) -> Result<()> {
        debug!("Thread priority unsupported on this platform, ignoring {value}");
        Ok(())
    }

    fn raw_range(&self) -> Option<RangeInclusive<i32>> {
        None
    }
}
