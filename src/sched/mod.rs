use std::ops::RangeInclusive;

use log::{debug, warn};

use crate::config::{Priority, PriorityLevel, WorkerConfig};
use crate::{PoolError, Result};

/// OS-level scheduling controls applied by a worker to its own thread.
///
/// Every method acts on the calling thread. Implementations are stateless;
/// one exists per supported OS family, plus [`NoopPolicy`] for the rest.
pub trait SchedulingPolicy: Send + Sync {
    /// Pins the calling thread to the logical CPU `core`.
    fn bind(&self, core: usize) -> Result<()>;

    /// Applies a symbolic priority level to the calling thread.
    ///
    /// `PriorityLevel::Normal` must leave the thread untouched.
    fn apply_level(&self, level: PriorityLevel) -> Result<()>;

    /// Applies a native priority value that has already been range checked.
    fn apply_raw(&self, value: i32) -> Result<()>;

    /// Valid native priority values, or `None` if any value is accepted.
    fn raw_range(&self) -> Option<RangeInclusive<i32>>;
}

mod noop;
pub use self::noop::NoopPolicy;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use self::linux::LinuxPolicy;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use self::windows::WindowsPolicy;

/// The scheduling policy for the build target.
#[cfg(target_os = "linux")]
pub type NativePolicy = LinuxPolicy;

/// The scheduling policy for the build target.
#[cfg(windows)]
pub type NativePolicy = WindowsPolicy;

/// The scheduling policy for the build target.
#[cfg(not(any(target_os = "linux", windows)))]
pub type NativePolicy = NoopPolicy;

/// Applies `priority` to the calling thread through `policy`.
///
/// Raw values outside [`SchedulingPolicy::raw_range`] are rejected with
/// [`PoolError::InvalidPriorityValue`] and nothing is applied.
pub fn apply_priority(policy: &dyn SchedulingPolicy, priority: Priority) -> Result<()> {
    match priority {
        Priority::Level(PriorityLevel::Normal) => Ok(()),
        Priority::Level(level) => policy.apply_level(level),
        Priority::Raw(value) => {
            if let Some(range) = policy.raw_range() {
                if !range.contains(&value) {
                    return Err(PoolError::InvalidPriorityValue {
                        value,
                        min: *range.start(),
                        max: *range.end(),
                    });
                }
            }
            policy.apply_raw(value)
        }
    }
}

/// Applies a worker's affinity and priority to the calling thread.
///
/// Failures are not fatal: each one is logged and returned, and the thread
/// keeps whatever scheduling it had. An empty result means full success.
pub fn configure_current_thread(
    policy: &dyn SchedulingPolicy,
    config: &WorkerConfig,
) -> Vec<PoolError> {
    let index = config.index;
    let mut diagnostics = Vec::new();

    if let Some(core) = config.core {
        match policy.bind(core) {
            Ok(()) => debug!("Worker {index} pinned to core {core}"),
            Err(e) => {
                warn!("Worker {index}: {e}");
                diagnostics.push(e);
            }
        }
    }

    match apply_priority(policy, config.priority) {
        Ok(()) => debug!("Worker {index} priority set to {}", config.priority),
        Err(e) => {
            warn!("Worker {index}: {e}, keeping default priority");
            diagnostics.push(e);
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn worker(core: Option<usize>, priority: impl Into<Priority>) -> WorkerConfig {
        WorkerConfig {
            index: 0,
            core,
            priority: priority.into(),
        }
    }

    #[test]
    fn normal_priority_without_pinning_is_clean() {
        let diagnostics = configure_current_thread(&NativePolicy::default(), &worker(None, PriorityLevel::Normal));
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn noop_policy_accepts_everything() {
        let policy = NoopPolicy;
        let diagnostics = configure_current_thread(&policy, &worker(Some(4096), i32::MAX));
        assert!(diagnostics.is_empty());
        let diagnostics = configure_current_thread(&policy, &worker(Some(0), PriorityLevel::Realtime));
        assert!(diagnostics.is_empty());
    }

    #[cfg(any(target_os = "linux", windows))]
    #[test]
    fn out_of_range_raw_priority_is_reported_not_applied() {
        let policy = NativePolicy::default();
        let range = policy.raw_range().unwrap();
        let value = range.end() + 1000;

        let diagnostics = thread::spawn(move || configure_current_thread(&policy, &worker(None, value)))
            .join()
            .unwrap();

        assert_eq!(diagnostics.len(), 1);
        match &diagnostics[0] {
            PoolError::InvalidPriorityValue { value: v, min, max } => {
                assert_eq!(*v, value);
                assert_eq!((*min, *max), (*range.start(), *range.end()));
            }
            other => panic!("unexpected diagnostic: {other:?}"),
        }
    }

    #[cfg(any(target_os = "linux", windows))]
    #[test]
    fn binding_to_nonexistent_core_is_reported() {
        let policy = NativePolicy::default();
        let diagnostics = thread::spawn(move || {
            configure_current_thread(&policy, &worker(Some(1 << 20), PriorityLevel::Normal))
        })
        .join()
        .unwrap();

        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0], PoolError::Scheduling { .. }));
    }

    #[test]
    fn privileged_levels_never_panic() {
        // Without privileges these fail; either outcome is acceptable.
        for level in [PriorityLevel::Low, PriorityLevel::High, PriorityLevel::Realtime] {
            let diagnostics = thread::spawn(move || {
                configure_current_thread(&NativePolicy::default(), &worker(None, level))
            })
            .join()
            .unwrap();
            assert!(diagnostics.iter().all(|d| matches!(d, PoolError::Scheduling { .. })));
        }
    }
}
