//! Cross-core coordination state.
//!
//! One [`Coordinator`] is created at driver initialization and owns
//! everything the cores share: the per-core slots, the lock-protected
//! deadline/flag set and the two lock-free counters. The counters are only
//! reachable through the named operations below so call sites cannot bypass
//! the entry/exit protocol.

use core::sync::atomic::{fence, AtomicBool, AtomicUsize, Ordering};

use spin::Mutex;
use static_assertions::const_assert;

/// Upper bound on coordinating cores. The reference platform has two.
pub const MAX_CPUS: usize = 4;

/// Far-future sentinel for a core with no scheduled wake deadline.
pub const NO_WAKEUP_US: u64 = u64::MAX;

/// Sentinel returned when no core has a wake deadline scheduled.
pub const NO_SLEEP: u32 = u32::MAX;

const_assert!(MAX_CPUS >= 2);

/// Minimum remaining sleep budget across all cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepBudget {
    /// Remaining microseconds until the earliest deadline, `0` if it has
    /// already passed, or [`NO_SLEEP`] if nothing is scheduled.
    pub remaining_us: u32,
    /// Core owning the earliest deadline.
    pub wake_core: usize,
    /// Absolute deadline timestamp, [`NO_WAKEUP_US`] if nothing scheduled.
    pub wake_at_us: u64,
}

pub(crate) struct Shared {
    pub sched_wake_up_us: [u64; MAX_CPUS],
    pub gov_cstate: [usize; MAX_CPUS],
    /// Next expected wake, recorded when the shared domain powers down.
    pub time_next_us: u64,
}

pub(crate) struct CoreSlot {
    /// Per-core register context must be replayed on wake.
    pub restore_arm_core: AtomicBool,
    /// Snapshotted peripheral interrupts must be re-enabled on wake.
    pub restore_arm_ret: AtomicBool,
}

impl CoreSlot {
    fn new() -> Self {
        Self {
            restore_arm_core: AtomicBool::new(false),
            restore_arm_ret: AtomicBool::new(false),
        }
    }
}

/// Shared coordination state for all idle episodes.
pub struct Coordinator {
    active_cores: usize,
    idle_cpus: AtomicUsize,
    master: AtomicUsize,
    pub(crate) shared: Mutex<Shared>,
    /// Shared-domain register context must be replayed on wake.
    pub(crate) restore_ape: AtomicBool,
    /// Cluster-common context must be replayed on wake.
    pub(crate) restore_arm: AtomicBool,
    pub(crate) cores: [CoreSlot; MAX_CPUS],
}

impl Coordinator {
    pub fn new(active_cores: usize) -> Self {
        Self {
            active_cores,
            idle_cpus: AtomicUsize::new(0),
            master: AtomicUsize::new(0),
            shared: Mutex::new(Shared {
                sched_wake_up_us: [NO_WAKEUP_US; MAX_CPUS],
                gov_cstate: [0; MAX_CPUS],
                time_next_us: NO_WAKEUP_US,
            }),
            restore_ape: AtomicBool::new(false),
            restore_arm: AtomicBool::new(false),
            cores: core::array::from_fn(|_| CoreSlot::new()),
        }
    }

    pub fn active_cores(&self) -> usize {
        self.active_cores
    }

    /// Counts the calling core as idle, returning the new idle-core count.
    pub fn mark_idle(&self) -> usize {
        self.idle_cpus.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Counts the calling core as running again. Every [`Coordinator::mark_idle`]
    /// must be balanced by exactly one call, on every exit path.
    pub fn mark_running(&self) {
        self.idle_cpus.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn idle_count(&self) -> usize {
        self.idle_cpus.load(Ordering::SeqCst)
    }

    /// Attempts to become the master for this idle episode. At most one
    /// core holds mastership at a time; a loser backs out immediately.
    pub fn try_elect_master(&self) -> bool {
        fence(Ordering::SeqCst);
        let elected = self.master.fetch_add(1, Ordering::SeqCst) == 0;
        if !elected {
            self.master.fetch_sub(1, Ordering::SeqCst);
        }
        fence(Ordering::SeqCst);
        elected
    }

    pub fn release_master(&self) {
        self.master.fetch_sub(1, Ordering::SeqCst);
    }

    /// Scans every active core's scheduled wake deadline and returns the
    /// minimum remaining budget relative to `now_us`.
    pub fn remaining_sleep_time(&self, now_us: u64) -> SleepBudget {
        let shared = self.shared.lock();
        let mut budget = SleepBudget {
            remaining_us: NO_SLEEP,
            wake_core: 0,
            wake_at_us: NO_WAKEUP_US,
        };
        for core in 0..self.active_cores {
            let deadline = shared.sched_wake_up_us[core];
            if deadline == NO_WAKEUP_US {
                continue;
            }
            let remaining =
                deadline.saturating_sub(now_us).min(u64::from(NO_SLEEP - 1)) as u32;
            if remaining < budget.remaining_us {
                budget = SleepBudget {
                    remaining_us: remaining,
                    wake_core: core,
                    wake_at_us: deadline,
                };
            }
        }
        budget
    }
}
