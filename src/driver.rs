//! Driver surface: initialization, the per-depth descriptors and the entry
//! operation handed to the governor.

use core::fmt;

use lazyinit::LazyInit;

use crate::config::PlatformConfig;
use crate::coord::{Coordinator, MAX_CPUS};
use crate::cstate::{Cstate, CstateTable};
use crate::enter;
use crate::platform::{BroadcastEvent, Clock, ContextOps, CpuCtl, Gic, PmFirmware, WakeTimer};

/// The injected platform seams. All references live for the driver's
/// lifetime.
#[derive(Clone, Copy)]
pub struct Platform {
    pub clock: &'static dyn Clock,
    pub cpu: &'static dyn CpuCtl,
    pub fw: &'static dyn PmFirmware,
    pub gic: &'static dyn Gic,
    pub ctx: &'static dyn ContextOps,
    pub timer: &'static dyn WakeTimer,
}

/// Outcome of one idle episode, reported back to the governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnteredState {
    /// Index of the state actually entered, [`crate::RUNNING`] on abort.
    pub index: usize,
    /// Measured residency, clamped to the representable maximum.
    pub residency_us: u32,
}

/// Driver activation failure. Fatal to activation only; no partial shared
/// state is left registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    NoStates,
    TooManyStates,
    BadStateOrder,
    TooManyCores,
    AlreadyInitialized,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NoStates => "no idle states configured",
            Self::TooManyStates => "too many idle states configured",
            Self::BadStateOrder => "idle states not ordered shallow to deep",
            Self::TooManyCores => "unsupported core count",
            Self::AlreadyInitialized => "cpuidle driver already initialized",
        };
        f.write_str(msg)
    }
}

/// The coupled cpuidle driver.
pub struct CpuIdle {
    pub(crate) table: CstateTable,
    pub(crate) config: PlatformConfig,
    pub(crate) plat: Platform,
    pub(crate) coord: Coordinator,
}

impl CpuIdle {
    /// Builds a driver instance. Pure validation; no platform state is
    /// touched until [`CpuIdle::activate`].
    pub fn new(
        table: CstateTable,
        config: PlatformConfig,
        plat: Platform,
    ) -> Result<Self, InitError> {
        if config.active_cores == 0 || config.active_cores > MAX_CPUS {
            return Err(InitError::TooManyCores);
        }
        Ok(Self {
            coord: Coordinator::new(config.active_cores),
            table,
            config,
            plat,
        })
    }

    /// Arms the platform: broadcast timekeeping for every core and the
    /// configured wake sources.
    pub fn activate(&self) {
        for core in 0..self.config.active_cores {
            self.plat.timer.broadcast_notify(BroadcastEvent::On, core);
        }
        self.plat.fw.enable_wakeups(self.config.wakeups);
        info!(
            "cpuidle initiated for {} cores, {} states",
            self.config.active_cores,
            self.table.len()
        );
    }

    /// Tears broadcast timekeeping back down.
    pub fn shutdown(&self) {
        for core in 0..self.config.active_cores {
            self.plat.timer.broadcast_notify(BroadcastEvent::Off, core);
        }
    }

    /// One descriptor per configured depth, for governor registration.
    pub fn states(&self) -> &[Cstate] {
        self.table.states()
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coord
    }

    /// Runs one idle episode on `core`.
    ///
    /// `governor_idx` is the depth the governor recommends for this core
    /// and `predicted_sleep_us` its predicted idle duration. Returns the
    /// depth actually entered and the measured residency.
    pub fn enter(&self, core: usize, governor_idx: usize, predicted_sleep_us: u64) -> EnteredState {
        enter::enter_idle(self, core, governor_idx, predicted_sleep_us)
    }
}

static CPUIDLE: LazyInit<CpuIdle> = LazyInit::new();

/// Registers the driver singleton and arms the platform.
pub fn init_cpuidle(
    table: CstateTable,
    config: PlatformConfig,
    plat: Platform,
) -> Result<&'static CpuIdle, InitError> {
    let driver = CpuIdle::new(table, config, plat)?;
    let driver = CPUIDLE
        .call_once(|| driver)
        .ok_or(InitError::AlreadyInitialized)?;
    driver.activate();
    Ok(driver)
}

/// The registered driver. Panics if [`init_cpuidle`] has not run.
pub fn cpuidle() -> &'static CpuIdle {
    &*CPUIDLE
}
