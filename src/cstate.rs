//! The configured idle-state table.
//!
//! States are ordered shallow to deep. Index [`RUNNING`] is a pseudo-state
//! that is never entered; it is reported back to the governor when an idle
//! episode aborts. Index [`WFI`] is the shallowest real state (a core-local
//! halt) and the floor of every depth selection.

use crate::driver::InitError;

/// Maximum number of configurable idle states.
pub const MAX_CSTATES: usize = 8;

/// Index of the running pseudo-state, reported on abort.
pub const RUNNING: usize = 0;

/// Index of the shallowest real state, a core-local wait-for-interrupt.
pub const WFI: usize = 1;

/// Power state of the CPU cluster domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmDomain {
    /// Cores fully powered and clocked.
    On,
    /// Context held, clocks gated; PPI state must be snapshotted.
    Retention,
    /// Context lost; per-core and cluster-common context must be restored.
    Off,
}

/// Power state of the shared (APE) domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApeDomain {
    On,
    Off,
}

/// State of the secondary (UL) PLL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UlPll {
    On,
    Off,
}

/// Power-state target understood by the power-management firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FwPowerState {
    Execute,
    Idle,
    Sleep,
    DeepSleep,
}

/// One configured idle depth.
#[derive(Debug, Clone, Copy)]
pub struct Cstate {
    pub name: &'static str,
    pub desc: &'static str,
    /// Minimum predicted idle time that justifies entering this state.
    pub threshold_us: u32,
    pub exit_latency_us: u32,
    pub power_usage: u32,
    pub arm: ArmDomain,
    pub ape: ApeDomain,
    pub ul_pll: UlPll,
    pub pwrst: FwPowerState,
}

/// The ordered idle-state table, fixed after driver initialization.
#[derive(Debug, Clone)]
pub struct CstateTable {
    states: heapless::Vec<Cstate, MAX_CSTATES>,
}

impl CstateTable {
    /// Builds a table from `states`, validating the ordering invariants:
    /// the running pseudo-state leads, and residency thresholds and exit
    /// latencies are monotonically non-decreasing with depth.
    pub fn new(states: &[Cstate]) -> Result<Self, InitError> {
        if states.len() < 2 {
            return Err(InitError::NoStates);
        }
        let states =
            heapless::Vec::from_slice(states).map_err(|_| InitError::TooManyStates)?;
        let table = Self { states };
        table.validate()?;
        Ok(table)
    }

    /// The default DBx500 table: Running, WFI, ApIdle, ApSleep, ApDeepSleep.
    pub fn dbx500() -> Result<Self, InitError> {
        Self::new(DBX500_CSTATES)
    }

    fn validate(&self) -> Result<(), InitError> {
        let s = &self.states;
        if s[RUNNING].arm != ArmDomain::On || s[RUNNING].ape != ApeDomain::On {
            return Err(InitError::BadStateOrder);
        }
        for i in (WFI + 1)..s.len() {
            if s[i].threshold_us < s[i - 1].threshold_us
                || s[i].exit_latency_us < s[i - 1].exit_latency_us
            {
                return Err(InitError::BadStateOrder);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Index of the deepest configured state.
    pub fn deepest(&self) -> usize {
        self.states.len() - 1
    }

    pub fn states(&self) -> &[Cstate] {
        &self.states
    }
}

impl core::ops::Index<usize> for CstateTable {
    type Output = Cstate;

    fn index(&self, index: usize) -> &Cstate {
        &self.states[index]
    }
}

/// The DBx500 idle states.
pub const DBX500_CSTATES: &[Cstate] = &[
    Cstate {
        name: "Running",
        desc: "all domains on",
        threshold_us: 0,
        exit_latency_us: 0,
        power_usage: 1000,
        arm: ArmDomain::On,
        ape: ApeDomain::On,
        ul_pll: UlPll::On,
        pwrst: FwPowerState::Execute,
    },
    Cstate {
        name: "WFI",
        desc: "core clock gated",
        threshold_us: 30,
        exit_latency_us: 4,
        power_usage: 300,
        arm: ArmDomain::On,
        ape: ApeDomain::On,
        ul_pll: UlPll::On,
        pwrst: FwPowerState::Execute,
    },
    Cstate {
        name: "ApIdle",
        desc: "ARM retention, APE on",
        threshold_us: 300,
        exit_latency_us: 135,
        power_usage: 150,
        arm: ArmDomain::Retention,
        ape: ApeDomain::On,
        ul_pll: UlPll::On,
        pwrst: FwPowerState::Idle,
    },
    Cstate {
        name: "ApSleep",
        desc: "ARM retention, APE off",
        threshold_us: 2500,
        exit_latency_us: 800,
        power_usage: 50,
        arm: ArmDomain::Retention,
        ape: ApeDomain::Off,
        ul_pll: UlPll::On,
        pwrst: FwPowerState::Sleep,
    },
    Cstate {
        name: "ApDeepSleep",
        desc: "ARM off, APE off, UL PLL off",
        threshold_us: 10000,
        exit_latency_us: 1600,
        power_usage: 10,
        arm: ArmDomain::Off,
        ape: ApeDomain::Off,
        ul_pll: UlPll::Off,
        pwrst: FwPowerState::DeepSleep,
    },
];
