#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![doc = include_str!("../README.md")]

#[macro_use]
extern crate log;

pub mod asm;

mod config;
mod coord;
mod cstate;
mod decide;
mod driver;
mod enter;
mod platform;
mod restore;

pub use config::{PlatformConfig, WakeSources};
pub use coord::{Coordinator, SleepBudget, MAX_CPUS, NO_SLEEP, NO_WAKEUP_US};
pub use cstate::{
    ApeDomain, ArmDomain, Cstate, CstateTable, FwPowerState, UlPll, MAX_CSTATES, RUNNING, WFI,
};
pub use decide::AbortReason;
pub use driver::{cpuidle, init_cpuidle, CpuIdle, EnteredState, InitError, Platform};
pub use platform::{
    BroadcastEvent, Clock, ContextOps, CpuCtl, Gic, PmFirmware, TimerError, WakeTimer,
};
