//! Trait seams to the platform.
//!
//! Everything the coordination protocol touches outside its own state goes
//! through these traits: the monotonic clock, local interrupt control, the
//! power-management firmware, the interrupt distributor, hardware context
//! save/restore and the wake timers. Implementations wrap the platform
//! register drivers; tests inject scripted doubles.

use crate::config::WakeSources;
use crate::cstate::{FwPowerState, UlPll};

/// Monotonic microsecond clock.
pub trait Clock: Sync {
    fn now_us(&self) -> u64;
}

/// Local interrupt control for the calling core.
pub trait CpuCtl: Sync {
    /// Disables local interrupts, returning whether they were enabled.
    fn local_irq_save(&self) -> bool;
    /// Restores the interrupt state returned by [`CpuCtl::local_irq_save`].
    fn local_irq_restore(&self, was_enabled: bool);
}

/// The power-management firmware (PRCMU-style controller).
pub trait PmFirmware: Sync {
    /// Whether every core other than `core` has reached wait-for-interrupt.
    fn other_cores_in_wfi(&self, core: usize) -> bool;
    /// Whether the firmware sees a pending interrupt. Only meaningful once
    /// the distributor routing has been mirrored via
    /// [`PmFirmware::copy_gic_settings`].
    fn pending_irq(&self) -> bool;
    /// Mirrors the distributor's interrupt routing into the firmware so it
    /// can observe wake events while the distributor is frozen.
    fn copy_gic_settings(&self);
    /// Requests a power-state transition. Fire and forget; the firmware's
    /// own state machine owns the outcome.
    fn request_power_state(&self, state: FwPowerState, ul_pll: UlPll);
    fn enable_wakeups(&self, sources: WakeSources);
    /// Forces or releases the I/O ring retention latches.
    fn set_ioforce(&self, force: bool);
    /// Captures the GPIO wake-up cause latched while the shared domain was
    /// off. Must run before the I/O ring is released.
    fn save_gpio_wake_status(&self);
    /// Whether the modem has requested the shared domain awake.
    fn ac_wake_requested(&self) -> bool;
    /// Whether a consumer holds the shared domain active.
    fn ape_forced_on(&self) -> bool;
    /// Whether the debug console holds the shared domain active.
    fn console_forced_on(&self) -> bool;
}

/// The interrupt distributor.
pub trait Gic: Sync {
    fn pending_irq(&self) -> bool;
    /// Detaches the distributor from the interrupt bus so the firmware
    /// observes wake events instead.
    fn decouple(&self);
    /// Reattaches the distributor after an aborted episode. A completed
    /// power transition is recoupled by the firmware itself.
    fn recouple(&self);
    /// Routes `irq` to `core`.
    fn set_wake_irq_affinity(&self, irq: u32, core: usize);
}

/// Save and restore of hardware context around a power transition.
pub trait ContextOps: Sync {
    fn save_cpu_registers(&self, core: usize);
    fn restore_cpu_registers(&self, core: usize);
    fn save_arm_core(&self, core: usize);
    fn restore_arm_core(&self, core: usize);
    /// Cluster-common context, including distributor routing.
    fn save_arm_common(&self);
    fn restore_arm_common(&self);
    /// Shared-domain (APE) register context.
    fn save_ape(&self);
    fn restore_ape(&self);
    /// Snapshot and disable private peripheral interrupts for retention.
    fn store_ppi_irqs(&self, core: usize);
    fn restore_ppi_irqs(&self, core: usize);
    /// Masks distributor interrupts that are not configured wake sources.
    fn mask_non_wake_irqs(&self);
    fn clean_l1_cache(&self);
    fn suspend_console(&self);
    fn resume_console(&self);
    /// Persists a resume address for warm reentry, then halts. `deep` is
    /// set when the whole cluster loses context, requiring the outer cache
    /// cleaned as well.
    fn save_to_sram_and_wfi(&self, core: usize, deep: bool);
    /// Plain wait-for-interrupt.
    fn wfi(&self, core: usize) {
        let _ = core;
        crate::asm::wait_for_interrupt();
    }
}

/// Backup wake timer programming failed; the sleep proceeds without a
/// guaranteed wake source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerError;

impl core::fmt::Display for TimerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("wake timer programming failed")
    }
}

/// Per-core timer migration events, mirroring the platform clock-event
/// broadcast notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastEvent {
    /// Broadcast handling becomes available for the core (driver init).
    On,
    /// Broadcast handling is torn down for the core (driver exit).
    Off,
    /// The core's local timer stops across the upcoming power state.
    Enter,
    /// The core's local timer is usable again.
    Exit,
}

/// The backup wake timer and the broadcast clock-event device.
pub trait WakeTimer: Sync {
    /// Programs the timer that survives a shared-domain power-down to fire
    /// in `sleep_us` microseconds.
    fn program(&self, sleep_us: u32) -> Result<(), TimerError>;
    fn cancel(&self);
    fn broadcast_notify(&self, event: BroadcastEvent, core: usize);
    /// Reprograms the broadcast clock-event device for an absolute deadline.
    fn program_broadcast(&self, deadline_us: u64) -> Result<(), TimerError>;
}
