//! Platform constants injected at driver initialization.

bitflags::bitflags! {
    /// Wake sources the power-management firmware keeps armed while the
    /// shared domain is powered down.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WakeSources: u32 {
        const ARM   = 1 << 0;
        const RTC   = 1 << 1;
        const RTT   = 1 << 2;
        const ABB   = 1 << 3;
        const GPIO  = 1 << 4;
        const USB   = 1 << 5;
        const MODEM = 1 << 6;
    }
}

/// Platform latency constants and identifiers, immutable after init.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Number of coordinating cores, at most [`crate::MAX_CPUS`].
    pub active_cores: usize,
    /// Start-up time of the secondary PLL, compensated for when programming
    /// the backup wake timer for a PLL-off state.
    pub ul_pll_startup_us: u32,
    /// Minimum latency between the wake event and the first instruction.
    pub min_wakeup_latency_us: u32,
    /// Upper bound on the state-determination busy-poll.
    pub state_poll_timeout_us: u64,
    /// Interrupt line over which the firmware signals wake events.
    pub wake_irq: u32,
    pub wakeups: WakeSources,
    /// Whether a broadcast clock event device is available for reprogramming
    /// after a shared-domain wake.
    pub use_broadcast_timer: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            active_cores: 2,
            ul_pll_startup_us: 8000,
            min_wakeup_latency_us: 450,
            state_poll_timeout_us: 100_000,
            wake_irq: 47,
            wakeups: WakeSources::ARM | WakeSources::RTC | WakeSources::RTT | WakeSources::ABB,
            use_broadcast_timer: true,
        }
    }
}
