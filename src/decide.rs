//! Idle-depth decision engine.
//!
//! Determines the deepest power state that is jointly safe for all cores,
//! given the idle-core count, the scheduled wake deadlines and the
//! shared-domain usage constraints.

use crate::coord::NO_SLEEP;
use crate::cstate::{ApeDomain, WFI};
use crate::driver::CpuIdle;

/// Why an idle episode was abandoned before reaching a power state. The
/// tags are diagnostic only; every cause unwinds identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The distributor reported a pending interrupt.
    PendingIrq,
    /// The firmware reported a pending interrupt while the distributor was
    /// frozen.
    FwPendingIrq,
    /// The other core never reached wait-for-interrupt within the poll
    /// bound.
    StuckPoll,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Selection {
    pub target: usize,
    pub sleep_time_us: u32,
}

const WFI_ONLY: Selection = Selection {
    target: WFI,
    sleep_time_us: 0,
};

/// Determines the sleep state considering all cores and the shared domain.
///
/// `fw_can_see_irqs` is set on the second run, once the master has mirrored
/// the distributor routing into the firmware; only then is the firmware's
/// pending-interrupt view meaningful.
pub(crate) fn determine_sleep_state(
    ci: &CpuIdle,
    core: usize,
    local_idle_count: usize,
    fw_can_see_irqs: bool,
    entry_time_us: u64,
) -> Result<Selection, AbortReason> {
    let plat = &ci.plat;
    let coord = &ci.coord;
    let table = &ci.table;

    // First cores to go idle take the shallowest state; only the last one
    // in evaluates a joint depth.
    if local_idle_count != ci.config.active_cores {
        return Ok(WFI_ONLY);
    }

    // The other core has committed to idle but may not have reached halt
    // yet. Wait for it, bailing out the moment any interrupt shows up or
    // the idle-core count drops.
    loop {
        if plat.fw.other_cores_in_wfi(core) {
            break;
        }
        if plat.gic.pending_irq() {
            return Err(AbortReason::PendingIrq);
        }
        if fw_can_see_irqs && plat.fw.pending_irq() {
            return Err(AbortReason::FwPendingIrq);
        }
        if coord.idle_count() != ci.config.active_cores {
            return Ok(WFI_ONLY);
        }
        let spent = plat.clock.now_us().saturating_sub(entry_time_us);
        if spent > ci.config.state_poll_timeout_us {
            warn!("cpu{core}: stuck in state-determine loop for {spent}us");
            return Err(AbortReason::StuckPoll);
        }
    }

    let budget = coord.remaining_sleep_time(plat.clock.now_us());
    if budget.remaining_us == NO_SLEEP || budget.remaining_us == 0 {
        return Ok(WFI_ONLY);
    }

    // Never deeper than the governor recommends for any idle core, even if
    // the scheduled wake-ups would allow it.
    let max_depth = {
        let shared = coord.shared.lock();
        let mut depth = table.deepest();
        for c in 0..ci.config.active_cores {
            depth = depth.min(shared.gov_cstate[c]);
        }
        depth
    };

    let ape_busy = plat.fw.ape_forced_on();
    let modem = plat.fw.ac_wake_requested();
    let console = plat.fw.console_forced_on();

    let mut target = WFI;
    for i in (WFI..=max_depth).rev() {
        let state = &table[i];
        if budget.remaining_us <= state.threshold_us {
            continue;
        }
        if state.ape == ApeDomain::Off && (ape_busy || modem || console) {
            continue;
        }
        target = i;
        break;
    }

    debug!(
        "cpu{core}: {} chosen (budget={}us max_depth={} ape_busy={ape_busy} \
         modem={modem} console={console})",
        table[target].name, budget.remaining_us, max_depth
    );

    Ok(Selection {
        target,
        sleep_time_us: budget.remaining_us,
    })
}
