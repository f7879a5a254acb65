//! The per-episode entry sequence: master election and shared-resource
//! sequencing.
//!
//! The whole sequence runs with the calling core's interrupts disabled,
//! from depth determination through wake detection. Other cores keep
//! running concurrently; everything shared goes through the coordinator.

use core::sync::atomic::Ordering;

use crate::coord::{NO_SLEEP, NO_WAKEUP_US};
use crate::cstate::{ApeDomain, ArmDomain, UlPll, RUNNING};
use crate::decide::{self, AbortReason};
use crate::driver::{CpuIdle, EnteredState};
use crate::platform::BroadcastEvent;
use crate::restore;

#[derive(Clone, Copy)]
enum SleepOutcome {
    /// State determination failed; nothing beyond the idle count was
    /// committed.
    Aborted(AbortReason),
    /// The master backed out after decoupling the distributor; the episode
    /// ends without sleeping.
    MasterAbort { target: usize },
    Slept { target: usize },
}

pub(crate) fn enter_idle(
    ci: &CpuIdle,
    core: usize,
    governor_idx: usize,
    predicted_sleep_us: u64,
) -> EnteredState {
    let plat = &ci.plat;
    let coord = &ci.coord;

    debug_assert!(core < ci.config.active_cores);

    let irqs_were_on = plat.cpu.local_irq_save();
    let time_enter = plat.clock.now_us();
    let wake_up = time_enter.saturating_add(predicted_sleep_us);

    let gov = governor_idx.min(ci.table.deepest());
    {
        let mut shared = coord.shared.lock();
        shared.sched_wake_up_us[core] = wake_up;
        shared.gov_cstate[core] = gov;
    }
    // States below "ARM on" stop the per-core timer; lean on the broadcast
    // source for the duration of the episode.
    let migrate_timer = ci.table[gov].arm != ArmDomain::On;

    let local_idle_count = coord.mark_idle();

    let outcome = sleep_attempt(ci, core, gov, migrate_timer, local_idle_count, time_enter);

    let reported = match outcome {
        SleepOutcome::Aborted(reason) => {
            debug!("cpu{core}: idle episode aborted ({reason:?})");
            RUNNING
        }
        SleepOutcome::MasterAbort { target } => {
            plat.gic.recouple();
            if migrate_timer {
                plat.timer.broadcast_notify(BroadcastEvent::Exit, core);
            }
            target
        }
        SleepOutcome::Slept { target } => {
            if migrate_timer {
                plat.timer.broadcast_notify(BroadcastEvent::Exit, core);
            }
            target
        }
    };

    coord.mark_running();

    let now = plat.clock.now_us();
    if matches!(outcome, SleepOutcome::Slept { .. }) && now > wake_up {
        debug!("cpu{core}: woke {}us past the scheduled deadline", now - wake_up);
    }

    {
        let mut shared = coord.shared.lock();
        shared.sched_wake_up_us[core] = NO_WAKEUP_US;
    }

    let time_exit = plat.clock.now_us();
    let residency_us = time_exit
        .saturating_sub(time_enter)
        .min(u64::from(u32::MAX)) as u32;

    plat.cpu.local_irq_restore(irqs_were_on);

    EnteredState {
        index: reported,
        residency_us,
    }
}

fn sleep_attempt(
    ci: &CpuIdle,
    core: usize,
    gov: usize,
    migrate_timer: bool,
    local_idle_count: usize,
    time_enter: u64,
) -> SleepOutcome {
    let plat = &ci.plat;
    let coord = &ci.coord;
    let table = &ci.table;
    let cfg = &ci.config;

    let mut sel =
        match decide::determine_sleep_state(ci, core, local_idle_count, false, time_enter) {
            Ok(sel) => sel,
            Err(reason) => return SleepOutcome::Aborted(reason),
        };

    // Only one core masters the sleeping sequence, and mastership is only
    // contested when the chosen depth takes the cluster out of "on".
    let mut master = false;
    if table[sel.target].arm != ArmDomain::On {
        master = coord.try_elect_master();
    }

    if migrate_timer {
        plat.timer.broadcast_notify(BroadcastEvent::Enter, core);
    }

    if master && table[sel.target].arm != ArmDomain::On {
        plat.gic.decouple();
        plat.fw.copy_gic_settings();

        // The distributor is frozen now; anything that arrived in the
        // meantime is only visible through the firmware. Re-run the
        // decision and bail out if it no longer holds.
        let local_idle_count = coord.idle_count();
        match decide::determine_sleep_state(ci, core, local_idle_count, true, time_enter) {
            Ok(re) if re.target == sel.target => sel = re,
            _ => {
                coord.release_master();
                return SleepOutcome::MasterAbort { target: sel.target };
            }
        }
        if plat.gic.pending_irq() || plat.fw.pending_irq() {
            coord.release_master();
            return SleepOutcome::MasterAbort { target: sel.target };
        }
    }

    let target = sel.target;
    let tstate = &table[target];

    if master && tstate.ape == ApeDomain::Off {
        // Program the only timer that survives the shared domain going
        // down, compensated for PLL start-up and the wake path latency.
        let budget = coord.remaining_sleep_time(plat.clock.now_us());
        if budget.remaining_us == NO_SLEEP || budget.remaining_us == 0 {
            coord.release_master();
            return SleepOutcome::MasterAbort { target };
        }
        let mut sleep_us = budget.remaining_us;
        if tstate.ul_pll == UlPll::Off {
            sleep_us = sleep_us.saturating_sub(cfg.ul_pll_startup_us);
        }
        sleep_us = sleep_us.saturating_sub(cfg.min_wakeup_latency_us);

        if let Err(err) = plat.timer.program(sleep_us) {
            warn!("cpu{core}: backup wake timer not armed: {err}");
        }

        // The core scheduled to wake first gets the firmware interrupt.
        plat.gic.set_wake_irq_affinity(cfg.wake_irq, budget.wake_core);

        plat.ctx.save_ape();
        plat.ctx.suspend_console();
        plat.fw.set_ioforce(true);

        {
            let mut shared = coord.shared.lock();
            shared.time_next_us = budget.wake_at_us;
        }
        coord.restore_ape.store(true, Ordering::Release);
    }

    if table[gov].arm == ArmDomain::Retention {
        plat.ctx.store_ppi_irqs(core);
        coord.cores[core].restore_arm_ret.store(true, Ordering::Release);
    }

    if master && tstate.arm == ArmDomain::Off {
        plat.ctx.save_arm_common();
        coord.restore_arm.store(true, Ordering::Release);
        for c in 0..cfg.active_cores {
            coord.cores[c].restore_arm_core.store(true, Ordering::Release);
        }
    }

    if table[gov].arm == ArmDomain::Off {
        plat.ctx.save_arm_core(core);
        if master && tstate.arm == ArmDomain::Off {
            plat.ctx.mask_non_wake_irqs();
        }
        plat.ctx.save_cpu_registers(core);
        // Only a short window exists between the power-state request and
        // the halt; clean the cache early so the final clean before wfi
        // has as little as possible left to do.
        plat.ctx.clean_l1_cache();
    }

    trace!(
        "cpu{core}: entering {} (governor {})",
        tstate.name,
        table[gov].name
    );

    if master && tstate.arm != ArmDomain::On {
        plat.fw.request_power_state(tstate.pwrst, tstate.ul_pll);
    }
    if master {
        coord.release_master();
    }

    if table[gov].arm == ArmDomain::Off {
        plat.ctx
            .save_to_sram_and_wfi(core, tstate.arm == ArmDomain::Off);
    } else {
        plat.ctx.wfi(core);
    }

    trace!(
        "cpu{core}: woke from {} (budget was {}us)",
        tstate.name,
        sel.sleep_time_us
    );

    restore::restore_sequence(ci, core);

    SleepOutcome::Slept { target }
}
