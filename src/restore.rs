//! Context restore on wake.
//!
//! Each restoration category is gated by its own flag and consumed at most
//! once per set: the flag is cleared with release ordering strictly before
//! the restoration work, and read with acquire ordering before being
//! trusted, so two cores waking together never replay the same shared
//! context twice. The restoring core may be a different core than the one
//! that set the flag.

use core::sync::atomic::Ordering;

use crate::driver::CpuIdle;

pub(crate) fn restore_sequence(ci: &CpuIdle, core: usize) {
    let plat = &ci.plat;
    let coord = &ci.coord;

    let mut shared = coord.shared.lock();

    if coord.cores[core].restore_arm_core.swap(false, Ordering::AcqRel) {
        plat.ctx.restore_cpu_registers(core);
        plat.ctx.restore_arm_core(core);
    }

    if coord.restore_arm.swap(false, Ordering::AcqRel) {
        plat.ctx.restore_arm_common();
    }

    if coord.cores[core].restore_arm_ret.swap(false, Ordering::AcqRel) {
        plat.ctx.restore_ppi_irqs(core);
    }

    if coord.restore_ape.swap(false, Ordering::AcqRel) {
        plat.ctx.restore_ape();

        // The wake cause is latched in the GPIO banks; capture it before
        // releasing the I/O ring.
        plat.fw.save_gpio_wake_status();
        plat.fw.set_ioforce(false);

        plat.ctx.resume_console();
        plat.timer.cancel();
        plat.gic.set_wake_irq_affinity(ci.config.wake_irq, 0);

        // If the backup timer caused the wake, the recorded deadline has
        // already passed; push it out so a broadcast event is still
        // waiting for us.
        let now = plat.clock.now_us();
        if now >= shared.time_next_us {
            shared.time_next_us = now + 1000;
        }
        if ci.config.use_broadcast_timer {
            if let Err(err) = plat.timer.program_broadcast(shared.time_next_us) {
                warn!("cpu{core}: broadcast event not reprogrammed: {err}");
            }
        }
    }
}
