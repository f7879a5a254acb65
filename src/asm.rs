//! Architecture helpers shared by platform implementations.

/// Waits for an interrupt on the current core.
///
/// Issues a data synchronization barrier followed by `wfi` so that all
/// outstanding memory accesses complete before the core halts. On foreign
/// architectures (host-side tests) this degrades to a spin hint.
pub fn wait_for_interrupt() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "aarch64")] {
            aarch64_cpu::asm::barrier::dsb(aarch64_cpu::asm::barrier::SY);
            aarch64_cpu::asm::wfi();
        } else {
            core::hint::spin_loop();
        }
    }
}
