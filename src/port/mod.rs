//! Port layer - CPU-specific implementations
//!
//! Context switching, first-task bootstrap, stack framing, and SysTick
//! setup for Cortex-M3/M4, plus no-op stubs so the kernel's algorithms
//! compile and test on the host.

#[cfg(target_arch = "arm")]
pub mod cortex_m;

#[cfg(target_arch = "arm")]
pub use cortex_m::*;

// Stub implementations for non-ARM targets (for host testing)
#[cfg(not(target_arch = "arm"))]
pub mod stub {
    use crate::task::OsTaskFn;
    use crate::types::OsStkElement;

    pub unsafe fn os_start_first_task() -> ! {
        panic!("os_start_first_task not available on this platform");
    }

    pub fn os_ctx_sw() {
        // No-op for testing
    }

    pub unsafe fn os_task_stk_init(
        _entry: OsTaskFn,
        stk_base: *mut OsStkElement,
        stk_size: usize,
    ) -> *mut OsStkElement {
        // Return top of stack for testing
        unsafe { stk_base.add(stk_size - 1) }
    }

    pub fn os_cpu_systick_init(_reload: u32) {
        // No-op for testing
    }
}

#[cfg(not(target_arch = "arm"))]
pub use stub::*;
