//! CasyOS real-time kernel in Rust
//!
//! A small preemptive real-time kernel for single-core ARM Cortex-M3/M4:
//! - Priority-based preemptive scheduling with an O(1) priority bitmap
//! - Delta-list tick management for task delays
//! - Priority-ordered wait queues shared by every blocking object
//! - Semaphores, per-task message queues, recursive mutexes, event flags
//! - First-fit memory allocator over a static pool

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod sync;
pub mod port;

// ============ Re-exports ============

pub use core::config;
pub use core::config::*;
pub use core::critical;
pub use core::error;
pub use core::error::{OsError, OsResult};
pub use core::kernel;
pub use core::kernel::{os_init, os_int_enter, os_int_exit, os_start};
pub use core::prio;
pub use core::types;
pub use core::types::*;
pub use core::task;
pub use core::task::{os_register, os_task_find, OsTaskId, OsTcb};
pub use core::sched;
pub use core::time;
pub use core::time::{os_delay, os_time_get};

#[cfg(feature = "mem")]
pub use core::mem;
#[cfg(feature = "mem")]
pub use core::mem::{os_free, os_malloc, os_mem_perused};

#[cfg(feature = "sem")]
pub use sync::sem;
#[cfg(feature = "queue")]
pub use sync::queue;
#[cfg(feature = "mutex")]
pub use sync::mutex;
#[cfg(feature = "flag")]
pub use sync::flag;
