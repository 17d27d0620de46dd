//! Time management module
//!
//! Tick accounting, task delays, and the SysTick handler.

mod tick_list;

pub use tick_list::TickList;

use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::kernel;
use crate::sched;
use crate::types::{OsTaskState, OsTick};

/// Delay the calling task for `ticks` system ticks
///
/// The task leaves the ready queue and sits in the delta tick list until
/// the SysTick handler wakes it. `ticks == 0` keeps the CPU and returns
/// immediately.
///
/// # Returns
/// * `Ok(())` - Delay elapsed
/// * `Err(OsError::OsNotRunning)` - Kernel not started
/// * `Err(OsError::DelayIsr)` - Cannot delay from ISR
pub fn os_delay(ticks: OsTick) -> OsResult<()> {
    if !kernel::KERNEL.is_running() {
        return Err(OsError::OsNotRunning);
    }

    if kernel::KERNEL.int_nesting() > 0 {
        crate::error!("delay: called from ISR");
        return Err(OsError::DelayIsr);
    }

    if ticks == 0 {
        return Ok(());
    }

    critical_section(|_cs| unsafe {
        if let Some(cur) = kernel::tcb_cur_ptr() {
            (*cur.as_ptr()).state = OsTaskState::Delay;
            kernel::tick_list().insert(cur, ticks);
            sched::os_rdy_task_remove(cur);
        }
    });

    sched::os_sched();

    Ok(())
}

/// Current tick count since [`os_start`](crate::kernel::os_start)
#[inline]
pub fn os_time_get() -> OsTick {
    kernel::KERNEL.tick_get()
}

/// Tick handler body
///
/// Runs in the SysTick exception: counts the tick, moves expired tasks
/// from the tick list to the ready queues, and lets the ISR-exit hook
/// request the context switch if the highest-ready task changed.
pub fn os_tick_handler() {
    if !kernel::KERNEL.is_running() {
        return;
    }

    kernel::os_int_enter();

    kernel::KERNEL.tick_increment();

    critical_section(|_cs| unsafe {
        kernel::tick_list().advance(|tcb| {
            (*tcb.as_ptr()).state = OsTaskState::Ready;
            sched::os_rdy_task_add(tcb);
        });
    });

    kernel::os_int_exit();
}

/// SysTick exception handler
#[no_mangle]
pub extern "C" fn SysTick() {
    os_tick_handler();
}
