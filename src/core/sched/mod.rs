//! Scheduler module
//!
//! Priority-based preemptive scheduling with FIFO within a priority.
//! The scheduler itself never performs the switch; it selects the
//! highest-ready task and pends the PendSV exception, which does the
//! actual context swap on the way out of the kernel.

mod pend_list;
mod rdy_list;

pub use pend_list::PendList;
pub use rdy_list::ReadyList;

use core::ptr::NonNull;

use crate::critical::CriticalSection;
use crate::kernel;
use crate::task::OsTcb;
use crate::types::{OsStkElement, OsTaskState};

/// Main scheduling point
///
/// Selects the highest-priority ready task and requests a context switch
/// when it differs from the current task. Called at the end of any kernel
/// operation that may have changed the highest-ready task. While an ISR is
/// in progress the request is deferred; [`kernel::os_int_exit`] re-checks
/// on the way out.
pub fn os_sched() {
    if !kernel::KERNEL.is_running() {
        return;
    }

    if kernel::KERNEL.int_nesting() > 0 {
        return;
    }

    let _cs = CriticalSection::enter();

    unsafe {
        let Some(high_prio) = kernel::prio_table().get_highest() else {
            kernel::os_halt("no ready task");
        };

        if let Some(head) = kernel::rdy_list(high_prio).head() {
            if Some(head) != kernel::tcb_cur_ptr() {
                kernel::set_prio_high_rdy(high_prio);
                kernel::set_tcb_high_rdy_ptr(Some(head));
                crate::port::os_ctx_sw();
            }
        }
    }
}

/// Make a task ready: append to its priority FIFO and set the bitmap bit
pub(crate) unsafe fn os_rdy_task_add(tcb: NonNull<OsTcb>) {
    let prio = unsafe { tcb.as_ref() }.prio;

    unsafe {
        kernel::rdy_list(prio).insert_tail(tcb);
        kernel::prio_table().insert(prio);
    }
}

/// Remove a task from its ready FIFO, clearing the bitmap bit if the FIFO
/// drained
pub(crate) unsafe fn os_rdy_task_remove(tcb: NonNull<OsTcb>) {
    let prio = unsafe { tcb.as_ref() }.prio;

    unsafe {
        let rdy_list = kernel::rdy_list(prio);
        rdy_list.remove(tcb);

        if rdy_list.is_empty() {
            kernel::prio_table().remove(prio);
        }
    }
}

/// Block the current task on a kernel object
///
/// Leaves the ready queue and records the pend target. The caller inserts
/// the task into the object's wait queue and requests a reschedule.
pub(crate) unsafe fn os_task_block(tcb: NonNull<OsTcb>, pend_obj: *const ()) {
    unsafe {
        os_rdy_task_remove(tcb);

        let tcb_ref = &mut *tcb.as_ptr();
        tcb_ref.state = OsTaskState::Pend;
        tcb_ref.pend_obj = pend_obj;
    }
}

/// Wake a task that has been detached from a wait queue
///
/// Clears the pend bookkeeping and makes the task ready again. The caller
/// requests the reschedule.
pub(crate) unsafe fn os_task_wake(tcb: NonNull<OsTcb>) {
    unsafe {
        let tcb_ref = &mut *tcb.as_ptr();
        tcb_ref.tick = 0;
        tcb_ref.clear_pend();

        os_rdy_task_add(tcb);
    }
}

/// Adopt the published high-ready task as current
///
/// Called from the PendSV handler after the outgoing context has been
/// saved. Retires the outgoing task to `Ready`, promotes the incoming one
/// to `Running`, and returns its saved stack pointer for the restore path.
pub(crate) unsafe fn os_pick_high_rdy() -> *mut OsStkElement {
    unsafe {
        if let Some(outgoing) = kernel::tcb_cur_ptr() {
            let out_ref = &mut *outgoing.as_ptr();
            if out_ref.state == OsTaskState::Running {
                out_ref.state = OsTaskState::Ready;
            }
        }

        let Some(incoming) = kernel::tcb_high_rdy_ptr() else {
            kernel::os_halt("context switch without a high-ready task");
        };

        kernel::set_tcb_cur_ptr(Some(incoming));
        kernel::set_prio_cur(kernel::prio_high_rdy());

        let in_ref = &mut *incoming.as_ptr();
        in_ref.state = OsTaskState::Running;
        in_ref.stk_ptr
    }
}
