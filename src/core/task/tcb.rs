//! Task Control Block (TCB) definition
//!
//! The TCB carries everything the kernel tracks per task: the stack
//! descriptor, identity, scheduling state, and one pair of link fields for
//! each list role the task can occupy (registry, ready, tick, pend).

use core::ptr::NonNull;

use crate::types::{OsPrio, OsStkElement, OsTaskState, OsTick};

#[cfg(feature = "flag")]
use crate::types::{OsFlags, OsFlagWaitMode};
#[cfg(feature = "queue")]
use crate::types::OsMsg;

#[cfg(feature = "queue")]
use crate::sync::queue::OsQueue;
#[cfg(feature = "sem")]
use crate::sync::sem::OsSem;

use super::OsTaskFn;

/// Task Control Block
///
/// `stk_ptr` must stay the first field: the context-switch assembly saves
/// and restores the process stack pointer through offset 0 of this struct.
#[repr(C)]
pub struct OsTcb {
    // ============ Stack descriptor ============
    /// Saved process stack pointer
    pub stk_ptr: *mut OsStkElement,
    /// Base of the stack area
    pub stk_base: *mut OsStkElement,
    /// Stack size in machine words
    pub stk_size: usize,

    // ============ Identity ============
    /// Task entry point; tasks run an infinite loop and never return
    pub entry: Option<OsTaskFn>,
    /// Task name
    pub name: &'static str,
    /// Task priority (0 = highest)
    pub prio: OsPrio,

    // ============ Scheduling ============
    /// Current task state
    pub state: OsTaskState,
    /// Remaining ticks; delta-relative while the task sits in the tick list
    pub tick: OsTick,
    /// Object this task is blocked on, null when not pending
    pub pend_obj: *const (),

    // ============ Registry link ============
    /// Next TCB in the global task list
    pub next_ptr: Option<NonNull<OsTcb>>,

    // ============ Ready list links ============
    pub rdy_next_ptr: Option<NonNull<OsTcb>>,
    pub rdy_prev_ptr: Option<NonNull<OsTcb>>,

    // ============ Tick list links ============
    pub tick_next_ptr: Option<NonNull<OsTcb>>,
    pub tick_prev_ptr: Option<NonNull<OsTcb>>,

    // ============ Pend list links ============
    pub pend_next_ptr: Option<NonNull<OsTcb>>,
    pub pend_prev_ptr: Option<NonNull<OsTcb>>,

    // ============ Embedded synchronization ============
    /// Built-in task semaphore
    #[cfg(feature = "sem")]
    pub sem: OsSem,

    /// Built-in message queue
    #[cfg(feature = "queue")]
    pub msg_queue: OsQueue,
    /// Message deposited by a poster while this task was blocked
    #[cfg(feature = "queue")]
    pub msg_temp: OsMsg,

    /// Event-flag bits this task is waiting for
    #[cfg(feature = "flag")]
    pub flags_mask: OsFlags,
    /// Event-flag wait condition
    #[cfg(feature = "flag")]
    pub flags_wait: OsFlagWaitMode,
}

impl OsTcb {
    /// Create a new, unregistered TCB
    pub const fn new() -> Self {
        OsTcb {
            stk_ptr: core::ptr::null_mut(),
            stk_base: core::ptr::null_mut(),
            stk_size: 0,

            entry: None,
            name: "",
            prio: 0,

            state: OsTaskState::Stop,
            tick: 0,
            pend_obj: core::ptr::null(),

            next_ptr: None,

            rdy_next_ptr: None,
            rdy_prev_ptr: None,

            tick_next_ptr: None,
            tick_prev_ptr: None,

            pend_next_ptr: None,
            pend_prev_ptr: None,

            #[cfg(feature = "sem")]
            sem: OsSem::new(),

            #[cfg(feature = "queue")]
            msg_queue: OsQueue::new(),
            #[cfg(feature = "queue")]
            msg_temp: 0,

            #[cfg(feature = "flag")]
            flags_mask: 0,
            #[cfg(feature = "flag")]
            flags_wait: OsFlagWaitMode::None,
        }
    }

    /// Reset the TCB to its unregistered state
    pub fn init(&mut self) {
        *self = Self::new();
    }

    /// Check if the task is runnable (ready or running)
    #[inline]
    pub fn is_runnable(&self) -> bool {
        matches!(self.state, OsTaskState::Ready | OsTaskState::Running)
    }

    /// Check if the task is blocked on an object
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.state == OsTaskState::Pend
    }

    /// Check if the task sits in the tick list
    #[inline]
    pub fn is_delayed(&self) -> bool {
        self.state == OsTaskState::Delay
    }

    /// Clear the pend bookkeeping after a wake-up
    #[inline]
    pub(crate) fn clear_pend(&mut self) {
        self.pend_obj = core::ptr::null();
        self.state = OsTaskState::Ready;
    }
}

impl Default for OsTcb {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for OsTcb {}
unsafe impl Sync for OsTcb {}
