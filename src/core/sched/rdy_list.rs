//! Ready list - FIFO of runnable tasks at one priority level
//!
//! Each priority level has its own ready list. Tasks enter at the tail
//! and are scheduled from the head, so same-priority tasks run in
//! first-come-first-served order.

use core::ptr::NonNull;

use crate::task::OsTcb;

/// Ready list for a single priority level
#[derive(Debug)]
pub struct ReadyList {
    head: Option<NonNull<OsTcb>>,
    tail: Option<NonNull<OsTcb>>,
}

impl ReadyList {
    /// Create a new empty ready list
    pub const fn new() -> Self {
        ReadyList {
            head: None,
            tail: None,
        }
    }

    /// Initialize/reset the ready list
    pub fn init(&mut self) {
        self.head = None;
        self.tail = None;
    }

    /// Get head of list (next to be scheduled)
    #[inline]
    pub fn head(&self) -> Option<NonNull<OsTcb>> {
        self.head
    }

    /// Get tail of list
    #[inline]
    pub fn tail(&self) -> Option<NonNull<OsTcb>> {
        self.tail
    }

    /// Check if list is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Insert a TCB at the tail of the list (FIFO order)
    ///
    /// # Safety
    /// Caller must ensure `tcb` is valid and not already in any list.
    pub unsafe fn insert_tail(&mut self, tcb: NonNull<OsTcb>) {
        let tcb_ref = unsafe { &mut *tcb.as_ptr() };

        tcb_ref.rdy_next_ptr = None;
        tcb_ref.rdy_prev_ptr = self.tail;

        match self.tail {
            Some(tail) => {
                unsafe { (*tail.as_ptr()).rdy_next_ptr = Some(tcb) };
            }
            None => {
                self.head = Some(tcb);
            }
        }

        self.tail = Some(tcb);
    }

    /// Remove a TCB from anywhere in the list
    ///
    /// # Safety
    /// Caller must ensure `tcb` is valid and is in this list.
    pub unsafe fn remove(&mut self, tcb: NonNull<OsTcb>) {
        let tcb_ref = unsafe { &mut *tcb.as_ptr() };

        match tcb_ref.rdy_prev_ptr {
            Some(prev) => {
                unsafe { (*prev.as_ptr()).rdy_next_ptr = tcb_ref.rdy_next_ptr };
            }
            None => {
                self.head = tcb_ref.rdy_next_ptr;
            }
        }

        match tcb_ref.rdy_next_ptr {
            Some(next) => {
                unsafe { (*next.as_ptr()).rdy_prev_ptr = tcb_ref.rdy_prev_ptr };
            }
            None => {
                self.tail = tcb_ref.rdy_prev_ptr;
            }
        }

        tcb_ref.rdy_prev_ptr = None;
        tcb_ref.rdy_next_ptr = None;
    }
}

impl Default for ReadyList {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: ReadyList is only modified within critical sections
unsafe impl Send for ReadyList {}
unsafe impl Sync for ReadyList {}
