//! Wait queue (pend list) - priority-ordered list of blocked tasks
//!
//! One of these heads every blocking kernel object. The list is kept
//! sorted by task priority with the highest-priority (numerically
//! smallest) waiter at the head, so releasing "the best waiter" is a head
//! pop. Insertion walks past waiters of equal priority, preserving
//! arrival order among them.

use core::ptr::NonNull;

use crate::task::OsTcb;

/// Priority-ordered wait queue
#[derive(Debug)]
pub struct PendList {
    head: Option<NonNull<OsTcb>>,
    tail: Option<NonNull<OsTcb>>,
}

impl PendList {
    /// Create a new empty pend list
    pub const fn new() -> Self {
        PendList {
            head: None,
            tail: None,
        }
    }

    /// Initialize/reset the pend list
    pub fn init(&mut self) {
        self.head = None;
        self.tail = None;
    }

    /// Check if list is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Peek the highest-priority waiter
    #[inline]
    pub fn head(&self) -> Option<NonNull<OsTcb>> {
        self.head
    }

    /// Insert a TCB in priority order
    ///
    /// The walk stops at the first waiter with strictly lower priority
    /// (larger number), so equal-priority waiters stay FIFO.
    ///
    /// # Safety
    /// Caller must ensure `tcb` is valid and not already in any pend list.
    pub unsafe fn insert(&mut self, tcb: NonNull<OsTcb>) {
        let prio = unsafe { tcb.as_ref() }.prio;

        let mut cur = self.head;
        let mut prev: Option<NonNull<OsTcb>> = None;

        while let Some(cur_ptr) = cur {
            let cur_ref = unsafe { cur_ptr.as_ref() };
            if prio < cur_ref.prio {
                break;
            }
            prev = cur;
            cur = cur_ref.pend_next_ptr;
        }

        let tcb_ref = unsafe { &mut *tcb.as_ptr() };
        tcb_ref.pend_prev_ptr = prev;
        tcb_ref.pend_next_ptr = cur;

        match prev {
            Some(p) => {
                unsafe { (*p.as_ptr()).pend_next_ptr = Some(tcb) };
            }
            None => {
                self.head = Some(tcb);
            }
        }

        match cur {
            Some(c) => {
                unsafe { (*c.as_ptr()).pend_prev_ptr = Some(tcb) };
            }
            None => {
                self.tail = Some(tcb);
            }
        }
    }

    /// Remove a specific TCB from the list
    ///
    /// # Safety
    /// Caller must ensure `tcb` is valid and is in this list.
    pub unsafe fn remove(&mut self, tcb: NonNull<OsTcb>) {
        let tcb_ref = unsafe { &mut *tcb.as_ptr() };

        match tcb_ref.pend_prev_ptr {
            Some(prev) => {
                unsafe { (*prev.as_ptr()).pend_next_ptr = tcb_ref.pend_next_ptr };
            }
            None => {
                self.head = tcb_ref.pend_next_ptr;
            }
        }

        match tcb_ref.pend_next_ptr {
            Some(next) => {
                unsafe { (*next.as_ptr()).pend_prev_ptr = tcb_ref.pend_prev_ptr };
            }
            None => {
                self.tail = tcb_ref.pend_prev_ptr;
            }
        }

        tcb_ref.pend_prev_ptr = None;
        tcb_ref.pend_next_ptr = None;
    }

    /// Detach and return the highest-priority waiter
    ///
    /// # Safety
    /// Every TCB in the list must still be valid.
    pub unsafe fn pop_head(&mut self) -> Option<NonNull<OsTcb>> {
        let head = self.head?;
        unsafe { self.remove(head) };
        Some(head)
    }

    /// Drain the whole list in priority order, handing each waiter to `f`
    ///
    /// Used for broadcast wake-ups that push every waiter back to the
    /// ready queues.
    ///
    /// # Safety
    /// Every TCB in the list must still be valid.
    pub unsafe fn pop_all<F: FnMut(NonNull<OsTcb>)>(&mut self, mut f: F) {
        while let Some(tcb) = unsafe { self.pop_head() } {
            f(tcb);
        }
    }
}

impl Default for PendList {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: PendList is only modified within critical sections
unsafe impl Send for PendList {}
unsafe impl Sync for PendList {}
