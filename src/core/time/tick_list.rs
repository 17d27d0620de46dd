//! Delta tick list - sorted list of delayed tasks
//!
//! Each node stores the tick count *relative to its predecessor*, so one
//! SysTick only ever decrements the head. The sum of the deltas from the
//! head through a node equals that node's absolute remaining delay.

use core::ptr::NonNull;

use crate::task::OsTcb;
use crate::types::OsTick;

/// Delta list of delayed tasks, earliest expiry at the head
#[derive(Debug)]
pub struct TickList {
    head: Option<NonNull<OsTcb>>,
    tail: Option<NonNull<OsTcb>>,
}

impl TickList {
    /// Create a new empty tick list
    pub const fn new() -> Self {
        TickList {
            head: None,
            tail: None,
        }
    }

    /// Initialize/reset the tick list
    pub fn init(&mut self) {
        self.head = None;
        self.tail = None;
    }

    /// Earliest-expiring task
    #[inline]
    pub fn head(&self) -> Option<NonNull<OsTcb>> {
        self.head
    }

    /// Check if no task is delayed
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Insert a task delayed by `ticks`
    ///
    /// Walks from the head accumulating deltas; the task lands in front
    /// of the first node it expires no later than, and that node's delta
    /// shrinks by the inserted amount.
    ///
    /// # Safety
    /// Caller must ensure `tcb` is valid and not already in any list.
    pub unsafe fn insert(&mut self, tcb: NonNull<OsTcb>, ticks: OsTick) {
        debug_assert!(ticks > 0);

        let tcb_ref = unsafe { &mut *tcb.as_ptr() };

        // Empty list: the delay is stored as-is
        let Some(head) = self.head else {
            tcb_ref.tick = ticks;
            tcb_ref.tick_prev_ptr = None;
            tcb_ref.tick_next_ptr = None;
            self.head = Some(tcb);
            self.tail = Some(tcb);
            return;
        };

        let mut remain = ticks;
        let mut cur = Some(head);
        let mut prev: Option<NonNull<OsTcb>> = None;

        while let Some(cur_ptr) = cur {
            let cur_ref = unsafe { &mut *cur_ptr.as_ptr() };

            if remain <= cur_ref.tick {
                // Expires no later than `cur`: insert in front of it and
                // make `cur` relative to the newcomer
                tcb_ref.tick = remain;
                tcb_ref.tick_prev_ptr = prev;
                tcb_ref.tick_next_ptr = Some(cur_ptr);

                cur_ref.tick -= remain;
                cur_ref.tick_prev_ptr = Some(tcb);

                match prev {
                    Some(p) => unsafe { (*p.as_ptr()).tick_next_ptr = Some(tcb) },
                    None => self.head = Some(tcb),
                }
                return;
            }

            remain -= cur_ref.tick;
            prev = cur;
            cur = cur_ref.tick_next_ptr;
        }

        // Expires after everything: append with the leftover delta
        tcb_ref.tick = remain;
        tcb_ref.tick_prev_ptr = prev;
        tcb_ref.tick_next_ptr = None;

        if let Some(p) = prev {
            unsafe { (*p.as_ptr()).tick_next_ptr = Some(tcb) };
        }
        self.tail = Some(tcb);
    }

    /// Remove a task from the list
    ///
    /// The removed node's delta is transferred to its successor so later
    /// expiries stay correct relative to the current tick cursor.
    ///
    /// # Safety
    /// Caller must ensure `tcb` is valid and is in this list.
    pub unsafe fn remove(&mut self, tcb: NonNull<OsTcb>) {
        let tcb_ref = unsafe { &mut *tcb.as_ptr() };

        let prev = tcb_ref.tick_prev_ptr;
        let next = tcb_ref.tick_next_ptr;

        match next {
            Some(n) => unsafe {
                (*n.as_ptr()).tick += tcb_ref.tick;
                (*n.as_ptr()).tick_prev_ptr = prev;
            },
            None => self.tail = prev,
        }

        match prev {
            Some(p) => unsafe { (*p.as_ptr()).tick_next_ptr = next },
            None => self.head = next,
        }

        tcb_ref.tick_prev_ptr = None;
        tcb_ref.tick_next_ptr = None;
        tcb_ref.tick = 0;
    }

    /// Advance the list by one tick
    ///
    /// Decrements the head's delta and pops every task whose delta has
    /// reached zero, handing each one to `wake`. Several tasks sharing an
    /// expiry tick come out in list order.
    ///
    /// # Safety
    /// Every TCB in the list must still be valid.
    pub unsafe fn advance<F: FnMut(NonNull<OsTcb>)>(&mut self, mut wake: F) {
        let Some(head) = self.head else {
            return;
        };

        unsafe { (*head.as_ptr()).tick -= 1 };

        while let Some(h) = self.head {
            if unsafe { h.as_ref() }.tick != 0 {
                break;
            }
            unsafe { self.remove(h) };
            wake(h);
        }
    }
}

impl Default for TickList {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: TickList is only modified within critical sections
unsafe impl Send for TickList {}
unsafe impl Sync for TickList {}
