//! Event-flag group implementation
//!
//! A 32-bit flag word plus a wait queue. Each waiter records a mask and a
//! wait condition on its own TCB; a post wakes exactly one waiter — the
//! highest-priority one whose condition is now satisfied. Mask bits are
//! consumed on a successful SET-mode wait (both the immediate-match path
//! and the post-side wake), never for CLR-mode waits; waking more than
//! one waiter per post could starve the second of its expected bits.

use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::kernel;
use crate::sched;
use crate::sched::PendList;
use crate::types::{OsFlagOp, OsFlags, OsFlagWaitMode, OsObjType};

/// Check a flag word against a waiter's mask and wait condition
#[inline]
pub fn flags_match(flags: OsFlags, mask: OsFlags, mode: OsFlagWaitMode) -> bool {
    match mode {
        OsFlagWaitMode::SetAll => (flags & mask) == mask,
        OsFlagWaitMode::SetAny => (flags & mask) != 0,
        OsFlagWaitMode::ClrAll => (flags & mask) == 0,
        OsFlagWaitMode::ClrAny => (flags & mask) != mask,
        OsFlagWaitMode::None => false,
    }
}

#[inline]
fn consumes_on_match(mode: OsFlagWaitMode) -> bool {
    matches!(mode, OsFlagWaitMode::SetAll | OsFlagWaitMode::SetAny)
}

/// Event-flag group
pub struct OsFlagGroup {
    /// Object type marker
    obj_type: OsObjType,
    /// Tasks waiting on this group, highest priority first
    pend_list: PendList,
    /// Group name for debugging
    name: &'static str,
    /// Current flag bits
    flags: OsFlags,
}

impl OsFlagGroup {
    /// Create a new, uninitialized flag group
    pub const fn new() -> Self {
        OsFlagGroup {
            obj_type: OsObjType::None,
            pend_list: PendList::new(),
            name: "",
            flags: 0,
        }
    }

    /// Initialize the flag group with its starting flag bits
    pub fn create(&mut self, name: &'static str, init_flags: OsFlags) {
        critical_section(|_cs| {
            self.obj_type = OsObjType::Flag;
            self.pend_list.init();
            self.name = name;
            self.flags = init_flags;
        });
    }

    /// Set or clear flag bits and wake at most one matching waiter
    ///
    /// After applying the mask, the wait queue is scanned from its head
    /// (it is priority ordered, so the first match is the
    /// highest-priority one). A matching SET-mode waiter consumes its
    /// mask bits before it is made ready.
    ///
    /// # Returns
    /// * `Ok(())` - Flags updated
    /// * `Err(OsError::ObjType)` - Not an initialized flag group
    pub fn post(&mut self, mask: OsFlags, op: OsFlagOp) -> OsResult<()> {
        if self.obj_type != OsObjType::Flag {
            crate::error!("flag post: not a flag group");
            return Err(OsError::ObjType);
        }

        critical_section(|_cs| {
            match op {
                OsFlagOp::Set => self.flags |= mask,
                OsFlagOp::Clr => self.flags &= !mask,
            }

            let mut cur = self.pend_list.head();
            while let Some(tcb) = cur {
                let (waiter_mask, waiter_mode, next) = {
                    let tcb_ref = unsafe { tcb.as_ref() };
                    (tcb_ref.flags_mask, tcb_ref.flags_wait, tcb_ref.pend_next_ptr)
                };

                if flags_match(self.flags, waiter_mask, waiter_mode) {
                    if consumes_on_match(waiter_mode) {
                        self.flags &= !waiter_mask;
                    }

                    unsafe {
                        self.pend_list.remove(tcb);

                        let tcb_mut = &mut *tcb.as_ptr();
                        tcb_mut.flags_mask = 0;
                        tcb_mut.flags_wait = OsFlagWaitMode::None;

                        sched::os_task_wake(tcb);
                    }

                    sched::os_sched();
                    break;
                }

                cur = next;
            }

            Ok(())
        })
    }

    /// Wait until the flag word satisfies `mask`/`mode`
    ///
    /// Returns immediately when the condition already holds (consuming
    /// the mask bits for SET modes); otherwise the calling task blocks
    /// until a post satisfies it.
    ///
    /// # Returns
    /// * `Ok(())` - Condition was met
    /// * `Err(OsError::FlagWaitInvalid)` - `mode` is `None`
    /// * `Err(OsError::PendIsr)` - Blocking call from ISR
    /// * `Err(OsError::OsNotRunning)` - Kernel not started
    /// * `Err(OsError::ObjType)` - Not an initialized flag group
    pub fn pend(&mut self, mask: OsFlags, mode: OsFlagWaitMode) -> OsResult<()> {
        if mode == OsFlagWaitMode::None {
            crate::error!("flag pend: invalid wait mode");
            return Err(OsError::FlagWaitInvalid);
        }

        if kernel::KERNEL.int_nesting() > 0 {
            crate::error!("flag pend: called from ISR");
            return Err(OsError::PendIsr);
        }

        if !kernel::KERNEL.is_running() {
            return Err(OsError::OsNotRunning);
        }

        if self.obj_type != OsObjType::Flag {
            crate::error!("flag pend: not a flag group");
            return Err(OsError::ObjType);
        }

        critical_section(|_cs| {
            let Some(cur) = (unsafe { kernel::tcb_cur_ptr() }) else {
                return Err(OsError::OsNotRunning);
            };

            let tcb = unsafe { &mut *cur.as_ptr() };
            tcb.flags_mask = mask;
            tcb.flags_wait = mode;

            if flags_match(self.flags, mask, mode) {
                if consumes_on_match(mode) {
                    self.flags &= !mask;
                }
                tcb.flags_mask = 0;
                tcb.flags_wait = OsFlagWaitMode::None;
                return Ok(());
            }

            unsafe {
                sched::os_task_block(cur, self as *const _ as *const ());
                self.pend_list.insert(cur);
            }

            sched::os_sched();

            Ok(())
        })
    }

    /// Current flag bits
    #[inline]
    pub fn flags(&self) -> OsFlags {
        self.flags
    }

    /// Group name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Default for OsFlagGroup {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Safe Wrapper ============

use core::cell::UnsafeCell;

/// `Sync` wrapper so a flag group can live in a static
pub struct FlagGroup {
    inner: UnsafeCell<OsFlagGroup>,
}

unsafe impl Sync for FlagGroup {}
unsafe impl Send for FlagGroup {}

impl FlagGroup {
    pub const fn new() -> Self {
        FlagGroup {
            inner: UnsafeCell::new(OsFlagGroup::new()),
        }
    }

    pub fn create(&self, name: &'static str, init_flags: OsFlags) {
        unsafe { (*self.inner.get()).create(name, init_flags) }
    }

    pub fn post(&self, mask: OsFlags, op: OsFlagOp) -> OsResult<()> {
        unsafe { (*self.inner.get()).post(mask, op) }
    }

    pub fn pend(&self, mask: OsFlags, mode: OsFlagWaitMode) -> OsResult<()> {
        unsafe { (*self.inner.get()).pend(mask, mode) }
    }

    #[inline]
    pub fn flags(&self) -> OsFlags {
        unsafe { (*self.inner.get()).flags() }
    }
}

impl Default for FlagGroup {
    fn default() -> Self {
        Self::new()
    }
}
