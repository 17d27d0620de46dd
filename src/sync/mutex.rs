//! Mutex implementation
//!
//! Recursive mutual exclusion: the owning task may re-acquire any number
//! of times, each matched by a release. There is no priority inheritance;
//! a low-priority owner blocking a high-priority waiter is not boosted,
//! so callers should avoid sharing a mutex across widely separated
//! priorities or layer a ceiling protocol on top.

use core::ptr::NonNull;

use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::kernel;
use crate::sched;
use crate::sched::PendList;
use crate::task::OsTcb;
use crate::types::OsObjType;

/// Recursive mutex
pub struct OsMutex {
    /// Object type marker
    obj_type: OsObjType,
    /// Tasks waiting for ownership, highest priority first
    pend_list: PendList,
    /// Mutex name for debugging
    name: &'static str,
    /// Task currently holding the mutex
    owner: Option<NonNull<OsTcb>>,
    /// Recursion depth of the owner
    lock_cnt: u32,
}

impl OsMutex {
    /// Create a new, uninitialized mutex
    pub const fn new() -> Self {
        OsMutex {
            obj_type: OsObjType::None,
            pend_list: PendList::new(),
            name: "",
            owner: None,
            lock_cnt: 0,
        }
    }

    /// Initialize the mutex
    pub fn create(&mut self, name: &'static str) {
        critical_section(|_cs| {
            self.obj_type = OsObjType::Mutex;
            self.pend_list.init();
            self.name = name;
            self.owner = None;
            self.lock_cnt = 0;
        });
    }

    /// Acquire the mutex
    ///
    /// Unowned: the caller becomes the owner. Owned by the caller: the
    /// recursion count grows. Owned by someone else: the caller blocks in
    /// priority order until ownership is handed over.
    ///
    /// # Returns
    /// * `Ok(())` - Mutex held by the caller
    /// * `Err(OsError::PendIsr)` - Blocking call from ISR
    /// * `Err(OsError::OsNotRunning)` - Kernel not started
    /// * `Err(OsError::ObjType)` - Not an initialized mutex
    /// * `Err(OsError::MutexOvf)` - Recursion counter overflow
    pub fn pend(&mut self) -> OsResult<()> {
        if kernel::KERNEL.int_nesting() > 0 {
            crate::error!("mutex pend: called from ISR");
            return Err(OsError::PendIsr);
        }

        if !kernel::KERNEL.is_running() {
            return Err(OsError::OsNotRunning);
        }

        if self.obj_type != OsObjType::Mutex {
            crate::error!("mutex pend: not a mutex");
            return Err(OsError::ObjType);
        }

        critical_section(|_cs| {
            let Some(cur) = (unsafe { kernel::tcb_cur_ptr() }) else {
                return Err(OsError::OsNotRunning);
            };

            if self.owner.is_none() {
                self.owner = Some(cur);
                self.lock_cnt = 1;
                return Ok(());
            }

            // Recursive acquisition by the owner
            if self.owner == Some(cur) {
                if self.lock_cnt == u32::MAX {
                    crate::error!("mutex pend: recursion overflow");
                    return Err(OsError::MutexOvf);
                }
                self.lock_cnt += 1;
                return Ok(());
            }

            unsafe {
                sched::os_task_block(cur, self as *const _ as *const ());
                self.pend_list.insert(cur);
            }

            sched::os_sched();

            // Woken by the releasing owner, which already made us owner
            Ok(())
        })
    }

    /// Release the mutex
    ///
    /// Must be called by the owner; a post by anyone else (or while
    /// unowned) is a programming error, logged and rejected with the
    /// mutex untouched. When the recursion count reaches zero the
    /// highest-priority waiter takes over, or the mutex becomes free.
    ///
    /// # Returns
    /// * `Ok(())` - One level released
    /// * `Err(OsError::ObjType)` - Not an initialized mutex
    /// * `Err(OsError::MutexNotOwner)` - Caller does not hold the mutex
    pub fn post(&mut self) -> OsResult<()> {
        if self.obj_type != OsObjType::Mutex {
            crate::error!("mutex post: not a mutex");
            return Err(OsError::ObjType);
        }

        critical_section(|_cs| {
            let cur = unsafe { kernel::tcb_cur_ptr() };

            if self.owner.is_none() || self.owner != cur {
                crate::error!("mutex post: caller is not the owner");
                return Err(OsError::MutexNotOwner);
            }

            if self.lock_cnt > 1 {
                self.lock_cnt -= 1;
                return Ok(());
            }

            self.lock_cnt = 0;

            if let Some(waiter) = unsafe { self.pend_list.pop_head() } {
                // Hand ownership straight to the best waiter
                self.owner = Some(waiter);
                self.lock_cnt = 1;

                unsafe { sched::os_task_wake(waiter) };
                sched::os_sched();
            } else {
                self.owner = None;
            }

            Ok(())
        })
    }

    /// Check if the mutex is held
    #[inline]
    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }

    /// Current recursion depth
    #[inline]
    pub fn lock_count(&self) -> u32 {
        self.lock_cnt
    }

    /// Mutex name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Default for OsMutex {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Safe Wrapper ============

use core::cell::UnsafeCell;

/// `Sync` wrapper so a mutex can live in a static
pub struct Mutex {
    inner: UnsafeCell<OsMutex>,
}

unsafe impl Sync for Mutex {}
unsafe impl Send for Mutex {}

impl Mutex {
    pub const fn new() -> Self {
        Mutex {
            inner: UnsafeCell::new(OsMutex::new()),
        }
    }

    pub fn create(&self, name: &'static str) {
        unsafe { (*self.inner.get()).create(name) }
    }

    pub fn pend(&self) -> OsResult<()> {
        unsafe { (*self.inner.get()).pend() }
    }

    pub fn post(&self) -> OsResult<()> {
        unsafe { (*self.inner.get()).post() }
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        unsafe { (*self.inner.get()).is_owned() }
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}
