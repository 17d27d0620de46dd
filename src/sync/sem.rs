//! Semaphore implementation
//!
//! Counting semaphores with a maximum count, used both standalone and as
//! the per-task semaphore embedded in every TCB.

use core::ptr::NonNull;

use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::kernel;
use crate::sched;
use crate::sched::PendList;
use crate::task::OsTcb;
use crate::types::{OsObjType, OsSemCtr};

/// Counting semaphore
pub struct OsSem {
    /// Object type marker
    obj_type: OsObjType,
    /// Tasks waiting on this semaphore, highest priority first
    pend_list: PendList,
    /// Current count
    count: OsSemCtr,
    /// Maximum count
    count_max: OsSemCtr,
}

impl OsSem {
    /// Create a new, uninitialized semaphore
    pub const fn new() -> Self {
        OsSem {
            obj_type: OsObjType::None,
            pend_list: PendList::new(),
            count: 0,
            count_max: 0,
        }
    }

    /// Initialize the semaphore with a maximum count; the count starts
    /// at zero
    pub fn init(&mut self, count_max: OsSemCtr) {
        critical_section(|_cs| {
            self.obj_type = OsObjType::Sem;
            self.pend_list.init();
            self.count = 0;
            self.count_max = count_max;
        });
    }

    /// Check if the semaphore has been initialized
    #[inline]
    pub fn is_created(&self) -> bool {
        self.obj_type == OsObjType::Sem
    }

    /// Signal the semaphore
    ///
    /// Hands the token straight to the highest-priority waiter when one
    /// exists (the count is untouched), otherwise bumps the count.
    ///
    /// # Returns
    /// * `Ok(count)` - Count after the post
    /// * `Err(OsError::ObjType)` - Not an initialized semaphore
    /// * `Err(OsError::SemOvf)` - Count already at its maximum
    pub fn post(&mut self) -> OsResult<OsSemCtr> {
        if self.obj_type != OsObjType::Sem {
            crate::error!("sem post: not a semaphore");
            return Err(OsError::ObjType);
        }

        critical_section(|_cs| {
            if let Some(waiter) = unsafe { self.pend_list.pop_head() } {
                unsafe { sched::os_task_wake(waiter) };
                sched::os_sched();
                return Ok(self.count);
            }

            if self.count >= self.count_max {
                crate::warn!("sem post: count at maximum");
                return Err(OsError::SemOvf);
            }

            self.count += 1;
            Ok(self.count)
        })
    }

    /// Wait on the semaphore
    ///
    /// Takes a token when one is available; otherwise blocks the current
    /// task until a post hands one over.
    ///
    /// # Returns
    /// * `Ok(count)` - Count after the take
    /// * `Err(OsError::PendIsr)` - Blocking call from ISR
    /// * `Err(OsError::OsNotRunning)` - Kernel not started
    /// * `Err(OsError::ObjType)` - Not an initialized semaphore
    pub fn pend(&mut self) -> OsResult<OsSemCtr> {
        if kernel::KERNEL.int_nesting() > 0 {
            crate::error!("sem pend: called from ISR");
            return Err(OsError::PendIsr);
        }

        if !kernel::KERNEL.is_running() {
            return Err(OsError::OsNotRunning);
        }

        if self.obj_type != OsObjType::Sem {
            crate::error!("sem pend: not a semaphore");
            return Err(OsError::ObjType);
        }

        critical_section(|_cs| {
            if self.count > 0 {
                self.count -= 1;
                return Ok(self.count);
            }

            unsafe {
                if let Some(cur) = kernel::tcb_cur_ptr() {
                    sched::os_task_block(cur, self as *const _ as *const ());
                    self.pend_list.insert(cur);
                }
            }

            sched::os_sched();

            // The poster handed the token over directly
            Ok(self.count)
        })
    }

    /// Current count
    #[inline]
    pub fn count(&self) -> OsSemCtr {
        self.count
    }

    /// Maximum count
    #[inline]
    pub fn count_max(&self) -> OsSemCtr {
        self.count_max
    }
}

impl Default for OsSem {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Task semaphore ============

/// Post to a task's embedded semaphore
pub fn os_task_sem_post(task: NonNull<OsTcb>) -> OsResult<OsSemCtr> {
    let sem = unsafe { &mut (*task.as_ptr()).sem };

    if !sem.is_created() {
        crate::error!("task sem post: task has no semaphore");
        return Err(OsError::SemNotCreated);
    }

    sem.post()
}

/// Wait on the calling task's own embedded semaphore
pub fn os_task_sem_pend() -> OsResult<OsSemCtr> {
    let Some(cur) = (unsafe { kernel::tcb_cur_ptr() }) else {
        return Err(OsError::OsNotRunning);
    };

    let sem = unsafe { &mut (*cur.as_ptr()).sem };

    if !sem.is_created() {
        crate::error!("task sem pend: task has no semaphore");
        return Err(OsError::SemNotCreated);
    }

    sem.pend()
}

// ============ Safe Wrapper ============

use core::cell::UnsafeCell;

/// `Sync` wrapper so a semaphore can live in a static
pub struct Semaphore {
    inner: UnsafeCell<OsSem>,
}

unsafe impl Sync for Semaphore {}
unsafe impl Send for Semaphore {}

impl Semaphore {
    pub const fn new() -> Self {
        Semaphore {
            inner: UnsafeCell::new(OsSem::new()),
        }
    }

    pub fn create(&self, count_max: OsSemCtr) {
        unsafe { (*self.inner.get()).init(count_max) }
    }

    pub fn post(&self) -> OsResult<OsSemCtr> {
        unsafe { (*self.inner.get()).post() }
    }

    pub fn pend(&self) -> OsResult<OsSemCtr> {
        unsafe { (*self.inner.get()).pend() }
    }

    #[inline]
    pub fn count(&self) -> OsSemCtr {
        unsafe { (*self.inner.get()).count() }
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}
