//! Message queue implementation
//!
//! Bounded FIFO of machine-word messages, embedded in every TCB. The
//! ring buffer is carved out of the kernel memory pool at registration;
//! producers address the owning task, and only the owner ever pends on
//! its queue. A full queue drops the message: there is no blocking
//! producer.

use core::ptr::{self, NonNull};

use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::kernel;
use crate::sched;
use crate::sched::PendList;
use crate::task::OsTcb;
use crate::types::{OsMsg, OsObjType, OsTaskState};

/// Per-task message queue
pub struct OsQueue {
    /// Object type marker
    obj_type: OsObjType,
    /// Wait queue; holds at most the owning task
    pend_list: PendList,
    /// Externally allocated ring buffer
    msg_base: *mut OsMsg,
    /// Capacity in messages
    count_max: u32,
    /// Messages currently queued
    count: u32,
    /// Write index
    in_idx: u32,
    /// Read index
    out_idx: u32,
}

impl OsQueue {
    /// Create a new, uninitialized queue
    pub const fn new() -> Self {
        OsQueue {
            obj_type: OsObjType::None,
            pend_list: PendList::new(),
            msg_base: ptr::null_mut(),
            count_max: 0,
            count: 0,
            in_idx: 0,
            out_idx: 0,
        }
    }

    /// Initialize over an externally allocated ring buffer
    ///
    /// # Safety
    /// `msg_base` must point to `count_max` writable `OsMsg` slots that
    /// outlive the queue.
    pub unsafe fn init_with(&mut self, msg_base: NonNull<OsMsg>, count_max: u32) {
        self.obj_type = OsObjType::Queue;
        self.pend_list.init();
        self.msg_base = msg_base.as_ptr();
        self.count_max = count_max;
        self.count = 0;
        self.in_idx = 0;
        self.out_idx = 0;
    }

    /// Initialize with a buffer from the kernel memory pool
    pub(crate) fn create(&mut self, count_max: u32) -> OsResult<()> {
        let bytes = count_max as usize * core::mem::size_of::<OsMsg>();

        let Some(buf) = crate::mem::os_malloc(bytes) else {
            crate::error!("queue create: buffer allocation failed");
            return Err(OsError::MemAllocFail);
        };

        unsafe { self.init_with(buf.cast::<OsMsg>(), count_max) };
        Ok(())
    }

    /// Check if the queue has been initialized
    #[inline]
    pub fn is_created(&self) -> bool {
        self.obj_type == OsObjType::Queue
    }

    /// Append a message; `false` when the queue is full.
    ///
    /// Callers hold the critical section.
    pub fn try_write(&mut self, msg: OsMsg) -> bool {
        if self.count >= self.count_max {
            return false;
        }

        unsafe { self.msg_base.add(self.in_idx as usize).write(msg) };
        self.in_idx = (self.in_idx + 1) % self.count_max;
        self.count += 1;
        true
    }

    /// Take the oldest message; `None` when the queue is empty.
    ///
    /// Callers hold the critical section.
    pub fn try_read(&mut self) -> Option<OsMsg> {
        if self.count == 0 {
            return None;
        }

        let msg = unsafe { self.msg_base.add(self.out_idx as usize).read() };
        self.out_idx = (self.out_idx + 1) % self.count_max;
        self.count -= 1;
        Some(msg)
    }

    /// Discard every queued message
    pub fn flush(&mut self) {
        self.count = 0;
        self.in_idx = 0;
        self.out_idx = 0;
    }

    /// Messages currently queued
    #[inline]
    pub fn len(&self) -> u32 {
        self.count
    }

    /// Capacity in messages
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.count_max
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count >= self.count_max
    }
}

impl Default for OsQueue {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for OsQueue {}
unsafe impl Sync for OsQueue {}

// ============ Kernel API ============

/// Post a message to a task's queue
///
/// Never blocks. When the queue is full the message is dropped and the
/// caller is told; when the owning task is blocked on its queue, the
/// message is deposited with it and it is woken.
///
/// # Returns
/// * `Ok(())` - Message queued (or handed to the waiting owner)
/// * `Err(OsError::QNotCreated)` - Task has no queue
/// * `Err(OsError::QFull)` - Queue full, message dropped
pub fn os_q_post(task: NonNull<OsTcb>, msg: OsMsg) -> OsResult<()> {
    critical_section(|_cs| {
        let tcb = unsafe { &mut *task.as_ptr() };

        if !tcb.msg_queue.is_created() {
            crate::error!("queue post: task has no queue");
            return Err(OsError::QNotCreated);
        }

        if !tcb.msg_queue.try_write(msg) {
            crate::warn!("queue post: queue full, message dropped");
            return Err(OsError::QFull);
        }

        let q_addr = &tcb.msg_queue as *const OsQueue as *const ();
        if tcb.state == OsTaskState::Pend && tcb.pend_obj == q_addr {
            // The owner is blocked on this queue: hand it the head
            // message (the one just written) and wake it
            if let Some(deposit) = tcb.msg_queue.try_read() {
                tcb.msg_temp = deposit;
                unsafe {
                    tcb.msg_queue.pend_list.remove(task);
                    sched::os_task_wake(task);
                }
                sched::os_sched();
            }
        }

        Ok(())
    })
}

/// Block until a message arrives in the calling task's own queue
///
/// # Returns
/// * `Ok(msg)` - Oldest message, or the one deposited while blocked
/// * `Err(OsError::PendIsr)` - Blocking call from ISR
/// * `Err(OsError::OsNotRunning)` - Kernel not started
/// * `Err(OsError::QNotCreated)` - Task has no queue
pub fn os_q_pend() -> OsResult<OsMsg> {
    if kernel::KERNEL.int_nesting() > 0 {
        crate::error!("queue pend: called from ISR");
        return Err(OsError::PendIsr);
    }

    if !kernel::KERNEL.is_running() {
        return Err(OsError::OsNotRunning);
    }

    critical_section(|_cs| {
        let Some(cur) = (unsafe { kernel::tcb_cur_ptr() }) else {
            return Err(OsError::OsNotRunning);
        };

        let tcb = unsafe { &mut *cur.as_ptr() };

        if !tcb.msg_queue.is_created() {
            crate::error!("queue pend: task has no queue");
            return Err(OsError::QNotCreated);
        }

        if let Some(msg) = tcb.msg_queue.try_read() {
            return Ok(msg);
        }

        unsafe {
            sched::os_task_block(cur, &tcb.msg_queue as *const OsQueue as *const ());
            tcb.msg_queue.pend_list.insert(cur);
        }

        sched::os_sched();

        // Deposited by the poster that woke us
        Ok(tcb.msg_temp)
    })
}

/// Discard every message queued for a task
pub fn os_q_flush(task: NonNull<OsTcb>) -> OsResult<()> {
    critical_section(|_cs| {
        let tcb = unsafe { &mut *task.as_ptr() };

        if !tcb.msg_queue.is_created() {
            crate::error!("queue flush: task has no queue");
            return Err(OsError::QNotCreated);
        }

        tcb.msg_queue.flush();
        Ok(())
    })
}

/// Number of messages queued for a task
pub fn os_q_get_count(task: NonNull<OsTcb>) -> u32 {
    critical_section(|_cs| unsafe { (*task.as_ptr()).msg_queue.len() })
}

/// Check if a task's queue is empty
pub fn os_q_is_empty(task: NonNull<OsTcb>) -> bool {
    critical_section(|_cs| unsafe { (*task.as_ptr()).msg_queue.is_empty() })
}

/// Check if a task's queue is full
pub fn os_q_is_full(task: NonNull<OsTcb>) -> bool {
    critical_section(|_cs| unsafe { (*task.as_ptr()).msg_queue.is_full() })
}
