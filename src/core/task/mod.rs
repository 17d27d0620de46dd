//! Task management module
//!
//! Registration carves out the initial exception frame, wires the TCB
//! into the global registry and the ready queues, and initializes the
//! embedded synchronization objects. There is no task deletion: a TCB
//! lives from registration to the end of the process.

mod tcb;

pub use tcb::OsTcb;

use core::ptr::NonNull;

use crate::config::{CFG_PRIO_MAX, CFG_STK_SIZE_MIN};
use crate::critical::critical_section;
use crate::error::{OsError, OsResult};
use crate::kernel;
use crate::types::{OsPrio, OsSemCtr, OsStkElement, OsTaskState};

/// Task entry point function type: no arguments, never returns
pub type OsTaskFn = fn() -> !;

// ============ Global task registry ============

/// Global task list: a singly linked list of every registered task.
///
/// Not involved in scheduling; used for lookup by handle, name, or entry
/// address, and for debug statistics.
pub struct TaskList {
    head: Option<NonNull<OsTcb>>,
}

impl TaskList {
    pub const fn new() -> Self {
        TaskList { head: None }
    }

    pub fn init(&mut self) {
        self.head = None;
    }

    /// Number of registered tasks
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut cur = self.head;
        while let Some(tcb) = cur {
            count += 1;
            cur = unsafe { tcb.as_ref() }.next_ptr;
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Append a task at the end of the registry
    ///
    /// # Safety
    /// `tcb` must be valid and not already registered.
    pub unsafe fn push(&mut self, tcb: NonNull<OsTcb>) {
        unsafe { (*tcb.as_ptr()).next_ptr = None };

        match self.head {
            None => self.head = Some(tcb),
            Some(head) => {
                let mut cur = head;
                while let Some(next) = unsafe { cur.as_ref() }.next_ptr {
                    cur = next;
                }
                unsafe { (*cur.as_ptr()).next_ptr = Some(tcb) };
            }
        }
    }

    /// Look up a task by name, ignoring ASCII case
    #[cfg(feature = "task-name")]
    pub fn find_by_name(&self, name: &str) -> Option<NonNull<OsTcb>> {
        let mut cur = self.head;
        while let Some(tcb) = cur {
            let tcb_ref = unsafe { tcb.as_ref() };
            if tcb_ref.name.eq_ignore_ascii_case(name) {
                return Some(tcb);
            }
            cur = tcb_ref.next_ptr;
        }
        None
    }

    /// Look up a task by its entry function address
    #[cfg(feature = "task-func")]
    pub fn find_by_entry(&self, entry: OsTaskFn) -> Option<NonNull<OsTcb>> {
        let mut cur = self.head;
        while let Some(tcb) = cur {
            let tcb_ref = unsafe { tcb.as_ref() };
            if tcb_ref.entry == Some(entry) {
                return Some(tcb);
            }
            cur = tcb_ref.next_ptr;
        }
        None
    }
}

impl Default for TaskList {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for TaskList {}
unsafe impl Sync for TaskList {}

// ============ Registration ============

/// Register a new task
///
/// The caller owns the TCB and the stack; the kernel only owns the links
/// between tasks. The task becomes ready immediately but will not run
/// before [`os_start`](crate::kernel::os_start).
///
/// # Arguments
/// * `tcb` - Task Control Block storage
/// * `stack` - Stack area, sized in machine words
/// * `name` - Task name for lookup and debugging
/// * `entry` - Task entry point; runs an infinite loop
/// * `prio` - Task priority (0 = highest)
/// * `sem_max` - Maximum count of the embedded semaphore; 0 = none
/// * `q_size` - Capacity in messages of the embedded queue; 0 = none
///
/// # Example
/// ```ignore
/// static mut TASK_TCB: OsTcb = OsTcb::new();
/// static mut TASK_STK: [OsStkElement; 256] = [0; 256];
///
/// fn my_task() -> ! {
///     loop { /* ... */ }
/// }
///
/// // In main, after os_init():
/// os_register(
///     unsafe { &mut *(&raw mut TASK_TCB) },
///     unsafe { &mut *(&raw mut TASK_STK) },
///     "MyTask",
///     my_task,
///     5,
///     0,
///     0,
/// ).expect("task registration failed");
/// ```
pub fn os_register(
    tcb: &'static mut OsTcb,
    stack: &'static mut [OsStkElement],
    name: &'static str,
    entry: OsTaskFn,
    prio: OsPrio,
    sem_max: OsSemCtr,
    q_size: u32,
) -> OsResult<()> {
    unsafe {
        os_register_raw(
            tcb as *mut OsTcb,
            stack.as_mut_ptr(),
            stack.len(),
            name,
            entry,
            prio,
            sem_max,
            q_size,
        )
    }
}

/// Raw registration path, shared with the kernel-internal idle task
///
/// # Safety
/// `tcb` and `stk_base` must point to storage that outlives the kernel.
pub(crate) unsafe fn os_register_raw(
    tcb: *mut OsTcb,
    stk_base: *mut OsStkElement,
    stk_size: usize,
    name: &'static str,
    entry: OsTaskFn,
    prio: OsPrio,
    sem_max: OsSemCtr,
    q_size: u32,
) -> OsResult<()> {
    if tcb.is_null() {
        crate::error!("register: null TCB");
        return Err(OsError::TaskInvalid);
    }

    if stk_base.is_null() {
        crate::error!("register: null stack");
        return Err(OsError::StkInvalid);
    }

    if stk_size < CFG_STK_SIZE_MIN {
        crate::error!("register: stack too small for the initial frame");
        return Err(OsError::StkSizeInvalid);
    }

    if prio as usize >= CFG_PRIO_MAX {
        crate::error!("register: priority out of range");
        return Err(OsError::PrioInvalid);
    }

    if kernel::KERNEL.int_nesting() > 0 {
        crate::error!("register: called from ISR");
        return Err(OsError::RegisterIsr);
    }

    // All tasks are registered before start; no dynamic creation after
    if kernel::KERNEL.is_running() {
        crate::error!("register: kernel already running");
        return Err(OsError::OsRunning);
    }

    critical_section(|_cs| {
        let tcb_ref = unsafe { &mut *tcb };
        tcb_ref.init();

        tcb_ref.name = name;
        tcb_ref.prio = prio;
        tcb_ref.entry = Some(entry);

        // Fabricate the initial exception frame so the first switch
        // resumes as if returning from an exception into `entry`
        tcb_ref.stk_ptr = unsafe { crate::port::os_task_stk_init(entry, stk_base, stk_size) };
        tcb_ref.stk_base = stk_base;
        tcb_ref.stk_size = stk_size;

        #[cfg(feature = "sem")]
        if sem_max > 0 {
            tcb_ref.sem.init(sem_max);
        }
        #[cfg(not(feature = "sem"))]
        let _ = sem_max;

        #[cfg(feature = "queue")]
        if q_size > 0 {
            tcb_ref.msg_queue.create(q_size)?;
        }
        #[cfg(not(feature = "queue"))]
        let _ = q_size;

        tcb_ref.state = OsTaskState::Ready;

        let tcb_nonnull = unsafe { NonNull::new_unchecked(tcb) };
        unsafe {
            kernel::task_list().push(tcb_nonnull);
            crate::sched::os_rdy_task_add(tcb_nonnull);
        }

        Ok(())
    })
}

// ============ Lookup ============

/// Task lookup key for [`os_task_find`]
pub enum OsTaskId {
    /// Direct TCB handle (identity lookup)
    Tcb(NonNull<OsTcb>),
    /// By task name, ignoring ASCII case
    #[cfg(feature = "task-name")]
    Name(&'static str),
    /// By entry function address
    #[cfg(feature = "task-func")]
    Func(OsTaskFn),
}

/// Find a registered task
///
/// Returns the TCB handle, or `None` (with a logged warning) when no
/// registered task matches.
pub fn os_task_find(id: OsTaskId) -> Option<NonNull<OsTcb>> {
    critical_section(|_cs| {
        let found = match id {
            OsTaskId::Tcb(tcb) => Some(tcb),
            #[cfg(feature = "task-name")]
            OsTaskId::Name(name) => unsafe { kernel::task_list() }.find_by_name(name),
            #[cfg(feature = "task-func")]
            OsTaskId::Func(entry) => unsafe { kernel::task_list() }.find_by_entry(entry),
        };

        if found.is_none() {
            crate::warn!("task registry: cannot find task");
        }
        found
    })
}
