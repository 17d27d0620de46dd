//! Global kernel state, initialization, and the ISR hooks
//!
//! The kernel owns one singleton per concern: [`KERNEL`] for the atomic
//! status flags, [`SCHED`] for every scheduler list plus the priority
//! bitmap and task registry, and [`CPU_STATE`] for the pointers the
//! context-switch assembly reads.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use crate::config::{CFG_IDLE_STK_SIZE, CFG_PRIO_IDLE, CFG_PRIO_MAX};
use crate::core::cs_cell::CsCell;
use crate::critical::{critical_section, CriticalSection};
use crate::error::{OsError, OsResult};
use crate::prio::PrioTable;
use crate::sched::ReadyList;
use crate::task::{OsTcb, TaskList};
use crate::time::TickList;
use crate::types::{OsNestingCtr, OsPrio, OsStkElement, OsTaskState, OsTick};

// ============ Kernel State Structures ============

/// Atomic kernel flags
pub struct KernelFlags {
    initialized: AtomicBool,
    running: AtomicBool,
    int_nesting: AtomicU8,
    tick_counter: AtomicU32,
}

impl KernelFlags {
    const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            running: AtomicBool::new(false),
            int_nesting: AtomicU8::new(0),
            tick_counter: AtomicU32::new(0),
        }
    }

    pub(crate) fn reset(&self) {
        self.initialized.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.int_nesting.store(0, Ordering::SeqCst);
        self.tick_counter.store(0, Ordering::SeqCst);
    }

    /// Check if the OS is running
    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Check if the OS is initialized
    #[inline(always)]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Get current tick count
    #[inline(always)]
    pub fn tick_get(&self) -> OsTick {
        self.tick_counter.load(Ordering::Relaxed)
    }

    /// Get interrupt nesting level
    #[inline(always)]
    pub fn int_nesting(&self) -> OsNestingCtr {
        self.int_nesting.load(Ordering::Relaxed)
    }

    /// Increment and return tick count
    #[inline(always)]
    pub(crate) fn tick_increment(&self) -> OsTick {
        self.tick_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Enter ISR: bump the nesting counter
    #[inline(always)]
    pub(crate) fn int_enter(&self) {
        if self.is_running() {
            let nesting = self.int_nesting.load(Ordering::Relaxed);
            self.int_nesting
                .store(nesting.saturating_add(1), Ordering::Relaxed);
        }
    }

    /// Decrement the ISR nesting counter, returning the new level
    #[inline(always)]
    pub(crate) fn int_nesting_dec(&self) -> OsNestingCtr {
        let nesting = self.int_nesting.load(Ordering::Relaxed);
        if nesting > 0 {
            self.int_nesting.store(nesting - 1, Ordering::Relaxed);
        }
        nesting.saturating_sub(1)
    }

    #[inline(always)]
    pub(crate) fn set_initialized(&self, val: bool) {
        self.initialized.store(val, Ordering::SeqCst);
    }

    #[inline(always)]
    pub(crate) fn set_running(&self, val: bool) {
        self.running.store(val, Ordering::SeqCst);
    }
}

/// Global kernel state instance
pub static KERNEL: KernelFlags = KernelFlags::new();

/// Scheduler state: everything the scheduling lists are made of
pub struct SchedState {
    pub(crate) prio_tbl: PrioTable,
    pub(crate) rdy_lists: [ReadyList; CFG_PRIO_MAX],
    pub(crate) tick_list: TickList,
    pub(crate) task_list: TaskList,
}

impl SchedState {
    const fn new() -> Self {
        Self {
            prio_tbl: PrioTable::new(),
            rdy_lists: [const { ReadyList::new() }; CFG_PRIO_MAX],
            tick_list: TickList::new(),
            task_list: TaskList::new(),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.prio_tbl.init();
        for list in self.rdy_lists.iter_mut() {
            list.init();
        }
        self.tick_list.init();
        self.task_list.init();
    }
}

/// Global scheduler state instance
pub(crate) static SCHED: CsCell<SchedState> = CsCell::new(SchedState::new());

/// Idle task TCB
static mut IDLE_TCB: OsTcb = OsTcb::new();

/// Idle task stack
static mut IDLE_STK: [OsStkElement; CFG_IDLE_STK_SIZE] = [0; CFG_IDLE_STK_SIZE];

// ============ CPU/Context Switch State ============

/// CPU context-switch state, read by the PendSV/SVC assembly.
///
/// `tcb_cur` must stay the first field; the handlers reach the current
/// TCB through offset 0.
#[repr(C)]
pub struct CpuState {
    /// Current running task's TCB pointer
    pub tcb_cur: *mut OsTcb,
    /// Highest-priority ready task's TCB pointer
    pub tcb_high_rdy: *mut OsTcb,
    /// Current running task's priority
    pub prio_cur: OsPrio,
    /// Highest ready priority
    pub prio_high_rdy: OsPrio,
}

impl CpuState {
    pub const fn new() -> Self {
        Self {
            tcb_cur: core::ptr::null_mut(),
            tcb_high_rdy: core::ptr::null_mut(),
            prio_cur: 0,
            prio_high_rdy: 0,
        }
    }

    pub fn reset(&mut self) {
        self.tcb_cur = core::ptr::null_mut();
        self.tcb_high_rdy = core::ptr::null_mut();
        self.prio_cur = 0;
        self.prio_high_rdy = 0;
    }
}

/// Global CPU state instance
#[no_mangle]
#[used]
pub static mut CPU_STATE: CpuState = CpuState::new();

// ============ Initialization ============

/// Internal idle task: keeps the ready set non-empty
fn os_idle_task() -> ! {
    loop {
        #[cfg(target_arch = "arm")]
        cortex_m::asm::wfi();
    }
}

/// Reset global kernel state
unsafe fn os_reset_globals() {
    KERNEL.reset();

    unsafe {
        (*(&raw mut CPU_STATE)).reset();
        (*SCHED.as_ptr()).reset();
    }
}

// ============ Public API ============

/// Initialize the kernel
///
/// Must be called before any other kernel function. Initializes the
/// priority bitmap, the ready/tick lists, the task registry, and the
/// memory pool, then registers the internal idle task.
///
/// # Returns
/// * `Ok(())` - Initialization successful
/// * `Err(OsError::OsRunning)` - OS is already running
pub fn os_init() -> OsResult<()> {
    if KERNEL.is_running() {
        return Err(OsError::OsRunning);
    }

    unsafe {
        os_reset_globals();
    }

    critical_section(|cs| {
        let sched = SCHED.get(cs);
        sched.reset();

        #[cfg(feature = "mem")]
        crate::mem::os_mem_init();

        unsafe {
            crate::task::os_register_raw(
                &raw mut IDLE_TCB,
                (&raw mut IDLE_STK).cast::<OsStkElement>(),
                CFG_IDLE_STK_SIZE,
                "Idle",
                os_idle_task,
                CFG_PRIO_IDLE,
                0,
                0,
            )?;
        }

        KERNEL.set_initialized(true);
        Ok(())
    })
}

/// Start multitasking
///
/// Selects the highest-priority registered task and performs the first
/// context switch through the SVC exception. Does not return under normal
/// operation.
///
/// # Returns
/// * `Err(OsError::OsNotInit)` - OS not initialized
/// * `Err(OsError::OsRunning)` - OS is already running
/// * `Err(OsError::OsNoAppTask)` - No application task registered
pub fn os_start() -> OsResult<()> {
    if !KERNEL.is_initialized() {
        return Err(OsError::OsNotInit);
    }

    if KERNEL.is_running() {
        return Err(OsError::OsRunning);
    }

    critical_section(|cs| {
        let sched = SCHED.get(cs);

        // The registry always holds the idle task; require one more
        if sched.task_list.len() <= 1 {
            return Err(OsError::OsNoAppTask);
        }

        let Some(high_prio) = sched.prio_tbl.get_highest() else {
            os_halt("no ready task at start");
        };

        let Some(head) = sched.rdy_lists[high_prio as usize].head() else {
            os_halt("ready bitmap and queues disagree");
        };

        unsafe {
            let cpu = &mut *(&raw mut CPU_STATE);
            cpu.prio_high_rdy = high_prio;
            cpu.prio_cur = high_prio;
            cpu.tcb_high_rdy = head.as_ptr();
            cpu.tcb_cur = head.as_ptr();

            (*head.as_ptr()).state = OsTaskState::Running;
        }

        KERNEL.set_running(true);
        Ok(())
    })?;

    crate::port::os_cpu_systick_init(
        crate::config::CFG_CPU_FREQ_HZ / crate::config::CFG_TICK_RATE_HZ,
    );

    unsafe { crate::port::os_start_first_task() }
}

/// Notify the kernel that an ISR has been entered
///
/// Pair every call with [`os_int_exit`]. While the nesting count is
/// non-zero, reschedule requests are deferred.
pub fn os_int_enter() {
    KERNEL.int_enter();
}

/// Notify the kernel that an ISR is about to exit
///
/// When the last nested ISR unwinds and the highest-ready task differs
/// from the interrupted one, a context switch is requested so it runs as
/// soon as the exception returns.
pub fn os_int_exit() {
    if !KERNEL.is_running() {
        return;
    }

    let _cs = CriticalSection::enter();

    if KERNEL.int_nesting() == 0 {
        return;
    }

    if KERNEL.int_nesting_dec() == 0 {
        unsafe {
            let Some(high_prio) = prio_table().get_highest() else {
                os_halt("no ready task");
            };

            if let Some(head) = rdy_list(high_prio).head() {
                if Some(head) != tcb_cur_ptr() {
                    set_prio_high_rdy(high_prio);
                    set_tcb_high_rdy_ptr(Some(head));
                    crate::port::os_ctx_sw();
                }
            }
        }
    }
}

/// Unrecoverable kernel-invariant damage: log and stop.
pub(crate) fn os_halt(msg: &'static str) -> ! {
    #[cfg(target_arch = "arm")]
    {
        crate::error!("kernel halt: {=str}", msg);
        loop {
            cortex_m::asm::bkpt();
        }
    }

    #[cfg(not(target_arch = "arm"))]
    panic!("kernel halt: {}", msg);
}

// ============ Internal accessors for other modules ============

/// Get mutable reference to the priority bitmap
#[inline(always)]
pub(crate) unsafe fn prio_table() -> &'static mut PrioTable {
    unsafe { &mut (*SCHED.as_ptr()).prio_tbl }
}

/// Get mutable reference to the ready list for a priority
#[inline(always)]
pub(crate) unsafe fn rdy_list(prio: OsPrio) -> &'static mut ReadyList {
    unsafe { &mut (*SCHED.as_ptr()).rdy_lists[prio as usize] }
}

/// Get mutable reference to the delta tick list
#[inline(always)]
pub(crate) unsafe fn tick_list() -> &'static mut TickList {
    unsafe { &mut (*SCHED.as_ptr()).tick_list }
}

/// Get mutable reference to the global task registry
#[inline(always)]
pub(crate) unsafe fn task_list() -> &'static mut TaskList {
    unsafe { &mut (*SCHED.as_ptr()).task_list }
}

/// Get current TCB pointer
#[inline]
pub(crate) unsafe fn tcb_cur_ptr() -> Option<NonNull<OsTcb>> {
    NonNull::new(unsafe { (*(&raw const CPU_STATE)).tcb_cur })
}

/// Set current TCB pointer
#[inline]
pub(crate) unsafe fn set_tcb_cur_ptr(tcb: Option<NonNull<OsTcb>>) {
    unsafe {
        (*(&raw mut CPU_STATE)).tcb_cur = tcb.map_or(core::ptr::null_mut(), |p| p.as_ptr());
    }
}

/// Get high-ready TCB pointer
#[inline]
pub(crate) unsafe fn tcb_high_rdy_ptr() -> Option<NonNull<OsTcb>> {
    NonNull::new(unsafe { (*(&raw const CPU_STATE)).tcb_high_rdy })
}

/// Set high-ready TCB pointer
#[inline]
pub(crate) unsafe fn set_tcb_high_rdy_ptr(tcb: Option<NonNull<OsTcb>>) {
    unsafe {
        (*(&raw mut CPU_STATE)).tcb_high_rdy = tcb.map_or(core::ptr::null_mut(), |p| p.as_ptr());
    }
}

/// Set current priority
#[inline]
pub(crate) unsafe fn set_prio_cur(prio: OsPrio) {
    unsafe { (*(&raw mut CPU_STATE)).prio_cur = prio };
}

/// Get high-ready priority
#[inline]
pub(crate) unsafe fn prio_high_rdy() -> OsPrio {
    unsafe { (*(&raw const CPU_STATE)).prio_high_rdy }
}

/// Set high-ready priority
#[inline]
pub(crate) unsafe fn set_prio_high_rdy(prio: OsPrio) {
    unsafe { (*(&raw mut CPU_STATE)).prio_high_rdy = prio };
}
