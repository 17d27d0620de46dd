//! Cortex-M3/M4 port implementation
//!
//! The one irreducibly architecture-specific part of the kernel: the
//! SVC-driven first switch, the PendSV context switch, the fabricated
//! exception frame that lets a fresh task start as if it were resuming,
//! and SysTick programming.

#![allow(named_asm_labels)]

use core::arch::{asm, naked_asm};

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;

use crate::kernel::CPU_STATE;
use crate::task::OsTaskFn;
use crate::types::OsStkElement;

/// Initialize the SysTick timer for system tick generation
///
/// # Arguments
/// * `reload` - Core-clock cycles per tick, e.g.
///   `CFG_CPU_FREQ_HZ / CFG_TICK_RATE_HZ`
pub fn os_cpu_systick_init(reload: u32) {
    let mut p = unsafe { cortex_m::Peripherals::steal() };

    p.SYST.set_reload(reload - 1);
    p.SYST.clear_current();
    p.SYST.set_clock_source(SystClkSource::Core);
    p.SYST.enable_interrupt();
    p.SYST.enable_counter();
}

/// Start the first task
///
/// PendSV and SysTick drop to the lowest exception priority so context
/// switches tail-chain behind every other exception, then `svc 0` enters
/// the one-time bootstrap path that restores the first task's frame.
pub unsafe fn os_start_first_task() -> ! {
    unsafe {
        let mut p = cortex_m::Peripherals::steal();

        p.SCB.set_priority(SystemHandler::PendSV, 0xF0);
        p.SCB.set_priority(SystemHandler::SysTick, 0xF0);

        cortex_m::interrupt::enable();
        asm!("svc 0", options(noreturn));
    }
}

/// Request a context switch by pending the PendSV exception
#[inline(always)]
pub fn os_ctx_sw() {
    cortex_m::peripheral::SCB::set_pendsv();
}

/// Context frame as laid out on a task stack
///
/// The lower half is the software-saved part (callee-saved registers and
/// the exception-return word); the upper half mirrors what the hardware
/// pushes automatically on exception entry.
#[repr(C, align(4))]
struct CtxFrame {
    r4: u32,
    r5: u32,
    r6: u32,
    r7: u32,
    r8: u32,
    r9: u32,
    r10: u32,
    r11: u32,
    exc_return: u32,
    r0: u32,
    r1: u32,
    r2: u32,
    r3: u32,
    r12: u32,
    lr: u32,
    pc: u32,
    xpsr: u32,
}

const CTX_FRAME_WORDS: usize = 17;

/// Fabricate the initial exception frame on a task stack
///
/// The first switch into the task then behaves exactly like a return
/// from a preemption that happened at the task's first instruction.
///
/// # Safety
/// `stk_base` must point to `stk_size` writable stack words.
pub unsafe fn os_task_stk_init(
    entry: OsTaskFn,
    stk_base: *mut OsStkElement,
    stk_size: usize,
) -> *mut OsStkElement {
    unsafe {
        // Full descending stack, 8-byte aligned top per AAPCS
        let stk_top = stk_base.add(stk_size);
        let stk_aligned = ((stk_top as usize) & !7) as *mut u32;

        let frame_ptr = stk_aligned.sub(CTX_FRAME_WORDS) as *mut CtxFrame;

        (*frame_ptr) = CtxFrame {
            r4: 0x0404_0404,
            r5: 0x0505_0505,
            r6: 0x0606_0606,
            r7: 0x0707_0707,
            r8: 0x0808_0808,
            r9: 0x0909_0909,
            r10: 0x1010_1010,
            r11: 0x1111_1111,
            exc_return: 0xFFFF_FFFD, // thread mode, PSP, basic frame
            r0: 0,
            r1: 0,
            r2: 0,
            r3: 0,
            r12: 0,
            lr: os_task_return as *const () as u32,
            pc: (entry as usize as u32) | 1,
            xpsr: 0x0100_0000, // thumb state
        };

        frame_ptr as *mut OsStkElement
    }
}

/// Pick the next task to run; returns its saved stack pointer
///
/// Called from the PendSV assembly after the outgoing context has been
/// saved into its TCB.
#[inline(never)]
#[no_mangle]
unsafe extern "C" fn pendsv_pick_next() -> *mut OsStkElement {
    unsafe { crate::sched::os_pick_high_rdy() }
}

/// SVC exception handler - one-time bootstrap into the first task
///
/// There is no outgoing context to save: restore the fabricated frame of
/// the task published in `CPU_STATE.tcb_cur` and return into it on the
/// process stack.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn SVCall() {
    naked_asm!(
        "ldr r0, ={cpu_state}",
        "ldr r0, [r0]",             // CPU_STATE.tcb_cur
        "ldr r0, [r0]",             // tcb_cur->stk_ptr (first TCB field)
        "ldmia r0!, {{r4-r11, lr}}",
        "msr psp, r0",
        "dsb",
        "isb",
        "bx lr",
        cpu_state = sym CPU_STATE,
    );
}

/// PendSV exception handler - performs the full context switch
///
/// 1. Save R4-R11 and the exception-return word onto the outgoing PSP
/// 2. Store the PSP into the outgoing TCB (offset 0)
/// 3. Ask the scheduler for the incoming task's stack pointer
/// 4. Restore R4-R11 + exception return, switch PSP, return
#[cfg(not(feature = "fpu"))]
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "cpsid i",
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11, lr}}",
        "ldr r1, ={cpu_state}",
        "ldr r1, [r1]",             // CPU_STATE.tcb_cur
        "str r0, [r1]",             // tcb_cur->stk_ptr = saved sp
        "bl pendsv_pick_next",
        "ldmia r0!, {{r4-r11, lr}}",
        "msr psp, r0",
        "dsb",
        "isb",
        "cpsie i",
        "bx lr",
        cpu_state = sym CPU_STATE,
    );
}

/// PendSV exception handler with FPU context save
///
/// Identical to the integer-only version, with S16-S31 pushed whenever
/// the outgoing/incoming frame used the FPU (EXC_RETURN bit 4 clear).
#[cfg(feature = "fpu")]
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "cpsid i",
        "mrs r0, psp",
        "tst lr, #0x10",
        "it eq",
        "vstmdbeq r0!, {{s16-s31}}",
        "stmdb r0!, {{r4-r11, lr}}",
        "ldr r1, ={cpu_state}",
        "ldr r1, [r1]",             // CPU_STATE.tcb_cur
        "str r0, [r1]",             // tcb_cur->stk_ptr = saved sp
        "bl pendsv_pick_next",
        "ldmia r0!, {{r4-r11, lr}}",
        "tst lr, #0x10",
        "it eq",
        "vldmiaeq r0!, {{s16-s31}}",
        "msr psp, r0",
        "dsb",
        "isb",
        "cpsie i",
        "bx lr",
        cpu_state = sym CPU_STATE,
    );
}

/// Landing pad for a task entry function that returns
///
/// Task entries are `fn() -> !`, so getting here means a corrupted
/// frame; park the CPU.
#[no_mangle]
fn os_task_return() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}
