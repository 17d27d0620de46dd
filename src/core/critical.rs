//! Critical section handling for CasyOS
//!
//! Every kernel mutation happens with interrupts masked. The mask is
//! reference counted: the outermost enter saves the pre-disable PRIMASK
//! state, nested enters only bump the counter, and the outermost exit
//! restores what was saved. This lets public APIs call internal helpers
//! that enter again on their own.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Nesting depth of the critical section
static CRITICAL_NESTING: AtomicU8 = AtomicU8::new(0);

/// Interrupt state saved by the outermost enter
#[cfg_attr(not(target_arch = "arm"), allow(dead_code))]
static SAVED_PRIMASK_ACTIVE: AtomicBool = AtomicBool::new(false);

/// RAII guard for critical sections
///
/// Creating the guard disables interrupts (or bumps the nesting count);
/// dropping it restores the saved interrupt state once the last guard is
/// gone.
pub struct CriticalSection {
    _private: (),
}

impl CriticalSection {
    /// Enter a critical section by masking interrupts.
    ///
    /// Returns a guard that unwinds one nesting level when dropped.
    #[inline(always)]
    pub fn enter() -> Self {
        #[cfg(target_arch = "arm")]
        {
            let was_active = cortex_m::register::primask::read().is_active();
            cortex_m::interrupt::disable();
            if CRITICAL_NESTING.load(Ordering::Relaxed) == 0 {
                SAVED_PRIMASK_ACTIVE.store(was_active, Ordering::Relaxed);
            }
        }

        // Interrupts are masked here, so the plain load/store pair is atomic
        let nesting = CRITICAL_NESTING.load(Ordering::Relaxed);
        CRITICAL_NESTING.store(nesting.saturating_add(1), Ordering::Relaxed);

        CriticalSection { _private: () }
    }

    /// Check if we're currently inside a critical section
    #[inline(always)]
    pub fn is_active() -> bool {
        CRITICAL_NESTING.load(Ordering::Relaxed) > 0
    }

    /// Current nesting depth
    #[inline(always)]
    pub fn nesting() -> u8 {
        CRITICAL_NESTING.load(Ordering::Relaxed)
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        let nesting = CRITICAL_NESTING.load(Ordering::Relaxed);
        CRITICAL_NESTING.store(nesting.saturating_sub(1), Ordering::Relaxed);

        #[cfg(target_arch = "arm")]
        if nesting <= 1 && SAVED_PRIMASK_ACTIVE.load(Ordering::Relaxed) {
            unsafe { cortex_m::interrupt::enable() };
        }
    }
}

/// Execute a closure with interrupts masked
///
/// The closure receives a reference to the critical section guard,
/// which can be used to access [`CsCell`](crate::core::cs_cell::CsCell)
/// protected data.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}
