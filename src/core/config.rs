//! Compile-time configuration for CasyOS
//!
//! These constants control the behavior and resource limits of the kernel.
//! Component trimming (memory/semaphore/queue/mutex/flag, task lookup,
//! FPU context save) is done through cargo features.

/// Maximum number of priority levels (0..CFG_PRIO_MAX-1, smaller = higher).
/// Limited to 32 by the single-word priority bitmap.
pub const CFG_PRIO_MAX: usize = 32;

/// System tick rate in Hz
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// CPU core clock in Hz, used to derive the SysTick reload value
pub const CFG_CPU_FREQ_HZ: u32 = 72_000_000;

/// Minimum task stack size in words; must cover the initial exception
/// frame plus headroom
pub const CFG_STK_SIZE_MIN: usize = 64;

/// Idle task priority (lowest level, reserved by the kernel)
pub const CFG_PRIO_IDLE: u8 = (CFG_PRIO_MAX - 1) as u8;

/// Idle task stack size in words
pub const CFG_IDLE_STK_SIZE: usize = 128;

/// Size of the kernel memory pool in bytes
#[cfg(feature = "mem")]
pub const CFG_MEM_POOL_SIZE: usize = 20 * 1024;

/// Allocation alignment in bytes; must be a power of two
#[cfg(feature = "mem")]
pub const CFG_MEM_ALIGN: usize = 8;
