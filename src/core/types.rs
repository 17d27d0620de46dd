//! Core type definitions for CasyOS
//!
//! These types provide strong typing for kernel primitives.

/// Task priority (0 = highest priority)
pub type OsPrio = u8;

/// Tick counter type
pub type OsTick = u32;

/// Semaphore counter type
pub type OsSemCtr = u32;

/// Nesting counter
pub type OsNestingCtr = u8;

/// Stack element type (machine word)
pub type OsStkElement = u32;

/// Message payload type (one machine word per message)
pub type OsMsg = u32;

/// Event flags type
pub type OsFlags = u32;

/// Task state
///
/// A task is in at most one of the ready queues, the tick list, or a wait
/// queue; this enum is the source of truth for which.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OsTaskState {
    /// Task currently owns the CPU
    Running = 0,
    /// Task is ready to run
    Ready = 1,
    /// Task is delayed, sitting in the tick list
    Delay = 2,
    /// Task is blocked on a kernel object
    Pend = 3,
    /// Task is not registered (or not yet started)
    Stop = 4,
}

/// Kernel object type marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum OsObjType {
    None = 0,
    Sem = 0x53454D41,   // 'SEMA'
    Mutex = 0x4D555458, // 'MUTX'
    Queue = 0x51554555, // 'QUEU'
    Flag = 0x464C4147,  // 'FLAG'
}

/// Event-flag wait condition
///
/// | Mode     | Match when                  |
/// |----------|-----------------------------|
/// | `SetAll` | `(flags & mask) == mask`    |
/// | `SetAny` | `(flags & mask) != 0`       |
/// | `ClrAll` | `(flags & mask) == 0`       |
/// | `ClrAny` | `(flags & mask) != mask`    |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OsFlagWaitMode {
    /// Not waiting on any flags
    None = 0,
    /// All mask bits set
    SetAll = 1,
    /// Any mask bit set
    SetAny = 2,
    /// All mask bits clear
    ClrAll = 3,
    /// Any mask bit clear
    ClrAny = 4,
}

/// Event-flag post operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OsFlagOp {
    /// Set the mask bits
    Set = 0,
    /// Clear the mask bits
    Clr = 1,
}
