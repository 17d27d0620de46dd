//! Error types for CasyOS
//!
//! Uses Rust's Result pattern instead of C-style diagnostics-and-return.
//! The numeric codes group by subsystem so a bare code in a log line can
//! be placed without the enum at hand.

/// Kernel error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OsError {
    /// No error
    None = 0,

    // ============ ISR errors ============
    /// Cannot register a task from ISR
    RegisterIsr = 10001,
    /// Cannot pend on an object from ISR
    PendIsr = 10002,
    /// Cannot delay from ISR
    DelayIsr = 10003,

    // ============ Memory errors ============
    /// Memory allocation failed
    MemAllocFail = 22201,

    // ============ Mutex errors ============
    /// Caller is not the mutex owner
    MutexNotOwner = 22401,
    /// Recursion counter overflow
    MutexOvf = 22404,

    // ============ Object errors ============
    /// Wrong object type tag
    ObjType = 24004,

    // ============ OS state errors ============
    /// OS is not running
    OsNotRunning = 24201,
    /// OS is already running
    OsRunning = 24202,
    /// OS not initialized
    OsNotInit = 24203,
    /// No application task registered
    OsNoAppTask = 24204,

    // ============ Priority errors ============
    /// Invalid priority
    PrioInvalid = 25203,

    // ============ Queue errors ============
    /// Queue is full
    QFull = 26001,
    /// Task has no message queue
    QNotCreated = 26005,

    // ============ Semaphore errors ============
    /// Semaphore count already at maximum
    SemOvf = 28101,
    /// Task has no embedded semaphore
    SemNotCreated = 28102,

    // ============ Stack errors ============
    /// Invalid stack pointer
    StkInvalid = 28207,
    /// Invalid stack size
    StkSizeInvalid = 28208,

    // ============ Flag errors ============
    /// Invalid flag wait mode
    FlagWaitInvalid = 28301,

    // ============ Task errors ============
    /// Invalid task handle
    TaskInvalid = 29007,
}

/// Result type alias for kernel operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == OsError::None
    }

    #[inline]
    pub fn is_err(self) -> bool {
        self != OsError::None
    }

    /// Numeric code, as reported in diagnostics
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }
}
