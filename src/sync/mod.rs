//! Synchronization primitives
//!
//! Semaphores, per-task message queues, recursive mutexes, and event
//! flags. Every object starts with a type tag and a priority-ordered
//! wait queue.

#[cfg(feature = "sem")]
pub mod sem;

#[cfg(feature = "queue")]
pub mod queue;

#[cfg(feature = "mutex")]
pub mod mutex;

#[cfg(feature = "flag")]
pub mod flag;
