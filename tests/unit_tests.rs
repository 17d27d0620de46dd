//! Unit tests for the kernel components
//!
//! These run on the host (not the embedded target). They exercise the
//! pieces that do not need a live context switch: the priority bitmap,
//! the scheduling lists, the delta tick list, the allocator, the queue
//! ring, the flag matching rules, and the registration bookkeeping.

use core::ptr::NonNull;

use casyos::task::OsTcb;

/// Stable-address TCB for list tests
fn leak_tcb(prio: u8) -> NonNull<OsTcb> {
    let tcb = Box::leak(Box::new(OsTcb::new()));
    tcb.prio = prio;
    NonNull::from(tcb)
}

mod prio_tests {
    use casyos::prio::PrioTable;

    #[test]
    fn test_empty_table() {
        let table = PrioTable::new();
        assert!(table.is_empty());
        assert_eq!(table.get_highest(), None);
    }

    #[test]
    fn test_single_priority() {
        let mut table = PrioTable::new();

        table.insert(5);
        assert!(!table.is_empty());
        assert!(table.is_set(5));
        assert!(!table.is_set(4));
        assert_eq!(table.get_highest(), Some(5));

        table.remove(5);
        assert!(table.is_empty());
    }

    #[test]
    fn test_multiple_priorities() {
        let mut table = PrioTable::new();

        // Insert in random order
        table.insert(20);
        table.insert(5);
        table.insert(10);
        table.insert(0);
        table.insert(15);

        // Highest (lowest number) should be 0
        assert_eq!(table.get_highest(), Some(0));

        // Remove in order
        table.remove(0);
        assert_eq!(table.get_highest(), Some(5));

        table.remove(5);
        assert_eq!(table.get_highest(), Some(10));

        table.remove(10);
        assert_eq!(table.get_highest(), Some(15));

        table.remove(15);
        assert_eq!(table.get_highest(), Some(20));

        table.remove(20);
        assert!(table.is_empty());
    }

    #[test]
    fn test_all_priorities() {
        let mut table = PrioTable::new();

        for i in 0..32u8 {
            table.insert(i);
        }

        for i in 0..32u8 {
            assert_eq!(table.get_highest(), Some(i));
            table.remove(i);
        }

        assert!(table.is_empty());
    }

    #[test]
    fn test_out_of_range_ignored() {
        let mut table = PrioTable::new();

        table.insert(32);
        table.insert(255);
        assert!(table.is_empty());

        table.insert(3);
        table.remove(32);
        assert_eq!(table.get_highest(), Some(3));
    }
}

mod rdy_list_tests {
    use super::leak_tcb;
    use casyos::sched::ReadyList;

    #[test]
    fn test_fifo_order() {
        let mut list = ReadyList::new();
        let t1 = leak_tcb(4);
        let t2 = leak_tcb(4);
        let t3 = leak_tcb(4);

        unsafe {
            list.insert_tail(t1);
            list.insert_tail(t2);
            list.insert_tail(t3);
        }

        assert_eq!(list.head(), Some(t1));
        assert_eq!(list.tail(), Some(t3));

        unsafe { list.remove(t1) };
        assert_eq!(list.head(), Some(t2));

        unsafe { list.remove(t2) };
        unsafe { list.remove(t3) };
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_from_middle_and_tail() {
        let mut list = ReadyList::new();
        let t1 = leak_tcb(7);
        let t2 = leak_tcb(7);
        let t3 = leak_tcb(7);

        unsafe {
            list.insert_tail(t1);
            list.insert_tail(t2);
            list.insert_tail(t3);

            list.remove(t2);
        }
        assert_eq!(list.head(), Some(t1));
        assert_eq!(list.tail(), Some(t3));
        assert_eq!(unsafe { t1.as_ref() }.rdy_next_ptr, Some(t3));

        unsafe { list.remove(t3) };
        assert_eq!(list.head(), Some(t1));
        assert_eq!(list.tail(), Some(t1));
    }

    #[test]
    fn test_link_fields_cleared() {
        let mut list = ReadyList::new();
        let t1 = leak_tcb(1);
        let t2 = leak_tcb(1);

        unsafe {
            list.insert_tail(t1);
            list.insert_tail(t2);
            list.remove(t1);
        }

        let t1_ref = unsafe { t1.as_ref() };
        assert_eq!(t1_ref.rdy_next_ptr, None);
        assert_eq!(t1_ref.rdy_prev_ptr, None);
    }
}

mod pend_list_tests {
    use super::leak_tcb;
    use casyos::sched::PendList;
    use casyos::task::OsTcb;
    use core::ptr::NonNull;

    fn order(list: &PendList) -> Vec<NonNull<OsTcb>> {
        let mut v = Vec::new();
        let mut cur = list.head();
        while let Some(tcb) = cur {
            v.push(tcb);
            cur = unsafe { tcb.as_ref() }.pend_next_ptr;
        }
        v
    }

    #[test]
    fn test_priority_order() {
        let mut list = PendList::new();
        let t_low = leak_tcb(9);
        let t_high = leak_tcb(2);
        let t_mid = leak_tcb(5);

        unsafe {
            list.insert(t_low);
            list.insert(t_high);
            list.insert(t_mid);
        }

        assert_eq!(order(&list), vec![t_high, t_mid, t_low]);
        assert_eq!(list.head(), Some(t_high));
    }

    #[test]
    fn test_fifo_within_priority() {
        let mut list = PendList::new();
        let a = leak_tcb(5);
        let b = leak_tcb(5);
        let c = leak_tcb(5);
        let front = leak_tcb(1);

        unsafe {
            list.insert(a);
            list.insert(b);
            list.insert(front);
            list.insert(c);
        }

        // Equal priorities keep arrival order behind the higher one
        assert_eq!(order(&list), vec![front, a, b, c]);
    }

    #[test]
    fn test_pop_head_release_order() {
        let mut list = PendList::new();
        let a = leak_tcb(6);
        let b = leak_tcb(6);
        let c = leak_tcb(6);

        unsafe {
            list.insert(a);
            list.insert(b);
            list.insert(c);
        }

        // Same-priority waiters are released in arrival order
        assert_eq!(unsafe { list.pop_head() }, Some(a));
        assert_eq!(unsafe { list.pop_head() }, Some(b));
        assert_eq!(unsafe { list.pop_head() }, Some(c));
        assert_eq!(unsafe { list.pop_head() }, None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_middle() {
        let mut list = PendList::new();
        let a = leak_tcb(1);
        let b = leak_tcb(4);
        let c = leak_tcb(8);

        unsafe {
            list.insert(c);
            list.insert(a);
            list.insert(b);

            list.remove(b);
        }

        assert_eq!(order(&list), vec![a, c]);

        let b_ref = unsafe { b.as_ref() };
        assert_eq!(b_ref.pend_next_ptr, None);
        assert_eq!(b_ref.pend_prev_ptr, None);
    }

    #[test]
    fn test_pop_all_drains_by_priority() {
        let mut list = PendList::new();
        let a = leak_tcb(3);
        let b = leak_tcb(1);
        let c = leak_tcb(7);

        unsafe {
            list.insert(a);
            list.insert(b);
            list.insert(c);
        }

        let mut drained = Vec::new();
        unsafe { list.pop_all(|tcb| drained.push(tcb)) };

        assert_eq!(drained, vec![b, a, c]);
        assert!(list.is_empty());
    }
}

mod tick_list_tests {
    use super::leak_tcb;
    use casyos::task::OsTcb;
    use casyos::time::TickList;
    use core::ptr::NonNull;

    /// (priority-as-id, delta) pairs from head to tail
    fn deltas(list: &TickList) -> Vec<(u8, u32)> {
        let mut v = Vec::new();
        let mut cur = list.head();
        while let Some(tcb) = cur {
            let tcb_ref = unsafe { tcb.as_ref() };
            v.push((tcb_ref.prio, tcb_ref.tick));
            cur = tcb_ref.tick_next_ptr;
        }
        v
    }

    fn advance_n(list: &mut TickList, n: u32, woken: &mut Vec<NonNull<OsTcb>>) {
        for _ in 0..n {
            unsafe { list.advance(|tcb| woken.push(tcb)) };
        }
    }

    #[test]
    fn test_delta_storage() {
        let mut list = TickList::new();
        let t1 = leak_tcb(1);
        let t2 = leak_tcb(2);
        let t3 = leak_tcb(3);

        // delay(50), delay(20), delay(35) at the same tick
        unsafe {
            list.insert(t1, 50);
            list.insert(t2, 20);
            list.insert(t3, 35);
        }

        assert_eq!(deltas(&list), vec![(2, 20), (3, 15), (1, 15)]);
    }

    #[test]
    fn test_staged_expiry() {
        let mut list = TickList::new();
        let t1 = leak_tcb(1);
        let t2 = leak_tcb(2);
        let t3 = leak_tcb(3);

        unsafe {
            list.insert(t1, 50);
            list.insert(t2, 20);
            list.insert(t3, 35);
        }

        let mut woken = Vec::new();

        // After 20 ticks the second task wakes
        advance_n(&mut list, 20, &mut woken);
        assert_eq!(woken, vec![t2]);

        // After 15 more the third
        advance_n(&mut list, 15, &mut woken);
        assert_eq!(woken, vec![t2, t3]);

        // After 15 more the first
        advance_n(&mut list, 15, &mut woken);
        assert_eq!(woken, vec![t2, t3, t1]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_same_tick_expiry_in_list_order() {
        let mut list = TickList::new();
        let t1 = leak_tcb(1);
        let t2 = leak_tcb(2);
        let t3 = leak_tcb(3);

        unsafe {
            list.insert(t1, 10);
            list.insert(t2, 10);
            list.insert(t3, 10);
        }

        // Equal delays insert in front of the node they tie with, which
        // zeroes the displaced deltas
        assert_eq!(deltas(&list), vec![(3, 10), (2, 0), (1, 0)]);

        let mut woken = Vec::new();
        advance_n(&mut list, 9, &mut woken);
        assert!(woken.is_empty());

        // All three leave on the same tick, in list order
        advance_n(&mut list, 1, &mut woken);
        assert_eq!(woken, vec![t3, t2, t1]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_transfers_delta() {
        let mut list = TickList::new();
        let t1 = leak_tcb(1);
        let t2 = leak_tcb(2);
        let t3 = leak_tcb(3);

        unsafe {
            list.insert(t1, 10);
            list.insert(t2, 25);
            list.insert(t3, 40);
        }
        assert_eq!(deltas(&list), vec![(1, 10), (2, 15), (3, 15)]);

        // Removing the head keeps later expiries absolute
        unsafe { list.remove(t1) };
        assert_eq!(deltas(&list), vec![(2, 25), (3, 15)]);

        // Removing a middle node feeds its delta to the successor
        unsafe { list.remove(t2) };
        assert_eq!(deltas(&list), vec![(3, 40)]);
    }

    #[test]
    fn test_append_past_the_end() {
        let mut list = TickList::new();
        let t1 = leak_tcb(1);
        let t2 = leak_tcb(2);

        unsafe {
            list.insert(t1, 5);
            list.insert(t2, 30);
        }

        assert_eq!(deltas(&list), vec![(1, 5), (2, 25)]);
    }
}

#[cfg(feature = "mem")]
mod mem_tests {
    use casyos::mem::{MemPool, MEM_NODE_SIZE};
    use casyos::config::CFG_MEM_ALIGN;

    const POOL_SIZE: usize = 1024;

    /// Storage aligned like the kernel pool
    #[repr(C, align(32))]
    struct PoolBuf([u8; POOL_SIZE]);

    fn make_pool() -> MemPool {
        let buf = Box::leak(Box::new(PoolBuf([0; POOL_SIZE])));
        let mut pool = MemPool::new();
        unsafe { pool.init(buf.0.as_mut_ptr(), POOL_SIZE) };
        pool
    }

    const fn align_up(n: usize) -> usize {
        (n + CFG_MEM_ALIGN - 1) & !(CFG_MEM_ALIGN - 1)
    }

    #[test]
    fn test_fresh_pool() {
        let pool = make_pool();
        assert!(pool.is_ready());
        assert_eq!(pool.capacity(), POOL_SIZE);
        assert_eq!(pool.node_count(), 1);
        assert_eq!(pool.perused(), 0);
    }

    #[test]
    fn test_invalid_requests() {
        let mut pool = make_pool();

        assert!(pool.alloc(0).is_none());
        assert!(pool.alloc(POOL_SIZE).is_none());
        assert!(pool.alloc(POOL_SIZE + 1).is_none());

        let mut cold = MemPool::new();
        assert!(!cold.is_ready());
        assert!(cold.alloc(64).is_none());
    }

    #[test]
    fn test_alloc_free_roundtrip() {
        let mut pool = make_pool();

        let p = pool.alloc(100).expect("alloc failed");
        assert_eq!(pool.node_count(), 2);
        assert_eq!(
            pool.perused(),
            (((align_up(100) + MEM_NODE_SIZE) * 1000) / POOL_SIZE) as u16
        );

        unsafe { pool.free(p.as_ptr()) };

        // Free restores the pool to its pre-allocation shape
        assert_eq!(pool.node_count(), 1);
        assert_eq!(pool.perused(), 0);
    }

    #[test]
    fn test_split_and_coalesce() {
        let mut pool = make_pool();

        // A=100, B=200, C=50 from an empty pool
        let a = pool.alloc(100).expect("A alloc failed");
        let b = pool.alloc(200).expect("B alloc failed");
        let c = pool.alloc(50).expect("C alloc failed");
        assert_eq!(pool.node_count(), 4);

        unsafe { pool.free(b.as_ptr()) };
        // B free but A used: no coalesce yet
        assert_eq!(pool.node_count(), 4);

        unsafe { pool.free(a.as_ptr()) };
        // A absorbed B: one contiguous free block before C
        assert_eq!(pool.node_count(), 3);
        assert_eq!(
            pool.perused(),
            (((align_up(50) + MEM_NODE_SIZE) * 1000) / POOL_SIZE) as u16
        );

        unsafe { pool.free(c.as_ptr()) };
        // Everything coalesced back into the single initial block
        assert_eq!(pool.node_count(), 1);
        assert_eq!(pool.perused(), 0);

        // The full payload is available again
        let big = pool.alloc(POOL_SIZE - MEM_NODE_SIZE);
        assert!(big.is_some());
    }

    #[test]
    fn test_first_fit_reuses_gap() {
        let mut pool = make_pool();

        let a = pool.alloc(64).expect("alloc failed");
        let _b = pool.alloc(64).expect("alloc failed");

        unsafe { pool.free(a.as_ptr()) };

        // First fit hands back the gap at the front
        let c = pool.alloc(64).expect("alloc failed");
        assert_eq!(c, a);
    }

    #[test]
    fn test_exhaustion() {
        let mut pool = make_pool();

        let p = pool.alloc(POOL_SIZE - MEM_NODE_SIZE).expect("alloc failed");
        assert!(pool.alloc(8).is_none());

        unsafe { pool.free(p.as_ptr()) };
        assert!(pool.alloc(8).is_some());
    }

    #[test]
    fn test_free_null_and_out_of_range() {
        let mut pool = make_pool();
        let p = pool.alloc(32).expect("alloc failed");

        unsafe {
            pool.free(core::ptr::null_mut());

            let mut outside = [0u8; 8];
            pool.free(outside.as_mut_ptr());
        }

        // Pool untouched by the bad frees
        assert_eq!(pool.node_count(), 2);
        unsafe { pool.free(p.as_ptr()) };
        assert_eq!(pool.node_count(), 1);
    }

    #[test]
    fn test_adjacent_free_nodes_never_persist() {
        let mut pool = make_pool();

        let a = pool.alloc(40).expect("alloc failed");
        let b = pool.alloc(40).expect("alloc failed");
        let c = pool.alloc(40).expect("alloc failed");
        let _d = pool.alloc(40).expect("alloc failed");

        unsafe {
            pool.free(a.as_ptr());
            pool.free(c.as_ptr());
            pool.free(b.as_ptr());
        }

        // a+b+c merged into one block; layout is [free][d][free tail]
        assert_eq!(pool.node_count(), 3);
    }
}

#[cfg(feature = "queue")]
mod queue_tests {
    use casyos::sync::queue::OsQueue;
    use core::ptr::NonNull;

    fn make_queue(capacity: u32) -> OsQueue {
        let buf = Box::leak(vec![0u32; capacity as usize].into_boxed_slice());
        let mut q = OsQueue::new();
        unsafe { q.init_with(NonNull::new(buf.as_mut_ptr()).unwrap(), capacity) };
        q
    }

    #[test]
    fn test_fresh_queue() {
        let q = make_queue(4);
        assert!(q.is_created());
        assert!(q.is_empty());
        assert!(!q.is_full());
        assert_eq!(q.len(), 0);
        assert_eq!(q.capacity(), 4);
    }

    #[test]
    fn test_fifo_roundtrip() {
        let mut q = make_queue(8);

        for msg in [11, 22, 33, 44] {
            assert!(q.try_write(msg));
        }
        assert_eq!(q.len(), 4);

        // k posts then k pends yield the same values in the same order
        assert_eq!(q.try_read(), Some(11));
        assert_eq!(q.try_read(), Some(22));
        assert_eq!(q.try_read(), Some(33));
        assert_eq!(q.try_read(), Some(44));
        assert_eq!(q.try_read(), None);
    }

    #[test]
    fn test_full_drops_and_wraps() {
        let mut q = make_queue(4);

        for msg in 1..=4 {
            assert!(q.try_write(msg));
        }
        assert!(q.is_full());
        assert!(!q.try_write(5));

        assert_eq!(q.try_read(), Some(1));
        assert_eq!(q.try_read(), Some(2));

        // Indices wrap around the ring
        assert!(q.try_write(5));
        assert!(q.try_write(6));
        assert!(q.is_full());

        assert_eq!(q.try_read(), Some(3));
        assert_eq!(q.try_read(), Some(4));
        assert_eq!(q.try_read(), Some(5));
        assert_eq!(q.try_read(), Some(6));
        assert!(q.is_empty());
    }

    #[test]
    fn test_flush() {
        let mut q = make_queue(4);

        q.try_write(7);
        q.try_write(8);
        q.flush();

        assert!(q.is_empty());
        assert_eq!(q.try_read(), None);

        q.try_write(9);
        assert_eq!(q.try_read(), Some(9));
    }
}

#[cfg(feature = "flag")]
mod flag_tests {
    use casyos::sync::flag::{flags_match, FlagGroup};
    use casyos::types::{OsFlagOp, OsFlagWaitMode};

    #[test]
    fn test_match_set_all() {
        assert!(flags_match(0b0011, 0b0011, OsFlagWaitMode::SetAll));
        assert!(flags_match(0b0111, 0b0011, OsFlagWaitMode::SetAll));
        assert!(!flags_match(0b0001, 0b0011, OsFlagWaitMode::SetAll));
        assert!(!flags_match(0, 0b0011, OsFlagWaitMode::SetAll));
    }

    #[test]
    fn test_match_set_any() {
        assert!(flags_match(0b0001, 0b0011, OsFlagWaitMode::SetAny));
        assert!(flags_match(0b0010, 0b0011, OsFlagWaitMode::SetAny));
        assert!(!flags_match(0b0100, 0b0011, OsFlagWaitMode::SetAny));
        assert!(!flags_match(0, 0b0011, OsFlagWaitMode::SetAny));
    }

    #[test]
    fn test_match_clr_all() {
        assert!(flags_match(0, 0b0011, OsFlagWaitMode::ClrAll));
        assert!(flags_match(0b1100, 0b0011, OsFlagWaitMode::ClrAll));
        assert!(!flags_match(0b0001, 0b0011, OsFlagWaitMode::ClrAll));
    }

    #[test]
    fn test_match_clr_any() {
        assert!(flags_match(0b0001, 0b0011, OsFlagWaitMode::ClrAny));
        assert!(flags_match(0, 0b0011, OsFlagWaitMode::ClrAny));
        assert!(!flags_match(0b0011, 0b0011, OsFlagWaitMode::ClrAny));
        assert!(!flags_match(0b1111, 0b0011, OsFlagWaitMode::ClrAny));
    }

    #[test]
    fn test_none_never_matches() {
        assert!(!flags_match(0xFFFF_FFFF, 0xFFFF_FFFF, OsFlagWaitMode::None));
        assert!(!flags_match(0, 0, OsFlagWaitMode::None));
    }

    #[test]
    fn test_post_set_and_clear() {
        static GROUP: FlagGroup = FlagGroup::new();
        GROUP.create("TestFlag", 0);

        GROUP.post(0b0101, OsFlagOp::Set).unwrap();
        assert_eq!(GROUP.flags(), 0b0101);

        GROUP.post(0b0001, OsFlagOp::Clr).unwrap();
        assert_eq!(GROUP.flags(), 0b0100);
    }

    #[test]
    fn test_post_on_uncreated_group() {
        static GROUP: FlagGroup = FlagGroup::new();
        assert!(GROUP.post(1, OsFlagOp::Set).is_err());
    }
}

#[cfg(all(feature = "sem", feature = "mutex"))]
mod sync_state_tests {
    use super::leak_tcb;
    use casyos::error::OsError;
    use casyos::sync::mutex::Mutex;
    use casyos::sync::sem::{os_task_sem_post, Semaphore};

    #[test]
    fn test_sem_counting_without_waiters() {
        static SEM: Semaphore = Semaphore::new();
        SEM.create(3);

        assert_eq!(SEM.post(), Ok(1));
        assert_eq!(SEM.post(), Ok(2));
        assert_eq!(SEM.post(), Ok(3));
        assert_eq!(SEM.post(), Err(OsError::SemOvf));
        assert_eq!(SEM.count(), 3);
    }

    #[test]
    fn test_sem_pend_requires_running_kernel() {
        static SEM: Semaphore = Semaphore::new();
        SEM.create(1);
        assert_eq!(SEM.pend(), Err(OsError::OsNotRunning));
    }

    #[test]
    fn test_task_sem_post() {
        let task = leak_tcb(4);

        // No embedded semaphore configured
        assert_eq!(os_task_sem_post(task), Err(OsError::SemNotCreated));

        unsafe { (*task.as_ptr()).sem.init(5) };
        assert_eq!(os_task_sem_post(task), Ok(1));
        assert_eq!(unsafe { task.as_ref() }.sem.count(), 1);
    }

    #[test]
    fn test_mutex_misuse_rejected() {
        static MUTEX: Mutex = Mutex::new();

        // Post before create: wrong object type
        assert_eq!(MUTEX.post(), Err(OsError::ObjType));

        MUTEX.create("TestMutex");
        assert!(!MUTEX.is_owned());

        // Post while unowned is a programming error, state untouched
        assert_eq!(MUTEX.post(), Err(OsError::MutexNotOwner));
        assert!(!MUTEX.is_owned());

        assert_eq!(MUTEX.pend(), Err(OsError::OsNotRunning));
    }
}

mod task_registry_tests {
    use super::leak_tcb;
    use casyos::task::TaskList;

    fn entry_a() -> ! {
        loop {}
    }

    fn entry_b() -> ! {
        loop {}
    }

    #[test]
    fn test_push_and_len() {
        let mut list = TaskList::new();
        assert!(list.is_empty());

        let t1 = leak_tcb(1);
        let t2 = leak_tcb(2);

        unsafe {
            list.push(t1);
            list.push(t2);
        }

        assert_eq!(list.len(), 2);
    }

    #[cfg(feature = "task-name")]
    #[test]
    fn test_find_by_name_ignores_case() {
        let mut list = TaskList::new();

        let t1 = leak_tcb(1);
        let t2 = leak_tcb(2);
        unsafe {
            (*t1.as_ptr()).name = "LedTask";
            (*t2.as_ptr()).name = "KeyTask";
            list.push(t1);
            list.push(t2);
        }

        assert_eq!(list.find_by_name("ledtask"), Some(t1));
        assert_eq!(list.find_by_name("KEYTASK"), Some(t2));
        assert_eq!(list.find_by_name("NoSuchTask"), None);
    }

    #[cfg(feature = "task-func")]
    #[test]
    fn test_find_by_entry() {
        let mut list = TaskList::new();

        let t1 = leak_tcb(1);
        let t2 = leak_tcb(2);
        unsafe {
            (*t1.as_ptr()).entry = Some(entry_a);
            (*t2.as_ptr()).entry = Some(entry_b);
            list.push(t1);
            list.push(t2);
        }

        assert_eq!(list.find_by_entry(entry_a), Some(t1));
        assert_eq!(list.find_by_entry(entry_b), Some(t2));
    }
}

/// Lifecycle checks against the kernel singletons.
///
/// Kept in a single test function: the globals are shared, and the test
/// harness runs separate tests in parallel.
#[cfg(all(feature = "sem", feature = "queue", feature = "task-name"))]
mod kernel_tests {
    use casyos::config::CFG_STK_SIZE_MIN;
    use casyos::error::OsError;
    use casyos::sync::queue::{os_q_flush, os_q_get_count, os_q_pend, os_q_post};
    use casyos::task::{os_register, os_task_find, OsTaskId, OsTcb};
    use casyos::types::{OsStkElement, OsTaskState};
    use casyos::{os_delay, os_init, os_start};

    fn app_task() -> ! {
        loop {}
    }

    fn static_task_storage() -> (&'static mut OsTcb, &'static mut [OsStkElement]) {
        let tcb = Box::leak(Box::new(OsTcb::new()));
        let stack = Box::leak(vec![0u32; 256].into_boxed_slice());
        (tcb, stack)
    }

    #[test]
    fn kernel_lifecycle() {
        // Nothing may run before initialization
        assert_eq!(os_start(), Err(OsError::OsNotInit));
        assert_eq!(os_delay(10), Err(OsError::OsNotRunning));

        os_init().expect("kernel init failed");

        // The idle task is registered by os_init
        assert!(os_task_find(OsTaskId::Name("Idle")).is_some());

        // Only the idle task so far
        assert_eq!(os_start(), Err(OsError::OsNoAppTask));

        // Bad registrations are rejected
        let (tcb, stack) = static_task_storage();
        assert_eq!(
            os_register(tcb, stack, "BadPrio", app_task, 32, 0, 0),
            Err(OsError::PrioInvalid)
        );

        let (tcb, _) = static_task_storage();
        let short_stack = Box::leak(vec![0u32; CFG_STK_SIZE_MIN - 1].into_boxed_slice());
        assert_eq!(
            os_register(tcb, short_stack, "ShortStack", app_task, 3, 0, 0),
            Err(OsError::StkSizeInvalid)
        );

        // A real registration with an embedded semaphore and queue
        let (tcb, stack) = static_task_storage();
        os_register(tcb, stack, "Worker", app_task, 3, 5, 16).expect("registration failed");

        let worker = os_task_find(OsTaskId::Name("worker")).expect("worker not found");
        let worker_ref = unsafe { worker.as_ref() };
        assert_eq!(worker_ref.state, OsTaskState::Ready);
        assert!(worker_ref.sem.is_created());
        assert!(worker_ref.msg_queue.is_created());
        assert!(!worker_ref.stk_ptr.is_null());

        // Queue operations on a task that is not blocked just queue up
        os_q_post(worker, 0xAA).unwrap();
        os_q_post(worker, 0xBB).unwrap();
        assert_eq!(os_q_get_count(worker), 2);

        os_q_flush(worker).unwrap();
        assert_eq!(os_q_get_count(worker), 0);

        // Blocking APIs refuse to run before os_start
        assert_eq!(os_q_pend(), Err(OsError::OsNotRunning));
    }
}

mod error_tests {
    use casyos::error::OsError;

    #[test]
    fn test_error_variants() {
        assert!(OsError::None.is_ok());
        assert!(!OsError::None.is_err());

        assert!(!OsError::QFull.is_ok());
        assert!(OsError::QFull.is_err());

        assert_eq!(OsError::None, OsError::None);
        assert_ne!(OsError::None, OsError::QFull);
    }

    #[test]
    fn test_error_codes() {
        // Registration failures surface as non-zero integer codes
        assert_eq!(OsError::None.code(), 0);
        assert_ne!(OsError::PrioInvalid.code(), 0);
        assert_ne!(OsError::StkSizeInvalid.code(), 0);

        let err = OsError::PendIsr;
        let _ = format!("{:?}", err);
    }
}

mod config_tests {
    use casyos::config::*;

    #[test]
    fn test_config_values() {
        assert!(CFG_PRIO_MAX >= 8, "Need at least 8 priority levels");
        assert!(CFG_PRIO_MAX <= 32, "Bitmap only covers 32 levels");

        assert!(CFG_STK_SIZE_MIN >= 32, "Stack too small");

        assert!(CFG_TICK_RATE_HZ >= 10, "Tick rate too slow");
        assert!(CFG_TICK_RATE_HZ <= 10000, "Tick rate too fast");

        // Idle priority is the lowest level
        assert_eq!(CFG_PRIO_IDLE, (CFG_PRIO_MAX - 1) as u8);
    }

    #[cfg(feature = "mem")]
    #[test]
    fn test_mem_config() {
        assert!(CFG_MEM_ALIGN.is_power_of_two());
        assert!(CFG_MEM_POOL_SIZE >= 1024);
    }
}
