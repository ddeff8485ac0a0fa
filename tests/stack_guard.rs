//! Stack guard words and the overflow handler

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#[macro_use]
mod common;

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use common::{HostBoard, HostCpu, STACK_SIZE, after_passes};
use pets::{Config, Ratio, Scheduler, Stack, Task, TaskId, TaskSet, TaskTag, guard};

#[test]
fn task_overflow_is_reported_once() {
    struct Board;

    impl HostBoard for Board {
        fn interrupt_flag() -> &'static AtomicBool {
            static ENABLED: AtomicBool = AtomicBool::new(true);
            &ENABLED
        }

        fn tick() {
            SCHEDULER.tick();
        }
    }

    impl Config for Board {
        type Platform = HostCpu<Board>;
        type Ticks = u32;
        const TICK_PERIOD: Ratio = Ratio::from_hz(1000);
        const STACK_GUARD_WORDS: usize = 4;

        fn stack_overflow(task: Option<TaskId>) {
            OVERFLOWS.fetch_add(1, Ordering::SeqCst);
            OVERFLOWED.store(task.map_or(usize::MAX, TaskId::index), Ordering::SeqCst);
            SCHEDULER.stop::<B>();
        }
    }

    struct A;

    impl TaskTag for A {
        type Config = Board;
        const INDEX: usize = 0;
    }

    impl TaskSet for A {
        type Config = Board;
        const INDICES: &'static [usize] = &[0];
    }

    struct B;

    impl TaskTag for B {
        type Config = Board;
        const INDEX: usize = 1;
    }

    impl TaskSet for B {
        type Config = Board;
        const INDICES: &'static [usize] = &[1];
    }

    static A_STACK: Stack<STACK_SIZE> = Stack::new();
    static B_STACK: Stack<STACK_SIZE> = Stack::new();
    static TASK_LIST: [Task; 2] = [Task::new(task_a, &A_STACK), Task::new(task_b, &B_STACK)];
    static SCHEDULER: Scheduler<Board> = Scheduler::new(&TASK_LIST);

    static OVERFLOWS: AtomicU32 = AtomicU32::new(0);
    static OVERFLOWED: AtomicUsize = AtomicUsize::new(0);
    static B_TURNS: AtomicU32 = AtomicU32::new(0);
    static PASSES: AtomicU32 = AtomicU32::new(0);

    fn task_a() {
        SCHEDULER.start::<B>();
        loop {
            SCHEDULER.yield_now();
        }
    }

    fn task_b() {
        // SAFETY: the bottom word of our own stack, far below anything live
        unsafe {
            SCHEDULER.task::<B>().stack_bottom().write_volatile(0);
        }
        B_TURNS.fetch_add(1, Ordering::SeqCst);
        SCHEDULER.yield_now();
        B_TURNS.fetch_add(1, Ordering::SeqCst);
    }

    SCHEDULER.run_until(after_passes(&PASSES, 20));

    assert_eq!(OVERFLOWS.load(Ordering::SeqCst), 1);
    assert_eq!(OVERFLOWED.load(Ordering::SeqCst), B::INDEX);
    assert_eq!(B_TURNS.load(Ordering::SeqCst), 1);
    assert!(!SCHEDULER.running::<B>());
    // SAFETY: both stacks are ours, and the scheduler has finished
    unsafe {
        assert!(guard::check(A_STACK.bottom(), Board::STACK_GUARD_WORDS));
        assert!(!guard::check(B_STACK.bottom(), Board::STACK_GUARD_WORDS));
    }
}

#[test]
fn interrupt_stack_is_guarded_too() {
    struct Board;

    static IRQ_STACK: Stack<1024> = Stack::new();

    impl HostBoard for Board {
        fn interrupt_flag() -> &'static AtomicBool {
            static ENABLED: AtomicBool = AtomicBool::new(true);
            &ENABLED
        }

        fn tick() {
            SCHEDULER.tick();
        }
    }

    impl Config for Board {
        type Platform = HostCpu<Board>;
        type Ticks = u32;
        const TICK_PERIOD: Ratio = Ratio::from_hz(1000);
        const STACK_GUARD_WORDS: usize = 4;

        fn interrupt_stack() -> *mut usize {
            IRQ_STACK.bottom()
        }

        fn stack_overflow(task: Option<TaskId>) {
            if task.is_none() {
                IRQ_OVERFLOWS.fetch_add(1, Ordering::SeqCst);
                // SAFETY: nothing runs on this stack in the test
                unsafe {
                    guard::init(IRQ_STACK.bottom(), Board::STACK_GUARD_WORDS);
                }
            } else {
                TASK_OVERFLOWS.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    pets::task_list! {
        config = Board;
        static TASK_LIST = [
            A(task_a, STACK_SIZE),
        ];
    }

    static SCHEDULER: Scheduler<Board> = Scheduler::new(&TASK_LIST);
    static IRQ_OVERFLOWS: AtomicU32 = AtomicU32::new(0);
    static TASK_OVERFLOWS: AtomicU32 = AtomicU32::new(0);
    static PASSES: AtomicU32 = AtomicU32::new(0);

    fn task_a() {
        // SAFETY: the guard region of an otherwise unused stack
        unsafe {
            IRQ_STACK.bottom().add(2).write_volatile(0x5A5A);
        }
        loop {
            SCHEDULER.yield_now();
        }
    }

    // SAFETY: nothing has touched the stack yet
    unsafe {
        assert!(!guard::check(IRQ_STACK.bottom(), Board::STACK_GUARD_WORDS));
    }

    SCHEDULER.run_until(after_passes(&PASSES, 10));

    assert_eq!(IRQ_OVERFLOWS.load(Ordering::SeqCst), 1);
    assert_eq!(TASK_OVERFLOWS.load(Ordering::SeqCst), 0);
    // SAFETY: the handler rewrote it
    unsafe {
        assert!(guard::check(IRQ_STACK.bottom(), Board::STACK_GUARD_WORDS));
    }
}

#[test]
#[should_panic(expected = "Stack too small for guard")]
fn guard_must_fit_below_the_frame() {
    struct Board;

    impl HostBoard for Board {
        fn interrupt_flag() -> &'static AtomicBool {
            static ENABLED: AtomicBool = AtomicBool::new(true);
            &ENABLED
        }

        fn tick() {
            SCHEDULER.tick();
        }
    }

    impl Config for Board {
        type Platform = HostCpu<Board>;
        type Ticks = u32;
        const TICK_PERIOD: Ratio = Ratio::from_hz(1000);
        // a kilobyte of guard on a one kilobyte stack
        const STACK_GUARD_WORDS: usize = 1024 / core::mem::size_of::<usize>();

        fn stack_overflow(_task: Option<TaskId>) {}
    }

    pets::task_list! {
        config = Board;
        static TASK_LIST = [
            A(task_a, 1024),
        ];
    }

    static SCHEDULER: Scheduler<Board> = Scheduler::new(&TASK_LIST);

    fn task_a() {}

    SCHEDULER.run_until(|| true);
}

// End of File
