//! A host-side environment for running the scheduler under test
//!
//! Interrupt masking is a flag, and sleeping the CPU delivers exactly one
//! tick - as if the tick interrupt were the only interrupt, and it fired
//! every time the CPU went to sleep.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![allow(dead_code, unused_macros)]

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use pets::Platform;

/// Stack size for host tasks - debug builds are hungry
pub const STACK_SIZE: usize = 64 * 1024;

/// The per-test parts of the host environment
pub trait HostBoard: 'static {
    /// The simulated interrupt-enable flag
    fn interrupt_flag() -> &'static AtomicBool;

    /// Deliver one tick interrupt
    fn tick();
}

/// A [`Platform`] that simulates a CPU for a [`HostBoard`]
pub struct HostCpu<B>(PhantomData<B>);

impl<B: HostBoard> Platform for HostCpu<B> {
    fn interrupts_enabled() -> bool {
        B::interrupt_flag().load(Ordering::SeqCst)
    }

    fn set_interrupts(enabled: bool) -> bool {
        B::interrupt_flag().swap(enabled, Ordering::SeqCst)
    }

    fn sleep() {
        B::tick();
    }
}

/// Declare a board type for one test, wired to one scheduler
///
/// `host_board!(Board, SCHEDULER, u32)` makes a `Board` type implementing
/// [`HostBoard`] and [`pets::Config`] (1 kHz tick, no stack guard), whose
/// ticks go to `SCHEDULER`.
macro_rules! host_board {
    ($board:ident, $scheduler:ident, $ticks:ty) => {
        struct $board;

        impl $board {
            /// Are the simulated interrupts enabled?
            #[allow(dead_code)]
            fn interrupts_enabled() -> bool {
                <common::HostCpu<$board> as pets::Platform>::interrupts_enabled()
            }
        }

        impl common::HostBoard for $board {
            fn interrupt_flag() -> &'static std::sync::atomic::AtomicBool {
                static ENABLED: std::sync::atomic::AtomicBool =
                    std::sync::atomic::AtomicBool::new(true);
                &ENABLED
            }

            fn tick() {
                $scheduler.tick();
            }
        }

        impl pets::Config for $board {
            type Platform = common::HostCpu<$board>;
            type Ticks = $ticks;
            const TICK_PERIOD: pets::Ratio = pets::Ratio::from_hz(1000);

            fn stack_overflow(task: Option<pets::TaskId>) {
                panic!("Stack overflow in {:?}", task);
            }
        }
    };
}

/// A `run_until` condition that is true after `passes` scheduler passes
pub fn after_passes(counter: &'static std::sync::atomic::AtomicU32, passes: u32) -> impl Fn() -> bool {
    move || counter.fetch_add(1, Ordering::SeqCst) >= passes
}

// End of File
