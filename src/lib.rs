//! # PETS - a cooperative, deadline-aware scheduler
//!
//! A fixed set of tasks share one CPU. Each task has its own statically
//! allocated stack, and gives up the CPU only when it yields, waits on a
//! condition, sleeps, or returns. A periodic tick interrupt drives time, and
//! wakes tasks whose deadline has arrived.
//!
//! ```ignore
//! pets::task_list! {
//!     config = Board;
//!     static TASK_LIST = [
//!         Main(main_task, 2048),
//!         Blinky(blinky_task, 1024),
//!     ];
//! }
//!
//! static SCHEDULER: pets::Scheduler<Board> = pets::Scheduler::new(&TASK_LIST);
//!
//! fn main_task() {
//!     SCHEDULER.start::<Blinky>();
//!     loop {
//!         SCHEDULER.sleep(SCHEDULER.ticks(pets::millis(100)));
//!     }
//! }
//! ```

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod asm;
mod config;
mod interrupts;
mod platform;
mod scheduler;
mod stack;
mod stack_pusher;
mod task;
pub mod time;
mod volatile;

pub use config::Config;
pub use interrupts::Interrupts;
#[cfg(target_arch = "arm")]
pub use platform::CortexM;
pub use platform::Platform;
pub use scheduler::Scheduler;
pub use stack::{Stack, guard};
pub use task::{Task, TaskEntryFn, TaskId, TaskSet, TaskTag};
pub use time::{Ratio, TickCount, micros, millis, secs, ticks_from};

use stack_pusher::StackPusher;
use task::Runnable;
use volatile::Volatile;

/// Declare a static task list, and a tag type for each task in it
///
/// Each entry gives the tag, the entry function and the stack size in bytes.
/// Tasks are numbered in the order given, and each gets its own statically
/// allocated [`Stack`]. The tags implement [`TaskTag`] and [`TaskSet`] for
/// the given [`Config`].
///
/// ```ignore
/// pets::task_list! {
///     config = Board;
///     pub static TASK_LIST = [
///         pub Rabbit(rabbits, 1024),
///         pub Hamster(hamsters, 1024),
///     ];
/// }
/// ```
#[macro_export]
macro_rules! task_list {
    (@count) => { 0usize };
    (@count $head:ident $($tail:ident)*) => {
        1usize + $crate::task_list!(@count $($tail)*)
    };
    (@tags $config:ty; $idx:expr;) => {};
    (@tags $config:ty; $idx:expr; $tvis:vis $tag:ident $(, $rvis:vis $rtag:ident)*) => {
        #[derive(Copy, Clone, Debug)]
        $tvis struct $tag;

        impl $crate::TaskTag for $tag {
            type Config = $config;
            const INDEX: usize = $idx;
        }

        impl $crate::TaskSet for $tag {
            type Config = $config;
            const INDICES: &'static [usize] = &[$idx];
        }

        $crate::task_list!(@tags $config; $idx + 1usize; $($rvis $rtag),*);
    };
    (
        config = $config:ty;
        $(#[$meta:meta])*
        $vis:vis static $list:ident = [
            $( $tvis:vis $tag:ident ( $entry:path , $size:expr ) ),+ $(,)?
        ];
    ) => {
        $(#[$meta])*
        $vis static $list: [$crate::Task; $crate::task_list!(@count $($tag)+)] = [
            $(
                $crate::Task::new($entry, {
                    static STACK: $crate::Stack<{ $size }> = $crate::Stack::new();
                    &STACK
                }),
            )+
        ];

        $crate::task_list!(@tags $config; 0usize; $($tvis $tag),+);
    };
}

// End of File
