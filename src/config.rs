//! Holds the [`Config`] trait

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Platform, Ratio, TaskId, TickCount};

/// Build-time configuration for a [`Scheduler`](crate::Scheduler)
///
/// Implement this on an empty type, and use that type to parameterise your
/// scheduler and tag your tasks:
///
/// ```ignore
/// struct Board;
///
/// impl pets::Config for Board {
///     type Platform = pets::CortexM;
///     type Ticks = u32;
///     const TICK_PERIOD: pets::Ratio = pets::Ratio::from_hz(1000);
///     const STACK_GUARD_WORDS: usize = 4;
///
///     fn stack_overflow(task: Option<pets::TaskId>) {
///         panic!("Stack overflow in {:?}", task);
///     }
/// }
/// ```
pub trait Config: 'static {
    /// The CPU primitives - interrupt masking and sleeping
    type Platform: Platform;

    /// The tick counter. Its width bounds how far ahead a deadline may be.
    type Ticks: TickCount;

    /// How long one tick lasts, in seconds
    const TICK_PERIOD: Ratio;

    /// How many guard words to put at the bottom of each stack
    ///
    /// Zero turns stack checking off completely.
    const STACK_GUARD_WORDS: usize = 0;

    /// The lowest address of the interrupt stack, to guard as well
    ///
    /// Null means the interrupt stack is not checked.
    fn interrupt_stack() -> *mut usize {
        core::ptr::null_mut()
    }

    /// Called when a stack guard has been overwritten
    ///
    /// `task` is the task whose stack overflowed, or `None` for the interrupt
    /// stack. This is not expected to return - halt, reset, or log and spin.
    /// If it does return, the scheduler carries on, with whatever damage the
    /// overflow has caused.
    fn stack_overflow(task: Option<TaskId>);
}

// End of File
