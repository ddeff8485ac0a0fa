//! Holds the [`Task`] type and methods, and the traits for naming tasks

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::{Config, Stack, TickCount, Volatile};

/// The function a task runs when it is started
///
/// If it returns, the task stops.
pub type TaskEntryFn = fn();

/// Represents a Task
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    /// Represents the Task ID we produce when the scheduler isn't running
    pub(crate) const INVALID_ID: usize = usize::MAX;

    /// Is this the invalid Task ID?
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID_ID
    }

    /// The position of this task in the task list
    pub const fn index(self) -> usize {
        self.0
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskId {
    fn format(&self, fmt: defmt::Formatter) {
        if self.is_invalid() {
            defmt::write!(fmt, "T---");
        } else {
            defmt::write!(fmt, "T{=usize:03}", self.0);
        }
    }
}

impl core::fmt::Display for TaskId {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_invalid() {
            write!(fmt, "T---")
        } else {
            write!(fmt, "T{:03}", self.0)
        }
    }
}

/// What the scheduler asks a task before running it
#[derive(Copy, Clone)]
pub(crate) enum Runnable {
    /// Run whenever it is this task's turn
    AlwaysTrue,
    /// Never run - unless a wake deadline fires
    AlwaysFalse,
    /// Run when this predicate says so
    ///
    /// The predicate lives on the waiting task's own stack. It stays valid
    /// because the task cannot leave [`Scheduler::wait`](crate::Scheduler::wait)
    /// until this slot has been reset.
    Until(*const (dyn Fn() -> bool + 'static)),
}

impl Runnable {
    /// Evaluate the predicate
    ///
    /// # Safety
    ///
    /// For `Until`, the predicate must still be alive - see above.
    pub(crate) unsafe fn evaluate(self) -> bool {
        match self {
            Runnable::AlwaysTrue => true,
            Runnable::AlwaysFalse => false,
            // SAFETY: see the function docs
            Runnable::Until(predicate) => unsafe { (*predicate)() },
        }
    }

    /// Is this the `AlwaysFalse` predicate?
    pub(crate) fn is_never(self) -> bool {
        matches!(self, Runnable::AlwaysFalse)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Runnable {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Runnable::AlwaysTrue => defmt::write!(fmt, "always"),
            Runnable::AlwaysFalse => defmt::write!(fmt, "never"),
            Runnable::Until(_) => defmt::write!(fmt, "until"),
        }
    }
}

/// Represents a task that the scheduler is managing
///
/// Build a fixed list of these, in a `static`, and hand it to
/// [`Scheduler::new`](crate::Scheduler::new). The [`task_list!`](crate::task_list)
/// macro does this for you.
pub struct Task {
    /// Saved stack pointer, whenever the task is not running
    stack_pointer: Volatile<usize>,
    /// What the task runs the next time it is started
    entry_fn: Volatile<TaskEntryFn>,
    /// Lowest address of the stack, where the guard words live
    stack_bottom: *mut usize,
    /// Size of the stack, in bytes
    stack_len: usize,
    /// When to run this task
    runnable: Volatile<Runnable>,
    /// When to make this task runnable regardless of `runnable`, widened to
    /// 64 bits
    wake_deadline: Volatile<Option<u64>>,
    /// A word the task may use however it likes
    context: Volatile<usize>,
}

impl Task {
    /// Create a new [`Task`] object
    ///
    /// The task starts out stopped.
    pub const fn new<const N: usize>(entry_fn: TaskEntryFn, stack: &'static Stack<N>) -> Task {
        assert!(
            N >= <crate::asm::Arch as crate::asm::Architecture>::MIN_STACK_SIZE,
            "Task stack is too small"
        );
        Task {
            stack_pointer: Volatile::new(0),
            entry_fn: Volatile::new(entry_fn),
            stack_bottom: stack.bottom(),
            stack_len: N,
            runnable: Volatile::new(Runnable::AlwaysFalse),
            wake_deadline: Volatile::new(None),
            context: Volatile::new(0),
        }
    }

    /// Get the entry function this task will run when started
    pub fn entry_fn(&self) -> TaskEntryFn {
        self.entry_fn.get()
    }

    /// Set the entry function for the next start
    pub(crate) fn set_entry_fn(&self, entry_fn: TaskEntryFn) {
        self.entry_fn.set(entry_fn);
    }

    /// Get the saved stack pointer for this task
    pub(crate) fn stack_pointer(&self) -> usize {
        self.stack_pointer.get()
    }

    /// Where the context switch saves this task's stack pointer
    pub(crate) fn stack_pointer_slot(&self) -> *mut usize {
        self.stack_pointer.as_ptr()
    }

    /// Set the saved stack pointer for this task
    ///
    /// # Safety
    ///
    /// The task will execute using the stack given, so it must point to a
    /// full saved frame for this architecture, inside this task's stack.
    pub(crate) unsafe fn set_stack_pointer(&self, stack_pointer: *mut usize) {
        self.stack_pointer.set(stack_pointer as usize);
    }

    /// Get the lowest address of this task's stack
    pub fn stack_bottom(&self) -> *mut usize {
        self.stack_bottom
    }

    /// Get the top of this task's stack
    pub fn stack_top(&self) -> *mut usize {
        self.stack_bottom.wrapping_byte_add(self.stack_len)
    }

    /// Get the size of this task's stack, in bytes
    pub fn stack_len(&self) -> usize {
        self.stack_len
    }

    pub(crate) fn runnable(&self) -> Runnable {
        self.runnable.get()
    }

    pub(crate) fn set_runnable(&self, runnable: Runnable) {
        self.runnable.set(runnable);
    }

    pub(crate) fn wake_deadline<T: TickCount>(&self) -> Option<T> {
        self.wake_deadline.get().map(T::truncate)
    }

    pub(crate) fn set_wake_deadline<T: TickCount>(&self, deadline: Option<T>) {
        self.wake_deadline.set(deadline.map(T::widen));
    }

    /// Runnable, waiting or sleeping - anything but stopped
    pub(crate) fn is_live(&self) -> bool {
        !self.runnable().is_never() || self.wake_deadline.get().is_some()
    }

    /// Mark the task as stopped
    pub(crate) fn stop(&self) {
        self.runnable.set(Runnable::AlwaysFalse);
        self.wake_deadline.set(None);
    }

    pub(crate) fn context(&self) -> usize {
        self.context.get()
    }

    pub(crate) fn set_context(&self, context: usize) {
        self.context.set(context);
    }
}

/// SAFETY: The raw pointers refer to `'static` stacks, and all mutable state
/// is in [`Volatile`] cells (see there for the concurrency argument).
unsafe impl Sync for Task {}

/// A compile-time name for one task in a task list
///
/// The tag is bound to a [`Config`], so it can only be used with a scheduler
/// built from that configuration. Usually implemented by
/// [`task_list!`](crate::task_list).
pub trait TaskTag {
    /// The configuration of the scheduler this task belongs to
    type Config: Config;

    /// The position of this task in its task list
    const INDEX: usize;
}

/// One or more tasks, named at compile time
///
/// Implemented for every [`TaskTag`] (by [`task_list!`](crate::task_list))
/// and for tuples of up to eight tags with the same `Config`.
pub trait TaskSet {
    /// The configuration of the scheduler these tasks belong to
    type Config: Config;

    /// The positions of these tasks in their task list
    const INDICES: &'static [usize];

    /// Does this set include the task at `index`?
    fn contains(index: usize) -> bool {
        Self::INDICES.contains(&index)
    }
}

macro_rules! impl_task_set_for_tuple {
    ($first:ident $(, $rest:ident)*) => {
        impl<$first, $($rest),*> TaskSet for ($first, $($rest,)*)
        where
            $first: TaskTag,
            $($rest: TaskTag<Config = $first::Config>,)*
        {
            type Config = $first::Config;
            const INDICES: &'static [usize] = &[$first::INDEX, $($rest::INDEX),*];
        }
    };
}

impl_task_set_for_tuple!(A);
impl_task_set_for_tuple!(A, B);
impl_task_set_for_tuple!(A, B, C);
impl_task_set_for_tuple!(A, B, C, D);
impl_task_set_for_tuple!(A, B, C, D, E);
impl_task_set_for_tuple!(A, B, C, D, E, F);
impl_task_set_for_tuple!(A, B, C, D, E, F, G);
impl_task_set_for_tuple!(A, B, C, D, E, F, G, H);


// End of File
