//! Contains the [`Scheduler`] type

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::marker::PhantomData;

use crate::asm::{Architecture, Arch};
use crate::{
    Config, Interrupts, Platform, Ratio, Runnable, Task, TaskEntryFn, TaskId, TaskSet, TaskTag,
    TickCount, Volatile, guard, ticks_from,
};

/// Interrupt guard for a particular configuration
type Irq<C> = Interrupts<<C as Config>::Platform>;

/// A cooperative, deadline-aware scheduler
///
/// Tasks run until they yield, wait, sleep or return. Between tasks, control
/// comes back to the scheduler loop (on the stack that called
/// [`Scheduler::run`]), which walks the task list round-robin looking for the
/// next task that can run, and sleeps the CPU if there isn't one.
///
/// A periodic interrupt must call [`Scheduler::tick`]. Tasks that are
/// sleeping, or waiting with a timeout, are made runnable by the tick when
/// their deadline arrives.
pub struct Scheduler<C: Config> {
    /// Which task is currently running, or [`TaskId::INVALID_ID`]
    current_task: Volatile<usize>,
    /// Saved stack pointer of the scheduler loop, while a task runs
    scheduler_sp: Volatile<usize>,
    /// A fixed, static list of all our tasks
    task_list: &'static [Task],
    /// Current tick count
    current_time: Volatile<C::Ticks>,
    /// The earliest pending task deadline, if known
    wake_deadline: Volatile<Option<C::Ticks>>,
    /// Set when a task deadline changes, so the next tick recomputes
    /// `wake_deadline`
    wake_deadline_update: Volatile<bool>,
    /// Is the scheduler loop running?
    started: Volatile<bool>,
    _config: PhantomData<fn() -> C>,
}

impl<C: Config> Scheduler<C> {
    /// Build the scheduler
    pub const fn new(task_list: &'static [Task]) -> Scheduler<C> {
        Self::new_at(task_list, <C::Ticks as TickCount>::ZERO)
    }

    /// Build the scheduler, with the tick counter starting at `start_time`
    ///
    /// Starting close to the wrap point flushes out code that compares tick
    /// values without wrapping arithmetic.
    pub const fn new_at(task_list: &'static [Task], start_time: C::Ticks) -> Scheduler<C> {
        // Cannot schedule without at least one task
        assert!(!task_list.is_empty());
        Scheduler {
            current_task: Volatile::new(TaskId::INVALID_ID),
            scheduler_sp: Volatile::new(0),
            task_list,
            current_time: Volatile::new(start_time),
            wake_deadline: Volatile::new(None),
            wake_deadline_update: Volatile::new(false),
            started: Volatile::new(false),
            _config: PhantomData,
        }
    }

    /// Run the scheduler
    ///
    /// You may only call this once, and you should call it from `fn main()`
    /// once all your hardware is configured, including the tick interrupt.
    /// The first task in the list is started with its own entry function;
    /// it can start the others.
    pub fn run(&'static self) -> ! {
        self.run_until(|| false);
        unreachable!("Scheduler loop exited");
    }

    /// Run the scheduler until `done` returns true
    ///
    /// `done` is checked with interrupts disabled, before each pick of the
    /// next task. Tasks that have not finished are left suspended where they
    /// are.
    pub fn run_until(&'static self, done: impl Fn() -> bool) {
        let irq = Irq::<C>::disabled();
        if self.started.get() {
            panic!("Tried to re-start scheduler!");
        }
        self.started.set(true);
        info!("Scheduler @ {=usize:08x}", self as *const Self as usize);

        self.init_guards();
        self.prepare(0, self.task_list[0].entry_fn());

        // So the first search starts at task 0
        let mut cursor = self.task_list.len() - 1;
        while !done() {
            match self.pick_next_task(cursor) {
                Some(task_idx) => {
                    self.switch_to(task_idx);
                    self.check_guards(task_idx);
                    cursor = task_idx;
                }
                None => {
                    trace!("- Sleep!");
                    C::Platform::sleep();
                    // let the interrupt that woke us run
                    irq.enable();
                    irq.disable();
                }
            }
        }

        self.started.set(false);
        debug!("Scheduler loop exited");
    }

    /// Is the scheduler loop running?
    pub fn is_started(&self) -> bool {
        self.started.get()
    }

    /// Start tasks, using the entry function each was declared with
    ///
    /// Any task in the set that was already running is restarted from the
    /// beginning. The current task is not restarted, as its stack is in use:
    /// it just becomes runnable again, undoing an earlier stop.
    pub fn start<T: TaskSet<Config = C>>(&'static self) {
        let _irq = Irq::<C>::disabled();
        for &task_idx in T::INDICES {
            self.prepare(task_idx, self.task_list[task_idx].entry_fn());
        }
    }

    /// Start a task, with a new entry function
    ///
    /// The new function is also used by later calls to [`Scheduler::start`].
    /// If `T` is the current task, it carries on where it is, and the new
    /// function takes effect the next time it starts.
    pub fn start_with<T: TaskTag<Config = C>>(&'static self, entry_fn: TaskEntryFn) {
        let _irq = Irq::<C>::disabled();
        self.prepare(T::INDEX, entry_fn);
    }

    /// Stop tasks
    ///
    /// A stopped task is never picked to run again, until it is started. If
    /// the current task stops itself, it keeps running until it next yields,
    /// waits or sleeps - and then never comes back.
    pub fn stop<T: TaskSet<Config = C>>(&self) {
        let _irq = Irq::<C>::disabled();
        for &task_idx in T::INDICES {
            debug!("Stopping {}", TaskId(task_idx));
            self.task_list[task_idx].stop();
        }
    }

    /// Stop tasks, returning to the scheduler at once if the current task is
    /// one of them
    pub fn abort<T: TaskSet<Config = C>>(&self) {
        let _irq = Irq::<C>::disabled();
        for &task_idx in T::INDICES {
            debug!("Aborting {}", TaskId(task_idx));
            self.task_list[task_idx].stop();
        }
        let current_task = self.current_task.get();
        if T::contains(current_task) {
            let task = &self.task_list[current_task];
            // A stopped task is never resumed, only restarted with a fresh frame
            loop {
                self.switch_to_scheduler(task);
            }
        }
    }

    /// Is any of these tasks runnable, waiting or sleeping?
    pub fn running<T: TaskSet<Config = C>>(&self) -> bool {
        let _irq = Irq::<C>::disabled();
        T::INDICES
            .iter()
            .any(|&task_idx| self.task_list[task_idx].is_live())
    }

    /// Is the current task one of these tasks?
    pub fn current<T: TaskSet<Config = C>>(&self) -> bool {
        T::contains(self.current_task.get())
    }

    /// Get the current Task ID
    ///
    /// Invalid when called from outside a task.
    pub fn current_task_id(&self) -> TaskId {
        TaskId(self.current_task.get())
    }

    /// Get the ID of the task `DELTA` places after `T` in the circular task
    /// list
    pub fn task_of<T: TaskTag<Config = C>, const DELTA: usize>(&self) -> TaskId {
        TaskId((T::INDEX + DELTA) % self.task_list.len())
    }

    /// Get the ID of the task after `task_id` in the circular task list
    pub fn successor(&self, task_id: TaskId) -> TaskId {
        TaskId((task_id.0 + 1) % self.task_list.len())
    }

    /// Get the record for a task
    pub fn task<T: TaskTag<Config = C>>(&self) -> &'static Task {
        &self.task_list[T::INDEX]
    }

    /// Switch to another task, coming back on our next turn
    pub fn yield_now(&self) {
        let _irq = Irq::<C>::disabled();
        self.suspend(Runnable::AlwaysTrue, None);
    }

    /// Wait until `predicate` returns true
    ///
    /// Returns at once if it is already true. Otherwise the scheduler
    /// evaluates it, with interrupts disabled, each time it considers this
    /// task, and resumes the task when it returns true.
    ///
    /// The predicate must not make any task runnable.
    pub fn wait(&self, predicate: impl Fn() -> bool) {
        let _irq = Irq::<C>::disabled();
        if predicate() {
            return;
        }
        self.wait_on(&predicate, None);
    }

    /// Wait until `predicate` returns true, for at most `ticks` whole ticks
    ///
    /// Returns true if the predicate became true, or false on timeout.
    pub fn wait_for(&self, ticks: C::Ticks, predicate: impl Fn() -> bool) -> bool {
        let _irq = Irq::<C>::disabled();
        if predicate() {
            return true;
        }
        let deadline = self.current_time.get().deadline_after(ticks);
        self.wait_on(&predicate, Some(deadline))
    }

    /// Wait until `predicate` returns true, or the tick counter reaches
    /// `deadline`
    ///
    /// `deadline` must be within half the counter range of the current time.
    /// Returns false at once if it has already passed. Otherwise returns true
    /// if the predicate became true, or false on timeout.
    pub fn wait_deadline(&self, deadline: C::Ticks, predicate: impl Fn() -> bool) -> bool {
        let _irq = Irq::<C>::disabled();
        if self.current_time.get().has_passed(deadline) {
            return false;
        }
        if predicate() {
            return true;
        }
        self.wait_on(&predicate, Some(deadline))
    }

    /// Let other tasks run for at least `ticks` whole ticks
    pub fn sleep(&self, ticks: C::Ticks) {
        let _irq = Irq::<C>::disabled();
        let deadline = self.current_time.get().deadline_after(ticks);
        trace!("- sleep until {}", deadline.widen());
        self.suspend(Runnable::AlwaysFalse, Some(deadline));
    }

    /// Stall for at least `ticks` whole ticks, without letting other tasks
    /// run
    ///
    /// The CPU sleeps between ticks. Any other interrupt costs an extra check
    /// of the time, nothing more.
    pub fn delay(&self, ticks: C::Ticks) {
        let irq = Irq::<C>::disabled();
        let deadline = self.current_time.get().deadline_after(ticks);
        while !self.current_time.get().has_passed(deadline) {
            C::Platform::sleep();
            irq.enable();
            irq.disable();
        }
    }

    /// Get current tick count
    pub fn current_time(&self) -> C::Ticks {
        let _irq = Irq::<C>::disabled();
        self.current_time.get()
    }

    /// Convert a duration into ticks of this scheduler, rounding up
    ///
    /// Panics if the result is too long to sleep for: a relative delay must
    /// be under half the counter range, so its deadline lies in the future.
    pub fn ticks(&self, duration: Ratio) -> C::Ticks {
        let ticks = ticks_from(duration, C::TICK_PERIOD);
        if ticks >= C::Ticks::HALF.widen() {
            panic!("Duration of {} ticks is too long for the tick counter", ticks);
        }
        C::Ticks::truncate(ticks)
    }

    /// Does the tick interrupt have any work to do?
    ///
    /// If not, a tickless system can leave the tick interrupt off until the
    /// next task deadline is set.
    pub fn tick_required(&self) -> bool {
        let _irq = Irq::<C>::disabled();
        self.wake_deadline.get().is_some() || self.wake_deadline_update.get()
    }

    /// Advance time by one tick
    ///
    /// Call this from your periodic timer interrupt. Tasks whose deadline
    /// has arrived become runnable. Returns true, to say the CPU should wake.
    pub fn tick(&self) -> bool {
        let now = self.current_time.get().wrapping_add(C::Ticks::ONE);
        self.current_time.set(now);

        if self.wake_deadline_update.get() || self.wake_deadline.get() == Some(now) {
            let mut next_deadline: Option<C::Ticks> = None;
            for task in self.task_list.iter() {
                let Some(deadline) = task.wake_deadline::<C::Ticks>() else {
                    continue;
                };
                if now.has_passed(deadline) {
                    task.set_runnable(Runnable::AlwaysTrue);
                    task.set_wake_deadline::<C::Ticks>(None);
                } else {
                    let nearer = match next_deadline {
                        Some(next) => now.ticks_until(deadline) < now.ticks_until(next),
                        None => true,
                    };
                    if nearer {
                        next_deadline = Some(deadline);
                    }
                }
            }
            self.wake_deadline.set(next_deadline);
            self.wake_deadline_update.set(false);
        }

        true
    }

    /// Store a value in the current task's context word
    ///
    /// The value must fit in a pointer - this is checked at compile time.
    pub fn set_context<T: Copy>(&self, value: T) {
        const {
            assert!(
                core::mem::size_of::<T>() <= core::mem::size_of::<usize>(),
                "Context values must fit in a pointer"
            );
        }
        let mut word = 0usize;
        // SAFETY: T fits in the word, and we write it unaligned
        unsafe {
            (&raw mut word).cast::<T>().write_unaligned(value);
        }
        self.current_record().set_context(word);
    }

    /// Read the current task's context word as a `T`
    ///
    /// # Safety
    ///
    /// The word must hold a valid `T` - usually because the current task
    /// stored one with [`Scheduler::set_context`].
    pub unsafe fn context<T: Copy>(&self) -> T {
        const {
            assert!(
                core::mem::size_of::<T>() <= core::mem::size_of::<usize>(),
                "Context values must fit in a pointer"
            );
        }
        let word = self.current_record().context();
        // SAFETY: T fits in the word, and the caller says the bits are a T
        unsafe { (&raw const word).cast::<T>().read_unaligned() }
    }

    /// Get the record for the running task
    fn current_record(&self) -> &'static Task {
        match self.task_list.get(self.current_task.get()) {
            Some(task) => task,
            None => panic!("Task operation called outside of a task"),
        }
    }

    /// Set up a task to run `entry_fn` from the top of its stack
    ///
    /// The current task only has its state reset - its next switch away
    /// saves the live stack pointer, so a fresh frame would be overwritten.
    fn prepare(&'static self, task_idx: usize, entry_fn: TaskEntryFn) {
        let task = &self.task_list[task_idx];
        task.set_entry_fn(entry_fn);

        if task_idx == self.current_task.get() {
            debug!("Start on running task {}", TaskId(task_idx));
            task.set_runnable(Runnable::AlwaysTrue);
            task.set_wake_deadline::<C::Ticks>(None);
            return;
        }

        // SAFETY: `Task::new` and `init_guards` check the stack is big enough
        // for a frame, and the task is not running so its stack is unused.
        unsafe {
            let stack_pointer = Arch::build_initial_frame(
                task.stack_top(),
                bootstrap::<C>,
                self as *const Self as usize,
            );
            task.set_stack_pointer(stack_pointer);
        }
        task.set_runnable(Runnable::AlwaysTrue);
        task.set_wake_deadline::<C::Ticks>(None);

        debug!(
            "Init task frame {}, with stack @ 0x{=usize:08x}",
            TaskId(task_idx),
            task.stack_pointer()
        );
    }

    /// Select the next task in the round-robin, after `cursor`
    ///
    /// Must be called with interrupts disabled.
    fn pick_next_task(&self, cursor: usize) -> Option<usize> {
        let now = self.current_time.get();
        let num_tasks = self.task_list.len();
        // Go through all the tasks. We start with the one after the
        // cursor, so we don't keep picking the same task.
        for step in 1..=num_tasks {
            let task_idx = (cursor + step) % num_tasks;
            let task = &self.task_list[task_idx];
            // SAFETY: An `Until` predicate belongs to a task suspended in
            // `wait_on`, which keeps it alive.
            if unsafe { task.runnable().evaluate() } {
                trace!("< picked {} ({})", TaskId(task_idx), task.runnable());
                return Some(task_idx);
            }
            if task.wake_deadline::<C::Ticks>() == Some(now) {
                // timed out - the tick has not caught up with this one yet
                task.set_runnable(Runnable::AlwaysTrue);
                task.set_wake_deadline::<C::Ticks>(None);
                self.wake_deadline_update.set(true);
                trace!("< picked {} (deadline)", TaskId(task_idx));
                return Some(task_idx);
            }
        }
        None
    }

    /// Run a task until it comes back to the scheduler
    ///
    /// Must be called from the scheduler loop, with interrupts disabled.
    fn switch_to(&self, task_idx: usize) {
        let task = &self.task_list[task_idx];
        self.current_task.set(task_idx);
        // SAFETY: the task's stack pointer came from `prepare` or from its
        // last switch back to us, and nothing else is running on that stack.
        unsafe {
            Arch::switch(self.scheduler_sp.as_ptr(), task.stack_pointer());
        }
        self.current_task.set(TaskId::INVALID_ID);
    }

    /// Go back to the scheduler loop, from the running task
    ///
    /// Must be called with interrupts disabled. Returns when the scheduler
    /// next picks this task.
    fn switch_to_scheduler(&self, task: &Task) {
        // SAFETY: `scheduler_sp` was saved by `switch_to`, which is waiting
        // for us to come back.
        unsafe {
            Arch::switch(task.stack_pointer_slot(), self.scheduler_sp.get());
        }
    }

    /// Give up the CPU, telling the scheduler when to resume us
    ///
    /// Must be called with interrupts disabled. A task that has stopped
    /// itself keeps its stopped state, and is not resumed.
    fn suspend(&self, runnable: Runnable, deadline: Option<C::Ticks>) {
        let task = self.current_record();
        if task.is_live() {
            task.set_runnable(runnable);
            task.set_wake_deadline(deadline);
            if deadline.is_some() {
                self.wake_deadline_update.set(true);
            }
        }
        self.switch_to_scheduler(task);
    }

    /// Suspend the current task on a predicate and optional deadline
    ///
    /// Returns false if we were woken by the deadline.
    fn wait_on(&self, predicate: &dyn Fn() -> bool, deadline: Option<C::Ticks>) -> bool {
        let predicate: *const (dyn Fn() -> bool + '_) = predicate;
        // SAFETY: Only the lifetime changes. The scheduler only evaluates the
        // predicate while we are suspended below, and we reset the slot
        // before `predicate` goes out of scope.
        let predicate: *const (dyn Fn() -> bool + 'static) =
            unsafe { core::mem::transmute(predicate) };
        self.suspend(Runnable::Until(predicate), deadline);

        let task = self.current_record();
        task.set_runnable(Runnable::AlwaysTrue);
        match (deadline, task.wake_deadline::<C::Ticks>()) {
            // no timeout requested
            (None, _) => true,
            // the predicate won before the deadline
            (Some(_), Some(_)) => {
                task.set_wake_deadline::<C::Ticks>(None);
                self.wake_deadline_update.set(true);
                true
            }
            // the deadline cleared itself
            (Some(_), None) => false,
        }
    }

    /// Write guard words at the bottom of every stack
    fn init_guards(&self) {
        if C::STACK_GUARD_WORDS == 0 {
            return;
        }
        let guard_size = C::STACK_GUARD_WORDS * core::mem::size_of::<usize>();
        for (task_idx, task) in self.task_list.iter().enumerate() {
            if task.stack_len() < Arch::MIN_STACK_SIZE + guard_size {
                panic!("Stack too small for guard in {}", TaskId(task_idx));
            }
            debug!(
                "Guarding {} stack @ 0x{=usize:08x}",
                TaskId(task_idx),
                task.stack_bottom() as usize
            );
            // SAFETY: the guard fits below any frame we build
            unsafe {
                guard::init(task.stack_bottom(), C::STACK_GUARD_WORDS);
            }
        }
        let interrupt_stack = C::interrupt_stack();
        if !interrupt_stack.is_null() {
            // SAFETY: the configuration says this is the bottom of the
            // interrupt stack, which we are nowhere near
            unsafe {
                guard::init(interrupt_stack, C::STACK_GUARD_WORDS);
            }
        }
    }

    /// Check the guard words of the task we just switched away from, and of
    /// the interrupt stack
    fn check_guards(&self, task_idx: usize) {
        if C::STACK_GUARD_WORDS == 0 {
            return;
        }
        let task = &self.task_list[task_idx];
        // SAFETY: written by `init_guards`
        if !unsafe { guard::check(task.stack_bottom(), C::STACK_GUARD_WORDS) } {
            error!("Stack overflow in {}", TaskId(task_idx));
            C::stack_overflow(Some(TaskId(task_idx)));
        }
        let interrupt_stack = C::interrupt_stack();
        // SAFETY: written by `init_guards`
        if !interrupt_stack.is_null()
            && !unsafe { guard::check(interrupt_stack, C::STACK_GUARD_WORDS) }
        {
            error!("Stack overflow in interrupt stack");
            C::stack_overflow(None);
        }
    }
}

/// Where every task starts
///
/// Enables interrupts, runs the task's entry function, and stops the task
/// when that returns.
extern "C" fn bootstrap<C: Config>(scheduler: usize) -> ! {
    // SAFETY: `prepare` passed us the address of a `'static` scheduler
    let scheduler = unsafe { &*(scheduler as *const Scheduler<C>) };
    let task = scheduler.current_record();
    let entry_fn = task.entry_fn();

    C::Platform::set_interrupts(true);
    entry_fn();
    C::Platform::set_interrupts(false);

    debug!("{} finished", scheduler.current_task_id());
    task.stop();
    // A stopped task is never resumed, only restarted with a fresh frame
    loop {
        scheduler.switch_to_scheduler(task);
    }
}

// End of File
