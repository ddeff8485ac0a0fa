//! Holds the [`Interrupts`] scoped guard

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::marker::PhantomData;

use crate::Platform;

/// Records the interrupt-enable state and puts it back when dropped
///
/// Guards nest like a stack: each one restores exactly the state it found,
/// so inner guards never re-enable interrupts an outer guard disabled.
///
/// The guard stays valid across a context switch. The task that created it
/// is suspended with the guard still on its stack, and the guard is dropped
/// when that task resumes and leaves the scope.
#[must_use = "interrupts are restored when the guard is dropped"]
pub struct Interrupts<P: Platform> {
    was_enabled: bool,
    /// Not `Send` or `Sync` - interrupt state belongs to the current context
    _platform: PhantomData<*const P>,
}

impl<P: Platform> Interrupts<P> {
    /// Record the current state, changing nothing
    pub fn new() -> Interrupts<P> {
        Interrupts {
            was_enabled: P::interrupts_enabled(),
            _platform: PhantomData,
        }
    }

    /// Record the current state, then disable interrupts
    pub fn disabled() -> Interrupts<P> {
        Interrupts {
            was_enabled: P::set_interrupts(false),
            _platform: PhantomData,
        }
    }

    /// Record the current state, then enable interrupts
    pub fn enabled() -> Interrupts<P> {
        Interrupts {
            was_enabled: P::set_interrupts(true),
            _platform: PhantomData,
        }
    }

    /// Enable interrupts
    pub fn enable(&self) {
        P::set_interrupts(true);
    }

    /// Disable interrupts
    pub fn disable(&self) {
        P::set_interrupts(false);
    }

    /// Put back the state recorded when the guard was made
    pub fn restore(&self) {
        P::set_interrupts(self.was_enabled);
    }

    /// Were interrupts enabled when this guard was made?
    pub fn were_enabled(&self) -> bool {
        self.was_enabled
    }
}

impl<P: Platform> Default for Interrupts<P> {
    fn default() -> Self {
        Interrupts::new()
    }
}

impl<P: Platform> Drop for Interrupts<P> {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    static ENABLED: AtomicBool = AtomicBool::new(true);
    static CHANGES: AtomicUsize = AtomicUsize::new(0);

    struct FakeCpu;

    impl Platform for FakeCpu {
        fn interrupts_enabled() -> bool {
            ENABLED.load(Ordering::SeqCst)
        }

        fn set_interrupts(enabled: bool) -> bool {
            CHANGES.fetch_add(1, Ordering::SeqCst);
            ENABLED.swap(enabled, Ordering::SeqCst)
        }

        fn sleep() {}
    }

    // All the assertions share one fake CPU, so they live in one test
    #[test]
    fn guards_restore_and_nest() {
        ENABLED.store(true, Ordering::SeqCst);
        {
            let outer = Interrupts::<FakeCpu>::disabled();
            assert!(outer.were_enabled());
            assert!(!FakeCpu::interrupts_enabled());
            {
                let inner = Interrupts::<FakeCpu>::disabled();
                assert!(!inner.were_enabled());
                inner.enable();
                assert!(FakeCpu::interrupts_enabled());
            }
            // the inner guard put back what it found
            assert!(!FakeCpu::interrupts_enabled());
            outer.enable();
            outer.disable();
            assert!(!FakeCpu::interrupts_enabled());
        }
        assert!(FakeCpu::interrupts_enabled());

        ENABLED.store(false, Ordering::SeqCst);
        {
            let guard = Interrupts::<FakeCpu>::enabled();
            assert!(FakeCpu::interrupts_enabled());
            guard.restore();
            assert!(!FakeCpu::interrupts_enabled());
            guard.enable();
        }
        assert!(!FakeCpu::interrupts_enabled());

        let before = CHANGES.load(Ordering::SeqCst);
        let observer = Interrupts::<FakeCpu>::new();
        assert!(!observer.were_enabled());
        assert_eq!(CHANGES.load(Ordering::SeqCst), before);
    }
}

// End of File
