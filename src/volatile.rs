//! Holds the [`Volatile`] cell type

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::cell::UnsafeCell;

/// A cell whose contents are only ever accessed with volatile loads and stores
///
/// Used for every field the tick interrupt shares with mainline code. There
/// are no locks: mainline code only touches these fields with interrupts
/// disabled, and the interrupt handler cannot be interrupted by mainline code.
#[repr(transparent)]
pub(crate) struct Volatile<T: Copy> {
    value: UnsafeCell<T>,
}

impl<T: Copy> Volatile<T> {
    /// Create a new cell holding `value`
    pub(crate) const fn new(value: T) -> Volatile<T> {
        Volatile {
            value: UnsafeCell::new(value),
        }
    }

    /// Read the current value
    #[inline]
    pub(crate) fn get(&self) -> T {
        // SAFETY: the pointer comes from our own UnsafeCell so is valid and
        // aligned. See the type-level docs for why there is no tearing.
        unsafe { self.value.get().read_volatile() }
    }

    /// Replace the current value
    #[inline]
    pub(crate) fn set(&self, value: T) {
        // SAFETY: as for `get`
        unsafe { self.value.get().write_volatile(value) }
    }

    /// Get a raw pointer to the contents, for use by assembly code
    #[inline]
    pub(crate) const fn as_ptr(&self) -> *mut T {
        self.value.get()
    }
}

/// SAFETY: We only run on a single core. Concurrent access only comes from an
/// interrupt handler, and mainline code masks interrupts around every
/// read-modify-write sequence.
unsafe impl<T: Copy> Sync for Volatile<T> {}

// End of File
