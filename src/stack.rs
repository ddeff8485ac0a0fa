//! Holds the [`Stack`] type and the stack guard

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use core::cell::UnsafeCell;

/// A task stack, with the given size `LEN` bytes.
///
/// The value of `LEN` must be a multiple of the pointer size, which is
/// checked with an assert.
///
/// We align stacks on 16-byte boundaries, which satisfies AAPCS (8 bytes) as
/// well as the 64-bit host ABIs.
#[repr(align(16))]
pub struct Stack<const LEN: usize> {
    /// The memory reserved for the task stack
    contents: UnsafeCell<[u8; LEN]>,
}

impl<const LEN: usize> Stack<LEN> {
    /// Create a new stack
    pub const fn new() -> Self {
        assert!(LEN.is_multiple_of(core::mem::size_of::<usize>()));
        Self {
            contents: UnsafeCell::new([0u8; LEN]),
        }
    }

    /// Get the lowest address of the stack
    ///
    /// This is where the stack guard lives.
    pub const fn bottom(&self) -> *mut usize {
        self.contents.get() as *mut usize
    }

    /// Get the top of the stack
    pub const fn top(&self) -> *mut usize {
        // SAFETY: Pointing one past this object is allowed, as this is full
        // descending stack and we never write to the 'top' address - only
        // below it
        unsafe { self.contents.get().add(1) as *mut usize }
    }

    /// Get the size of the stack, in bytes
    pub const fn len(&self) -> usize {
        LEN
    }

    /// Is this a zero-sized stack?
    pub const fn is_empty(&self) -> bool {
        LEN == 0
    }
}

/// SAFETY: Our stack object only exposes pointers to itself, so is thread-safe
/// despite containing an `UnsafeCell`.
unsafe impl<const LEN: usize> Sync for Stack<LEN> {}

impl<const LEN: usize> Default for Stack<LEN> {
    fn default() -> Self {
        Stack::new()
    }
}

/// Sentinel words written at the low end of a stack
///
/// If a stack grows down far enough to overwrite these, we can spot it the
/// next time we switch away from the task.
pub mod guard {
    /// The value every guard word holds
    pub const MAGIC: usize = 0xCAFE_BABE_BABE_CAFE_u64 as usize;

    /// Fill `words` guard words starting at `bottom`
    ///
    /// Does nothing if `words` is zero.
    ///
    /// # Safety
    ///
    /// `bottom` must point to at least `words` writable, aligned words that
    /// nothing else is using.
    pub unsafe fn init(bottom: *mut usize, words: usize) {
        for idx in 0..words {
            // SAFETY: the caller promised the range is ours to write
            unsafe {
                bottom.add(idx).write_volatile(MAGIC);
            }
        }
    }

    /// Are all `words` guard words starting at `bottom` still intact?
    ///
    /// Always true if `words` is zero.
    ///
    /// # Safety
    ///
    /// `bottom` must point to at least `words` readable, aligned words.
    pub unsafe fn check(bottom: *const usize, words: usize) -> bool {
        (0..words).all(|idx| {
            // SAFETY: the caller promised the range is readable
            unsafe { bottom.add(idx).read_volatile() == MAGIC }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_geometry() {
        let stack = Stack::<256>::new();
        assert_eq!(stack.len(), 256);
        assert_eq!(stack.top() as usize - stack.bottom() as usize, 256);
        assert_eq!(stack.bottom() as usize % 16, 0);
        assert_eq!(stack.top() as usize % 16, 0);
    }

    #[test]
    fn guard_detects_a_scribble() {
        let stack = Stack::<256>::new();
        unsafe {
            assert!(guard::check(stack.bottom(), 0));
            assert!(!guard::check(stack.bottom(), 4));
            guard::init(stack.bottom(), 4);
            assert!(guard::check(stack.bottom(), 4));
            // word 4 is not part of the guard
            stack.bottom().add(4).write(0);
            assert!(guard::check(stack.bottom(), 4));
            stack.bottom().add(3).write(0x1234);
            assert!(!guard::check(stack.bottom(), 4));
            assert!(guard::check(stack.bottom(), 3));
        }
    }

    #[test]
    fn magic_matches_pointer_width() {
        #[cfg(target_pointer_width = "64")]
        assert_eq!(guard::MAGIC, 0xCAFE_BABE_BABE_CAFE);
        #[cfg(target_pointer_width = "32")]
        assert_eq!(guard::MAGIC, 0xBABE_CAFE);
    }
}

// End of File
