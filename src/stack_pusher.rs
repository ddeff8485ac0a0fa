//! Holds the [`StackPusher`] type and methods

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// A helper for pushing words into a full-descending stack
pub(crate) struct StackPusher(*mut usize);

impl StackPusher {
    /// Make a new full-descending stack from the given pointer
    ///
    /// The pointer is first rounded down to a multiple of `align` bytes. It
    /// will not write to the resulting address, but it will write
    /// immediately below it - because this is a Full Descending stack.
    ///
    /// # Safety
    ///
    /// There must be enough free space below the given pointer to accept all
    /// the items you are going to push.
    pub(crate) unsafe fn new(stack_top: *mut usize, align: usize) -> StackPusher {
        let misalignment = stack_top as usize % align;
        StackPusher(stack_top.wrapping_byte_sub(misalignment))
    }

    /// Push something onto the stack, decrementing the stack pointer
    pub(crate) fn push(&mut self, value: usize) {
        // SAFETY: the constructor's caller promised there was room
        unsafe {
            self.0 = self.0.offset(-1);
            self.0.write_volatile(value);
        }
    }

    /// Push `count` zero words
    pub(crate) fn push_zeros(&mut self, count: usize) {
        for _ in 0..count {
            self.push(0);
        }
    }

    /// Get the current stack value
    pub(crate) fn current(&self) -> *mut usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushes_downwards_from_aligned_top() {
        let mut buffer = [0usize; 8];
        let base = buffer.as_mut_ptr();
        // pretend the top is one word past the aligned end
        let top = unsafe { base.add(8) };
        let mut pusher = unsafe { StackPusher::new(top, core::mem::size_of::<usize>()) };
        pusher.push(0xAA);
        pusher.push_zeros(2);
        pusher.push(0xBB);
        assert_eq!(pusher.current(), unsafe { base.add(4) });
        assert_eq!(buffer[7], 0xAA);
        assert_eq!(buffer[4], 0xBB);
    }

    #[test]
    fn rounds_top_down() {
        let mut buffer = [0usize; 8];
        let base = buffer.as_mut_ptr();
        let align = 2 * core::mem::size_of::<usize>();
        let offset = (align - (base as usize % align)) % align;
        let aligned = base.wrapping_byte_add(offset);
        let odd_top = unsafe { aligned.add(5) };
        let pusher = unsafe { StackPusher::new(odd_top, align) };
        assert_eq!(pusher.current(), unsafe { aligned.add(4) });
    }
}

// End of File
