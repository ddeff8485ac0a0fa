//! Appropriate assembly language routines for the architecture
//!
//! Each back-end provides the same small surface, as an [`Architecture`]
//! impl on a type called `Arch`:
//!
//! * a naked routine that pushes the callee-saved registers, stores the
//!   stack pointer, loads another stack pointer, pops the callee-saved
//!   registers and returns - all in one go, because the pushes, the swap
//!   and the pops cannot be separate Rust functions
//! * a builder for the frame a task's first switch will pop, which "returns"
//!   into a trampoline that calls the bootstrap function

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// The function a new task's trampoline calls, with the word given to
/// [`Architecture::build_initial_frame`]
pub(crate) type BootstrapFn = extern "C" fn(usize) -> !;

/// An architecture back-end
pub(crate) trait Architecture {
    /// How many words a full register save occupies, including the return
    /// address
    const FRAME_WORDS: usize;

    /// The required stack pointer alignment, in bytes
    const STACK_ALIGN: usize;

    /// The smallest stack we can run a task on: one saved frame, plus
    /// alignment slack, plus some headroom for the bootstrap
    const MIN_STACK_SIZE: usize =
        (Self::FRAME_WORDS + 16) * core::mem::size_of::<usize>() + Self::STACK_ALIGN;

    /// Save the current context's registers and stack pointer (into
    /// `*save_sp`), then resume the context whose stack pointer is `load_sp`
    ///
    /// Returns when something switches back to the saved context.
    ///
    /// # Safety
    ///
    /// Interrupts must be disabled. `load_sp` must have come from a previous
    /// `switch` or from `build_initial_frame`, and the stack it points into
    /// must not be in use.
    unsafe fn switch(save_sp: *mut usize, load_sp: usize);

    /// Build a frame at the top of a stack that, when switched to, calls
    /// `entry(arg)`
    ///
    /// Returns the stack pointer to pass to `switch`.
    ///
    /// # Safety
    ///
    /// There must be at least `FRAME_WORDS` words, plus `STACK_ALIGN` bytes,
    /// of unused stack below `stack_top`.
    unsafe fn build_initial_frame(stack_top: *mut usize, entry: BootstrapFn, arg: usize)
    -> *mut usize;
}

#[cfg(all(target_arch = "x86_64", not(windows)))]
mod x86_64;

#[cfg(all(target_arch = "x86_64", not(windows)))]
pub(crate) use x86_64::Arch;

#[cfg(target_arch = "aarch64")]
mod aarch64;

#[cfg(target_arch = "aarch64")]
pub(crate) use aarch64::Arch;

#[cfg(all(
    target_arch = "arm",
    arm_abi = "eabi",
    any(arm_architecture = "v6-m", arm_architecture = "v8-m.base")
))]
mod eabi_v6;

#[cfg(all(
    target_arch = "arm",
    arm_abi = "eabi",
    any(arm_architecture = "v6-m", arm_architecture = "v8-m.base")
))]
pub(crate) use eabi_v6::Arch;

#[cfg(all(
    target_arch = "arm",
    arm_abi = "eabi",
    not(any(arm_architecture = "v6-m", arm_architecture = "v8-m.base"))
))]
mod eabi;

#[cfg(all(
    target_arch = "arm",
    arm_abi = "eabi",
    not(any(arm_architecture = "v6-m", arm_architecture = "v8-m.base"))
))]
pub(crate) use eabi::Arch;

#[cfg(all(target_arch = "arm", arm_abi = "eabihf"))]
mod eabihf;

#[cfg(all(target_arch = "arm", arm_abi = "eabihf"))]
pub(crate) use eabihf::Arch;

#[cfg(not(any(
    all(target_arch = "x86_64", not(windows)),
    target_arch = "aarch64",
    all(target_arch = "arm", any(arm_abi = "eabi", arm_abi = "eabihf"))
)))]
compile_error!("pets has no context switch for this architecture");

#[cfg(test)]
mod tests {
    use super::{Architecture, Arch};

    extern "C" fn never(_arg: usize) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    #[test]
    fn initial_frame_fits_and_is_aligned() {
        let mut buffer = [0usize; 64];
        let top = buffer.as_mut_ptr_range().end;
        let sp = unsafe { Arch::build_initial_frame(top, never, 0x5A5A) };
        let used = top as usize - sp as usize;
        assert!(used >= Arch::FRAME_WORDS * core::mem::size_of::<usize>());
        assert!(used < (Arch::FRAME_WORDS + 2) * core::mem::size_of::<usize>() + Arch::STACK_ALIGN);
        // the argument and the entry function both appear in the frame
        let frame = unsafe { core::slice::from_raw_parts(sp, Arch::FRAME_WORDS) };
        assert!(frame.contains(&0x5A5A));
        assert!(frame.contains(&(never as usize)));
    }
}

// End of File
