//! AArch64 AAPCS64 code
//!
//! Used for running the scheduler on a host machine, e.g. under test.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{Architecture, BootstrapFn};
use crate::StackPusher;

/// The AArch64 back-end
///
/// The callee-saved registers are X19 to X28, the frame pointer X29, the
/// link register X30 and the low halves of V8 to V15. A saved frame is, from
/// the lowest address: X19 - X28, X29, X30, D8 - D15.
pub(crate) struct Arch;

impl Architecture for Arch {
    const FRAME_WORDS: usize = 20;

    const STACK_ALIGN: usize = 16;

    #[inline(always)]
    unsafe fn switch(save_sp: *mut usize, load_sp: usize) {
        // SAFETY: passed on to our caller
        unsafe { switch_context(save_sp, load_sp) }
    }

    unsafe fn build_initial_frame(
        stack_top: *mut usize,
        entry: BootstrapFn,
        arg: usize,
    ) -> *mut usize {
        // SAFETY: our caller promised there is room
        let mut stack_pusher = unsafe { StackPusher::new(stack_top, Self::STACK_ALIGN) };

        // D8 - D15
        stack_pusher.push_zeros(8);
        // X30 - the switch returns here
        stack_pusher.push(trampoline as usize);
        // X29 - zero terminates frame-pointer walks
        stack_pusher.push(0);
        // X21 - X28
        stack_pusher.push_zeros(8);
        // X20
        stack_pusher.push(entry as usize);
        // X19
        stack_pusher.push(arg);

        stack_pusher.current()
    }
}

/// Switch stacks
///
/// X0 holds where to save the old stack pointer, X1 holds the new one.
///
/// It is a naked function because we do not want the compiler pushing
/// anything else to the stack and re-using registers containing precious task
/// state.
#[unsafe(naked)]
unsafe extern "C" fn switch_context(_save_sp: *mut usize, _load_sp: usize) {
    core::arch::naked_asm!(
        "sub sp, sp, #0xA0",
        "stp x19, x20, [sp, #0x00]",
        "stp x21, x22, [sp, #0x10]",
        "stp x23, x24, [sp, #0x20]",
        "stp x25, x26, [sp, #0x30]",
        "stp x27, x28, [sp, #0x40]",
        "stp x29, x30, [sp, #0x50]",
        "stp d8, d9, [sp, #0x60]",
        "stp d10, d11, [sp, #0x70]",
        "stp d12, d13, [sp, #0x80]",
        "stp d14, d15, [sp, #0x90]",
        "mov x9, sp",
        "str x9, [x0]",
        "mov sp, x1",
        "ldp x19, x20, [sp, #0x00]",
        "ldp x21, x22, [sp, #0x10]",
        "ldp x23, x24, [sp, #0x20]",
        "ldp x25, x26, [sp, #0x30]",
        "ldp x27, x28, [sp, #0x40]",
        "ldp x29, x30, [sp, #0x50]",
        "ldp d8, d9, [sp, #0x60]",
        "ldp d10, d11, [sp, #0x70]",
        "ldp d12, d13, [sp, #0x80]",
        "ldp d14, d15, [sp, #0x90]",
        "add sp, sp, #0xA0",
        "ret",
    );
}

/// The first code a new task runs
///
/// Calls the bootstrap (in X20) with its argument (in X19). The bootstrap
/// never returns.
#[unsafe(naked)]
unsafe extern "C" fn trampoline() -> ! {
    core::arch::naked_asm!(
        "mov x0, x19",
        "blr x20",
        "brk #0x1",
    );
}

// End of File
