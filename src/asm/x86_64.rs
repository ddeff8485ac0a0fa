//! x86-64 System V code
//!
//! Used for running the scheduler on a host machine, e.g. under test.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{Architecture, BootstrapFn};
use crate::StackPusher;

/// The x86-64 System V back-end
///
/// The callee-saved registers are RBX, RBP and R12 to R15. A saved frame
/// is, from the lowest address: R15, R14, R13, R12, RBX, RBP, return address.
pub(crate) struct Arch;

impl Architecture for Arch {
    const FRAME_WORDS: usize = 7;

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

        // `ret` pops this, leaving RSP 16-byte aligned in the trampoline, so
        // its `call` gives the callee the alignment the ABI expects
        stack_pusher.push(trampoline as usize);
        // RBP - zero terminates frame-pointer walks
        stack_pusher.push(0);
        // RBX
        stack_pusher.push(arg);
        // R12
        stack_pusher.push(entry as usize);
        // R13 - R15
        stack_pusher.push_zeros(3);

        stack_pusher.current()
    }
}

/// Switch stacks
///
/// RDI holds where to save the old stack pointer, RSI holds the new one.
///
/// It is a naked function because we do not want the compiler pushing
/// anything else to the stack and re-using registers containing precious task
/// state.
#[unsafe(naked)]
unsafe extern "C" fn switch_context(_save_sp: *mut usize, _load_sp: usize) {
    core::arch::naked_asm!(
        "push rbp",
        "push rbx",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov [rdi], rsp",
        "mov rsp, rsi",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbx",
        "pop rbp",
        "ret",
    );
}

/// The first code a new task runs
///
/// Calls the bootstrap (in R12) with its argument (in RBX). The bootstrap
/// never returns.
#[unsafe(naked)]
unsafe extern "C" fn trampoline() -> ! {
    core::arch::naked_asm!(
        "mov rdi, rbx",
        "call r12",
        "ud2",
    );
}

// End of File
