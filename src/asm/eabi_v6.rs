//! Armv6-M EABI code

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{Architecture, BootstrapFn};
use crate::StackPusher;

/// The back-end for Armv6-M or Armv8-M Baseline EABI
///
/// Uses only the Armv6-M subset instructions, which cannot push R8 to R11
/// directly, so they go via R4 to R7. A saved frame is, from the lowest
/// address: R8 - R11, R3, R4 - R7, LR. R3 is padding to keep the stack 8-byte
/// aligned.
pub(crate) struct Arch;

impl Architecture for Arch {
    const FRAME_WORDS: usize = 10;

    const STACK_ALIGN: usize = 8;

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

        // LR - popped into PC. Function pointers already have the Thumb bit set.
        stack_pusher.push(trampoline as usize);
        // R6 - R7
        stack_pusher.push_zeros(2);
        // R5
        stack_pusher.push(entry as usize);
        // R4
        stack_pusher.push(arg);
        // R3
        stack_pusher.push(0);
        // R8 - R11
        stack_pusher.push_zeros(4);

        stack_pusher.current()
    }
}

/// Switch stacks
///
/// R0 holds where to save the old stack pointer, R1 holds the new one.
///
/// It is a naked function because we do not want the compiler pushing
/// anything else to the stack and re-using registers containing precious task
/// state.
#[unsafe(naked)]
unsafe extern "C" fn switch_context(_save_sp: *mut usize, _load_sp: usize) {
    core::arch::naked_asm!(r#"
    // Stack the outgoing context
    push    {{ r3 - r7, lr }}
    mov     r4, r8
    mov     r5, r9
    mov     r6, r10
    mov     r7, r11
    push    {{ r4 - r7 }}

    // Save its stack pointer
    mov     r2, sp
    str     r2, [r0]

    // Load the incoming stack pointer
    mov     sp, r1

    // Unstack the incoming context, returning into it
    pop     {{ r4 - r7 }}
    mov     r8, r4
    mov     r9, r5
    mov     r10, r6
    mov     r11, r7
    pop     {{ r3 - r7, pc }}
    "#);
}

/// The first code a new task runs
///
/// Calls the bootstrap (in R5) with its argument (in R4). The bootstrap
/// never returns.
#[unsafe(naked)]
unsafe extern "C" fn trampoline() -> ! {
    core::arch::naked_asm!(r#"
    mov     r0, r4
    blx     r5
    udf     #0
    "#);
}

// End of File
