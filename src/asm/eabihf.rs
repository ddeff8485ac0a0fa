//! Armv7-M EABIHF code

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use super::{Architecture, BootstrapFn};
use crate::StackPusher;

/// The back-end for Armv7-M or Armv8-M Mainline EABIHF
///
/// The callee-saved registers are R4 to R11 and S16 to S31. We also push R3
/// as padding, to keep the stack 8-byte aligned as AAPCS requires. A saved
/// frame is, from the lowest address: S16 - S31, R3, R4 - R11, LR.
///
/// Because this is a function call and not an exception, we always save the
/// high FPU registers. There is no lazy-stacking state to consult.
pub(crate) struct Arch;

impl Architecture for Arch {
    const FRAME_WORDS: usize = 26;

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
        // R6 - R11
        stack_pusher.push_zeros(6);
        // R5
        stack_pusher.push(entry as usize);
        // R4
        stack_pusher.push(arg);
        // R3
        stack_pusher.push(0);
        // S16 - S31
        stack_pusher.push_zeros(16);

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
    // Workaround https://github.com/rust-lang/rust/issues/127269
    .fpu vfpv3

    // Stack the outgoing context
    push    {{ r3 - r11, lr }}
    vpush   {{ s16 - s31 }}

    // Save its stack pointer
    mov     r2, sp
    str     r2, [r0]

    // Load the incoming stack pointer
    mov     sp, r1

    // Unstack the incoming context, returning into it
    vpop    {{ s16 - s31 }}
    pop     {{ r3 - r11, pc }}
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
