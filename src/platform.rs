//! Holds the [`Platform`] trait, and the Cortex-M implementation of it

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

/// The primitives the scheduler needs from the environment it runs in
///
/// These are all associated functions - there is one CPU, so there is no
/// object to call them on.
pub trait Platform {
    /// Are interrupts currently enabled?
    fn interrupts_enabled() -> bool;

    /// Enable or disable interrupts, returning the previous state
    ///
    /// Must act as a compiler fence, so memory accesses are not moved across
    /// the change.
    fn set_interrupts(enabled: bool) -> bool;

    /// Suspend the CPU until an interrupt is pending
    ///
    /// Entered with interrupts disabled and must return with interrupts
    /// disabled. The pending interrupt does not need to have been serviced on
    /// return - the scheduler briefly enables interrupts afterwards to let it
    /// run.
    fn sleep();
}

/// The [`Platform`] for Arm Cortex-M processors
///
/// Interrupt masking uses PRIMASK, and sleeping uses `WFI`. Call
/// [`Scheduler::tick`](crate::Scheduler::tick) from your `SysTick` handler.
#[cfg(target_arch = "arm")]
pub struct CortexM;

#[cfg(target_arch = "arm")]
impl Platform for CortexM {
    fn interrupts_enabled() -> bool {
        cortex_m::register::primask::read().is_active()
    }

    fn set_interrupts(enabled: bool) -> bool {
        let was_enabled = Self::interrupts_enabled();
        if enabled {
            // SAFETY: The scheduler never enables interrupts inside a
            // critical section it relies on
            unsafe {
                cortex_m::interrupt::enable();
            }
            // Make sure any pending interrupts fire now
            cortex_m::asm::isb();
        } else {
            cortex_m::interrupt::disable();
        }
        was_enabled
    }

    fn sleep() {
        cortex_m::asm::wfi();
        // Some STM32 parts corrupt the pipeline state after a WFI with
        // interrupts masked. An ISB fixes it.
        cortex_m::asm::isb();
    }
}

// End of File
