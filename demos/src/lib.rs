//! Common board configuration and panic/fault handlers for the demos

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]

use cortex_m::peripheral::{SYST, syst::SystClkSource};
use defmt_semihosting as _;

/// The QEMU LM3S6965 runs its core clock at 12 MHz
pub const CORE_CLOCK_HZ: u32 = 12_000_000;

/// How often the scheduler ticks
pub const TICK_HZ: u32 = 100;

/// The scheduler configuration all the demos use
pub struct Board;

impl pets::Config for Board {
    type Platform = pets::CortexM;
    type Ticks = u32;
    const TICK_PERIOD: pets::Ratio = pets::Ratio::from_hz(TICK_HZ as u64);
    const STACK_GUARD_WORDS: usize = 4;

    fn stack_overflow(task: Option<pets::TaskId>) {
        match task {
            Some(task_id) => panic!("Stack overflow in {}", task_id),
            None => panic!("Stack overflow in interrupt stack"),
        }
    }
}

/// Set SysTick running at [`TICK_HZ`]
///
/// The demo must provide a `SysTick` exception handler that calls
/// [`pets::Scheduler::tick`].
pub fn start_tick(mut syst: SYST) {
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(CORE_CLOCK_HZ / TICK_HZ - 1);
    syst.clear_current();
    syst.enable_interrupt();
    syst.enable_counter();
}

/// Stop QEMU with a success code
pub fn exit() -> ! {
    semihosting::process::exit(0);
}

/// Called when a panic occurs.
///
/// Logs the panic to defmt and then crashes the CPU.
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    defmt::println!("PANIC: {}", defmt::Debug2Format(info));
    cortex_m::asm::udf();
}

/// Called when a HardFault occurs.
///
/// Logs the fault to defmt and then crashes the CPU.
#[cortex_m_rt::exception]
unsafe fn HardFault(info: &cortex_m_rt::ExceptionFrame) -> ! {
    defmt::println!("FAULT: {}", defmt::Debug2Format(info));
    cortex_m::asm::udf();
}

// End of File
