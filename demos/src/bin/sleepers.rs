//! A simple demo showing how to use pets
//!
//! The main task starts three more, each of which periodically prints a
//! defmt log and then sleeps. After a while the main task stops them all.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use pets::{Scheduler, millis, secs};
use pets_demos::Board;

pets::task_list! {
    config = Board;
    static TASK_LIST = [
        Main(main_task, 2048),
        Rabbit(rabbits, 1024),
        Hamster(hamsters, 1024),
        Cat(cats, 1024),
    ];
}

static SCHEDULER: Scheduler<Board> = Scheduler::new(&TASK_LIST);

defmt::timestamp!(
    "{=u32:010} {}",
    SCHEDULER.current_time(),
    SCHEDULER.current_task_id()
);

#[cortex_m_rt::entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();
    defmt::info!("Hello!");
    pets_demos::start_tick(cp.SYST);
    SCHEDULER.run();
}

#[cortex_m_rt::exception]
fn SysTick() {
    SCHEDULER.tick();
}

/// Starts the pets, lets them play, then puts them away
fn main_task() {
    SCHEDULER.start::<(Rabbit, Hamster, Cat)>();
    SCHEDULER.sleep(SCHEDULER.ticks(secs(2)));
    defmt::info!("Bed time");
    SCHEDULER.stop::<(Rabbit, Hamster, Cat)>();
    SCHEDULER.wait(|| !SCHEDULER.running::<(Rabbit, Hamster, Cat)>());
    pets_demos::exit();
}

/// Our 'rabbit' task
fn rabbits() {
    loop {
        defmt::info!("Rabbit! (back in 50 ms)");
        SCHEDULER.sleep(SCHEDULER.ticks(millis(50)));
    }
}

/// Our 'hamster' task
fn hamsters() {
    loop {
        defmt::info!("Hamster! (back in 100 ms)");
        SCHEDULER.sleep(SCHEDULER.ticks(millis(100)));
    }
}

/// Our 'cat' task
fn cats() {
    loop {
        defmt::info!("Cat! (back in 30 ms)");
        SCHEDULER.sleep(SCHEDULER.ticks(millis(30)));
    }
}

// End of File
