//! A demo of tasks taking turns without any sleeping
//!
//! The producer yields after each item, and the consumer waits for the next
//! item to turn up - with a timeout, in case it never does.

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering};

use pets::{Scheduler, millis};
use pets_demos::Board;

pets::task_list! {
    config = Board;
    static TASK_LIST = [
        Producer(producer, 1024),
        Consumer(consumer, 1024),
    ];
}

static SCHEDULER: Scheduler<Board> = Scheduler::new(&TASK_LIST);

defmt::timestamp!(
    "{=u32:010} {}",
    SCHEDULER.current_time(),
    SCHEDULER.current_task_id()
);

/// The last item produced
static PRODUCED: AtomicU32 = AtomicU32::new(0);

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

/// Makes ten items, one per turn, then goes quiet
fn producer() {
    SCHEDULER.start::<Consumer>();
    for item in 1..=10 {
        defmt::info!("Made {=u32}", item);
        PRODUCED.store(item, Ordering::Relaxed);
        SCHEDULER.yield_now();
    }
    // hold on to the CPU for a bit, so the consumer sees the time pass
    SCHEDULER.delay(SCHEDULER.ticks(millis(20)));
}

/// Takes items until they stop coming
fn consumer() {
    let mut seen = 0;
    loop {
        let arrived = SCHEDULER.wait_for(SCHEDULER.ticks(millis(100)), || {
            PRODUCED.load(Ordering::Relaxed) != seen
        });
        if !arrived {
            defmt::info!("Nothing for 100 ms, after {=u32} items", seen);
            pets_demos::exit();
        }
        seen = PRODUCED.load(Ordering::Relaxed);
        defmt::info!("Took {=u32}", seen);
    }
}

// End of File
