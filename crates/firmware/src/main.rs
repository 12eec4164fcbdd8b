// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#![no_std]
#![no_main]

use panic_halt as _;

use m7boot_core::board::{self, Peripherals};
use m7boot_core::console::Console;
use m7boot_core::halt::Halt;
use m7boot_core::{DelayMs, Uart};

mod startup;

/// Busy-wait calibrated against [`board::CORE_CLOCK_HZ`]. Roughly right,
/// never measured.
struct CycleDelay;

impl DelayMs for CycleDelay {
    fn delay_ms(&mut self, ms: u32) {
        let per_ms = board::CORE_CLOCK_HZ / 1000;
        for _ in 0..ms {
            cortex_m::asm::delay(per_ms);
        }
    }
}

fn app_main() {
    let Some(mut p) = Peripherals::take() else {
        Halt::Trapped.enter()
    };

    let uart = Uart::new(p.usart1).initialize(&mut p.rcc, &mut p.gpioa, &board::CONSOLE_UART);
    Console::new(uart, CycleDelay).run()
}
