// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The demo application: a banner, then an endless counter/echo loop.

use crate::uart::{Uart, UartError};
use crate::{DelayMs, RegisterBlock};

pub const BANNER: &str = "\r\n\
========================================\r\n\
Cortex-M7 Hello World Example\r\n\
STM32F7xx Series\r\n\
UART Baud Rate: 115200\r\n\
========================================\r\n\
\r\n";

pub const COUNTER_PREFIX: &str = "Hello World from Cortex-M7! Counter: ";
pub const PROMPT: &str = "Type any character to continue...\r\n";
pub const ECHO_PREFIX: &str = "You typed: ";

/// Pause between iterations.
pub const PAUSE_MS: u32 = 1000;

/// Enough digits for `u32::MAX`.
pub const DECIMAL_DIGITS: usize = 10;

/// Renders `n` in decimal into the tail of `buf`, returns the used part.
pub fn format_decimal(mut n: u32, buf: &mut [u8; DECIMAL_DIGITS]) -> &[u8] {
    let mut at = buf.len();
    loop {
        at -= 1;
        buf[at] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    &buf[at..]
}

pub struct Console<R, D> {
    uart: Uart<R>,
    delay: D,
    counter: u32,
}

impl<R: RegisterBlock, D: DelayMs> Console<R, D> {
    pub fn new(uart: Uart<R>, delay: D) -> Self {
        Self {
            uart,
            delay,
            counter: 0,
        }
    }

    pub fn print_banner(&mut self) -> Result<(), UartError> {
        self.uart.send_string(BANNER)
    }

    /// One pass of the loop: counter line, prompt, read one byte, echo it,
    /// bump the counter, pause. Returns the byte read.
    pub fn step(&mut self) -> Result<u8, UartError> {
        let mut digits = [0u8; DECIMAL_DIGITS];
        self.uart.send_string(COUNTER_PREFIX)?;
        self.uart.send_bytes(format_decimal(self.counter, &mut digits))?;
        self.uart.send_string("\r\n")?;
        self.uart.send_string(PROMPT)?;

        let input = self.uart.receive_byte()?;
        self.uart.send_string(ECHO_PREFIX)?;
        self.uart.send_byte(input)?;
        self.uart.send_string("\r\n\r\n")?;

        self.counter = self.counter.wrapping_add(1);
        self.delay.delay_ms(PAUSE_MS);
        Ok(input)
    }

    /// Banner, then [`Console::step`] forever. A failed step (only possible
    /// under a bounded wait policy) is dropped and the loop carries on.
    pub fn run(mut self) -> ! {
        let _ = self.print_banner();
        loop {
            let _ = self.step();
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn into_parts(self) -> (Uart<R>, D) {
        (self.uart, self.delay)
    }
}
