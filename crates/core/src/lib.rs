// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Boot runtime and polled UART driver for the STM32F7 reference board.
//!
//! Everything here is `no_std` and hardware-agnostic: register blocks are
//! reached through [`RegisterBlock`] handles, so the same driver runs against
//! real memory-mapped I/O ([`bus::Mmio`]) on the target and against the
//! simulated board in `m7boot-sim` on the host.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

pub mod board;
pub mod bus;
pub mod console;
pub mod halt;
pub mod memory;
pub mod peripherals;
pub mod reset;
pub mod uart;
pub mod vectors;


pub use halt::Halt;
pub use memory::{LayoutError, MemoryImage, Region};
pub use uart::{Uart, UartConfig, UartError, WaitPolicy};
pub use vectors::TrapTable;

/// A block of 32-bit memory-mapped registers addressed by byte offset.
pub trait RegisterBlock {
    fn read(&self, offset: usize) -> u32;
    fn write(&mut self, offset: usize, value: u32);

    /// Read-modify-write of a single register.
    fn modify<F: FnOnce(u32) -> u32>(&mut self, offset: usize, f: F) {
        let value = self.read(offset);
        self.write(offset, f(value));
    }

    fn set_bits(&mut self, offset: usize, mask: u32) {
        self.modify(offset, |v| v | mask);
    }

    fn clear_bits(&mut self, offset: usize, mask: u32) {
        self.modify(offset, |v| v & !mask);
    }
}

impl<T: RegisterBlock> RegisterBlock for &mut T {
    fn read(&self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

/// Millisecond busy-wait used by the console loop.
pub trait DelayMs {
    fn delay_ms(&mut self, ms: u32);
}
