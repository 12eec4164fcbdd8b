// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use bitflags::bitflags;

pub const USART1_BASE: usize = 0x4001_1000;

pub const SR: usize = 0x00;
pub const DR: usize = 0x04;
pub const BRR: usize = 0x08;
pub const CR1: usize = 0x0C;
pub const CR2: usize = 0x10;
pub const CR3: usize = 0x14;

/// Bytes covered by the register block.
pub const BLOCK_SIZE: usize = 0x18;

/// BRR holds a 16-bit divisor.
pub const BRR_MAX: u32 = 0xFFFF;

bitflags! {
    /// Status register.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u32 {
        /// Transmit data register empty.
        const TXE = 1 << 7;
        /// Transmission complete.
        const TC = 1 << 6;
        /// Read data register not empty.
        const RXNE = 1 << 5;
    }
}

bitflags! {
    /// Control register 1.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Control1: u32 {
        const UE = 1 << 13;
        const TE = 1 << 3;
        const RE = 1 << 2;
    }
}
