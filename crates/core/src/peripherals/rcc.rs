// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Reset and clock control: only the two clock-gate registers are used.

use bitflags::bitflags;

pub const RCC_BASE: usize = 0x4002_3800;
pub const BLOCK_SIZE: usize = 0x400;

/// AHB1 peripheral clock enable register.
pub const AHB1ENR: usize = 0x30;
/// APB2 peripheral clock enable register.
pub const APB2ENR: usize = 0x44;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ahb1Enable: u32 {
        const GPIOAEN = 1 << 0;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Apb2Enable: u32 {
        const USART1EN = 1 << 4;
    }
}
