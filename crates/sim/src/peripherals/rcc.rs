// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use m7boot_core::peripherals::rcc::{AHB1ENR, APB2ENR};

/// Reset value of AHB1ENR on STM32F7 (DTCMRAMEN set).
pub const AHB1ENR_RESET: u32 = 0x0010_0000;

/// Clock-enable half of the reset and clock controller. Every other RCC
/// register reads as zero and ignores writes.
#[derive(Debug)]
pub struct SimRcc {
    ahb1enr: u32,
    apb2enr: u32,
}

impl Default for SimRcc {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRcc {
    pub fn new() -> Self {
        Self {
            ahb1enr: AHB1ENR_RESET,
            apb2enr: 0,
        }
    }

    /// True when every bit of `mask` is set in the enable register at
    /// `offset`.
    pub fn is_enabled(&self, offset: u64, mask: u32) -> bool {
        let reg = match offset as usize {
            AHB1ENR => self.ahb1enr,
            APB2ENR => self.apb2enr,
            _ => 0,
        };
        reg & mask == mask
    }
}

impl crate::Peripheral for SimRcc {
    fn read(&mut self, offset: u64) -> SimResult<u32> {
        Ok(match offset as usize {
            AHB1ENR => self.ahb1enr,
            APB2ENR => self.apb2enr,
            _ => 0,
        })
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset as usize {
            AHB1ENR => self.ahb1enr = value,
            APB2ENR => self.apb2enr = value,
            _ => {}
        }
        Ok(())
    }
}
