// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use m7boot_core::peripherals::gpio::{
    AFRH, AFRL, BSRR, IDR, LCKR, MODER, ODR, OSPEEDR, OTYPER, PUPDR,
};
use std::any::Any;

/// STM32F7 GPIO port.
#[derive(Debug, Default)]
pub struct SimGpio {
    moder: u32,
    otyper: u32,
    ospeedr: u32,
    pupdr: u32,
    idr: u32,
    odr: u32,
    lckr: u32,
    afrl: u32,
    afrh: u32,
}

impl SimGpio {
    /// Port with all-zero reset values (ports C and up).
    pub fn new() -> Self {
        Self::default()
    }

    /// Port A, whose reset state routes PA13/PA14/PA15 to the debug port.
    pub fn port_a() -> Self {
        Self {
            moder: 0xA800_0000,
            ospeedr: 0x0C00_0000,
            pupdr: 0x6400_0000,
            ..Default::default()
        }
    }

    /// Drives the external level of `pin`, as seen through IDR.
    pub fn set_input(&mut self, pin: u8, high: bool) {
        if high {
            self.idr |= 1 << pin;
        } else {
            self.idr &= !(1 << pin);
        }
    }

    pub fn register(&self, offset: u64) -> u32 {
        match offset as usize {
            MODER => self.moder,
            OTYPER => self.otyper,
            OSPEEDR => self.ospeedr,
            PUPDR => self.pupdr,
            IDR => self.idr,
            ODR => self.odr,
            LCKR => self.lckr,
            AFRL => self.afrl,
            AFRH => self.afrh,
            _ => 0,
        }
    }
}

impl crate::Peripheral for SimGpio {
    fn read(&mut self, offset: u64) -> SimResult<u32> {
        Ok(self.register(offset))
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset as usize {
            MODER => self.moder = value,
            OTYPER => self.otyper = value & 0xFFFF,
            OSPEEDR => self.ospeedr = value,
            PUPDR => self.pupdr = value,
            ODR => self.odr = value & 0xFFFF,
            BSRR => {
                // Set wins over reset when both bits are written.
                let set = value & 0xFFFF;
                let reset = value >> 16;
                self.odr = (self.odr & !reset) | set;
            }
            LCKR => self.lckr = value,
            AFRL => self.afrl = value,
            AFRH => self.afrh = value,
            _ => {} // IDR is read-only
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}
