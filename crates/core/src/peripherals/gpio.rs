// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::RegisterBlock;

pub const GPIOA_BASE: usize = 0x4002_0000;

pub const MODER: usize = 0x00;
pub const OTYPER: usize = 0x04;
pub const OSPEEDR: usize = 0x08;
pub const PUPDR: usize = 0x0C;
pub const IDR: usize = 0x10;
pub const ODR: usize = 0x14;
pub const BSRR: usize = 0x18;
pub const LCKR: usize = 0x1C;
pub const AFRL: usize = 0x20;
pub const AFRH: usize = 0x24;

pub const BLOCK_SIZE: usize = 0x28;
pub const PINS: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Mode {
    Input = 0b00,
    Output = 0b01,
    Alternate = 0b10,
    Analog = 0b11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Speed {
    Low = 0b00,
    Medium = 0b01,
    High = 0b10,
    VeryHigh = 0b11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Pull {
    None = 0b00,
    Up = 0b01,
    Down = 0b10,
}

/// Routes `pin` to alternate function `af`, read-modify-write on every
/// register so the other fifteen pins keep their configuration.
pub fn configure_alternate<R: RegisterBlock>(gpio: &mut R, pin: u8, af: u8, speed: Speed, pull: Pull) {
    debug_assert!(pin < PINS && af < 16);

    let shift2 = u32::from(pin) * 2;
    gpio.modify(MODER, |v| (v & !(0b11 << shift2)) | ((Mode::Alternate as u32) << shift2));
    gpio.modify(OSPEEDR, |v| (v & !(0b11 << shift2)) | ((speed as u32) << shift2));
    gpio.modify(PUPDR, |v| (v & !(0b11 << shift2)) | ((pull as u32) << shift2));

    let afr = if pin < 8 { AFRL } else { AFRH };
    let shift4 = u32::from(pin % 8) * 4;
    gpio.modify(afr, |v| (v & !(0xF << shift4)) | (u32::from(af) << shift4));
}
