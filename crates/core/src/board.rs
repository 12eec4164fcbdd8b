// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Reference board: STM32F7 at 216 MHz, console on USART1 (PA9 TX, PA10 RX,
//! AF7) at 115200 baud.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::bus::Mmio;
use crate::peripherals::{gpio, rcc, usart};
use crate::uart::{UartConfig, WaitPolicy};

/// Assumed core clock. The baud divisor and the delay loop are computed
/// from it and nothing measures it at runtime.
pub const CORE_CLOCK_HZ: u32 = 216_000_000;
pub const CONSOLE_BAUD: u32 = 115_200;

pub const VECTOR_TABLE_BASE: usize = 0x0800_0000;

pub const CONSOLE_UART: UartConfig = UartConfig {
    clock_hz: CORE_CLOCK_HZ,
    baud: CONSOLE_BAUD,
    tx_pin: 9,
    rx_pin: 10,
    alternate_function: 7,
    wait: WaitPolicy::Unbounded,
};

/// The register blocks the image owns, handed out once.
#[derive(Debug)]
pub struct Peripherals {
    pub rcc: Mmio,
    pub gpioa: Mmio,
    pub usart1: Mmio,
}

static TAKEN: AtomicBool = AtomicBool::new(false);

impl Peripherals {
    /// `Some` on the first call only.
    pub fn take() -> Option<Self> {
        if TAKEN.swap(true, Ordering::AcqRel) {
            return None;
        }
        // SAFETY: the flag guarantees a single set of handles.
        Some(unsafe { Self::steal() })
    }

    /// # Safety
    ///
    /// Bypasses the single-owner check; the caller must not use the result
    /// alongside handles obtained from [`Peripherals::take`].
    pub unsafe fn steal() -> Self {
        Self {
            rcc: Mmio::new(rcc::RCC_BASE),
            gpioa: Mmio::new(gpio::GPIOA_BASE),
            usart1: Mmio::new(usart::USART1_BASE),
        }
    }
}
