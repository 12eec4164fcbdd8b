// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Polled, blocking USART driver.
//!
//! The peripheral starts [`Disabled`]; [`Uart::initialize`] consumes that
//! handle and returns an [`Enabled`] one, which is the only state the byte
//! operations exist for. There is no way back.
//!
//! Every wait is a busy-poll on the status register. Under
//! [`WaitPolicy::Unbounded`] (the reference configuration) a peripheral that
//! never becomes ready hangs the caller forever and no error is ever
//! returned. [`WaitPolicy::Bounded`] gives up after a fixed number of status
//! reads with [`UartError::NotReady`]; any real deployment wants that.

use core::marker::PhantomData;

use crate::peripherals::gpio::{self, Pull, Speed};
use crate::peripherals::rcc::{self, Ahb1Enable, Apb2Enable};
use crate::peripherals::usart::{Control1, Status, BRR, CR1, DR, SR};
use crate::RegisterBlock;

/// Type-state marker: clocks off, registers unprogrammed.
#[derive(Debug)]
pub struct Disabled;

/// Type-state marker: transmitter and receiver running.
#[derive(Debug)]
pub struct Enabled;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Spin until the flag is set, however long that takes.
    Unbounded,
    /// Read the status register at most `max_polls` times (at least once).
    Bounded { max_polls: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UartError {
    #[error("peripheral not ready: {flag:?} still clear after {polls} status reads")]
    NotReady { flag: Status, polls: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartConfig {
    /// Clock feeding the baud generator.
    pub clock_hz: u32,
    pub baud: u32,
    pub tx_pin: u8,
    pub rx_pin: u8,
    pub alternate_function: u8,
    pub wait: WaitPolicy,
}

impl UartConfig {
    pub const fn divisor(&self) -> u32 {
        baud_divisor(self.clock_hz, self.baud)
    }

    pub const fn achieved_baud(&self) -> u32 {
        achieved_baud(self.clock_hz, self.divisor())
    }
}

/// `clock / baud`, truncated.
///
/// The truncation error is accepted as is: at 216 MHz and 115200 baud the
/// division is exact (1875), other pairs land slightly fast. Check
/// [`achieved_baud`] rather than rounding here.
pub const fn baud_divisor(clock_hz: u32, baud: u32) -> u32 {
    clock_hz / baud
}

/// Bit rate the hardware really produces for a programmed divisor.
pub const fn achieved_baud(clock_hz: u32, divisor: u32) -> u32 {
    if divisor == 0 {
        0
    } else {
        clock_hz / divisor
    }
}

pub struct Uart<R, S = Enabled> {
    regs: R,
    wait: WaitPolicy,
    _state: PhantomData<S>,
}

impl<R: RegisterBlock> Uart<R, Disabled> {
    pub fn new(regs: R) -> Self {
        Self {
            regs,
            wait: WaitPolicy::Unbounded,
            _state: PhantomData,
        }
    }

    /// One-time bring-up: clock gates, pin muxing, divisor, enable.
    ///
    /// The clocks are switched on before any GPIO or USART register is
    /// touched; writes to a gated peripheral are lost. `rcc` and `gpio` are
    /// only borrowed, nothing here touches them again afterwards.
    pub fn initialize<C, G>(mut self, rcc: &mut C, gpio: &mut G, config: &UartConfig) -> Uart<R, Enabled>
    where
        C: RegisterBlock,
        G: RegisterBlock,
    {
        rcc.set_bits(rcc::AHB1ENR, Ahb1Enable::GPIOAEN.bits());
        rcc.set_bits(rcc::APB2ENR, Apb2Enable::USART1EN.bits());

        for pin in [config.tx_pin, config.rx_pin] {
            gpio::configure_alternate(gpio, pin, config.alternate_function, Speed::VeryHigh, Pull::None);
        }

        let divisor = config.divisor();
        debug!(
            divisor,
            achieved = config.achieved_baud(),
            requested = config.baud,
            "programming baud divisor"
        );

        self.regs.clear_bits(CR1, Control1::UE.bits());
        self.regs.write(BRR, divisor);
        self.regs.set_bits(CR1, (Control1::UE | Control1::TE | Control1::RE).bits());

        Uart {
            regs: self.regs,
            wait: config.wait,
            _state: PhantomData,
        }
    }
}

impl<R: RegisterBlock> Uart<R, Enabled> {
    /// Waits for TXE, writes the byte, then waits for TC before returning.
    pub fn send_byte(&mut self, byte: u8) -> Result<(), UartError> {
        self.wait_for(Status::TXE)?;
        self.regs.write(DR, u32::from(byte));
        self.wait_for(Status::TC)
    }

    /// Sends every byte in order. Nothing is appended.
    pub fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), UartError> {
        bytes.iter().try_for_each(|&b| self.send_byte(b))
    }

    pub fn send_string(&mut self, s: &str) -> Result<(), UartError> {
        self.send_bytes(s.as_bytes())
    }

    /// Waits for RXNE and returns the low byte of the data register.
    pub fn receive_byte(&mut self) -> Result<u8, UartError> {
        self.wait_for(Status::RXNE)?;
        Ok((self.regs.read(DR) & 0xFF) as u8)
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        self.wait
    }

    pub fn set_wait_policy(&mut self, wait: WaitPolicy) {
        self.wait = wait;
    }

    /// Gives the register block back. The peripheral stays enabled.
    pub fn release(self) -> R {
        self.regs
    }

    fn status(&self) -> Status {
        Status::from_bits_truncate(self.regs.read(SR))
    }

    fn wait_for(&self, flag: Status) -> Result<(), UartError> {
        match self.wait {
            WaitPolicy::Unbounded => {
                while !self.status().contains(flag) {
                    core::hint::spin_loop();
                }
                Ok(())
            }
            WaitPolicy::Bounded { max_polls } => {
                let polls = max_polls.max(1);
                for _ in 0..polls {
                    if self.status().contains(flag) {
                        return Ok(());
                    }
                }
                warn!(?flag, polls, "uart wait budget exhausted");
                Err(UartError::NotReady { flag, polls })
            }
        }
    }
}

impl<R, S> core::fmt::Debug for Uart<R, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Uart")
            .field("state", &core::any::type_name::<S>())
            .field("wait", &self.wait)
            .finish()
    }
}
