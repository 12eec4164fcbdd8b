// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::{BusHandle, BusWrite, ClockGate, PeripheralEntry, SystemBus};
use crate::peripherals::{SimGpio, SimUart, TxMode};
use crate::{SimError, SimResult};
use m7boot_config::BoardConfig;
use m7boot_core::peripherals::rcc::{self, Ahb1Enable, Apb2Enable};
use m7boot_core::peripherals::{gpio, usart};
use m7boot_core::UartConfig;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

pub const GPIOA: &str = "gpioa";
pub const USART1: &str = "usart1";

/// The register blocks the console needs, each backed by the shared bus.
#[derive(Debug, Clone)]
pub struct BoardHandles {
    pub rcc: BusHandle,
    pub gpioa: BusHandle,
    pub usart1: BusHandle,
}

/// Simulated reference board. Cloning shares the same bus, so a harness can
/// keep one copy while the driver runs on another thread.
#[derive(Debug, Clone)]
pub struct SimBoard {
    bus: Arc<Mutex<SystemBus>>,
    uart_base: u64,
    uart_config: UartConfig,
}

impl SimBoard {
    pub fn from_config(config: &BoardConfig) -> Self {
        Self::with_tx_mode(config, TxMode::Immediate)
    }

    pub fn with_tx_mode(config: &BoardConfig, mode: TxMode) -> Self {
        info!("Building simulated board '{}'", config.name);

        let mut bus = SystemBus::new();
        bus.attach(PeripheralEntry {
            name: GPIOA.to_string(),
            base: gpio::GPIOA_BASE as u64,
            size: gpio::BLOCK_SIZE as u64,
            clock_gate: Some(ClockGate {
                register: rcc::AHB1ENR as u64,
                mask: Ahb1Enable::GPIOAEN.bits(),
            }),
            dev: Box::new(SimGpio::port_a()),
        });
        bus.attach(PeripheralEntry {
            name: USART1.to_string(),
            base: config.uart.base_address,
            size: usart::BLOCK_SIZE as u64,
            clock_gate: Some(ClockGate {
                register: rcc::APB2ENR as u64,
                mask: Apb2Enable::USART1EN.bits(),
            }),
            dev: Box::new(SimUart::new(mode)),
        });

        Self {
            bus: Arc::new(Mutex::new(bus)),
            uart_base: config.uart.base_address,
            uart_config: config.uart_config(),
        }
    }

    pub fn reference() -> Self {
        Self::from_config(&BoardConfig::reference())
    }

    pub fn uart_config(&self) -> UartConfig {
        self.uart_config
    }

    pub fn handles(&self) -> BoardHandles {
        BoardHandles {
            rcc: BusHandle::new(self.bus.clone(), rcc::RCC_BASE as u64),
            gpioa: BusHandle::new(self.bus.clone(), gpio::GPIOA_BASE as u64),
            usart1: BusHandle::new(self.bus.clone(), self.uart_base),
        }
    }

    pub fn bus(&self) -> MutexGuard<'_, SystemBus> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_uart<T>(&self, f: impl FnOnce(&mut SimUart) -> T) -> SimResult<T> {
        let mut bus = self.bus();
        let uart = bus
            .device_mut::<SimUart>(USART1)
            .ok_or(SimError::MissingPeripheral(USART1))?;
        Ok(f(uart))
    }

    pub fn with_gpio<T>(&self, f: impl FnOnce(&mut SimGpio) -> T) -> SimResult<T> {
        let mut bus = self.bus();
        let port = bus
            .device_mut::<SimGpio>(GPIOA)
            .ok_or(SimError::MissingPeripheral(GPIOA))?;
        Ok(f(port))
    }

    pub fn transcript(&self) -> SimResult<Vec<u8>> {
        self.with_uart(|uart| uart.transcript().to_vec())
    }

    pub fn writes(&self) -> Vec<BusWrite> {
        self.bus().writes().to_vec()
    }
}
