// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Host-side model of the reference board: RCC, GPIOA and USART1 on a
//! register-level bus, plus RAM/flash buffers for rehearsing the reset path.
//! The unmodified `m7boot-core` driver runs against it through [`BusHandle`].

pub mod board;
pub mod bus;
pub mod memory;
pub mod peripherals;
pub mod session;


use std::any::Any;

pub use board::SimBoard;
pub use bus::{BusHandle, BusWrite, SystemBus};
pub use memory::{rehearse_boot, BootReport, SimMemory};
pub use session::{run_session, SessionReport};

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Peripheral '{0}' is not mapped on this board")]
    MissingPeripheral(&'static str),
    #[error("Invalid memory layout: {0}")]
    Layout(#[from] m7boot_core::LayoutError),
    #[error("Data initializer is {actual} bytes, the data region is {expected}")]
    InitializerSize { expected: usize, actual: usize },
    #[error("Invalid board configuration: {0}")]
    Config(String),
}

pub type SimResult<T> = Result<T, SimError>;

/// A memory-mapped peripheral seen as 32-bit registers at byte offsets.
///
/// Reads take `&mut self`: on real parts reading a data register pops a FIFO.
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&mut self, offset: u64) -> SimResult<u32>;
    fn write(&mut self, offset: u64, value: u32) -> SimResult<()>;
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}
