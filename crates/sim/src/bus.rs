// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::peripherals::SimRcc;
use crate::{Peripheral, SimError, SimResult};
use m7boot_core::peripherals::rcc;
use m7boot_core::RegisterBlock;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Enable bit in the RCC that must be set for a peripheral to respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockGate {
    pub register: u64,
    pub mask: u32,
}

#[derive(Debug)]
pub struct PeripheralEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub clock_gate: Option<ClockGate>,
    pub dev: Box<dyn Peripheral>,
}

/// One accepted register write, in bus order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusWrite {
    pub peripheral: String,
    pub offset: u64,
    pub value: u32,
}

/// Peripheral address space of the board. The RCC is always present at its
/// fixed address because every other entry may be gated by it.
#[derive(Debug)]
pub struct SystemBus {
    pub rcc: SimRcc,
    pub peripherals: Vec<PeripheralEntry>,
    writes: Vec<BusWrite>,
    dropped_writes: u64,
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBus {
    pub fn new() -> Self {
        Self {
            rcc: SimRcc::new(),
            peripherals: Vec::new(),
            writes: Vec::new(),
            dropped_writes: 0,
        }
    }

    pub fn attach(&mut self, entry: PeripheralEntry) {
        debug!(
            "Mapped '{}' at {:#x} ({:#x} bytes)",
            entry.name, entry.base, entry.size
        );
        self.peripherals.push(entry);
    }

    pub fn read_u32(&mut self, addr: u64) -> SimResult<u32> {
        if let Some(offset) = Self::rcc_offset(addr) {
            return self.rcc.read(offset);
        }

        let idx = self.find(addr)?;
        let entry = &self.peripherals[idx];
        let offset = addr - entry.base;
        if !self.clocked(entry.clock_gate) {
            warn!("Read from '{}' at {:#x} with its clock off", entry.name, addr);
            return Ok(0);
        }
        self.peripherals[idx].dev.read(offset)
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        let (name, offset) = if let Some(offset) = Self::rcc_offset(addr) {
            self.rcc.write(offset, value)?;
            ("rcc".to_string(), offset)
        } else {
            let idx = self.find(addr)?;
            let entry = &self.peripherals[idx];
            let offset = addr - entry.base;
            if !self.clocked(entry.clock_gate) {
                warn!(
                    "Dropped write {:#x} to '{}' at {:#x}: clock disabled",
                    value, entry.name, addr
                );
                self.dropped_writes += 1;
                return Ok(());
            }
            let name = entry.name.clone();
            self.peripherals[idx].dev.write(offset, value)?;
            (name, offset)
        };

        debug!("Bus write {}+{:#x} <- {:#x}", name, offset, value);
        self.writes.push(BusWrite {
            peripheral: name,
            offset,
            value,
        });
        Ok(())
    }

    /// Every write that reached a device, oldest first.
    pub fn writes(&self) -> &[BusWrite] {
        &self.writes
    }

    /// Writes discarded because the target's clock was off.
    pub fn dropped_writes(&self) -> u64 {
        self.dropped_writes
    }

    pub fn device<T: 'static>(&self, name: &str) -> Option<&T> {
        self.peripherals
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.dev.as_any())
            .and_then(|any| any.downcast_ref::<T>())
    }

    pub fn device_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.peripherals
            .iter_mut()
            .find(|p| p.name == name)
            .and_then(|p| p.dev.as_any_mut())
            .and_then(|any| any.downcast_mut::<T>())
    }

    fn rcc_offset(addr: u64) -> Option<u64> {
        let base = rcc::RCC_BASE as u64;
        (addr >= base && addr < base + rcc::BLOCK_SIZE as u64).then(|| addr - base)
    }

    fn find(&self, addr: u64) -> SimResult<usize> {
        self.peripherals
            .iter()
            .position(|p| addr >= p.base && addr < p.base + p.size)
            .ok_or_else(|| {
                warn!("Unmapped bus access at {:#x}", addr);
                SimError::MemoryViolation(addr)
            })
    }

    fn clocked(&self, gate: Option<ClockGate>) -> bool {
        gate.map_or(true, |g| self.rcc.is_enabled(g.register, g.mask))
    }
}

/// A register block on a shared [`SystemBus`], handed to the driver.
///
/// The driver has no error channel, so unmapped accesses read as zero and
/// are otherwise ignored (they are logged by the bus).
#[derive(Debug, Clone)]
pub struct BusHandle {
    bus: Arc<Mutex<SystemBus>>,
    base: u64,
}

impl BusHandle {
    pub fn new(bus: Arc<Mutex<SystemBus>>, base: u64) -> Self {
        Self { bus, base }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    fn lock(&self) -> MutexGuard<'_, SystemBus> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RegisterBlock for BusHandle {
    fn read(&self, offset: usize) -> u32 {
        self.lock()
            .read_u32(self.base + offset as u64)
            .unwrap_or(0)
    }

    fn write(&mut self, offset: usize, value: u32) {
        let _ = self.lock().write_u32(self.base + offset as u64, value);
    }
}
