// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{SimError, SimResult};
use m7boot_config::{BoardConfig, MemoryRange};
use m7boot_core::memory::init_memory;
use m7boot_core::{MemoryImage, Region};
use serde::Serialize;
use tracing::{debug, info};

/// Fill pattern for RAM before the reset sequence runs.
pub const RAM_GARBAGE: u8 = 0xA5;
/// Erased flash.
pub const FLASH_ERASED: u8 = 0xFF;

/// A flat byte array mapped at a target address.
#[derive(Debug, Clone)]
pub struct SimMemory {
    pub data: Vec<u8>,
    pub base_addr: u64,
}

impl SimMemory {
    pub fn new(size: usize, base_addr: u64, fill: u8) -> Self {
        Self {
            data: vec![fill; size],
            base_addr,
        }
    }

    pub fn from_range(range: &MemoryRange, fill: u8) -> SimResult<Self> {
        let size = range
            .size_bytes()
            .map_err(|e| SimError::Config(format!("{:#}", e)))?;
        Ok(Self::new(size as usize, range.base, fill))
    }

    /// Index of `addr` in `data` if `[addr, addr + len)` lies inside.
    pub fn offset_of(&self, addr: u64, len: usize) -> Option<usize> {
        let end = addr.checked_add(len as u64)?;
        if addr >= self.base_addr && end <= self.base_addr + self.data.len() as u64 {
            Some((addr - self.base_addr) as usize)
        } else {
            None
        }
    }

    pub fn read_u8(&self, addr: u64) -> Option<u8> {
        self.offset_of(addr, 1).map(|i| self.data[i])
    }

    pub fn write_u8(&mut self, addr: u64, value: u8) -> bool {
        match self.offset_of(addr, 1) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    pub fn load(&mut self, addr: u64, bytes: &[u8]) -> bool {
        match self.offset_of(addr, bytes.len()) {
            Some(i) => {
                self.data[i..i + bytes.len()].copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }

    /// Bytes of a target region, `None` if it is not fully inside.
    pub fn slice(&self, region: Region) -> Option<&[u8]> {
        let start = self.offset_of(region.start as u64, region.len())?;
        Some(&self.data[start..start + region.len()])
    }

    fn host_address(&mut self, addr: u64, len: usize) -> Option<usize> {
        let offset = self.offset_of(addr, len)?;
        Some(self.data.as_mut_ptr() as usize + offset)
    }
}

/// Outcome of running the reset-time memory initialization against a
/// simulated flash/RAM pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootReport {
    pub data_bytes: usize,
    pub bss_bytes: usize,
    /// `.data` holds exactly the initializer image.
    pub data_matches: bool,
    /// Every `.bss` byte is zero.
    pub bss_zeroed: bool,
    /// No RAM byte outside `.data` and `.bss` changed.
    pub untouched_intact: bool,
}

impl BootReport {
    pub fn passed(&self) -> bool {
        self.data_matches && self.bss_zeroed && self.untouched_intact
    }
}

/// Runs the real copy/zero pass over simulated memory.
///
/// `image` uses target addresses. The initializers are placed at
/// `image.data_load` (flash or RAM), RAM starts out filled with garbage, and
/// the result is compared byte for byte.
pub fn rehearse_boot(
    config: &BoardConfig,
    image: &MemoryImage,
    data_init: &[u8],
) -> SimResult<BootReport> {
    image.validate()?;
    if data_init.len() != image.data.len() {
        return Err(SimError::InitializerSize {
            expected: image.data.len(),
            actual: data_init.len(),
        });
    }

    let mut flash = SimMemory::from_range(&config.memory.flash, FLASH_ERASED)?;
    let mut ram = SimMemory::from_range(&config.memory.ram, RAM_GARBAGE)?;

    let load = image.data_load as u64;
    if !data_init.is_empty() && !flash.load(load, data_init) && !ram.load(load, data_init) {
        return Err(SimError::MemoryViolation(load));
    }
    for region in [image.data, image.bss] {
        if ram.offset_of(region.start as u64, region.len()).is_none() {
            return Err(SimError::MemoryViolation(region.start as u64));
        }
    }

    let before = ram.data.clone();

    let data_load = flash
        .host_address(load, data_init.len())
        .or_else(|| ram.host_address(load, data_init.len()))
        .ok_or(SimError::MemoryViolation(load))?;
    let host = MemoryImage {
        data_load,
        data: host_region(&mut ram, image.data)?,
        bss: host_region(&mut ram, image.bss)?,
        initial_stack: 0,
    };
    debug!(?host, "Translated layout to host buffers");

    // SAFETY: every range of `host` was bounds-checked against the owned
    // flash/RAM buffers above, and `validate` rules out the source
    // overlapping the data region.
    unsafe { init_memory(&host) };

    let data_matches = ram.slice(image.data) == Some(data_init);
    let bss_zeroed = ram
        .slice(image.bss)
        .map_or(false, |bss| bss.iter().all(|&b| b == 0));
    let untouched_intact = ram
        .data
        .iter()
        .zip(&before)
        .enumerate()
        .filter(|(i, _)| {
            let addr = ram.base_addr as usize + i;
            !image.data.contains(addr) && !image.bss.contains(addr)
        })
        .all(|(_, (now, was))| now == was);

    let report = BootReport {
        data_bytes: image.data.len(),
        bss_bytes: image.bss.len(),
        data_matches,
        bss_zeroed,
        untouched_intact,
    };
    info!(
        "Boot rehearsal: {} data bytes, {} bss bytes, passed={}",
        report.data_bytes,
        report.bss_bytes,
        report.passed()
    );
    Ok(report)
}

fn host_region(ram: &mut SimMemory, region: Region) -> SimResult<Region> {
    let start = ram
        .host_address(region.start as u64, region.len())
        .ok_or(SimError::MemoryViolation(region.start as u64))?;
    Ok(Region::new(start, start + region.len()))
}
