// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{anyhow, Context, Result};
use goblin::elf::header::EM_ARM;
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::section_header::SHT_NOBITS;
use goblin::elf::sym::STT_FUNC;
use goblin::elf::Elf;
use m7boot_core::{MemoryImage, Region};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub mod audit;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;

pub use audit::{audit, AuditReport, Finding};

/// Section the linker script places the trap table in.
pub const VECTOR_SECTION: &str = ".isr_vector";

/// Link-script symbols describing the static-memory layout.
pub const LAYOUT_SYMBOLS: [&str; 6] = ["_sidata", "_sdata", "_edata", "_sbss", "_ebss", "_estack"];

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Not a 32-bit ELF image")]
    NotElf32,
    #[error("ELF machine {0} is not ARM")]
    WrongMachine(u16),
    #[error("Link symbol '{0}' is missing")]
    MissingSymbol(&'static str),
}

#[derive(Debug, Clone)]
pub struct Segment {
    /// Load (physical) address.
    pub start_addr: u64,
    pub vaddr: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub addr: u64,
    pub size: u64,
    /// Empty for `NOBITS` sections.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct FirmwareImage {
    pub entry: u64,
    pub segments: Vec<Segment>,
    pub sections: Vec<Section>,
    /// Every named symbol and its value.
    pub symbols: BTreeMap<String, u64>,
    /// Function symbols by address with the Thumb bit cleared.
    pub functions: BTreeMap<u64, String>,
}

impl FirmwareImage {
    pub fn symbol(&self, name: &str) -> Option<u64> {
        self.symbols.get(name).copied()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Name of the function starting at `addr` (Thumb bit ignored).
    pub fn function_at(&self, addr: u64) -> Option<&str> {
        self.functions.get(&(addr & !1)).map(String::as_str)
    }

    /// The link-time layout as the reset handler sees it.
    pub fn memory_image(&self) -> Result<MemoryImage, LoaderError> {
        let get = |name: &'static str| {
            self.symbol(name)
                .map(|v| v as usize)
                .ok_or(LoaderError::MissingSymbol(name))
        };
        Ok(MemoryImage {
            data_load: get("_sidata")?,
            data: Region::new(get("_sdata")?, get("_edata")?),
            bss: Region::new(get("_sbss")?, get("_ebss")?),
            initial_stack: get("_estack")?,
        })
    }

    /// The `.data` initializer bytes, as stored at `_sidata`.
    pub fn data_initializers(&self) -> Vec<u8> {
        self.section(".data")
            .map(|s| s.data.clone())
            .unwrap_or_default()
    }
}

pub fn load_elf(path: &Path) -> Result<FirmwareImage> {
    let buffer = fs::read(path).with_context(|| format!("Failed to read ELF file: {:?}", path))?;
    parse_elf(&buffer)
}

pub fn parse_elf(buffer: &[u8]) -> Result<FirmwareImage> {
    let elf = Elf::parse(buffer).context("Failed to parse ELF binary")?;

    if elf.is_64 {
        return Err(LoaderError::NotElf32.into());
    }
    if elf.header.e_machine != EM_ARM {
        return Err(LoaderError::WrongMachine(elf.header.e_machine).into());
    }

    info!("ELF Entry Point: {:#x}", elf.entry);
    let mut image = FirmwareImage {
        entry: elf.entry,
        ..Default::default()
    };

    for ph in &elf.program_headers {
        if ph.p_type != PT_LOAD || ph.p_filesz == 0 {
            continue;
        }
        let offset = ph.p_offset as usize;
        let size = ph.p_filesz as usize;
        debug!(
            "Found Loadable Segment: Addr={:#x}, Size={} bytes, Offset={:#x}",
            ph.p_paddr, size, offset
        );
        let data = buffer
            .get(offset..offset + size)
            .ok_or_else(|| anyhow!("Segment out of bounds in ELF file"))?;
        image.segments.push(Segment {
            start_addr: ph.p_paddr,
            vaddr: ph.p_vaddr,
            data: data.to_vec(),
        });
    }
    if image.segments.is_empty() {
        warn!("No loadable segments found in ELF file");
    }

    for sh in &elf.section_headers {
        let Some(name) = elf.shdr_strtab.get_at(sh.sh_name) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        let data = if sh.sh_type == SHT_NOBITS {
            Vec::new()
        } else {
            let offset = sh.sh_offset as usize;
            buffer
                .get(offset..offset + sh.sh_size as usize)
                .ok_or_else(|| anyhow!("Section '{}' out of bounds in ELF file", name))?
                .to_vec()
        };
        image.sections.push(Section {
            name: name.to_string(),
            addr: sh.sh_addr,
            size: sh.sh_size,
            data,
        });
    }

    for sym in elf.syms.iter() {
        let Some(name) = elf.strtab.get_at(sym.st_name) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        image.symbols.insert(name.to_string(), sym.st_value);
        if sym.st_type() == STT_FUNC {
            image.functions.insert(sym.st_value & !1, name.to_string());
        }
    }

    if let Some(table) = image.section(VECTOR_SECTION) {
        info!("Vector table at {:#x} ({} bytes)", table.addr, table.size);
    }

    Ok(image)
}
