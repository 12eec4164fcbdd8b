// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Static checks of a linked image against the boot contract: the trap
//! table shape and placement, and the `.data`/`.bss` layout symbols.

use crate::{FirmwareImage, VECTOR_SECTION};
use m7boot_core::vectors::{slot_name, RESERVED_SLOTS};
use m7boot_core::TrapTable;
use serde::Serialize;
use tracing::{debug, info};

/// Symbol of the fail-stop handler every unclaimed slot points at.
pub const DEFAULT_HANDLER: &str = "DefaultHandler";
pub const RESET_HANDLER: &str = "Reset";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    #[error("no .isr_vector section")]
    MissingVectorTable,
    #[error("vector table at {actual:#x}, expected {expected:#x}")]
    TableMisplaced { expected: u64, actual: u64 },
    #[error("vector table has {slots} slots, expected exactly {expected}")]
    SlotCountMismatch { slots: usize, expected: usize },
    #[error("link symbol '{name}' is missing")]
    MissingSymbol { name: String },
    #[error("slot 0 holds {word:#x}, _estack is {estack:#x}")]
    StackMismatch { word: u32, estack: u64 },
    #[error("slot 1 holds {word:#x}, Reset is at {reset:#x}")]
    ResetMismatch { word: u32, reset: u64 },
    #[error("slot {slot} ({name}) holds {word:#x} without the Thumb bit")]
    MissingThumbBit { slot: usize, name: String, word: u32 },
    #[error("reserved slot {slot} holds {word:#x}")]
    ReservedNotZero { slot: usize, word: u32 },
    #[error("slot {slot} ({name}) holds {word:#x}, which is no known function")]
    UnknownHandler { slot: usize, name: String, word: u32 },
    #[error("memory layout: {message}")]
    Layout { message: String },
    #[error(".data section is {section} bytes, _edata - _sdata is {symbols}")]
    DataSizeMismatch { section: u64, symbols: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotClass {
    InitialStack,
    Reset,
    Reserved,
    Default,
    Handler,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotReport {
    pub index: usize,
    pub name: &'static str,
    pub word: u32,
    pub class: SlotClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub table_address: Option<u64>,
    pub slots: Vec<SlotReport>,
    pub findings: Vec<Finding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn handled_slots(&self) -> impl Iterator<Item = &SlotReport> {
        self.slots.iter().filter(|s| s.class == SlotClass::Handler)
    }
}

/// Checks `image` against the boot contract. `expected_base` is where the
/// core fetches the table from after reset.
pub fn audit(image: &FirmwareImage, expected_base: u64) -> AuditReport {
    let mut report = AuditReport::default();
    audit_layout(image, &mut report.findings);

    let Some(table) = image.section(VECTOR_SECTION) else {
        report.findings.push(Finding::MissingVectorTable);
        return report;
    };
    report.table_address = Some(table.addr);
    if table.addr != expected_base {
        report.findings.push(Finding::TableMisplaced {
            expected: expected_base,
            actual: table.addr,
        });
    }

    let words: Vec<u32> = table
        .data
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    if words.len() != TrapTable::SLOTS {
        report.findings.push(Finding::SlotCountMismatch {
            slots: words.len(),
            expected: TrapTable::SLOTS,
        });
    }

    let default = image
        .symbol(DEFAULT_HANDLER)
        .map(|a| a & !1);
    if default.is_none() {
        report.findings.push(Finding::MissingSymbol {
            name: DEFAULT_HANDLER.to_string(),
        });
    }

    for (index, &word) in words.iter().enumerate().take(TrapTable::SLOTS) {
        let name = slot_name(index).unwrap_or("?");
        let symbol = image.function_at(u64::from(word)).map(str::to_string);
        let class = classify(image, index, word, default, &mut report.findings);
        debug!("slot {:3} {:<20} {:#010x} {:?}", index, name, word, class);
        report.slots.push(SlotReport {
            index,
            name,
            word,
            class,
            symbol,
        });
    }

    info!(
        "Audited {} slots, {} handled, {} findings",
        report.slots.len(),
        report.handled_slots().count(),
        report.findings.len()
    );
    report
}

fn classify(
    image: &FirmwareImage,
    index: usize,
    word: u32,
    default: Option<u64>,
    findings: &mut Vec<Finding>,
) -> SlotClass {
    let name = || slot_name(index).unwrap_or("?").to_string();
    let addr = u64::from(word);

    match index {
        0 => {
            match image.symbol("_estack") {
                Some(estack) if estack != addr => {
                    findings.push(Finding::StackMismatch { word, estack });
                }
                Some(_) => {}
                None => findings.push(Finding::MissingSymbol {
                    name: "_estack".to_string(),
                }),
            }
            SlotClass::InitialStack
        }
        1 => {
            match image.symbol(RESET_HANDLER) {
                Some(reset) if reset & !1 != addr & !1 => {
                    findings.push(Finding::ResetMismatch { word, reset });
                }
                Some(_) => {}
                None => findings.push(Finding::MissingSymbol {
                    name: RESET_HANDLER.to_string(),
                }),
            }
            if word & 1 == 0 {
                findings.push(Finding::MissingThumbBit {
                    slot: index,
                    name: name(),
                    word,
                });
            }
            SlotClass::Reset
        }
        _ if RESERVED_SLOTS.contains(&index) => {
            if word != 0 {
                findings.push(Finding::ReservedNotZero { slot: index, word });
            }
            SlotClass::Reserved
        }
        _ => {
            let class = if Some(addr & !1) == default {
                SlotClass::Default
            } else if image.function_at(addr).is_some() {
                SlotClass::Handler
            } else {
                findings.push(Finding::UnknownHandler {
                    slot: index,
                    name: name(),
                    word,
                });
                return SlotClass::Unknown;
            };
            if word & 1 == 0 {
                findings.push(Finding::MissingThumbBit {
                    slot: index,
                    name: name(),
                    word,
                });
            }
            class
        }
    }
}

fn audit_layout(image: &FirmwareImage, findings: &mut Vec<Finding>) {
    let layout = match image.memory_image() {
        Ok(layout) => layout,
        Err(e) => {
            findings.push(Finding::Layout {
                message: e.to_string(),
            });
            return;
        }
    };

    if let Err(e) = layout.validate() {
        findings.push(Finding::Layout {
            message: e.to_string(),
        });
    }

    let symbols = layout.data.len() as u64;
    let section = image.section(".data").map_or(0, |s| s.size);
    if section != symbols {
        findings.push(Finding::DataSizeMismatch { section, symbols });
    }
}
