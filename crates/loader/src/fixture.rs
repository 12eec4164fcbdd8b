// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Synthetic ARM firmware images, laid out the way `link.x` lays out the real
//! one: a trap table at the flash base, `.data` loaded from flash into RAM,
//! `.bss` after it, and the link symbols as absolute values.

use crate::VECTOR_SECTION;
use anyhow::Result;
use m7boot_core::vectors::RESERVED_SLOTS;
use m7boot_core::TrapTable;
use object::elf;
use object::write::elf::{FileHeader, ProgramHeader, SectionHeader, SectionIndex, Sym, Writer};
use object::write::StringId;
use object::Endianness;
use std::path::Path;

pub const VECTOR_BASE: u64 = 0x0800_0000;
pub const RESET_ADDR: u64 = 0x0800_0201;
pub const DEFAULT_HANDLER_ADDR: u64 = 0x0800_0301;
pub const STACK_TOP: u64 = 0x2008_0000;

#[derive(Debug, Clone)]
pub struct FirmwareFixture {
    pub vector_base: u64,
    /// Raw table words, slot order.
    pub table: Vec<u32>,
    pub data_addr: u64,
    pub data_load: u64,
    pub data: Vec<u8>,
    pub bss: (u64, u64),
    pub stack_top: u64,
    /// Function symbols; values carry the Thumb bit.
    pub functions: Vec<(String, u64)>,
    /// Link symbols left out of the symbol table.
    pub omit_symbols: Vec<&'static str>,
}

impl FirmwareFixture {
    /// A well-formed image: every slot on `DefaultHandler` except SP and Reset.
    pub fn reference() -> Self {
        let mut table = vec![DEFAULT_HANDLER_ADDR as u32; TrapTable::SLOTS];
        table[0] = STACK_TOP as u32;
        table[1] = RESET_ADDR as u32;
        for slot in RESERVED_SLOTS {
            table[slot] = 0;
        }

        Self {
            vector_base: VECTOR_BASE,
            table,
            data_addr: 0x2000_0000,
            data_load: 0x0800_1000,
            data: b"m7boot-data-init".to_vec(),
            bss: (0x2000_0010, 0x2000_0100),
            stack_top: STACK_TOP,
            functions: vec![
                ("Reset".to_string(), RESET_ADDR),
                ("DefaultHandler".to_string(), DEFAULT_HANDLER_ADDR),
            ],
            omit_symbols: Vec::new(),
        }
    }

    /// Points `slot` at a new function symbol `name`.
    pub fn with_handler(mut self, slot: usize, name: &str, addr: u64) -> Self {
        self.table[slot] = addr as u32;
        self.functions.push((name.to_string(), addr));
        self
    }

    fn layout_symbols(&self) -> [(&'static str, u64); 6] {
        [
            ("_sidata", self.data_load),
            ("_sdata", self.data_addr),
            ("_edata", self.data_addr + self.data.len() as u64),
            ("_sbss", self.bss.0),
            ("_ebss", self.bss.1),
            ("_estack", self.stack_top),
        ]
    }

    pub fn build(&self) -> Result<Vec<u8>> {
        let table: Vec<u8> = self.table.iter().flat_map(|w| w.to_le_bytes()).collect();
        let bss_size = self.bss.1.saturating_sub(self.bss.0);

        let mut buffer = Vec::new();
        {
            let mut writer = Writer::new(Endianness::Little, false, &mut buffer);

            writer.reserve_file_header();
            writer.reserve_program_headers(2);
            let table_offset = writer.reserve(table.len(), 4);
            let data_offset = writer.reserve(self.data.len(), 4);

            writer.reserve_null_section_index();
            let table_name = writer.add_section_name(VECTOR_SECTION.as_bytes());
            let table_index = writer.reserve_section_index();
            let data_name = writer.add_section_name(b".data");
            writer.reserve_section_index();
            let bss_name = writer.add_section_name(b".bss");
            writer.reserve_section_index();

            writer.reserve_null_symbol_index();
            let mut symbols: Vec<(StringId, Option<SectionIndex>, u8, u64)> = Vec::new();
            for (name, value) in &self.functions {
                let id = writer.add_string(name.as_bytes());
                writer.reserve_symbol_index(None);
                symbols.push((id, None, elf::STT_FUNC, *value));
            }
            for (name, value) in self.layout_symbols() {
                if self.omit_symbols.contains(&name) {
                    continue;
                }
                let id = writer.add_string(name.as_bytes());
                writer.reserve_symbol_index(None);
                symbols.push((id, None, elf::STT_NOTYPE, value));
            }
            let id = writer.add_string(b"TRAP_TABLE");
            writer.reserve_symbol_index(Some(table_index));
            symbols.push((id, Some(table_index), elf::STT_OBJECT, self.vector_base));

            writer.reserve_symtab_section_index();
            writer.reserve_symtab();
            writer.reserve_strtab_section_index();
            writer.reserve_strtab();
            writer.reserve_shstrtab_section_index();
            writer.reserve_shstrtab();
            writer.reserve_section_headers();

            writer.write_file_header(&FileHeader {
                os_abi: elf::ELFOSABI_NONE,
                abi_version: 0,
                e_type: elf::ET_EXEC,
                e_machine: elf::EM_ARM,
                e_entry: RESET_ADDR,
                e_flags: elf::EF_ARM_EABI_VER5,
            })?;
            writer.write_program_header(&ProgramHeader {
                p_type: elf::PT_LOAD,
                p_flags: elf::PF_R | elf::PF_X,
                p_offset: table_offset as u64,
                p_vaddr: self.vector_base,
                p_paddr: self.vector_base,
                p_filesz: table.len() as u64,
                p_memsz: table.len() as u64,
                p_align: 4,
            });
            writer.write_program_header(&ProgramHeader {
                p_type: elf::PT_LOAD,
                p_flags: elf::PF_R | elf::PF_W,
                p_offset: data_offset as u64,
                p_vaddr: self.data_addr,
                p_paddr: self.data_load,
                p_filesz: self.data.len() as u64,
                p_memsz: self.data.len() as u64,
                p_align: 4,
            });

            writer.pad_until(table_offset);
            writer.write(&table);
            writer.pad_until(data_offset);
            writer.write(&self.data);

            writer.write_null_symbol();
            for (name, section, kind, value) in symbols {
                writer.write_symbol(&Sym {
                    name: Some(name),
                    section,
                    st_info: (elf::STB_GLOBAL << 4) | kind,
                    st_other: elf::STV_DEFAULT,
                    st_shndx: if section.is_some() { 0 } else { elf::SHN_ABS },
                    st_value: value,
                    st_size: 0,
                });
            }
            writer.write_strtab();
            writer.write_shstrtab();

            writer.write_null_section_header();
            writer.write_section_header(&SectionHeader {
                name: Some(table_name),
                sh_type: elf::SHT_PROGBITS,
                sh_flags: u64::from(elf::SHF_ALLOC),
                sh_addr: self.vector_base,
                sh_offset: table_offset as u64,
                sh_size: table.len() as u64,
                sh_link: 0,
                sh_info: 0,
                sh_addralign: 4,
                sh_entsize: 0,
            });
            writer.write_section_header(&SectionHeader {
                name: Some(data_name),
                sh_type: elf::SHT_PROGBITS,
                sh_flags: u64::from(elf::SHF_ALLOC | elf::SHF_WRITE),
                sh_addr: self.data_addr,
                sh_offset: data_offset as u64,
                sh_size: self.data.len() as u64,
                sh_link: 0,
                sh_info: 0,
                sh_addralign: 4,
                sh_entsize: 0,
            });
            writer.write_section_header(&SectionHeader {
                name: Some(bss_name),
                sh_type: elf::SHT_NOBITS,
                sh_flags: u64::from(elf::SHF_ALLOC | elf::SHF_WRITE),
                sh_addr: self.bss.0,
                sh_offset: (data_offset + self.data.len()) as u64,
                sh_size: bss_size,
                sh_link: 0,
                sh_info: 0,
                sh_addralign: 4,
                sh_entsize: 0,
            });
            writer.write_symtab_section_header(1);
            writer.write_strtab_section_header();
            writer.write_shstrtab_section_header();
        }
        Ok(buffer)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.build()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{audit, Finding, SlotClass};
    use crate::parse_elf;

    #[test]
    fn test_load_reference_fixture() {
        let image = parse_elf(&FirmwareFixture::reference().build().unwrap()).unwrap();

        assert_eq!(image.entry, RESET_ADDR);
        assert_eq!(image.segments.len(), 2);
        assert_eq!(image.segments[1].start_addr, 0x0800_1000);
        assert_eq!(image.segments[1].vaddr, 0x2000_0000);
        assert_eq!(image.symbol("_estack"), Some(STACK_TOP));
        assert_eq!(image.function_at(DEFAULT_HANDLER_ADDR), Some("DefaultHandler"));
        assert_eq!(image.function_at(RESET_ADDR & !1), Some("Reset"));
        assert_eq!(image.data_initializers(), b"m7boot-data-init");

        let layout = image.memory_image().unwrap();
        assert_eq!(layout.data.len(), 16);
        assert_eq!(layout.bss.len(), 0xF0);
        assert_eq!(layout.validate(), Ok(()));

        let table = image.section(VECTOR_SECTION).unwrap();
        assert_eq!(table.addr, VECTOR_BASE);
        assert_eq!(table.size, 107 * 4);
    }

    #[test]
    fn test_audit_clean_image() {
        let fixture = FirmwareFixture::reference().with_handler(53, "USART1", 0x0800_0401);
        let image = parse_elf(&fixture.build().unwrap()).unwrap();
        let report = audit(&image, VECTOR_BASE);

        assert!(report.is_clean(), "{:?}", report.findings);
        assert_eq!(report.slots.len(), 107);
        assert_eq!(report.table_address, Some(VECTOR_BASE));
        assert_eq!(report.slots[0].class, SlotClass::InitialStack);
        assert_eq!(report.slots[1].class, SlotClass::Reset);
        assert_eq!(report.slots[7].class, SlotClass::Reserved);
        assert_eq!(report.slots[3].class, SlotClass::Default);

        let handled: Vec<_> = report.handled_slots().collect();
        assert_eq!(handled.len(), 1);
        assert_eq!(handled[0].index, 53);
        assert_eq!(handled[0].name, "USART1");
        assert_eq!(handled[0].symbol.as_deref(), Some("USART1"));
    }

    #[test]
    fn test_audit_reports_broken_tables() {
        let mut fixture = FirmwareFixture::reference();
        fixture.table[0] = 0x2000_0000;
        fixture.table[1] = (RESET_ADDR & !1) as u32;
        fixture.table[9] = DEFAULT_HANDLER_ADDR as u32;
        fixture.table[20] = 0x0800_0999;
        fixture.table[21] = (DEFAULT_HANDLER_ADDR & !1) as u32;
        let image = parse_elf(&fixture.build().unwrap()).unwrap();
        let findings = audit(&image, VECTOR_BASE).findings;

        assert!(findings.contains(&Finding::StackMismatch {
            word: 0x2000_0000,
            estack: STACK_TOP
        }));
        assert!(findings.iter().any(|f| matches!(f, Finding::MissingThumbBit { slot: 1, .. })));
        assert!(findings.contains(&Finding::ReservedNotZero {
            slot: 9,
            word: DEFAULT_HANDLER_ADDR as u32
        }));
        assert!(findings.iter().any(|f| matches!(f, Finding::UnknownHandler { slot: 20, .. })));
        assert!(findings.iter().any(|f| matches!(f, Finding::MissingThumbBit { slot: 21, .. })));
        assert_eq!(findings.len(), 5);
    }

    #[test]
    fn test_audit_short_and_misplaced_table() {
        let mut fixture = FirmwareFixture::reference();
        fixture.table.truncate(16);
        fixture.vector_base = 0x0800_4000;
        let image = parse_elf(&fixture.build().unwrap()).unwrap();
        let findings = audit(&image, VECTOR_BASE).findings;

        assert!(findings.contains(&Finding::TableMisplaced {
            expected: VECTOR_BASE,
            actual: 0x0800_4000
        }));
        assert!(findings.contains(&Finding::SlotCountMismatch {
            slots: 16,
            expected: 107
        }));
    }

    #[test]
    fn test_audit_rejects_oversized_table() {
        let mut fixture = FirmwareFixture::reference();
        fixture.table.push(DEFAULT_HANDLER_ADDR as u32);
        fixture.table.push(DEFAULT_HANDLER_ADDR as u32);
        let image = parse_elf(&fixture.build().unwrap()).unwrap();
        let report = audit(&image, VECTOR_BASE);

        assert!(!report.is_clean());
        assert_eq!(
            report.findings,
            vec![Finding::SlotCountMismatch {
                slots: 109,
                expected: 107
            }]
        );
        assert_eq!(report.slots.len(), 107);
    }

    #[test]
    fn test_audit_layout_problems() {
        let mut fixture = FirmwareFixture::reference();
        fixture.omit_symbols.push("_sidata");
        let image = parse_elf(&fixture.build().unwrap()).unwrap();
        let findings = audit(&image, VECTOR_BASE).findings;
        assert!(findings
            .iter()
            .any(|f| matches!(f, Finding::Layout { message } if message.contains("_sidata"))));

        let mut fixture = FirmwareFixture::reference();
        fixture.bss = (0x2000_0008, 0x2000_0100);
        let image = parse_elf(&fixture.build().unwrap()).unwrap();
        let findings = audit(&image, VECTOR_BASE).findings;
        assert!(findings
            .iter()
            .any(|f| matches!(f, Finding::Layout { message } if message.contains("overlap"))));
    }

    #[test]
    fn test_rejects_non_arm_input() {
        assert!(parse_elf(b"not an elf").is_err());

        let mut bytes = FirmwareFixture::reference().build().unwrap();
        // e_machine lives at offset 18 in the ELF header.
        bytes[18] = 0xF3;
        let err = parse_elf(&bytes).unwrap_err();
        assert!(err.to_string().contains("not ARM"));
    }
}
