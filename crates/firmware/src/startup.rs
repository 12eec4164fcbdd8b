// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The pieces the hardware reaches before `main` exists: the trap table in
//! `.isr_vector`, the reset handler and the shared fail-stop handler.

use core::ptr::addr_of;

use m7boot_core::bus::Mmio;
use m7boot_core::halt::default_handler;
use m7boot_core::peripherals::scb;
use m7boot_core::reset::reset_sequence;
use m7boot_core::{MemoryImage, Region, TrapTable};

// Boundaries emitted by link.x. Only their addresses carry meaning.
extern "C" {
    static _estack: u32;
    static _sidata: u32;
    static _sdata: u32;
    static _edata: u32;
    static _sbss: u32;
    static _ebss: u32;
}

#[used]
#[no_mangle]
#[link_section = ".isr_vector"]
pub static TRAP_TABLE: TrapTable =
    TrapTable::new(unsafe { addr_of!(_estack) }, Reset, DefaultHandler);

#[allow(non_snake_case)]
#[no_mangle]
pub extern "C" fn DefaultHandler() {
    default_handler()
}

fn linked_image() -> MemoryImage {
    // SAFETY: addresses only, nothing is read through them here.
    unsafe {
        MemoryImage {
            data_load: addr_of!(_sidata) as usize,
            data: Region::new(addr_of!(_sdata) as usize, addr_of!(_edata) as usize),
            bss: Region::new(addr_of!(_sbss) as usize, addr_of!(_ebss) as usize),
            initial_stack: addr_of!(_estack) as usize,
        }
    }
}

/// The target is `thumbv7em-none-eabihf`, so the FPU is switched on before
/// anything compiled with hard-float calls can run.
///
/// # Safety
///
/// Entered by the core through slot 1 only.
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn Reset() -> ! {
    scb::enable_fpu(&mut Mmio::new(scb::SCB_BASE));
    cortex_m::asm::dsb();
    cortex_m::asm::isb();

    let image = linked_image();
    reset_sequence(&image, crate::app_main)
}
