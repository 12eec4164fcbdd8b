// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! System Control Block: only the coprocessor access register is used.

use crate::RegisterBlock;

pub const SCB_BASE: usize = 0xE000_ED00;

/// Coprocessor access control register.
pub const CPACR: usize = 0x88;

/// CP10 and CP11 (the FPU) set to full access.
pub const CP10_CP11_FULL: u32 = 0b1111 << 20;

/// Grants full access to the FPU, other coprocessor fields untouched.
///
/// Out of reset CP10/CP11 are "access denied", so any floating-point
/// instruction raises a UsageFault until this has run. The caller must issue
/// `DSB`/`ISB` before the first such instruction.
pub fn enable_fpu<R: RegisterBlock>(scb: &mut R) {
    scb.set_bits(CPACR, CP10_CP11_FULL);
    debug!("FPU enabled (CPACR |= {:#x})", CP10_CP11_FULL);
}
