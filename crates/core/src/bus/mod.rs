// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::RegisterBlock;
use core::ptr;

/// Volatile access to a register block at a fixed physical address.
#[derive(Debug)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must be the address of a peripheral register block on the
    /// running part, and no other handle to the same block may be alive.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    pub const fn base(&self) -> usize {
        self.base
    }
}

impl RegisterBlock for Mmio {
    fn read(&self, offset: usize) -> u32 {
        // SAFETY: `new` guarantees `base` maps a register block; offsets come
        // from the peripheral register maps and stay inside it.
        unsafe { ptr::read_volatile((self.base + offset) as *const u32) }
    }

    fn write(&mut self, offset: usize, value: u32) {
        // SAFETY: as for `read`; `&mut self` keeps writes exclusive.
        unsafe { ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}
