// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Static-memory layout produced by the linker and the copy/zero pass that
//! brings `.data` and `.bss` to their initial state.

use core::ptr;

/// Half-open address range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.start && addr < self.end
    }

    pub const fn overlaps(&self, other: &Region) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }
}

/// Boundaries of the writable static regions, as laid out by `link.x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryImage {
    /// Load address of the `.data` initializers (`_sidata`).
    pub data_load: usize,
    /// `_sdata .. _edata`
    pub data: Region,
    /// `_sbss .. _ebss`
    pub bss: Region,
    /// `_estack`, the value hardware loads into SP from slot 0.
    pub initial_stack: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("data region ends before it starts ({start:#x} > {end:#x})")]
    InvertedData { start: usize, end: usize },
    #[error("bss region ends before it starts ({start:#x} > {end:#x})")]
    InvertedBss { start: usize, end: usize },
    #[error("data and bss regions overlap")]
    DataBssOverlap,
    #[error("data initializers at {load:#x} overlap the data region they are copied into")]
    SourceOverlapsData { load: usize },
    #[error("initial stack pointer {0:#x} is not word aligned")]
    MisalignedStack(usize),
    #[error("initial stack pointer {0:#x} lies inside a static region")]
    StackInsideStatics(usize),
}

impl MemoryImage {
    pub const fn data_source(&self) -> Region {
        Region::new(self.data_load, self.data_load.saturating_add(self.data.len()))
    }

    /// Checks the link-time contract. The reset path never calls this; it is
    /// for tooling that inspects a built image.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.data.start > self.data.end {
            return Err(LayoutError::InvertedData {
                start: self.data.start,
                end: self.data.end,
            });
        }
        if self.bss.start > self.bss.end {
            return Err(LayoutError::InvertedBss {
                start: self.bss.start,
                end: self.bss.end,
            });
        }
        if self.data.overlaps(&self.bss) {
            return Err(LayoutError::DataBssOverlap);
        }
        // Executing in place (load == start) is a no-op copy and fine.
        if self.data_load != self.data.start && self.data_source().overlaps(&self.data) {
            return Err(LayoutError::SourceOverlapsData {
                load: self.data_load,
            });
        }
        if self.initial_stack % 4 != 0 {
            return Err(LayoutError::MisalignedStack(self.initial_stack));
        }
        if self.data.contains(self.initial_stack) || self.bss.contains(self.initial_stack) {
            return Err(LayoutError::StackInsideStatics(self.initial_stack));
        }
        Ok(())
    }
}

/// Copies the `.data` initializers, then zero-fills `.bss`.
///
/// Both passes run byte by byte in ascending address order through volatile
/// accesses, so the compiler cannot turn them into `memcpy`/`memset` calls
/// that might themselves depend on initialized statics.
///
/// # Safety
///
/// Every address in `image` must be valid for the access it gets: the source
/// range readable, the data and bss ranges writable, and none of them aliasing
/// memory the caller still relies on (its stack included).
pub unsafe fn init_memory(image: &MemoryImage) {
    copy_data(image.data_load as *const u8, image.data);
    zero_bss(image.bss);
}

unsafe fn copy_data(mut src: *const u8, data: Region) {
    let mut dst = data.start as *mut u8;
    let end = data.end as *mut u8;
    while dst < end {
        ptr::write_volatile(dst, ptr::read_volatile(src));
        dst = dst.add(1);
        src = src.add(1);
    }
}

unsafe fn zero_bss(bss: Region) {
    let mut dst = bss.start as *mut u8;
    let end = bss.end as *mut u8;
    while dst < end {
        ptr::write_volatile(dst, 0);
        dst = dst.add(1);
    }
}
