// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::halt::idle_forever;
use crate::memory::{init_memory, MemoryImage};

/// Everything the reset vector does after the core has loaded SP.
///
/// 1. copy `.data` initializers, 2. zero `.bss`, 3. call `entry`,
/// 4. idle forever if `entry` comes back. The layout is trusted as linked.
///
/// # Safety
///
/// Must run once, before anything reads a static, with `image` describing
/// the linked layout (see [`init_memory`]).
pub unsafe fn reset_sequence(image: &MemoryImage, entry: fn()) -> ! {
    init_memory(image);
    entry();
    idle_forever()
}
