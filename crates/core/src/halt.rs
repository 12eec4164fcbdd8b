// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Terminal states of the image.
//!
//! Both states spin forever and are indistinguishable on the wire. They are
//! kept apart so a debugger (or a reader) can tell a program that finished
//! from one that took an unexpected trap by the symbol the PC sits in.

/// Why the processor stopped making progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The application entry returned to the reset handler.
    Idle,
    /// A fault or an interrupt without a dedicated handler fired.
    Trapped,
}

impl Halt {
    pub fn enter(self) -> ! {
        match self {
            Halt::Idle => idle_forever(),
            Halt::Trapped => trapped_forever(),
        }
    }
}

#[inline(never)]
pub fn idle_forever() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

#[inline(never)]
pub fn trapped_forever() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

/// Fallback for every vector that has no dedicated handler.
///
/// No recovery and no reporting: the stack or the statics may be what broke.
pub extern "C" fn default_handler() {
    trapped_forever()
}
