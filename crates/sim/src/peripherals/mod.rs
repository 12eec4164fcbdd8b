// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod gpio;
pub mod rcc;
pub mod uart;

pub use gpio::SimGpio;
pub use rcc::SimRcc;
pub use uart::{SimUart, TxMode};
