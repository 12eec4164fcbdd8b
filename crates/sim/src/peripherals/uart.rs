// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimResult;
use m7boot_core::peripherals::usart::{Control1, Status, BRR, CR1, CR2, CR3, DR, SR};
use std::any::Any;
use std::collections::VecDeque;
use std::io::{self, Write};

/// How the transmitter flags behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxMode {
    /// TXE and TC read as set whenever UE and TE are on; bytes leave instantly.
    #[default]
    Immediate,
    /// The harness raises TXE/TC with [`SimUart::raise`]; writing DR clears both.
    Manual,
}

/// USART with an F4-style register map (SR, DR, BRR, CR1..CR3).
#[derive(Debug, Default)]
pub struct SimUart {
    mode: TxMode,
    tx_flags: Status,
    brr: u32,
    cr1: u32,
    cr2: u32,
    cr3: u32,
    rx: VecDeque<u32>,
    last_rx: u32,
    tx: Vec<u8>,
    status_reads: u64,
    echo_stdout: bool,
}

impl SimUart {
    pub fn new(mode: TxMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> TxMode {
        self.mode
    }

    /// Copy every transmitted byte to the host's stdout as well.
    pub fn set_echo_stdout(&mut self, echo: bool) {
        self.echo_stdout = echo;
    }

    /// Queues bytes as if typed at the far end of the line.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().map(|&b| u32::from(b)));
    }

    /// Queues a raw data-register value; the upper bits are whatever the
    /// hardware would have left there.
    pub fn deliver_word(&mut self, word: u32) {
        self.rx.push_back(word);
    }

    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }

    /// Sets transmitter flags in [`TxMode::Manual`]. Ignored otherwise.
    pub fn raise(&mut self, flags: Status) {
        if self.mode == TxMode::Manual {
            self.tx_flags |= flags & (Status::TXE | Status::TC);
        }
    }

    pub fn transcript(&self) -> &[u8] {
        &self.tx
    }

    pub fn take_transcript(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }

    pub fn brr(&self) -> u32 {
        self.brr
    }

    pub fn control1(&self) -> Control1 {
        Control1::from_bits_truncate(self.cr1)
    }

    pub fn status_reads(&self) -> u64 {
        self.status_reads
    }

    pub fn status(&self) -> Status {
        let cr1 = self.control1();
        let mut status = match self.mode {
            TxMode::Immediate if cr1.contains(Control1::UE | Control1::TE) => {
                Status::TXE | Status::TC
            }
            TxMode::Immediate => Status::empty(),
            TxMode::Manual => self.tx_flags,
        };
        if cr1.contains(Control1::UE | Control1::RE) && !self.rx.is_empty() {
            status |= Status::RXNE;
        }
        status
    }

    fn transmit(&mut self, value: u32) {
        if !self.control1().contains(Control1::UE | Control1::TE) {
            return;
        }
        let byte = value as u8;
        self.tx.push(byte);
        if self.mode == TxMode::Manual {
            self.tx_flags.remove(Status::TXE | Status::TC);
        }
        if self.echo_stdout {
            let mut stdout = io::stdout();
            let _ = stdout.write_all(&[byte]);
            let _ = stdout.flush();
        }
    }
}

impl crate::Peripheral for SimUart {
    fn read(&mut self, offset: u64) -> SimResult<u32> {
        Ok(match offset as usize {
            SR => {
                self.status_reads += 1;
                self.status().bits()
            }
            DR => {
                if let Some(word) = self.rx.pop_front() {
                    self.last_rx = word;
                }
                self.last_rx
            }
            BRR => self.brr,
            CR1 => self.cr1,
            CR2 => self.cr2,
            CR3 => self.cr3,
            _ => 0,
        })
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        match offset as usize {
            // TC is rc_w0: writing zero clears it, writing one has no effect.
            SR => {
                if self.mode == TxMode::Manual && value & Status::TC.bits() == 0 {
                    self.tx_flags.remove(Status::TC);
                }
            }
            DR => self.transmit(value),
            BRR => self.brr = value & 0xFFFF,
            CR1 => self.cr1 = value,
            CR2 => self.cr2 = value,
            CR3 => self.cr3 = value,
            _ => {}
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}
