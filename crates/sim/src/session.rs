// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Scripted console sessions: the demo application running on the
//! simulated board with canned keyboard input.

use crate::board::SimBoard;
use crate::SimResult;
use m7boot_config::{ConsoleScript, ScriptAssertion, StopReason};
use m7boot_core::console::Console;
use m7boot_core::{DelayMs, Uart, UartConfig, WaitPolicy};
use serde::Serialize;
use tracing::{debug, info};

/// Status reads per wait when the script does not set `max_polls`.
pub const DEFAULT_MAX_POLLS: u32 = 10_000;

/// Adds up requested pauses instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub total_ms: u64,
    pub calls: u32,
}

impl DelayMs for RecordingDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.total_ms += u64::from(ms);
        self.calls += 1;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Everything the console transmitted, lossily decoded.
    pub transcript: String,
    pub iterations: u32,
    pub delay_ms_total: u64,
    pub stop_reason: StopReason,
    pub bus_writes: usize,
    pub dropped_writes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssertionOutcome {
    pub assertion: String,
    pub passed: bool,
}

/// Brings the console up on `board` and runs it until the iteration limit
/// or until a receive finds no more input.
///
/// The wait policy is always bounded here, whatever the board says: an
/// unbounded receive with nothing left to read would never return.
pub fn run_session(board: &SimBoard, script: &ConsoleScript) -> SimResult<SessionReport> {
    board.with_uart(|uart| uart.feed(script.input.as_bytes()))?;

    let config = UartConfig {
        wait: WaitPolicy::Bounded {
            max_polls: script.limits.max_polls.unwrap_or(DEFAULT_MAX_POLLS),
        },
        ..board.uart_config()
    };
    let mut handles = board.handles();
    let uart = Uart::new(handles.usart1).initialize(&mut handles.rcc, &mut handles.gpioa, &config);

    let mut console = Console::new(uart, RecordingDelay::default());
    let mut stop_reason = StopReason::MaxIterations;
    match console.print_banner() {
        Ok(()) => {
            while console.counter() < script.limits.max_iterations {
                match console.step() {
                    Ok(byte) => debug!("Iteration {} echoed {:#04x}", console.counter(), byte),
                    Err(e) => {
                        info!("Console stopped: {}", e);
                        stop_reason = StopReason::InputExhausted;
                        break;
                    }
                }
            }
        }
        Err(e) => {
            info!("Banner not sent: {}", e);
            stop_reason = StopReason::InputExhausted;
        }
    }

    let iterations = console.counter();
    let (_, delay) = console.into_parts();
    let transcript = board.transcript()?;
    let bus = board.bus();

    Ok(SessionReport {
        transcript: String::from_utf8_lossy(&transcript).into_owned(),
        iterations,
        delay_ms_total: delay.total_ms,
        stop_reason,
        bus_writes: bus.writes().len(),
        dropped_writes: bus.dropped_writes(),
    })
}

pub fn check_assertions(script: &ConsoleScript, report: &SessionReport) -> Vec<AssertionOutcome> {
    script
        .assertions
        .iter()
        .map(|assertion| match assertion {
            ScriptAssertion::UartContains(a) => AssertionOutcome {
                assertion: format!("uart_contains: {:?}", a.uart_contains),
                passed: report.transcript.contains(&a.uart_contains),
            },
            ScriptAssertion::ExpectedStopReason(a) => AssertionOutcome {
                assertion: format!("expected_stop_reason: {:?}", a.expected_stop_reason),
                passed: report.stop_reason == a.expected_stop_reason,
            },
        })
        .collect()
}
