// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use m7boot_config::{BoardConfig, ConsoleScript};
use m7boot_sim::session::{check_assertions, AssertionOutcome};
use m7boot_sim::{rehearse_boot, run_session, SessionReport, SimBoard};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

const EXIT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit the trap table and static-memory layout of a firmware ELF
    Verify {
        /// Path to the firmware ELF file
        #[arg(short, long)]
        firmware: PathBuf,

        /// Path to the board configuration (YAML)
        #[arg(short, long)]
        system: Option<PathBuf>,

        /// Write the audit report as JSON to this path
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Print the console UART baud divisor and the rate it really produces
    Baud {
        /// Path to the board configuration (YAML)
        #[arg(short, long)]
        system: Option<PathBuf>,
    },
    /// Rehearse the reset-time .data/.bss initialization of a firmware ELF
    Boot {
        /// Path to the firmware ELF file
        #[arg(short, long)]
        firmware: PathBuf,

        /// Path to the board configuration (YAML)
        #[arg(short, long)]
        system: Option<PathBuf>,
    },
    /// Run a scripted console session on the simulated board
    Simulate {
        /// Path to the console script (YAML)
        #[arg(long)]
        script: PathBuf,

        /// Path to the board configuration (YAML)
        #[arg(short, long)]
        system: Option<PathBuf>,

        /// Directory for result.json and uart.log
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Do not echo the simulated UART to stdout
        #[arg(long)]
        no_uart_stdout: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Verify {
            firmware,
            system,
            json,
        } => run_verify(&firmware, system.as_deref(), json.as_deref()),
        Command::Baud { system } => run_baud(system.as_deref()),
        Command::Boot { firmware, system } => run_boot(&firmware, system.as_deref()),
        Command::Simulate {
            script,
            system,
            output_dir,
            no_uart_stdout,
        } => run_simulate(
            &script,
            system.as_deref(),
            output_dir.as_deref(),
            no_uart_stdout,
        ),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

fn load_board(system: Option<&Path>) -> Result<BoardConfig> {
    match system {
        Some(path) => {
            info!("Loading board config: {:?}", path);
            BoardConfig::from_file(path)
        }
        None => {
            info!("Using reference board configuration");
            Ok(BoardConfig::reference())
        }
    }
}

fn sha256_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

fn status(passed: bool) -> &'static str {
    if passed {
        "pass"
    } else {
        "fail"
    }
}

fn exit_code(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAIL)
    }
}

#[derive(Serialize)]
struct VerifyResult<'a> {
    status: &'static str,
    firmware: String,
    firmware_hash: String,
    board: &'a str,
    report: &'a m7boot_loader::AuditReport,
}

fn run_verify(firmware: &Path, system: Option<&Path>, json: Option<&Path>) -> Result<ExitCode> {
    let board = load_board(system)?;
    info!("Loading firmware: {:?}", firmware);
    let image = m7boot_loader::load_elf(firmware)?;
    let firmware_hash = sha256_file(firmware)?;

    let report = m7boot_loader::audit(&image, board.vector_table_base);
    match report.table_address {
        Some(addr) => println!(
            "vector table: {:#010x}, {} slots, {} dedicated handlers",
            addr,
            report.slots.len(),
            report.handled_slots().count()
        ),
        None => println!("vector table: missing"),
    }
    for slot in report.handled_slots() {
        println!(
            "  slot {:3} {:<16} -> {}",
            slot.index,
            slot.name,
            slot.symbol.as_deref().unwrap_or("?")
        );
    }
    for finding in &report.findings {
        println!("FINDING: {}", finding);
    }
    println!("firmware sha256: {}", firmware_hash);
    println!("status: {}", status(report.is_clean()));

    if let Some(path) = json {
        let result = VerifyResult {
            status: status(report.is_clean()),
            firmware: firmware.display().to_string(),
            firmware_hash,
            board: &board.name,
            report: &report,
        };
        std::fs::write(path, serde_json::to_string_pretty(&result)?)
            .with_context(|| format!("Failed to write {:?}", path))?;
        info!("Audit report written to {:?}", path);
    }

    Ok(exit_code(report.is_clean()))
}

fn run_baud(system: Option<&Path>) -> Result<ExitCode> {
    let board = load_board(system)?;
    board.validate()?;

    println!("board: {}", board.name);
    println!("clock: {} Hz", board.core_clock_hz);
    println!("requested: {} baud", board.uart.baud);
    println!("divisor: {}", board.divisor());
    println!("achieved: {} baud", board.achieved_baud());
    println!("error: {} ppm", board.baud_error_ppm());
    Ok(ExitCode::SUCCESS)
}

fn run_boot(firmware: &Path, system: Option<&Path>) -> Result<ExitCode> {
    let board = load_board(system)?;
    info!("Loading firmware: {:?}", firmware);
    let image = m7boot_loader::load_elf(firmware)?;
    let layout = image.memory_image()?;

    let report = rehearse_boot(&board, &layout, &image.data_initializers())?;
    println!(
        ".data: {} bytes from {:#010x} to {:#010x} ({})",
        report.data_bytes,
        layout.data_load,
        layout.data.start,
        if report.data_matches { "ok" } else { "MISMATCH" }
    );
    println!(
        ".bss: {} bytes at {:#010x} ({})",
        report.bss_bytes,
        layout.bss.start,
        if report.bss_zeroed { "zeroed" } else { "NOT ZEROED" }
    );
    if !report.untouched_intact {
        println!("memory outside .data/.bss was modified");
    }
    println!("status: {}", status(report.passed()));
    Ok(exit_code(report.passed()))
}

#[derive(Serialize)]
struct SimulateConfig {
    script: String,
    system: Option<String>,
}

#[derive(Serialize)]
struct SimulateResult<'a> {
    status: &'static str,
    stop_reason: m7boot_config::StopReason,
    iterations: u32,
    delay_ms_total: u64,
    script_hash: String,
    assertions: &'a [AssertionOutcome],
    config: SimulateConfig,
    transcript: &'a str,
}

fn run_simulate(
    script_path: &Path,
    system: Option<&Path>,
    output_dir: Option<&Path>,
    no_uart_stdout: bool,
) -> Result<ExitCode> {
    let script = ConsoleScript::from_file(script_path)?;
    let board_config = load_board(system)?;
    let board = SimBoard::from_config(&board_config);
    board.with_uart(|uart| uart.set_echo_stdout(!no_uart_stdout))?;

    info!(
        "Running console session: {} input bytes, at most {} iterations",
        script.input.len(),
        script.limits.max_iterations
    );
    let report: SessionReport = run_session(&board, &script)?;
    let outcomes = check_assertions(&script, &report);
    for outcome in outcomes.iter().filter(|o| !o.passed) {
        warn!("Assertion failed: {}", outcome.assertion);
    }
    let passed = outcomes.iter().all(|o| o.passed);

    println!();
    println!(
        "stop reason: {:?}, iterations: {}, status: {}",
        report.stop_reason,
        report.iterations,
        status(passed)
    );

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
        let result = SimulateResult {
            status: status(passed),
            stop_reason: report.stop_reason,
            iterations: report.iterations,
            delay_ms_total: report.delay_ms_total,
            script_hash: sha256_file(script_path)?,
            assertions: &outcomes,
            config: SimulateConfig {
                script: script_path.display().to_string(),
                system: system.map(|p| p.display().to_string()),
            },
            transcript: &report.transcript,
        };
        std::fs::write(dir.join("result.json"), serde_json::to_string_pretty(&result)?)?;
        std::fs::write(dir.join("uart.log"), &report.transcript)?;
        info!("Artifacts written to {:?}", dir);
    }

    Ok(exit_code(passed))
}
