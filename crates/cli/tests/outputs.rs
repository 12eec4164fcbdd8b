// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use m7boot_loader::fixture::FirmwareFixture;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir()
        .join("m7boot-tests")
        .join(format!("{}-{}", prefix, nonce));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

fn m7boot(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_m7boot"))
        .args(args)
        .output()
        .expect("Failed to execute m7boot")
}

#[test]
fn test_cli_help_lists_subcommands() {
    let output = m7boot(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for cmd in ["verify", "baud", "boot", "simulate"] {
        assert!(stdout.contains(cmd), "missing '{}' in help", cmd);
    }
}

#[test]
fn test_cli_baud_reference_board() {
    let output = m7boot(&["baud"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("divisor: 1875"));
    assert!(stdout.contains("achieved: 115200 baud"));
    assert!(stdout.contains("error: 0 ppm"));
}

#[test]
fn test_cli_baud_rejects_bad_board() {
    let dir = temp_dir("baud-bad");
    let system = write_file(
        &dir,
        "board.yaml",
        r#"
name: "too-slow"
core_clock_hz: 216000000
vector_table_base: 0x08000000
memory:
  flash: { base: 0x08000000, size: "1 MiB" }
  ram: { base: 0x20000000, size: "512 KiB" }
uart:
  base_address: 0x40011000
  baud: 1200
  tx_pin: 9
  rx_pin: 10
  alternate_function: 7
"#,
    );

    let output = m7boot(&["baud", "--system", system.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_verify_missing_firmware_fails() {
    let output = m7boot(&["verify", "--firmware", "/nonexistent/firmware.elf"]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_verify_clean_fixture_writes_json() {
    let dir = temp_dir("verify");
    let firmware = dir.join("firmware.elf");
    FirmwareFixture::reference()
        .with_handler(53, "USART1", 0x0800_0401)
        .write_to(&firmware)
        .unwrap();
    let json = dir.join("audit.json");

    let output = m7boot(&[
        "verify",
        "--firmware",
        firmware.to_str().unwrap(),
        "--json",
        json.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("107 slots"));
    assert!(stdout.contains("USART1"));

    let result: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(result["status"], "pass");
    assert_eq!(result["firmware_hash"].as_str().unwrap().len(), 64);
    assert_eq!(result["report"]["slots"].as_array().unwrap().len(), 107);
    assert_eq!(result["report"]["slots"][53]["class"], "handler");
    assert_eq!(result["report"]["slots"][7]["class"], "reserved");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_verify_reports_findings() {
    let dir = temp_dir("verify-bad");
    let firmware = dir.join("firmware.elf");
    let mut fixture = FirmwareFixture::reference();
    fixture.table[13] = 0x0800_0301;
    fixture.write_to(&firmware).unwrap();

    let output = m7boot(&["verify", "--firmware", firmware.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FINDING: reserved slot 13"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_verify_rejects_oversized_table() {
    let dir = temp_dir("verify-long");
    let firmware = dir.join("firmware.elf");
    let mut fixture = FirmwareFixture::reference();
    fixture.table.push(0x0800_0301);
    fixture.write_to(&firmware).unwrap();

    let output = m7boot(&["verify", "--firmware", firmware.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FINDING: vector table has 108 slots, expected exactly 107"));
    assert!(stdout.contains("status: fail"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_boot_rehearsal() {
    let dir = temp_dir("boot");
    let firmware = dir.join("firmware.elf");
    FirmwareFixture::reference().write_to(&firmware).unwrap();

    let output = m7boot(&["boot", "--firmware", firmware.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(".data: 16 bytes"));
    assert!(stdout.contains("zeroed"));
    assert!(stdout.contains("status: pass"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_simulate_outputs() {
    let dir = temp_dir("simulate");
    let script = write_file(
        &dir,
        "script.yaml",
        r#"
schema_version: "1.0"
input: "hi"
limits:
  max_iterations: 10
  max_polls: 100
assertions:
  - uart_contains: "You typed: i"
  - expected_stop_reason: input_exhausted
"#,
    );
    let output_dir = dir.join("artifacts");

    let output = m7boot(&[
        "simulate",
        "--script",
        script.to_str().unwrap(),
        "--no-uart-stdout",
        "--output-dir",
        output_dir.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Cortex-M7 Hello World Example"));

    let result: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(output_dir.join("result.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(result["status"], "pass");
    assert_eq!(result["stop_reason"], "input_exhausted");
    assert_eq!(result["iterations"], 2);
    assert!(result["config"]["script"]
        .as_str()
        .unwrap()
        .contains("script.yaml"));

    let uart_log = std::fs::read_to_string(output_dir.join("uart.log")).unwrap();
    assert!(uart_log.contains("You typed: h"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_simulate_echoes_uart_by_default() {
    let dir = temp_dir("simulate-echo");
    let script = write_file(
        &dir,
        "script.yaml",
        r#"
schema_version: "1.0"
input: "a"
limits:
  max_iterations: 1
"#,
    );

    let output = m7boot(&["simulate", "--script", script.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Cortex-M7 Hello World Example"));
    assert!(stdout.contains("You typed: a"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_simulate_assertion_failure() {
    let dir = temp_dir("simulate-fail");
    let script = write_file(
        &dir,
        "script.yaml",
        r#"
schema_version: "1.0"
input: "a"
limits:
  max_iterations: 1
assertions:
  - uart_contains: "ThisTextWillNeverBeFound"
"#,
    );

    let output = m7boot(&["simulate", "--script", script.to_str().unwrap(), "--no-uart-stdout"]);
    assert_eq!(output.status.code(), Some(1));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_simulate_bad_script_is_config_error() {
    let dir = temp_dir("simulate-version");
    let script = write_file(
        &dir,
        "script.yaml",
        r#"
schema_version: "2.0"
limits:
  max_iterations: 1
"#,
    );

    let output = m7boot(&["simulate", "--script", script.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));

    let _ = std::fs::remove_dir_all(&dir);
}
