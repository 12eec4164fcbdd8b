// M7Boot - Bare-Metal Bring-Up Kit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use m7boot_core::board;
use m7boot_core::peripherals::{gpio, usart};
use m7boot_core::uart::{self, UartConfig, WaitPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MemoryRange {
    pub base: u64,
    pub size: String, // e.g. "512 KiB"
}

impl MemoryRange {
    pub fn size_bytes(&self) -> Result<u64> {
        parse_size(&self.size).with_context(|| format!("bad memory size '{}'", self.size))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MemoryMap {
    pub flash: MemoryRange,
    pub ram: MemoryRange,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaitConfig {
    #[default]
    Unbounded,
    Bounded { max_polls: u32 },
}

impl From<WaitConfig> for WaitPolicy {
    fn from(wait: WaitConfig) -> Self {
        match wait {
            WaitConfig::Unbounded => WaitPolicy::Unbounded,
            WaitConfig::Bounded { max_polls } => WaitPolicy::Bounded { max_polls },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UartSettings {
    pub base_address: u64,
    pub baud: u32,
    pub tx_pin: u8,
    pub rx_pin: u8,
    pub alternate_function: u8,
    /// `unbounded`, or `bounded: { max_polls: N }` as a one-key map.
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub wait: WaitConfig,
}

/// Board description for the host tooling. The firmware image does not read
/// it; its values are compiled in from `m7boot_core::board`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    pub name: String,
    pub core_clock_hz: u32,
    pub vector_table_base: u64,
    pub memory: MemoryMap,
    pub uart: UartSettings,
}

impl BoardConfig {
    /// The STM32F7 board the firmware is built for.
    pub fn reference() -> Self {
        let console = board::CONSOLE_UART;
        Self {
            name: "stm32f7-reference".to_string(),
            core_clock_hz: board::CORE_CLOCK_HZ,
            vector_table_base: board::VECTOR_TABLE_BASE as u64,
            memory: MemoryMap {
                flash: MemoryRange {
                    base: 0x0800_0000,
                    size: "1 MiB".to_string(),
                },
                ram: MemoryRange {
                    base: 0x2000_0000,
                    size: "512 KiB".to_string(),
                },
            },
            uart: UartSettings {
                base_address: usart::USART1_BASE as u64,
                baud: console.baud,
                tx_pin: console.tx_pin,
                rx_pin: console.rx_pin,
                alternate_function: console.alternate_function,
                wait: WaitConfig::Unbounded,
            },
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open board config at {:?}", path.as_ref()))?;
        let config: Self = serde_yaml::from_reader(f).context("Failed to parse Board Config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.core_clock_hz == 0 {
            anyhow::bail!("'core_clock_hz' must be greater than zero");
        }
        if self.uart.baud == 0 {
            anyhow::bail!("UART 'baud' must be greater than zero");
        }

        let divisor = self.divisor();
        if divisor == 0 || divisor > usart::BRR_MAX {
            anyhow::bail!(
                "baud divisor {} for {} Hz / {} baud does not fit BRR (1..={})",
                divisor,
                self.core_clock_hz,
                self.uart.baud,
                usart::BRR_MAX
            );
        }

        for (role, pin) in [("tx_pin", self.uart.tx_pin), ("rx_pin", self.uart.rx_pin)] {
            if pin >= gpio::PINS {
                anyhow::bail!("UART '{}' {} out of range (0..{})", role, pin, gpio::PINS);
            }
        }
        if self.uart.tx_pin == self.uart.rx_pin {
            anyhow::bail!("UART 'tx_pin' and 'rx_pin' must differ");
        }
        if self.uart.alternate_function >= 16 {
            anyhow::bail!(
                "UART 'alternate_function' {} out of range (0..16)",
                self.uart.alternate_function
            );
        }
        if self.uart.wait == (WaitConfig::Bounded { max_polls: 0 }) {
            anyhow::bail!("bounded wait 'max_polls' must be greater than zero");
        }

        self.memory.flash.size_bytes()?;
        self.memory.ram.size_bytes()?;
        Ok(())
    }

    pub fn uart_config(&self) -> UartConfig {
        UartConfig {
            clock_hz: self.core_clock_hz,
            baud: self.uart.baud,
            tx_pin: self.uart.tx_pin,
            rx_pin: self.uart.rx_pin,
            alternate_function: self.uart.alternate_function,
            wait: self.uart.wait.into(),
        }
    }

    pub fn divisor(&self) -> u32 {
        uart::baud_divisor(self.core_clock_hz, self.uart.baud)
    }

    pub fn achieved_baud(&self) -> u32 {
        uart::achieved_baud(self.core_clock_hz, self.divisor())
    }

    /// Signed deviation of the achieved rate from the requested one, in
    /// parts per million. Positive means the line runs fast.
    ///
    /// Computed from the exact ratio `clock / (divisor * baud)`, not from the
    /// truncated [`BoardConfig::achieved_baud`].
    pub fn baud_error_ppm(&self) -> i64 {
        let divisor = u64::from(self.divisor());
        let baud = u64::from(self.uart.baud);
        if divisor == 0 || baud == 0 {
            return 0;
        }
        let ratio_ppm = u64::from(self.core_clock_hz) * 1_000_000 / (divisor * baud);
        ratio_ppm as i64 - 1_000_000
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SessionLimits {
    pub max_iterations: u32,
    /// Status reads per wait before the console gives up on input.
    #[serde(default)]
    pub max_polls: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxIterations,
    InputExhausted,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UartContainsAssertion {
    pub uart_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StopReasonAssertion {
    pub expected_stop_reason: StopReason,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum ScriptAssertion {
    UartContains(UartContainsAssertion),
    ExpectedStopReason(StopReasonAssertion),
}

/// Scripted console session: bytes typed at the terminal and what the
/// transcript must show afterwards.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ConsoleScript {
    pub schema_version: String,
    #[serde(default)]
    pub input: String,
    pub limits: SessionLimits,
    #[serde(default)]
    pub assertions: Vec<ScriptAssertion>,
}

impl ConsoleScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open console script at {:?}", path.as_ref()))?;
        let script: Self =
            serde_yaml::from_reader(f).context("Failed to parse Console Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.limits.max_iterations == 0 {
            anyhow::bail!("Limit 'max_iterations' must be greater than zero");
        }

        if self.limits.max_polls == Some(0) {
            anyhow::bail!("Limit 'max_polls' must be greater than zero");
        }

        Ok(())
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_board() {
        let board = BoardConfig::reference();
        assert!(board.validate().is_ok());
        assert_eq!(board.divisor(), 1875);
        assert_eq!(board.achieved_baud(), 115_200);
        assert_eq!(board.baud_error_ppm(), 0);
        assert_eq!(board.uart_config(), board::CONSOLE_UART);
        assert_eq!(board.memory.ram.size_bytes().unwrap(), 512 * 1024);
    }

    #[test]
    fn test_board_yaml() {
        let yaml = r#"
name: "custom"
core_clock_hz: 16000000
vector_table_base: 0x08000000
memory:
  flash:
    base: 0x08000000
    size: "64 KiB"
  ram:
    base: 0x20000000
    size: "16 KiB"
uart:
  base_address: 0x40011000
  baud: 9600
  tx_pin: 9
  rx_pin: 10
  alternate_function: 7
  wait:
    bounded:
      max_polls: 500
"#;
        let board: BoardConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(board.validate().is_ok());
        assert_eq!(board.divisor(), 1666);
        assert_eq!(board.achieved_baud(), 9603);
        assert_eq!(board.baud_error_ppm(), 400);
        assert_eq!(
            board.uart_config().wait,
            WaitPolicy::Bounded { max_polls: 500 }
        );
    }

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("m7boot-config-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}-{}.yaml", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_board_file_wait_forms() {
        let unbounded = serde_yaml::to_string(&BoardConfig::reference()).unwrap();
        assert!(unbounded.contains("wait: unbounded"));
        let path = write_temp("unbounded", &unbounded);
        let board = BoardConfig::from_file(&path).unwrap();
        assert_eq!(board, BoardConfig::reference());
        let _ = std::fs::remove_file(&path);

        let mut bounded = BoardConfig::reference();
        bounded.uart.wait = WaitConfig::Bounded { max_polls: 250 };
        let yaml = serde_yaml::to_string(&bounded).unwrap();
        assert!(!yaml.contains('!'), "expected a plain map, got:\n{}", yaml);
        let path = write_temp("bounded", &yaml);
        let board = BoardConfig::from_file(&path).unwrap();
        assert_eq!(board.uart.wait, WaitConfig::Bounded { max_polls: 250 });
        assert_eq!(
            board.uart_config().wait,
            WaitPolicy::Bounded { max_polls: 250 }
        );
        let _ = std::fs::remove_file(&path);

        let handwritten = unbounded.replace(
            "wait: unbounded",
            "wait:\n    bounded:\n      max_polls: 42",
        );
        let path = write_temp("handwritten", &handwritten);
        let board = BoardConfig::from_file(&path).unwrap();
        assert_eq!(board.uart.wait, WaitConfig::Bounded { max_polls: 42 });
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_baud_error_uses_exact_ratio() {
        let mut board = BoardConfig::reference();
        assert_eq!(board.baud_error_ppm(), 0);

        // 216 MHz / 230400 -> divisor 937, true rate 230522.94
        board.uart.baud = 230_400;
        assert_eq!(board.divisor(), 937);
        assert_eq!(board.baud_error_ppm(), 533);

        // 216 MHz / 9600 -> divisor 22500, exact
        board.uart.baud = 9600;
        assert_eq!(board.baud_error_ppm(), 0);
    }

    #[test]
    fn test_wait_defaults_to_unbounded() {
        let mut yaml = serde_yaml::to_string(&BoardConfig::reference()).unwrap();
        yaml = yaml.replace("  wait: unbounded\n", "");
        let board: BoardConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(board.uart.wait, WaitConfig::Unbounded);
    }

    #[test]
    fn test_board_rejections() {
        let cases: [(fn(&mut BoardConfig), &str); 8] = [
            (|b| b.core_clock_hz = 0, "core_clock_hz"),
            (|b| b.uart.baud = 0, "baud"),
            (|b| b.uart.baud = 1000, "does not fit BRR"),
            (|b| b.uart.tx_pin = 16, "tx_pin"),
            (|b| b.uart.rx_pin = b.uart.tx_pin, "must differ"),
            (|b| b.uart.alternate_function = 16, "alternate_function"),
            (
                |b| b.uart.wait = WaitConfig::Bounded { max_polls: 0 },
                "max_polls",
            ),
            (|b| b.memory.ram.size = "lots".to_string(), "bad memory size"),
        ];

        for (mutate, needle) in cases {
            let mut board = BoardConfig::reference();
            mutate(&mut board);
            let err = board.validate().unwrap_err();
            assert!(
                format!("{:#}", err).contains(needle),
                "expected '{}' in '{:#}'",
                needle,
                err
            );
        }
    }

    #[test]
    fn test_valid_script() {
        let yaml = r#"
schema_version: "1.0"
input: "ab"
limits:
  max_iterations: 5
  max_polls: 100
assertions:
  - uart_contains: "You typed: b"
  - expected_stop_reason: input_exhausted
"#;
        let script: ConsoleScript = serde_yaml::from_str(yaml).unwrap();
        assert!(script.validate().is_ok());
        assert_eq!(script.input, "ab");
        assert_eq!(script.limits.max_iterations, 5);
        assert_eq!(script.assertions.len(), 2);
        assert!(matches!(
            script.assertions[1],
            ScriptAssertion::ExpectedStopReason(StopReasonAssertion {
                expected_stop_reason: StopReason::InputExhausted
            })
        ));
    }

    #[test]
    fn test_invalid_version() {
        let yaml = r#"
schema_version: "2.0"
limits:
  max_iterations: 1
"#;
        let script: ConsoleScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("Unsupported schema_version"));
    }

    #[test]
    fn test_invalid_limits() {
        let yaml = r#"
schema_version: "1.0"
limits:
  max_iterations: 0
"#;
        let script: ConsoleScript = serde_yaml::from_str(yaml).unwrap();
        assert!(script.validate().unwrap_err().to_string().contains("max_iterations"));

        let yaml = r#"
schema_version: "1.0"
limits:
  max_iterations: 3
  max_polls: 0
"#;
        let script: ConsoleScript = serde_yaml::from_str(yaml).unwrap();
        assert!(script.validate().unwrap_err().to_string().contains("max_polls"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
schema_version: "1.0"
limits:
  max_iterations: 1
  max_steps: 10
"#;
        assert!(serde_yaml::from_str::<ConsoleScript>(yaml).is_err());
    }
}
