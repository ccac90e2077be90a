//! CPU core model.
//!
//! Describes the properties of the processor that the firmware is built for:
//! architecture, data width, byte ordering, reset vector, and how
//! multiplication/division is implemented.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Byte ordering of the CPU data bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Lowercase name, as used in generated configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            ByteOrder::Little => "little",
            ByteOrder::Big => "big",
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implementation of the multiply/divide instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MulDiv {
    /// Hardware multiplier and divider.
    Hard,
    /// Emulated in software by the toolchain runtime.
    Soft,
}

impl MulDiv {
    pub fn as_str(&self) -> &'static str {
        match self {
            MulDiv::Hard => "hard",
            MulDiv::Soft => "soft",
        }
    }
}

impl fmt::Display for MulDiv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model of a CPU core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Cpu {
    /// Core name (e.g., "minerva", "vexriscv").
    pub name: String,
    /// Architecture name (e.g., "riscv").
    pub arch: String,
    /// Data bus width in bits.
    pub data_width: u32,
    /// Byte ordering.
    pub byteorder: ByteOrder,
    /// Address of the first instruction fetched after reset.
    pub reset_addr: u64,
    /// Multiply/divide implementation.
    pub muldiv: MulDiv,
}

impl Cpu {
    /// Data width in bytes.
    pub fn word_bytes(&self) -> usize {
        (self.data_width / 8) as usize
    }

    /// Whether `data_width` is a whole number of bytes that fits a `u64` word.
    pub fn has_valid_data_width(&self) -> bool {
        self.data_width >= 8 && self.data_width <= 64 && self.data_width % 8 == 0
    }

    /// Construct a Minerva RV32 core resetting to address 0.
    pub fn minerva() -> Self {
        Self {
            name: "minerva".into(),
            arch: "riscv".into(),
            data_width: 32,
            byteorder: ByteOrder::Little,
            reset_addr: 0x0000_0000,
            muldiv: MulDiv::Hard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minerva_defaults() {
        let cpu = Cpu::minerva();
        assert_eq!(cpu.data_width, 32);
        assert_eq!(cpu.word_bytes(), 4);
        assert_eq!(cpu.byteorder, ByteOrder::Little);
        assert!(cpu.has_valid_data_width());
    }

    #[test]
    fn data_width_bounds() {
        let mut cpu = Cpu::minerva();
        for width in [8, 16, 24, 64] {
            cpu.data_width = width;
            assert!(cpu.has_valid_data_width(), "{width}");
        }
        for width in [0, 7, 12, 128] {
            cpu.data_width = width;
            assert!(!cpu.has_valid_data_width(), "{width}");
        }
    }

    #[test]
    fn enum_names() {
        assert_eq!(ByteOrder::Big.to_string(), "big");
        assert_eq!(MulDiv::Soft.to_string(), "soft");
        assert_eq!(MulDiv::Hard.as_str(), "hard");
    }
}
