//! Peripheral models.
//!
//! Peripherals carry their size and type-specific attributes. Their base
//! addresses live on the [`Bus`](crate::bus::Bus).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Capability slots of a CPU SoC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeripheralSlot {
    Rom,
    Ram,
    /// The only optional slot.
    Sdram,
    Uart,
    Timer,
}

impl PeripheralSlot {
    /// All slots in declaration order.
    pub const ALL: [PeripheralSlot; 5] = [
        PeripheralSlot::Rom,
        PeripheralSlot::Ram,
        PeripheralSlot::Sdram,
        PeripheralSlot::Uart,
        PeripheralSlot::Timer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PeripheralSlot::Rom => "rom",
            PeripheralSlot::Ram => "ram",
            PeripheralSlot::Sdram => "sdram",
            PeripheralSlot::Uart => "uart",
            PeripheralSlot::Timer => "timer",
        }
    }

    /// Look up a slot by its name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Whether the slot may be left empty.
    pub fn is_optional(&self) -> bool {
        matches!(self, PeripheralSlot::Sdram)
    }
}

impl fmt::Display for PeripheralSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common view over the peripheral kinds.
pub trait Peripheral {
    /// Instance name, used to find the peripheral's bus window.
    fn name(&self) -> &str;
    /// Size of the bus window in bytes.
    fn size(&self) -> u64;
    /// Interrupt line owned by the peripheral.
    fn irq(&self) -> Option<&str> {
        None
    }
}

fn default_true() -> bool {
    true
}

/// On-chip SRAM (or ROM, when not writable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SramPeripheral {
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    #[serde(default = "default_true")]
    pub writable: bool,
    /// Initialization contents, one entry per data word.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub init: Vec<u64>,
}

impl SramPeripheral {
    pub fn new(name: impl Into<String>, size: u64, writable: bool) -> Self {
        Self {
            name: name.into(),
            size,
            writable,
            init: Vec::new(),
        }
    }

    /// Number of `word_bytes`-wide words the memory holds.
    pub fn depth(&self, word_bytes: usize) -> u64 {
        self.size / word_bytes.max(1) as u64
    }
}

impl Peripheral for SramPeripheral {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// DRAM controller core behind an SDRAM peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SdramCore {
    /// Core name, also the directory of its generated sources.
    pub name: String,
    /// Size of the DRAM in bytes.
    pub size: u64,
}

/// Cache in front of the SDRAM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Cache size in bytes.
    pub size: u64,
}

/// DRAM-backed memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SdramPeripheral {
    pub name: String,
    /// Size of the bus window in bytes.
    pub size: u64,
    pub core: SdramCore,
    pub cache: CacheConfig,
}

impl Peripheral for SdramPeripheral {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }
}

fn default_csr_size() -> u64 {
    0x1000
}

/// Asynchronous serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UartPeripheral {
    pub name: String,
    #[serde(default = "default_csr_size")]
    pub size: u64,
    /// Interrupt line name.
    pub irq: String,
}

impl Peripheral for UartPeripheral {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn irq(&self) -> Option<&str> {
        Some(&self.irq)
    }
}

/// Timer with a free-running counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimerPeripheral {
    pub name: String,
    #[serde(default = "default_csr_size")]
    pub size: u64,
    /// Counter width in bits.
    pub width: u32,
    /// Interrupt line name.
    pub irq: String,
}

impl Peripheral for TimerPeripheral {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn irq(&self) -> Option<&str> {
        Some(&self.irq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_names_round_trip() {
        for slot in PeripheralSlot::ALL {
            assert_eq!(PeripheralSlot::from_name(slot.as_str()), Some(slot));
        }
        assert!(PeripheralSlot::from_name("spi").is_none());
        assert!(PeripheralSlot::Sdram.is_optional());
        assert!(!PeripheralSlot::Ram.is_optional());
    }

    #[test]
    fn sram_depth() {
        let rom = SramPeripheral::new("rom", 0x2000, false);
        assert_eq!(rom.depth(4), 0x800);
        assert_eq!(rom.depth(8), 0x400);
        assert!(rom.irq().is_none());
    }

    #[test]
    fn uart_defaults_from_toml() {
        let uart: UartPeripheral = toml::from_str("name = \"uart\"\nirq = \"uart\"\n").unwrap();
        assert_eq!(uart.size, 0x1000);
        assert_eq!(uart.irq(), Some("uart"));
    }
}
