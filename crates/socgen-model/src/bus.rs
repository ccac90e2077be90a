//! Bus interconnect model.
//!
//! Peripheral base addresses are a property of the bus, not of the
//! peripherals: the same peripheral may be attached at different addresses
//! in different SoCs.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// A peripheral attached to the bus at `base`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BusWindow {
    /// Instance name of the attached peripheral.
    pub peripheral: String,
    /// Base address of the window.
    pub base: u64,
}

/// The system bus and its address map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Bus {
    /// Bus data width in bits.
    #[serde(default = "default_bus_width")]
    pub data_width: u32,
    /// Attached peripherals.
    #[serde(default)]
    pub windows: Vec<BusWindow>,
}

fn default_bus_width() -> u32 {
    32
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            data_width: default_bus_width(),
            windows: Vec::new(),
        }
    }
}

impl Bus {
    /// Attach `peripheral` at `base`, replacing an earlier window for it.
    pub fn attach(&mut self, peripheral: impl Into<String>, base: u64) {
        let peripheral = peripheral.into();
        self.windows.retain(|w| w.peripheral != peripheral);
        self.windows.push(BusWindow { peripheral, base });
    }

    /// Window of `peripheral`, if attached.
    pub fn window(&self, peripheral: &str) -> Option<&BusWindow> {
        self.windows.iter().find(|w| w.peripheral == peripheral)
    }

    /// Resolve the base address of `peripheral`.
    pub fn address_of(&self, peripheral: &str) -> Result<u64> {
        self.window(peripheral)
            .map(|w| w.base)
            .ok_or_else(|| ModelError::UnresolvedPeripheral {
                peripheral: peripheral.to_string(),
            })
    }

    /// Alignment required of window bases, in bytes.
    pub fn granularity_bytes(&self) -> u64 {
        u64::from(self.data_width / 8).max(1)
    }
}
