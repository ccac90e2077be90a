//! System model definitions for socgen.
//!
//! A system model describes a CPU-based SoC: the CPU core, the interrupt
//! controller, the memory and I/O peripherals, the bus they are attached to,
//! and the clock frequency.
//!
//! Models are loaded from a [`SocDescription`] (the serde form of a
//! `.soc.toml` file) and validated once by [`SystemModel::from_description`].
//! After that the model is read-only, except for the ROM initialization data
//! installed by the firmware loader.

pub mod bus;
pub mod cpu;
pub mod error;
pub mod intc;
pub mod parse;
pub mod periph;
pub mod soc;

pub use bus::{Bus, BusWindow};
pub use cpu::{ByteOrder, Cpu, MulDiv};
pub use error::{ModelError, Result};
pub use intc::InterruptController;
pub use parse::{
    description_to_toml, discover_socs, generate_template, load_description_toml,
    parse_description_toml, validate_model, ValidationIssue,
};
pub use periph::{
    CacheConfig, Peripheral, PeripheralSlot, SdramCore, SdramPeripheral, SramPeripheral,
    TimerPeripheral, UartPeripheral,
};
pub use soc::{SocDescription, SystemModel};
