//! Error types for system model operations.

use std::path::PathBuf;

/// Errors that can occur while loading or querying a system model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// I/O error reading/writing description files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Description file not found.
    #[error("description file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// The description lacks one or more required capabilities.
    #[error("model does not satisfy the CPU SoC capability set (missing: {})", missing.join(", "))]
    InvalidModel {
        /// Names of the missing slots, in declaration order.
        missing: Vec<String>,
    },

    /// A structural invariant of the model does not hold.
    #[error("validation error: {detail}")]
    Validation {
        /// Description of the validation failure.
        detail: String,
    },

    /// The peripheral has no window on the bus.
    #[error("peripheral '{peripheral}' is not attached to any bus")]
    UnresolvedPeripheral {
        /// Instance name of the peripheral.
        peripheral: String,
    },

    /// The interrupt line was never registered with the controller.
    #[error("interrupt line '{line}' is not registered with the interrupt controller")]
    UnregisteredInterrupt {
        /// Name of the line.
        line: String,
    },

    /// An optional peripheral slot was referenced while empty.
    #[error("optional peripheral '{slot}' is absent")]
    AbsentPeripheral {
        /// Slot name (e.g. "sdram").
        slot: String,
    },

    /// The peripheral does not own an interrupt line.
    #[error("peripheral '{peripheral}' has no interrupt line")]
    NoInterrupt {
        /// Instance name of the peripheral.
        peripheral: String,
    },

    /// Initialization data does not fit the memory.
    #[error("initialization data of {words} words exceeds capacity of {capacity} words")]
    InitTooLarge {
        /// Number of words supplied.
        words: usize,
        /// Number of words the memory holds.
        capacity: u64,
    },
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
