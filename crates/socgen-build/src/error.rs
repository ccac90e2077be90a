//! Build errors.

use std::path::PathBuf;

use socgen_model::ModelError;
use thiserror::Error;

/// Errors that can occur while decoding a firmware image into words.
#[derive(Debug, Error)]
pub enum FirmwareError {
    #[error("unsupported word width of {bits} bits (expected a multiple of 8 up to 64)")]
    UnsupportedWidth { bits: u32 },

    #[error("firmware length {len} is not a multiple of the {word_bytes}-byte word size")]
    TrailingBytes { len: usize, word_bytes: usize },

    #[error("word {index} (0x{value:x}) does not fit in {bits} bits")]
    WordOverflow { index: usize, value: u64, bits: u32 },

    #[error("failed to read firmware image: {0}")]
    Read(#[from] std::io::Error),
}

/// Errors that can occur while planning, executing, or loading a build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("template '{template}': syntax error at line {line}: {message}")]
    TemplateSyntax {
        template: String,
        line: usize,
        message: String,
    },

    #[error("template '{template}': cannot resolve '{reference}': {reason}")]
    TemplateResolution {
        template: String,
        reference: String,
        reason: String,
    },

    #[error("template '{template}': peripheral '{peripheral}' is not attached to any bus")]
    UnresolvedPeripheral { template: String, peripheral: String },

    #[error("template '{template}': interrupt line '{line}' is not registered")]
    UnregisteredInterrupt { template: String, line: String },

    #[error("build parameter '{name}' shadows a built-in template variable")]
    ReservedParameter { name: String },

    #[error("command {index} could not be started: {command}: {source}")]
    Spawn {
        index: usize,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command {index} failed with {status}: {command}\n{output}")]
    BuildFailed {
        index: usize,
        command: String,
        status: String,
        output: String,
    },

    #[error("artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("path escapes the build directory: {}", path.display())]
    PathEscape { path: PathBuf },

    #[error("firmware decoding failed: {0}")]
    Firmware(#[from] FirmwareError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
