//! Build engine for socgen.
//!
//! Turns a [`socgen_model::SystemModel`] into a firmware build through a
//! staged pipeline: template rendering into a build plan, sequential command
//! execution in a working directory, artifact extraction, and decoding of the
//! firmware binary into ROM initialization words.

pub mod bios;
pub mod error;
pub mod execute;
pub mod firmware;
pub mod pipeline;
pub mod plan;
pub mod product;
pub mod registry;
pub mod report;
pub mod template;

pub use bios::{bios_builder, bios_templates, FIRMWARE_PATH};
pub use error::{BuildError, FirmwareError, Result};
pub use execute::execute_plan;
pub use firmware::{decode_words, encode_words, load, FirmwareImage, RemainderPolicy};
pub use pipeline::{
    build, build_description, BuildOptions, BuildOutcome, BuildOutput, BuildStage,
    LITEDRAM_DIR_PARAM,
};
pub use plan::{BuildPlan, PlanBuilder, PlannedFile, DEFAULT_RUN_NAME};
pub use product::{Artifact, ProductSet};
pub use registry::{CommandTemplate, FileTemplate, TemplateRegistry};
pub use report::{BuildReport, RomUsage};
pub use template::Template;
