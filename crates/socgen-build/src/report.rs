//! Build report aggregating what each pipeline stage produced.

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use socgen_model::SystemModel;

use crate::firmware::FirmwareImage;
use crate::pipeline::BuildStage;
use crate::plan::BuildPlan;

/// ROM occupancy after firmware initialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RomUsage {
    /// Bytes used.
    pub used: u64,
    /// Bytes available.
    pub available: u64,
    /// Usage as a percentage.
    pub percent: f64,
}

impl RomUsage {
    pub fn new(used: u64, available: u64) -> Self {
        let percent = if available > 0 {
            (used as f64 / available as f64) * 100.0
        } else {
            0.0
        };
        Self {
            used,
            available,
            percent,
        }
    }
}

impl fmt::Display for RomUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rom: {}/{} bytes ({:.1}%)",
            self.used, self.available, self.percent
        )
    }
}

/// Summary of one build invocation.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Run name.
    pub name: String,
    /// SoC name.
    pub soc: String,
    pub build_dir: PathBuf,
    /// Furthest stage reached.
    pub stage: BuildStage,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
    /// Planned files, relative to `build_dir`.
    pub files: Vec<PathBuf>,
    pub commands: Vec<String>,
    pub firmware: Option<FirmwareImage>,
    pub rom: Option<RomUsage>,
}

impl BuildReport {
    /// Start a report for a freshly planned build.
    pub fn new(plan: &BuildPlan, model: &SystemModel) -> Self {
        Self {
            name: plan.name().to_string(),
            soc: model.name().to_string(),
            build_dir: plan.build_dir().to_path_buf(),
            stage: BuildStage::Planned,
            duration_ms: 0,
            files: plan.files().iter().map(|f| f.path.clone()).collect(),
            commands: plan.commands().to_vec(),
            firmware: None,
            rom: None,
        }
    }

    pub(crate) fn record_firmware(&mut self, image: &FirmwareImage, model: &SystemModel) {
        let word_bytes = model.cpu().word_bytes() as u64;
        self.rom = Some(RomUsage::new(
            image.words.len() as u64 * word_bytes,
            model.rom().size,
        ));
        self.firmware = Some(image.clone());
    }

    pub(crate) fn finish(&mut self, stage: BuildStage, start: Instant) {
        self.stage = stage;
        self.duration_ms = start.elapsed().as_millis() as u64;
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Build Report ===")?;
        writeln!(f, "Run: {} (soc {})", self.name, self.soc)?;
        writeln!(f, "Build dir: {}", self.build_dir.display())?;
        writeln!(f, "Stage: {}", self.stage)?;
        writeln!(f, "Duration: {} ms", self.duration_ms)?;

        writeln!(f)?;
        writeln!(f, "--- Files ({}) ---", self.files.len())?;
        for file in &self.files {
            writeln!(f, "  {}", file.display())?;
        }

        writeln!(f)?;
        writeln!(f, "--- Commands ({}) ---", self.commands.len())?;
        for (i, command) in self.commands.iter().enumerate() {
            writeln!(f, "  [{i}] {command}")?;
        }

        if let Some(image) = &self.firmware {
            writeln!(f)?;
            writeln!(f, "--- Firmware ---")?;
            writeln!(f, "  {image}")?;
            if let Some(rom) = &self.rom {
                writeln!(f, "  {rom}")?;
            }
        }
        Ok(())
    }
}
