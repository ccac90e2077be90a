//! Build pipeline orchestrator.
//!
//! plan -> execute -> extract firmware -> initialize ROM. Each stage runs only
//! after the previous one succeeded and only as deep as the caller asked.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use socgen_model::{SocDescription, SystemModel};

use crate::bios::FIRMWARE_PATH;
use crate::error::{BuildError, Result};
use crate::firmware::{self, FirmwareImage, RemainderPolicy};
use crate::plan::{BuildPlan, PlanBuilder};
use crate::product::ProductSet;
use crate::report::BuildReport;

/// Parameter carrying [`BuildOptions::litedram_dir`]; set it through the
/// option, never in `params`.
pub const LITEDRAM_DIR_PARAM: &str = "litedram_dir";

/// Furthest stage a build reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildStage {
    Planned,
    Built,
    Extracted,
    Initialized,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildStage::Planned => "planned",
            BuildStage::Built => "built",
            BuildStage::Extracted => "extracted",
            BuildStage::Initialized => "initialized",
        })
    }
}

/// Configuration for one build invocation.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Run name; `top` when unset.
    pub name: Option<String>,
    /// Working directory for generated files and commands.
    pub build_dir: PathBuf,
    /// Directory of generated memory controller cores, exposed to templates
    /// as `litedram_dir`.
    pub litedram_dir: PathBuf,
    /// Extra template parameters.
    pub params: BTreeMap<String, String>,
    /// Run the plan's commands.
    pub do_build: bool,
    /// Load the firmware into the ROM. Requires `do_build`.
    pub do_init: bool,
    /// Firmware binary, relative to the build directory.
    pub firmware_path: PathBuf,
    pub remainder: RemainderPolicy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            name: None,
            build_dir: PathBuf::from("build/soc"),
            litedram_dir: PathBuf::from("build/litedram"),
            params: BTreeMap::new(),
            do_build: true,
            do_init: false,
            firmware_path: PathBuf::from(FIRMWARE_PATH),
            remainder: RemainderPolicy::Reject,
        }
    }
}

/// Terminal result of a build.
#[derive(Debug)]
pub enum BuildOutcome {
    /// Execution was not requested.
    Planned(BuildPlan),
    /// Executed, initialization not requested.
    Built(ProductSet),
    /// The firmware was installed into the model's ROM.
    Initialized(FirmwareImage),
}

impl BuildOutcome {
    pub fn stage(&self) -> BuildStage {
        match self {
            BuildOutcome::Planned(_) => BuildStage::Planned,
            BuildOutcome::Built(_) => BuildStage::Built,
            BuildOutcome::Initialized(_) => BuildStage::Initialized,
        }
    }
}

/// Output of a successful build.
#[derive(Debug)]
pub struct BuildOutput {
    pub outcome: BuildOutcome,
    pub report: BuildReport,
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| BuildError::io(path, e))
}

/// Run the build pipeline against `model`.
///
/// With `do_init`, the decoded firmware replaces the ROM's initialization
/// data. Any failure aborts before the next stage starts; nothing already
/// written to the build directory is rolled back.
pub fn build(
    model: &mut SystemModel,
    builder: &PlanBuilder,
    options: &BuildOptions,
) -> Result<BuildOutput> {
    let start = Instant::now();
    if options.params.contains_key(LITEDRAM_DIR_PARAM) {
        return Err(BuildError::ReservedParameter {
            name: LITEDRAM_DIR_PARAM.to_string(),
        });
    }
    let build_dir = absolute(&options.build_dir)?;
    let litedram_dir = absolute(&options.litedram_dir)?;

    let mut params = options.params.clone();
    params.insert(LITEDRAM_DIR_PARAM.into(), litedram_dir.display().to_string());

    // Stage 1: plan
    let plan = builder.prepare(model, &build_dir, options.name.as_deref(), &params)?;
    log::info!("stage {}: {}", BuildStage::Planned, plan.name());
    let mut report = BuildReport::new(&plan, model);

    if !options.do_build {
        if options.do_init {
            log::warn!("firmware initialization needs an executed build; returning the plan");
        }
        report.finish(BuildStage::Planned, start);
        return Ok(BuildOutput {
            outcome: BuildOutcome::Planned(plan),
            report,
        });
    }

    // Stage 2: execute
    let products = plan.execute_local()?;
    log::info!("stage {}: {}", BuildStage::Built, products.root().display());
    if !options.do_init {
        report.finish(BuildStage::Built, start);
        return Ok(BuildOutput {
            outcome: BuildOutcome::Built(products),
            report,
        });
    }

    // Stage 3: extract and decode
    let (data_width, byteorder) = (model.cpu().data_width, model.cpu().byteorder);
    let image = products.extract_with(&options.firmware_path, |artifact| {
        log::info!("stage {}: {}", BuildStage::Extracted, artifact.path().display());
        Ok(firmware::load(artifact, data_width, byteorder, options.remainder)?)
    })?;

    // Stage 4: initialize
    model.set_rom_init(image.words.clone())?;
    log::info!("stage {}: {image}", BuildStage::Initialized);
    report.record_firmware(&image, model);
    report.finish(BuildStage::Initialized, start);
    Ok(BuildOutput {
        outcome: BuildOutcome::Initialized(image),
        report,
    })
}

/// Validate `desc`, then run [`build`] on the resulting model.
///
/// An incomplete description fails with
/// [`socgen_model::ModelError::InvalidModel`] before any file is written.
/// Returns the (possibly initialized) model alongside the build output.
pub fn build_description(
    desc: SocDescription,
    builder: &PlanBuilder,
    options: &BuildOptions,
) -> Result<(SystemModel, BuildOutput)> {
    let mut model = SystemModel::from_description(desc)?;
    let output = build(&mut model, builder, options)?;
    Ok((model, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TemplateRegistry;

    fn builder(command: &str) -> PlanBuilder {
        let mut reg = TemplateRegistry::new();
        reg.add_file("{{name}}.config", "DIR={{litedram_dir}}");
        reg.add_command("firmware", command);
        PlanBuilder::new(reg)
    }

    fn options(dir: &Path) -> BuildOptions {
        BuildOptions {
            build_dir: dir.join("soc"),
            litedram_dir: dir.join("litedram"),
            ..BuildOptions::default()
        }
    }

    fn model() -> SystemModel {
        SystemModel::from_description(SocDescription::example_minerva()).unwrap()
    }

    #[test]
    fn plan_only_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let opts = BuildOptions {
            do_build: false,
            ..options(dir.path())
        };
        let mut model = model();
        let output = build(&mut model, &builder("exit 1"), &opts).unwrap();
        assert_eq!(output.outcome.stage(), BuildStage::Planned);
        assert_eq!(output.report.stage, BuildStage::Planned);
        let BuildOutcome::Planned(plan) = output.outcome else {
            panic!("expected a plan");
        };
        let litedram = dir.path().join("litedram");
        assert_eq!(
            plan.files()[0].contents,
            format!("DIR={}\n", litedram.display())
        );
        assert!(!dir.path().join("soc").exists());
    }

    #[test]
    fn litedram_dir_param_is_reserved() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path());
        opts.params.insert("litedram_dir".into(), "/elsewhere".into());
        let err = build(&mut model(), &builder("true"), &opts).unwrap_err();
        assert!(matches!(err, BuildError::ReservedParameter { ref name } if name == "litedram_dir"));
        assert!(!dir.path().join("soc").exists());
    }

    #[test]
    fn init_without_build_returns_plan() {
        let dir = tempfile::tempdir().unwrap();
        let opts = BuildOptions {
            do_build: false,
            do_init: true,
            ..options(dir.path())
        };
        let mut model = model();
        let output = build(&mut model, &builder("true"), &opts).unwrap();
        assert_eq!(output.outcome.stage(), BuildStage::Planned);
        assert!(model.rom().init.is_empty());
    }

    #[test]
    fn build_without_init_returns_products() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = model();
        let output = build(&mut model, &builder("echo done > out.txt"), &options(dir.path())).unwrap();
        let BuildOutcome::Built(products) = output.outcome else {
            panic!("expected products");
        };
        assert_eq!(products.get("out.txt").unwrap(), b"done\n");
        assert!(model.rom().init.is_empty());
    }

    #[test]
    fn init_installs_words() {
        let dir = tempfile::tempdir().unwrap();
        let opts = BuildOptions {
            do_init: true,
            ..options(dir.path())
        };
        let mut model = model();
        let output = build(
            &mut model,
            &builder(r"mkdir -p bios && printf '\003\000\000\000\004\000\000\000' > bios/bios.bin"),
            &opts,
        )
        .unwrap();
        assert_eq!(output.outcome.stage(), BuildStage::Initialized);
        assert_eq!(model.rom().init, vec![3, 4]);
        let rom = output.report.rom.unwrap();
        assert_eq!(rom.used, 8);
        assert_eq!(rom.available, 0x2000);
    }

    #[test]
    fn missing_firmware_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let opts = BuildOptions {
            do_init: true,
            ..options(dir.path())
        };
        let mut model = model();
        let err = build(&mut model, &builder("true"), &opts).unwrap_err();
        assert!(matches!(err, BuildError::ArtifactNotFound { .. }));
    }

    #[test]
    fn oversized_firmware_leaves_rom_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let opts = BuildOptions {
            do_init: true,
            ..options(dir.path())
        };
        let mut model = model();
        // 0x2000-byte ROM, 0x2004 bytes of firmware.
        let err = build(
            &mut model,
            &builder("mkdir -p bios && head -c 8196 /dev/zero > bios/bios.bin"),
            &opts,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Model(socgen_model::ModelError::InitTooLarge { .. })
        ));
        assert!(model.rom().init.is_empty());
    }

    #[test]
    fn stages_are_ordered() {
        assert!(BuildStage::Planned < BuildStage::Built);
        assert!(BuildStage::Extracted < BuildStage::Initialized);
        assert_eq!(BuildStage::Initialized.to_string(), "initialized");
    }
}
