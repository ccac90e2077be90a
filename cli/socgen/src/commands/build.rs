//! `socgen build`: plan, execute, and optionally load the firmware.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use socgen_build::{
    bios_builder, BuildOptions, BuildOutcome, BuildOutput, PlanBuilder, RemainderPolicy,
    FIRMWARE_PATH,
};
use socgen_model::{
    description_to_toml, discover_socs, load_description_toml, validate_model, SystemModel,
};

use crate::manifest::SocgenManifest;

/// Options shared by `socgen build` and `socgen plan`.
#[derive(Debug, Clone, Default)]
pub struct BuildArgs {
    pub soc: Option<String>,
    pub name: Option<String>,
    pub build_dir: Option<String>,
    pub litedram_dir: Option<String>,
    pub software_dir: Option<String>,
    /// `KEY=VALUE` template parameters.
    pub params: Vec<String>,
    pub no_execute: bool,
    pub init: bool,
    pub pad_firmware: bool,
    pub emit_soc: Option<String>,
    pub report: Option<String>,
}

/// Output format of the build report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Human,
    Json,
}

impl ReportFormat {
    pub fn parse(format: Option<&str>) -> Result<Self> {
        match format {
            None | Some("human") => Ok(ReportFormat::Human),
            Some("json") => Ok(ReportFormat::Json),
            Some(other) => bail!("unknown report format: '{other}'. Valid: human, json"),
        }
    }
}

/// Run a build.
pub fn run(project_dir: &Path, manifest: Option<&SocgenManifest>, args: &BuildArgs) -> Result<()> {
    let format = ReportFormat::parse(args.report.as_deref())?;
    let (mut model, builder, options) = prepare(project_dir, manifest, args)?;

    let output = socgen_build::build(&mut model, &builder, &options)
        .with_context(|| format!("building '{}'", model.name()))?;

    let note = match &output.outcome {
        BuildOutcome::Planned(plan) => {
            let script = plan.write_to(plan.build_dir())?;
            format!("Plan written; run {} to build", script.display())
        }
        BuildOutcome::Built(products) => {
            format!("Build products in {}", products.root().display())
        }
        BuildOutcome::Initialized(image) => {
            let mut note = format!("ROM initialized with {} words", image.word_count());
            if let Some(path) = &args.emit_soc {
                emit_soc(&model, Path::new(path))?;
                note.push_str(&format!("; description written to {path}"));
            }
            note
        }
    };
    if args.emit_soc.is_some() && !matches!(output.outcome, BuildOutcome::Initialized(_)) {
        log::warn!("--emit-soc only applies to builds run with --init");
    }

    print_report(&output, format, &note)
}

fn print_report(output: &BuildOutput, format: ReportFormat, note: &str) -> Result<()> {
    match format {
        ReportFormat::Human => {
            print!("{}", output.report);
            println!();
            println!("{note}");
        }
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&output.report)
                .context("serializing build report")?;
            println!("{json}");
        }
    }
    Ok(())
}

/// Write the initialized model back out as a description.
fn emit_soc(model: &SystemModel, path: &Path) -> Result<()> {
    let toml = description_to_toml(&model.to_description())
        .context("serializing the initialized SoC description")?;
    fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Load and check the model, and assemble the builder and options from
/// flags over manifest values over defaults.
pub(crate) fn prepare(
    project_dir: &Path,
    manifest: Option<&SocgenManifest>,
    args: &BuildArgs,
) -> Result<(SystemModel, PlanBuilder, BuildOptions)> {
    let soc_path = resolve_soc_path(project_dir, manifest, args.soc.as_deref())?;
    let model = load_model(&soc_path)?;

    let builder = match manifest {
        Some(m) => bios_builder().with_overrides(m.template_overrides(project_dir)?),
        None => bios_builder(),
    };

    let build = manifest.map(|m| &m.build);
    let dir = |flag: &Option<String>, configured: Option<&String>, default: &str| -> PathBuf {
        match (flag, configured) {
            (Some(path), _) => PathBuf::from(path),
            (None, Some(path)) => project_dir.join(path),
            (None, None) => project_dir.join(default),
        }
    };

    let mut params = manifest.map(|m| m.params.clone()).unwrap_or_default();
    for param in &args.params {
        let (key, value) = parse_param(param)?;
        params.insert(key, value);
    }
    let software_dir = match (&args.software_dir, build.and_then(|b| b.software_dir.as_ref())) {
        (Some(path), _) => Some(PathBuf::from(path)),
        (None, Some(path)) => Some(project_dir.join(path)),
        (None, None) => None,
    };
    if let Some(path) = software_dir {
        let path = std::path::absolute(&path)
            .with_context(|| format!("resolving {}", path.display()))?;
        params.insert("software_dir".into(), path.display().to_string());
    }

    let options = BuildOptions {
        name: args.name.clone().or_else(|| build.and_then(|b| b.name.clone())),
        build_dir: dir(&args.build_dir, build.and_then(|b| b.build_dir.as_ref()), "build/soc"),
        litedram_dir: dir(
            &args.litedram_dir,
            build.and_then(|b| b.litedram_dir.as_ref()),
            "build/litedram",
        ),
        params,
        do_build: !args.no_execute,
        do_init: args.init,
        firmware_path: PathBuf::from(
            build
                .and_then(|b| b.firmware.as_deref())
                .unwrap_or(FIRMWARE_PATH),
        ),
        remainder: if args.pad_firmware || build.is_some_and(|b| b.pad_firmware) {
            RemainderPolicy::ZeroPad
        } else {
            RemainderPolicy::Reject
        },
    };
    Ok((model, builder, options))
}

/// Pick the description: `--soc`, then the manifest's `[soc] path`, then the
/// only description under `socs/`.
pub(crate) fn resolve_soc_path(
    project_dir: &Path,
    manifest: Option<&SocgenManifest>,
    flag: Option<&str>,
) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(PathBuf::from(path));
    }
    if let Some(path) = manifest.and_then(|m| m.soc.path.as_ref()) {
        return Ok(project_dir.join(path));
    }
    let mut socs = discover_socs(project_dir)?;
    match socs.len() {
        1 => Ok(socs.remove(0).1),
        0 => bail!("no SoC description given. Use --soc <file.soc.toml> or set [soc] path in socgen.toml"),
        n => bail!("{n} descriptions found in socs/. Pick one with --soc"),
    }
}

/// Load a description, build the model, and report validation issues.
///
/// Warnings are logged; any error fails the load.
pub(crate) fn load_model(path: &Path) -> Result<SystemModel> {
    let desc =
        load_description_toml(path).with_context(|| format!("loading {}", path.display()))?;
    let model = SystemModel::from_description(desc)
        .with_context(|| format!("checking {}", path.display()))?;
    if let Err(issues) = validate_model(&model) {
        let mut errors = 0;
        for issue in &issues {
            if issue.severity == "error" {
                errors += 1;
                eprintln!("error: {}", issue.message);
            } else {
                log::warn!("{}", issue.message);
            }
        }
        if errors > 0 {
            bail!("{} has {errors} validation error(s)", path.display());
        }
    }
    Ok(model)
}

/// Split a `KEY=VALUE` parameter.
pub(crate) fn parse_param(param: &str) -> Result<(String, String)> {
    match param.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => bail!("invalid parameter '{param}', expected KEY=VALUE"),
    }
}
