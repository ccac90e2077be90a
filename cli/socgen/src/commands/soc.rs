//! `socgen soc`: list, describe, validate, and scaffold SoC descriptions.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use socgen_model::{
    description_to_toml, discover_socs, generate_template, load_description_toml,
    validate_model, SocDescription, SystemModel,
};

/// Name of the built-in example description.
pub const BUILTIN: &str = "minerva";

/// List the built-in description and those under the project's `socs/`.
pub fn list(project_dir: &Path) -> Result<()> {
    println!("Built-in:");
    println!("  {BUILTIN:<16} Minerva RISC-V, 8 KiB ROM, 4 KiB RAM, UART, timer");

    let socs = discover_socs(project_dir)?;
    println!();
    if socs.is_empty() {
        println!("No descriptions in {}", project_dir.join("socs").display());
    } else {
        println!("Project ({}):", project_dir.join("socs").display());
        for (name, path) in &socs {
            println!("  {name:<16} {}", path.display());
        }
    }
    Ok(())
}

/// Find a description by built-in name, project name, or file path.
fn load(project_dir: &Path, name: &str) -> Result<SocDescription> {
    if let Some((_, path)) = discover_socs(project_dir)?.into_iter().find(|(n, _)| n == name) {
        return load_description_toml(&path).with_context(|| format!("loading {}", path.display()));
    }
    if name == BUILTIN {
        return Ok(SocDescription::example_minerva());
    }
    let path = PathBuf::from(name);
    if path.is_file() {
        return load_description_toml(&path).with_context(|| format!("loading {}", path.display()));
    }
    bail!("unknown SoC '{name}'. Run `socgen soc list` to see available descriptions")
}

/// Print a description's resolved memory map and interrupts.
pub fn describe(project_dir: &Path, name: &str, format: Option<&str>) -> Result<()> {
    let desc = load(project_dir, name)?;
    match format {
        Some("toml") => {
            print!("{}", description_to_toml(&desc)?);
            return Ok(());
        }
        None | Some("human") => {}
        Some(other) => bail!("unknown format: '{other}'. Valid: human, toml"),
    }

    let model = SystemModel::from_description(desc).context("resolving description")?;
    let cpu = model.cpu();
    println!("SoC: {}", model.name());
    println!(
        "  CPU:   {} ({}, {}-bit {}-endian, reset {:#x}, {} muldiv)",
        cpu.name,
        cpu.arch,
        cpu.data_width,
        cpu.byteorder.as_str(),
        cpu.reset_addr,
        cpu.muldiv.as_str()
    );
    println!("  Clock: {} Hz", model.clk_freq());
    println!();
    println!("Memory map:");
    let mut windows: Vec<_> = model.bus().windows.iter().collect();
    windows.sort_by_key(|w| w.base);
    for window in windows {
        println!("  {:#010x}  {}", window.base, window.peripheral);
    }
    println!();
    println!("Interrupts ({}):", model.intc().name);
    for (index, line) in model.intc().iter_by_index() {
        println!("  {index:>3}  {line}");
    }
    println!();
    println!(
        "ROM: {} bytes, {} init words",
        model.rom().size,
        model.rom().init.len()
    );
    Ok(())
}

/// Validate a description, printing each issue. Fails on any error.
pub fn validate(project_dir: &Path, name: &str) -> Result<()> {
    let desc = load(project_dir, name)?;
    let model = SystemModel::from_description(desc).context("resolving description")?;
    match validate_model(&model) {
        Ok(()) => {
            println!("{}: ok", model.name());
            Ok(())
        }
        Err(issues) => {
            let errors = issues.iter().filter(|i| i.severity == "error").count();
            for issue in &issues {
                println!("  {}: {}", issue.severity, issue.message);
            }
            if errors > 0 {
                bail!("{}: {errors} error(s)", model.name());
            }
            println!("{}: ok with {} warning(s)", model.name(), issues.len());
            Ok(())
        }
    }
}

/// Write a starter description, or print it when `output` is absent.
pub fn template(name: &str, output: Option<&Path>) -> Result<()> {
    let toml = generate_template(name)?;
    match output {
        Some(path) => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{toml}"),
    }
    Ok(())
}
