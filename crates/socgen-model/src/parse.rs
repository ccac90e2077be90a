//! TOML parsing, serialization, validation, and discovery for SoC descriptions.
//!
//! SoC descriptions are stored as `.soc.toml` files in the `socs/` directory
//! of a socgen project.

use std::path::{Path, PathBuf};

use crate::error::{ModelError, Result};
use crate::periph::PeripheralSlot;
use crate::soc::{SocDescription, SystemModel};

/// A validation issue found in a system model.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// Load a description from a `.soc.toml` file.
pub fn load_description_toml(path: &Path) -> Result<SocDescription> {
    if !path.exists() {
        return Err(ModelError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse_description_toml(&content)
}

/// Parse a description from a TOML string.
pub fn parse_description_toml(toml_str: &str) -> Result<SocDescription> {
    let desc: SocDescription = toml::from_str(toml_str)?;
    Ok(desc)
}

/// Serialize a description to pretty TOML.
pub fn description_to_toml(desc: &SocDescription) -> Result<String> {
    let toml_str = toml::to_string_pretty(desc)?;
    Ok(toml_str)
}

/// Check a model for consistency between its CPU, bus and interrupt controller.
///
/// These checks are not enforced by [`SystemModel::from_description`]; the
/// corresponding lookups fail individually when a template uses them.
pub fn validate_model(model: &SystemModel) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    // 1. Every present peripheral is attached and aligned
    let granularity = model.bus().granularity_bytes();
    for slot in PeripheralSlot::ALL {
        let Some(periph) = model.peripheral(slot) else {
            continue;
        };
        match model.bus().window(periph.name()) {
            None => issues.push(ValidationIssue {
                severity: "error",
                message: format!(
                    "{slot} peripheral '{}' is not attached to the bus",
                    periph.name()
                ),
            }),
            Some(w) if w.base % granularity != 0 => issues.push(ValidationIssue {
                severity: "error",
                message: format!(
                    "{slot} window base 0x{:x} is not aligned to {granularity} bytes",
                    w.base
                ),
            }),
            Some(_) => {}
        }
        if periph.size() == 0 {
            issues.push(ValidationIssue {
                severity: "error",
                message: format!("{slot} peripheral has size 0"),
            });
        }
    }

    // 2. Windows don't overlap (pairwise check)
    let mut spans = Vec::new();
    for slot in PeripheralSlot::ALL {
        if let Some(periph) = model.peripheral(slot) {
            if let Some(w) = model.bus().window(periph.name()) {
                spans.push((periph.name(), w.base, w.base.saturating_add(periph.size())));
            }
        }
    }
    for i in 0..spans.len() {
        for j in (i + 1)..spans.len() {
            let (a, a_start, a_end) = spans[i];
            let (b, b_start, b_end) = spans[j];
            if a_start < b_end && b_start < a_end {
                issues.push(ValidationIssue {
                    severity: "error",
                    message: format!(
                        "bus windows '{a}' (0x{a_start:x}..0x{a_end:x}) and '{b}' (0x{b_start:x}..0x{b_end:x}) overlap"
                    ),
                });
            }
        }
    }

    // 3. Interrupt lines are registered
    for slot in [PeripheralSlot::Uart, PeripheralSlot::Timer] {
        if let Some(line) = model.peripheral(slot).and_then(|p| p.irq()) {
            if model.intc().find_index(line).is_err() {
                issues.push(ValidationIssue {
                    severity: "error",
                    message: format!("{slot} interrupt line '{line}' is not registered"),
                });
            }
        }
    }

    // 4. Reset address falls inside the ROM
    let reset = model.cpu().reset_addr;
    if let Ok(rom_base) = model.periph_addr(PeripheralSlot::Rom) {
        if reset < rom_base || reset >= rom_base.saturating_add(model.rom().size) {
            issues.push(ValidationIssue {
                severity: "warning",
                message: format!("CPU reset address 0x{reset:x} is outside the ROM"),
            });
        }
    }

    // 5. Timer width is sensible
    let width = model.timer().width;
    if width == 0 || width > 64 {
        issues.push(ValidationIssue {
            severity: "error",
            message: format!("timer counter width {width} is outside 1..=64"),
        });
    }

    // 6. ROM is read-only
    if model.rom().writable {
        issues.push(ValidationIssue {
            severity: "warning",
            message: "ROM is marked writable".into(),
        });
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Generate a template `.soc.toml` for a new SoC.
///
/// Seeds from the Minerva example with the given custom name.
pub fn generate_template(name: &str) -> Result<String> {
    let mut desc = SocDescription::example_minerva();
    desc.name = name.into();
    description_to_toml(&desc)
}

/// Discover all `.soc.toml` files in a project's `socs/` directory.
///
/// Returns a list of (soc_name, file_path) pairs.
pub fn discover_socs(project_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let socs_dir = project_dir.join("socs");
    if !socs_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut socs = Vec::new();
    for entry in std::fs::read_dir(&socs_dir)? {
        let path = entry?.path();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".soc.toml"))
            .map(str::to_string);
        if let Some(name) = name {
            socs.push((name, path));
        }
    }
    socs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(socs)
}
