//! `socgen.toml` manifest parsing and project configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use socgen_build::TemplateRegistry;

/// File name of the project manifest.
pub const MANIFEST_FILE: &str = "socgen.toml";

/// The top-level manifest structure for a socgen project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocgenManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    /// Default SoC description.
    #[serde(default)]
    pub soc: SocConfig,
    /// Build defaults.
    #[serde(default)]
    pub build: BuildConfig,
    /// Extra template parameters.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Template overrides merged over the BIOS templates.
    #[serde(default)]
    pub templates: TemplatesConfig,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required).
    pub name: String,
    /// Project version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// `[soc]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocConfig {
    /// Path of the `.soc.toml` description, relative to the project.
    #[serde(default)]
    pub path: Option<String>,
}

/// `[build]` section. Paths are relative to the project directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Run name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub build_dir: Option<String>,
    #[serde(default)]
    pub litedram_dir: Option<String>,
    /// Root of the firmware source tree.
    #[serde(default)]
    pub software_dir: Option<String>,
    /// Firmware binary, relative to the build directory.
    #[serde(default)]
    pub firmware: Option<String>,
    /// Zero-pad a trailing partial firmware word instead of failing.
    #[serde(default)]
    pub pad_firmware: bool,
}

/// `[templates]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default, rename = "file")]
    pub files: Vec<FileOverride>,
    #[serde(default, rename = "command")]
    pub commands: Vec<CommandOverride>,
}

/// A `[[templates.file]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOverride {
    /// Output path template, e.g. `{{name}}.config`.
    pub path: String,
    /// Template source file, relative to the project.
    pub source: String,
}

/// A `[[templates.command]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOverride {
    /// Command name; `bios` replaces the built-in make step.
    pub name: String,
    /// Template source file, relative to the project.
    pub source: String,
}

impl SocgenManifest {
    /// Search upward from `start_dir` for a `socgen.toml` file, parse and return it
    /// along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: SocgenManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing socgen.toml")
    }

    /// Read the override template sources into a registry.
    pub fn template_overrides(&self, project_dir: &Path) -> Result<TemplateRegistry> {
        let mut registry = TemplateRegistry::new();
        for file in &self.templates.files {
            let source = project_dir.join(&file.source);
            let body = fs::read_to_string(&source)
                .with_context(|| format!("reading template {}", source.display()))?;
            registry.add_file(file.path.clone(), body);
        }
        for command in &self.templates.commands {
            let source = project_dir.join(&command.source);
            let body = fs::read_to_string(&source)
                .with_context(|| format!("reading template {}", source.display()))?;
            registry.add_command(command.name.clone(), body);
        }
        Ok(registry)
    }

    /// Generate the default manifest for `socgen init`.
    pub fn template(name: &str) -> String {
        format!(
            r#"[project]
name = "{name}"
version = "0.1.0"

[soc]
path = "socs/{name}.soc.toml"

[build]
build_dir = "build/soc"
litedram_dir = "build/litedram"
software_dir = "software"

[params]
"#
        )
    }
}
