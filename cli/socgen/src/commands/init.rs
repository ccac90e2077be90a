//! `socgen init`: project scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use socgen_model::generate_template;

use crate::manifest::{SocgenManifest, MANIFEST_FILE};

/// Create a new socgen project at the given path.
///
/// `name` is the project name. The directory `name` is created relative to cwd.
pub fn run(name: &str) -> Result<()> {
    let project_dir = Path::new(name);
    create_project(project_dir, name)
}

pub(crate) fn create_project(project_dir: &Path, name: &str) -> Result<()> {
    if project_dir.exists() {
        bail!("directory '{}' already exists", project_dir.display());
    }

    fs::create_dir_all(project_dir.join("socs")).context("creating socs/ directory")?;
    fs::create_dir_all(project_dir.join("templates"))
        .context("creating templates/ directory")?;

    fs::write(project_dir.join(MANIFEST_FILE), SocgenManifest::template(name))
        .context("writing socgen.toml")?;

    let soc_file = format!("{name}.soc.toml");
    let soc = generate_template(name).context("generating SoC description")?;
    fs::write(project_dir.join("socs").join(&soc_file), soc)
        .with_context(|| format!("writing socs/{soc_file}"))?;

    fs::write(project_dir.join(".gitignore"), "build/\n").context("writing .gitignore")?;

    println!("Created project '{name}'");
    println!("  {name}/{MANIFEST_FILE}");
    println!("  {name}/socs/{soc_file}");
    println!("  {name}/templates/");
    println!("  {name}/.gitignore");

    Ok(())
}
