//! `socgen doctor`: toolchain and project diagnostics.

use std::path::Path;
use std::process::Command;

use anyhow::Result;
use socgen_model::discover_socs;

use crate::manifest::SocgenManifest;

/// Print diagnostic information about the host tools and the project.
pub fn run(project_dir: &Path) -> Result<()> {
    println!("=== socgen doctor ===");
    println!();
    println!("socgen version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("--- System Tools ---");
    print_tool_status("sh", &["-c", "echo available"]);
    print_tool_status("make", &["--version"]);
    println!();

    println!("--- Project Status ---");
    let root = match SocgenManifest::find_and_load(project_dir) {
        Ok(Some((manifest, dir))) => {
            println!("  socgen.toml: found at {}", dir.display());
            println!("  Project:     {}", manifest.project.name);
            println!("  Version:     {}", manifest.project.version);
            if let Some(soc) = &manifest.soc.path {
                let status = if dir.join(soc).is_file() { "ok" } else { "missing" };
                println!("  SoC:         {soc} ({status})");
            }
            if let Some(sw) = &manifest.build.software_dir {
                let status = if dir.join(sw).is_dir() { "ok" } else { "missing" };
                println!("  Software:    {sw} ({status})");
            }
            let overrides =
                manifest.templates.files.len() + manifest.templates.commands.len();
            println!("  Overrides:   {overrides} template(s)");
            dir
        }
        Ok(None) => {
            println!("  socgen.toml: not found");
            project_dir.to_path_buf()
        }
        Err(e) => {
            println!("  socgen.toml: error: {e:#}");
            project_dir.to_path_buf()
        }
    };

    match discover_socs(&root) {
        Ok(socs) => println!("  Descriptions: {} in socs/", socs.len()),
        Err(e) => println!("  Descriptions: error: {e}"),
    }
    let build_dir = root.join("build");
    println!(
        "  Build dir:   {} ({})",
        build_dir.display(),
        if build_dir.is_dir() { "present" } else { "absent" }
    );

    Ok(())
}

fn print_tool_status(name: &str, args: &[&str]) {
    match Command::new(name).args(args).output() {
        Ok(output) => {
            let version = String::from_utf8_lossy(&output.stdout);
            let first_line = version.lines().next().unwrap_or("(unknown version)");
            println!("  {name}: {first_line}");
        }
        Err(_) => {
            println!("  {name}: not found");
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn doctor_runs_without_error() {
        let dir = tempfile::tempdir().unwrap();
        super::run(dir.path()).unwrap();
    }

    #[test]
    fn doctor_runs_in_project() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("p");
        crate::commands::init::create_project(&project, "p").unwrap();
        super::run(&project).unwrap();
    }
}
