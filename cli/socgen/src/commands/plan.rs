//! `socgen plan`: render the build plan without running it.

use std::path::Path;

use anyhow::{bail, Context, Result};
use socgen_build::BuildOutcome;

use super::build::{prepare, BuildArgs};
use crate::manifest::SocgenManifest;

/// Render the plan, write it to the build directory with its script, and list it.
pub fn run(
    project_dir: &Path,
    manifest: Option<&SocgenManifest>,
    args: &BuildArgs,
    show: bool,
) -> Result<()> {
    let (mut model, builder, mut options) = prepare(project_dir, manifest, args)?;
    options.do_build = false;
    options.do_init = false;

    let output = socgen_build::build(&mut model, &builder, &options)
        .with_context(|| format!("planning '{}'", model.name()))?;
    let BuildOutcome::Planned(plan) = output.outcome else {
        bail!("planning '{}' ran the build", model.name());
    };
    let build_dir = plan.build_dir();
    let script = plan.write_to(build_dir)?;

    println!("Plan '{}' for {}", plan.name(), model.name());
    println!("  build dir: {}", build_dir.display());
    println!("  script:    {}", script.display());
    println!();
    println!("Files:");
    for file in plan.files() {
        println!("  {}", file.path.display());
    }
    println!();
    println!("Commands:");
    for (i, command) in plan.commands().iter().enumerate() {
        println!("  [{i}] {command}");
    }

    if show {
        for file in plan.files() {
            println!();
            println!("--- {} ---", file.path.display());
            print!("{}", file.contents);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use socgen_model::generate_template;

    #[test]
    fn plan_writes_files_and_script_without_running() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("socs")).unwrap();
        fs::write(
            dir.path().join("socs/board.soc.toml"),
            generate_template("board").unwrap(),
        )
        .unwrap();
        let args = BuildArgs {
            name: Some("board".into()),
            software_dir: Some("/sw".into()),
            ..BuildArgs::default()
        };

        run(dir.path(), None, &args, true).unwrap();

        let build_dir = dir.path().join("build/soc");
        let config = fs::read_to_string(build_dir.join("board.config")).unwrap();
        assert!(config.contains("CONFIG_WITH_SDRAM=n"));
        let script = fs::read_to_string(build_dir.join("build_board.sh")).unwrap();
        assert!(script.contains("make -C /sw/bios"));
        assert!(!build_dir.join("bios").exists());
    }
}
