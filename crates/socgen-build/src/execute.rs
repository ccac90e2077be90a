//! Build execution: materialize a plan and run its commands in order.

use std::path::Path;
use std::process::{Command, Output};

use crate::error::{BuildError, Result};
use crate::plan::BuildPlan;
use crate::product::ProductSet;

/// Write the plan's files under `build_dir` and run each command there via
/// `sh -c`, stopping at the first non-zero exit.
///
/// Files and outputs of earlier commands are left in place on failure.
pub fn execute_plan(plan: &BuildPlan, build_dir: &Path) -> Result<ProductSet> {
    plan.write_files(build_dir)?;

    for (index, command) in plan.commands().iter().enumerate() {
        log::info!("[{}/{}] {command}", index + 1, plan.commands().len());
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(build_dir)
            .output()
            .map_err(|source| BuildError::Spawn {
                index,
                command: command.clone(),
                source,
            })?;

        let captured = captured_output(&output);
        if !output.status.success() {
            return Err(BuildError::BuildFailed {
                index,
                command: command.clone(),
                status: output.status.to_string(),
                output: captured,
            });
        }
        if captured.is_empty() {
            log::debug!("command {index} finished with no output");
        } else {
            log::debug!("command {index} output:\n{}", captured.trim_end());
        }
    }

    Ok(ProductSet::new(build_dir))
}

/// Stdout followed by stderr, lossily decoded.
fn captured_output(output: &Output) -> String {
    let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
    captured.push_str(&String::from_utf8_lossy(&output.stderr));
    captured
}
