//! `socgen clean`: remove build directories.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Remove `build_dir`, and `litedram_dir` as well when it is given.
pub fn run(build_dir: &Path, litedram_dir: Option<&Path>) -> Result<()> {
    remove(build_dir)?;
    if let Some(dir) = litedram_dir {
        remove(dir)?;
    }
    Ok(())
}

fn remove(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("removing {}", dir.display()))?;
        println!("Removed {}", dir.display());
    } else {
        println!("Already clean: {} does not exist", dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_removes_build_dir() {
        let dir = tempfile::tempdir().unwrap();
        let build = dir.path().join("build/soc");
        fs::create_dir_all(build.join("bios")).unwrap();
        fs::write(build.join("bios/bios.bin"), b"data").unwrap();

        run(&build, None).unwrap();
        assert!(!build.exists());
        assert!(dir.path().join("build").exists());
    }

    #[test]
    fn clean_handles_already_clean() {
        let dir = tempfile::tempdir().unwrap();
        run(&dir.path().join("build/soc"), None).unwrap();
    }

    #[test]
    fn clean_with_litedram() {
        let dir = tempfile::tempdir().unwrap();
        let build = dir.path().join("soc");
        let litedram = dir.path().join("litedram");
        fs::create_dir(&build).unwrap();
        fs::create_dir(&litedram).unwrap();

        run(&build, Some(&litedram)).unwrap();
        assert!(!build.exists());
        assert!(!litedram.exists());
    }
}
