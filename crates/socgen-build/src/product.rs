//! Product sets: read-only access to the files a build left behind.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use crate::error::{BuildError, Result};

/// Lexically normalize a relative path, rejecting anything that would leave
/// the directory it is joined to.
///
/// Absolute paths and `..` components that climb above the start fail with
/// [`BuildError::PathEscape`]. No filesystem access happens here.
pub fn normalize_relative(path: &Path) -> Result<PathBuf> {
    let escape = || BuildError::PathEscape {
        path: path.to_path_buf(),
    };
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return Err(escape());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(escape()),
        }
    }
    Ok(out)
}

/// The contents of a working directory after a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSet {
    root: PathBuf,
}

impl ProductSet {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` to a file inside the working directory.
    ///
    /// Symlinks are followed, and the resolved target must still lie under
    /// the working directory.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> Result<PathBuf> {
        let relative = relative.as_ref();
        let normalized = normalize_relative(relative)?;
        let not_found = || BuildError::ArtifactNotFound {
            path: relative.to_path_buf(),
        };

        let candidate = self.root.join(&normalized);
        let resolved = match candidate.canonicalize() {
            Ok(path) => path,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(BuildError::io(candidate, e)),
        };
        let root = self
            .root
            .canonicalize()
            .map_err(|e| BuildError::io(&self.root, e))?;
        if !resolved.starts_with(&root) {
            return Err(BuildError::PathEscape {
                path: relative.to_path_buf(),
            });
        }
        if !resolved.is_file() {
            return Err(not_found());
        }
        Ok(resolved)
    }

    /// Open the artifact at `relative` for reading.
    ///
    /// The file handle is closed when the returned [`Artifact`] is dropped.
    pub fn extract(&self, relative: impl AsRef<Path>) -> Result<Artifact> {
        let path = self.resolve(relative)?;
        let file = File::open(&path).map_err(|e| BuildError::io(&path, e))?;
        log::debug!("extracted {}", path.display());
        Ok(Artifact { path, file })
    }

    /// Open the artifact at `relative`, hand it to `f`, and close it when `f`
    /// returns, whatever the outcome.
    pub fn extract_with<T, F>(&self, relative: impl AsRef<Path>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Artifact) -> Result<T>,
    {
        let mut artifact = self.extract(relative)?;
        f(&mut artifact)
    }

    /// Read the whole artifact at `relative`.
    pub fn get(&self, relative: impl AsRef<Path>) -> Result<Vec<u8>> {
        self.extract_with(relative, |artifact| {
            let mut bytes = Vec::new();
            artifact
                .read_to_end(&mut bytes)
                .map_err(|e| BuildError::io(artifact.path(), e))?;
            Ok(bytes)
        })
    }
}

/// An open, read-only artifact.
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
    file: File,
}

impl Artifact {
    /// Canonical path of the artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for Artifact {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn product_set() -> (tempfile::TempDir, ProductSet) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("build");
        fs::create_dir_all(root.join("bios")).unwrap();
        fs::write(root.join("bios/bios.bin"), [1u8, 2, 3]).unwrap();
        fs::write(dir.path().join("secret"), b"outside").unwrap();
        (dir, ProductSet::new(root))
    }

    #[test]
    fn normalize_relative_paths() {
        assert_eq!(
            normalize_relative(Path::new("./a/b/../c")).unwrap(),
            PathBuf::from("a/c")
        );
        assert!(matches!(
            normalize_relative(Path::new("a/../../b")),
            Err(BuildError::PathEscape { .. })
        ));
        assert!(matches!(
            normalize_relative(Path::new("/etc/passwd")),
            Err(BuildError::PathEscape { .. })
        ));
    }

    #[test]
    fn extract_reads_file() {
        let (_dir, products) = product_set();
        assert_eq!(products.get("bios/bios.bin").unwrap(), vec![1, 2, 3]);
        assert_eq!(products.get("bios/../bios/bios.bin").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn parent_traversal_is_an_escape_even_if_target_exists() {
        let (_dir, products) = product_set();
        let err = products.extract("../secret").unwrap_err();
        assert!(matches!(err, BuildError::PathEscape { .. }));
    }

    #[test]
    fn missing_artifact() {
        let (_dir, products) = product_set();
        assert!(matches!(
            products.extract("bios/missing.bin"),
            Err(BuildError::ArtifactNotFound { .. })
        ));
        assert!(matches!(
            products.extract("bios"),
            Err(BuildError::ArtifactNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_root_is_an_escape() {
        let (dir, products) = product_set();
        std::os::unix::fs::symlink(dir.path().join("secret"), products.root().join("link"))
            .unwrap();
        assert!(matches!(
            products.extract("link"),
            Err(BuildError::PathEscape { .. })
        ));
    }

    #[test]
    fn extract_with_propagates_closure_error() {
        let (_dir, products) = product_set();
        let err = products
            .extract_with("bios/bios.bin", |_| -> Result<()> {
                Err(BuildError::ArtifactNotFound {
                    path: "inner".into(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, BuildError::ArtifactNotFound { ref path } if path == Path::new("inner")));
    }
}
