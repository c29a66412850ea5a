//! Resolution of the tool directory and the project root.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Absolute locations a publish run works from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    /// Directory containing the publisher binary.
    pub tool_dir: PathBuf,
    /// Repository root the generator writes into and git operates on.
    pub project_root: PathBuf,
}

impl ProjectPaths {
    /// Resolves paths relative to the running executable.
    pub fn discover() -> Result<Self> {
        let exe = std::env::current_exe()?;
        Self::from_executable(&exe)
    }

    /// Resolves paths from an executable location: its directory is the tool
    /// directory and the parent of that is the project root.
    pub fn from_executable(exe: &Path) -> Result<Self> {
        let exe = absolutize(exe)?;
        let tool_dir = exe
            .parent()
            .ok_or_else(|| Error::Config(format!("{} has no parent directory", exe.display())))?
            .to_path_buf();
        let project_root = tool_dir
            .parent()
            .ok_or_else(|| {
                Error::Config(format!(
                    "tool directory {} has no parent directory",
                    tool_dir.display()
                ))
            })?
            .to_path_buf();

        Ok(Self {
            tool_dir,
            project_root,
        })
    }

    /// Replaces the project root, keeping the tool directory.
    pub fn with_project_root(mut self, root: &Path) -> Result<Self> {
        self.project_root = absolutize(root)?;
        Ok(self)
    }
}

/// Joins relative paths onto the current directory. Symlinks are kept as-is.
fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
