//! The `.current_page` marker written by the generator.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of a generated briefing folder, as recorded in the marker file.
///
/// Always a single, non-empty path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageName(String);

impl PageName {
    /// Validates a folder name.
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        let name = raw.trim();
        if name.is_empty() {
            return Err("marker is empty".to_string());
        }
        if name.lines().count() > 1 {
            return Err("marker holds more than one line".to_string());
        }
        if name == "." || name == ".." {
            return Err(format!("'{}' is not a folder name", name));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(format!("'{}' is a path, expected a single folder name", name));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marker file location inside a project.
#[derive(Debug, Clone)]
pub struct Marker {
    path: PathBuf,
}

impl Marker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the folder name the generator recorded.
    pub fn read(&self) -> Result<PageName> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MarkerMissing(self.path.clone()));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        PageName::parse(&content).map_err(|reason| Error::InvalidMarker {
            path: self.path.clone(),
            reason,
        })
    }

    /// Reads the marker and checks that the named folder exists next to it.
    pub fn read_verified(&self) -> Result<PageName> {
        let page = self.read()?;
        let dir = self
            .path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(page.as_str());
        if !dir.is_dir() {
            return Err(Error::PageDirMissing(dir));
        }
        Ok(page)
    }
}
