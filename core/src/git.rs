//! Committing and pushing the generated briefing.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::DATE_PLACEHOLDER;
use crate::error::{Error, Result};

/// Information about the publish commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// The commit hash.
    pub hash: String,
    /// The commit message.
    pub message: String,
}

/// Renders a commit message template for `date`.
pub fn commit_message(template: &str, date: NaiveDate) -> String {
    template.replace(DATE_PLACEHOLDER, &date.format("%Y-%m-%d").to_string())
}

/// The working tree the briefing is published from.
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs a git command, failing on a non-zero exit.
    fn git(&self, step: &'static str, args: &[&str]) -> Result<Output> {
        tracing::debug!(step, ?args, "running git");

        let output = Command::new("git")
            .current_dir(&self.path)
            .args(args)
            .output()?;

        if !output.status.success() {
            return Err(Error::Git {
                step,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }

    /// Current `HEAD` commit, or `None` on an unborn branch.
    pub fn head(&self) -> Result<Option<String>> {
        let output = Command::new("git")
            .current_dir(&self.path)
            .args(["rev-parse", "--verify", "--quiet", "HEAD"])
            .output()?;

        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }

    /// Stages every working-tree change and commits it.
    pub fn commit_all(&self, message: &str) -> Result<CommitInfo> {
        let status = self.git("status", &["status", "--porcelain"])?;
        if String::from_utf8_lossy(&status.stdout).trim().is_empty() {
            return Err(Error::NothingToCommit);
        }

        self.git("add", &["add", "-A"])?;
        self.git("commit", &["commit", "-m", message])?;

        let hash = self
            .head()?
            .ok_or_else(|| Error::Git {
                step: "rev-parse",
                code: None,
                stderr: "HEAD missing after commit".to_string(),
            })?;

        tracing::info!(hash = %hash, message = %message, "created publish commit");

        Ok(CommitInfo {
            hash,
            message: message.to_string(),
        })
    }

    /// Pushes `branch` to `remote`.
    pub fn push(&self, remote: &str, branch: &str) -> Result<()> {
        tracing::info!(remote = %remote, branch = %branch, "pushing briefing");
        self.git("push", &["push", remote, branch])?;
        Ok(())
    }
}
