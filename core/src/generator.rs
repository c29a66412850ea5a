//! Invocation of the external briefing generator.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::venv::InterpreterEnv;

/// Something that produces a briefing folder and updates the marker file.
#[async_trait]
pub trait BriefingGenerator: Send + Sync {
    /// Runs the generator to completion in `project_root`.
    async fn generate(&self, project_root: &Path) -> Result<()>;

    /// Returns the name of this generator for logging.
    fn name(&self) -> &str;
}

/// Runs a Python entry point with a prepared interpreter environment.
pub struct PythonGenerator {
    script: PathBuf,
    env: InterpreterEnv,
    timeout: Option<Duration>,
}

impl PythonGenerator {
    /// Creates a generator for `script`, which must exist.
    pub fn new(script: impl Into<PathBuf>, env: InterpreterEnv) -> Result<Self> {
        let script = script.into();
        if !script.is_file() {
            return Err(Error::MissingDependency {
                what: "briefing generator script",
                path: script,
            });
        }
        Ok(Self {
            script,
            env,
            timeout: None,
        })
    }

    /// Kills the generator if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the entry point.
    pub fn script(&self) -> &Path {
        &self.script
    }
}

#[async_trait]
impl BriefingGenerator for PythonGenerator {
    async fn generate(&self, project_root: &Path) -> Result<()> {
        tracing::info!(
            interpreter = ?self.env.interpreter(),
            script = ?self.script,
            "running briefing generator"
        );

        // Output goes straight to the terminal; nothing is captured.
        let mut child = self
            .env
            .command()
            .arg(&self.script)
            .current_dir(project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(error = %e, "failed to kill timed-out generator");
                    }
                    return Err(Error::GeneratorTimeout(limit.as_secs()));
                }
            },
            None => child.wait().await?,
        };

        if !status.success() {
            // Killed by a signal: report as a generic failure.
            let code = status.code().unwrap_or(1);
            tracing::error!(code, "briefing generator failed");
            return Err(Error::Generator { code });
        }

        tracing::debug!("briefing generator finished");
        Ok(())
    }

    fn name(&self) -> &str {
        "python"
    }
}
