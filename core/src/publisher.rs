//! The publish run: generate, commit, push, report.
//!
//! Steps run strictly in order and the first failure ends the run. Nothing
//! is retried and files the generator wrote before a failure stay in place.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{PublisherConfig, Validate};
use crate::error::Result;
use crate::generator::{BriefingGenerator, PythonGenerator};
use crate::git::{commit_message, CommitInfo, GitRepo};
use crate::marker::{Marker, PageName};
use crate::venv::{find_site_packages, InterpreterEnv, VirtualEnv};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of a successful publish run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReport {
    /// Identifier attached to this run's log lines.
    pub run_id: Uuid,
    /// Folder the generator produced.
    pub page: PageName,
    /// The publish commit.
    pub commit: CommitInfo,
    /// Whether the commit was pushed.
    pub pushed: bool,
    /// Where the briefing is served.
    pub url: String,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

/// Builds the hosting URL for a generated folder.
pub fn publish_url(base_url: &str, page: &PageName) -> String {
    format!("{}/{}/", base_url.trim_end_matches('/'), page)
}

/// Runs the generator and publishes its output.
pub struct Publisher {
    config: PublisherConfig,
    project_root: PathBuf,
    generator: Box<dyn BriefingGenerator>,
}

impl Publisher {
    /// Creates a publisher with a custom generator.
    pub fn new(
        config: PublisherConfig,
        project_root: impl Into<PathBuf>,
        generator: Box<dyn BriefingGenerator>,
    ) -> Result<Self> {
        check_config(&config)?;
        Ok(Self {
            config,
            project_root: project_root.into(),
            generator,
        })
    }

    /// Creates a publisher that runs the configured Python generator.
    ///
    /// Fails before anything runs if either virtual environment or the
    /// generator script is missing.
    pub fn prepare(config: PublisherConfig, project_root: impl Into<PathBuf>) -> Result<Self> {
        check_config(&config)?;
        let project_root = project_root.into();

        let venv = VirtualEnv::open(config.venv_dir(&project_root))?;
        let tts_venv = config.tts_venv_dir(dirs::home_dir().as_deref())?;
        let tts_site_packages = find_site_packages(&tts_venv)?;
        tracing::debug!(
            venv = ?venv.root(),
            tts_site_packages = ?tts_site_packages,
            "resolved interpreter environment"
        );

        let env = InterpreterEnv::activate(&venv, std::env::var_os("PATH").as_deref())?
            .with_python_path(
                &[tts_site_packages],
                std::env::var_os("PYTHONPATH").as_deref(),
            )?;

        let generator = PythonGenerator::new(config.generator_path(&project_root), env)?
            .with_timeout(config.generator_timeout());

        Ok(Self {
            config,
            project_root,
            generator: Box::new(generator),
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Runs every step, writing status lines to `out`.
    pub async fn run(&self, out: &mut (dyn Write + Send)) -> Result<PublishReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("publish", run_id = %run_id);
        self.run_steps(run_id, out).instrument(span).await
    }

    async fn run_steps(&self, run_id: Uuid, out: &mut (dyn Write + Send)) -> Result<PublishReport> {
        let started_at = Local::now();
        writeln!(
            out,
            "Briefing run started at {}",
            started_at.format(TIMESTAMP_FORMAT)
        )?;
        tracing::info!(
            project_root = ?self.project_root,
            generator = self.generator.name(),
            "starting publish run"
        );

        self.generator.generate(&self.project_root).await?;

        let marker = Marker::new(self.config.marker_path(&self.project_root));
        let page = if self.config.verify_page_dir {
            marker.read_verified()?
        } else {
            marker.read()?
        };
        writeln!(out, "Generated briefing: {}", page)?;
        tracing::info!(page = %page, "briefing generated");

        let repo = GitRepo::new(&self.project_root);
        let message = commit_message(&self.config.git.commit_message, started_at.date_naive());
        let commit = repo.commit_all(&message)?;

        let pushed = self.config.git.push;
        if pushed {
            repo.push(&self.config.git.remote, &self.config.git.branch)?;
        } else {
            tracing::warn!("push disabled, commit left on local branch");
        }

        let finished_at = Local::now();
        if pushed {
            writeln!(out, "Published at {}", finished_at.format(TIMESTAMP_FORMAT))?;
        } else {
            writeln!(
                out,
                "Committed at {} (push skipped)",
                finished_at.format(TIMESTAMP_FORMAT)
            )?;
        }

        let url = publish_url(&self.config.publish.base_url, &page);
        writeln!(out, "URL: {}", url)?;

        Ok(PublishReport {
            run_id,
            page,
            commit,
            pushed,
            url,
            started_at,
            finished_at,
        })
    }
}

fn check_config(config: &PublisherConfig) -> Result<()> {
    for warning in config.validate().into_result()? {
        tracing::warn!(%warning, "publisher configuration");
    }
    Ok(())
}
