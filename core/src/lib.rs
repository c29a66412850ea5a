//! Briefing Publisher - generates the daily briefing and publishes it.
//!
//! This library runs an external Python briefing generator inside its
//! virtual environment, commits the folder it produces, pushes it to the
//! static-hosting remote and reports where the page will be served.

pub mod config;
pub mod error;
pub mod generator;
pub mod git;
pub mod marker;
pub mod paths;
pub mod publisher;
pub mod venv;

pub use config::{
    expand_home, GitConfig, PublishConfig, PublisherConfig, Validate, ValidationResult,
    CONFIG_FILE_NAME,
};
pub use error::{Error, Result};
pub use generator::{BriefingGenerator, PythonGenerator};
pub use git::{commit_message, CommitInfo, GitRepo};
pub use marker::{Marker, PageName};
pub use paths::ProjectPaths;
pub use publisher::{publish_url, PublishReport, Publisher};
pub use venv::{find_site_packages, InterpreterEnv, VirtualEnv};
