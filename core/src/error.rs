//! Error types for the briefing publisher.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a publish run.
#[derive(Error, Debug)]
pub enum Error {
    /// A file or directory the run depends on does not exist.
    #[error("missing {what}: {path}")]
    MissingDependency { what: &'static str, path: PathBuf },

    /// The generator exited unsuccessfully.
    #[error("briefing generator failed with exit code {code}")]
    Generator { code: i32 },

    /// The generator was killed after exceeding its timeout.
    #[error("briefing generator timed out after {0} seconds")]
    GeneratorTimeout(u64),

    /// The generator finished without leaving a marker file behind.
    #[error("marker file not found: {0}")]
    MarkerMissing(PathBuf),

    /// The marker file exists but does not name a usable folder.
    #[error("invalid marker file {path}: {reason}")]
    InvalidMarker { path: PathBuf, reason: String },

    /// The marker names a folder that was never created.
    #[error("generated folder does not exist: {0}")]
    PageDirMissing(PathBuf),

    /// Staging produced no changes, so there is nothing to publish.
    #[error("nothing to commit: the generator produced no new changes")]
    NothingToCommit,

    /// A git command exited unsuccessfully.
    #[error("git {step} failed: {stderr}")]
    Git {
        step: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    /// Invalid publisher configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The configuration file is not valid TOML for [`crate::PublisherConfig`].
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The run report could not be encoded.
    #[error("failed to encode report: {0}")]
    Report(#[from] serde_json::Error),

    /// IO error while touching the filesystem or spawning a process.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code to report for this error.
    ///
    /// Subprocess failures propagate the child's own exit code; everything
    /// else exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Generator { code } if *code != 0 => *code,
            Error::Git {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Result type alias for publisher operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_error_propagates_child_exit_code() {
        assert_eq!(Error::Generator { code: 3 }.exit_code(), 3);
    }

    #[test]
    fn git_error_propagates_child_exit_code() {
        let err = Error::Git {
            step: "push",
            code: Some(128),
            stderr: "fatal: could not read from remote repository".to_string(),
        };
        assert_eq!(err.exit_code(), 128);
    }

    #[test]
    fn signalled_git_error_exits_with_one() {
        let err = Error::Git {
            step: "commit",
            code: None,
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn other_errors_exit_with_one() {
        assert_eq!(Error::NothingToCommit.exit_code(), 1);
        assert_eq!(
            Error::MarkerMissing(PathBuf::from(".current_page")).exit_code(),
            1
        );
        assert_eq!(Error::GeneratorTimeout(60).exit_code(), 1);
    }

    #[test]
    fn missing_dependency_names_the_path() {
        let err = Error::MissingDependency {
            what: "virtual environment activation script",
            path: PathBuf::from("/srv/briefing/venv/bin/activate"),
        };
        let msg = err.to_string();
        assert!(msg.contains("activation script"));
        assert!(msg.contains("/srv/briefing/venv/bin/activate"));
    }
}
