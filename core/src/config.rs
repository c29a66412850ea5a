//! Publisher configuration and validation.
//!
//! Every field has a default matching the stock deployment, so the tool runs
//! with no config file at all. A `briefing.toml` in the project root (or a
//! file passed with `--config`) overrides individual fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name looked up in the project root when no config path is given.
pub const CONFIG_FILE_NAME: &str = "briefing.toml";

/// Placeholder replaced with the calendar date in commit messages.
pub const DATE_PLACEHOLDER: &str = "{date}";

/// Git publication settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitConfig {
    /// Remote to push to.
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Branch to push to.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Commit message template; `{date}` becomes `YYYY-MM-DD`.
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
    /// Whether to push after committing.
    #[serde(default = "default_true")]
    pub push: bool,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_commit_message() -> String {
    format!("Morning briefing {}", DATE_PLACEHOLDER)
}

fn default_true() -> bool {
    true
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            branch: default_branch(),
            commit_message: default_commit_message(),
            push: true,
        }
    }
}

/// Static-hosting settings used to build the reported URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Base URL the generated folders are served under.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "https://copilot-clive.github.io/briefing/".to_string()
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Configuration for a publish run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Project root. Defaults to the parent of the tool's own directory.
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// Project virtual environment, relative to the project root.
    #[serde(default = "default_venv")]
    pub venv: PathBuf,

    /// Text-to-speech virtual environment whose site-packages is added to
    /// `PYTHONPATH`. A leading `~` expands to the home directory.
    #[serde(default = "default_tts_venv")]
    pub tts_venv: PathBuf,

    /// Generator entry point, relative to the project root.
    #[serde(default = "default_generator")]
    pub generator: PathBuf,

    /// Name of the marker file the generator writes in the project root.
    #[serde(default = "default_marker_file")]
    pub marker_file: String,

    /// Require the folder named by the marker to exist.
    #[serde(default = "default_true")]
    pub verify_page_dir: bool,

    /// Kill the generator after this many seconds. No limit when unset.
    #[serde(default)]
    pub generator_timeout_secs: Option<u64>,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub publish: PublishConfig,
}

fn default_venv() -> PathBuf {
    PathBuf::from("venv")
}

fn default_tts_venv() -> PathBuf {
    PathBuf::from("~/kokoro-tts/venv")
}

fn default_generator() -> PathBuf {
    PathBuf::from("generator/generate_briefing.py")
}

fn default_marker_file() -> String {
    ".current_page".to_string()
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            project_root: None,
            venv: default_venv(),
            tts_venv: default_tts_venv(),
            generator: default_generator(),
            marker_file: default_marker_file(),
            verify_page_dir: true,
            generator_timeout_secs: None,
            git: GitConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl PublisherConfig {
    /// Parses a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the config for a run.
    ///
    /// An explicit path must exist. Without one, `briefing.toml` in
    /// `project_root` is used when present, otherwise the defaults.
    pub fn load(explicit: Option<&Path>, project_root: &Path) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)
            }
            None => {
                let candidate = project_root.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    tracing::debug!(path = ?candidate, "loading project config");
                    Self::from_file(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Absolute path of the project virtual environment.
    pub fn venv_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.venv)
    }

    /// Absolute path of the text-to-speech virtual environment.
    pub fn tts_venv_dir(&self, home: Option<&Path>) -> Result<PathBuf> {
        expand_home(&self.tts_venv, home)
    }

    /// Absolute path of the generator entry point.
    pub fn generator_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.generator)
    }

    /// Absolute path of the marker file.
    pub fn marker_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.marker_file)
    }

    /// Generator timeout, if one is configured.
    pub fn generator_timeout(&self) -> Option<Duration> {
        self.generator_timeout_secs.map(Duration::from_secs)
    }
}

/// Expands a leading `~` component against `home`.
pub fn expand_home(path: &Path, home: Option<&Path>) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(std::path::Component::Normal(first)) if first == "~" => {
            let home = home.ok_or_else(|| {
                Error::Config(format!(
                    "cannot expand {}: home directory is unknown",
                    path.display()
                ))
            })?;
            Ok(home.join(components.as_path()))
        }
        _ => Ok(path.to_path_buf()),
    }
}

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Merges another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

impl Validate for GitConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.remote.trim().is_empty() {
            result.add_error("git.remote cannot be empty");
        }

        if self.branch.trim().is_empty() {
            result.add_error("git.branch cannot be empty");
        }

        if !self.commit_message.contains(DATE_PLACEHOLDER) {
            result.add_error(format!(
                "git.commit_message must contain the {} placeholder",
                DATE_PLACEHOLDER
            ));
        }

        if !self.push {
            result.add_warning("git.push is disabled - commits will stay local");
        }

        result
    }
}

impl Validate for PublishConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        match url::Url::parse(&self.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                if url.query().is_some() || url.fragment().is_some() {
                    result.add_error("publish.base_url cannot carry a query or fragment");
                }
            }
            Ok(url) => result.add_error(format!(
                "publish.base_url must be http or https, got '{}'",
                url.scheme()
            )),
            Err(e) => result.add_error(format!(
                "publish.base_url '{}' is not a valid URL: {}",
                self.base_url, e
            )),
        }

        result
    }
}

impl Validate for PublisherConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.generator.as_os_str().is_empty() {
            result.add_error("generator path cannot be empty");
        }

        if self.venv.as_os_str().is_empty() {
            result.add_error("venv path cannot be empty");
        }

        let marker = self.marker_file.trim();
        if marker.is_empty() {
            result.add_error("marker_file cannot be empty");
        } else if marker.contains('/') || marker.contains('\\') {
            result.add_error("marker_file must be a file name, not a path");
        }

        match self.generator_timeout_secs {
            Some(0) => result.add_error("generator_timeout_secs must be at least 1"),
            Some(secs) if secs < 10 => result.add_warning(
                "generator_timeout_secs under 10 seconds will likely kill the generator mid-run",
            ),
            _ => {}
        }

        if !self.verify_page_dir {
            result.add_warning("verify_page_dir is disabled - the marker will not be checked");
        }

        result.merge(self.git.validate());
        result.merge(self.publish.validate());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        let config = PublisherConfig::default();
        let result = config.validate();
        assert!(result.is_valid(), "errors: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn defaults_match_stock_deployment() {
        let config = PublisherConfig::default();
        assert_eq!(config.marker_file, ".current_page");
        assert_eq!(config.git.remote, "origin");
        assert_eq!(config.git.branch, "main");
        assert_eq!(
            config.publish.base_url,
            "https://copilot-clive.github.io/briefing/"
        );
        assert!(config.generator_timeout().is_none());
    }

    #[test]
    fn deserializes_partial_toml() {
        let toml = r#"
            generator = "tools/brief.py"
            generator_timeout_secs = 900

            [git]
            branch = "gh-pages"
            push = false
        "#;

        let config: PublisherConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.generator, PathBuf::from("tools/brief.py"));
        assert_eq!(config.generator_timeout(), Some(Duration::from_secs(900)));
        assert_eq!(config.git.branch, "gh-pages");
        assert_eq!(config.git.remote, "origin");
        assert!(!config.git.push);
        assert_eq!(config.marker_file, ".current_page");
        assert!(config.verify_page_dir);
    }

    #[test]
    fn empty_marker_fails() {
        let config = PublisherConfig {
            marker_file: "  ".to_string(),
            ..Default::default()
        };
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("marker_file")));
    }

    #[test]
    fn marker_path_fails() {
        let config = PublisherConfig {
            marker_file: "out/.current_page".to_string(),
            ..Default::default()
        };
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn zero_timeout_fails() {
        let config = PublisherConfig {
            generator_timeout_secs: Some(0),
            ..Default::default()
        };
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("timeout")));
    }

    #[test]
    fn short_timeout_warns() {
        let config = PublisherConfig {
            generator_timeout_secs: Some(5),
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("10 seconds")));
    }

    #[test]
    fn commit_message_without_date_fails() {
        let git = GitConfig {
            commit_message: "Morning briefing".to_string(),
            ..Default::default()
        };
        let result = git.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("{date}")));
    }

    #[test]
    fn empty_remote_and_branch_fail() {
        let git = GitConfig {
            remote: String::new(),
            branch: " ".to_string(),
            ..Default::default()
        };
        assert_eq!(git.validate().errors.len(), 2);
    }

    #[test]
    fn disabled_push_warns() {
        let git = GitConfig {
            push: false,
            ..Default::default()
        };
        let result = git.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("push")));
    }

    #[test]
    fn non_http_base_url_fails() {
        let publish = PublishConfig {
            base_url: "ftp://example.com/briefing/".to_string(),
        };
        let result = publish.validate();
        assert!(result.errors.iter().any(|e| e.contains("ftp")));
    }

    #[test]
    fn unparsable_base_url_fails() {
        let publish = PublishConfig {
            base_url: "not a url".to_string(),
        };
        assert!(!publish.validate().is_valid());
    }

    #[test]
    fn base_url_with_query_fails() {
        let publish = PublishConfig {
            base_url: "https://example.com/briefing/?ref=1".to_string(),
        };
        assert!(!publish.validate().is_valid());
    }

    #[test]
    fn expand_home_replaces_tilde() {
        let home = PathBuf::from("/home/clive");
        let expanded = expand_home(Path::new("~/kokoro-tts/venv"), Some(&home)).unwrap();
        assert_eq!(expanded, PathBuf::from("/home/clive/kokoro-tts/venv"));
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        let expanded = expand_home(Path::new("/opt/tts/venv"), None).unwrap();
        assert_eq!(expanded, PathBuf::from("/opt/tts/venv"));
    }

    #[test]
    fn expand_home_without_home_fails() {
        assert!(expand_home(Path::new("~/kokoro-tts/venv"), None).is_err());
    }

    #[test]
    fn load_uses_project_file_when_present() {
        let root = TempDir::new().unwrap();
        std::fs::write(
            root.path().join(CONFIG_FILE_NAME),
            "[publish]\nbase_url = \"https://example.com/daily/\"\n",
        )
        .unwrap();

        let config = PublisherConfig::load(None, root.path()).unwrap();
        assert_eq!(config.publish.base_url, "https://example.com/daily/");
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let root = TempDir::new().unwrap();
        let config = PublisherConfig::load(None, root.path()).unwrap();
        assert_eq!(config, PublisherConfig::default());
    }

    #[test]
    fn load_rejects_missing_explicit_file() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("nope.toml");
        let err = PublisherConfig::load(Some(&missing), root.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_reports_parse_errors() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("bad.toml");
        std::fs::write(&path, "verify_page_dir = \"sometimes\"\n").unwrap();
        let err = PublisherConfig::load(Some(&path), root.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn validation_result_into_result_err_on_invalid() {
        let mut result = ValidationResult::default();
        result.add_error("fatal error");
        result.add_warning("warning");
        assert!(result.into_result().is_err());
    }
}
