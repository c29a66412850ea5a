//! Python virtual environment handling.
//!
//! Sourcing `bin/activate` only changes a handful of variables. The same
//! effect is reproduced here as an [`InterpreterEnv`] applied to the child
//! command, leaving the publisher's own environment untouched.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::{Error, Result};

/// A virtual environment on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualEnv {
    root: PathBuf,
}

impl VirtualEnv {
    /// Opens a virtual environment, requiring its activation script.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let venv = Self { root: root.into() };
        let activate = venv.activate_script();
        if !activate.is_file() {
            return Err(Error::MissingDependency {
                what: "virtual environment activation script",
                path: activate,
            });
        }
        Ok(venv)
    }

    /// Root directory of the environment.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `bin` directory prepended to `PATH` on activation.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Path of the `activate` script.
    pub fn activate_script(&self) -> PathBuf {
        self.bin_dir().join("activate")
    }

    /// Interpreter a `python3` invocation resolves to once activated.
    pub fn interpreter(&self) -> PathBuf {
        self.bin_dir().join("python3")
    }

    /// Locates `lib/python*/site-packages`, preferring the newest version.
    pub fn site_packages(&self) -> Result<PathBuf> {
        find_site_packages(&self.root)
    }
}

/// Finds the site-packages directory inside a virtual environment without
/// requiring it to be activatable.
pub fn find_site_packages(venv_root: &Path) -> Result<PathBuf> {
    let lib = venv_root.join("lib");
    let missing = || Error::MissingDependency {
        what: "site-packages directory",
        path: lib.join("python3*").join("site-packages"),
    };

    if !lib.is_dir() {
        return Err(missing());
    }

    let mut candidates: Vec<(Vec<u32>, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(&lib)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(version) = name.to_str().and_then(python_version) else {
            continue;
        };
        let site = entry.path().join("site-packages");
        if site.is_dir() {
            candidates.push((version, site));
        }
    }

    candidates.sort();
    candidates.pop().map(|(_, path)| path).ok_or_else(missing)
}

/// Parses `python3.11` into `[3, 11]`.
fn python_version(dir_name: &str) -> Option<Vec<u32>> {
    let version = dir_name.strip_prefix("python")?;
    version
        .split('.')
        .map(|part| part.parse::<u32>().ok())
        .collect()
}

/// Environment changes for running a venv's interpreter.
#[derive(Debug, Clone, Default)]
pub struct InterpreterEnv {
    interpreter: PathBuf,
    set: Vec<(String, OsString)>,
    remove: Vec<String>,
}

impl InterpreterEnv {
    /// Builds the environment `source bin/activate` would produce, given the
    /// caller's current `PATH`.
    pub fn activate(venv: &VirtualEnv, inherited_path: Option<&OsStr>) -> Result<Self> {
        let mut path_entries = vec![venv.bin_dir()];
        if let Some(inherited) = inherited_path {
            path_entries.extend(std::env::split_paths(inherited));
        }

        Ok(Self {
            interpreter: venv.interpreter(),
            set: vec![
                (
                    "VIRTUAL_ENV".to_string(),
                    venv.root().as_os_str().to_os_string(),
                ),
                ("PATH".to_string(), join_search_path(path_entries)?),
            ],
            remove: vec!["PYTHONHOME".to_string()],
        })
    }

    /// Prepends `extra` entries to `PYTHONPATH`, keeping inherited entries.
    pub fn with_python_path(
        mut self,
        extra: &[PathBuf],
        inherited: Option<&OsStr>,
    ) -> Result<Self> {
        let mut entries: Vec<PathBuf> = extra.to_vec();
        if let Some(inherited) = inherited {
            entries.extend(std::env::split_paths(inherited).filter(|p| !p.as_os_str().is_empty()));
        }
        if entries.is_empty() {
            return Ok(self);
        }

        let value = join_search_path(entries)?;
        self.set.retain(|(key, _)| key != "PYTHONPATH");
        self.set.push(("PYTHONPATH".to_string(), value));
        Ok(self)
    }

    /// Interpreter to invoke.
    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Value this environment sets for `key`, if any.
    pub fn var(&self, key: &str) -> Option<&OsStr> {
        self.set
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    /// Variables removed from the child environment.
    pub fn removed(&self) -> &[String] {
        &self.remove
    }

    /// Builds a command running the interpreter with these variables.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        for key in &self.remove {
            cmd.env_remove(key);
        }
        for (key, value) in &self.set {
            cmd.env(key, value);
        }
        cmd
    }
}

fn join_search_path(entries: Vec<PathBuf>) -> Result<OsString> {
    std::env::join_paths(entries).map_err(|e| Error::Config(format!("invalid search path: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_venv(python_dirs: &[&str]) -> TempDir {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/activate"), "# activate\n").unwrap();
        for name in python_dirs {
            std::fs::create_dir_all(dir.path().join("lib").join(name).join("site-packages"))
                .unwrap();
        }
        dir
    }

    #[test]
    fn open_requires_activate_script() {
        let dir = TempDir::new().unwrap();
        let err = VirtualEnv::open(dir.path()).unwrap_err();
        match err {
            Error::MissingDependency { path, .. } => assert!(path.ends_with("bin/activate")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn open_exposes_interpreter() {
        let dir = fake_venv(&[]);
        let venv = VirtualEnv::open(dir.path()).unwrap();
        assert_eq!(venv.interpreter(), dir.path().join("bin/python3"));
    }

    #[test]
    fn site_packages_prefers_newest_python() {
        let dir = fake_venv(&["python3.9", "python3.12", "python3.11"]);
        let site = find_site_packages(dir.path()).unwrap();
        assert_eq!(site, dir.path().join("lib/python3.12/site-packages"));
    }

    #[test]
    fn site_packages_ignores_unrelated_dirs() {
        let dir = fake_venv(&["python3.10"]);
        std::fs::create_dir_all(dir.path().join("lib/pkgconfig")).unwrap();
        std::fs::create_dir_all(dir.path().join("lib/python3.13")).unwrap();
        let site = find_site_packages(dir.path()).unwrap();
        assert_eq!(site, dir.path().join("lib/python3.10/site-packages"));
    }

    #[test]
    fn site_packages_missing_fails() {
        let dir = fake_venv(&[]);
        assert!(matches!(
            find_site_packages(dir.path()),
            Err(Error::MissingDependency { .. })
        ));
    }

    #[test]
    fn python_version_parsing() {
        assert_eq!(python_version("python3.11"), Some(vec![3, 11]));
        assert_eq!(python_version("python3"), Some(vec![3]));
        assert_eq!(python_version("pkgconfig"), None);
        assert_eq!(python_version("python3.x"), None);
    }

    #[test]
    fn activation_prepends_bin_to_path() {
        let dir = fake_venv(&[]);
        let venv = VirtualEnv::open(dir.path()).unwrap();
        let env = InterpreterEnv::activate(&venv, Some(OsStr::new("/usr/bin:/bin"))).unwrap();

        let path: Vec<PathBuf> = std::env::split_paths(env.var("PATH").unwrap()).collect();
        assert_eq!(path[0], dir.path().join("bin"));
        assert_eq!(&path[1..], &[PathBuf::from("/usr/bin"), PathBuf::from("/bin")]);
        assert_eq!(env.var("VIRTUAL_ENV"), Some(dir.path().as_os_str()));
        assert_eq!(env.removed(), &["PYTHONHOME".to_string()]);
        assert_eq!(env.interpreter(), venv.interpreter());
    }

    #[test]
    fn python_path_keeps_inherited_entries_after_extra() {
        let dir = fake_venv(&[]);
        let venv = VirtualEnv::open(dir.path()).unwrap();
        let env = InterpreterEnv::activate(&venv, None)
            .unwrap()
            .with_python_path(
                &[PathBuf::from("/home/clive/kokoro-tts/venv/lib/python3.11/site-packages")],
                Some(OsStr::new("/opt/shared")),
            )
            .unwrap();

        let entries: Vec<PathBuf> = std::env::split_paths(env.var("PYTHONPATH").unwrap()).collect();
        assert_eq!(
            entries,
            vec![
                PathBuf::from("/home/clive/kokoro-tts/venv/lib/python3.11/site-packages"),
                PathBuf::from("/opt/shared"),
            ]
        );
    }

    #[test]
    fn python_path_unset_when_nothing_to_add() {
        let dir = fake_venv(&[]);
        let venv = VirtualEnv::open(dir.path()).unwrap();
        let env = InterpreterEnv::activate(&venv, None)
            .unwrap()
            .with_python_path(&[], None)
            .unwrap();
        assert!(env.var("PYTHONPATH").is_none());
    }
}
