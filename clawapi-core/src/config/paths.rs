//! On-disk layout of the clawapi root directory.
//!
//! ```text
//! ~/.clawapi/
//!   config.toml
//!   current_port            (written by the process supervisor)
//!   installed/<provider>    (install flags)
//!   sessions/<provider>/    (cookies.json, userAgent.txt)
//!   logs/
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the root directory.
pub const HOME_ENV: &str = "CLAWAPI_HOME";

/// Resolved directory layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Use an explicit root directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the root from `CLAWAPI_HOME`, falling back to `~/.clawapi`.
    pub fn resolve() -> Option<Self> {
        if let Ok(dir) = std::env::var(HOME_ENV)
            && !dir.trim().is_empty()
        {
            return Some(Self::with_root(dir));
        }
        dirs::home_dir().map(|home| Self::with_root(home.join(".clawapi")))
    }

    /// Create every directory of the layout if missing.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [
            self.root.clone(),
            self.sessions_dir(),
            self.installed_dir(),
            self.logs_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn installed_dir(&self) -> PathBuf {
        self.root.join("installed")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn port_file(&self) -> PathBuf {
        self.root.join("current_port")
    }

    /// Whether the install flag for `provider` is set.
    pub fn is_installed(&self, provider: &str) -> bool {
        self.installed_dir().join(provider).exists()
    }

    pub fn set_installed(&self, provider: &str) -> io::Result<()> {
        fs::create_dir_all(self.installed_dir())?;
        fs::write(self.installed_dir().join(provider), "true")
    }

    /// Clear the install flag. Returns `false` if it was not set.
    pub fn set_uninstalled(&self, provider: &str) -> io::Result<bool> {
        let flag = self.installed_dir().join(provider);
        if !flag.exists() {
            return Ok(false);
        }
        fs::remove_file(flag)?;
        Ok(true)
    }

    /// Port recorded by the supervisor, if any.
    pub fn recorded_port(&self) -> Option<u16> {
        fs::read_to_string(self.port_file())
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = Paths::with_root("/tmp/claw");
        assert_eq!(paths.sessions_dir(), PathBuf::from("/tmp/claw/sessions"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/claw/config.toml"));
    }

    #[test]
    fn test_install_flags() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(dir.path());
        paths.ensure_dirs().unwrap();

        assert!(!paths.is_installed("claude"));
        paths.set_installed("claude").unwrap();
        assert!(paths.is_installed("claude"));
        assert!(paths.set_uninstalled("claude").unwrap());
        assert!(!paths.is_installed("claude"));
        assert!(!paths.set_uninstalled("claude").unwrap());
    }

    #[test]
    fn test_recorded_port() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(dir.path());
        assert_eq!(paths.recorded_port(), None);

        fs::write(paths.port_file(), "9123\n").unwrap();
        assert_eq!(paths.recorded_port(), Some(9123));

        fs::write(paths.port_file(), "garbage").unwrap();
        assert_eq!(paths.recorded_port(), None);
    }
}
