//! Configuration for a session.
//!
//! Two small line-oriented files live in the configuration directory:
//! `repositories.conf` (one repository URL per line, `$arch` and
//! `$osrelease` substituted with live system values) and `preferred.conf`
//! (version pins, see [`crate::preferred`]). The `PKG_REPOS` environment
//! variable overrides the repositories file entirely.

use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{System, SystemExt};
use tracing::{debug, warn};

use crate::error::Fallible;
use crate::preferred::Preferred;

pub const REPOS_FILE: &str = "repositories.conf";
pub const PREF_FILE: &str = "preferred.conf";
pub const PKG_EXT: &str = ".tgz";

/// Seconds before a fetch connection attempt gives up.
const DEFAULT_FETCH_TIMEOUT: u64 = 15;

static OS_RELEASE: Lazy<String> = Lazy::new(|| {
    let sys = System::new();
    sys.os_version()
        .or_else(|| sys.kernel_version())
        .unwrap_or_default()
});

/// Machine architecture as recorded in catalog summaries.
pub fn machine_arch() -> &'static str {
    std::env::consts::ARCH
}

/// Runtime toggles, set by the frontend from command-line flags.
#[derive(Clone, Copy, Debug, Default)]
pub struct Flags {
    /// Force a catalog refresh regardless of stored mtimes.
    pub force_update: bool,
    /// Reinstall packages even when the installed version satisfies.
    pub force_reinstall: bool,
    /// Pass verbosity to installer subprocesses and keep their stderr.
    pub verbose: bool,
    /// Fetch archives without driving the installer.
    pub download_only: bool,
    /// `Some(true)` assume yes, `Some(false)` assume no, `None` ask.
    pub assume: Option<bool>,
    /// Treat unsatisfied prefix-internal REQUIRES as errors.
    pub strict_requires: bool,
    /// Display dependencies as resolved package names where possible.
    pub package_version: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    data_dir: PathBuf,
    conf_dir: PathBuf,
    prefix: PathBuf,
    repositories: Vec<String>,
    preferred: Preferred,
    fetch_timeout: Duration,
    pub flags: Flags,
}

impl Config {
    /// Load the configuration from the default locations.
    pub fn load() -> Fallible<Config> {
        Self::load_with(default::data_dir(), default::conf_dir())
    }

    /// Load the configuration with explicit directories.
    pub fn load_with<P, Q>(data_dir: P, conf_dir: Q) -> Fallible<Config>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let data_dir = data_dir.as_ref().to_owned();
        let conf_dir = conf_dir.as_ref().to_owned();

        let repositories = match std::env::var("PKG_REPOS") {
            Ok(value) => value.split_whitespace().map(str::to_owned).collect(),
            Err(_) => read_repositories(&conf_dir.join(REPOS_FILE)),
        };
        debug!(?repositories, "configured repositories");

        let preferred = Preferred::load(&conf_dir.join(PREF_FILE));

        Ok(Config {
            data_dir,
            conf_dir,
            prefix: default::prefix(),
            repositories,
            preferred,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT),
            flags: Flags::default(),
        })
    }

    #[inline]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[inline]
    pub fn conf_dir(&self) -> &Path {
        &self.conf_dir
    }

    /// Install prefix of the external installer, `/usr/pkg` by default.
    #[inline]
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    #[inline]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("nip.db")
    }

    #[inline]
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    #[inline]
    pub fn err_log_path(&self) -> PathBuf {
        self.data_dir.join("err.log")
    }

    #[inline]
    pub fn repositories(&self) -> &[String] {
        &self.repositories
    }

    #[inline]
    pub fn preferred(&self) -> &Preferred {
        &self.preferred
    }

    #[inline]
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn set_fetch_timeout(&mut self, timeout: Duration) {
        self.fetch_timeout = timeout;
    }

    pub fn set_repositories(&mut self, repositories: Vec<String>) {
        self.repositories = repositories;
    }

    pub fn set_preferred(&mut self, preferred: Preferred) {
        self.preferred = preferred;
    }

    pub fn set_prefix<P: AsRef<Path>>(&mut self, prefix: P) {
        self.prefix = prefix.as_ref().to_owned();
    }
}

/// Read the repositories file, substituting `$arch` and `$osrelease`.
fn read_repositories(path: &Path) -> Vec<String> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(_) => return vec![],
    };

    let mut repos = vec![];
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let known_scheme = ["ftp://", "http://", "https://", "file://"]
            .iter()
            .any(|scheme| line.starts_with(scheme));
        if !known_scheme {
            warn!(line, "ignoring repository entry without a known scheme");
            continue;
        }

        let url = line
            .replace("$arch", machine_arch())
            .replace("$osrelease", OS_RELEASE.as_str());
        repos.push(url);
    }

    repos
}

/// Default paths, overridable through the environment.
mod default {
    use std::path::PathBuf;

    /// Data directory holding the catalog database, the archive cache and
    /// the error log: `$NIP_DIR`, else `/var/db/nip`, else a per-user
    /// directory when the system location is not writable.
    pub(super) fn data_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os("NIP_DIR") {
            return PathBuf::from(dir);
        }

        let system = PathBuf::from("/var/db/nip");
        if std::fs::create_dir_all(&system).is_ok() {
            return system;
        }

        dirs::data_local_dir()
            .map(|d| d.join("nip"))
            .unwrap_or(system)
    }

    /// Configuration directory: `$NIP_CONF_DIR`, else `/etc/nip`.
    pub(super) fn conf_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os("NIP_CONF_DIR") {
            return PathBuf::from(dir);
        }
        PathBuf::from("/etc/nip")
    }

    /// Install prefix the external installer unpacks into.
    pub(super) fn prefix() -> PathBuf {
        if let Some(dir) = std::env::var_os("LOCALBASE") {
            return PathBuf::from(dir);
        }
        PathBuf::from("/usr/pkg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repositories_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REPOS_FILE);
        std::fs::write(
            &path,
            "# main repository\n\
             https://cdn.example.org/packages/$arch/current/All\n\
             \n\
             not a url\n\
             ftp://mirror.example.org/pub/All\n",
        )
        .unwrap();

        let repos = read_repositories(&path);
        assert_eq!(repos.len(), 2);
        assert!(repos[0].contains(machine_arch()));
        assert!(!repos[0].contains("$arch"));
        assert_eq!(repos[1], "ftp://mirror.example.org/pub/All");
    }

    #[test]
    fn missing_repositories_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_repositories(&dir.path().join("nonexistent")).is_empty());
    }
}
