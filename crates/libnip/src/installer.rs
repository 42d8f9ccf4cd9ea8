//! Driver for the external installer toolchain.
//!
//! The toolchain is the pkg_install family: an `add` tool, a `delete`
//! tool, an `info` tool and an `admin` tool sharing one installed-package
//! database directory. All local mutations go through these binaries; the
//! planner only decides order and arguments.

use once_cell::unsync::OnceCell;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::UNIX_EPOCH;

use tracing::{debug, warn};

use crate::download::cache_path;
use crate::error::{Context, Error, Fallible};
use crate::event::Event;
use crate::order::{InstallStep, RemoveStep};
use crate::session::Session;

/// Compiled-in location of the toolchain, overridable with
/// `PKG_INSTALL_DIR`.
const DEFAULT_TOOLS_DIR: &str = "/usr/sbin";

/// Stem of the toolchain's own package; deleting it would strand the
/// system, upgrading it needs force flags.
const PKG_INSTALL: &str = "pkg_install";

/// Located toolchain binaries plus the installed-package database they
/// operate on.
#[derive(Debug)]
pub struct PkgInstall {
    add: PathBuf,
    delete: PathBuf,
    info: PathBuf,
    admin: PathBuf,
    dbdir: PathBuf,
}

impl PkgInstall {
    /// Locate the toolchain from `PKG_INSTALL_DIR` or the compiled-in
    /// default, and discover the installed-package database directory from
    /// the admin tool.
    pub fn locate() -> Fallible<PkgInstall> {
        let dir = std::env::var_os("PKG_INSTALL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOOLS_DIR));
        Self::locate_in(&dir)
    }

    fn locate_in(dir: &Path) -> Fallible<PkgInstall> {
        let admin = dir.join("pkg_admin");
        if !is_executable(&admin) {
            return Err(Error::InstallerNotFound(admin));
        }

        // the toolchain must only look at the paths we hand it
        std::env::remove_var("PKG_PATH");

        let output = Command::new(&admin)
            .args(["config-var", "PKG_DBDIR"])
            .output()
            .with_context(|| format!("cannot execute {}", admin.display()))?;
        let dbdir = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(PathBuf::from)
            .ok_or(Error::PkgDbDirUnknown)?;

        debug!(dbdir = %dbdir.display(), "installer toolchain located");

        Ok(PkgInstall {
            add: dir.join("pkg_add"),
            delete: dir.join("pkg_delete"),
            info: dir.join("pkg_info"),
            admin,
            dbdir,
        })
    }

    pub fn dbdir(&self) -> &Path {
        &self.dbdir
    }

    /// Modification time of the installed-package database directory, used
    /// to skip needless local summary rebuilds.
    pub fn db_mtime(&self) -> i64 {
        std::fs::metadata(&self.dbdir)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    /// Whether the caller may mutate the installed-package database. The
    /// check is advisory, the toolchain enforces it anyway.
    pub fn can_write_db(&self) -> bool {
        let probe = self.dbdir.join(".nip-write-probe");
        match File::create(&probe) {
            Ok(_) => {
                let _ = std::fs::remove_file(&probe);
                true
            }
            Err(_) => false,
        }
    }

    /// Stream the installed universe as a summary, via the info tool.
    pub fn local_summary(&self) -> Fallible<String> {
        let output = Command::new(&self.info)
            .args(["-X", "-a"])
            .output()
            .with_context(|| format!("cannot execute {}", self.info.display()))?;
        if !output.status.success() {
            return Err(Error::Custom(format!(
                "{} exited with {}",
                self.info.display(),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Read the automatic-installed flag of a package.
    pub fn is_automatic(&self, full: &str) -> bool {
        Command::new(&self.info)
            .args(["-Q", "automatic", full])
            .output()
            .map(|out| {
                String::from_utf8_lossy(&out.stdout)
                    .trim()
                    .eq_ignore_ascii_case("yes")
            })
            .unwrap_or(false)
    }

    /// Write the automatic-installed flag of a package. The flag is the
    /// complement of the catalog's keep flag.
    pub fn mark_automatic(&self, full: &str, automatic: bool) -> Fallible<()> {
        let value = if automatic {
            "automatic=YES"
        } else {
            "automatic=NO"
        };
        let status = Command::new(&self.admin)
            .args(["set", value, full])
            .status()
            .with_context(|| format!("cannot execute {}", self.admin.display()))?;
        if !status.success() {
            warn!(full, value, "could not update the automatic flag");
        }
        Ok(())
    }
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

/// Does this install step upgrade the installer toolchain itself?
fn is_self_upgrade(full: &str) -> bool {
    full.starts_with(PKG_INSTALL)
}

/// Sequentially drives the installer subprocesses over an ordered plan.
///
/// Subprocess stderr is appended to the transaction error log, opened once
/// on first failure-prone invocation. Removal failures are counted but do
/// not fail the transaction; install failures do.
pub struct Executor<'a> {
    session: &'a Session,
    tools: &'a PkgInstall,
    log_path: PathBuf,
    errlog: OnceCell<Option<File>>,
    verbose: bool,
}

impl<'a> Executor<'a> {
    pub fn new(session: &'a Session, tools: &'a PkgInstall) -> Executor<'a> {
        let config = session.config();
        Executor {
            session,
            tools,
            log_path: config.err_log_path(),
            errlog: OnceCell::new(),
            verbose: config.flags.verbose,
        }
    }

    /// Force flags handed to every add/delete subprocess.
    fn tool_flags(&self) -> &'static str {
        if self.verbose {
            "-fv"
        } else {
            "-f"
        }
    }

    /// The error log is opened append-mode once per transaction and shared
    /// by every subprocess.
    fn errlog(&self) -> Option<File> {
        self.errlog
            .get_or_init(|| {
                if self.verbose {
                    return None;
                }
                match std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.log_path)
                {
                    Ok(file) => {
                        self.session.emit(Event::LoggingTo(self.log_path.clone()));
                        Some(file)
                    }
                    Err(err) => {
                        warn!(%err, "cannot open error log, keeping stderr");
                        None
                    }
                }
            })
            .as_ref()
            .and_then(|f| f.try_clone().ok())
    }

    fn run(&self, program: &Path, flags: &str, target: &str) -> bool {
        let mut log = self.errlog();
        if let Some(f) = log.as_mut() {
            let _ = writeln!(f, "{} {} {}", program.display(), flags, target);
        }

        let stderr = match log {
            Some(f) => Stdio::from(f),
            None => Stdio::inherit(),
        };

        let status = Command::new(program)
            .arg(flags)
            .arg(target)
            .stdout(Stdio::null())
            .stderr(stderr)
            .status();

        match status {
            Ok(status) => status.success(),
            Err(err) => {
                warn!(program = %program.display(), %err, "failed to spawn");
                false
            }
        }
    }

    /// Drive the delete tool over an ordered removal list.
    ///
    /// Returns the number of failed deletions.
    pub fn remove_packages(&self, steps: &[RemoveStep]) -> usize {
        let mut failures = 0;

        for step in steps {
            // the toolchain cannot delete itself
            if is_self_upgrade(&step.full) {
                self.session.emit(Event::NotRemoving(step.full.clone()));
                continue;
            }

            self.session.emit(Event::Removing(step.full.clone()));
            if !self.run(&self.tools.delete, self.tool_flags(), &step.full) {
                self.session.emit(Event::InstallerFailed {
                    package: step.full.clone(),
                    phase: "remove",
                });
                failures += 1;
            }
        }

        failures
    }

    /// Drive the add tool over an ordered install list.
    ///
    /// Returns the number of failed installations.
    pub fn install_packages(&self, steps: &[InstallStep], cache_dir: &Path) -> usize {
        let mut failures = 0;

        for step in steps {
            // fetch failure accepted by the user, skip
            if step.file_size == -1 {
                continue;
            }

            let archive = cache_path(cache_dir, &step.full);
            let archive = archive.to_string_lossy();

            if is_self_upgrade(&step.full) {
                let proceed = self
                    .session
                    .confirm(Event::PromptSelfUpgrade(step.full.clone()), false);
                if !proceed {
                    continue;
                }
                // force-update the toolchain underneath itself
                let flags = if self.verbose { "-ffuv" } else { "-ffu" };
                self.session.emit(Event::Installing(step.full.clone()));
                if !self.run(&self.tools.add, flags, &archive) {
                    self.session.emit(Event::InstallerFailed {
                        package: step.full.clone(),
                        phase: "install",
                    });
                    failures += 1;
                }
                continue;
            }

            self.session.emit(Event::Installing(step.full.clone()));
            if !self.run(&self.tools.add, self.tool_flags(), &archive) {
                self.session.emit(Event::InstallerFailed {
                    package: step.full.clone(),
                    phase: "install",
                });
                failures += 1;
            }
        }

        failures
    }
}

/// Directly delete a package outside a planned transaction, for
/// autoremoval.
pub fn delete_package(tools: &PkgInstall, full: &str) -> bool {
    Command::new(&tools.delete)
        .args(["-f", full])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PKG_EXT;

    #[test]
    fn locate_fails_without_the_admin_tool() {
        let dir = tempfile::tempdir().unwrap();
        match PkgInstall::locate_in(dir.path()) {
            Err(Error::InstallerNotFound(path)) => {
                assert!(path.ends_with("pkg_admin"));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn self_upgrade_detection() {
        assert!(is_self_upgrade("pkg_install-20230101"));
        assert!(!is_self_upgrade("pkgconf-1.9"));
        assert!(!is_self_upgrade("foo-1.0"));
    }

    #[test]
    fn archive_paths_carry_the_package_extension() {
        let path = cache_path(Path::new("/var/db/nip/cache"), "foo-1.0");
        assert_eq!(
            path,
            PathBuf::from(format!("/var/db/nip/cache/foo-1.0{}", PKG_EXT))
        );
    }
}
