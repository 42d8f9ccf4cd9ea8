//! Filesystem bookkeeping: working directories, the archive cache, and
//! free-space probing before a transaction is allowed to touch anything.

use std::path::Path;
use sysinfo::{DiskExt, System, SystemExt};
use tracing::warn;

use crate::config::Config;
use crate::error::{Context, Error, Fallible};

/// Create the data and cache directories if needed.
pub fn create_dirs(config: &Config) -> Fallible<()> {
    std::fs::create_dir_all(config.data_dir())
        .with_context(|| format!("could not create {}", config.data_dir().display()))?;
    std::fs::create_dir_all(config.cache_dir())
        .with_context(|| format!("could not create {}", config.cache_dir().display()))?;
    Ok(())
}

/// Delete every downloaded archive from the cache directory.
pub fn clean_cache(cache_dir: &Path) -> Fallible<u64> {
    let mut removed = 0;

    let entries = match cache_dir.read_dir() {
        Ok(entries) => entries,
        Err(_) => return Ok(0),
    };

    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_file() {
            std::fs::remove_file(&path)
                .with_context(|| format!("could not delete {}", path.display()))?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// Available bytes on the filesystem holding `path`, when resolvable.
pub fn free_space(path: &Path) -> Option<u64> {
    let mut sys = System::new();
    sys.refresh_disks_list();
    sys.refresh_disks();

    let mut best: Option<(usize, u64)> = None;
    for disk in sys.disks() {
        let mount = disk.mount_point();
        if path.starts_with(mount) {
            let depth = mount.components().count();
            if best.map_or(true, |(d, _)| depth > d) {
                best = Some((depth, disk.available_space()));
            }
        }
    }

    best.map(|(_, space)| space)
}

/// Whether `free` bytes can hold `needed` more.
pub fn room_ok(free: u64, needed: u64) -> bool {
    free > needed
}

/// Fail the transaction before any side effect when `path`'s filesystem
/// cannot hold `needed` more bytes. An unresolvable mount point (sandboxes,
/// chroots) is logged and waved through.
pub fn ensure_room(path: &Path, needed: u64) -> Fallible<()> {
    match free_space(path) {
        Some(free) if !room_ok(free, needed) => Err(Error::DiskSpace {
            path: path.to_owned(),
            needed,
        }),
        Some(_) => Ok(()),
        None => {
            warn!(path = %path.display(), "cannot determine free space, proceeding");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_check() {
        assert!(room_ok(2 * 1024 * 1024, 1024 * 1024));
        assert!(!room_ok(1024 * 1024, 2 * 1024 * 1024));
        assert!(!room_ok(1024, 1024));
    }

    #[test]
    fn cache_cleaning_spares_dotfiles() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foo-1.0.tgz"), b"archive").unwrap();
        std::fs::write(dir.path().join("bar-1.0.tgz"), b"archive").unwrap();
        std::fs::write(dir.path().join(".marker"), b"keep me").unwrap();

        let removed = clean_cache(dir.path()).unwrap();
        assert_eq!(removed, 2);
        assert!(dir.path().join(".marker").exists());
        assert!(!dir.path().join("foo-1.0.tgz").exists());
    }

    #[test]
    fn cleaning_a_missing_cache_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nothing-here");
        assert_eq!(clean_cache(&gone).unwrap(), 0);
    }
}
