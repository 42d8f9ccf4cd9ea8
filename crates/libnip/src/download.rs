//! Archive and catalog fetching.
//!
//! Archives land in the cache directory under their full name plus the
//! package extension. A cache entry is reused when its on-disk size equals
//! the catalog's advertised FILE_SIZE; anything else is fetched again in
//! full. Catalog summaries are fetched only when the server reports a newer
//! modification time than the one stored for the repository.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::{Config, PKG_EXT};
use crate::error::{Context, Error, Fallible};
use crate::event::Event;
use crate::order::InstallStep;
use crate::session::Session;
use crate::store::CatalogStore;

const CHUNK: usize = 8 * 1024;
/// Emit a progress event at most once per this many bytes.
const PROGRESS_GRAIN: u64 = 64 * 1024;

/// Progress of one archive download.
#[derive(Clone, Debug)]
pub struct DownloadProgress {
    pub name: String,
    pub total: u64,
    pub bytes: u64,
    pub elapsed: Duration,
    pub percent: u8,
    /// Bytes per second since the download started.
    pub rate: u64,
}

/// Build the HTTP agent used for every transfer of a session.
pub fn agent(config: &Config) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .user_agent(concat!("nip/", env!("CARGO_PKG_VERSION")))
        .timeout_connect(config.fetch_timeout())
        .build()
}

/// Cache path of a package archive.
pub fn cache_path(cache_dir: &Path, full: &str) -> PathBuf {
    cache_dir.join(format!("{}{}", full, PKG_EXT))
}

/// A cache entry is reusable iff its size equals the advertised size and
/// that size is meaningful.
pub fn cache_is_reusable(path: &Path, file_size: i64) -> bool {
    if file_size <= 0 {
        return false;
    }
    match std::fs::metadata(path) {
        Ok(meta) => meta.len() == file_size as u64,
        Err(_) => false,
    }
}

/// Bytes that still have to be transferred for `steps`, accounting for
/// reusable cache entries.
pub fn download_size(steps: &[InstallStep], cache_dir: &Path) -> u64 {
    steps
        .iter()
        .filter(|s| s.file_size > 0)
        .filter(|s| !cache_is_reusable(&cache_path(cache_dir, &s.full), s.file_size))
        .map(|s| s.file_size as u64)
        .sum()
}

/// Fetch every archive of the ordered install list into the cache.
///
/// A package that cannot be fetched is either fatal (the user refuses to
/// continue) or marked with `file_size = -1`, telling the executor to skip
/// it.
pub fn fetch_archives(
    session: &Session,
    store: &CatalogStore,
    steps: &mut [InstallStep],
    cache_dir: &Path,
) -> Fallible<()> {
    let agent = agent(&session.config());

    for step in steps.iter_mut() {
        // a zero FILE_SIZE usually means the catalog was generated without
        // sizes; tell the user before the transfer looks stuck
        if step.file_size == 0 {
            session.emit(Event::EmptyFileSize(step.full.clone()));
        }

        let dest = cache_path(cache_dir, &step.full);
        if cache_is_reusable(&dest, step.file_size) {
            debug!(full = %step.full, "cache hit");
            session.emit(Event::DownloadCached(step.full.clone()));
            continue;
        }

        let repository = store
            .repository_of(&step.full)?
            .ok_or_else(|| Error::Custom(format!("no repository for {}", step.full)))?;
        let url = format!("{}/{}{}", repository, step.full, PKG_EXT);

        match fetch_one(session, &agent, &url, &dest, &step.full) {
            Ok(()) => session.emit(Event::DownloadFinished(step.full.clone())),
            Err(err) => {
                warn!(full = %step.full, %err, "fetch failed");
                let _ = std::fs::remove_file(&dest);
                let proceed =
                    session.confirm(Event::PromptDownloadFailed(step.full.clone()), false);
                if !proceed {
                    return Err(err);
                }
                step.file_size = -1;
            }
        }
    }

    session.emit(Event::DownloadAllDone);
    Ok(())
}

fn fetch_one(
    session: &Session,
    agent: &ureq::Agent,
    url: &str,
    dest: &Path,
    name: &str,
) -> Fallible<()> {
    let response = agent
        .get(url)
        .call()
        .with_context(|| format!("failed to fetch {}", url))?;

    let total: u64 = response
        .header("Content-Length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if total == 0 {
        return Err(Error::Http {
            message: format!("empty download from {}", url),
            source: None,
        });
    }

    let mut reader = response.into_reader();
    let mut file = std::fs::File::create(dest)
        .with_context(|| format!("could not open {}", dest.display()))?;

    let started = Instant::now();
    let mut bytes: u64 = 0;
    let mut last_reported: u64 = 0;
    let mut chunk = [0u8; CHUNK];

    loop {
        let read = reader
            .read(&mut chunk)
            .with_context(|| format!("failure during fetch of {}", url))?;
        if read == 0 {
            break;
        }

        file.write_all(&chunk[..read])
            .with_context(|| format!("could not write {}", dest.display()))?;
        bytes += read as u64;

        if bytes - last_reported >= PROGRESS_GRAIN || bytes == total {
            last_reported = bytes;
            let elapsed = started.elapsed();
            let secs = elapsed.as_secs_f64();
            session.emit(Event::DownloadProgress(DownloadProgress {
                name: name.to_owned(),
                total,
                bytes,
                elapsed,
                percent: ((bytes as f64 / total as f64) * 100.0) as u8,
                rate: if secs > 0.0 {
                    (bytes as f64 / secs) as u64
                } else {
                    bytes
                },
            }));
        }
    }

    if bytes < total {
        return Err(Error::Http {
            message: format!("truncated download from {} ({}/{} bytes)", url, bytes, total),
            source: None,
        });
    }

    Ok(())
}

/// Outcome of a catalog summary fetch.
pub enum SummaryFetch {
    /// The stored snapshot is still current.
    UpToDate,
    /// A newer summary was fetched.
    Fetched {
        /// File name the bytes came from, carries the compression extension.
        name: String,
        bytes: Vec<u8>,
        /// Server-reported modification time.
        mtime: i64,
    },
}

/// Fetch a repository's compressed summary, trying the known extensions,
/// unless the stored `since` modification time is still current.
pub fn fetch_summary(
    config: &Config,
    repository: &str,
    since: i64,
    force: bool,
) -> Fallible<SummaryFetch> {
    let agent = agent(config);

    for ext in ["bz2", "gz"] {
        let name = format!("pkg_summary.{}", ext);
        let url = format!("{}/{}", repository, name);

        let response = match agent.get(&url).call() {
            Ok(response) => response,
            // try the next known extension
            Err(ureq::Error::Status(404, _)) => continue,
            Err(err) => {
                return Err(Error::Http {
                    message: format!("failed to fetch {}", url),
                    source: Some(Box::new(err)),
                })
            }
        };

        let mtime = response
            .header("Last-Modified")
            .and_then(|v| chrono::DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.timestamp())
            .unwrap_or(0);

        if !force && mtime > 0 && mtime <= since {
            return Ok(SummaryFetch::UpToDate);
        }

        let mut bytes = vec![];
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .with_context(|| format!("failure during fetch of {}", url))?;
        if bytes.is_empty() {
            return Err(Error::Http {
                message: format!("empty download from {}", url),
                source: None,
            });
        }

        debug!(url, mtime, size = bytes.len(), "summary fetched");
        return Ok(SummaryFetch::Fetched { name, bytes, mtime });
    }

    Err(Error::Http {
        message: format!("no pkg_summary found under {}", repository),
        source: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_reuse_requires_exact_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo-1.0.tgz");
        std::fs::write(&path, vec![0u8; 128]).unwrap();

        assert!(cache_is_reusable(&path, 128));
        assert!(!cache_is_reusable(&path, 129));
        // an advertised size of zero or below never reuses
        assert!(!cache_is_reusable(&path, 0));
        assert!(!cache_is_reusable(&path, -1));
        assert!(!cache_is_reusable(&dir.path().join("missing.tgz"), 128));
    }

    #[test]
    fn download_size_skips_cached_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cached-1.0.tgz"), vec![0u8; 64]).unwrap();

        let steps = vec![
            InstallStep {
                full: "cached-1.0".into(),
                file_size: 64,
                level: 0,
                upgrade: false,
            },
            InstallStep {
                full: "fresh-1.0".into(),
                file_size: 1000,
                level: 0,
                upgrade: false,
            },
            InstallStep {
                full: "sizeless-1.0".into(),
                file_size: 0,
                level: 0,
                upgrade: false,
            },
        ];

        assert_eq!(download_size(&steps, dir.path()), 1000);
    }
}
