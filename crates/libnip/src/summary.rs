//! Package summary parsing.
//!
//! Summaries are streams of `KEY=VALUE` lines, one group per package,
//! groups separated by a blank line. The installed universe's summary is
//! produced by the external installer's info tool; remote catalogs arrive
//! as gzip- or bzip2-compressed files in the same format.

use std::io::Read;

use tracing::warn;

use crate::error::{Context, Error, Fallible};
use crate::pattern::{exact_pkgfmt, pkgname_from_pattern, split_fullname};
use crate::store::Depend;

/// One parsed summary group, ready for catalog insertion.
#[derive(Clone, Debug, Default)]
pub struct SummaryRecord {
    pub full: String,
    pub name: String,
    pub version: String,
    pub comment: String,
    pub file_size: i64,
    pub size_pkg: i64,
    pub categories: String,
    pub pkgpath: String,
    pub depends: Vec<Depend>,
    pub conflicts: Vec<String>,
    pub requires: Vec<String>,
    pub provides: Vec<String>,
    /// Seen on remote records; verified once per archive.
    pub machine_arch: Option<String>,
}

impl SummaryRecord {
    /// Build a record from a PKGNAME value, synthesizing a `-0.0` version
    /// for the rare packages published without one.
    pub fn from_pkgname(pkgname: &str) -> SummaryRecord {
        let full = if exact_pkgfmt(pkgname) {
            pkgname.to_owned()
        } else {
            format!("{}-0.0", pkgname)
        };
        let (name, version) = split_fullname(&full);

        SummaryRecord {
            name: name.to_owned(),
            version: version.to_owned(),
            full,
            ..SummaryRecord::default()
        }
    }

    /// Record a DEPENDS pattern together with its normalized stem.
    pub fn push_depend(&mut self, pattern: &str) {
        match pkgname_from_pattern(pattern) {
            Some(name) => self.depends.push(Depend {
                pattern: pattern.to_owned(),
                name,
            }),
            None => warn!(pattern, "could not extract a package name, entry dropped"),
        }
    }
}

/// Result of parsing a whole summary stream.
#[derive(Debug, Default)]
pub struct ParsedSummary {
    pub records: Vec<SummaryRecord>,
    /// Malformed groups that were skipped with a warning.
    pub skipped: usize,
    /// First MACHINE_ARCH seen in the stream.
    pub machine_arch: Option<String>,
}

/// Parse a summary stream into records. Malformed groups are skipped, the
/// rest of the stream is imported regardless.
pub fn parse_summary(text: &str) -> ParsedSummary {
    let mut parsed = ParsedSummary::default();

    for block in text.split("\n\n") {
        if block.trim().is_empty() {
            continue;
        }
        match parse_block(block) {
            Some(record) => {
                if parsed.machine_arch.is_none() {
                    parsed.machine_arch = record.machine_arch.clone();
                }
                parsed.records.push(record);
            }
            None => {
                warn!("skipping summary group without a PKGNAME");
                parsed.skipped += 1;
            }
        }
    }

    parsed
}

fn parse_block(block: &str) -> Option<SummaryRecord> {
    let mut record: Option<SummaryRecord> = None;
    let mut pending_depends: Vec<String> = vec![];
    let mut machine_arch = None;

    for line in block.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let (key, value) = match line.split_once('=') {
            Some(pair) => pair,
            None => {
                warn!(line, "invalid summary entry");
                continue;
            }
        };

        // multi-line values are not supported, and nothing here needs them
        if key == "DESCRIPTION" {
            continue;
        }

        if value.is_empty() {
            continue;
        }

        // keep values free of double quotes, as the summary format allows
        // them only in prose fields
        let value = value.replace('"', "`");

        match key {
            "PKGNAME" => record = Some(SummaryRecord::from_pkgname(&value)),
            "DEPENDS" => pending_depends.push(value),
            "CONFLICTS" => rec_push(&mut record, |r| r.conflicts.push(value.clone())),
            "REQUIRES" => rec_push(&mut record, |r| r.requires.push(value.clone())),
            "PROVIDES" => rec_push(&mut record, |r| r.provides.push(value.clone())),
            "COMMENT" => rec_push(&mut record, |r| r.comment = value.clone()),
            "CATEGORIES" => rec_push(&mut record, |r| r.categories = value.clone()),
            "PKGPATH" => rec_push(&mut record, |r| r.pkgpath = value.clone()),
            "FILE_SIZE" => rec_push(&mut record, |r| r.file_size = value.parse().unwrap_or(0)),
            "SIZE_PKG" => rec_push(&mut record, |r| r.size_pkg = value.parse().unwrap_or(0)),
            "MACHINE_ARCH" => machine_arch = Some(value),
            _ => {} // unknown keys are ignored
        }
    }

    let mut record = record?;
    for pattern in &pending_depends {
        record.push_depend(pattern);
    }
    record.machine_arch = machine_arch;
    Some(record)
}

fn rec_push<F: FnOnce(&mut SummaryRecord)>(record: &mut Option<SummaryRecord>, f: F) {
    if let Some(record) = record.as_mut() {
        f(record);
    }
}

/// Decompress a fetched catalog by its file extension.
pub fn decompress(name: &str, bytes: &[u8]) -> Fallible<String> {
    let mut text = String::new();

    if name.ends_with(".bz2") {
        bzip2::read::BzDecoder::new(bytes)
            .read_to_string(&mut text)
            .with_context(|| format!("failed to decompress {}", name))?;
    } else if name.ends_with(".gz") {
        flate2::read::GzDecoder::new(bytes)
            .read_to_string(&mut text)
            .with_context(|| format!("failed to decompress {}", name))?;
    } else {
        return Err(Error::Custom(format!(
            "unsupported summary compression: {}",
            name
        )));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = "\
PKGNAME=foo-1.2nb1
COMMENT=An example \"quoted\" package
DEPENDS=bar>=1.0
DEPENDS=baz-[0-9]*
CONFLICTS=foo-compat-[0-9]*
FILE_SIZE=1048576
SIZE_PKG=4194304
CATEGORIES=devel
PKGPATH=devel/foo
MACHINE_ARCH=x86_64
DESCRIPTION=A longer text
DESCRIPTION=spanning several lines
LICENSE=

PKGNAME=noversion
COMMENT=Published without a version

garbage line without a key

PKGNAME=bar-1.0
COMMENT=Dependency target
REQUIRES=/usr/lib/libc.so
PROVIDES=/usr/pkg/lib/libbar.so
";

    #[test]
    fn parses_groups_and_fields() {
        let parsed = parse_summary(SUMMARY);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.machine_arch.as_deref(), Some("x86_64"));

        let foo = &parsed.records[0];
        assert_eq!(foo.full, "foo-1.2nb1");
        assert_eq!(foo.name, "foo");
        assert_eq!(foo.version, "1.2nb1");
        assert_eq!(foo.comment, "An example `quoted` package");
        assert_eq!(foo.file_size, 1_048_576);
        assert_eq!(foo.size_pkg, 4_194_304);
        assert_eq!(foo.pkgpath, "devel/foo");
        assert_eq!(foo.depends.len(), 2);
        assert_eq!(foo.depends[0].pattern, "bar>=1.0");
        assert_eq!(foo.depends[0].name, "bar");
        assert_eq!(foo.depends[1].name, "baz");
        assert_eq!(foo.conflicts, vec!["foo-compat-[0-9]*".to_owned()]);

        let bar = &parsed.records[1];
        assert_eq!(bar.requires, vec!["/usr/lib/libc.so".to_owned()]);
        assert_eq!(bar.provides, vec!["/usr/pkg/lib/libbar.so".to_owned()]);
    }

    #[test]
    fn versionless_packages_are_normalized() {
        let record = SummaryRecord::from_pkgname("noversion");
        assert_eq!(record.full, "noversion-0.0");
        assert_eq!(record.name, "noversion");
        assert_eq!(record.version, "0.0");
    }

    #[test]
    fn gzip_roundtrip() {
        use flate2::write::GzEncoder;
        use std::io::Write;

        let mut encoder = GzEncoder::new(vec![], flate2::Compression::fast());
        encoder.write_all(SUMMARY.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let text = decompress("pkg_summary.gz", &compressed).unwrap();
        assert_eq!(text, SUMMARY);
        assert!(decompress("pkg_summary.xz", b"x").is_err());
    }
}
