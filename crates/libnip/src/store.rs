//! The catalog store.
//!
//! A single SQLite database holds two package universes, installed and
//! remotely available, each with four relation tables (dependencies,
//! conflicts, requires, provides), plus the repositories table and the
//! installed-database mtime. The store is the only owner of persistent
//! state; operations read and rebuild it but never bypass it.
//!
//! Refreshes are snapshot-atomic: a universe (or one repository's slice of
//! the remote universe) is deleted and re-inserted inside one transaction,
//! so readers observe either the old snapshot or the new one, never a mix.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Context, Fallible};
use crate::summary::SummaryRecord;

/// Bumped when the schema changes incompatibly; a mismatch wipes the
/// database and starts from scratch, the catalog is only a cache.
const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS repos (
    repo_url TEXT PRIMARY KEY,
    repo_mtime INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS pkgdb (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    mtime INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS local_pkg (
    pkg_id INTEGER PRIMARY KEY,
    fullpkgname TEXT NOT NULL UNIQUE,
    pkgname TEXT NOT NULL,
    pkgvers TEXT NOT NULL,
    comment TEXT NOT NULL DEFAULT '',
    file_size INTEGER NOT NULL DEFAULT 0,
    size_pkg INTEGER NOT NULL DEFAULT 0,
    categories TEXT NOT NULL DEFAULT '',
    pkgpath TEXT NOT NULL DEFAULT '',
    pkg_keep INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS remote_pkg (
    pkg_id INTEGER PRIMARY KEY,
    fullpkgname TEXT NOT NULL UNIQUE,
    pkgname TEXT NOT NULL,
    pkgvers TEXT NOT NULL,
    comment TEXT NOT NULL DEFAULT '',
    file_size INTEGER NOT NULL DEFAULT 0,
    size_pkg INTEGER NOT NULL DEFAULT 0,
    categories TEXT NOT NULL DEFAULT '',
    pkgpath TEXT NOT NULL DEFAULT '',
    repository TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS local_deps (
    pkg_id INTEGER NOT NULL,
    pkgname TEXT NOT NULL,
    pattern TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS remote_deps (
    pkg_id INTEGER NOT NULL,
    pkgname TEXT NOT NULL,
    pattern TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS local_conflicts (pkg_id INTEGER NOT NULL, value TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS remote_conflicts (pkg_id INTEGER NOT NULL, value TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS local_requires (pkg_id INTEGER NOT NULL, value TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS remote_requires (pkg_id INTEGER NOT NULL, value TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS local_provides (pkg_id INTEGER NOT NULL, value TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS remote_provides (pkg_id INTEGER NOT NULL, value TEXT NOT NULL);
CREATE INDEX IF NOT EXISTS idx_local_pkg_name ON local_pkg (pkgname);
CREATE INDEX IF NOT EXISTS idx_remote_pkg_name ON remote_pkg (pkgname);
CREATE INDEX IF NOT EXISTS idx_remote_pkg_repo ON remote_pkg (repository);
CREATE INDEX IF NOT EXISTS idx_local_deps_name ON local_deps (pkgname);
CREATE INDEX IF NOT EXISTS idx_remote_deps_name ON remote_deps (pkgname);
CREATE INDEX IF NOT EXISTS idx_local_deps_id ON local_deps (pkg_id);
CREATE INDEX IF NOT EXISTS idx_remote_deps_id ON remote_deps (pkg_id);
";

const DROP: &str = "\
DROP TABLE IF EXISTS repos;
DROP TABLE IF EXISTS pkgdb;
DROP TABLE IF EXISTS local_pkg;
DROP TABLE IF EXISTS remote_pkg;
DROP TABLE IF EXISTS local_deps;
DROP TABLE IF EXISTS remote_deps;
DROP TABLE IF EXISTS local_conflicts;
DROP TABLE IF EXISTS remote_conflicts;
DROP TABLE IF EXISTS local_requires;
DROP TABLE IF EXISTS remote_requires;
DROP TABLE IF EXISTS local_provides;
DROP TABLE IF EXISTS remote_provides;
";

/// One of the two package universes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Universe {
    Local,
    Remote,
}

impl Universe {
    fn prefix(self) -> &'static str {
        match self {
            Universe::Local => "local",
            Universe::Remote => "remote",
        }
    }
}

/// A package row from either universe.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PkgRecord {
    pub full: String,
    pub name: String,
    pub version: String,
    pub comment: String,
    pub file_size: i64,
    pub size_pkg: i64,
    pub categories: String,
    pub pkgpath: String,
    /// Installed universe only: marked non-autoremovable.
    pub keep: bool,
    /// Remote universe only: origin repository URL.
    pub repository: Option<String>,
}

/// A forward dependency edge: the matching pattern and the normalized stem
/// it refers to. The pattern governs matching, the stem governs indexing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Depend {
    pub pattern: String,
    pub name: String,
}

/// A reverse dependency: an installed package depending on the queried stem.
#[derive(Clone, Debug)]
pub struct ReverseDepend {
    pub full: String,
    pub name: String,
    pub keep: bool,
}

/// Aggregate catalog counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct CatalogStats {
    pub local_count: i64,
    pub local_size: i64,
    pub remote_count: i64,
    pub remote_size: i64,
}

pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    /// Open (and create if needed) the catalog database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Fallible<CatalogStore> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("failed to open catalog {}", path.as_ref().display()))?;
        Self::init(conn)
    }

    /// Open an in-memory catalog, mainly for tests.
    pub fn open_in_memory() -> Fallible<CatalogStore> {
        let conn = Connection::open_in_memory()
            .with_context(|| "failed to open in-memory catalog".to_owned())?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Fallible<CatalogStore> {
        let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version != SCHEMA_VERSION {
            if version != 0 {
                info!(version, "incompatible catalog schema, resetting");
                conn.execute_batch(DROP)?;
            }
            conn.execute_batch(SCHEMA)?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        } else {
            conn.execute_batch(SCHEMA)?;
        }

        Ok(CatalogStore { conn })
    }

    /// All packages of a universe, ordered by full name ascending.
    pub fn pkgs(&self, universe: Universe) -> Fallible<Vec<PkgRecord>> {
        let sql = match universe {
            Universe::Local => {
                "SELECT fullpkgname, pkgname, pkgvers, comment, file_size, size_pkg, \
                 categories, pkgpath, pkg_keep, NULL \
                 FROM local_pkg ORDER BY fullpkgname ASC"
            }
            Universe::Remote => {
                "SELECT fullpkgname, pkgname, pkgvers, comment, file_size, size_pkg, \
                 categories, pkgpath, 0, repository \
                 FROM remote_pkg ORDER BY fullpkgname ASC"
            }
        };

        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(PkgRecord {
                full: row.get(0)?,
                name: row.get(1)?,
                version: row.get(2)?,
                comment: row.get(3)?,
                file_size: row.get(4)?,
                size_pkg: row.get(5)?,
                categories: row.get(6)?,
                pkgpath: row.get(7)?,
                keep: row.get::<_, Option<i64>>(8)?.unwrap_or(0) != 0,
                repository: row.get(9)?,
            })
        })?;

        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    /// Direct dependencies of the highest version of `name` in a universe.
    pub fn direct_deps(&self, universe: Universe, name: &str) -> Fallible<Vec<Depend>> {
        let p = universe.prefix();
        let sql = format!(
            "SELECT pattern, pkgname FROM {p}_deps WHERE pkg_id = \
             (SELECT pkg_id FROM {p}_pkg WHERE pkgname = ?1 \
              ORDER BY fullpkgname DESC LIMIT 1)"
        );
        self.depend_query(&sql, name)
    }

    /// Direct dependencies of an exact remote full name.
    pub fn exact_direct_deps(&self, full: &str) -> Fallible<Vec<Depend>> {
        let sql = "SELECT d.pattern, d.pkgname FROM remote_deps d, remote_pkg p \
                   WHERE p.fullpkgname = ?1 AND d.pkg_id = p.pkg_id";
        self.depend_query(sql, full)
    }

    fn depend_query(&self, sql: &str, param: &str) -> Fallible<Vec<Depend>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![param], |row| {
            Ok(Depend {
                pattern: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    /// Installed packages whose recorded dependency stem is `name`.
    pub fn local_reverse_deps(&self, name: &str) -> Fallible<Vec<ReverseDepend>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.fullpkgname, p.pkgname, p.pkg_keep \
             FROM local_pkg p, local_deps d \
             WHERE d.pkgname = ?1 AND p.pkg_id = d.pkg_id",
        )?;
        let rows = stmt.query_map(params![name], |row| {
            Ok(ReverseDepend {
                full: row.get(0)?,
                name: row.get(1)?,
                keep: row.get::<_, i64>(2)? != 0,
            })
        })?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    /// Every CONFLICTS pattern declared by installed packages.
    pub fn local_conflict_patterns(&self) -> Fallible<Vec<String>> {
        self.string_query("SELECT DISTINCT value FROM local_conflicts", &[])
    }

    /// The installed package declaring the given CONFLICTS pattern.
    pub fn conflicting_installed(&self, pattern: &str) -> Fallible<Option<String>> {
        self.conn
            .query_row(
                "SELECT p.fullpkgname FROM local_conflicts c, local_pkg p \
                 WHERE c.value = ?1 AND p.pkg_id = c.pkg_id LIMIT 1",
                params![pattern],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// REQUIRES entries of a remote package.
    pub fn requires_of(&self, full: &str) -> Fallible<Vec<String>> {
        self.string_query(
            "SELECT r.value FROM remote_requires r, remote_pkg p \
             WHERE p.fullpkgname = ?1 AND r.pkg_id = p.pkg_id",
            &[full],
        )
    }

    /// PROVIDES entries of a remote package.
    pub fn provides_of(&self, full: &str) -> Fallible<Vec<String>> {
        self.string_query(
            "SELECT r.value FROM remote_provides r, remote_pkg p \
             WHERE p.fullpkgname = ?1 AND r.pkg_id = p.pkg_id",
            &[full],
        )
    }

    /// Everything the installed universe provides.
    pub fn local_provides(&self) -> Fallible<Vec<String>> {
        self.string_query("SELECT value FROM local_provides", &[])
    }

    /// Origin repository URL of a remote package.
    pub fn repository_of(&self, full: &str) -> Fallible<Option<String>> {
        self.conn
            .query_row(
                "SELECT repository FROM remote_pkg WHERE fullpkgname = ?1",
                params![full],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// All packages of a universe sharing a stem.
    pub fn unique_by_stem(&self, universe: Universe, stem: &str) -> Fallible<Vec<PkgRecord>> {
        let sql = format!(
            "SELECT fullpkgname, pkgvers FROM {}_pkg WHERE pkgname = ?1",
            universe.prefix()
        );
        self.slim_pkg_query(&sql, stem)
    }

    /// All packages of a universe whose full name starts with `prefix`.
    pub fn unique_by_prefix(&self, universe: Universe, prefix: &str) -> Fallible<Vec<PkgRecord>> {
        let sql = format!(
            "SELECT fullpkgname, pkgvers FROM {}_pkg WHERE fullpkgname GLOB ?1 || '*'",
            universe.prefix()
        );
        self.slim_pkg_query(&sql, prefix)
    }

    fn slim_pkg_query(&self, sql: &str, param: &str) -> Fallible<Vec<PkgRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![param], |row| {
            Ok(PkgRecord {
                full: row.get(0)?,
                version: row.get(1)?,
                ..PkgRecord::default()
            })
        })?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    fn string_query(&self, sql: &str, params: &[&str]) -> Fallible<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| row.get(0))?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    // keep flag

    /// Flag a stem as keep (non-autoremovable) or unkeep.
    pub fn set_keep(&self, name: &str, keep: bool) -> Fallible<bool> {
        let changed = self.conn.execute(
            "UPDATE local_pkg SET pkg_keep = ?2 WHERE pkgname = ?1",
            params![name, keep as i64],
        )?;
        Ok(changed > 0)
    }

    pub fn keep_list(&self) -> Fallible<Vec<PkgRecord>> {
        self.keep_query(true)
    }

    pub fn nokeep_list(&self) -> Fallible<Vec<PkgRecord>> {
        self.keep_query(false)
    }

    fn keep_query(&self, keep: bool) -> Fallible<Vec<PkgRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT fullpkgname, pkgname, pkgpath FROM local_pkg \
             WHERE pkg_keep = ?1 ORDER BY fullpkgname ASC",
        )?;
        let rows = stmt.query_map(params![keep as i64], |row| {
            Ok(PkgRecord {
                full: row.get(0)?,
                name: row.get(1)?,
                pkgpath: row.get(2)?,
                keep,
                ..PkgRecord::default()
            })
        })?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    /// Installed packages with `keep = false` that no installed package
    /// depends on.
    pub fn orphans(&self) -> Fallible<Vec<PkgRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT fullpkgname, pkgname FROM local_pkg \
             WHERE pkg_keep = 0 \
             AND pkgname NOT IN (SELECT pkgname FROM local_deps) \
             ORDER BY fullpkgname ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PkgRecord {
                full: row.get(0)?,
                name: row.get(1)?,
                ..PkgRecord::default()
            })
        })?;
        rows.collect::<Result<_, _>>().map_err(Into::into)
    }

    /// PKGPATHs of the keep set, for `export`.
    pub fn export_keep_list(&self) -> Fallible<Vec<String>> {
        self.string_query(
            "SELECT pkgpath FROM local_pkg WHERE pkg_keep = 1 AND pkgpath != '' \
             ORDER BY pkg_id DESC",
            &[],
        )
    }

    /// Resolve a PKGPATH to a remote stem, for `import`.
    pub fn pkgname_by_pkgpath(&self, pkgpath: &str) -> Fallible<Option<String>> {
        self.conn
            .query_row(
                "SELECT pkgname FROM remote_pkg WHERE pkgpath = ?1 LIMIT 1",
                params![pkgpath],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    // repositories

    /// Make sure every configured repository has a row.
    pub fn record_repositories(&self, urls: &[String]) -> Fallible<()> {
        for url in urls {
            self.conn.execute(
                "INSERT OR IGNORE INTO repos (repo_url, repo_mtime) VALUES (?1, 0)",
                params![url],
            )?;
        }
        Ok(())
    }

    pub fn stored_repositories(&self) -> Fallible<Vec<String>> {
        self.string_query("SELECT repo_url FROM repos ORDER BY repo_url", &[])
    }

    pub fn repo_mtime(&self, url: &str) -> Fallible<i64> {
        Ok(self
            .conn
            .query_row(
                "SELECT repo_mtime FROM repos WHERE repo_url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0))
    }

    pub fn set_repo_mtime(&self, url: &str, mtime: i64) -> Fallible<()> {
        self.conn.execute(
            "UPDATE repos SET repo_mtime = ?2 WHERE repo_url = ?1",
            params![url, mtime],
        )?;
        Ok(())
    }

    /// Remove a repository and cascade away its package and relation rows.
    pub fn retire_repository(&mut self, url: &str) -> Fallible<()> {
        let tx = self.conn.transaction()?;
        Self::cascade_remote_rows(&tx, url)?;
        tx.execute("DELETE FROM repos WHERE repo_url = ?1", params![url])?;
        tx.commit()?;
        debug!(url, "repository retired");
        Ok(())
    }

    fn cascade_remote_rows(tx: &rusqlite::Transaction, url: &str) -> Fallible<()> {
        for table in [
            "remote_deps",
            "remote_conflicts",
            "remote_requires",
            "remote_provides",
        ] {
            tx.execute(
                &format!(
                    "DELETE FROM {table} WHERE pkg_id IN \
                     (SELECT pkg_id FROM remote_pkg WHERE repository = ?1)"
                ),
                params![url],
            )?;
        }
        tx.execute(
            "DELETE FROM remote_pkg WHERE repository = ?1",
            params![url],
        )?;
        Ok(())
    }

    // pkgdb mtime

    pub fn pkgdb_mtime(&self) -> Fallible<i64> {
        Ok(self
            .conn
            .query_row("SELECT mtime FROM pkgdb WHERE id = 1", [], |row| row.get(0))
            .optional()?
            .unwrap_or(0))
    }

    pub fn set_pkgdb_mtime(&self, mtime: i64) -> Fallible<()> {
        self.conn.execute(
            "INSERT INTO pkgdb (id, mtime) VALUES (1, ?1) \
             ON CONFLICT (id) DO UPDATE SET mtime = ?1",
            params![mtime],
        )?;
        Ok(())
    }

    // batch imports

    /// Replace the whole installed universe with `records` in one
    /// transaction. Keep flags are reset and must be restored by the caller
    /// afterwards.
    pub fn replace_local(&mut self, records: &[SummaryRecord]) -> Fallible<()> {
        let tx = self.conn.transaction()?;
        for table in [
            "local_deps",
            "local_conflicts",
            "local_requires",
            "local_provides",
            "local_pkg",
        ] {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        for record in records {
            Self::insert_record(&tx, Universe::Local, record, None)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Replace one repository's slice of the remote universe with `records`
    /// in one transaction.
    pub fn replace_repository(&mut self, url: &str, records: &[SummaryRecord]) -> Fallible<()> {
        let tx = self.conn.transaction()?;
        Self::cascade_remote_rows(&tx, url)?;
        for record in records {
            Self::insert_record(&tx, Universe::Remote, record, Some(url))?;
        }
        tx.commit()?;
        Ok(())
    }

    fn insert_record(
        tx: &rusqlite::Transaction,
        universe: Universe,
        record: &SummaryRecord,
        repository: Option<&str>,
    ) -> Fallible<()> {
        let p = universe.prefix();

        let inserted = match universe {
            Universe::Local => tx.execute(
                "INSERT OR IGNORE INTO local_pkg \
                 (fullpkgname, pkgname, pkgvers, comment, file_size, size_pkg, \
                  categories, pkgpath, pkg_keep) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
                params![
                    record.full,
                    record.name,
                    record.version,
                    record.comment,
                    record.file_size,
                    record.size_pkg,
                    record.categories,
                    record.pkgpath,
                ],
            )?,
            Universe::Remote => tx.execute(
                "INSERT OR IGNORE INTO remote_pkg \
                 (fullpkgname, pkgname, pkgvers, comment, file_size, size_pkg, \
                  categories, pkgpath, repository) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.full,
                    record.name,
                    record.version,
                    record.comment,
                    record.file_size,
                    record.size_pkg,
                    record.categories,
                    record.pkgpath,
                    repository.unwrap_or_default(),
                ],
            )?,
        };

        // a duplicate full name within the universe keeps the first row and
        // must not attach this record's relations to it
        if inserted == 0 {
            debug!(full = %record.full, "duplicate package row skipped");
            return Ok(());
        }

        let pkg_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO {p}_deps (pkg_id, pkgname, pattern) VALUES (?1, ?2, ?3)"
            ))?;
            for dep in &record.depends {
                stmt.execute(params![pkg_id, dep.name, dep.pattern])?;
            }
        }

        for (table, values) in [
            ("conflicts", &record.conflicts),
            ("requires", &record.requires),
            ("provides", &record.provides),
        ] {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO {p}_{table} (pkg_id, value) VALUES (?1, ?2)"
            ))?;
            for value in values {
                stmt.execute(params![pkg_id, value])?;
            }
        }

        Ok(())
    }

    /// Package counts and cumulated sizes for both universes.
    pub fn stats(&self) -> Fallible<CatalogStats> {
        let (local_count, local_size) = self.conn.query_row(
            "SELECT COUNT(pkg_id), COALESCE(SUM(size_pkg), 0) FROM local_pkg",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let (remote_count, remote_size) = self.conn.query_row(
            "SELECT COUNT(pkg_id), COALESCE(SUM(file_size), 0) FROM remote_pkg",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(CatalogStats {
            local_count,
            local_size,
            remote_count,
            remote_size,
        })
    }

    /// Count of relation rows whose package row is gone; used by tests to
    /// assert the cascade invariant.
    #[cfg(test)]
    fn dangling_remote_relations(&self) -> Fallible<i64> {
        let mut total = 0;
        for table in [
            "remote_deps",
            "remote_conflicts",
            "remote_requires",
            "remote_provides",
        ] {
            let count: i64 = self.conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {table} \
                     WHERE pkg_id NOT IN (SELECT pkg_id FROM remote_pkg)"
                ),
                [],
                |row| row.get(0),
            )?;
            total += count;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::SummaryRecord;

    fn record(full: &str, deps: &[&str]) -> SummaryRecord {
        let mut rec = SummaryRecord::from_pkgname(full);
        for dep in deps {
            rec.push_depend(dep);
        }
        rec
    }

    fn store_with_repo(url: &str, fulls: &[(&str, &[&str])]) -> CatalogStore {
        let mut store = CatalogStore::open_in_memory().unwrap();
        let records: Vec<_> = fulls.iter().map(|(f, d)| record(f, d)).collect();
        store.record_repositories(&[url.to_owned()]).unwrap();
        store.replace_repository(url, &records).unwrap();
        store
    }

    #[test]
    fn repository_cascade_leaves_no_dangling_relations() {
        let url = "http://repo.example/All";
        let mut store = store_with_repo(
            url,
            &[
                ("foo-1.0", &[][..]),
                ("bar-1.0", &["foo>=1.0"][..]),
                ("baz-2.0", &["foo>=1.0", "bar>=1.0"][..]),
            ],
        );

        assert_eq!(store.pkgs(Universe::Remote).unwrap().len(), 3);
        store.retire_repository(url).unwrap();
        assert!(store.pkgs(Universe::Remote).unwrap().is_empty());
        assert_eq!(store.dangling_remote_relations().unwrap(), 0);
        assert!(store.stored_repositories().unwrap().is_empty());
    }

    #[test]
    fn refresh_replaces_the_snapshot() {
        let url = "http://repo.example/All";
        let mut store = store_with_repo(url, &[("foo-1.0", &[][..])]);

        let next = vec![record("foo-2.0", &["zlib>=1.0"])];
        store.replace_repository(url, &next).unwrap();

        let pkgs = store.pkgs(Universe::Remote).unwrap();
        assert_eq!(pkgs.len(), 1);
        assert_eq!(pkgs[0].full, "foo-2.0");
        assert_eq!(store.dangling_remote_relations().unwrap(), 0);

        let deps = store.direct_deps(Universe::Remote, "foo").unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].pattern, "zlib>=1.0");
        assert_eq!(deps[0].name, "zlib");
    }

    #[test]
    fn duplicate_full_names_keep_the_first_row() {
        let url = "http://repo.example/All";
        let store = store_with_repo(url, &[("foo-1.0", &[][..]), ("foo-1.0", &["x>=1"][..])]);
        assert_eq!(store.pkgs(Universe::Remote).unwrap().len(), 1);
        assert_eq!(store.dangling_remote_relations().unwrap(), 0);
    }

    #[test]
    fn keep_flags_and_orphans() {
        let mut store = CatalogStore::open_in_memory().unwrap();
        let records = vec![
            record("foo-1.0", &["liba>=1.0"]),
            record("liba-1.0", &[]),
            record("libb-1.0", &[]),
        ];
        store.replace_local(&records).unwrap();

        assert!(store.set_keep("foo", true).unwrap());
        assert!(!store.set_keep("ghost", true).unwrap());

        let keeps = store.keep_list().unwrap();
        assert_eq!(keeps.len(), 1);
        assert_eq!(keeps[0].full, "foo-1.0");

        // libb is an orphan: not kept, nothing depends on it. liba is
        // depended upon by foo, foo itself is kept.
        let orphans = store.orphans().unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].full, "libb-1.0");
    }

    #[test]
    fn stem_and_prefix_lookups() {
        let url = "http://repo.example/All";
        let store = store_with_repo(
            url,
            &[
                ("apache-2.2.1", &[][..]),
                ("apache-2.4.0", &[][..]),
                ("apache-tools-2.4", &[][..]),
            ],
        );

        let by_stem = store.unique_by_stem(Universe::Remote, "apache").unwrap();
        assert_eq!(by_stem.len(), 2);
        assert!(by_stem.iter().all(|p| p.full.starts_with("apache-2.")));

        let by_prefix = store
            .unique_by_prefix(Universe::Remote, "apache-2.4")
            .unwrap();
        assert_eq!(by_prefix.len(), 1);
        assert_eq!(by_prefix[0].full, "apache-2.4.0");

        assert_eq!(
            store.repository_of("apache-2.4.0").unwrap().as_deref(),
            Some(url)
        );
        assert_eq!(store.repository_of("ghost-1.0").unwrap(), None);
    }

    #[test]
    fn repo_mtime_roundtrip() {
        let store = CatalogStore::open_in_memory().unwrap();
        let url = "http://repo.example/All".to_owned();
        store.record_repositories(&[url.clone()]).unwrap();
        assert_eq!(store.repo_mtime(&url).unwrap(), 0);
        store.set_repo_mtime(&url, 1_700_000_000).unwrap();
        assert_eq!(store.repo_mtime(&url).unwrap(), 1_700_000_000);

        assert_eq!(store.pkgdb_mtime().unwrap(), 0);
        store.set_pkgdb_mtime(42).unwrap();
        store.set_pkgdb_mtime(43).unwrap();
        assert_eq!(store.pkgdb_mtime().unwrap(), 43);
    }

    #[test]
    fn reverse_deps_and_conflicts() {
        let mut store = CatalogStore::open_in_memory().unwrap();
        let mut apache = record("apache-2.4", &[]);
        apache.conflicts.push("httpd-[0-9]*".to_owned());
        let records = vec![apache, record("mod-php-8.0", &["apache>=2.0"])];
        store.replace_local(&records).unwrap();

        let rdeps = store.local_reverse_deps("apache").unwrap();
        assert_eq!(rdeps.len(), 1);
        assert_eq!(rdeps[0].full, "mod-php-8.0");

        assert_eq!(
            store.local_conflict_patterns().unwrap(),
            vec!["httpd-[0-9]*".to_owned()]
        );
        assert_eq!(
            store.conflicting_installed("httpd-[0-9]*").unwrap(),
            Some("apache-2.4".to_owned())
        );
        assert_eq!(store.conflicting_installed("nothing-*").unwrap(), None);
    }
}
