//! Operations that can be performed on a nip session.
//!
//! This module is the public surface of the planner. Each function maps to
//! one CLI verb, takes a [`Session`] as its first argument, and reports
//! progress and prompt points through the session's event bus, keeping the
//! core headless.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::machine_arch;
use crate::depends::{full_dep_tree, DepDirection};
use crate::download::{self, SummaryFetch};
use crate::error::{Error, Fallible};
use crate::event::Event;
use crate::impact::{self, check_conflicts, check_requisites, pkg_impact};
use crate::installer::{delete_package, Executor, PkgInstall};
use crate::order::{order_install, order_remove, upgrade_remove_candidates, RemoveCandidate};
use crate::pattern::{is_glob, pkg_match, split_fullname};
use crate::session::Session;
use crate::store::{CatalogStats, CatalogStore, PkgRecord, Universe};
use crate::summary::{decompress, parse_summary};
use crate::{fsops, preferred::Preferred};

/// The computed transaction, shown to the user before anything runs.
#[derive(Clone, Debug, Default)]
pub struct TransactionSummary {
    /// Full names to install fresh.
    pub install: Vec<String>,
    /// New full names replacing an older installed version.
    pub upgrade: Vec<String>,
    /// Installed full names to delete, collateral removals included.
    pub remove: Vec<String>,
    /// Bytes left to download, cache reuse deducted.
    pub download_bytes: u64,
    /// Installed footprint delta of the added packages.
    pub install_bytes: i64,
}

impl TransactionSummary {
    pub fn is_empty(&self) -> bool {
        self.install.is_empty() && self.upgrade.is_empty() && self.remove.is_empty()
    }
}

/// A line of `list`, `avail` or `search` output.
#[derive(Clone, Debug)]
pub struct ListEntry {
    pub full: String,
    pub comment: String,
    /// `=` installed at the same version, `<` installed older (upgradable),
    /// `>` installed newer than the candidate.
    pub status: Option<char>,
}

/// Open the catalog store, creating the working directories on first use.
fn open_store(session: &Session) -> Fallible<CatalogStore> {
    let config = session.config();
    fsops::create_dirs(&config)?;
    CatalogStore::open(config.db_path())
}

fn remote_universe(store: &CatalogStore) -> Fallible<Vec<PkgRecord>> {
    let pkgs = store.pkgs(Universe::Remote)?;
    if pkgs.is_empty() {
        return Err(Error::EmptyRemoteCatalog);
    }
    Ok(pkgs)
}

/// Rebuild the installed universe when the toolchain is reachable. Failing
/// to do so keeps a stale snapshot, which every operation tolerates.
fn sync_local(session: &Session, store: &mut CatalogStore) {
    match PkgInstall::locate() {
        Ok(tools) => {
            if let Err(err) = update_local(session, store, &tools, None) {
                warn!(%err, "local summary rebuild failed, catalog may be stale");
            }
        }
        Err(err) => debug!(%err, "installer toolchain not found, skipping local sync"),
    }
}

/// Rebuild the installed universe from the installer's info tool.
///
/// Skipped when the installed-package database directory has not changed
/// since the last rebuild. Keep flags survive the rebuild; when the catalog
/// held none (fresh database), they are recovered from the toolchain's
/// automatic-installed flags. `keep_roots`, when given, are the packages
/// this transaction installed deliberately: they are flagged keep, and
/// every other unkept package is marked automatic.
fn update_local(
    session: &Session,
    store: &mut CatalogStore,
    tools: &PkgInstall,
    keep_roots: Option<&[String]>,
) -> Fallible<()> {
    let force = session.config().flags.force_update;
    let mtime = tools.db_mtime();
    if !force && mtime != 0 && mtime == store.pkgdb_mtime()? && keep_roots.is_none() {
        debug!("installed database unchanged, skipping local rebuild");
        return Ok(());
    }

    session.emit(Event::LocalSyncStarted);

    let text = tools.local_summary()?;
    let parsed = parse_summary(&text);
    let count = parsed.records.len();

    // keep flags do not survive the delete-and-insert, snapshot them
    let kept: Vec<String> = store.keep_list()?.into_iter().map(|p| p.name).collect();

    store.replace_local(&parsed.records)?;

    if kept.is_empty() {
        // fresh or rebuilt database: recover keep flags from the
        // toolchain's automatic-installed flags
        for pkg in store.pkgs(Universe::Local)? {
            if !tools.is_automatic(&pkg.full) {
                store.set_keep(&pkg.name, true)?;
            }
        }
    } else {
        for name in &kept {
            store.set_keep(name, true)?;
        }
        // packages go into the installed database as non-automatic; those
        // we pulled in as dependencies must be flagged automatic again
        for pkg in store.nokeep_list()? {
            if keep_roots.is_none() && !tools.is_automatic(&pkg.full) {
                store.set_keep(&pkg.name, true)?;
            } else {
                tools.mark_automatic(&pkg.full, true)?;
            }
        }
    }

    if let Some(roots) = keep_roots {
        for root in roots {
            let (name, _) = split_fullname(root);
            store.set_keep(name, true)?;
            tools.mark_automatic(root, false)?;
        }
    }

    store.set_pkgdb_mtime(mtime)?;
    session.emit(Event::LocalSyncFinished(count));
    Ok(())
}

/// Refresh the local and remote halves of the catalog.
pub fn update(session: &Session) -> Fallible<()> {
    let tools = PkgInstall::locate()?;
    let mut store = open_store(session)?;

    update_local(session, &mut store, &tools, None)?;
    update_remote(session, &mut store)
}

/// Refresh every configured repository that reports a newer summary.
fn update_remote(session: &Session, store: &mut CatalogStore) -> Fallible<()> {
    let config = session.config();
    let repositories = config.repositories().to_vec();
    let force = config.flags.force_update;
    if repositories.is_empty() {
        return Err(Error::MissingRepositories(
            config.conf_dir().join(crate::config::REPOS_FILE),
        ));
    }
    drop(config);

    store.record_repositories(&repositories)?;

    let mut arch_checked = false;
    let mut cleaned = false;
    let mut fetched_any = false;

    for url in &repositories {
        session.emit(Event::RepoSyncStarted(url.clone()));
        let since = store.repo_mtime(url)?;

        let fetch = {
            let config = session.config();
            download::fetch_summary(&config, url, since, force)
        };

        match fetch {
            Err(err) => {
                // the previous snapshot stays in place
                session.emit(Event::RepoSyncFailed {
                    url: url.clone(),
                    error: err.to_string(),
                });
            }
            Ok(SummaryFetch::UpToDate) => {
                fetched_any = true;
                session.emit(Event::RepoSyncUpToDate(url.clone()));
            }
            Ok(SummaryFetch::Fetched { name, bytes, mtime }) => {
                fetched_any = true;

                // only drop stale repositories once a live one answered
                if !cleaned {
                    retire_stale_repositories(session, store, &repositories)?;
                    cleaned = true;
                }

                let text = decompress(&name, &bytes)?;
                let parsed = parse_summary(&text);

                if let Some(found) = parsed.machine_arch.as_deref() {
                    if !arch_checked && found != machine_arch() {
                        let proceed = session.confirm(
                            Event::PromptArchMismatch {
                                found: found.to_owned(),
                                expected: machine_arch().to_owned(),
                            },
                            false,
                        );
                        if !proceed {
                            return Err(Error::Aborted);
                        }
                        arch_checked = true;
                    }
                }

                store.replace_repository(url, &parsed.records)?;
                store.set_repo_mtime(url, mtime)?;
                session.emit(Event::RepoSyncImported {
                    url: url.clone(),
                    packages: parsed.records.len(),
                });
            }
        }
    }

    if !fetched_any {
        warn!("no repository could be refreshed, running on the stale catalog");
    }
    Ok(())
}

fn retire_stale_repositories(
    session: &Session,
    store: &mut CatalogStore,
    configured: &[String],
) -> Fallible<()> {
    for url in store.stored_repositories()? {
        if !configured.contains(&url) {
            session.emit(Event::RepoRetired(url.clone()));
            store.retire_repository(&url)?;
        }
    }
    Ok(())
}

/// Resolve command-line arguments: glob arguments become concrete full
/// names, the rest pass through for the resolver to handle.
fn resolve_args(
    session: &Session,
    remote: &[PkgRecord],
    preferred: &Preferred,
    args: &[String],
) -> Vec<String> {
    let mut roots = vec![];
    for arg in args {
        if !is_glob(arg) {
            roots.push(arg.clone());
            continue;
        }
        match impact::unique_pkg(remote, preferred, arg) {
            Some(pkg) => roots.push(pkg.full.clone()),
            None => session.emit(Event::PackageNotAvailable(arg.clone())),
        }
    }
    roots
}

/// Install packages and their dependencies.
pub fn install(session: &Session, args: &[String]) -> Fallible<()> {
    let mut store = open_store(session)?;
    sync_local(session, &mut store);

    let remote = remote_universe(&store)?;
    let preferred = session.config().preferred().clone();
    let roots = resolve_args(session, &remote, &preferred, args);
    if roots.is_empty() {
        return Err(Error::PackageNotAvailable(args.join(" ")));
    }

    install_impl(session, &mut store, &roots, &roots)
}

/// Shared install/upgrade pipeline: impact, checks, ordering, sizing,
/// confirmation, fetch, execute, local rebuild.
fn install_impl(
    session: &Session,
    store: &mut CatalogStore,
    roots: &[String],
    keep_roots: &[String],
) -> Fallible<()> {
    let local = store.pkgs(Universe::Local)?;
    let remote = remote_universe(store)?;

    let impact = pkg_impact(session, store, &local, &remote, roots)?;
    if impact.is_empty() {
        session.emit(Event::NothingToDo);
        return Ok(());
    }

    check_requisites(session, store, &impact)?;
    check_conflicts(session, store, &impact)?;

    let mut install_steps = order_install(&impact);
    let remove_candidates = upgrade_remove_candidates(&impact);
    let remove_steps = if remove_candidates.is_empty() {
        vec![]
    } else {
        order_remove(store, &remove_candidates)?
    };

    let (cache_dir, prefix, download_only) = {
        let config = session.config();
        (
            config.cache_dir(),
            config.prefix().to_owned(),
            config.flags.download_only,
        )
    };

    // no side effect happens unless both filesystems have room
    let download_bytes = download::download_size(&install_steps, &cache_dir);
    let install_bytes: i64 = impact
        .iter()
        .filter(|e| !e.is_remove())
        .map(|e| e.size_pkg)
        .sum();
    fsops::ensure_room(&cache_dir, download_bytes)?;
    fsops::ensure_room(&prefix, install_bytes.max(0) as u64)?;

    let summary = TransactionSummary {
        install: impact
            .iter()
            .filter(|e| e.is_install())
            .map(|e| e.full.clone())
            .collect(),
        upgrade: impact
            .iter()
            .filter(|e| e.is_upgrade())
            .map(|e| e.full.clone())
            .collect(),
        remove: remove_steps.iter().map(|s| s.full.clone()).collect(),
        download_bytes,
        install_bytes,
    };
    if !session.confirm(Event::PromptTransaction(summary), true) {
        return Err(Error::Aborted);
    }

    session.emit(Event::DownloadStarted {
        files: install_steps.len(),
        bytes: download_bytes,
    });
    download::fetch_archives(session, store, &mut install_steps, &cache_dir)?;

    if download_only {
        return Ok(());
    }

    let tools = PkgInstall::locate()?;
    let executor = Executor::new(session, &tools);

    // deletions precede any addition within an upgrade window
    let remove_failures = executor.remove_packages(&remove_steps);
    if remove_failures > 0 {
        warn!(remove_failures, "some deletions failed, continuing the plan");
    }
    let install_failures = executor.install_packages(&install_steps, &cache_dir);

    // the catalog must reflect reality even after a partial failure
    update_local(session, store, &tools, Some(keep_roots))?;

    if install_failures > 0 {
        Err(Error::InstallFailures(install_failures))
    } else {
        Ok(())
    }
}

/// Remove packages and everything that depends on them.
pub fn remove(session: &Session, args: &[String]) -> Fallible<()> {
    let mut store = open_store(session)?;
    sync_local(session, &mut store);

    let local = store.pkgs(Universe::Local)?;
    if local.is_empty() {
        return Err(Error::EmptyLocalCatalog);
    }

    let mut candidates: Vec<RemoveCandidate> = vec![];
    let mut seen: HashSet<String> = HashSet::new();

    for arg in args {
        let root = match impact::find_exact_pkg(&local, arg) {
            Some(pkg) => pkg,
            None => {
                session.emit(Event::PackageNotInstalled(arg.clone()));
                continue;
            }
        };

        // the reverse closure comes out levelled, but removal levels are
        // recomputed during ordering anyway
        for node in full_dep_tree(&store, &local, &root.name, DepDirection::LocalReverse)? {
            if seen.insert(node.name.clone()) {
                candidates.push(RemoveCandidate {
                    full: node.pattern.clone(),
                    name: node.name.clone(),
                    upgrade: false,
                });
            }
        }

        if seen.insert(root.name.clone()) {
            candidates.push(RemoveCandidate {
                full: root.full.clone(),
                name: root.name.clone(),
                upgrade: false,
            });
        }
    }

    if candidates.is_empty() {
        session.emit(Event::NothingToDo);
        return Ok(());
    }

    let steps = order_remove(&store, &candidates)?;

    let summary = TransactionSummary {
        remove: steps.iter().map(|s| s.full.clone()).collect(),
        ..TransactionSummary::default()
    };
    if !session.confirm(Event::PromptTransaction(summary), true) {
        return Err(Error::Aborted);
    }

    let tools = PkgInstall::locate()?;
    let executor = Executor::new(session, &tools);

    // a failed deletion is logged but does not fail the transaction
    let failures = executor.remove_packages(&steps);
    if failures > 0 {
        warn!(failures, "some deletions failed");
    }

    update_local(session, &mut store, &tools, None)
}

/// Upgrade the keep set, or everything installed with `full_upgrade`.
pub fn upgrade(session: &Session, full_upgrade: bool) -> Fallible<()> {
    let mut store = open_store(session)?;
    sync_local(session, &mut store);

    let local = store.pkgs(Universe::Local)?;
    if local.is_empty() {
        return Err(Error::EmptyLocalCatalog);
    }

    let keeps = store.keep_list()?;
    if keeps.is_empty() {
        return Err(Error::Custom(
            "empty keep list, mark the packages you installed deliberately first".to_owned(),
        ));
    }

    let remote = remote_universe(&store)?;

    let base: Vec<&PkgRecord> = if full_upgrade {
        local.iter().collect()
    } else {
        let kept: HashSet<&str> = keeps.iter().map(|k| k.name.as_str()).collect();
        local.iter().filter(|p| kept.contains(p.name.as_str())).collect()
    };

    let mut roots = vec![];
    for pkg in base {
        match narrow_match(&remote, &pkg.name, &pkg.full) {
            Some(full) => roots.push(full),
            None => debug!(full = %pkg.full, "no remote counterpart, skipping"),
        }
    }

    if roots.is_empty() {
        session.emit(Event::NothingToDo);
        return Ok(());
    }

    // the keep set must survive the upgrade exactly as it was
    let keep_roots: Vec<String> = keeps.into_iter().map(|k| k.full).collect();
    install_impl(session, &mut store, &roots, &keep_roots)
}

/// Pick the remote candidate closest to an installed package: same stem,
/// longest shared prefix with the installed full name.
fn narrow_match(remote: &[PkgRecord], name: &str, installed_full: &str) -> Option<String> {
    let mut best: Option<&PkgRecord> = None;
    let mut best_len = 0;

    for pkg in remote.iter().filter(|p| p.name == name) {
        let shared = pkg
            .full
            .bytes()
            .zip(installed_full.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        if shared > best_len || best.is_none() {
            best_len = shared;
            best = Some(pkg);
        }
    }

    best.map(|p| p.full.clone())
}

/// Offer orphaned dependencies for removal.
pub fn autoremove(session: &Session) -> Fallible<()> {
    let mut store = open_store(session)?;
    sync_local(session, &mut store);

    let orphans = store.orphans()?;
    if orphans.is_empty() {
        session.emit(Event::NothingToDo);
        return Ok(());
    }

    let fulls: Vec<String> = orphans.iter().map(|o| o.full.clone()).collect();
    if !session.confirm_destructive(Event::PromptAutoremove(fulls), true) {
        // refusal leaves the orphans installed
        return Ok(());
    }

    let tools = PkgInstall::locate()?;
    for orphan in &orphans {
        session.emit(Event::Removing(orphan.full.clone()));
        if !delete_package(&tools, &orphan.full) {
            session.emit(Event::InstallerFailed {
                package: orphan.full.clone(),
                phase: "remove",
            });
        }
    }

    update_local(session, &mut store, &tools, None)
}

/// Flag packages as keep (installed deliberately) or unkeep.
///
/// Returns the full names actually flagged.
pub fn keep(session: &Session, args: &[String], keep: bool) -> Fallible<Vec<String>> {
    let mut store = open_store(session)?;
    sync_local(session, &mut store);

    let local = store.pkgs(Universe::Local)?;
    if local.is_empty() {
        return Err(Error::EmptyLocalCatalog);
    }

    let tools = PkgInstall::locate().ok();
    let mut flagged = vec![];

    for arg in args {
        let pkg = match impact::unique_pkg(&local, &Preferred::default(), arg) {
            Some(pkg) => pkg,
            None => {
                session.emit(Event::PackageNotInstalled(arg.clone()));
                continue;
            }
        };
        let (name, _) = split_fullname(&pkg.full);

        store.set_keep(name, keep)?;
        if let Some(tools) = &tools {
            tools.mark_automatic(&pkg.full, !keep)?;
        }
        flagged.push(pkg.full.clone());
    }

    Ok(flagged)
}

/// The keep set.
pub fn show_keep(session: &Session) -> Fallible<Vec<PkgRecord>> {
    open_store(session)?.keep_list()
}

/// The autoremovable set.
pub fn show_no_keep(session: &Session) -> Fallible<Vec<PkgRecord>> {
    open_store(session)?.nokeep_list()
}

/// List installed packages, or annotate the remote catalog against the
/// installed set when a status limit is given.
pub fn list_local(session: &Session, limit: Option<char>) -> Fallible<Vec<ListEntry>> {
    let mut store = open_store(session)?;
    sync_local(session, &mut store);

    let local = store.pkgs(Universe::Local)?;

    let limit = match limit {
        None => {
            return Ok(local
                .into_iter()
                .map(|p| ListEntry {
                    full: p.full,
                    comment: p.comment,
                    status: None,
                })
                .collect())
        }
        Some(limit) => limit,
    };

    let remote = store.pkgs(Universe::Remote)?;
    let mut entries = vec![];
    for pkg in remote {
        let status = installed_status(&local, &pkg);
        if status == Some(limit) {
            entries.push(ListEntry {
                full: pkg.full,
                comment: pkg.comment,
                status,
            });
        }
    }
    Ok(entries)
}

/// List the whole remote catalog.
pub fn avail(session: &Session) -> Fallible<Vec<ListEntry>> {
    let store = open_store(session)?;
    let local = store.pkgs(Universe::Local)?;
    Ok(remote_universe(&store)?
        .into_iter()
        .map(|p| {
            let status = installed_status(&local, &p);
            ListEntry {
                full: p.full,
                comment: p.comment,
                status,
            }
        })
        .collect())
}

/// Status of a remote candidate against the installed set.
fn installed_status(local: &[PkgRecord], pkg: &PkgRecord) -> Option<char> {
    let installed = local.iter().find(|l| l.name == pkg.name)?;
    if installed.version == pkg.version {
        return Some('=');
    }
    let newer = crate::version::Version::parse(&installed.version)
        > crate::version::Version::parse(&pkg.version);
    Some(if newer { '>' } else { '<' })
}

/// Search the remote catalog by regular expression, against names and
/// comments.
pub fn search(session: &Session, query: &str) -> Fallible<Vec<ListEntry>> {
    let re = regex::Regex::new(query)?;

    let store = open_store(session)?;
    let local = store.pkgs(Universe::Local)?;
    let remote = remote_universe(&store)?;

    Ok(remote
        .into_iter()
        .filter(|p| re.is_match(&p.full) || re.is_match(&p.comment))
        .map(|p| {
            let status = installed_status(&local, &p);
            ListEntry {
                full: p.full,
                comment: p.comment,
                status,
            }
        })
        .collect())
}

/// Direct dependencies of a remote package.
pub fn show_direct_deps(session: &Session, arg: &str) -> Fallible<(String, Vec<String>)> {
    let store = open_store(session)?;
    let remote = remote_universe(&store)?;
    let preferred = session.config().preferred().clone();

    let pkg = impact::unique_pkg(&remote, &preferred, arg)
        .ok_or_else(|| Error::PackageNotAvailable(arg.to_owned()))?;

    let deps = store.exact_direct_deps(&pkg.full)?;
    let shown = deps
        .into_iter()
        .map(|d| display_dep(session, &remote, d.pattern))
        .collect();
    Ok((pkg.full.clone(), shown))
}

/// Full transitive dependencies of a remote package.
pub fn show_full_deps(session: &Session, arg: &str) -> Fallible<(String, Vec<String>)> {
    let store = open_store(session)?;
    let remote = remote_universe(&store)?;
    let preferred = session.config().preferred().clone();

    let pkg = impact::unique_pkg(&remote, &preferred, arg)
        .ok_or_else(|| Error::PackageNotAvailable(arg.to_owned()))?;
    let full = pkg.full.clone();

    let tree = full_dep_tree(&store, &remote, &full, DepDirection::RemoteForward)?;
    let shown = tree
        .into_iter()
        .map(|n| display_dep(session, &remote, n.pattern))
        .collect();
    Ok((full, shown))
}

/// Installed packages depending on `arg`, recursively.
pub fn show_rev_deps(session: &Session, arg: &str) -> Fallible<(String, Vec<String>)> {
    let mut store = open_store(session)?;
    sync_local(session, &mut store);

    let local = store.pkgs(Universe::Local)?;
    let (name, _) = split_fullname(arg);
    let name = if name.is_empty() { arg } else { name };
    let root = impact::find_exact_pkg(&local, arg)
        .or_else(|| impact::find_exact_pkg(&local, name))
        .ok_or_else(|| Error::PackageNotInstalled(arg.to_owned()))?;

    let tree = full_dep_tree(&store, &local, &root.name, DepDirection::LocalReverse)?;
    let shown = tree.into_iter().map(|n| n.pattern).collect();
    Ok((root.full.clone(), shown))
}

/// Render a dependency pattern, resolved to a concrete package when the
/// package-version display flag is set.
fn display_dep(session: &Session, remote: &[PkgRecord], pattern: String) -> String {
    if !session.config().flags.package_version {
        return pattern;
    }
    remote
        .iter()
        .find(|p| pkg_match(&pattern, &p.full))
        .map(|p| p.full.clone())
        .unwrap_or(pattern)
}

/// Export the keep set as PKGPATHs, one per line.
pub fn export_keep(session: &Session) -> Fallible<Vec<String>> {
    let store = open_store(session)?;
    let list = store.export_keep_list()?;
    if list.is_empty() {
        return Err(Error::EmptyLocalCatalog);
    }
    Ok(list)
}

/// Import a keep list written by `export` and install it.
pub fn import_keep(session: &Session, path: &Path) -> Fallible<()> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        message: format!("could not read {}", path.display()),
        source,
    })?;

    let mut store = open_store(session)?;
    sync_local(session, &mut store);
    let remote = remote_universe(&store)?;
    let preferred = session.config().preferred().clone();

    let mut roots = vec![];
    for line in text.lines() {
        let line = line.trim();
        if !line.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            continue;
        }

        let candidate = if line.contains('/') {
            match store.pkgname_by_pkgpath(line)? {
                Some(stem) => impact::unique_pkg(&remote, &preferred, &stem),
                None => None,
            }
        } else {
            impact::unique_pkg(&remote, &preferred, line)
        };

        match candidate {
            Some(pkg) => roots.push(pkg.full.clone()),
            None => session.emit(Event::PackageNotAvailable(line.to_owned())),
        }
    }

    if roots.is_empty() {
        return Err(Error::EmptyImportList);
    }

    install_impl(session, &mut store, &roots, &roots)
}

/// Delete every cached archive. Returns the number of files removed.
pub fn clean_cache(session: &Session) -> Fallible<u64> {
    fsops::clean_cache(&session.config().cache_dir())
}

/// Catalog statistics: package counts and cumulated sizes, plus the
/// configured repositories.
pub fn stats(session: &Session) -> Fallible<(CatalogStats, Vec<String>)> {
    let store = open_store(session)?;
    Ok((store.stats()?, store.stored_repositories()?))
}
