//! Impact analysis.
//!
//! `pkg_impact` reconciles a resolved dependency set against the installed
//! universe and classifies every package: install it, upgrade it (deleting
//! the old version first), or remove it as collateral of an upgrade that
//! breaks its dependencies. Packages whose installed version already
//! satisfies their pattern produce no entry at all.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, trace};

use crate::depends::{full_dep_tree, DepDirection};
use crate::error::{Error, Fallible};
use crate::event::Event;
use crate::pattern::{exact_pkgfmt, pkg_match, split_fullname};
use crate::preferred::Preferred;
use crate::session::Session;
use crate::store::{CatalogStore, PkgRecord};
use crate::version::Version;

/// What the transaction will do with one package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImpactAction {
    Install,
    /// The installed `old` full name is deleted before the new one goes in.
    Upgrade { old: String },
    /// Collateral removal: an upgrade elsewhere breaks this package.
    Remove,
}

#[derive(Clone, Debug)]
pub struct ImpactEntry {
    /// The dependency pattern that pulled this package in.
    pub depend: String,
    /// Concrete full name acted upon. For removals this is the installed
    /// package, otherwise the remote candidate.
    pub full: String,
    /// Stem of `full`.
    pub name: String,
    pub action: ImpactAction,
    /// Resolution depth inherited from the dependency tree.
    pub level: i32,
    /// Size of the binary archive to download.
    pub file_size: i64,
    /// Installed footprint.
    pub size_pkg: i64,
}

impl ImpactEntry {
    pub fn is_install(&self) -> bool {
        self.action == ImpactAction::Install
    }

    pub fn is_upgrade(&self) -> bool {
        matches!(self.action, ImpactAction::Upgrade { .. })
    }

    pub fn is_remove(&self) -> bool {
        self.action == ImpactAction::Remove
    }

    /// The installed full name an upgrade replaces.
    pub fn old(&self) -> Option<&str> {
        match &self.action {
            ImpactAction::Upgrade { old } => Some(old),
            _ => None,
        }
    }
}

/// Result of resolving a requested name to a remote candidate.
enum Candidate<'a> {
    Found(&'a PkgRecord),
    /// Candidates exist but every one is rejected by a version pin.
    Preferred { pin: String },
    None,
}

/// Pick the best remote candidate matching `pattern`: preferred-filtered,
/// greatest version wins.
fn best_candidate<'a>(
    remote: &'a [PkgRecord],
    preferred: &Preferred,
    pattern: &str,
) -> Candidate<'a> {
    let mut best: Option<&PkgRecord> = None;
    let mut pin: Option<String> = None;

    for pkg in remote.iter().filter(|p| pkg_match(pattern, &p.full)) {
        if let Some(glob) = preferred.rejects(&pkg.full) {
            pin = Some(glob.to_owned());
            continue;
        }
        best = match best {
            None => Some(pkg),
            Some(cur) => {
                if Version::parse(&pkg.version) > Version::parse(&cur.version) {
                    Some(pkg)
                } else {
                    Some(cur)
                }
            }
        };
    }

    match (best, pin) {
        (Some(pkg), _) => Candidate::Found(pkg),
        (None, Some(pin)) => Candidate::Preferred { pin },
        (None, None) => Candidate::None,
    }
}

/// Resolve a user-supplied name (stem or full) to the greatest acceptable
/// remote full name.
pub(crate) fn unique_pkg<'a>(
    remote: &'a [PkgRecord],
    preferred: &Preferred,
    arg: &str,
) -> Option<&'a PkgRecord> {
    match best_candidate(remote, preferred, arg) {
        Candidate::Found(pkg) => Some(pkg),
        _ => None,
    }
}

/// Find an exact package in a list, by full name or by stem.
pub(crate) fn find_exact_pkg<'a>(pkgs: &'a [PkgRecord], arg: &str) -> Option<&'a PkgRecord> {
    let exact = exact_pkgfmt(arg);
    pkgs.iter().find(|p| {
        if exact {
            p.full == arg
        } else {
            p.name == arg
        }
    })
}

/// Is a package providing `stem` already recorded in the impact list?
fn dep_present(entries: &[ImpactEntry], stem: &str) -> bool {
    entries
        .iter()
        .any(|e| !e.is_remove() && pkg_match(stem, &e.full))
}

/// Calculate the impact of installing or upgrading `roots`.
///
/// Every returned entry is actionable; packages already satisfied are
/// dropped during classification.
pub fn pkg_impact(
    session: &Session,
    store: &CatalogStore,
    local: &[PkgRecord],
    remote: &[PkgRecord],
    roots: &[String],
) -> Fallible<Vec<ImpactEntry>> {
    let preferred = session.config().preferred().clone();
    let force_reinstall = session.config().flags.force_reinstall;

    let mut entries: Vec<ImpactEntry> = vec![];
    let mut seen: HashSet<String> = HashSet::new();

    session.emit(Event::ResolveStarted);

    for root in roots {
        // glob arguments are resolved by the caller beforehand
        if root.contains(['*', '%']) {
            continue;
        }

        let resolved = match best_candidate(remote, &preferred, root) {
            Candidate::Found(pkg) => pkg,
            Candidate::Preferred { pin } => {
                session.emit(Event::PackagePreferredMismatch {
                    name: root.clone(),
                    pin,
                });
                continue;
            }
            Candidate::None => {
                session.emit(Event::PackageNotAvailable(root.clone()));
                continue;
            }
        };

        debug!(root, full = %resolved.full, "computing impact");
        let deptree = full_dep_tree(store, remote, &resolved.full, DepDirection::RemoteForward)?;

        for node in &deptree {
            if !seen.insert(node.pattern.clone()) {
                continue;
            }
            deps_impact(
                session,
                store,
                local,
                remote,
                &preferred,
                &mut entries,
                &node.pattern,
                &node.name,
                node.level,
                false,
            )?;
        }

        // finally, the requested package itself
        if seen.insert(resolved.full.clone()) {
            deps_impact(
                session,
                store,
                local,
                remote,
                &preferred,
                &mut entries,
                &resolved.full,
                &resolved.name,
                0,
                force_reinstall,
            )?;
        }
    }

    session.emit(Event::ResolveFinished);
    Ok(entries)
}

/// Classify one dependency against the installed universe.
#[allow(clippy::too_many_arguments)]
fn deps_impact(
    session: &Session,
    store: &CatalogStore,
    local: &[PkgRecord],
    remote: &[PkgRecord],
    preferred: &Preferred,
    entries: &mut Vec<ImpactEntry>,
    pattern: &str,
    stem: &str,
    level: i32,
    force: bool,
) -> Fallible<()> {
    let candidate = match best_candidate(remote, preferred, pattern) {
        Candidate::Found(pkg) => pkg,
        Candidate::Preferred { pin } => {
            session.emit(Event::PackagePreferredMismatch {
                name: pattern.to_owned(),
                pin,
            });
            return Ok(());
        }
        Candidate::None => {
            session.emit(Event::PackageNotAvailable(pattern.to_owned()));
            return Ok(());
        }
    };

    for installed in local {
        if installed.name == candidate.name {
            // installed version satisfies and no forced reinstall: no-op
            if pkg_match(pattern, &installed.full) && !force {
                trace!(full = %installed.full, "already satisfied");
                return Ok(());
            }

            // remote candidate older than the installed package
            if Version::parse(&installed.version) > Version::parse(&candidate.version) {
                let proceed = session.confirm(
                    Event::PromptDowngrade {
                        installed: installed.full.clone(),
                        candidate: candidate.full.clone(),
                    },
                    false,
                );
                if !proceed {
                    return Ok(());
                }
            }

            let entry = ImpactEntry {
                depend: pattern.to_owned(),
                full: candidate.full.clone(),
                name: candidate.name.clone(),
                action: ImpactAction::Upgrade {
                    old: installed.full.clone(),
                },
                level,
                file_size: candidate.file_size,
                size_pkg: candidate.size_pkg,
            };
            break_depends(session, store, local, remote, entries, &entry)?;
            entries.push(entry);
            return Ok(());
        }

        // another installed stem satisfies the pattern (option packages);
        // recording it would invite a conflict, pass
        if pkg_match(pattern, &installed.full) {
            return Ok(());
        }
    }

    if !dep_present(entries, stem) {
        entries.push(ImpactEntry {
            depend: pattern.to_owned(),
            full: candidate.full.clone(),
            name: candidate.name.clone(),
            action: ImpactAction::Install,
            level,
            file_size: candidate.file_size,
            size_pkg: candidate.size_pkg,
        });
    }

    Ok(())
}

/// Find installed packages whose dependencies break when `upgrade` lands.
///
/// The installed reverse closure of the old package is walked; a reverse
/// dependent whose remote dependency tree (installed tree when the package
/// left the repository) is not satisfied by the new full name is scheduled
/// for removal.
fn break_depends(
    session: &Session,
    store: &CatalogStore,
    local: &[PkgRecord],
    remote: &[PkgRecord],
    entries: &mut Vec<ImpactEntry>,
    upgrade: &ImpactEntry,
) -> Fallible<()> {
    let old = match upgrade.old() {
        Some(old) => old,
        None => return Ok(()),
    };
    let (old_name, _) = split_fullname(old);

    let rdeps = full_dep_tree(store, local, old_name, DepDirection::LocalReverse)?;

    for rdp in &rdeps {
        let (rname, _) = split_fullname(&rdp.pattern);

        let mut fdeps = full_dep_tree(store, remote, rname, DepDirection::RemoteForward)?;
        if fdeps.is_empty() {
            // the reverse dependent left the repository, judge it by its
            // installed dependencies instead
            fdeps = full_dep_tree(store, local, rname, DepDirection::LocalForward)?;
        }

        let satisfied = fdeps.iter().any(|d| pkg_match(&d.pattern, &upgrade.full));
        if satisfied {
            continue;
        }

        if entries.iter().any(|e| e.depend == rdp.pattern) {
            continue;
        }

        debug!(dependent = %rdp.pattern, upgraded = %upgrade.full, "dependency break");
        entries.push(ImpactEntry {
            depend: rdp.pattern.clone(),
            full: rdp.pattern.clone(),
            name: rname.to_owned(),
            action: ImpactAction::Remove,
            level: 0,
            file_size: 0,
            size_pkg: 0,
        });
    }

    Ok(())
}

/// Abort if an entry scheduled for installation conflicts with an installed
/// package and the user refuses to continue.
pub fn check_conflicts(
    session: &Session,
    store: &CatalogStore,
    entries: &[ImpactEntry],
) -> Fallible<()> {
    let patterns = store.local_conflict_patterns()?;
    if patterns.is_empty() {
        return Ok(());
    }

    for entry in entries.iter().filter(|e| !e.is_remove()) {
        for pattern in &patterns {
            if !pkg_match(pattern, &entry.full) {
                continue;
            }
            let conflicting = store
                .conflicting_installed(pattern)?
                .unwrap_or_else(|| pattern.clone());
            let proceed = session.confirm(
                Event::PromptConflict {
                    package: entry.full.clone(),
                    conflicting,
                },
                false,
            );
            if !proceed {
                return Err(Error::Aborted);
            }
        }
    }

    Ok(())
}

/// Verify the REQUIRES of every package in the plan.
///
/// Absolute paths outside the install prefix must exist on the filesystem.
/// Prefix-internal requirements are matched against installed and planned
/// PROVIDES; misses are warnings unless `strict_requires` is set.
pub fn check_requisites(
    session: &Session,
    store: &CatalogStore,
    entries: &[ImpactEntry],
) -> Fallible<()> {
    let prefix = session.config().prefix().to_owned();
    let strict = session.config().flags.strict_requires;

    let mut met = true;

    let local_provides = store.local_provides()?;
    let mut planned_provides = vec![];
    for entry in entries.iter().filter(|e| !e.is_remove()) {
        planned_provides.extend(store.provides_of(&entry.full)?);
    }

    for entry in entries.iter().filter(|e| !e.is_remove()) {
        for req in store.requires_of(&entry.full)? {
            if !Path::new(&req).starts_with(&prefix) {
                if !Path::new(&req).exists() {
                    session.emit(Event::RequirementMissing {
                        path: req,
                        needed_by: entry.full.clone(),
                    });
                    met = false;
                }
                continue;
            }

            let found = local_provides
                .iter()
                .chain(planned_provides.iter())
                .any(|p| p.starts_with(&req));
            if !found {
                session.emit(Event::RequirementSoftMissing {
                    path: req,
                    needed_by: entry.full.clone(),
                });
                if strict {
                    met = false;
                }
            }
        }
    }

    if met {
        Ok(())
    } else {
        Err(Error::RequirementsUnmet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::Universe;
    use crate::summary::SummaryRecord;

    fn record(full: &str, deps: &[&str]) -> SummaryRecord {
        let mut rec = SummaryRecord::from_pkgname(full);
        for dep in deps {
            rec.push_depend(dep);
        }
        rec
    }

    fn session() -> Session {
        Session::with_config(Config::load_with("/nonexistent", "/nonexistent").unwrap())
    }

    struct Fixture {
        store: CatalogStore,
        local: Vec<PkgRecord>,
        remote: Vec<PkgRecord>,
    }

    fn fixture(remote: &[(&str, &[&str])], local: &[(&str, &[&str])]) -> Fixture {
        let mut store = CatalogStore::open_in_memory().unwrap();
        let records: Vec<_> = remote.iter().map(|(f, d)| record(f, d)).collect();
        store
            .replace_repository("http://repo.example/All", &records)
            .unwrap();
        let records: Vec<_> = local.iter().map(|(f, d)| record(f, d)).collect();
        store.replace_local(&records).unwrap();
        Fixture {
            local: store.pkgs(Universe::Local).unwrap(),
            remote: store.pkgs(Universe::Remote).unwrap(),
            store,
        }
    }

    #[test]
    fn fresh_install_pulls_dependencies() {
        let fx = fixture(
            &[("foo-1.0", &[][..]), ("bar-1.0", &["foo>=1.0"][..])],
            &[],
        );
        let ses = session();

        let impact = pkg_impact(
            &ses,
            &fx.store,
            &fx.local,
            &fx.remote,
            &["bar".to_owned()],
        )
        .unwrap();

        assert_eq!(impact.len(), 2);
        assert!(impact.iter().all(|e| e.is_install()));
        let bar = impact.iter().find(|e| e.name == "bar").unwrap();
        let foo = impact.iter().find(|e| e.name == "foo").unwrap();
        assert_eq!(bar.level, 0);
        assert_eq!(foo.level, 1);

        // invariant: nothing installed satisfies an install entry
        for entry in &impact {
            assert!(!fx.local.iter().any(|l| pkg_match(&entry.depend, &l.full)));
        }
    }

    #[test]
    fn satisfied_packages_are_no_ops() {
        let fx = fixture(
            &[("foo-2.0", &[][..]), ("bar-1.0", &["foo>=1.0"][..])],
            &[("foo-2.0", &[][..]), ("bar-1.0", &["foo>=1.0"][..])],
        );
        let ses = session();

        let impact = pkg_impact(
            &ses,
            &fx.store,
            &fx.local,
            &fx.remote,
            &["bar".to_owned()],
        )
        .unwrap();
        assert!(impact.is_empty());
    }

    #[test]
    fn upgrade_records_the_old_version() {
        let fx = fixture(
            &[("foo-2.0", &[][..]), ("bar-1.0", &["foo>=1.0"][..])],
            &[("foo-1.0", &[][..]), ("bar-1.0", &["foo>=1.0"][..])],
        );
        let ses = session();

        let impact = pkg_impact(&ses, &fx.store, &fx.local, &fx.remote, &["foo".to_owned()])
            .unwrap();

        assert_eq!(impact.len(), 1);
        let foo = &impact[0];
        assert_eq!(foo.full, "foo-2.0");
        assert_eq!(foo.old(), Some("foo-1.0"));
        // invariant: upgrades always move forward
        assert!(
            Version::parse(split_fullname(foo.old().unwrap()).1)
                < Version::parse(split_fullname(&foo.full).1)
        );
    }

    #[test]
    fn break_dependency_forces_collateral_removal() {
        // upgrading foo to 2.0 breaks bar, whose dependency is foo=1.0
        let fx = fixture(
            &[("foo-2.0", &[][..]), ("bar-1.0", &["foo=1.0"][..])],
            &[("foo-1.0", &[][..]), ("bar-1.0", &["foo=1.0"][..])],
        );
        let ses = session();

        let impact = pkg_impact(&ses, &fx.store, &fx.local, &fx.remote, &["foo".to_owned()])
            .unwrap();

        let foo = impact.iter().find(|e| e.name == "foo").unwrap();
        assert!(foo.is_upgrade());
        let bar = impact.iter().find(|e| e.name == "bar").unwrap();
        assert!(bar.is_remove());
        assert_eq!(bar.full, "bar-1.0");
    }

    #[test]
    fn downgrades_are_skipped_headlessly() {
        let fx = fixture(&[("foo-1.0", &[][..])], &[("foo-2.0", &[][..])]);
        let ses = session();

        let impact = pkg_impact(&ses, &fx.store, &fx.local, &fx.remote, &["foo".to_owned()])
            .unwrap();
        // the downgrade prompt defaults to no without a frontend
        assert!(impact.is_empty());
    }

    #[test]
    fn unavailable_packages_are_warned_and_skipped() {
        let fx = fixture(&[("foo-1.0", &[][..])], &[]);
        let ses = session();

        let impact = pkg_impact(
            &ses,
            &fx.store,
            &fx.local,
            &fx.remote,
            &["ghost".to_owned(), "foo".to_owned()],
        )
        .unwrap();
        assert_eq!(impact.len(), 1);
        assert_eq!(impact[0].full, "foo-1.0");
    }

    #[test]
    fn preferred_pin_restricts_candidates() {
        let fx = fixture(
            &[("perl-5.36.1", &[][..]), ("perl-5.38.0", &[][..])],
            &[],
        );
        let ses = session();
        ses.config_mut()
            .unwrap()
            .set_preferred(Preferred::parse("perl=5.36.*\n"));

        let impact = pkg_impact(&ses, &fx.store, &fx.local, &fx.remote, &["perl".to_owned()])
            .unwrap();
        assert_eq!(impact.len(), 1);
        assert_eq!(impact[0].full, "perl-5.36.1");
    }

    #[test]
    fn requisites_absolute_paths() {
        let fx = fixture(&[("foo-1.0", &[][..])], &[]);
        let ses = session();

        let mut rec = record("foo-1.0", &[]);
        rec.requires.push("/definitely/not/here".to_owned());
        let mut store = CatalogStore::open_in_memory().unwrap();
        store
            .replace_repository("http://repo.example/All", &[rec])
            .unwrap();

        let entries = vec![ImpactEntry {
            depend: "foo".to_owned(),
            full: "foo-1.0".to_owned(),
            name: "foo".to_owned(),
            action: ImpactAction::Install,
            level: 0,
            file_size: 0,
            size_pkg: 0,
        }];

        assert!(matches!(
            check_requisites(&ses, &store, &entries),
            Err(Error::RequirementsUnmet)
        ));
        drop(fx);
    }
}
