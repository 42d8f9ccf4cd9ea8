//! End-to-end planner scenarios over an in-memory catalog.
//!
//! These tests run the planner headlessly: prompts resolve to their
//! defaults unless an event loop is attached, and the installer toolchain
//! is made unreachable so no subprocess ever runs.

use libnip::depends::{full_dep_tree, DepDirection};
use libnip::impact::pkg_impact;
use libnip::operation;
use libnip::order::{order_install, order_remove, upgrade_remove_candidates, RemoveCandidate};
use libnip::store::{CatalogStore, PkgRecord, Universe};
use libnip::summary::SummaryRecord;
use libnip::{Config, Event, Session};

const REPO: &str = "http://127.0.0.1:1/packages";

fn record(full: &str, deps: &[&str]) -> SummaryRecord {
    let mut rec = SummaryRecord::from_pkgname(full);
    rec.file_size = 1024;
    rec.size_pkg = 4096;
    rec.pkgpath = format!("test/{}", rec.name);
    for dep in deps {
        rec.push_depend(dep);
    }
    rec
}

struct Fixture {
    store: CatalogStore,
    local: Vec<PkgRecord>,
    remote: Vec<PkgRecord>,
}

fn fixture(remote: &[(&str, &[&str])], local: &[(&str, &[&str])]) -> Fixture {
    let mut store = CatalogStore::open_in_memory().unwrap();

    let records: Vec<_> = remote.iter().map(|(f, d)| record(f, d)).collect();
    store.record_repositories(&[REPO.to_owned()]).unwrap();
    store.replace_repository(REPO, &records).unwrap();

    let records: Vec<_> = local.iter().map(|(f, d)| record(f, d)).collect();
    store.replace_local(&records).unwrap();

    Fixture {
        local: store.pkgs(Universe::Local).unwrap(),
        remote: store.pkgs(Universe::Remote).unwrap(),
        store,
    }
}

fn headless_session(data_dir: &std::path::Path) -> Session {
    // point the toolchain lookup somewhere empty so locating it fails
    // instead of driving the host's real package tools
    std::env::set_var("PKG_INSTALL_DIR", data_dir);
    Session::with_config(Config::load_with(data_dir, data_dir).unwrap())
}

#[test]
fn s1_install_plans_dependency_first() {
    let dir = tempfile::tempdir().unwrap();
    let session = headless_session(dir.path());

    let fx = fixture(
        &[("foo-1.0", &[][..]), ("bar-1.0", &["foo>=1.0"][..])],
        &[],
    );

    let impact = pkg_impact(
        &session,
        &fx.store,
        &fx.local,
        &fx.remote,
        &["bar".to_owned()],
    )
    .unwrap();

    let steps = order_install(&impact);
    let fulls: Vec<&str> = steps.iter().map(|s| s.full.as_str()).collect();
    assert_eq!(fulls, vec!["foo-1.0", "bar-1.0"]);

    // both archives need fetching
    let cache = dir.path().join("cache");
    std::fs::create_dir_all(&cache).unwrap();
    assert_eq!(libnip::download::download_size(&steps, &cache), 2048);

    // install-order invariant: a dependency never carries a greater level
    let level_of = |full: &str| steps.iter().find(|s| s.full == full).unwrap().level;
    assert!(level_of("foo-1.0") <= level_of("bar-1.0"));
}

#[test]
fn s2_upgrade_keeps_satisfied_dependents() {
    let dir = tempfile::tempdir().unwrap();
    let session = headless_session(dir.path());

    let fx = fixture(
        &[
            ("foo-1.0", &[][..]),
            ("foo-2.0", &[][..]),
            ("bar-1.0", &["foo>=1.0"][..]),
        ],
        &[("foo-1.0", &[][..]), ("bar-1.0", &["foo>=1.0"][..])],
    );

    let impact = pkg_impact(
        &session,
        &fx.store,
        &fx.local,
        &fx.remote,
        &["foo-2.0".to_owned(), "bar-1.0".to_owned()],
    )
    .unwrap();

    // bar's dependency is still satisfied by foo-2.0: only foo moves
    assert_eq!(impact.len(), 1);
    let foo = &impact[0];
    assert!(foo.is_upgrade());
    assert_eq!(foo.full, "foo-2.0");
    assert_eq!(foo.old(), Some("foo-1.0"));

    let removes = upgrade_remove_candidates(&impact);
    assert_eq!(removes.len(), 1);
    assert_eq!(removes[0].full, "foo-1.0");

    let installs = order_install(&impact);
    assert_eq!(installs.len(), 1);
    assert_eq!(installs[0].full, "foo-2.0");
}

#[test]
fn s3_upgrade_removes_broken_dependents() {
    let dir = tempfile::tempdir().unwrap();
    let session = headless_session(dir.path());

    // bar pins foo to exactly 1.0, upgrading foo strands it
    let fx = fixture(
        &[("foo-2.0", &[][..]), ("bar-1.0", &["foo=1.0"][..])],
        &[("foo-1.0", &[][..]), ("bar-1.0", &["foo=1.0"][..])],
    );

    let impact = pkg_impact(
        &session,
        &fx.store,
        &fx.local,
        &fx.remote,
        &["foo-2.0".to_owned(), "bar-1.0".to_owned()],
    )
    .unwrap();

    let bar = impact.iter().find(|e| e.name == "bar").unwrap();
    assert!(bar.is_remove());

    let candidates = upgrade_remove_candidates(&impact);
    let steps = order_remove(&fx.store, &candidates).unwrap();
    let fulls: Vec<&str> = steps.iter().map(|s| s.full.as_str()).collect();
    // the dependent goes first
    assert_eq!(fulls, vec!["bar-1.0", "foo-1.0"]);

    let installs = order_install(&impact);
    let fulls: Vec<&str> = installs.iter().map(|s| s.full.as_str()).collect();
    assert_eq!(fulls, vec!["foo-2.0"]);
}

#[test]
fn s4_remove_closure_deletes_dependents_first() {
    let fx = fixture(
        &[],
        &[("foo-1.0", &[][..]), ("bar-1.0", &["foo>=1.0"][..])],
    );

    // reverse closure of foo pulls bar in
    let closure = full_dep_tree(&fx.store, &fx.local, "foo", DepDirection::LocalReverse).unwrap();
    let mut candidates: Vec<RemoveCandidate> = closure
        .iter()
        .map(|n| RemoveCandidate {
            full: n.pattern.clone(),
            name: n.name.clone(),
            upgrade: false,
        })
        .collect();
    candidates.push(RemoveCandidate {
        full: "foo-1.0".to_owned(),
        name: "foo".to_owned(),
        upgrade: false,
    });

    let steps = order_remove(&fx.store, &candidates).unwrap();
    let fulls: Vec<&str> = steps.iter().map(|s| s.full.as_str()).collect();
    assert_eq!(fulls, vec!["bar-1.0", "foo-1.0"]);

    // removal invariant: the reverse dependency is removed first and
    // carries the greater level
    assert!(steps[0].level > steps[1].level);
}

#[test]
fn s5_insufficient_space_or_unreachable_repo_leaves_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let session = headless_session(dir.path());

    // an absurd file size: either the free-space check refuses upfront, or
    // the unreachable repository fails the fetch and the default answer
    // declines continuing without the package
    let mut store = CatalogStore::open(dir.path().join("nip.db")).unwrap();
    let mut rec = record("huge-1.0", &[]);
    rec.file_size = i64::MAX / 2;
    store.record_repositories(&[REPO.to_owned()]).unwrap();
    store.replace_repository(REPO, &[rec]).unwrap();
    drop(store);

    let result = operation::install(&session, &["huge".to_owned()]);
    assert!(result.is_err());

    // no archive may exist after the failed transaction
    let cache = dir.path().join("cache");
    if cache.exists() {
        let archives: Vec<_> = cache
            .read_dir()
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().map(|x| x == "tgz").unwrap_or(false))
            .collect();
        assert!(archives.is_empty());
    }
}

#[test]
fn s6_autoremove_refusal_leaves_orphans_installed() {
    let dir = tempfile::tempdir().unwrap();
    let session = headless_session(dir.path());

    // foo is kept; liba is unkept and nothing depends on it anymore
    let mut store = CatalogStore::open(dir.path().join("nip.db")).unwrap();
    let records = vec![record("foo-1.0", &[]), record("liba-1.0", &[])];
    store.replace_local(&records).unwrap();
    store.set_keep("foo", true).unwrap();
    assert_eq!(store.orphans().unwrap().len(), 1);
    drop(store);

    // attach an event loop that refuses the autoremove prompt
    let rx = session.event_bus().receiver();
    let tx = session.event_bus().sender();
    let answered = std::thread::spawn(move || {
        let mut offered = vec![];
        while let Ok(event) = rx.recv() {
            match event {
                Event::PromptAutoremove(packages) => {
                    offered = packages;
                    let _ = tx.send(Event::PromptResult(false));
                }
                Event::SessionTerminated => break,
                _ => {}
            }
        }
        offered
    });

    let result = operation::autoremove(&session);
    session.event_bus().terminate();
    let offered = answered.join().unwrap();

    // refusal is not an error, and the orphan survives
    assert!(result.is_ok());
    assert_eq!(offered, vec!["liba-1.0".to_owned()]);
    let store = CatalogStore::open(dir.path().join("nip.db")).unwrap();
    assert_eq!(store.orphans().unwrap().len(), 1);
}

#[test]
fn keep_list_export_resolves_back_through_pkgpaths() {
    let fx = fixture(
        &[("foo-1.0", &[][..]), ("libz-1.3", &[][..])],
        &[("foo-1.0", &[][..]), ("libz-1.3", &[][..])],
    );
    fx.store.set_keep("foo", true).unwrap();
    fx.store.set_keep("libz", true).unwrap();

    let exported = fx.store.export_keep_list().unwrap();
    assert_eq!(exported.len(), 2);

    // importing on a fresh machine maps every PKGPATH back to the same
    // stems, reproducing the keep set exactly
    let mut roundtrip: Vec<String> = exported
        .iter()
        .map(|path| fx.store.pkgname_by_pkgpath(path).unwrap().unwrap())
        .collect();
    roundtrip.sort();
    assert_eq!(roundtrip, vec!["foo".to_owned(), "libz".to_owned()]);
}

#[test]
fn update_keeps_the_stale_snapshot_when_every_repo_is_down() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("PKG_REPOS", REPO);
    let session = headless_session(dir.path());

    let mut store = CatalogStore::open(dir.path().join("nip.db")).unwrap();
    store.record_repositories(&[REPO.to_owned()]).unwrap();
    store
        .replace_repository(REPO, &[record("foo-1.0", &[])])
        .unwrap();
    drop(store);

    // the toolchain is unreachable, update fails on locating it; the
    // remote snapshot must be untouched either way
    let _ = operation::update(&session);

    let store = CatalogStore::open(dir.path().join("nip.db")).unwrap();
    let pkgs = store.pkgs(Universe::Remote).unwrap();
    assert_eq!(pkgs.len(), 1);
    assert_eq!(pkgs[0].full, "foo-1.0");
}
