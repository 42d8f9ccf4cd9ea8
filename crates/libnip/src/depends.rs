//! Dependency tree expansion.
//!
//! `full_dep_tree` is the central resolution routine: starting from a root
//! package it repeatedly fetches direct edges from the catalog, levelling
//! nodes breadth-first. Nodes are deduplicated by normalized stem, so a
//! package depended upon by several others contributes one node at the
//! shallowest level observed.

use std::collections::HashSet;

use tracing::trace;

use crate::error::Fallible;
use crate::pattern::{exact_pkgfmt, pkg_match};
use crate::store::{CatalogStore, PkgRecord, Universe};

/// Which edge set an expansion walks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepDirection {
    /// Forward dependencies in the remote universe (install planning).
    RemoteForward,
    /// Forward dependencies in the installed universe (break-dep fallback).
    LocalForward,
    /// Reverse dependencies in the installed universe (removals).
    LocalReverse,
}

/// A node of a resolved dependency tree.
#[derive(Clone, Debug)]
pub struct DepNode {
    /// The matching pattern for forward edges, the dependent's full name
    /// for reverse edges.
    pub pattern: String,
    /// Normalized stem, the deduplication key.
    pub name: String,
    /// Breadth-first depth: direct edges of the root are level 1.
    pub level: i32,
    /// Keep flag of the dependent, reverse edges only.
    pub keep: bool,
}

/// Map a dependency pattern to a concrete package of `universe`, so the
/// node carries the catalog's stem rather than the pattern's approximation.
fn map_name(pkgs: &[PkgRecord], pattern: &str, fallback: &str) -> String {
    pkgs.iter()
        .find(|p| pkg_match(pattern, &p.full))
        .map(|p| p.name.clone())
        .unwrap_or_else(|| fallback.to_owned())
}

/// Expand the dependency tree of `root` in the given direction.
///
/// `pkgs` is the package list of the universe being walked, used to map
/// patterns back to catalog stems. The root itself is not part of the
/// result.
pub fn full_dep_tree(
    store: &CatalogStore,
    pkgs: &[PkgRecord],
    root: &str,
    direction: DepDirection,
) -> Fallible<Vec<DepNode>> {
    let mut nodes: Vec<DepNode> = vec![];
    let mut seen: HashSet<String> = HashSet::new();

    // seed with the root's direct edges; an exact remote root resolves its
    // own edges exactly, every deeper lookup goes by stem
    let seed = match direction {
        DepDirection::RemoteForward if exact_pkgfmt(root) => {
            forward_edges(store.exact_direct_deps(root)?)
        }
        DepDirection::RemoteForward => forward_edges(store.direct_deps(Universe::Remote, root)?),
        DepDirection::LocalForward => forward_edges(store.direct_deps(Universe::Local, root)?),
        DepDirection::LocalReverse => reverse_edges(store, root)?,
    };

    let mut frontier: Vec<usize> = vec![];
    for (pattern, name, keep) in seed {
        let name = match direction {
            DepDirection::LocalReverse => name,
            _ => map_name(pkgs, &pattern, &name),
        };
        if seen.insert(name.clone()) {
            frontier.push(nodes.len());
            nodes.push(DepNode {
                pattern,
                name,
                level: 1,
                keep,
            });
        }
    }

    let mut level = 1;
    while !frontier.is_empty() {
        level += 1;
        let mut next = vec![];

        for idx in frontier {
            let stem = nodes[idx].name.clone();
            trace!(level, stem, "expanding");

            let edges = match direction {
                DepDirection::RemoteForward => {
                    forward_edges(store.direct_deps(Universe::Remote, &stem)?)
                }
                DepDirection::LocalForward => {
                    forward_edges(store.direct_deps(Universe::Local, &stem)?)
                }
                DepDirection::LocalReverse => reverse_edges(store, &stem)?,
            };

            for (pattern, name, keep) in edges {
                let name = match direction {
                    DepDirection::LocalReverse => name,
                    _ => map_name(pkgs, &pattern, &name),
                };
                if seen.insert(name.clone()) {
                    next.push(nodes.len());
                    nodes.push(DepNode {
                        pattern,
                        name,
                        level,
                        keep,
                    });
                }
            }
        }

        frontier = next;
    }

    Ok(nodes)
}

/// Forward edges in the common `(pattern, stem, keep)` shape.
fn forward_edges(deps: Vec<crate::store::Depend>) -> Vec<(String, String, bool)> {
    deps.into_iter()
        .map(|d| (d.pattern, d.name, false))
        .collect()
}

/// Reverse edges of `stem`: `(dependent full name, dependent stem, keep)`.
fn reverse_edges(store: &CatalogStore, stem: &str) -> Fallible<Vec<(String, String, bool)>> {
    Ok(store
        .local_reverse_deps(stem)?
        .into_iter()
        .map(|r| (r.full, r.name, r.keep))
        .collect())
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

    fn remote_store(fulls: &[(&str, &[&str])]) -> (CatalogStore, Vec<PkgRecord>) {
        let mut store = CatalogStore::open_in_memory().unwrap();
        let records: Vec<_> = fulls.iter().map(|(f, d)| record(f, d)).collect();
        store
            .replace_repository("http://repo.example/All", &records)
            .unwrap();
        let pkgs = store.pkgs(Universe::Remote).unwrap();
        (store, pkgs)
    }

    #[test]
    fn levels_are_breadth_first() {
        // app -> libui -> libcore, app -> libcore (diamond)
        let (store, pkgs) = remote_store(&[
            ("app-1.0", &["libui>=1.0", "libcore>=1.0"][..]),
            ("libui-1.0", &["libcore>=1.0"][..]),
            ("libcore-1.0", &[][..]),
        ]);

        let tree = full_dep_tree(&store, &pkgs, "app", DepDirection::RemoteForward).unwrap();
        assert_eq!(tree.len(), 2);

        let libui = tree.iter().find(|n| n.name == "libui").unwrap();
        let libcore = tree.iter().find(|n| n.name == "libcore").unwrap();
        assert_eq!(libui.level, 1);
        // deduplicated by stem at the shallowest level observed
        assert_eq!(libcore.level, 1);
    }

    #[test]
    fn transitive_levels_increase() {
        let (store, pkgs) = remote_store(&[
            ("app-1.0", &["libui>=1.0"][..]),
            ("libui-1.0", &["libcore>=1.0"][..]),
            ("libcore-1.0", &["libc-[0-9]*"][..]),
            ("libc-12.0", &[][..]),
        ]);

        let tree = full_dep_tree(&store, &pkgs, "app-1.0", DepDirection::RemoteForward).unwrap();
        let level_of = |name: &str| tree.iter().find(|n| n.name == name).unwrap().level;
        assert_eq!(level_of("libui"), 1);
        assert_eq!(level_of("libcore"), 2);
        assert_eq!(level_of("libc"), 3);
    }

    #[test]
    fn reverse_expansion_walks_dependents() {
        let mut store = CatalogStore::open_in_memory().unwrap();
        let records = vec![
            record("foo-1.0", &[]),
            record("bar-1.0", &["foo>=1.0"]),
            record("baz-1.0", &["bar>=1.0"]),
        ];
        store.replace_local(&records).unwrap();
        let pkgs = store.pkgs(Universe::Local).unwrap();

        let tree = full_dep_tree(&store, &pkgs, "foo", DepDirection::LocalReverse).unwrap();
        assert_eq!(tree.len(), 2);
        let bar = tree.iter().find(|n| n.name == "bar").unwrap();
        let baz = tree.iter().find(|n| n.name == "baz").unwrap();
        assert_eq!(bar.level, 1);
        assert_eq!(baz.level, 2);
        assert_eq!(bar.pattern, "bar-1.0");
    }

    #[test]
    fn cycles_terminate() {
        let (store, pkgs) = remote_store(&[
            ("ouro-1.0", &["boros>=1.0"][..]),
            ("boros-1.0", &["ouro>=1.0"][..]),
        ]);
        let tree = full_dep_tree(&store, &pkgs, "ouro", DepDirection::RemoteForward).unwrap();
        // both stems appear exactly once, the cycle does not loop
        assert_eq!(tree.len(), 2);
    }
}
