//! Plan ordering.
//!
//! Two level-sorted sequences are produced from an impact list, shaped so
//! the external installer never has to fetch or reorder anything itself:
//! installs run dependencies before dependents, removals run dependents
//! before dependencies.
//!
//! Install levels are taken from the resolution tree. Removal levels are
//! recomputed against the live installed reverse-dependency graph, because
//! the install-time forward levels say nothing about who depends on a
//! package today.

use std::collections::HashMap;

use crate::error::Fallible;
use crate::impact::ImpactEntry;
use crate::store::CatalogStore;

/// One package of the ordered install sequence.
#[derive(Clone, Debug)]
pub struct InstallStep {
    pub full: String,
    /// Download size, `-1` marks a fetch-failed package the executor skips.
    pub file_size: i64,
    /// Install level: every dependency of a step has a smaller or equal
    /// level, steps are emitted level-ascending.
    pub level: i32,
    /// Whether this step replaces an older installed version.
    pub upgrade: bool,
}

/// One package of the ordered removal sequence.
#[derive(Clone, Debug)]
pub struct RemoveStep {
    pub full: String,
    /// Removal level: a reverse dependent carries a greater level than the
    /// package it depends on, steps are emitted level-descending.
    pub level: i32,
    /// True when the removal is the delete-half of an upgrade.
    pub upgrade: bool,
}

/// Order the to-install half of an impact list.
///
/// Resolution levels grow away from the requested roots, so deeper levels
/// are emitted first. Emitted levels are renumbered ascending from zero,
/// ties inside a level break lexicographically for reproducible plans.
pub fn order_install(impact: &[ImpactEntry]) -> Vec<InstallStep> {
    let entries: Vec<&ImpactEntry> = impact
        .iter()
        .filter(|e| e.is_install() || e.is_upgrade())
        .collect();

    let max_level = entries.iter().map(|e| e.level).max().unwrap_or(0);

    let mut steps = vec![];
    let mut emitted_level = 0;
    for level in (0..=max_level).rev() {
        let mut group: Vec<&ImpactEntry> =
            entries.iter().filter(|e| e.level == level).copied().collect();
        if group.is_empty() {
            continue;
        }
        group.sort_by(|a, b| a.full.cmp(&b.full));
        for entry in group {
            steps.push(InstallStep {
                full: entry.full.clone(),
                file_size: entry.file_size,
                level: emitted_level,
                upgrade: entry.is_upgrade(),
            });
        }
        emitted_level += 1;
    }

    steps
}

/// A package pending removal, before ordering.
#[derive(Clone, Debug)]
pub struct RemoveCandidate {
    /// Installed full name to delete.
    pub full: String,
    /// Stem of `full`.
    pub name: String,
    /// True when the deletion precedes a reinstall.
    pub upgrade: bool,
}

/// Order a removal set: dependents strictly before their dependencies.
///
/// Levels are recomputed from the installed reverse-dependency graph
/// restricted to the removal set. A package nothing in the set depends on
/// conceptually sits deepest and goes first. A singleton set skips the
/// graph walk entirely.
pub fn order_remove(
    store: &CatalogStore,
    candidates: &[RemoveCandidate],
) -> Fallible<Vec<RemoveStep>> {
    if candidates.len() == 1 {
        return Ok(vec![RemoveStep {
            full: candidates[0].full.clone(),
            level: 0,
            upgrade: candidates[0].upgrade,
        }]);
    }

    let index: HashMap<&str, usize> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.as_str(), i))
        .collect();

    // depends_on[i] lists set members package i depends on, derived from
    // one reverse-dependency query per member
    let mut depends_on: Vec<Vec<usize>> = vec![vec![]; candidates.len()];
    for (qi, q) in candidates.iter().enumerate() {
        for rdep in store.local_reverse_deps(&q.name)? {
            if let Some(&ri) = index.get(rdep.name.as_str()) {
                if ri != qi {
                    depends_on[ri].push(qi);
                }
            }
        }
    }

    // level(p) = 1 + max level of the packages p depends on, so reverse
    // dependents always carry the greater level
    let mut levels: Vec<i32> = vec![0; candidates.len()];
    let mut state: Vec<u8> = vec![0; candidates.len()]; // 0 new, 1 visiting, 2 done

    fn visit(i: usize, depends_on: &[Vec<usize>], levels: &mut [i32], state: &mut [u8]) -> i32 {
        if state[i] == 2 {
            return levels[i];
        }
        if state[i] == 1 {
            // dependency cycle, cut it off
            return 0;
        }
        state[i] = 1;
        let mut level = 1;
        for &dep in &depends_on[i] {
            level = level.max(1 + visit(dep, depends_on, levels, state));
        }
        state[i] = 2;
        levels[i] = level;
        level
    }

    for i in 0..candidates.len() {
        visit(i, &depends_on, &mut levels, &mut state);
    }

    let max_level = levels.iter().copied().max().unwrap_or(0);
    let mut steps = vec![];
    for level in (0..=max_level).rev() {
        let mut group: Vec<usize> = (0..candidates.len())
            .filter(|&i| levels[i] == level)
            .collect();
        group.sort_by(|&a, &b| candidates[a].full.cmp(&candidates[b].full));
        for i in group {
            steps.push(RemoveStep {
                full: candidates[i].full.clone(),
                level,
                upgrade: candidates[i].upgrade,
            });
        }
    }

    Ok(steps)
}

/// Build the removal candidates of an upgrade transaction: the old half of
/// every upgrade plus the break-dependency removals.
pub fn upgrade_remove_candidates(impact: &[ImpactEntry]) -> Vec<RemoveCandidate> {
    let mut candidates = vec![];
    for entry in impact {
        if let Some(old) = entry.old() {
            candidates.push(RemoveCandidate {
                full: old.to_owned(),
                name: crate::pattern::split_fullname(old).0.to_owned(),
                upgrade: true,
            });
        } else if entry.is_remove() {
            candidates.push(RemoveCandidate {
                full: entry.full.clone(),
                name: entry.name.clone(),
                upgrade: false,
            });
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::{ImpactAction, ImpactEntry};
    use crate::summary::SummaryRecord;

    fn entry(full: &str, action: ImpactAction, level: i32) -> ImpactEntry {
        ImpactEntry {
            depend: full.to_owned(),
            full: full.to_owned(),
            name: crate::pattern::split_fullname(full).0.to_owned(),
            action,
            level,
            file_size: 100,
            size_pkg: 200,
        }
    }

    #[test]
    fn install_order_runs_dependencies_first() {
        let impact = vec![
            entry("bar-1.0", ImpactAction::Install, 0),
            entry("foo-1.0", ImpactAction::Install, 1),
        ];
        let steps = order_install(&impact);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].full, "foo-1.0");
        assert_eq!(steps[1].full, "bar-1.0");
        // dependencies never carry a greater emitted level
        assert!(steps[0].level <= steps[1].level);
    }

    #[test]
    fn install_order_is_lexicographic_within_a_level() {
        let impact = vec![
            entry("zlib-1.3", ImpactAction::Install, 1),
            entry("bzip2-1.0", ImpactAction::Install, 1),
            entry("app-1.0", ImpactAction::Install, 0),
        ];
        let steps = order_install(&impact);
        assert_eq!(steps[0].full, "bzip2-1.0");
        assert_eq!(steps[1].full, "zlib-1.3");
        assert_eq!(steps[2].full, "app-1.0");
        assert_eq!(steps[0].level, steps[1].level);
    }

    #[test]
    fn removals_skip_the_remove_only_entries() {
        let impact = vec![
            entry("bar-1.0", ImpactAction::Remove, 0),
            entry(
                "foo-2.0",
                ImpactAction::Upgrade {
                    old: "foo-1.0".to_owned(),
                },
                0,
            ),
        ];
        let steps = order_install(&impact);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].full, "foo-2.0");

        let candidates = upgrade_remove_candidates(&impact);
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().any(|c| c.full == "foo-1.0" && c.upgrade));
        assert!(candidates.iter().any(|c| c.full == "bar-1.0" && !c.upgrade));
    }

    #[test]
    fn remove_order_deletes_dependents_first() {
        // bar depends on foo, baz depends on bar
        let mut store = crate::store::CatalogStore::open_in_memory().unwrap();
        let mut records = vec![];
        for (full, deps) in [
            ("foo-1.0", vec![]),
            ("bar-1.0", vec!["foo>=1.0"]),
            ("baz-1.0", vec!["bar>=1.0"]),
        ] {
            let mut rec = SummaryRecord::from_pkgname(full);
            for dep in deps {
                rec.push_depend(dep);
            }
            records.push(rec);
        }
        store.replace_local(&records).unwrap();

        let candidates = vec![
            RemoveCandidate {
                full: "foo-1.0".into(),
                name: "foo".into(),
                upgrade: false,
            },
            RemoveCandidate {
                full: "bar-1.0".into(),
                name: "bar".into(),
                upgrade: false,
            },
            RemoveCandidate {
                full: "baz-1.0".into(),
                name: "baz".into(),
                upgrade: false,
            },
        ];

        let steps = order_remove(&store, &candidates).unwrap();
        let pos = |full: &str| steps.iter().position(|s| s.full == full).unwrap();
        assert!(pos("baz-1.0") < pos("bar-1.0"));
        assert!(pos("bar-1.0") < pos("foo-1.0"));

        // a reverse dependent carries a greater level than its dependency
        let level = |full: &str| steps[pos(full)].level;
        assert!(level("baz-1.0") > level("bar-1.0"));
        assert!(level("bar-1.0") > level("foo-1.0"));
    }

    #[test]
    fn singleton_removal_short_circuits() {
        let store = crate::store::CatalogStore::open_in_memory().unwrap();
        let candidates = vec![RemoveCandidate {
            full: "foo-1.0".into(),
            name: "foo".into(),
            upgrade: false,
        }];
        let steps = order_remove(&store, &candidates).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].level, 0);
    }
}
