//! User-pinned version preferences.
//!
//! The preferences file lists one `name<op>version-glob` entry per line,
//! `op` being `=`, `<` or `>`. During resolution a candidate whose stem is
//! pinned must also match the pinned pattern, otherwise it is rejected.

use std::path::Path;

use tracing::debug;

use crate::pattern::{pkg_match, split_fullname};

#[derive(Clone, Debug)]
struct PrefEntry {
    /// Stem the pin applies to.
    name: String,
    /// Pattern the candidate full name must satisfy.
    glob: String,
}

/// The parsed preferences list. An absent file yields an empty list which
/// accepts everything.
#[derive(Clone, Debug, Default)]
pub struct Preferred {
    entries: Vec<PrefEntry>,
}

impl Preferred {
    pub fn load(path: &Path) -> Preferred {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(_) => Preferred::default(),
        }
    }

    pub fn parse(text: &str) -> Preferred {
        let mut entries = vec![];

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let pos = match line.find(['=', '<', '>']) {
                Some(pos) => pos,
                None => continue,
            };

            let name = line[..pos].to_owned();

            // "foo=1.*" means the package pattern "foo-1.*"
            let glob = if line.as_bytes()[pos] == b'=' {
                let mut glob = line.to_owned();
                glob.replace_range(pos..pos + 1, "-");
                glob
            } else {
                line.to_owned()
            };

            debug!(name, glob, "preferred entry");
            entries.push(PrefEntry { name, glob });
        }

        Preferred { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn pin_for(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.glob.as_str())
    }

    /// Check a candidate full name against its pin, if any.
    ///
    /// Returns the violated pin pattern when the candidate is pinned and the
    /// pin does not match, `None` when the candidate is acceptable.
    pub fn rejects(&self, full: &str) -> Option<&str> {
        let (name, _) = split_fullname(full);
        match self.pin_for(name) {
            Some(glob) if !pkg_match(glob, full) => Some(glob),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONF: &str = "\
# pin perl to 5.36 and anything mysql below 8
perl=5.36.*
mysql-server<8

autoconf>2.60
";

    #[test]
    fn parses_entries_and_comments() {
        let pref = Preferred::parse(CONF);
        assert!(!pref.is_empty());
        assert_eq!(pref.pin_for("perl"), Some("perl-5.36.*"));
        assert_eq!(pref.pin_for("mysql-server"), Some("mysql-server<8"));
        assert_eq!(pref.pin_for("autoconf"), Some("autoconf>2.60"));
        assert_eq!(pref.pin_for("gcc"), None);
    }

    #[test]
    fn rejects_only_pinned_mismatches() {
        let pref = Preferred::parse(CONF);
        assert!(pref.rejects("perl-5.36.1").is_none());
        assert_eq!(pref.rejects("perl-5.38.0"), Some("perl-5.36.*"));
        assert!(pref.rejects("mysql-server-5.7").is_none());
        assert_eq!(pref.rejects("mysql-server-8.1"), Some("mysql-server<8"));
        // unpinned packages are never rejected
        assert!(pref.rejects("gcc-13.1").is_none());
    }

    #[test]
    fn filtering_is_idempotent() {
        let pref = Preferred::parse(CONF);
        let candidates = ["perl-5.36.1", "perl-5.38.0", "gcc-13.1"];
        let once: Vec<_> = candidates
            .iter()
            .filter(|c| pref.rejects(c).is_none())
            .collect();
        let twice: Vec<_> = once.iter().filter(|c| pref.rejects(c).is_none()).collect();
        assert_eq!(once.len(), twice.len());
        assert_eq!(once, vec![&"perl-5.36.1", &"gcc-13.1"]);
    }
}
