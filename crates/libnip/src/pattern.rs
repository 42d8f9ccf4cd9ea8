//! Dependency pattern matching.
//!
//! A dependency pattern is one of: an exact full name (`foo-1.2`), a shell
//! glob (`foo-[0-9]*`), a relational constraint (`foo>=1.2`, `foo>1<2`), a
//! csh-style brace alternation (`{foo,bar}>=1.0`, possibly nested), or a
//! bare stem which implicitly means any version of that package.

use regex::Regex;

use crate::version::{dewey_cmp, DeweyOp, Version};

/// Characters that make a pattern non-literal.
const GLOB_CHARS: &[char] = &['{', '<', '>', '[', ']', '?', '*'];

/// Outcome of [`pkg_order`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkgOrder {
    First,
    Second,
    Neither,
}

/// Split a full package name into its stem and version.
///
/// `foo-bar-1.2nb1` splits at the last dash into (`foo-bar`, `1.2nb1`). A
/// name without a dash has an empty version.
pub fn split_fullname(full: &str) -> (&str, &str) {
    match full.rfind('-') {
        Some(pos) => (&full[..pos], &full[pos + 1..]),
        None => (full, ""),
    }
}

/// Whether `s` looks like a full name-with-version (`foo-1.2`).
///
/// Naive on purpose: a trailing component starting with a digit is assumed
/// to be a version. The few packages needing more get specified in full.
pub fn exact_pkgfmt(s: &str) -> bool {
    match s.rfind('-') {
        Some(pos) => s[pos + 1..].starts_with(|c: char| c.is_ascii_digit()),
        None => false,
    }
}

/// Whether `s` contains any pattern metacharacter.
pub fn is_glob(s: &str) -> bool {
    s.contains(GLOB_CHARS)
}

/// Extract the normalized stem a dependency pattern refers to, for indexing.
///
/// `{foo>=1.0,bar-[0-9]*}` yields `foo`, `baz>=2` yields `baz`,
/// `qux-1.0` yields `qux`. Returns `None` for an empty pattern.
pub fn pkgname_from_pattern(pattern: &str) -> Option<String> {
    if pattern.is_empty() {
        return None;
    }

    // worst case first, {foo>=1.0,bar-[0-9]*}: keep the first alternative
    let mut name = if let Some(stripped) = pattern.strip_prefix('{') {
        let inner = stripped.strip_suffix('}').unwrap_or(stripped);
        inner.split(',').next().unwrap_or(inner).to_owned()
    } else {
        pattern.to_owned()
    };

    // cut at the first metacharacter, then drop a trailing dash
    if let Some(pos) = name.find(GLOB_CHARS) {
        name.truncate(pos);
        if name.ends_with('-') {
            name.pop();
        }
    }

    // only a trailing version should remain, strip it
    if let Some(pos) = name.rfind('-') {
        let tail = &name[pos + 1..];
        if tail.starts_with(|c: char| c.is_ascii_digit()) && tail.contains('.') {
            name.truncate(pos);
        }
    }

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Fast check whether `pattern` can ever match `pkg`.
///
/// A match over the whole remote catalog compares thousands of candidates,
/// so the first eight literal (alphanumeric or dash) characters are compared
/// before the expensive stages run.
fn quick_pkg_match(pattern: &str, pkg: &str) -> bool {
    let p = pattern.as_bytes();
    let k = pkg.as_bytes();

    for i in 0..8 {
        let c = match p.get(i) {
            Some(&c) if c.is_ascii_alphanumeric() || c == b'-' => c,
            _ => return true,
        };
        if k.get(i) != Some(&c) {
            return false;
        }
    }
    true
}

/// Expand a csh-type alternation and recurse into [`pkg_match`].
fn alternate_match(pattern: &str, pkg: &str) -> bool {
    let open = match pattern.find('{') {
        Some(pos) => pos,
        None => return false,
    };

    // locate the matching closing brace, braces may nest
    let bytes = pattern.as_bytes();
    let mut depth = 0usize;
    let mut close = None;
    for (i, &c) in bytes.iter().enumerate().skip(open) {
        match c {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let close = match close {
        Some(pos) => pos,
        // malformed alternate, cannot match anything
        None => return false,
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];

    // split the alternation body on top-level commas only
    let body = &pattern[open + 1..close];
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut found = false;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            ',' if depth == 0 => {
                let candidate = format!("{}{}{}", prefix, &body[start..i], suffix);
                found |= pkg_match(&candidate, pkg);
                start = i + 1;
            }
            _ => {}
        }
    }
    let candidate = format!("{}{}{}", prefix, &body[start..], suffix);
    found | pkg_match(&candidate, pkg)
}

/// Relational match: `name>=1.0`, `name<2`, `name>=1.0<2nb3`.
fn dewey_match(pattern: &str, pkg: &str) -> bool {
    let split = match pattern.find(|c| c == '<' || c == '>') {
        Some(pos) => pos,
        None => return false,
    };
    let (name, mut constraints) = pattern.split_at(split);

    let (pkgname, pkgvers) = split_fullname(pkg);
    if pkgname != name || pkgvers.is_empty() {
        return false;
    }

    while !constraints.is_empty() {
        let (op, used) = match DeweyOp::parse(constraints) {
            Some(parsed) => parsed,
            None => return false,
        };
        constraints = &constraints[used..];

        let end = constraints
            .find(|c| c == '<' || c == '>')
            .unwrap_or(constraints.len());
        let wanted = &constraints[..end];
        constraints = &constraints[end..];

        if !dewey_cmp(pkgvers, op, wanted) {
            return false;
        }
    }
    true
}

/// Translate a shell glob into an anchored regular expression.
fn glob_to_regex(glob: &str) -> String {
    let mut re = String::with_capacity(glob.len() + 8);
    re.push('^');

    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '[' => {
                re.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    re.push('^');
                }
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    if inner == '\\' || inner == '^' && re.ends_with('[') {
                        re.push('\\');
                    }
                    re.push(inner);
                }
                re.push(']');
            }
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }

    re.push('$');
    re
}

fn glob_match(glob: &str, pkg: &str) -> bool {
    match Regex::new(&glob_to_regex(glob)) {
        Ok(re) => re.is_match(pkg),
        Err(_) => false,
    }
}

/// Match a full package name against a dependency pattern.
pub fn pkg_match(pattern: &str, pkg: &str) -> bool {
    if !quick_pkg_match(pattern, pkg) {
        return false;
    }

    if pattern.contains('{') {
        return alternate_match(pattern, pkg);
    }

    if pattern.contains(|c| c == '<' || c == '>') {
        return dewey_match(pattern, pkg);
    }

    if pattern.contains(|c| matches!(c, '*' | '?' | '[' | ']')) && glob_match(pattern, pkg) {
        return true;
    }

    if pattern == pkg {
        return true;
    }

    // globs and exact matches may omit the version, retry with any-version
    let versioned = format!("{}-[0-9]*", pattern);
    glob_match(&versioned, pkg)
}

/// Pick the greater of two full names matching `pattern`.
///
/// Returns [`PkgOrder::Neither`] when neither matches, the single matching
/// side when only one does, and the higher version on a double match with
/// ties broken towards `first`.
pub fn pkg_order(pattern: &str, first: Option<&str>, second: Option<&str>) -> PkgOrder {
    let first = first.filter(|p| pkg_match(pattern, p));
    let second = second.filter(|p| pkg_match(pattern, p));

    match (first, second) {
        (None, None) => PkgOrder::Neither,
        (Some(_), None) => PkgOrder::First,
        (None, Some(_)) => PkgOrder::Second,
        (Some(a), Some(b)) => {
            let va = Version::parse(split_fullname(a).1);
            let vb = Version::parse(split_fullname(b).1);
            match va.cmp(&vb) {
                std::cmp::Ordering::Less => PkgOrder::Second,
                std::cmp::Ordering::Greater => PkgOrder::First,
                std::cmp::Ordering::Equal => {
                    if a <= b {
                        PkgOrder::First
                    } else {
                        PkgOrder::Second
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_implicit_version() {
        assert!(pkg_match("foo-1.0", "foo-1.0"));
        assert!(!pkg_match("foo-1.0", "foo-1.1"));
        assert!(pkg_match("foo", "foo-1.0"));
        assert!(!pkg_match("foo", "foobar-1.0"));
    }

    #[test]
    fn glob_patterns() {
        assert!(pkg_match("foo-[0-9]*", "foo-1.0"));
        assert!(!pkg_match("foo-[0-9]*", "foo-bar-1.0"));
        assert!(pkg_match("foo-?.?", "foo-1.0"));
        assert!(pkg_match("py3*-setuptools", "py311-setuptools-68.0"));
    }

    #[test]
    fn relational_patterns() {
        assert!(pkg_match("foo>=1.0", "foo-1.0"));
        assert!(pkg_match("foo>=1.0", "foo-2.3nb1"));
        assert!(!pkg_match("foo>=2.0", "foo-1.9"));
        assert!(pkg_match("foo>=1.0<2.0", "foo-1.5"));
        assert!(!pkg_match("foo>=1.0<2.0", "foo-2.0"));
        assert!(pkg_match("foo<1.0", "foo-0.9"));
        assert!(!pkg_match("foo>=1.0", "foobar-1.0"));
    }

    #[test]
    fn alternate_patterns() {
        assert!(pkg_match("{foo,bar}>=1.0", "bar-1.2"));
        assert!(pkg_match("{foo,bar}>=1.0", "foo-1.2"));
        assert!(!pkg_match("{foo,bar}>=1.0", "baz-1.2"));
        assert!(pkg_match("foo-{bar,baz}-[0-9]*", "foo-baz-2.0"));
        assert!(pkg_match("{{mozilla,}-esr,}firefox>=60", "firefox-91.0"));
        assert!(pkg_match("foo-1.0{,nb[0-9]*}", "foo-1.0nb3"));
        assert!(pkg_match("foo-1.0{,nb[0-9]*}", "foo-1.0"));
    }

    #[test]
    fn quick_reject() {
        assert!(!pkg_match("libreoffice>=7", "libreoffica-7.0"));
        // differing beyond the eight-char window still matches the slow path
        assert!(pkg_match("verylongname>=1", "verylongname-2.0"));
    }

    #[test]
    fn stem_extraction() {
        assert_eq!(pkgname_from_pattern("foo>=1.0").as_deref(), Some("foo"));
        assert_eq!(pkgname_from_pattern("foo-[0-9]*").as_deref(), Some("foo"));
        assert_eq!(
            pkgname_from_pattern("{foo>=1.0,bar-[0-9]*}").as_deref(),
            Some("foo")
        );
        assert_eq!(pkgname_from_pattern("foo-1.0").as_deref(), Some("foo"));
        assert_eq!(
            pkgname_from_pattern("foo-bar-2.1nb4").as_deref(),
            Some("foo-bar")
        );
        assert_eq!(pkgname_from_pattern(""), None);
    }

    #[test]
    fn ordering() {
        assert_eq!(
            pkg_order("foo>=1.0", Some("foo-1.2"), Some("foo-2.0")),
            PkgOrder::Second
        );
        assert_eq!(
            pkg_order("foo>=1.0", Some("foo-2.0"), Some("foo-0.9")),
            PkgOrder::First
        );
        assert_eq!(pkg_order("foo>=1.0", None, None), PkgOrder::Neither);
        assert_eq!(
            pkg_order("foo>=1.0", Some("foo-1.0"), Some("foo-1.0")),
            PkgOrder::First
        );
    }

    #[test]
    fn fullname_split() {
        assert_eq!(split_fullname("foo-bar-1.2nb1"), ("foo-bar", "1.2nb1"));
        assert_eq!(split_fullname("foo"), ("foo", ""));
        assert!(exact_pkgfmt("foo-1.0"));
        assert!(!exact_pkgfmt("foo-bar"));
        assert!(!exact_pkgfmt("foo"));
    }
}
