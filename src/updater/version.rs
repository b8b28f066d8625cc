//! Multi-segment version precedence.
//!
//! Versions are canonicalized by turning `_`, `-` and `+` into `.` and by
//! splitting wherever digits meet non-digits, so `1.0.0-beta2` becomes
//! `1 . 0 . 0 . beta . 2`. Segments compare pairwise: numbers numerically,
//! tags by rank (`dev < alpha = a < beta = b < RC = rc < number < pl = p`,
//! unknown tags below `dev`). A tag takes the rank of the first special form
//! it starts with, so `patch1` counts as `p` and `bugfix` as `b`. An empty
//! version precedes every other one. When one side runs out, a remaining number
//! makes the longer version newer and a remaining tag is ranked against a
//! number, so `1.0 < 1.0.0` and `1.0.0-beta < 1.0.0`.

use std::cmp::Ordering;
use std::convert::Infallible;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Number(u64),
    Tag(String),
}

impl Segment {
    fn rank(&self) -> i8 {
        match self {
            Segment::Number(_) => 4,
            Segment::Tag(tag) => tag_rank(tag),
        }
    }
}

/// Special forms in lookup order; a tag takes the rank of the first form
/// it starts with, so `patch` ranks as `p` and `bugfix` as `b`
const SPECIAL_FORMS: [(&str, i8); 10] = [
    ("dev", 0),
    ("alpha", 1),
    ("a", 1),
    ("beta", 2),
    ("b", 2),
    ("RC", 3),
    ("rc", 3),
    ("#", 4),
    ("pl", 5),
    ("p", 5),
];

/// Rank of tags matching no special form
const UNKNOWN_RANK: i8 = -6;

fn tag_rank(tag: &str) -> i8 {
    SPECIAL_FORMS
        .iter()
        .find(|(form, _)| tag.starts_with(form))
        .map(|&(_, rank)| rank)
        .unwrap_or(UNKNOWN_RANK)
}

fn compare_segments(left: &Segment, right: &Segment) -> Ordering {
    match (left, right) {
        (Segment::Number(l), Segment::Number(r)) => l.cmp(r),
        _ => left.rank().cmp(&right.rank()),
    }
}

/// A version string split into comparable segments
#[derive(Clone, Debug)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

impl Version {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            segments: canonicalize(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Version {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // An empty version precedes every non-empty one
        match (self.raw.is_empty(), other.raw.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        let mut left = self.segments.iter();
        let mut right = other.segments.iter();

        loop {
            match (left.next(), right.next()) {
                (Some(l), Some(r)) => match compare_segments(l, r) {
                    Ordering::Equal => continue,
                    unequal => return unequal,
                },
                (Some(l), None) => return tail_order(l),
                (None, Some(r)) => return tail_order(r).reverse(),
                (None, None) => return Ordering::Equal,
            }
        }
    }
}

/// Order of a longer version relative to the shorter one it extends
fn tail_order(extra: &Segment) -> Ordering {
    match extra {
        Segment::Number(_) => Ordering::Greater,
        Segment::Tag(_) => extra.rank().cmp(&tag_rank("#")),
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// Compare two version strings by precedence
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    Version::new(left).cmp(&Version::new(right))
}

/// True when `available` takes precedence over `installed`
pub fn is_newer(installed: &str, available: &str) -> bool {
    compare_versions(installed, available) == Ordering::Less
}

fn canonicalize(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut current_is_digit = false;

    for c in raw.trim().chars() {
        if matches!(c, '.' | '_' | '-' | '+') {
            flush(&mut current, &mut segments);
            continue;
        }

        let is_digit = c.is_ascii_digit();
        if !current.is_empty() && is_digit != current_is_digit {
            flush(&mut current, &mut segments);
        }
        current_is_digit = is_digit;
        current.push(c);
    }
    flush(&mut current, &mut segments);

    segments
}

fn flush(current: &mut String, segments: &mut Vec<Segment>) {
    if current.is_empty() {
        return;
    }
    let text = std::mem::take(current);
    let segment = if text.chars().all(|c| c.is_ascii_digit()) {
        Segment::Number(text.parse().unwrap_or(u64::MAX))
    } else {
        Segment::Tag(text)
    };
    segments.push(segment);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lt(a: &str, b: &str) {
        assert_eq!(compare_versions(a, b), Ordering::Less, "{a} < {b}");
        assert_eq!(compare_versions(b, a), Ordering::Greater, "{b} > {a}");
    }

    #[test]
    fn numeric_segments_compare_numerically() {
        lt("1.2.0", "1.2.1");
        lt("1.9", "1.10");
        lt("2.0.0", "2.1.0");
        lt("0.9.99", "1.0");
    }

    #[test]
    fn pre_releases_sort_before_release() {
        lt("1.0.0-beta", "1.0.0");
        lt("1.0.0-alpha", "1.0.0-beta");
        lt("1.0.0-dev", "1.0.0-alpha");
        lt("1.0.0-RC1", "1.0.0");
        lt("1.0.0-beta2", "1.0.0-rc1");
        lt("1.0.0rc1", "1.0.0rc2");
        lt("1.0.0", "1.0.0-pl1");
    }

    #[test]
    fn shorter_version_is_older_when_extended_by_number() {
        lt("1.0", "1.0.0");
        lt("1", "1.0.1");
    }

    #[test]
    fn equivalent_spellings_are_equal() {
        assert_eq!(compare_versions("2.1.0", "2.1.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.0-beta", "1.0.0.b"), Ordering::Equal);
        assert_eq!(compare_versions("1_0+0", "1.0.0"), Ordering::Equal);
        assert_eq!(Version::new("1.0a1"), Version::new("1.0.alpha.1"));
    }

    #[test]
    fn unknown_tags_rank_lowest() {
        lt("1.0.0-foo", "1.0.0-dev");
    }

    #[test]
    fn tags_rank_by_special_form_prefix() {
        lt("1.0.0", "1.0.0-patch1");
        lt("1.0.0", "1.0.0-preview");
        lt("1.0.0-dev", "1.0.0-bugfix");
        lt("1.0.0-alpha", "1.0.0-bugfix");
        lt("1.0.0-bugfix", "1.0.0-rc1");
        lt("1.0.0-develop", "1.0.0-alpha");
        assert_eq!(compare_versions("1.0.0-bugfix", "1.0.0-b"), Ordering::Equal);
    }

    #[test]
    fn empty_version_is_lowest() {
        lt("", "beta");
        lt("", "0");
        lt("", "foo");
        assert_eq!(compare_versions("", ""), Ordering::Equal);
        assert!(is_newer("", "1.0.0"));
    }

    #[test]
    fn is_newer_matches_less_than() {
        assert!(is_newer("2.0.0", "2.1.0"));
        assert!(!is_newer("2.1.0", "2.1.0"));
        assert!(!is_newer("2.2.0", "2.1.0"));
    }

    proptest! {
        #[test]
        fn numeric_triples_follow_tuple_order(
            a in (0u64..50, 0u64..50, 0u64..50),
            b in (0u64..50, 0u64..50, 0u64..50),
        ) {
            let left = format!("{}.{}.{}", a.0, a.1, a.2);
            let right = format!("{}.{}.{}", b.0, b.1, b.2);
            prop_assert_eq!(compare_versions(&left, &right), a.cmp(&b));
        }

        #[test]
        fn ordering_is_antisymmetric(a in "[0-9a-z.\\-]{0,12}", b in "[0-9a-z.\\-]{0,12}") {
            prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
        }
    }
}
