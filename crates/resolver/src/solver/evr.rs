//! RPM version ordering

use repofetch_types::format_evr;
use std::cmp::Ordering;

/// Compare two version or release strings the way rpm does
///
/// Strings are split into alternating numeric and alphabetic segments.
/// Numeric segments compare numerically and beat alphabetic ones, `~`
/// sorts before anything (even the end of the string) and `^` sorts
/// after the end of the string but before any other segment.
#[must_use]
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let one = a.as_bytes();
    let two = b.as_bytes();
    let (mut i, mut j) = (0, 0);

    loop {
        while i < one.len() && !is_segment_byte(one[i]) {
            i += 1;
        }
        while j < two.len() && !is_segment_byte(two[j]) {
            j += 1;
        }

        let x = one.get(i).copied();
        let y = two.get(j).copied();

        if x == Some(b'~') || y == Some(b'~') {
            if x != Some(b'~') {
                return Ordering::Greater;
            }
            if y != Some(b'~') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if x == Some(b'^') || y == Some(b'^') {
            match (x, y) {
                (None, _) => return Ordering::Less,
                (_, None) => return Ordering::Greater,
                (Some(c), _) if c != b'^' => return Ordering::Greater,
                (_, Some(c)) if c != b'^' => return Ordering::Less,
                _ => {}
            }
            i += 1;
            j += 1;
            continue;
        }

        let (Some(x), Some(_)) = (x, y) else {
            break;
        };

        let numeric = x.is_ascii_digit();
        let same_kind = |c: u8| {
            if numeric {
                c.is_ascii_digit()
            } else {
                c.is_ascii_alphabetic()
            }
        };
        let take = |s: &[u8], start: usize| {
            s[start..]
                .iter()
                .position(|c| !same_kind(*c))
                .map_or(s.len(), |n| start + n)
        };
        let end_one = take(one, i);
        let end_two = take(two, j);

        // segments of different kinds: numeric is newer
        if end_two == j {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let mut seg_one = &one[i..end_one];
        let mut seg_two = &two[j..end_two];
        if numeric {
            seg_one = trim_leading_zeros(seg_one);
            seg_two = trim_leading_zeros(seg_two);
            match seg_one.len().cmp(&seg_two.len()) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        match seg_one.cmp(seg_two) {
            Ordering::Equal => {}
            other => return other,
        }

        i = end_one;
        j = end_two;
    }

    match (i >= one.len(), j >= two.len()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

fn is_segment_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'~' || c == b'^'
}

fn trim_leading_zeros(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|c| *c != b'0').unwrap_or(s.len());
    &s[start..]
}

/// Epoch, version and release of a package or versioned dependency
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evr {
    pub epoch: u64,
    pub version: String,
    /// Empty when a dependency does not pin the release
    pub release: String,
}

impl Evr {
    #[must_use]
    pub fn new(epoch: Option<&str>, version: &str, release: Option<&str>) -> Self {
        Self {
            epoch: epoch.and_then(|e| e.trim().parse().ok()).unwrap_or(0),
            version: version.to_string(),
            release: release.unwrap_or_default().to_string(),
        }
    }

    /// Full ordering; the release only counts when both sides carry one
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| rpmvercmp(&self.version, &other.version))
            .then_with(|| {
                if self.release.is_empty() || other.release.is_empty() {
                    Ordering::Equal
                } else {
                    rpmvercmp(&self.release, &other.release)
                }
            })
    }
}

impl std::fmt::Display for Evr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_evr(
            &self.epoch.to_string(),
            &self.version,
            &self.release,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpmvercmp_basics() {
        assert_eq!(rpmvercmp("1.0", "1.0"), Ordering::Equal);
        assert_eq!(rpmvercmp("1.0", "1.0.1"), Ordering::Less);
        assert_eq!(rpmvercmp("2.10", "2.9"), Ordering::Greater);
        assert_eq!(rpmvercmp("1.01", "1.1"), Ordering::Equal);
        assert_eq!(rpmvercmp("1.0a", "1.0"), Ordering::Greater);
        assert_eq!(rpmvercmp("1.0", "1.a"), Ordering::Greater);
        assert_eq!(rpmvercmp("5.1.8", "5.1.8"), Ordering::Equal);
    }

    #[test]
    fn test_rpmvercmp_tilde_and_caret() {
        assert_eq!(rpmvercmp("1.0~rc1", "1.0"), Ordering::Less);
        assert_eq!(rpmvercmp("1.0~rc1", "1.0~rc2"), Ordering::Less);
        assert_eq!(rpmvercmp("1.0^git1", "1.0"), Ordering::Greater);
        assert_eq!(rpmvercmp("1.0^git1", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_epoch_dominates() {
        let old_epoch = Evr::new(Some("0"), "9.9", Some("1"));
        let new_epoch = Evr::new(Some("1"), "1.0", Some("1"));
        assert_eq!(old_epoch.compare(&new_epoch), Ordering::Less);
    }

    #[test]
    fn test_release_ignored_when_unpinned() {
        let pkg = Evr::new(None, "2.0", Some("3.el9"));
        let dep = Evr::new(None, "2.0", None);
        assert_eq!(pkg.compare(&dep), Ordering::Equal);
        assert_eq!(pkg.to_string(), "2.0-3.el9");
        assert_eq!(Evr::new(Some("2"), "1", Some("1")).to_string(), "2:1-1");
    }
}
