//! Version identifier comparison.
//!
//! Upstream identifiers come in several shapes: release tags (`v1.4.2`),
//! commit hashes for branch installs, date stamps, and arbitrary strings.
//! Comparing across shapes is not meaningful, so [`compare`] returns
//! [`VersionStatus::Unknown`] instead of inventing an order. Callers treat
//! `Unknown` as "re-fetch and warn".

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Result of comparing an installed version with the latest upstream one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    UpToDate,
    Outdated,
    Unknown,
}

impl VersionStatus {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            VersionStatus::UpToDate => "up-to-date",
            VersionStatus::Outdated => "outdated",
            VersionStatus::Unknown => "unknown",
        }
    }

    /// Whether a download is warranted.
    pub fn needs_fetch(&self) -> bool {
        !matches!(self, VersionStatus::UpToDate)
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A parsed version identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionId {
    /// Dot-separated integers with an optional pre-release suffix.
    Numeric {
        segments: Vec<u64>,
        pre: Option<String>,
    },
    /// Git commit hash (lowercase).
    Commit(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Anything else, compared by raw equality.
    Opaque(String),
}

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[vV]?(\d+(?:\.\d+)*)(?:-([0-9A-Za-z.\-]+))?(?:\+[0-9A-Za-z.\-]+)?$")
            .expect("valid regex")
    })
}

fn commit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{7,40}$").expect("valid regex"))
}

impl VersionId {
    /// Classify a raw identifier.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();

        if let Some(date) = parse_date(raw) {
            return VersionId::Date(date);
        }

        if let Some(caps) = numeric_re().captures(raw) {
            let parsed: Option<Vec<u64>> = caps[1].split('.').map(|s| s.parse().ok()).collect();
            if let Some(mut segments) = parsed {
                while segments.len() > 1 && segments.last() == Some(&0) {
                    segments.pop();
                }
                return VersionId::Numeric {
                    segments,
                    pre: caps.get(2).map(|m| m.as_str().to_string()),
                };
            }
        }

        if commit_re().is_match(raw) && raw.chars().any(|c| c.is_ascii_alphabetic()) {
            return VersionId::Commit(raw.to_ascii_lowercase());
        }

        VersionId::Opaque(raw.to_string())
    }

    /// Name of the identifier scheme.
    pub fn scheme(&self) -> &'static str {
        match self {
            VersionId::Numeric { .. } => "numeric",
            VersionId::Commit(_) => "commit",
            VersionId::Date(_) => "date",
            VersionId::Opaque(_) => "opaque",
        }
    }

    /// Whether both identifiers denote the same version.
    pub fn same_as(&self, other: &VersionId) -> Option<bool> {
        match (self, other) {
            (
                VersionId::Numeric { segments: a, pre: pa },
                VersionId::Numeric { segments: b, pre: pb },
            ) => Some(a == b && pa == pb),
            (VersionId::Commit(a), VersionId::Commit(b)) => {
                Some(a.starts_with(b.as_str()) || b.starts_with(a.as_str()))
            }
            (VersionId::Date(a), VersionId::Date(b)) => Some(a == b),
            (VersionId::Opaque(a), VersionId::Opaque(b)) => Some(a == b),
            _ => None,
        }
    }

    /// Order two identifiers when their scheme has a natural order.
    pub fn order(&self, other: &VersionId) -> Option<Ordering> {
        match (self, other) {
            (
                VersionId::Numeric { segments: a, pre: pa },
                VersionId::Numeric { segments: b, pre: pb },
            ) => {
                let len = a.len().max(b.len());
                let pad = |v: &Vec<u64>, i: usize| v.get(i).copied().unwrap_or(0);
                let by_segments = (0..len)
                    .map(|i| pad(a, i).cmp(&pad(b, i)))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal);

                // A pre-release sorts before the release it precedes.
                Some(by_segments.then_with(|| match (pa, pb) {
                    (None, None) => Ordering::Equal,
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(x), Some(y)) => x.cmp(y),
                }))
            }
            (VersionId::Date(a), VersionId::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let candidate = raw.strip_prefix('v').unwrap_or(raw);
    NaiveDate::parse_from_str(candidate, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            if candidate.len() == 8 && candidate.chars().all(|c| c.is_ascii_digit()) {
                NaiveDate::parse_from_str(candidate, "%Y%m%d").ok()
            } else {
                None
            }
        })
}

/// Compare an installed version against the latest upstream version.
pub fn compare(local: &str, remote: &str) -> VersionStatus {
    if local.trim() == remote.trim() {
        return VersionStatus::UpToDate;
    }

    let local = VersionId::parse(local);
    let remote = VersionId::parse(remote);

    match local.same_as(&remote) {
        Some(true) => VersionStatus::UpToDate,
        Some(false) => VersionStatus::Outdated,
        None => VersionStatus::Unknown,
    }
}

/// Compare versions that were resolved on possibly different branches.
///
/// Versions from different branches are not comparable.
pub fn compare_on_branch(
    local_branch: Option<&str>,
    remote_branch: Option<&str>,
    local: &str,
    remote: &str,
) -> VersionStatus {
    if local_branch != remote_branch {
        return VersionStatus::Unknown;
    }
    compare(local, remote)
}

/// Direction of a version change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upgrade,
    Downgrade,
    Reinstall,
    Changed,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Upgrade => "upgrade",
            Direction::Downgrade => "downgrade",
            Direction::Reinstall => "reinstall",
            Direction::Changed => "change",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Describe a version transition for log output.
pub fn describe_change(from: &str, to: &str) -> Direction {
    match VersionId::parse(from).order(&VersionId::parse(to)) {
        Some(Ordering::Less) => Direction::Upgrade,
        Some(Ordering::Greater) => Direction::Downgrade,
        Some(Ordering::Equal) => Direction::Reinstall,
        None => Direction::Changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_are_up_to_date() {
        assert_eq!(compare("v1.2.3", "v1.2.3"), VersionStatus::UpToDate);
        assert_eq!(compare("nightly", "nightly"), VersionStatus::UpToDate);
        assert_eq!(compare(" 1.0 ", "1.0"), VersionStatus::UpToDate);
    }

    #[test]
    fn numeric_normalization() {
        assert_eq!(compare("v1.2", "1.2.0"), VersionStatus::UpToDate);
        assert_eq!(compare("V2", "2.0.0"), VersionStatus::UpToDate);
        assert_eq!(compare("1.2.0", "1.2.1"), VersionStatus::Outdated);
    }

    #[test]
    fn numeric_newer_local_is_still_outdated() {
        // Installed copy differs from what upstream calls latest.
        assert_eq!(compare("2.0.0", "1.9.0"), VersionStatus::Outdated);
    }

    #[test]
    fn prerelease_differs_from_release() {
        assert_eq!(compare("1.0.0-rc.1", "1.0.0"), VersionStatus::Outdated);
        assert_eq!(compare("1.0.0-rc.1", "v1.0.0-rc.1"), VersionStatus::UpToDate);
    }

    #[test]
    fn build_metadata_is_ignored() {
        assert_eq!(compare("1.0.0+linux", "1.0.0"), VersionStatus::UpToDate);
    }

    #[test]
    fn commits_compare_by_prefix() {
        let full = "3f2a9c1d8e7b6a5f4e3d2c1b0a9f8e7d6c5b4a39";
        assert_eq!(compare("3f2a9c1", full), VersionStatus::UpToDate);
        assert_eq!(compare(&full.to_uppercase(), full), VersionStatus::UpToDate);
        assert_eq!(compare("abcdef1", full), VersionStatus::Outdated);
    }

    #[test]
    fn dates_compare() {
        assert_eq!(compare("2024-01-05", "20240105"), VersionStatus::UpToDate);
        assert_eq!(compare("2024-01-05", "2024-02-01"), VersionStatus::Outdated);
    }

    #[test]
    fn mixed_schemes_are_unknown() {
        assert_eq!(compare("v1.2.3", "3f2a9c1d"), VersionStatus::Unknown);
        assert_eq!(compare("2024-01-05", "1.0"), VersionStatus::Unknown);
        assert_eq!(compare("latest", "1.0"), VersionStatus::Unknown);
    }

    #[test]
    fn opaque_strings_use_equality() {
        assert_eq!(compare("stable", "beta"), VersionStatus::Outdated);
    }

    #[test]
    fn different_branches_are_unknown() {
        assert_eq!(
            compare_on_branch(Some("main"), Some("dev"), "abcdef1", "abcdef1"),
            VersionStatus::Unknown
        );
        assert_eq!(
            compare_on_branch(None, Some("dev"), "1.0", "1.0"),
            VersionStatus::Unknown
        );
        assert_eq!(
            compare_on_branch(Some("dev"), Some("dev"), "abcdef1", "abcdef1"),
            VersionStatus::UpToDate
        );
    }

    #[test]
    fn compare_is_deterministic() {
        let pairs = [("1.0", "1.1"), ("abc1234", "1.0"), ("x", "y"), ("", "1.0")];
        for (a, b) in pairs {
            let first = compare(a, b);
            for _ in 0..10 {
                assert_eq!(compare(a, b), first);
            }
        }
    }

    #[test]
    fn parse_classifies_schemes() {
        assert_eq!(VersionId::parse("v1.2.3").scheme(), "numeric");
        assert_eq!(VersionId::parse("1234567").scheme(), "numeric");
        assert_eq!(VersionId::parse("deadbeef").scheme(), "commit");
        assert_eq!(VersionId::parse("2023-12-31").scheme(), "date");
        assert_eq!(VersionId::parse("release-candidate").scheme(), "opaque");
        assert_eq!(VersionId::parse("").scheme(), "opaque");
    }

    #[test]
    fn order_numeric_segments() {
        let a = VersionId::parse("1.9.9");
        let b = VersionId::parse("1.10.0");
        assert_eq!(a.order(&b), Some(Ordering::Less));
        assert_eq!(
            VersionId::parse("1.0.0-rc.1").order(&VersionId::parse("1.0.0")),
            Some(Ordering::Less)
        );
        assert_eq!(
            VersionId::parse("deadbeef").order(&VersionId::parse("cafebabe")),
            None
        );
    }

    #[test]
    fn describe_change_direction() {
        assert_eq!(describe_change("1.0.0", "1.1.0"), Direction::Upgrade);
        assert_eq!(describe_change("2.0.0", "1.1.0"), Direction::Downgrade);
        assert_eq!(describe_change("1.0", "1.0.0"), Direction::Reinstall);
        assert_eq!(describe_change("deadbeef", "cafebabe"), Direction::Changed);
        assert_eq!(Direction::Changed.to_string(), "change");
    }

    #[test]
    fn status_labels() {
        assert_eq!(VersionStatus::UpToDate.to_string(), "up-to-date");
        assert!(VersionStatus::Unknown.needs_fetch());
        assert!(!VersionStatus::UpToDate.needs_fetch());
    }
}
