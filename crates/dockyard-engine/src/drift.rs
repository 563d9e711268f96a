//! Comparing one desired entity with its runtime counterpart.

use crate::runtime::{ContainerDetails, ContainerHandle, ContainerSpec, MountKind};
use std::collections::BTreeSet;
use std::fmt;

/// What the engine has to do for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drift {
    /// Nothing exists: create it.
    Absent,
    /// Exists and matches but is not running: start it.
    StoppedMatching,
    /// Exists, matches and runs: leave it alone.
    RunningMatching,
    /// Exists but no longer matches (running or not): destroy and recreate.
    RunningMismatched,
}

/// A single reason a site container no longer matches its declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    Image {
        expected: String,
        actual: String,
    },
    Mounts {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    ExtraHosts {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    Env {
        missing: Vec<String>,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image { expected, actual } => {
                write!(f, "image is {actual}, expected {expected}")
            }
            Self::Mounts { missing, unexpected } => write!(
                f,
                "mounts differ (missing: [{}], unexpected: [{}])",
                missing.join(", "),
                unexpected.join(", ")
            ),
            Self::ExtraHosts { missing, unexpected } => write!(
                f,
                "extra hosts differ (missing: [{}], unexpected: [{}])",
                missing.join(", "),
                unexpected.join(", ")
            ),
            Self::Env { missing } => write!(f, "environment lacks {}", missing.join(", ")),
        }
    }
}

fn set_diff(expected: &BTreeSet<String>, actual: &BTreeSet<String>) -> (Vec<String>, Vec<String>) {
    (
        expected.difference(actual).cloned().collect(),
        actual.difference(expected).cloned().collect(),
    )
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// `source:target`, the way `docker run -v` spells a bind.
fn bind_key(source: &str, target: &str) -> String {
    format!("{}:{}", normalize(source), normalize(target))
}

/// Every way `details` differs from `desired`. Empty means the container matches.
///
/// Bind mounts (source and target together) and extra hosts are compared as sets. Declared environment
/// entries only need to be present, since images add their own variables.
#[must_use]
pub fn compare_site(desired: &ContainerSpec, details: &ContainerDetails) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();

    if desired.image != details.image {
        mismatches.push(Mismatch::Image {
            expected: desired.image.clone(),
            actual: details.image.clone(),
        });
    }

    let expected_mounts: BTreeSet<String> = desired
        .mounts
        .iter()
        .filter(|m| m.kind == MountKind::Bind)
        .map(|m| bind_key(&m.source, &m.target))
        .collect();
    let actual_mounts: BTreeSet<String> = details
        .binds
        .iter()
        .map(|b| bind_key(&b.source.display().to_string(), &b.target))
        .collect();
    if expected_mounts != actual_mounts {
        let (missing, unexpected) = set_diff(&expected_mounts, &actual_mounts);
        mismatches.push(Mismatch::Mounts { missing, unexpected });
    }

    let expected_hosts: BTreeSet<String> = desired.extra_hosts.iter().cloned().collect();
    let actual_hosts: BTreeSet<String> = details.extra_hosts.iter().cloned().collect();
    if expected_hosts != actual_hosts {
        let (missing, unexpected) = set_diff(&expected_hosts, &actual_hosts);
        mismatches.push(Mismatch::ExtraHosts { missing, unexpected });
    }

    let actual_env: BTreeSet<&str> = details.env.iter().map(String::as_str).collect();
    let missing_env: Vec<String> = desired
        .env
        .iter()
        .filter(|e| !actual_env.contains(e.as_str()))
        .cloned()
        .collect();
    if !missing_env.is_empty() {
        mismatches.push(Mismatch::Env { missing: missing_env });
    }

    mismatches
}

/// Classification for kinds where only existence and run state matter
/// (databases, services, the proxy).
#[must_use]
pub fn existence(existing: Option<&ContainerHandle>) -> Drift {
    match existing {
        None => Drift::Absent,
        Some(c) if c.is_running() => Drift::RunningMatching,
        Some(_) => Drift::StoppedMatching,
    }
}

/// Classification for a site, given its container and inspect details.
#[must_use]
pub fn site(
    desired: &ContainerSpec,
    existing: Option<(&ContainerHandle, &ContainerDetails)>,
) -> (Drift, Vec<Mismatch>) {
    let Some((container, details)) = existing else {
        return (Drift::Absent, Vec::new());
    };

    let mismatches = compare_site(desired, details);
    let drift = if !mismatches.is_empty() {
        Drift::RunningMismatched
    } else if container.is_running() {
        Drift::RunningMatching
    } else {
        Drift::StoppedMatching
    };
    (drift, mismatches)
}
