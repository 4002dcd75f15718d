//! Dependency range rewriting
//!
//! Rewrites the ranges that packages declare on a set of target packages.
//! Only the in-memory [`PackageGraph`] changes here; writing manifests back is
//! left to the caller's [`crate::graph::PackageStore`].

use crate::error::{ReleaseError, Result};
use crate::graph::{PackageGraph, PackageId};
use log::debug;
use semver::Version;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

const WORKSPACE_PROTOCOL: &str = "workspace:";

/// How a version is written as a dependency range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeStyle {
    /// `1.2.3`
    #[default]
    Exact,
    /// `^1.2.3`
    Caret,
    /// `~1.2.3`
    Tilde,
}

impl FromStr for RangeStyle {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(RangeStyle::Exact),
            "caret" | "^" => Ok(RangeStyle::Caret),
            "tilde" | "~" => Ok(RangeStyle::Tilde),
            other => Err(ReleaseError::config(format!(
                "Invalid range style '{}': expected exact, caret or tilde",
                other
            ))),
        }
    }
}

impl fmt::Display for RangeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeStyle::Exact => write!(f, "exact"),
            RangeStyle::Caret => write!(f, "caret"),
            RangeStyle::Tilde => write!(f, "tilde"),
        }
    }
}

/// Format `version` as a range in the given style
pub fn format_range(version: &Version, style: RangeStyle) -> String {
    match style {
        RangeStyle::Exact => version.to_string(),
        RangeStyle::Caret => format!("^{}", version),
        RangeStyle::Tilde => format!("~{}", version),
    }
}

/// The range that replaces `current`, keeping a `workspace:` protocol prefix
fn replacement_range(current: &str, version: &Version, style: RangeStyle) -> String {
    let formatted = format_range(version, style);
    if current.starts_with(WORKSPACE_PROTOCOL) {
        format!("{}{}", WORKSPACE_PROTOCOL, formatted)
    } else {
        formatted
    }
}

/// Pin every dependency from `scope` on `targets` to exactly `new_version`.
///
/// Returns the packages whose ranges actually changed. A second call with the
/// same arguments changes nothing and returns an empty set.
pub fn set_dependency_range(
    graph: &mut PackageGraph,
    scope: &[PackageId],
    targets: &[PackageId],
    new_version: &Version,
) -> BTreeSet<PackageId> {
    set_dependency_range_styled(graph, scope, targets, new_version, RangeStyle::Exact)
}

/// [`set_dependency_range`] with an explicit range style
pub fn set_dependency_range_styled(
    graph: &mut PackageGraph,
    scope: &[PackageId],
    targets: &[PackageId],
    new_version: &Version,
    style: RangeStyle,
) -> BTreeSet<PackageId> {
    let target_names: Vec<String> = targets
        .iter()
        .map(|id| graph.package(*id).name.clone())
        .collect();

    let mut modified = BTreeSet::new();
    for id in scope {
        let package = graph.package_mut(*id);
        for target in &target_names {
            let Some(current) = package.dependencies.get(target) else {
                continue;
            };
            let replacement = replacement_range(current, new_version, style);
            if *current == replacement {
                continue;
            }
            debug!(
                "{}: {} {} -> {}",
                package.name, target, current, replacement
            );
            package.dependencies.insert(target.clone(), replacement);
            modified.insert(*id);
        }
    }
    modified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Package;

    fn graph() -> (PackageGraph, PackageId, PackageId, PackageId) {
        let mut graph = PackageGraph::new();
        let a = graph
            .add_package(Package::new("a", Version::new(1, 0, 0)), None)
            .unwrap();
        let b = graph
            .add_package(
                Package::new("b", Version::new(1, 0, 0))
                    .with_dependency("a", "^1.0.0")
                    .with_dependency("left-pad", "^1.3.0"),
                None,
            )
            .unwrap();
        let c = graph
            .add_package(
                Package::new("c", Version::new(1, 0, 0)).with_dependency("a", "workspace:~1.0.0"),
                None,
            )
            .unwrap();
        (graph, a, b, c)
    }

    #[test]
    fn test_pins_exact_version() {
        let (mut graph, a, b, _) = graph();
        let modified = set_dependency_range(&mut graph, &[b], &[a], &Version::new(1, 1, 0));
        assert_eq!(modified, BTreeSet::from([b]));
        let deps = &graph.package(b).dependencies;
        assert_eq!(deps.get("a").unwrap(), "1.1.0");
        assert_eq!(deps.get("left-pad").unwrap(), "^1.3.0");
    }

    #[test]
    fn test_second_run_is_noop() {
        let (mut graph, a, b, c) = graph();
        let version = Version::new(2, 0, 0);
        let first = set_dependency_range(&mut graph, &[b, c], &[a], &version);
        assert_eq!(first.len(), 2);
        let before = graph.clone();
        let second = set_dependency_range(&mut graph, &[b, c], &[a], &version);
        assert!(second.is_empty());
        assert_eq!(graph, before);
    }

    #[test]
    fn test_workspace_protocol_kept() {
        let (mut graph, a, _, c) = graph();
        set_dependency_range(&mut graph, &[c], &[a], &Version::new(1, 2, 0));
        assert_eq!(
            graph.package(c).dependencies.get("a").unwrap(),
            "workspace:1.2.0"
        );
    }

    #[test]
    fn test_out_of_scope_untouched() {
        let (mut graph, a, b, c) = graph();
        let modified = set_dependency_range(&mut graph, &[c], &[a], &Version::new(3, 0, 0));
        assert_eq!(modified, BTreeSet::from([c]));
        assert_eq!(graph.package(b).dependencies.get("a").unwrap(), "^1.0.0");
    }

    #[test]
    fn test_styled_ranges() {
        let (mut graph, a, b, _) = graph();
        set_dependency_range_styled(&mut graph, &[b], &[a], &Version::new(1, 4, 0), RangeStyle::Tilde);
        assert_eq!(graph.package(b).dependencies.get("a").unwrap(), "~1.4.0");
        assert_eq!(format_range(&Version::new(1, 4, 0), RangeStyle::Caret), "^1.4.0");
        assert_eq!("^".parse::<RangeStyle>().unwrap(), RangeStyle::Caret);
    }
}
