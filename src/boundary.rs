use crate::domain::ReleaseTag;
use crate::graph::{PackageGraph, ReleaseUnit};
use semver::Version;
use std::fmt;

/// Non-fatal conditions found around a release or dependency bump.
/// These are reported to the user but never stop the run on their own.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// The tag for a version already exists while no release is running
    TagExistsOutsideRelease { tag: String },
    /// A private group member keeps its own version when the group moves
    PrivateMemberNotBumped { package: String, group: String },
    /// Nothing in the repository depends on the released unit
    NoDependents { unit: String },
    /// A published group member drifted from the group version
    LockstepViolation { detail: String },
    /// Tag looks like it belongs to the unit but the version cannot be parsed
    UnparsableTag { tag: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::TagExistsOutsideRelease { tag } => {
                write!(f, "Tag '{}' already exists", tag)
            }
            BoundaryWarning::PrivateMemberNotBumped { package, group } => write!(
                f,
                "Private package '{}' keeps its version while '{}' is bumped",
                package, group
            ),
            BoundaryWarning::NoDependents { unit } => {
                write!(f, "No packages depend on '{}'", unit)
            }
            BoundaryWarning::LockstepViolation { detail } => {
                write!(f, "Lockstep violation: {}", detail)
            }
            BoundaryWarning::UnparsableTag { tag } => {
                write!(f, "Cannot parse the version of tag '{}'", tag)
            }
        }
    }
}

/// Warn about private members of `unit` that will not follow its version
pub fn private_member_warnings(graph: &PackageGraph, unit: ReleaseUnit) -> Vec<BoundaryWarning> {
    let ReleaseUnit::Group(group) = unit else {
        return Vec::new();
    };
    graph
        .unit_members(unit)
        .into_iter()
        .filter(|id| graph.package(*id).private)
        .map(|id| BoundaryWarning::PrivateMemberNotBumped {
            package: graph.package(id).name.clone(),
            group: graph.group(group).name.clone(),
        })
        .collect()
}

pub fn lockstep_warnings(graph: &PackageGraph) -> Vec<BoundaryWarning> {
    graph
        .lockstep_violations()
        .into_iter()
        .map(|detail| BoundaryWarning::LockstepViolation { detail })
        .collect()
}

/// Warn when the tag for `name` at `version` is already among `tags`
pub fn tag_collision_warning(
    tags: &[String],
    name: &str,
    version: &Version,
) -> Option<BoundaryWarning> {
    let tag = ReleaseTag::new(name, version.clone()).to_string();
    tags.contains(&tag)
        .then_some(BoundaryWarning::TagExistsOutsideRelease { tag })
}

/// Tags that start with `{name}_v` but do not carry a parseable version
pub fn unparsable_tag_warnings(tags: &[String], name: &str) -> Vec<BoundaryWarning> {
    let prefix = format!("{}_v", name);
    tags.iter()
        .filter(|tag| tag.starts_with(&prefix) && ReleaseTag::parse(tag).is_err())
        .map(|tag| BoundaryWarning::UnparsableTag { tag: tag.clone() })
        .collect()
}
