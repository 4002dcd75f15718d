//! Domain logic - pure business rules independent of git operations

pub mod branch;
pub mod scheme;
pub mod tag;
pub mod version;

pub use branch::{BranchContext, BranchKind};
pub use scheme::{
    detect_scheme, detect_scheme_str, from_internal_scheme, is_latest, is_prerelease,
    to_internal_scheme, InternalVersion, RcVersion, VersionScheme,
};
pub use semver::Version;
pub use tag::{bump_branch_name, release_branch_name, ReleaseTag};
pub use version::{
    bump, bump_with, finalize, graduate, parse_version, release_branch_version, BumpOptions,
    BumpType,
};
