//! Version scheme detection
//!
//! Five grammars coexist in one monorepo:
//!
//! - `semver`: plain `X.Y.Z` (generic prereleases included)
//! - `internal`: `A.B.C-internal.X.Y.Z`, a public triplet plus an internal one
//! - `internalPrerelease`: `A.B.C-internal.X.Y.Z-dev.N`
//! - `virtualPatch`: `0.Y.ZZZZ`, where each unit of the minor occupies 1000 patch values
//! - `rc`: `A.B.C-rc.N.M.P`
//!
//! The scheme is always derived from a version's shape, never stored beside it.

use crate::domain::version::{advance, BumpType, VIRTUAL_PATCH_STRIDE};
use crate::error::{ReleaseError, Result};
use semver::{Prerelease, Version};
use std::fmt;
use std::str::FromStr;

const INTERNAL_PREFIX: &str = "internal.";
const DEV_MARKER: &str = "-dev.";
const RC_PREFIX: &str = "rc.";

/// A versioning grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionScheme {
    Semver,
    Internal,
    InternalPrerelease,
    VirtualPatch,
    Rc,
}

impl FromStr for VersionScheme {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "semver" => Ok(VersionScheme::Semver),
            "internal" => Ok(VersionScheme::Internal),
            "internalPrerelease" => Ok(VersionScheme::InternalPrerelease),
            "virtualPatch" => Ok(VersionScheme::VirtualPatch),
            "rc" => Ok(VersionScheme::Rc),
            other => Err(ReleaseError::config(format!(
                "Unknown version scheme '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for VersionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VersionScheme::Semver => "semver",
            VersionScheme::Internal => "internal",
            VersionScheme::InternalPrerelease => "internalPrerelease",
            VersionScheme::VirtualPatch => "virtualPatch",
            VersionScheme::Rc => "rc",
        };
        write!(f, "{}", name)
    }
}

/// Detect the scheme a version belongs to from its shape.
pub fn detect_scheme(version: &Version) -> Result<VersionScheme> {
    let pre = version.pre.as_str();

    if pre.is_empty() {
        if version.major == 0 && version.patch >= VIRTUAL_PATCH_STRIDE {
            return Ok(VersionScheme::VirtualPatch);
        }
        return Ok(VersionScheme::Semver);
    }

    // A prerelease that only looks internal is still a generic semver prerelease.
    if let Ok(internal) = InternalVersion::from_version(version) {
        return Ok(if internal.dev_build.is_some() {
            VersionScheme::InternalPrerelease
        } else {
            VersionScheme::Internal
        });
    }

    if pre.starts_with(RC_PREFIX) && RcVersion::from_version(version).is_ok() {
        return Ok(VersionScheme::Rc);
    }

    Ok(VersionScheme::Semver)
}

/// Parse a version string and detect its scheme in one step.
pub fn detect_scheme_str(input: &str) -> Result<VersionScheme> {
    let version = crate::domain::version::parse_version(input)?;
    detect_scheme(&version)
}

fn parse_triplet(input: &str, original: &Version) -> Result<Version> {
    let parts: Vec<&str> = input.split('.').collect();
    if parts.len() != 3 {
        return Err(ReleaseError::UnrecognizedScheme(original.to_string()));
    }
    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .parse::<u64>()
            .map_err(|_| ReleaseError::UnrecognizedScheme(original.to_string()))?;
    }
    Ok(Version::new(numbers[0], numbers[1], numbers[2]))
}

fn with_prerelease(base: &Version, pre: &str) -> Version {
    let mut version = Version::new(base.major, base.minor, base.patch);
    // Only ever built from numeric identifiers and fixed markers.
    version.pre = Prerelease::new(pre).unwrap_or(Prerelease::EMPTY);
    version
}

/// Split form of an internal-scheme version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalVersion {
    /// The stable public triplet (`A.B.C`)
    pub public: Version,
    /// The internal counters (`X.Y.Z`)
    pub internal: Version,
    /// Build number of a `-dev.N` prerelease, if any
    pub dev_build: Option<u64>,
}

impl InternalVersion {
    /// Split an `A.B.C-internal.X.Y.Z[-dev.N]` version.
    pub fn from_version(version: &Version) -> Result<Self> {
        let unrecognized = || ReleaseError::UnrecognizedScheme(version.to_string());
        let rest = version
            .pre
            .as_str()
            .strip_prefix(INTERNAL_PREFIX)
            .ok_or_else(unrecognized)?;

        let (triplet, dev_build) = match rest.split_once(DEV_MARKER) {
            Some((triplet, build)) => {
                let build = build.parse::<u64>().map_err(|_| unrecognized())?;
                (triplet, Some(build))
            }
            None => (rest, None),
        };

        Ok(InternalVersion {
            public: Version::new(version.major, version.minor, version.patch),
            internal: parse_triplet(triplet, version)?,
            dev_build,
        })
    }

    /// Join back into a single version.
    pub fn to_version(&self) -> Version {
        let mut pre = format!(
            "{}{}.{}.{}",
            INTERNAL_PREFIX, self.internal.major, self.internal.minor, self.internal.patch
        );
        if let Some(build) = self.dev_build {
            pre.push_str(&format!("{}{}", DEV_MARKER, build));
        }
        with_prerelease(&self.public, &pre)
    }

    /// Advance the internal counters; the public triplet never moves here.
    pub fn bump(&self, bump_type: BumpType) -> Result<Self> {
        let i = &self.internal;
        let whole = self.to_version();
        let internal = match bump_type {
            BumpType::Major => Version::new(advance(&whole, i.major, 1)?, 0, 0),
            BumpType::Minor => Version::new(i.major, advance(&whole, i.minor, 1)?, 0),
            BumpType::Patch => Version::new(i.major, i.minor, advance(&whole, i.patch, 1)?),
        };
        Ok(InternalVersion {
            public: self.public.clone(),
            internal,
            dev_build: self.dev_build,
        })
    }
}

/// Build an internal-scheme version from its public and internal triplets.
pub fn to_internal_scheme(public: &Version, internal: &Version) -> Version {
    InternalVersion {
        public: Version::new(public.major, public.minor, public.patch),
        internal: Version::new(internal.major, internal.minor, internal.patch),
        dev_build: None,
    }
    .to_version()
}

/// Split an internal-scheme version into `(public, internal)` triplets.
pub fn from_internal_scheme(version: &Version) -> Result<(Version, Version)> {
    let split = InternalVersion::from_version(version)?;
    Ok((split.public, split.internal))
}

/// Split form of a release-candidate version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcVersion {
    pub public: Version,
    pub candidate: Version,
}

impl RcVersion {
    /// Split an `A.B.C-rc.N.M.P` version.
    pub fn from_version(version: &Version) -> Result<Self> {
        let rest = version
            .pre
            .as_str()
            .strip_prefix(RC_PREFIX)
            .ok_or_else(|| ReleaseError::UnrecognizedScheme(version.to_string()))?;
        Ok(RcVersion {
            public: Version::new(version.major, version.minor, version.patch),
            candidate: parse_triplet(rest, version)?,
        })
    }

    pub fn to_version(&self) -> Version {
        let c = &self.candidate;
        let pre = format!("{}{}.{}.{}", RC_PREFIX, c.major, c.minor, c.patch);
        with_prerelease(&self.public, &pre)
    }

    /// A minor bump cuts the next candidate, a patch bump fixes the current one,
    /// and a major bump moves the public major and starts over at `rc.1.0.0`.
    pub fn bump(&self, bump_type: BumpType) -> Result<Self> {
        let c = &self.candidate;
        let whole = self.to_version();
        let next = match bump_type {
            BumpType::Major => RcVersion {
                public: Version::new(advance(&whole, self.public.major, 1)?, 0, 0),
                candidate: Version::new(1, 0, 0),
            },
            BumpType::Minor => RcVersion {
                public: self.public.clone(),
                candidate: Version::new(advance(&whole, c.major, 1)?, 0, 0),
            },
            BumpType::Patch => RcVersion {
                public: self.public.clone(),
                candidate: Version::new(c.major, c.minor, advance(&whole, c.patch, 1)?),
            },
        };
        Ok(next)
    }
}

/// Whether `version` counts as a prerelease.
///
/// With `internal_definition` set, internal-scheme versions are releases and only
/// versions carrying anything beyond the internal triplet are prereleases.
pub fn is_prerelease(version: &Version, internal_definition: bool) -> bool {
    if version.pre.is_empty() {
        return false;
    }
    if internal_definition {
        return !matches!(detect_scheme(version), Ok(VersionScheme::Internal));
    }
    true
}

/// Whether `candidate` is the latest release among `known`.
///
/// An empty `known` list means the floor is `0.0.0`.
pub fn is_latest(candidate: &Version, known: &[Version], include_prereleases: bool) -> bool {
    if is_prerelease(candidate, include_prereleases) {
        return false;
    }
    let floor = Version::new(0, 0, 0);
    let highest = known.iter().max().unwrap_or(&floor);
    candidate >= highest
}
