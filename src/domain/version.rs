//! Version arithmetic for every supported scheme
//!
//! All functions here are pure: they take a parsed [`Version`] and return a new
//! one, never touching repository state.

use crate::domain::scheme::{detect_scheme, InternalVersion, RcVersion, VersionScheme};
use crate::error::{ReleaseError, Result};
use semver::{BuildMetadata, Prerelease, Version};
use std::fmt;
use std::str::FromStr;

/// Number of patch slots a virtual-patch "minor" occupies.
pub const VIRTUAL_PATCH_STRIDE: u64 = 1000;

/// Version bump type requested for a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BumpType {
    Patch,
    Minor,
    Major,
}

impl FromStr for BumpType {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "patch" => Ok(BumpType::Patch),
            "minor" => Ok(BumpType::Minor),
            "major" => Ok(BumpType::Major),
            other => Err(ReleaseError::config(format!(
                "Invalid bump type '{}': expected patch, minor or major",
                other
            ))),
        }
    }
}

impl fmt::Display for BumpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BumpType::Patch => write!(f, "patch"),
            BumpType::Minor => write!(f, "minor"),
            BumpType::Major => write!(f, "major"),
        }
    }
}

/// Optional modifiers for [`bump`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BumpOptions {
    /// Splice this build id in as the patch component instead of incrementing it.
    pub build_id: Option<u64>,
    /// Append a `-dev.N` build suffix to an internal version.
    pub dev_build: Option<u64>,
}

/// Parse a version string, accepting an optional `v`/`V` prefix.
pub fn parse_version(input: &str) -> Result<Version> {
    let clean = input.trim().trim_start_matches('v').trim_start_matches('V');
    Version::parse(clean).map_err(|_| ReleaseError::UnrecognizedScheme(input.to_string()))
}

/// Compute the next version of `version` under `scheme`.
pub fn bump(version: &Version, bump_type: BumpType, scheme: VersionScheme) -> Result<Version> {
    bump_with(version, bump_type, scheme, BumpOptions::default())
}

/// Compute the next version, honouring build-id and dev-build modifiers.
///
/// The scheme is checked against the version's shape first; asking for a
/// scheme the version does not belong to is an error, not a conversion.
pub fn bump_with(
    version: &Version,
    bump_type: BumpType,
    scheme: VersionScheme,
    options: BumpOptions,
) -> Result<Version> {
    if options.build_id.is_some() && options.dev_build.is_some() {
        return Err(ReleaseError::incompatible(
            "build-id patching and dev build suffixes are mutually exclusive",
        ));
    }

    let detected = detect_scheme(version)?;
    if detected != scheme {
        return Err(ReleaseError::incompatible(format!(
            "{} is a {} version, not {}",
            version, detected, scheme
        )));
    }

    if options.dev_build.is_some()
        && !matches!(
            scheme,
            VersionScheme::Internal | VersionScheme::InternalPrerelease
        )
    {
        return Err(ReleaseError::incompatible(format!(
            "dev build suffixes only apply to internal versions, not {}",
            scheme
        )));
    }

    if let Some(build_id) = options.build_id {
        return splice_build_id(version, bump_type, scheme, build_id);
    }

    match scheme {
        VersionScheme::Semver => bump_semver(version, bump_type),
        VersionScheme::Internal | VersionScheme::InternalPrerelease => {
            let internal = InternalVersion::from_version(version)?;
            let next = internal.bump(bump_type)?;
            let dev_build = options.dev_build.or(internal.dev_build);
            Ok(InternalVersion { dev_build, ..next }.to_version())
        }
        VersionScheme::VirtualPatch => bump_virtual_patch(version, bump_type),
        VersionScheme::Rc => {
            let rc = RcVersion::from_version(version)?;
            Ok(rc.bump(bump_type)?.to_version())
        }
    }
}

fn splice_build_id(
    version: &Version,
    bump_type: BumpType,
    scheme: VersionScheme,
    build_id: u64,
) -> Result<Version> {
    if bump_type != BumpType::Patch || scheme != VersionScheme::Semver {
        return Err(ReleaseError::incompatible(format!(
            "build-id patching requires a semver patch bump, got {} bump of a {} version",
            bump_type, scheme
        )));
    }
    if build_id <= version.patch {
        return Err(ReleaseError::incompatible(format!(
            "build id {} does not advance patch {} of {}",
            build_id, version.patch, version
        )));
    }
    let next = Version::new(version.major, version.minor, build_id);
    ensure_plain_semver(next)
}

fn bump_semver(version: &Version, bump_type: BumpType) -> Result<Version> {
    let next = match bump_type {
        BumpType::Major => Version::new(advance(version, version.major, 1)?, 0, 0),
        BumpType::Minor => Version::new(version.major, advance(version, version.minor, 1)?, 0),
        BumpType::Patch => Version::new(
            version.major,
            version.minor,
            advance(version, version.patch, 1)?,
        ),
    };
    ensure_plain_semver(next)
}

/// `component + by`, or an error naming `version` when the component would overflow.
pub(crate) fn advance(version: &Version, component: u64, by: u64) -> Result<u64> {
    component.checked_add(by).ok_or_else(|| {
        ReleaseError::incompatible(format!("{} cannot be bumped any further", version))
    })
}

// A 0.x version whose patch reaches the stride would read back as virtual patch.
fn ensure_plain_semver(next: Version) -> Result<Version> {
    if next.major == 0 && next.patch >= VIRTUAL_PATCH_STRIDE {
        return Err(ReleaseError::incompatible(format!(
            "{} collides with the virtual patch encoding",
            next
        )));
    }
    Ok(next)
}

fn bump_virtual_patch(version: &Version, bump_type: BumpType) -> Result<Version> {
    let next = match bump_type {
        BumpType::Major => Version::new(
            version.major,
            advance(version, version.minor, 1)?,
            VIRTUAL_PATCH_STRIDE,
        ),
        BumpType::Minor => {
            let base = version.patch / VIRTUAL_PATCH_STRIDE * VIRTUAL_PATCH_STRIDE;
            Version::new(
                version.major,
                version.minor,
                advance(version, base, VIRTUAL_PATCH_STRIDE)?,
            )
        }
        BumpType::Patch => {
            if version.patch % VIRTUAL_PATCH_STRIDE == VIRTUAL_PATCH_STRIDE - 1 {
                return Err(ReleaseError::incompatible(format!(
                    "{} has no patch slots left in its virtual minor",
                    version
                )));
            }
            Version::new(version.major, version.minor, advance(version, version.patch, 1)?)
        }
    };
    Ok(next)
}

/// Drop the internal suffix of an internal-scheme version, leaving its public triplet.
pub fn graduate(version: &Version) -> Result<Version> {
    match detect_scheme(version)? {
        VersionScheme::Internal | VersionScheme::InternalPrerelease => {
            Ok(Version::new(version.major, version.minor, version.patch))
        }
        other => Err(ReleaseError::incompatible(format!(
            "only internal versions graduate, {} is {}",
            version, other
        ))),
    }
}

/// Promote a release candidate to its final semver version.
pub fn finalize(version: &Version) -> Result<Version> {
    match detect_scheme(version)? {
        VersionScheme::Rc => Ok(Version {
            pre: Prerelease::EMPTY,
            build: BuildMetadata::EMPTY,
            ..version.clone()
        }),
        other => Err(ReleaseError::incompatible(format!(
            "only release candidates can be finalized, {} is {}",
            version, other
        ))),
    }
}

/// The version component used in release branch names.
///
/// `major.minor` for most schemes; virtual patch keeps the full version with the
/// patch rounded down to its base-1000 slot.
pub fn release_branch_version(version: &Version) -> Result<String> {
    let scheme = detect_scheme(version)?;
    let name = match scheme {
        VersionScheme::VirtualPatch => {
            let base = version.patch / VIRTUAL_PATCH_STRIDE * VIRTUAL_PATCH_STRIDE;
            format!("{}.{}.{}", version.major, version.minor, base)
        }
        VersionScheme::Internal | VersionScheme::InternalPrerelease => {
            let internal = InternalVersion::from_version(version)?;
            format!(
                "{}-internal.{}.{}",
                internal.public, internal.internal.major, internal.internal.minor
            )
        }
        VersionScheme::Semver | VersionScheme::Rc => {
            format!("{}.{}", version.major, version.minor)
        }
    };
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    #[test]
    fn test_parse_with_prefix() {
        assert_eq!(v("v1.2.3"), Version::new(1, 2, 3));
        assert_eq!(v("V0.1.0"), Version::new(0, 1, 0));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            parse_version("1.2"),
            Err(ReleaseError::UnrecognizedScheme(_))
        ));
    }

    #[test]
    fn test_bump_type_parse() {
        assert_eq!("Minor".parse::<BumpType>().unwrap(), BumpType::Minor);
        assert!("huge".parse::<BumpType>().is_err());
        assert_eq!(BumpType::Major.to_string(), "major");
    }

    #[test]
    fn test_semver_bumps() {
        let base = v("1.2.3");
        assert_eq!(
            bump(&base, BumpType::Patch, VersionScheme::Semver).unwrap(),
            v("1.2.4")
        );
        assert_eq!(
            bump(&base, BumpType::Minor, VersionScheme::Semver).unwrap(),
            v("1.3.0")
        );
        assert_eq!(
            bump(&base, BumpType::Major, VersionScheme::Semver).unwrap(),
            v("2.0.0")
        );
    }

    #[test]
    fn test_semver_refuses_virtual_patch_collision() {
        let err = bump(&v("0.1.999"), BumpType::Patch, VersionScheme::Semver).unwrap_err();
        assert!(matches!(err, ReleaseError::IncompatibleBumpForScheme(_)));
    }

    #[test]
    fn test_virtual_patch_bumps() {
        let scheme = VersionScheme::VirtualPatch;
        assert_eq!(
            bump(&v("0.4.2000"), BumpType::Minor, scheme).unwrap(),
            v("0.4.3000")
        );
        assert_eq!(
            bump(&v("0.4.2000"), BumpType::Patch, scheme).unwrap(),
            v("0.4.2001")
        );
        assert_eq!(
            bump(&v("0.4.2002"), BumpType::Major, scheme).unwrap(),
            v("0.5.1000")
        );
        assert_eq!(
            bump(&v("0.4.2002"), BumpType::Minor, scheme).unwrap(),
            v("0.4.3000")
        );
    }

    #[test]
    fn test_virtual_patch_slot_exhausted() {
        let err = bump(&v("0.4.2999"), BumpType::Patch, VersionScheme::VirtualPatch);
        assert!(err.is_err());
    }

    #[test]
    fn test_internal_bumps_leave_public_triplet() {
        let scheme = VersionScheme::Internal;
        let base = v("2.0.0-internal.3.1.2");
        assert_eq!(
            bump(&base, BumpType::Major, scheme).unwrap(),
            v("2.0.0-internal.4.0.0")
        );
        assert_eq!(
            bump(&base, BumpType::Minor, scheme).unwrap(),
            v("2.0.0-internal.3.2.0")
        );
        assert_eq!(
            bump(&base, BumpType::Patch, scheme).unwrap(),
            v("2.0.0-internal.3.1.3")
        );
    }

    #[test]
    fn test_internal_prerelease_keeps_dev_suffix() {
        let base = v("2.0.0-internal.3.1.0-dev.5521");
        let next = bump(&base, BumpType::Minor, VersionScheme::InternalPrerelease).unwrap();
        assert_eq!(next, v("2.0.0-internal.3.2.0-dev.5521"));
    }

    #[test]
    fn test_dev_build_produces_internal_prerelease() {
        let options = BumpOptions {
            dev_build: Some(42),
            ..BumpOptions::default()
        };
        let next = bump_with(
            &v("2.0.0-internal.3.0.0"),
            BumpType::Patch,
            VersionScheme::Internal,
            options,
        )
        .unwrap();
        assert_eq!(next, v("2.0.0-internal.3.0.1-dev.42"));
    }

    #[test]
    fn test_internal_patch_with_build_id_is_rejected() {
        let options = BumpOptions {
            build_id: Some(12345),
            ..BumpOptions::default()
        };
        let err = bump_with(
            &v("2.0.0-internal.3.0.0"),
            BumpType::Patch,
            VersionScheme::Internal,
            options,
        )
        .unwrap_err();
        assert!(matches!(err, ReleaseError::IncompatibleBumpForScheme(_)));
    }

    #[test]
    fn test_build_id_and_dev_build_together_rejected() {
        let options = BumpOptions {
            build_id: Some(10),
            dev_build: Some(11),
        };
        let err = bump_with(&v("1.0.0"), BumpType::Patch, VersionScheme::Semver, options);
        assert!(matches!(
            err,
            Err(ReleaseError::IncompatibleBumpForScheme(_))
        ));
    }

    #[test]
    fn test_build_id_splice_for_semver_patch() {
        let options = BumpOptions {
            build_id: Some(40211),
            ..BumpOptions::default()
        };
        let next = bump_with(&v("1.4.0"), BumpType::Patch, VersionScheme::Semver, options).unwrap();
        assert_eq!(next, v("1.4.40211"));
    }

    #[test]
    fn test_rc_bumps() {
        let scheme = VersionScheme::Rc;
        let base = v("2.0.0-rc.2.1.0");
        assert_eq!(
            bump(&base, BumpType::Minor, scheme).unwrap(),
            v("2.0.0-rc.3.0.0")
        );
        assert_eq!(
            bump(&base, BumpType::Patch, scheme).unwrap(),
            v("2.0.0-rc.2.1.1")
        );
        assert_eq!(
            bump(&base, BumpType::Major, scheme).unwrap(),
            v("3.0.0-rc.1.0.0")
        );
    }

    #[test]
    fn test_scheme_mismatch_is_error() {
        let err = bump(&v("1.0.0"), BumpType::Patch, VersionScheme::Internal);
        assert!(err.is_err());
    }

    #[test]
    fn test_graduate_and_finalize() {
        assert_eq!(graduate(&v("2.0.0-internal.3.0.0")).unwrap(), v("2.0.0"));
        assert!(graduate(&v("2.0.0")).is_err());
        assert_eq!(finalize(&v("2.0.0-rc.1.0.0")).unwrap(), v("2.0.0"));
        assert!(finalize(&v("2.0.0-internal.1.0.0")).is_err());
    }

    #[test]
    fn test_release_branch_version() {
        assert_eq!(release_branch_version(&v("1.4.2")).unwrap(), "1.4");
        assert_eq!(release_branch_version(&v("0.4.2003")).unwrap(), "0.4.2000");
        assert_eq!(
            release_branch_version(&v("2.0.0-internal.3.1.0")).unwrap(),
            "2.0.0-internal.3.1"
        );
    }

    #[test]
    fn test_bump_at_component_limit_is_error() {
        let cases = [
            ("1.0.18446744073709551615", BumpType::Patch, VersionScheme::Semver),
            ("1.18446744073709551615.0", BumpType::Minor, VersionScheme::Semver),
            ("18446744073709551615.0.0", BumpType::Major, VersionScheme::Semver),
            ("0.18446744073709551615.1000", BumpType::Major, VersionScheme::VirtualPatch),
            ("0.1.18446744073709551000", BumpType::Minor, VersionScheme::VirtualPatch),
            (
                "1.0.0-internal.1.0.18446744073709551615",
                BumpType::Patch,
                VersionScheme::Internal,
            ),
            ("18446744073709551615.0.0-rc.1.0.0", BumpType::Major, VersionScheme::Rc),
        ];
        for (input, bump_type, scheme) in cases {
            assert!(
                matches!(
                    bump(&v(input), bump_type, scheme),
                    Err(ReleaseError::IncompatibleBumpForScheme(_))
                ),
                "{} should not bump",
                input
            );
        }
    }
}
