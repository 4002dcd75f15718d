use crate::domain::version::{parse_version, release_branch_version, BumpType};
use crate::error::{ReleaseError, Result};
use regex::Regex;
use semver::Version;
use std::fmt;
use std::sync::OnceLock;

static TAG_PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();

/// `{name}_v{version}`, compiled once per process
fn tag_pattern() -> Result<&'static Regex> {
    TAG_PATTERN
        .get_or_init(|| Regex::new(r"^(.+)_v(\d+\.\d+\.\d+\S*)$"))
        .as_ref()
        .map_err(|e| ReleaseError::config(format!("Invalid tag pattern: {}", e)))
}

/// A release tag: `{name}_v{version}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag {
    pub name: String,
    pub version: Version,
}

impl ReleaseTag {
    /// Create a tag for a release group or package at a version
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        ReleaseTag {
            name: name.into(),
            version,
        }
    }

    /// Parse a tag name back into its parts
    ///
    /// The last `_v` separates the name from the version, so names may contain
    /// underscores themselves.
    pub fn parse(tag: &str) -> Result<Self> {
        let captures = tag_pattern()?
            .captures(tag)
            .ok_or_else(|| ReleaseError::UnrecognizedScheme(tag.to_string()))?;

        let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let version = captures.get(2).map(|m| m.as_str()).unwrap_or_default();

        Ok(ReleaseTag {
            name: name.to_string(),
            version: parse_version(version)?,
        })
    }

    /// Collect the versions of every tag in `tags` that belongs to `name`
    pub fn versions_for(name: &str, tags: &[String]) -> Vec<Version> {
        tags.iter()
            .filter_map(|tag| ReleaseTag::parse(tag).ok())
            .filter(|tag| tag.name == name)
            .map(|tag| tag.version)
            .collect()
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_v{}", self.name, self.version)
    }
}

/// Strip an npm scope so names are safe inside branch names
fn branch_safe(name: &str) -> String {
    name.trim_start_matches('@').replace('/', "-")
}

/// Post-bump development branch: `bump_{name}_{bumpType}_{version}`
pub fn bump_branch_name(name: &str, bump_type: BumpType, version: &Version) -> String {
    format!("bump_{}_{}_{}", branch_safe(name), bump_type, version)
}

/// Release branch: `{prefix}/{name}/{majorMinor}`
pub fn release_branch_name(prefix: &str, name: &str, version: &Version) -> Result<String> {
    Ok(format!(
        "{}/{}/{}",
        prefix.trim_end_matches('/'),
        branch_safe(name),
        release_branch_version(version)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_display() {
        let tag = ReleaseTag::new("client", Version::new(1, 2, 4));
        assert_eq!(tag.to_string(), "client_v1.2.4");
    }

    #[test]
    fn test_tag_parse() {
        let tag = ReleaseTag::parse("build_tools_v0.4.2000").unwrap();
        assert_eq!(tag.name, "build_tools");
        assert_eq!(tag.version, Version::new(0, 4, 2000));
    }

    #[test]
    fn test_tag_parse_internal() {
        let tag = ReleaseTag::parse("client_v2.0.0-internal.3.0.0").unwrap();
        assert_eq!(tag.name, "client");
        assert_eq!(tag.version.to_string(), "2.0.0-internal.3.0.0");
    }

    #[test]
    fn test_tag_parse_rejects_foreign_tags() {
        assert!(ReleaseTag::parse("v1.2.3").is_err());
        assert!(ReleaseTag::parse("client-1.2.3").is_err());
    }

    #[test]
    fn test_versions_for() {
        let tags = vec![
            "client_v1.0.0".to_string(),
            "client_v1.1.0".to_string(),
            "server_v9.0.0".to_string(),
            "random".to_string(),
        ];
        let versions = ReleaseTag::versions_for("client", &tags);
        assert_eq!(versions, vec![Version::new(1, 0, 0), Version::new(1, 1, 0)]);
    }

    #[test]
    fn test_bump_branch_name() {
        assert_eq!(
            bump_branch_name("@fluid/client", BumpType::Minor, &Version::new(1, 1, 0)),
            "bump_fluid-client_minor_1.1.0"
        );
    }

    #[test]
    fn test_release_branch_name() {
        assert_eq!(
            release_branch_name("release", "client", &Version::new(1, 4, 2)).unwrap(),
            "release/client/1.4"
        );
        assert_eq!(
            release_branch_name("release/", "tools", &Version::new(0, 4, 2003)).unwrap(),
            "release/tools/0.4.2000"
        );
    }

    #[test]
    fn test_tag_pattern_is_compiled_once() {
        let first = tag_pattern().unwrap();
        let tags: Vec<String> = (0..50).map(|i| format!("client_v1.0.{}", i)).collect();
        assert_eq!(ReleaseTag::versions_for("client", &tags).len(), 50);
        assert!(std::ptr::eq(first, tag_pattern().unwrap()));
    }
}
