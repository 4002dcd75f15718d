use crate::config::{BranchesConfig, Config};
use crate::domain::{BumpOptions, BumpType};

/// Everything a release run needs to know up front.
///
/// Built once by the caller from CLI flags and configuration; the release
/// machine reads nothing from the environment itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseOptions {
    /// Release group or package name to start from
    pub target: String,
    pub bump_type: BumpType,
    pub bump_options: BumpOptions,
    pub branches: BranchesConfig,
    pub skip_type_tests: bool,
    /// How many times the operator may be asked to integrate next before giving up
    pub max_integration_attempts: u32,
}

impl ReleaseOptions {
    pub fn new(target: impl Into<String>, bump_type: BumpType) -> Self {
        ReleaseOptions {
            target: target.into(),
            bump_type,
            bump_options: BumpOptions::default(),
            branches: BranchesConfig::default(),
            skip_type_tests: false,
            max_integration_attempts: 3,
        }
    }

    pub fn from_config(target: impl Into<String>, bump_type: BumpType, config: &Config) -> Self {
        ReleaseOptions {
            branches: config.branches.clone(),
            skip_type_tests: config.behavior.skip_type_tests,
            ..Self::new(target, bump_type)
        }
    }

    pub fn with_build_id(mut self, build_id: Option<u64>) -> Self {
        self.bump_options.build_id = build_id;
        self
    }

    pub fn with_dev_build(mut self, dev_build: Option<u64>) -> Self {
        self.bump_options.dev_build = dev_build;
        self
    }

    pub fn skip_type_tests(mut self, skip: bool) -> Self {
        self.skip_type_tests = skip;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.branches.main = "trunk".to_string();
        config.behavior.skip_type_tests = true;

        let options = ReleaseOptions::from_config("client", BumpType::Minor, &config)
            .with_build_id(Some(4200));
        assert_eq!(options.branches.main, "trunk");
        assert!(options.skip_type_tests);
        assert_eq!(options.bump_options.build_id, Some(4200));
        assert_eq!(options.bump_options.dev_build, None);
    }
}
