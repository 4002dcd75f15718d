use crate::config::BranchesConfig;

/// What kind of branch a release is being run from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchKind {
    Main,
    Next,
    Release,
    Other,
}

/// Represents a git branch with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchContext {
    pub name: String,
    pub kind: BranchKind,
}

impl BranchContext {
    /// Classify a branch name against the configured branch layout
    pub fn new(name: impl Into<String>, branches: &BranchesConfig) -> Self {
        let name = name.into();
        let release_prefix = format!("{}/", branches.release_prefix.trim_end_matches('/'));

        let kind = if name == branches.main {
            BranchKind::Main
        } else if name == branches.next {
            BranchKind::Next
        } else if name.starts_with(&release_prefix) {
            BranchKind::Release
        } else {
            BranchKind::Other
        };

        BranchContext { name, kind }
    }

    /// Minor and major releases start from main or next
    pub fn is_development_branch(&self) -> bool {
        matches!(self.kind, BranchKind::Main | BranchKind::Next)
    }

    /// Patch releases only ship from release branches
    pub fn is_release_branch(&self) -> bool {
        self.kind == BranchKind::Release
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_branch() {
        let branch = BranchContext::new("main", &BranchesConfig::default());
        assert_eq!(branch.kind, BranchKind::Main);
        assert!(branch.is_development_branch());
        assert!(!branch.is_release_branch());
    }

    #[test]
    fn test_next_branch() {
        let branch = BranchContext::new("next", &BranchesConfig::default());
        assert_eq!(branch.kind, BranchKind::Next);
        assert!(branch.is_development_branch());
    }

    #[test]
    fn test_release_branch() {
        let branch = BranchContext::new("release/client/1.4", &BranchesConfig::default());
        assert!(branch.is_release_branch());
        assert!(!branch.is_development_branch());
    }

    #[test]
    fn test_feature_branch() {
        let branch = BranchContext::new("feature/release-notes", &BranchesConfig::default());
        assert_eq!(branch.kind, BranchKind::Other);
    }

    #[test]
    fn test_custom_main() {
        let config = BranchesConfig {
            main: "master".to_string(),
            ..BranchesConfig::default()
        };
        assert_eq!(BranchContext::new("master", &config).kind, BranchKind::Main);
        assert_eq!(BranchContext::new("main", &config).kind, BranchKind::Other);
    }
}
