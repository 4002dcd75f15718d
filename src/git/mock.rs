use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    branch: String,
    branches: Vec<String>,
    tags: BTreeSet<String>,
    pushed_tags: Vec<String>,
    commits: Vec<String>,
    merged: HashSet<(String, String)>,
    fail_push: bool,
}

/// Mock repository for testing without actual git operations
pub struct MockRepository {
    state: Mutex<MockState>,
}

impl MockRepository {
    /// Create a mock repository checked out on `branch`
    pub fn new(branch: impl Into<String>) -> Self {
        MockRepository {
            state: Mutex::new(MockState {
                branch: branch.into(),
                ..MockState::default()
            }),
        }
    }

    /// Add an existing tag
    pub fn with_tag(self, name: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.tags.insert(name.into());
        }
        self
    }

    /// Mark `source` as merged into `target`
    pub fn with_merged(self, source: impl Into<String>, target: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.merged.insert((source.into(), target.into()));
        }
        self
    }

    /// Make every `push_tag` call fail
    pub fn with_failing_push(self) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.fail_push = true;
        }
        self
    }

    fn state(&self) -> Result<MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| ReleaseError::repository("mock repository lock poisoned"))
    }

    /// Tags pushed so far, in order
    pub fn pushed_tags(&self) -> Vec<String> {
        self.state().map(|s| s.pushed_tags.clone()).unwrap_or_default()
    }

    /// Branches created so far, in order
    pub fn created_branches(&self) -> Vec<String> {
        self.state().map(|s| s.branches.clone()).unwrap_or_default()
    }

    /// Commit messages recorded so far, in order
    pub fn commits(&self) -> Vec<String> {
        self.state().map(|s| s.commits.clone()).unwrap_or_default()
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new("main")
    }
}

impl Repository for MockRepository {
    fn current_branch(&self) -> Result<String> {
        Ok(self.state()?.branch.clone())
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        let mut state = self.state()?;
        if state.branches.iter().any(|b| b == name) {
            return Err(ReleaseError::repository(format!(
                "Branch already exists: {}",
                name
            )));
        }
        state.branches.push(name.to_string());
        state.branch = name.to_string();
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String> {
        let mut state = self.state()?;
        state.commits.push(message.to_string());
        Ok(format!("{:040x}", state.commits.len()))
    }

    fn head_commit(&self) -> Result<String> {
        Ok(format!("{:040x}", self.state()?.commits.len()))
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state()?.tags.contains(name))
    }

    fn push_tag(&self, name: &str) -> Result<()> {
        let mut state = self.state()?;
        if state.fail_push {
            return Err(ReleaseError::repository(format!(
                "Push of {} rejected",
                name
            )));
        }
        if !state.tags.insert(name.to_string()) {
            return Err(ReleaseError::TagAlreadyExists(name.to_string()));
        }
        state.pushed_tags.push(name.to_string());
        Ok(())
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        Ok(self.state()?.tags.iter().cloned().collect())
    }

    fn is_merged(&self, source: &str, target: &str) -> Result<bool> {
        Ok(source == target
            || self
                .state()?
                .merged
                .contains(&(source.to_string(), target.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_repository_branches() {
        let repo = MockRepository::new("main");
        assert_eq!(repo.current_branch().unwrap(), "main");

        repo.create_branch("release/client/2.1").unwrap();
        assert_eq!(repo.current_branch().unwrap(), "release/client/2.1");
        assert!(repo.create_branch("release/client/2.1").is_err());
        assert_eq!(repo.created_branches(), vec!["release/client/2.1"]);
    }

    #[test]
    fn test_mock_repository_tags() {
        let repo = MockRepository::default().with_tag("a_v1.0.0");
        assert!(repo.tag_exists("a_v1.0.0").unwrap());
        assert!(!repo.tag_exists("a_v1.0.1").unwrap());

        repo.push_tag("a_v1.0.1").unwrap();
        assert!(repo.tag_exists("a_v1.0.1").unwrap());
        assert_eq!(repo.pushed_tags(), vec!["a_v1.0.1"]);
        assert_eq!(repo.list_tags().unwrap().len(), 2);

        assert!(matches!(
            repo.push_tag("a_v1.0.0"),
            Err(ReleaseError::TagAlreadyExists(_))
        ));
    }

    #[test]
    fn test_mock_repository_commits() {
        let repo = MockRepository::default();
        let first = repo.commit("first").unwrap();
        let second = repo.commit("second").unwrap();
        assert_ne!(first, second);
        assert_eq!(repo.head_commit().unwrap(), second);
        assert_eq!(repo.commits(), vec!["first", "second"]);
    }

    #[test]
    fn test_mock_repository_merged() {
        let repo = MockRepository::default().with_merged("next", "main");
        assert!(repo.is_merged("next", "main").unwrap());
        assert!(!repo.is_merged("main", "next").unwrap());
        assert!(repo.is_merged("main", "main").unwrap());
    }

    #[test]
    fn test_mock_repository_failing_push() {
        let repo = MockRepository::default().with_failing_push();
        assert!(repo.push_tag("a_v1.0.0").is_err());
        assert!(repo.pushed_tags().is_empty());
    }
}
