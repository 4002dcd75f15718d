use crate::error::{ReleaseError, Result};
use git2::{BranchType, IndexAddOption, Oid, Repository as Git2Repo};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Mutex;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Mutex<Git2Repo>,
    remote: String,
}

impl Git2Repository {
    /// Open or discover a git repository, pushing tags to `remote`
    pub fn open<P: AsRef<Path>>(path: P, remote: impl Into<String>) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;
        Ok(Self::from_git2(repo, remote))
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo, remote: impl Into<String>) -> Self {
        Git2Repository {
            repo: Mutex::new(repo),
            remote: remote.into(),
        }
    }

    fn with_repo<T>(&self, f: impl FnOnce(&Git2Repo) -> Result<T>) -> Result<T> {
        let repo = self
            .repo
            .lock()
            .map_err(|_| ReleaseError::repository("repository lock poisoned"))?;
        f(&repo)
    }

    fn branch_oid(repo: &Git2Repo, name: &str) -> Result<Oid> {
        let branch = repo
            .find_branch(name, BranchType::Local)
            .or_else(|_| repo.find_branch(name, BranchType::Remote))
            .map_err(|e| {
                ReleaseError::repository(format!("Cannot find branch '{}': {}", name, e))
            })?;
        branch
            .get()
            .target()
            .ok_or_else(|| ReleaseError::repository(format!("Branch '{}' has no target", name)))
    }
}

impl super::Repository for Git2Repository {
    fn current_branch(&self) -> Result<String> {
        self.with_repo(|repo| {
            let head = repo.head()?;
            if !head.is_branch() {
                return Err(ReleaseError::repository("HEAD is detached"));
            }
            head.shorthand()
                .map(|s| s.to_string())
                .ok_or_else(|| ReleaseError::repository("HEAD branch name is not valid UTF-8"))
        })
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        self.with_repo(|repo| {
            let head = repo.head()?.peel_to_commit()?;
            repo.branch(name, &head, false).map_err(|e| {
                ReleaseError::repository(format!("Cannot create branch '{}': {}", name, e))
            })?;
            repo.set_head(&format!("refs/heads/{}", name))?;
            repo.checkout_head(Some(git2::build::CheckoutBuilder::new().safe()))?;
            info!("Switched to new branch {}", name);
            Ok(())
        })
    }

    fn commit(&self, message: &str) -> Result<String> {
        self.with_repo(|repo| {
            let mut index = repo.index()?;
            index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
            index.write()?;
            let tree = repo.find_tree(index.write_tree()?)?;
            let parent = repo.head()?.peel_to_commit()?;
            let signature = repo.signature()?;
            let oid = repo.commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &[&parent],
            )?;
            debug!("Committed {}: {}", oid, message);
            Ok(oid.to_string())
        })
    }

    fn head_commit(&self) -> Result<String> {
        self.with_repo(|repo| Ok(repo.head()?.peel_to_commit()?.id().to_string()))
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        self.with_repo(|repo| {
            match repo.find_reference(&format!("refs/tags/{}", name)) {
                Ok(_) => Ok(true),
                Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
                Err(e) => Err(ReleaseError::repository(format!(
                    "Cannot look up tag '{}': {}",
                    name, e
                ))),
            }
        })
    }

    fn push_tag(&self, name: &str) -> Result<()> {
        self.with_repo(|repo| {
            let head = repo.head()?.peel(git2::ObjectType::Commit)?;
            repo.tag_lightweight(name, &head, false)
                .map_err(|e| ReleaseError::repository(format!("Cannot create tag: {}", e)))?;

            let pushed = repo
                .find_remote(&self.remote)
                .map_err(|e| {
                    ReleaseError::repository(format!(
                        "Cannot find remote '{}': {}",
                        self.remote, e
                    ))
                })
                .and_then(|mut remote| {
                    let refspec = format!("refs/tags/{}:refs/tags/{}", name, name);
                    remote
                        .push(&[refspec.as_str()], None)
                        .map_err(|e| ReleaseError::repository(format!("Push failed: {}", e)))
                });
            if let Err(e) = pushed {
                // Unpushed tags are removed again.
                if let Err(cleanup) = repo.tag_delete(name) {
                    warn!("Cannot remove unpushed tag {}: {}", name, cleanup);
                }
                return Err(e);
            }
            info!("Pushed tag {} to {}", name, self.remote);
            Ok(())
        })
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        self.with_repo(|repo| {
            let tags = repo.tag_names(None)?;
            Ok(tags.iter().flatten().map(|s| s.to_string()).collect())
        })
    }

    fn is_merged(&self, source: &str, target: &str) -> Result<bool> {
        self.with_repo(|repo| {
            let source_oid = Self::branch_oid(repo, source)?;
            let target_oid = Self::branch_oid(repo, target)?;
            if source_oid == target_oid {
                return Ok(true);
            }
            Ok(repo.graph_descendant_of(target_oid, source_oid)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::Repository;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Git2Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Git2Repo::init(dir.path()).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Release Bot").unwrap();
            config.set_str("user.email", "release@example.com").unwrap();
        }
        std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();
        let wrapped = Git2Repository::from_git2(repo, "origin");
        {
            let repo = wrapped.repo.lock().unwrap();
            let mut index = repo.index().unwrap();
            index
                .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
                .unwrap();
            index.write().unwrap();
            let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
            let sig = repo.signature().unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
                .unwrap();
        }
        (dir, wrapped)
    }

    #[test]
    fn test_branch_and_commit() {
        let (dir, repo) = init_repo();
        let base = repo.current_branch().unwrap();

        repo.create_branch("bump_a_minor_1.1.0").unwrap();
        assert_eq!(repo.current_branch().unwrap(), "bump_a_minor_1.1.0");

        std::fs::write(dir.path().join("VERSION"), "1.1.0\n").unwrap();
        let id = repo.commit("Bump a to 1.1.0").unwrap();
        assert_eq!(repo.head_commit().unwrap(), id);

        assert!(repo.is_merged(&base, "bump_a_minor_1.1.0").unwrap());
        assert!(!repo.is_merged("bump_a_minor_1.1.0", &base).unwrap());
    }

    #[test]
    fn test_tag_lookup() {
        let (_dir, repo) = init_repo();
        assert!(!repo.tag_exists("a_v1.0.0").unwrap());
        {
            let inner = repo.repo.lock().unwrap();
            let head = inner.head().unwrap().peel(git2::ObjectType::Commit).unwrap();
            inner.tag_lightweight("a_v1.0.0", &head, false).unwrap();
        }
        assert!(repo.tag_exists("a_v1.0.0").unwrap());
        assert_eq!(repo.list_tags().unwrap(), vec!["a_v1.0.0".to_string()]);
    }

    #[test]
    fn test_push_without_remote_fails() {
        let (_dir, repo) = init_repo();
        assert!(repo.push_tag("a_v1.0.0").is_err());
        assert!(!repo.tag_exists("a_v1.0.0").unwrap());
    }
}
