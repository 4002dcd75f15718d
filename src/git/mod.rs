//! Source control capability
//!
//! The release machine never talks to git directly. Everything it needs goes
//! through the [Repository] trait:
//!
//! - [repository::Git2Repository]: the real implementation on the `git2` crate
//! - [mock::MockRepository]: an in-memory implementation that records every
//!   branch, commit and pushed tag
//!
//! ```rust
//! # use release_train::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> release_train::Result<()> {
//! if !repo.tag_exists("client_v2.1.0")? {
//!     repo.push_tag("client_v2.1.0")?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;

/// Git operations used during a release
///
/// All implementors must be `Send + Sync`. Methods take `&self`; implementations
/// that record state use interior mutability.
pub trait Repository: Send + Sync {
    /// Name of the checked-out branch
    fn current_branch(&self) -> Result<String>;

    /// Create `name` at the current HEAD and switch to it
    fn create_branch(&self, name: &str) -> Result<()>;

    /// Stage all working tree changes and commit them.
    ///
    /// Returns the new commit id.
    fn commit(&self, message: &str) -> Result<String>;

    /// Id of the commit HEAD points at
    fn head_commit(&self) -> Result<String>;

    /// Whether a tag with exactly this name exists locally
    fn tag_exists(&self, name: &str) -> Result<bool>;

    /// Tag HEAD with `name` and push the tag to the release remote
    fn push_tag(&self, name: &str) -> Result<()>;

    /// All tag names in the repository
    fn list_tags(&self) -> Result<Vec<String>>;

    /// Whether every commit on `source` is reachable from `target`
    fn is_merged(&self, source: &str, target: &str) -> Result<bool>;
}
