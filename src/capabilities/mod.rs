//! External collaborators the release machine drives
//!
//! Installing dependencies, waiting for the registry and asking the operator
//! are all side effects the machine only reaches through these traits. Real
//! implementations live next to each trait; [mock] holds scripted ones for
//! tests and dry runs.

pub mod confirm;
pub mod installer;
pub mod mock;
pub mod publish;

pub use confirm::{AutoConfirm, ConsolePrompt};
pub use installer::CommandInstaller;
pub use mock::{InstantPublishWatcher, RecordingInstaller, ScriptedConfirmation};
pub use publish::{CommandProbe, PollingPublishWatcher, PublishProbe};

use crate::error::Result;
use semver::Version;
use std::path::PathBuf;

/// Result of waiting for a package version to appear in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Confirmed,
    TimedOut,
}

/// Installs dependencies after ranges change
pub trait Installer: Send + Sync {
    /// Make the workspace consistent with the rewritten manifests.
    ///
    /// `packages` are the directories whose manifests changed. Returns
    /// `Ok(false)` when the install ran but did not succeed.
    fn ensure_installed(&self, packages: &[PathBuf]) -> Result<bool>;
}

/// Blocks until a released version is visible to consumers
pub trait PublishWatcher: Send + Sync {
    fn wait_for_publish(&self, package: &str, version: &Version) -> Result<PublishOutcome>;
}

/// Yes/no decisions from the operator
pub trait Confirmation: Send + Sync {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}
