//! Scripted collaborators for tests and dry runs

use crate::capabilities::{Confirmation, Installer, PublishOutcome, PublishWatcher};
use crate::error::{ReleaseError, Result};
use semver::Version;
use std::path::PathBuf;
use std::sync::Mutex;

fn poisoned() -> ReleaseError {
    ReleaseError::config("mock collaborator lock poisoned")
}

/// Confirms everything except prompts containing one of the declined phrases.
///
/// Every prompt it is shown is recorded.
#[derive(Debug, Default)]
pub struct ScriptedConfirmation {
    declined: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirmation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer no to any prompt containing `needle`
    pub fn declining(mut self, needle: impl Into<String>) -> Self {
        self.declined.push(needle.into());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Confirmation for ScriptedConfirmation {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        self.prompts
            .lock()
            .map_err(|_| poisoned())?
            .push(prompt.to_string());
        Ok(!self.declined.iter().any(|needle| prompt.contains(needle)))
    }
}

/// Publish watcher that answers immediately
#[derive(Debug)]
pub struct InstantPublishWatcher {
    outcome: PublishOutcome,
    waited: Mutex<Vec<String>>,
}

impl InstantPublishWatcher {
    pub fn confirming() -> Self {
        Self::with_outcome(PublishOutcome::Confirmed)
    }

    pub fn timing_out() -> Self {
        Self::with_outcome(PublishOutcome::TimedOut)
    }

    fn with_outcome(outcome: PublishOutcome) -> Self {
        InstantPublishWatcher {
            outcome,
            waited: Mutex::new(Vec::new()),
        }
    }

    /// `name@version` for every wait, in order
    pub fn waited(&self) -> Vec<String> {
        self.waited.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

impl PublishWatcher for InstantPublishWatcher {
    fn wait_for_publish(&self, package: &str, version: &Version) -> Result<PublishOutcome> {
        self.waited
            .lock()
            .map_err(|_| poisoned())?
            .push(format!("{}@{}", package, version));
        Ok(self.outcome)
    }
}

/// Installer that records what it was asked to install
#[derive(Debug)]
pub struct RecordingInstaller {
    succeed: bool,
    calls: Mutex<Vec<Vec<PathBuf>>>,
}

impl RecordingInstaller {
    pub fn new() -> Self {
        RecordingInstaller {
            succeed: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        RecordingInstaller {
            succeed: false,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<Vec<PathBuf>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Default for RecordingInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl Installer for RecordingInstaller {
    fn ensure_installed(&self, packages: &[PathBuf]) -> Result<bool> {
        self.calls
            .lock()
            .map_err(|_| poisoned())?
            .push(packages.to_vec());
        Ok(self.succeed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_confirmation() {
        let confirm = ScriptedConfirmation::new().declining("Push tag");
        assert!(confirm.confirm("Run type tests?").unwrap());
        assert!(!confirm.confirm("Push tag a_v1.0.0?").unwrap());
        assert_eq!(confirm.prompts().len(), 2);
    }

    #[test]
    fn test_instant_watcher_records() {
        let watcher = InstantPublishWatcher::timing_out();
        let outcome = watcher
            .wait_for_publish("a", &Version::new(1, 0, 0))
            .unwrap();
        assert_eq!(outcome, PublishOutcome::TimedOut);
        assert_eq!(watcher.waited(), vec!["a@1.0.0"]);
    }

    #[test]
    fn test_recording_installer() {
        let installer = RecordingInstaller::failing();
        assert!(!installer.ensure_installed(&[PathBuf::from("a")]).unwrap());
        assert_eq!(installer.calls().len(), 1);
    }
}
