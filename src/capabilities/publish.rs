//! Waiting for a release to show up in the registry
//!
//! Publishing happens in CI after the tag is pushed. The watcher polls a
//! [`PublishProbe`] at a fixed interval until it reports the version or the
//! maximum wait elapses.

use crate::capabilities::{PublishOutcome, PublishWatcher};
use crate::error::{ReleaseError, Result};
use log::{debug, info};
use semver::Version;
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

/// A single "is it there yet" check
pub trait PublishProbe: Send + Sync {
    fn is_published(&self, package: &str, version: &Version) -> Result<bool>;
}

/// Probe that runs a registry query command.
///
/// `{name}` and `{version}` in the template are substituted. The version is
/// considered published when the command succeeds and prints the version.
pub struct CommandProbe {
    template: String,
}

impl CommandProbe {
    pub fn new(template: impl Into<String>) -> Self {
        CommandProbe {
            template: template.into(),
        }
    }

    fn render(&self, package: &str, version: &Version) -> Vec<String> {
        self.template
            .split_whitespace()
            .map(|part| {
                part.replace("{name}", package)
                    .replace("{version}", &version.to_string())
            })
            .collect()
    }
}

impl PublishProbe for CommandProbe {
    fn is_published(&self, package: &str, version: &Version) -> Result<bool> {
        let args = self.render(package, version);
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| ReleaseError::config("publish probe command is empty"))?;

        let output = Command::new(program).args(rest).output()?;
        if !output.status.success() {
            return Ok(false);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().any(|line| line.trim() == version.to_string()))
    }
}

/// Fixed-interval polling with a maximum wait
pub struct PollingPublishWatcher<P: PublishProbe> {
    probe: P,
    interval: Duration,
    max_wait: Duration,
}

impl<P: PublishProbe> PollingPublishWatcher<P> {
    pub fn new(probe: P, interval: Duration, max_wait: Duration) -> Self {
        PollingPublishWatcher {
            probe,
            interval,
            max_wait,
        }
    }
}

impl<P: PublishProbe> PublishWatcher for PollingPublishWatcher<P> {
    fn wait_for_publish(&self, package: &str, version: &Version) -> Result<PublishOutcome> {
        let started = Instant::now();
        let mut attempt = 1u32;
        loop {
            if self.probe.is_published(package, version)? {
                info!("{}@{} is published", package, version);
                return Ok(PublishOutcome::Confirmed);
            }
            let next_poll = started.elapsed().checked_add(self.interval);
            if next_poll.map_or(true, |at| at > self.max_wait) {
                return Ok(PublishOutcome::TimedOut);
            }
            debug!(
                "{}@{} not published yet (attempt {}), retrying in {:?}",
                package, version, attempt, self.interval
            );
            thread::sleep(self.interval);
            attempt += 1;
        }
    }
}
