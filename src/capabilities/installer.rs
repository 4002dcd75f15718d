use crate::capabilities::Installer;
use crate::error::{ReleaseError, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs the configured install command in the repository root
pub struct CommandInstaller {
    command: String,
    root: PathBuf,
}

impl CommandInstaller {
    pub fn new(command: impl Into<String>, root: impl AsRef<Path>) -> Self {
        CommandInstaller {
            command: command.into(),
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl Installer for CommandInstaller {
    /// The command is executed once for the whole workspace. A non-zero exit
    /// code is reported as `Ok(false)`; a command that cannot be started at
    /// all is an error.
    fn ensure_installed(&self, packages: &[PathBuf]) -> Result<bool> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| ReleaseError::install("install command is empty"))?;

        debug!(
            "Installing after changes in {} package(s): {}",
            packages.len(),
            self.command
        );

        let output = Command::new(program)
            .args(parts)
            .current_dir(&self.root)
            .output()
            .map_err(|e| {
                ReleaseError::install(format!("Failed to run '{}': {}", self.command, e))
            })?;

        if !output.status.success() {
            warn!(
                "'{}' exited with code {}\nStdout: {}\nStderr: {}",
                self.command,
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
            return Ok(false);
        }

        info!("Dependencies installed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_command_fails() {
        let dir = TempDir::new().unwrap();
        let installer = CommandInstaller::new("   ", dir.path());
        let err = installer.ensure_installed(&[]).unwrap_err();
        assert!(err.to_string().contains("install command is empty"));
    }

    #[test]
    fn test_missing_program_fails() {
        let dir = TempDir::new().unwrap();
        let installer = CommandInstaller::new("/nonexistent/path/to/pnpm install", dir.path());
        assert!(installer.ensure_installed(&[]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_reported() {
        let dir = TempDir::new().unwrap();
        assert!(CommandInstaller::new("true", dir.path())
            .ensure_installed(&[PathBuf::from("a")])
            .unwrap());
        assert!(!CommandInstaller::new("false", dir.path())
            .ensure_installed(&[PathBuf::from("a")])
            .unwrap());
    }
}
