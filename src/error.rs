use thiserror::Error;

/// Unified error type for release-train operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Unrecognized version scheme: '{0}' is not a valid version")]
    UnrecognizedScheme(String),

    #[error("Incompatible bump for scheme: {0}")]
    IncompatibleBumpForScheme(String),

    #[error("Cyclic release dependency between: {}", .0.join(", "))]
    CyclicReleaseDependency(Vec<String>),

    #[error("Tag already exists: {0}")]
    TagAlreadyExists(String),

    #[error("Timed out waiting for {package}@{version} to be published")]
    PublishTimeout { package: String, version: String },

    #[error("Preflight check failed: {check}")]
    PreflightFailed { check: String },

    #[error("Release aborted by user")]
    UserAborted,

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Install failed: {0}")]
    Install(String),

    #[error("Invalid release state machine: {0}")]
    StateMachine(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in release-train
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a scheme-incompatibility error with context
    pub fn incompatible(msg: impl Into<String>) -> Self {
        ReleaseError::IncompatibleBumpForScheme(msg.into())
    }

    /// Create a failed-preflight error naming the check
    pub fn preflight(check: impl Into<String>) -> Self {
        ReleaseError::PreflightFailed {
            check: check.into(),
        }
    }

    /// Create a manifest error with context
    pub fn manifest(msg: impl Into<String>) -> Self {
        ReleaseError::Manifest(msg.into())
    }

    /// Create a repository error with context
    pub fn repository(msg: impl Into<String>) -> Self {
        ReleaseError::Repository(msg.into())
    }

    /// Create an install error with context
    pub fn install(msg: impl Into<String>) -> Self {
        ReleaseError::Install(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReleaseError::config("test config issue");
        assert_eq!(err.to_string(), "Configuration error: test config issue");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ReleaseError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_cycle_lists_members() {
        let err = ReleaseError::CyclicReleaseDependency(vec![
            "client".to_string(),
            "server".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Cyclic release dependency between: client, server"
        );
    }

    #[test]
    fn test_preflight_names_check() {
        let err = ReleaseError::preflight("CheckMainNextIntegrated");
        assert!(err.to_string().contains("CheckMainNextIntegrated"));
    }

    #[test]
    fn test_publish_timeout_display() {
        let err = ReleaseError::PublishTimeout {
            package: "@scope/pkg".to_string(),
            version: "1.2.3".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Timed out waiting for @scope/pkg@1.2.3 to be published"
        );
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let error_pairs = vec![
            (ReleaseError::config("x"), "Configuration error"),
            (ReleaseError::incompatible("x"), "Incompatible bump"),
            (ReleaseError::manifest("x"), "Manifest error"),
            (ReleaseError::install("x"), "Install failed"),
            (
                ReleaseError::UnrecognizedScheme("x".to_string()),
                "Unrecognized version scheme",
            ),
        ];

        for (err, expected_prefix) in error_pairs {
            let msg = err.to_string();
            assert!(
                msg.starts_with(expected_prefix),
                "Error message should start with '{}', but got '{}'",
                expected_prefix,
                msg
            );
        }
    }
}
