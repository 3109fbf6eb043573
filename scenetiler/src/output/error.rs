//! Error types for the output module.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type for output layout operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Errors that can occur while preparing or cleaning scene directories.
#[derive(Debug)]
pub enum OutputError {
    /// Failed to create a directory.
    CreateDirectoryFailed { path: PathBuf, source: io::Error },

    /// Failed to remove a scene directory.
    RemoveFailed { path: PathBuf, source: io::Error },
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::CreateDirectoryFailed { path, source } => {
                write!(
                    f,
                    "failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            OutputError::RemoveFailed { path, source } => {
                write!(f, "failed to remove {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::CreateDirectoryFailed { source, .. } => Some(source),
            OutputError::RemoveFailed { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_create_directory_failed_display() {
        let err = OutputError::CreateDirectoryFailed {
            path: PathBuf::from("/out/scene"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/out/scene"));
        assert!(msg.contains("denied"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_remove_failed_display() {
        let err = OutputError::RemoveFailed {
            path: PathBuf::from("/out/scene"),
            source: io::Error::new(io::ErrorKind::Other, "busy"),
        };
        assert!(err.to_string().starts_with("failed to remove /out/scene"));
    }
}
