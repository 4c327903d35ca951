use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PerfError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Browser operation failed: {0}")]
    Browser(String),

    #[error("Element '{test_id}' not visible after {timeout:?}")]
    VisibilityTimeout { test_id: String, timeout: Duration },

    #[error("Audit of '{page_key}' did not finish within {timeout:?}")]
    AuditTimeout { page_key: String, timeout: Duration },

    #[error("Audit of '{page_key}' failed: {reason}")]
    AuditFailed { page_key: String, reason: String },

    #[error("Unsupported in this browser: {0}")]
    Unsupported(String),

    #[error("Failed to render report: {0}")]
    Report(String),
}

impl PerfError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            PerfError::NotFound(path)
        } else {
            PerfError::Io { path, source }
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        PerfError::Parse {
            path: path.into(),
            source,
        }
    }
}

impl From<chromiumoxide::error::CdpError> for PerfError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        PerfError::Browser(err.to_string())
    }
}

impl From<std::fmt::Error> for PerfError {
    fn from(err: std::fmt::Error) -> Self {
        PerfError::Report(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PerfError>;
