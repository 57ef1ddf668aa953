use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while resolving the workflow document for a run.
///
/// The `Display` text is what the caller sees as the run summary, so it is
/// phrased for an operator rather than a developer.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Failed to load workflow file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to load workflow file {}: {source}", path.display())]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse workflow JSON: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },

    #[error("No workflow provided. Select a file, paste JSON, or use current workflow.")]
    NoWorkflow,

    #[error("Workflow is empty")]
    Empty,
}

/// Failures reported by a [`Downloader`](crate::downloaders::Downloader).
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("refusing to write outside the models directory: {0}")]
    UnsafePath(String),

    #[error("{0}")]
    Client(String),
}

impl TransferError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| TransferError::Io { path, source }
    }
}
