pub mod huggingface;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::TransferError;

/// Fetches one file from a remote model repository.
///
/// Implementations write the file directly into `dest_dir` (never as a
/// link into a shared cache) and return its final path.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(
        &self,
        repo_id: &str,
        filename: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, TransferError>;
}

pub use huggingface::HuggingFaceDownloader;
