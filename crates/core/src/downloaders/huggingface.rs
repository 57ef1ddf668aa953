use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::Downloader;
use crate::config::DownloadsConfig;
use crate::error::TransferError;
use crate::models::is_contained_path;

pub const HF_ENDPOINT: &str = "https://huggingface.co";

/// Downloads single files from a HuggingFace-compatible host, resuming
/// interrupted transfers from a `.part` file.
pub struct HuggingFaceDownloader {
    client: Client,
    endpoint: String,
    revision: String,
    token: Option<String>,
    progress: MultiProgress,
}

impl HuggingFaceDownloader {
    pub fn from_config(config: &DownloadsConfig) -> Result<Self> {
        Self::with_endpoint(&config.endpoint, &config.revision, config.token())
    }

    pub fn with_endpoint(endpoint: &str, revision: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("comfyfetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self::with_client(client, endpoint, revision, token))
    }

    pub fn with_client(
        client: Client,
        endpoint: &str,
        revision: &str,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            revision: revision.to_string(),
            token,
            progress: MultiProgress::new(),
        }
    }

    /// Hide progress bars, e.g. when output is not a terminal.
    pub fn quiet(self) -> Self {
        self.progress
            .set_draw_target(indicatif::ProgressDrawTarget::hidden());
        self
    }

    pub fn file_url(&self, repo_id: &str, filename: &str) -> String {
        format!(
            "{}/{}/resolve/{}/{}",
            self.endpoint, repo_id, self.revision, filename
        )
    }

    fn progress_bar(&self, total_size: u64, filename: &str) -> ProgressBar {
        let pb = self.progress.add(ProgressBar::new(total_size));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb.set_message(filename.to_string());
        pb
    }

    async fn download_file(
        &self,
        repo_id: &str,
        filename: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, TransferError> {
        if !is_contained_path(filename) {
            return Err(TransferError::UnsafePath(filename.to_string()));
        }
        let url = self.file_url(repo_id, filename);

        // Remote filenames may contain subdirectories
        let dest_path = dest_dir.join(filename);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(TransferError::io(parent))?;
        }

        let part_path = partial_path(&dest_path);
        let resume_from = fs::metadata(&part_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if resume_from > 0 {
            debug!("Resuming {} from byte {}", filename, resume_from);
            request = request.header(RANGE, format!("bytes={}-", resume_from));
        }

        let response = request.send().await.map_err(|source| TransferError::Http {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE && resume_from > 0 {
            // The partial file already holds everything.
            fs::rename(&part_path, &dest_path)
                .await
                .map_err(TransferError::io(&dest_path))?;
            return Ok(dest_path);
        }
        if !status.is_success() {
            return Err(TransferError::Status { url, status });
        }

        let resuming = status == StatusCode::PARTIAL_CONTENT;
        let mut file = if resuming {
            OpenOptions::new().append(true).open(&part_path).await
        } else {
            File::create(&part_path).await
        }
        .map_err(TransferError::io(&part_path))?;

        let mut downloaded = if resuming { resume_from } else { 0 };
        let total_size = response
            .content_length()
            .map(|len| len + downloaded)
            .unwrap_or(0);

        let pb = self.progress_bar(total_size, filename);
        pb.set_position(downloaded);

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| TransferError::Http {
                url: url.clone(),
                source,
            })?;
            file.write_all(&chunk)
                .await
                .map_err(TransferError::io(&part_path))?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }
        file.flush().await.map_err(TransferError::io(&part_path))?;
        drop(file);

        fs::rename(&part_path, &dest_path)
            .await
            .map_err(TransferError::io(&dest_path))?;

        pb.finish_with_message(format!("Downloaded {}", filename));
        Ok(dest_path)
    }
}

/// `<file>.part` next to the destination.
pub fn partial_path(dest_path: &Path) -> PathBuf {
    let mut name = dest_path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[async_trait]
impl Downloader for HuggingFaceDownloader {
    async fn download(
        &self,
        repo_id: &str,
        filename: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, TransferError> {
        self.download_file(repo_id, filename, dest_dir).await
    }
}
