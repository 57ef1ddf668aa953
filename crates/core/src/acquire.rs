//! Existence-check-then-fetch for a single model reference.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{error, info, warn};

use crate::downloaders::Downloader;
use crate::error::TransferError;
use crate::models::{is_contained_path, AcquisitionOutcome, ModelCategory, ModelReference};

const MB: f64 = 1024.0 * 1024.0;

pub struct Acquirer {
    models_root: PathBuf,
    downloader: Arc<dyn Downloader>,
}

impl Acquirer {
    pub fn new(models_root: impl Into<PathBuf>, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            models_root: models_root.into(),
            downloader,
        }
    }

    /// `<models_root>/<category>/<filename>`
    pub fn target_path(&self, reference: &ModelReference, category: ModelCategory) -> PathBuf {
        self.category_dir(category).join(&reference.filename)
    }

    fn category_dir(&self, category: ModelCategory) -> PathBuf {
        self.models_root.join(category.dir_name())
    }

    /// Make sure `reference` is present under `category`, downloading it if
    /// it has a remote source. Transfer failures come back as
    /// [`AcquisitionOutcome::FetchFailed`], never as an error.
    ///
    /// An existing file is trusted as-is; its contents are not verified.
    /// Filenames that would resolve outside the category directory are
    /// never looked up or written.
    pub async fn acquire(
        &self,
        reference: &ModelReference,
        category: ModelCategory,
    ) -> AcquisitionOutcome {
        let name = reference.display_name.as_str();

        let unsafe_name = std::iter::once(reference.filename.as_str())
            .chain(
                reference
                    .repository_coordinates
                    .as_ref()
                    .map(|c| c.remote_filename.as_str()),
            )
            .find(|f| !is_contained_path(f));
        if let Some(unsafe_name) = unsafe_name {
            error!(model = %name, %category, "Rejecting filename '{}'", unsafe_name);
            return match reference.repository_coordinates {
                Some(_) => AcquisitionOutcome::FetchFailed(TransferError::UnsafePath(
                    unsafe_name.to_string(),
                )),
                None => AcquisitionOutcome::MissingNoSource,
            };
        }

        let target_path = self.target_path(reference, category);

        let Some(coordinates) = &reference.repository_coordinates else {
            return match file_size(&target_path).await {
                Some(_) => {
                    info!(model = %name, %category, "Already exists locally");
                    AcquisitionOutcome::AlreadyPresent
                }
                None => {
                    warn!(model = %name, %category, "Not found and no download info available");
                    AcquisitionOutcome::MissingNoSource
                }
            };
        };

        if let Some(size) = file_size(&target_path).await {
            info!(
                model = %name,
                %category,
                "Already exists ({:.1} MB). Skipping.",
                size as f64 / MB
            );
            return AcquisitionOutcome::AlreadyPresent;
        }

        info!(model = %name, %category, "Downloading from {}", coordinates.repo_id);

        let dest_dir = self.category_dir(category);
        let result = match fs::create_dir_all(&dest_dir).await {
            Ok(()) => {
                self.downloader
                    .download(&coordinates.repo_id, &coordinates.remote_filename, &dest_dir)
                    .await
            }
            Err(source) => Err(TransferError::Io {
                path: dest_dir.clone(),
                source,
            }),
        };

        match result {
            Ok(path) => {
                let size = file_size(&path).await.unwrap_or(0);
                info!(
                    model = %name,
                    %category,
                    "Downloaded successfully ({:.1} MB)",
                    size as f64 / MB
                );
                AcquisitionOutcome::Fetched
            }
            Err(e) => {
                error!(model = %name, %category, "Failed to download: {}", e);
                AcquisitionOutcome::FetchFailed(e)
            }
        }
    }
}

async fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).await.ok().map(|m| m.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReferenceOrigin, RepoCoordinates};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeDownloader {
        calls: Mutex<Vec<(String, String, PathBuf)>>,
        fail: bool,
    }

    impl FakeDownloader {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Downloader for FakeDownloader {
        async fn download(
            &self,
            repo_id: &str,
            filename: &str,
            dest_dir: &Path,
        ) -> Result<PathBuf, TransferError> {
            self.calls.lock().unwrap().push((
                repo_id.to_string(),
                filename.to_string(),
                dest_dir.to_path_buf(),
            ));
            if self.fail {
                return Err(TransferError::Client("simulated outage".to_string()));
            }
            let path = dest_dir.join(filename);
            fs::write(&path, b"weights")
                .await
                .map_err(TransferError::io(&path))?;
            Ok(path)
        }
    }

    fn remote_reference() -> ModelReference {
        ModelReference {
            display_name: "Model".to_string(),
            filename: "model.bin".to_string(),
            repository_coordinates: Some(RepoCoordinates {
                repo_id: "org/model".to_string(),
                remote_filename: "model.bin".to_string(),
            }),
            origin: ReferenceOrigin::DeclaredManifest,
        }
    }

    fn setup(downloader: FakeDownloader) -> (TempDir, Arc<FakeDownloader>, Acquirer) {
        let temp_dir = TempDir::new().unwrap();
        let downloader = Arc::new(downloader);
        let acquirer = Acquirer::new(temp_dir.path(), downloader.clone());
        (temp_dir, downloader, acquirer)
    }

    #[test]
    fn test_target_path() {
        let (temp_dir, _, acquirer) = setup(FakeDownloader::default());
        assert_eq!(
            acquirer.target_path(&remote_reference(), ModelCategory::ControlNet),
            temp_dir.path().join("controlnet").join("model.bin")
        );
    }

    #[tokio::test]
    async fn test_fetches_missing_file_once() {
        let (temp_dir, downloader, acquirer) = setup(FakeDownloader::default());
        let reference = remote_reference();

        let first = acquirer.acquire(&reference, ModelCategory::Checkpoint).await;
        assert!(matches!(first, AcquisitionOutcome::Fetched));
        assert!(temp_dir.path().join("checkpoints/model.bin").exists());

        let second = acquirer.acquire(&reference, ModelCategory::Checkpoint).await;
        assert!(matches!(second, AcquisitionOutcome::AlreadyPresent));

        let calls = downloader.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![(
                "org/model".to_string(),
                "model.bin".to_string(),
                temp_dir.path().join("checkpoints")
            )]
        );
    }

    #[tokio::test]
    async fn test_existing_file_skips_download() {
        let (temp_dir, downloader, acquirer) = setup(FakeDownloader::default());
        std::fs::create_dir_all(temp_dir.path().join("vae")).unwrap();
        std::fs::write(temp_dir.path().join("vae/model.bin"), b"old").unwrap();

        let outcome = acquirer.acquire(&remote_reference(), ModelCategory::Vae).await;
        assert!(matches!(outcome, AcquisitionOutcome::AlreadyPresent));
        assert_eq!(downloader.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transfer_failure_becomes_outcome() {
        let (_temp_dir, downloader, acquirer) = setup(FakeDownloader::failing());

        let outcome = acquirer.acquire(&remote_reference(), ModelCategory::Lora).await;
        match outcome {
            AcquisitionOutcome::FetchFailed(e) => assert_eq!(e.to_string(), "simulated outage"),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(downloader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_filenames_outside_models_root_are_rejected() {
        let (temp_dir, downloader, acquirer) = setup(FakeDownloader::default());
        let outside = TempDir::new().unwrap();
        let absolute = outside.path().join("pwned.bin").display().to_string();

        for filename in [absolute.as_str(), "../../escaped.bin"] {
            let mut reference = remote_reference();
            reference.filename = filename.to_string();
            reference.repository_coordinates = Some(RepoCoordinates {
                repo_id: "evil/x".to_string(),
                remote_filename: filename.to_string(),
            });

            let outcome = acquirer.acquire(&reference, ModelCategory::Checkpoint).await;
            assert!(matches!(
                outcome,
                AcquisitionOutcome::FetchFailed(TransferError::UnsafePath(_))
            ));
        }

        // A safe local name with an unsafe remote name is still refused.
        let mut reference = remote_reference();
        reference.repository_coordinates = Some(RepoCoordinates {
            repo_id: "evil/x".to_string(),
            remote_filename: "../model.bin".to_string(),
        });
        let outcome = acquirer.acquire(&reference, ModelCategory::Checkpoint).await;
        assert!(matches!(outcome, AcquisitionOutcome::FetchFailed(_)));

        // Existing files outside the root are not reported as present either.
        std::fs::write(outside.path().join("local.bin"), b"x").unwrap();
        let local = ModelReference::from_node_input(
            &outside.path().join("local.bin").display().to_string(),
        );
        let outcome = acquirer.acquire(&local, ModelCategory::Vae).await;
        assert!(matches!(outcome, AcquisitionOutcome::MissingNoSource));

        assert_eq!(downloader.call_count(), 0);
        assert!(!outside.path().join("pwned.bin").exists());
        assert!(!temp_dir.path().join("../escaped.bin").exists());
        assert!(!temp_dir.path().join("checkpoints").exists());
    }

    #[tokio::test]
    async fn test_local_only_reference() {
        let (temp_dir, downloader, acquirer) = setup(FakeDownloader::default());
        let reference = ModelReference::from_node_input("local.safetensors");

        let missing = acquirer.acquire(&reference, ModelCategory::Checkpoint).await;
        assert!(matches!(missing, AcquisitionOutcome::MissingNoSource));
        // No source means the category directory is left alone.
        assert!(!temp_dir.path().join("checkpoints").exists());

        std::fs::create_dir_all(temp_dir.path().join("checkpoints")).unwrap();
        std::fs::write(temp_dir.path().join("checkpoints/local.safetensors"), b"x").unwrap();
        let present = acquirer.acquire(&reference, ModelCategory::Checkpoint).await;
        assert!(matches!(present, AcquisitionOutcome::AlreadyPresent));

        assert_eq!(downloader.call_count(), 0);
    }
}
