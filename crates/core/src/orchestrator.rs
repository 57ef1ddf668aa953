//! Runs one workflow end to end: resolve the document, extract its model
//! references, acquire every reference in the enabled categories.

use futures_util::stream::{self, StreamExt};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::acquire::Acquirer;
use crate::config::CategoryToggles;
use crate::downloaders::Downloader;
use crate::error::WorkflowError;
use crate::extract::extract;
use crate::models::{AcquisitionOutcome, ModelCategory, ModelReference, ReferenceSet};
use crate::workflow::WorkflowRequest;

/// Everything a run needs to know besides the workflow itself.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub models_root: PathBuf,
    pub categories: CategoryToggles,
    /// Upper bound on acquisitions in flight.
    pub max_concurrent: usize,
}

#[derive(Debug)]
pub struct AcquisitionRecord {
    pub category: ModelCategory,
    pub reference: ModelReference,
    pub outcome: AcquisitionOutcome,
}

/// How a run ended. `Display` gives the one-line status for the user.
#[derive(Debug)]
pub enum RunSummary {
    /// No usable workflow document; nothing was extracted or acquired.
    Failed(WorkflowError),
    NoModels,
    Completed {
        succeeded: usize,
        failed: usize,
        records: Vec<AcquisitionRecord>,
    },
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        match self {
            RunSummary::Failed(_) => false,
            RunSummary::NoModels => true,
            RunSummary::Completed { failed, .. } => *failed == 0,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunSummary::Failed(e) => write!(f, "{}", e),
            RunSummary::NoModels => f.write_str("No models found in workflow"),
            RunSummary::Completed {
                succeeded, failed, ..
            } => {
                write!(f, "Downloaded {} model(s)", succeeded)?;
                if *failed > 0 {
                    write!(f, ", {} failed", failed)?;
                }
                Ok(())
            }
        }
    }
}

pub struct Orchestrator {
    config: RunConfig,
    base_path: PathBuf,
    acquirer: Acquirer,
}

impl Orchestrator {
    /// `base_path` anchors workflow file selections.
    pub fn new(
        config: RunConfig,
        base_path: impl Into<PathBuf>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        let acquirer = Acquirer::new(config.models_root.clone(), downloader);
        Self {
            config,
            base_path: base_path.into(),
            acquirer,
        }
    }

    pub async fn run(&self, request: &WorkflowRequest) -> RunSummary {
        info!("Workflow model downloader");
        info!("Mode: {}", request.mode.as_str());

        let document = match request.resolve(&self.base_path) {
            Ok(document) => document,
            Err(e) => {
                error!("{}", e);
                return RunSummary::Failed(e);
            }
        };

        if document.is_empty() {
            error!("{}", WorkflowError::Empty);
            return RunSummary::Failed(WorkflowError::Empty);
        }

        info!("Extracting model information...");
        let references = extract(&document);
        self.acquire_all(&references).await
    }

    /// Acquire every reference in the enabled categories. Up to
    /// `max_concurrent` acquisitions run at once; records come back in
    /// category order, then discovery order.
    pub async fn acquire_all(&self, references: &ReferenceSet) -> RunSummary {
        let total = references.total();
        if total == 0 {
            info!("No models found in workflow");
            return RunSummary::NoModels;
        }
        info!("Found {} model(s) in workflow", total);

        let mut work = Vec::new();
        for category in ModelCategory::ALL {
            let models = references.get(category);
            if !self.config.categories.is_enabled(category) || models.is_empty() {
                continue;
            }
            info!("Processing {} {} model(s)...", models.len(), category.as_str());
            work.extend(models.iter().map(|reference| (category, reference)));
        }

        let records: Vec<AcquisitionRecord> = stream::iter(work)
            .map(|(category, reference)| async move {
                let outcome = self.acquirer.acquire(reference, category).await;
                debug!(model = %reference.display_name, %category, outcome = outcome.as_str(), "Acquisition finished");
                AcquisitionRecord {
                    category,
                    reference: reference.clone(),
                    outcome,
                }
            })
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let succeeded = records.iter().filter(|r| r.outcome.is_success()).count();
        let failed = records.len() - succeeded;

        info!("Download summary: {} succeeded, {} failed", succeeded, failed);

        RunSummary::Completed {
            succeeded,
            failed,
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_text() {
        let done = RunSummary::Completed {
            succeeded: 3,
            failed: 0,
            records: Vec::new(),
        };
        assert_eq!(done.to_string(), "Downloaded 3 model(s)");
        assert!(done.is_success());

        let partial = RunSummary::Completed {
            succeeded: 1,
            failed: 2,
            records: Vec::new(),
        };
        assert_eq!(partial.to_string(), "Downloaded 1 model(s), 2 failed");
        assert!(!partial.is_success());

        assert_eq!(RunSummary::NoModels.to_string(), "No models found in workflow");
        assert_eq!(
            RunSummary::Failed(WorkflowError::Empty).to_string(),
            "Workflow is empty"
        );
    }
}
