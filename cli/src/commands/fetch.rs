use anyhow::Result;
use comfyfetch_core::downloaders::HuggingFaceDownloader;
use comfyfetch_core::{Config, ModelCategory, Orchestrator};
use std::path::PathBuf;
use std::sync::Arc;

use super::workflow_request;
use crate::SourceArgs;

pub struct FetchOptions {
    pub include: Vec<ModelCategory>,
    pub exclude: Vec<ModelCategory>,
    pub models_dir: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub quiet: bool,
}

/// Returns whether every model ended up available.
pub async fn execute(source: &SourceArgs, options: FetchOptions) -> Result<bool> {
    let config = Config::load()?;

    let mut run_config = config.run_config();
    for category in options.include {
        run_config.categories.set(category, true);
    }
    for category in options.exclude {
        run_config.categories.set(category, false);
    }
    if let Some(models_dir) = options.models_dir {
        run_config.models_root = models_dir;
    }
    if let Some(jobs) = options.jobs {
        run_config.max_concurrent = jobs.max(1);
    }

    let mut downloader = HuggingFaceDownloader::from_config(&config.downloads)?;
    if options.quiet {
        downloader = downloader.quiet();
    }

    let request = match workflow_request(source) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!("{:#}", e);
            println!("{:#}", e);
            return Ok(false);
        }
    };
    let orchestrator = Orchestrator::new(run_config, config.base_path(), Arc::new(downloader));
    let summary = orchestrator.run(&request).await;

    println!("{}", summary);
    Ok(summary.is_success())
}
