//! Show what a workflow references without touching the models directory

use anyhow::Result;
use comfyfetch_core::{extract, Config, ModelCategory, WorkflowError};

use super::workflow_request;
use crate::SourceArgs;

pub async fn execute(source: &SourceArgs, as_json: bool) -> Result<()> {
    let config = Config::load()?;
    let request = workflow_request(source)?;

    let document = request.resolve(config.base_path())?;
    if document.is_empty() {
        return Err(WorkflowError::Empty.into());
    }
    let references = extract(&document);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&references)?);
        return Ok(());
    }

    if references.is_empty() {
        println!("No models found in workflow");
        return Ok(());
    }

    println!("{:<12} {:<48} {:<18} {}", "CATEGORY", "FILENAME", "ORIGIN", "SOURCE");
    println!("{}", "-".repeat(100));

    for (category, model) in references.iter() {
        let source = model
            .repository_coordinates
            .as_ref()
            .map(|c| format!("{}:{}", c.repo_id, c.remote_filename))
            .unwrap_or_else(|| "(local only)".to_string());
        println!(
            "{:<12} {:<48} {:<18} {}",
            category.dir_name(),
            model.filename,
            model.origin.as_str(),
            source
        );
    }

    let enabled: Vec<_> = ModelCategory::ALL
        .into_iter()
        .filter(|c| config.categories.is_enabled(*c))
        .map(|c| c.dir_name())
        .collect();

    println!();
    println!("{} model(s) in workflow", references.total());
    println!(
        "Enabled by default: {} (models root: {})",
        enabled.join(", "),
        config.models_dir().display()
    );

    Ok(())
}
