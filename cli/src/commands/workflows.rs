use anyhow::Result;
use comfyfetch_core::{list_workflow_files, Config, UNSELECTED_WORKFLOW};

pub async fn execute() -> Result<()> {
    let config = Config::load()?;
    let workflows_dir = config.workflows_dir();

    let files: Vec<_> = list_workflow_files(config.base_path(), &workflows_dir)
        .into_iter()
        .filter(|f| f != UNSELECTED_WORKFLOW)
        .collect();

    if files.is_empty() {
        println!("No workflow files in {}", workflows_dir.display());
        return Ok(());
    }

    for file in files {
        println!("{}", file);
    }
    println!("\nRun `comfyfetch fetch --mode from-file --file <path>` to fetch a workflow's models.");

    Ok(())
}
