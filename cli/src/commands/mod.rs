pub mod config;
pub mod fetch;
pub mod scan;
pub mod workflows;

use anyhow::{Context, Result};
use comfyfetch_core::{AcquisitionMode, HostContext, WorkflowRequest};
use std::io::Read;

use crate::SourceArgs;

/// Turn command line source options into a request. Loading the host
/// context is part of resolving the "current workflow", so a bad context
/// file is reported like any other unusable workflow.
pub fn workflow_request(source: &SourceArgs) -> Result<WorkflowRequest> {
    let workflow_json = match source.json.as_deref() {
        Some("-") => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read workflow JSON from stdin")?;
            Some(text)
        }
        other => other.map(str::to_string),
    };

    let mut request = WorkflowRequest {
        mode: source.mode.into(),
        workflow_file: source.file.clone(),
        workflow_json,
        host_context: None,
    };

    // The context is only read when nothing ahead of it in resolution order
    // supplies the document.
    if request.mode == AcquisitionMode::CurrentWorkflow && !has_text(&request.workflow_json) {
        request.host_context = source
            .context
            .as_deref()
            .map(HostContext::from_file)
            .transpose()?;
    }

    Ok(request)
}

fn has_text(text: &Option<String>) -> bool {
    text.as_deref().is_some_and(|t| !t.trim().is_empty())
}
