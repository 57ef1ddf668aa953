//! Workflow documents and where they come from.
//!
//! A run operates on exactly one document, picked from a file under the host
//! installation, pasted JSON text, or the workflow the host currently has
//! loaded. [`WorkflowRequest::resolve`] applies that precedence.

use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

use crate::error::WorkflowError;

/// Placeholder entry heading the workflow file list; selecting it means
/// "no file".
pub const UNSELECTED_WORKFLOW: &str = "(select file)";

/// A parsed workflow graph. Read-only; nothing here interprets the graph
/// beyond scanning it for model references.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDocument(Value);

impl WorkflowDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn parse(text: &str) -> Result<Self, WorkflowError> {
        serde_json::from_str(text)
            .map(Self)
            .map_err(|source| WorkflowError::Parse { source })
    }

    pub fn from_file(path: &Path) -> Result<Self, WorkflowError> {
        let content = fs::read_to_string(path).map_err(|source| WorkflowError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content)
            .map(Self)
            .map_err(|source| WorkflowError::ParseFile {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Null, `false`, zero, and empty strings/arrays/objects all count as
    /// an empty document.
    pub fn is_empty(&self) -> bool {
        !is_truthy(&self.0)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// What the host knows about the workflow it is currently running.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostContext {
    /// Metadata the host embeds in outputs; carries the editor workflow
    /// under `workflow`.
    #[serde(default)]
    pub extra_pnginfo: Option<Value>,

    /// The raw execution graph (node id to node record).
    #[serde(default)]
    pub prompt: Option<Value>,
}

impl HostContext {
    pub fn from_file(path: &Path) -> Result<Self, WorkflowError> {
        let content = fs::read_to_string(path).map_err(|source| WorkflowError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| WorkflowError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Available when either the embedded metadata or the execution graph
    /// is non-empty; a prompt alone is enough.
    pub fn is_available(&self) -> bool {
        self.extra_pnginfo.as_ref().is_some_and(is_truthy)
            || self.prompt.as_ref().is_some_and(is_truthy)
    }

    /// The embedded workflow, or the execution graph wrapped as
    /// `{"prompt": ...}` when no workflow is embedded. May be empty.
    pub fn current_workflow(&self) -> WorkflowDocument {
        let embedded = self
            .extra_pnginfo
            .as_ref()
            .and_then(|extra| extra.get("workflow"))
            .filter(|workflow| is_truthy(workflow));

        if let Some(workflow) = embedded {
            return WorkflowDocument::new(workflow.clone());
        }

        match self.prompt.as_ref().filter(|p| is_truthy(p)) {
            Some(prompt) => WorkflowDocument::new(json!({ "prompt": prompt })),
            None => WorkflowDocument::new(Value::Null),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionMode {
    #[default]
    CurrentWorkflow,
    FromFile,
}

impl AcquisitionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionMode::CurrentWorkflow => "current_workflow",
            AcquisitionMode::FromFile => "from_file",
        }
    }
}

/// The inputs that decide which workflow document a run operates on.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRequest {
    pub mode: AcquisitionMode,
    /// Entry from [`list_workflow_files`], relative to the base path.
    pub workflow_file: Option<String>,
    /// Pasted workflow JSON.
    pub workflow_json: Option<String>,
    pub host_context: Option<HostContext>,
}

impl WorkflowRequest {
    fn selected_file(&self) -> Option<&str> {
        self.workflow_file
            .as_deref()
            .filter(|f| !f.is_empty() && *f != UNSELECTED_WORKFLOW)
    }

    fn pasted_json(&self) -> Option<&str> {
        self.workflow_json
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// Pick and load the document. First match wins: a selected file in
    /// `from_file` mode, pasted JSON, then the host's current workflow.
    pub fn resolve(&self, base_path: &Path) -> Result<WorkflowDocument, WorkflowError> {
        if self.mode == AcquisitionMode::FromFile {
            if let Some(file) = self.selected_file() {
                let document = WorkflowDocument::from_file(&base_path.join(file))?;
                info!("Loaded workflow from: {}", file);
                return Ok(document);
            }
        }

        if let Some(text) = self.pasted_json() {
            let document = WorkflowDocument::parse(text)?;
            info!("Loaded workflow from JSON input");
            return Ok(document);
        }

        if self.mode == AcquisitionMode::CurrentWorkflow {
            if let Some(context) = self.host_context.as_ref().filter(|c| c.is_available()) {
                info!("Using current workflow");
                return Ok(context.current_workflow());
            }
        }

        Err(WorkflowError::NoWorkflow)
    }
}

/// Selector entries for the workflow files a user can pick: the
/// [`UNSELECTED_WORKFLOW`] placeholder, then every `*.json` directly inside
/// `workflows_dir`, relative to `base_path` where possible.
pub fn list_workflow_files(base_path: &Path, workflows_dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(workflows_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
        .map(|e| relative_to(e.path(), base_path))
        .collect();
    files.sort();

    let mut entries = Vec::with_capacity(files.len() + 1);
    entries.push(UNSELECTED_WORKFLOW.to_string());
    entries.extend(files);
    entries
}

fn relative_to(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .map(PathBuf::from)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
