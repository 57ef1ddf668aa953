//! comfyfetch_core - Fetch the models a node workflow depends on
//!
//! This crate provides:
//! - Workflow document loading and workflow file discovery
//! - Model reference extraction (declared manifests and loader nodes)
//! - Per-reference acquisition against a local models directory
//! - A HuggingFace download client and the run orchestrator

pub mod acquire;
pub mod config;
pub mod downloaders;
pub mod error;
pub mod extract;
pub mod models;
pub mod orchestrator;
pub mod workflow;

pub use acquire::Acquirer;
pub use config::{CategoryToggles, Config};
pub use error::{TransferError, WorkflowError};
pub use extract::extract;
pub use models::{
    AcquisitionOutcome, ModelCategory, ModelReference, ReferenceOrigin, ReferenceSet,
    RepoCoordinates,
};
pub use orchestrator::{AcquisitionRecord, Orchestrator, RunConfig, RunSummary};
pub use workflow::{
    list_workflow_files, AcquisitionMode, HostContext, WorkflowDocument, WorkflowRequest,
    UNSELECTED_WORKFLOW,
};
