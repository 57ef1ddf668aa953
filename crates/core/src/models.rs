use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};

use crate::error::TransferError;

/// Kind of model a workflow depends on. Each kind lives in its own
/// subdirectory of the models root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelCategory {
    #[serde(rename = "checkpoints")]
    Checkpoint,
    #[serde(rename = "vae")]
    Vae,
    #[serde(rename = "controlnet")]
    ControlNet,
    #[serde(rename = "loras")]
    Lora,
}

impl ModelCategory {
    /// Acquisition order.
    pub const ALL: [ModelCategory; 4] = [
        ModelCategory::Checkpoint,
        ModelCategory::Vae,
        ModelCategory::ControlNet,
        ModelCategory::Lora,
    ];

    /// Subdirectory name under the models root; also the manifest key.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ModelCategory::Checkpoint => "checkpoints",
            ModelCategory::Vae => "vae",
            ModelCategory::ControlNet => "controlnet",
            ModelCategory::Lora => "loras",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelCategory::Checkpoint => "checkpoint",
            ModelCategory::Vae => "VAE",
            ModelCategory::ControlNet => "ControlNet",
            ModelCategory::Lora => "LoRA",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.dir_name() == name)
    }
}

impl fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Where a model can be fetched from on the remote host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoCoordinates {
    pub repo_id: String,
    pub remote_filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceOrigin {
    DeclaredManifest,
    NodeScan,
}

impl ReferenceOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceOrigin::DeclaredManifest => "declared_manifest",
            ReferenceOrigin::NodeScan => "node_scan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReference {
    pub display_name: String,
    /// File name inside the category directory. Unique within a category.
    pub filename: String,
    pub repository_coordinates: Option<RepoCoordinates>,
    pub origin: ReferenceOrigin,
}

impl ModelReference {
    /// A reference read from a loader node's input; it has no remote source.
    pub fn from_node_input(filename: &str) -> Self {
        Self {
            display_name: filename.to_string(),
            filename: filename.to_string(),
            repository_coordinates: None,
            origin: ReferenceOrigin::NodeScan,
        }
    }
}

/// Whether `name`, joined onto a directory, stays inside it: relative,
/// naming at least one entry, and without `..` components.
pub fn is_contained_path(name: &str) -> bool {
    let components = || Path::new(name).components();
    components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && components().any(|c| matches!(c, Component::Normal(_)))
}

/// Model references grouped by category, each list in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceSet {
    checkpoints: Vec<ModelReference>,
    vae: Vec<ModelReference>,
    controlnet: Vec<ModelReference>,
    loras: Vec<ModelReference>,
}

impl ReferenceSet {
    pub fn get(&self, category: ModelCategory) -> &[ModelReference] {
        match category {
            ModelCategory::Checkpoint => &self.checkpoints,
            ModelCategory::Vae => &self.vae,
            ModelCategory::ControlNet => &self.controlnet,
            ModelCategory::Lora => &self.loras,
        }
    }

    fn get_mut(&mut self, category: ModelCategory) -> &mut Vec<ModelReference> {
        match category {
            ModelCategory::Checkpoint => &mut self.checkpoints,
            ModelCategory::Vae => &mut self.vae,
            ModelCategory::ControlNet => &mut self.controlnet,
            ModelCategory::Lora => &mut self.loras,
        }
    }

    pub fn contains(&self, category: ModelCategory, filename: &str) -> bool {
        self.get(category).iter().any(|m| m.filename == filename)
    }

    /// Append `reference` unless its filename is already listed in
    /// `category`. Returns whether it was added.
    pub fn push_unique(&mut self, category: ModelCategory, reference: ModelReference) -> bool {
        if self.contains(category, &reference.filename) {
            return false;
        }
        self.get_mut(category).push(reference);
        true
    }

    pub fn total(&self) -> usize {
        ModelCategory::ALL.iter().map(|c| self.get(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// All references in acquisition order.
    pub fn iter(&self) -> impl Iterator<Item = (ModelCategory, &ModelReference)> {
        ModelCategory::ALL
            .into_iter()
            .flat_map(move |c| self.get(c).iter().map(move |m| (c, m)))
    }
}

/// Result of acquiring a single reference.
#[derive(Debug)]
pub enum AcquisitionOutcome {
    AlreadyPresent,
    Fetched,
    FetchFailed(TransferError),
    MissingNoSource,
}

impl AcquisitionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            AcquisitionOutcome::AlreadyPresent | AcquisitionOutcome::Fetched
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionOutcome::AlreadyPresent => "already_present",
            AcquisitionOutcome::Fetched => "fetched",
            AcquisitionOutcome::FetchFailed(_) => "fetch_failed",
            AcquisitionOutcome::MissingNoSource => "missing_no_source",
        }
    }
}
