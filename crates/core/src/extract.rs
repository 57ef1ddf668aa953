//! Model reference extraction.
//!
//! A workflow either declares its models up front in a manifest under
//! `extra_pnginfo.model_manifest`, or we find them by scanning loader nodes.
//! The manifest, when present, is authoritative and no nodes are scanned.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use tracing::{debug, warn};

use crate::models::{
    ModelCategory, ModelReference, ReferenceOrigin, ReferenceSet, RepoCoordinates,
};
use crate::workflow::WorkflowDocument;

/// How a rule tests a node's lowercased `class_type`.
#[derive(Debug, Clone, Copy)]
enum LabelMatch {
    /// At least one of the fragments appears.
    Any(&'static [&'static str]),
    /// Every fragment appears.
    All(&'static [&'static str]),
}

impl LabelMatch {
    fn matches(&self, label: &str) -> bool {
        match self {
            LabelMatch::Any(fragments) => fragments.iter().any(|f| label.contains(f)),
            LabelMatch::All(fragments) => fragments.iter().all(|f| label.contains(f)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ClassificationRule {
    label: LabelMatch,
    category: ModelCategory,
    input: &'static str,
}

/// Rules are independent: a node can satisfy several of them.
const RULES: [ClassificationRule; 4] = [
    ClassificationRule {
        label: LabelMatch::Any(&["checkpoint", "ckpt"]),
        category: ModelCategory::Checkpoint,
        input: "ckpt_name",
    },
    ClassificationRule {
        label: LabelMatch::All(&["vae", "loader"]),
        category: ModelCategory::Vae,
        input: "vae_name",
    },
    ClassificationRule {
        label: LabelMatch::All(&["controlnet", "loader"]),
        category: ModelCategory::ControlNet,
        input: "control_net_name",
    },
    ClassificationRule {
        label: LabelMatch::All(&["lora", "loader"]),
        category: ModelCategory::Lora,
        input: "lora_name",
    },
];

/// Collect the model references a workflow depends on.
///
/// Never fails: anything that does not look like a loader node, or a
/// manifest that cannot be read, simply contributes nothing.
pub fn extract(document: &WorkflowDocument) -> ReferenceSet {
    let root = document.as_value();

    if let Some(manifest) = root
        .get("extra_pnginfo")
        .and_then(|extra| extra.get("model_manifest"))
    {
        debug!("Using declared model manifest");
        return parse_manifest(manifest);
    }

    let mut references = ReferenceSet::default();

    // Nested node collections. `prompt` is where a wrapped execution graph
    // lands.
    for key in ["nodes", "prompt"] {
        if let Some(collection) = root.get(key) {
            scan_collection(collection, &mut references);
        }
    }

    // Some documents put node records at the root.
    if let Some(entries) = root.as_object() {
        for node in entries.values().filter(|v| is_node_record(v)) {
            scan_node(node, &mut references);
        }
    }

    references
}

fn scan_collection(collection: &Value, references: &mut ReferenceSet) {
    match collection {
        Value::Object(nodes) => nodes.values().for_each(|n| scan_node(n, references)),
        Value::Array(nodes) => nodes.iter().for_each(|n| scan_node(n, references)),
        _ => {}
    }
}

fn is_node_record(value: &Value) -> bool {
    value.get("class_type").is_some()
}

fn scan_node(node: &Value, references: &mut ReferenceSet) {
    let Some(label) = node.get("class_type").and_then(Value::as_str) else {
        return;
    };
    let label = label.to_lowercase();
    let inputs = node.get("inputs").and_then(Value::as_object);

    for rule in RULES.iter().filter(|r| r.label.matches(&label)) {
        let Some(filename) = inputs
            .and_then(|i| i.get(rule.input))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
        else {
            continue;
        };

        if references.push_unique(rule.category, ModelReference::from_node_input(filename)) {
            debug!(category = %rule.category, model = %filename, "Found model in node");
        }
    }
}

#[derive(Debug, Deserialize)]
struct ManifestRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    repo_id: Option<String>,
}

impl ManifestRecord {
    fn into_reference(self) -> Option<ModelReference> {
        let name = self.name.filter(|s| !s.is_empty());
        let filename = self.filename.filter(|s| !s.is_empty());

        let local = filename.clone().or_else(|| name.clone())?;
        let repository_coordinates = match (self.repo_id.filter(|s| !s.is_empty()), filename) {
            (Some(repo_id), Some(remote_filename)) => Some(RepoCoordinates {
                repo_id,
                remote_filename,
            }),
            _ => None,
        };

        Some(ModelReference {
            display_name: name.unwrap_or_else(|| local.clone()),
            filename: local,
            repository_coordinates,
            origin: ReferenceOrigin::DeclaredManifest,
        })
    }
}

/// Read a declared manifest, given either as a JSON object or as a string
/// holding one.
pub fn parse_manifest(manifest: &Value) -> ReferenceSet {
    let manifest: Cow<'_, Value> = match manifest {
        Value::String(text) => match serde_json::from_str(text) {
            Ok(value) => Cow::Owned(value),
            Err(e) => {
                warn!("Ignoring unreadable model manifest: {}", e);
                return ReferenceSet::default();
            }
        },
        other => Cow::Borrowed(other),
    };

    let Some(categories) = manifest.as_object() else {
        warn!("Ignoring model manifest that is not an object");
        return ReferenceSet::default();
    };

    manifest_references(categories)
}

fn manifest_references(categories: &Map<String, Value>) -> ReferenceSet {
    let mut references = ReferenceSet::default();

    for (key, records) in categories {
        let Some(category) = ModelCategory::from_dir_name(key) else {
            warn!("Ignoring unknown manifest category '{}'", key);
            continue;
        };
        let Some(records) = records.as_array() else {
            warn!("Manifest category '{}' is not a list", key);
            continue;
        };

        for record in records {
            let reference = match ManifestRecord::deserialize(record) {
                Ok(record) => record.into_reference(),
                Err(e) => {
                    warn!("Skipping malformed {} manifest entry: {}", key, e);
                    continue;
                }
            };
            let Some(reference) = reference else {
                warn!("Skipping {} manifest entry without a name or filename", key);
                continue;
            };

            let filename = reference.filename.clone();
            if !references.push_unique(category, reference) {
                warn!("Duplicate {} manifest entry '{}' ignored", key, filename);
            }
        }
    }

    references
}
