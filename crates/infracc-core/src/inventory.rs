//! Raw resource inventory, as produced by the upstream definition parser.

use serde::{Deserialize, Serialize};

use crate::graph::AttrMap;
use crate::resource;

/// One parsed resource record: `{resourceType, instanceName, attributes}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    /// Explicit provider-source field, when the parser knows it
    /// (e.g. `"registry.terraform.io/hashicorp/aws"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_source: Option<String>,
    #[serde(default)]
    pub attributes: AttrMap,
}

impl RawResource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            provider_source: None,
            attributes: AttrMap::new(),
        }
    }

    /// The graph key for this record.
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    /// Trailing segment of the provider-source field, lowercased
    /// (`"registry.terraform.io/hashicorp/aws"` yields `"aws"`).
    pub fn provider_hint(&self) -> Option<String> {
        self.provider_source
            .as_deref()
            .and_then(|source| source.rsplit('/').next())
            .map(|segment| segment.to_ascii_lowercase())
    }
}

/// Flattened list of every raw resource in the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    pub resources: Vec<RawResource>,
}

impl Inventory {
    pub fn new(resources: Vec<RawResource>) -> Self {
        Self { resources }
    }

    pub fn get(&self, address: &str) -> Option<&RawResource> {
        self.resources.iter().find(|r| r.address() == address)
    }

    /// All records whose type matches the given prefix.
    pub fn by_type(&self, prefix: &str) -> Vec<&RawResource> {
        self.resources
            .iter()
            .filter(|r| resource::matches_prefix(&r.address(), prefix))
            .collect()
    }
}
