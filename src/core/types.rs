//! Domain records
//!
//! Plain data handed to the engine by the external data layer. They carry no
//! layout state; the builder maps them onto graph nodes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{InfravizError, Result};

fn default_pipeline_id() -> String {
    "pipeline".to_string()
}

/// Everything the CLI reads from a snapshot file
///
/// The environments are listed in promotion order; the pipeline graph links
/// them in exactly this order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureSnapshot {
    #[serde(default = "default_pipeline_id")]
    pub id: String,
    #[serde(default = "default_pipeline_id")]
    pub name: String,
    #[serde(default)]
    pub environments: Vec<EnvironmentRecord>,
}

impl Default for InfrastructureSnapshot {
    fn default() -> Self {
        Self {
            id: default_pipeline_id(),
            name: default_pipeline_id(),
            environments: Vec::new(),
        }
    }
}

impl InfrastructureSnapshot {
    /// Read a JSON snapshot file
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| InfravizError::FileReadError {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(InfravizError::Json)
    }

    pub fn find_environment(&self, id: &str) -> Option<&EnvironmentRecord> {
        self.environments.iter().find(|env| env.id == id)
    }

    /// Locate a module anywhere in the snapshot
    pub fn find_module(&self, id: &str) -> Option<&ModuleRecord> {
        self.environments
            .iter()
            .flat_map(|env| env.modules.iter())
            .find(|module| module.id == id)
    }
}

/// A deployment environment (dev, staging, prod, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub modules: Vec<ModuleRecord>,
}

impl EnvironmentRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            modules: Vec::new(),
        }
    }

    pub fn with_module(mut self, module: ModuleRecord) -> Self {
        self.modules.push(module);
        self
    }
}

/// An infrastructure module instantiated inside an environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Module input values; may hold `${...}` interpolations
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
}

impl ModuleRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            depends_on: Vec::new(),
            inputs: BTreeMap::new(),
            validation_errors: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }

    pub fn with_input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(key.into(), value);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.validation_errors.push(message.into());
        self
    }

    pub fn with_resource(mut self, resource: ResourceRecord) -> Self {
        self.resources.push(resource);
        self
    }

    /// A module is in error if it or any of its resources reports errors
    pub fn has_errors(&self) -> bool {
        !self.validation_errors.is_empty() || self.resources.iter().any(|r| r.has_errors())
    }

    pub fn reference_key(&self) -> String {
        format!("module.{}", self.name)
    }
}

/// Kind of block a resource record came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    #[default]
    Resource,
    Data,
    Variable,
    Output,
    Local,
    Provider,
}

/// A single resource-like block inside a module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ResourceKind,
    /// Provider type such as `aws_instance`; empty for variables, locals and
    /// outputs
    #[serde(default, rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub validation_errors: Vec<String>,
}

impl ResourceRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            resource_type: String::new(),
            depends_on: Vec::new(),
            attributes: BTreeMap::new(),
            validation_errors: Vec::new(),
        }
    }

    pub fn with_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = resource_type.into();
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.validation_errors.push(message.into());
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.validation_errors.is_empty()
    }

    /// The dotted address other blocks use to interpolate this one
    pub fn reference_key(&self) -> String {
        match self.kind {
            ResourceKind::Resource if self.resource_type.is_empty() => self.name.clone(),
            ResourceKind::Resource => format!("{}.{}", self.resource_type, self.name),
            ResourceKind::Data => format!("data.{}.{}", self.resource_type, self.name),
            ResourceKind::Variable => format!("var.{}", self.name),
            ResourceKind::Output => format!("output.{}", self.name),
            ResourceKind::Local => format!("local.{}", self.name),
            ResourceKind::Provider => format!("provider.{}", self.name),
        }
    }
}
