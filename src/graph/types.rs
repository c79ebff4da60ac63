//! Core graph types
//!
//! The node-edge graph handed from the builder through layout and the
//! optimizer to consumers. Serialized field names are camelCase so the JSON
//! form can be fed to a renderer directly.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LayoutConfig;
use crate::constants;
use crate::core::ResourceKind;
use crate::error::{InfravizError, Result};

/// A point in diagram space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(&self, other: &Position) -> Position {
        Position::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Pipeline,
    Environment,
    Module,
    Service,
    Resource,
    Data,
    Variable,
    Output,
    Local,
    Provider,
}

impl NodeType {
    /// Multiplier applied to a node's degree when weighting it
    pub fn weight_multiplier(self) -> f64 {
        match self {
            NodeType::Module => constants::nodes::MODULE_WEIGHT_MULTIPLIER,
            NodeType::Resource => constants::nodes::RESOURCE_WEIGHT_MULTIPLIER,
            _ => constants::nodes::DEFAULT_WEIGHT_MULTIPLIER,
        }
    }
}

impl From<ResourceKind> for NodeType {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Resource => NodeType::Resource,
            ResourceKind::Data => NodeType::Data,
            ResourceKind::Variable => NodeType::Variable,
            ResourceKind::Output => NodeType::Output,
            ResourceKind::Local => NodeType::Local,
            ResourceKind::Provider => NodeType::Provider,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeType::Pipeline => "pipeline",
            NodeType::Environment => "environment",
            NodeType::Module => "module",
            NodeType::Service => "service",
            NodeType::Resource => "resource",
            NodeType::Data => "data",
            NodeType::Variable => "variable",
            NodeType::Output => "output",
            NodeType::Local => "local",
            NodeType::Provider => "provider",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Dependency,
    Reference,
    Flow,
    ModuleLink,
}

impl EdgeType {
    pub fn default_weight(self) -> f64 {
        match self {
            EdgeType::Dependency => constants::edges::DEPENDENCY_WEIGHT,
            EdgeType::Reference => constants::edges::REFERENCE_WEIGHT,
            EdgeType::Flow => constants::edges::FLOW_WEIGHT,
            EdgeType::ModuleLink => constants::edges::MODULE_LINK_WEIGHT,
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeType::Dependency => "dependency",
            EdgeType::Reference => "reference",
            EdgeType::Flow => "flow",
            EdgeType::ModuleLink => "module_link",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    #[default]
    Valid,
    Warning,
    Error,
    Pending,
    Syncing,
}

impl ValidationStatus {
    fn severity(self) -> u8 {
        match self {
            ValidationStatus::Valid => 0,
            ValidationStatus::Pending | ValidationStatus::Syncing => 1,
            ValidationStatus::Warning => 2,
            ValidationStatus::Error => 3,
        }
    }

    /// The more severe of the two statuses
    pub fn escalate(self, other: ValidationStatus) -> ValidationStatus {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    pub fn weight_multiplier(self) -> f64 {
        match self {
            ValidationStatus::Error => constants::nodes::ERROR_STATUS_MULTIPLIER,
            ValidationStatus::Warning => constants::nodes::WARNING_STATUS_MULTIPLIER,
            _ => 1.0,
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValidationStatus::Valid => "valid",
            ValidationStatus::Warning => "warning",
            ValidationStatus::Error => "error",
            ValidationStatus::Pending => "pending",
            ValidationStatus::Syncing => "syncing",
        };
        f.write_str(name)
    }
}

/// Which slice of the infrastructure a graph shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphLevel {
    Pipeline,
    Environment,
    Module,
}

impl GraphLevel {
    /// The layout strategy used for graphs at this level
    pub fn layout_kind(self) -> LayoutKind {
        match self {
            GraphLevel::Pipeline => LayoutKind::Hierarchical,
            GraphLevel::Environment => LayoutKind::Ranked,
            GraphLevel::Module => LayoutKind::ForceDirected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GraphLevel::Pipeline => "pipeline",
            GraphLevel::Environment => "environment",
            GraphLevel::Module => "module",
        }
    }
}

impl fmt::Display for GraphLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of layout strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Hierarchical,
    Ranked,
    ForceDirected,
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayoutKind::Hierarchical => "hierarchical",
            LayoutKind::Ranked => "ranked",
            LayoutKind::ForceDirected => "force_directed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
    pub fill: String,
    pub stroke: String,
    pub shape: String,
    pub width: f64,
    pub height: f64,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    /// Id of the record this node was built from
    pub domain_id: String,
    pub label: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub data: Value,
    pub position: Position,
    pub status: ValidationStatus,
    pub style: NodeStyle,
    pub metadata: NodeMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub stroke: String,
    pub stroke_width: f64,
    pub dashed: bool,
    pub animated: bool,
}

/// Shared routing hint for parallel edges between the same pair of nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeBundle {
    pub key: String,
    pub center: Position,
    pub strength: f64,
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMetadata {
    /// Derived from an interpolation rather than an explicit dependency
    pub implicit: bool,
    pub in_cycle: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<EdgeBundle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub weight: f64,
    pub style: EdgeStyle,
    pub metadata: EdgeMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub build_ms: f64,
    pub detection_ms: f64,
    pub layout_ms: f64,
    pub optimize_ms: f64,
    pub total_ms: f64,
    pub layout_iterations: usize,
    pub crossings_detected: usize,
    pub crossings_resolved: usize,
    pub spacing_iterations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub id: String,
    pub name: String,
    pub level: GraphLevel,
    pub node_count: usize,
    pub edge_count: usize,
    pub status: ValidationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub performance: PerformanceMetrics,
    /// Dependency cycles, as domain ids in traversal order
    #[serde(default)]
    pub cycles: Vec<Vec<String>>,
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub layout: LayoutKind,
    pub layout_config: LayoutConfig,
    pub metadata: GraphMetadata,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Node id to position in `nodes`
    pub fn node_index(&self) -> HashMap<&str, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.as_str(), idx))
            .collect()
    }

    pub fn refresh_counts(&mut self) {
        self.metadata.node_count = self.nodes.len();
        self.metadata.edge_count = self.edges.len();
    }

    /// Recompute the graph status from its nodes, cycles and diagnostics
    pub fn roll_up_status(&mut self) {
        let mut status = if self.nodes.is_empty() {
            ValidationStatus::Warning
        } else {
            ValidationStatus::Valid
        };

        for node in &self.nodes {
            status = status.escalate(node.status);
        }

        if !self.metadata.cycles.is_empty() {
            status = ValidationStatus::Error;
        }

        self.metadata.status = status;
    }

    /// Check the structural invariants every finished graph must hold
    pub fn check_integrity(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(InfravizError::Validation {
                    message: format!("duplicate node id '{}'", node.id),
                });
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(InfravizError::Validation {
                        message: format!(
                            "edge '{}' references unknown node '{}'",
                            edge.id, endpoint
                        ),
                    });
                }
            }
        }

        if self.metadata.node_count != self.nodes.len()
            || self.metadata.edge_count != self.edges.len()
        {
            return Err(InfravizError::Validation {
                message: format!(
                    "metadata counts ({} nodes, {} edges) disagree with graph ({} nodes, {} edges)",
                    self.metadata.node_count,
                    self.metadata.edge_count,
                    self.nodes.len(),
                    self.edges.len()
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_escalation() {
        use ValidationStatus::*;

        assert_eq!(Valid.escalate(Warning), Warning);
        assert_eq!(Error.escalate(Warning), Error);
        assert_eq!(Warning.escalate(Pending), Warning);
        assert_eq!(Valid.escalate(Syncing), Syncing);
    }

    #[test]
    fn test_levels_select_layouts() {
        assert_eq!(GraphLevel::Pipeline.layout_kind(), LayoutKind::Hierarchical);
        assert_eq!(GraphLevel::Environment.layout_kind(), LayoutKind::Ranked);
        assert_eq!(GraphLevel::Module.layout_kind(), LayoutKind::ForceDirected);
    }

    #[test]
    fn test_node_type_multipliers() {
        assert_eq!(NodeType::Module.weight_multiplier(), 1.5);
        assert_eq!(NodeType::Resource.weight_multiplier(), 1.2);
        assert_eq!(NodeType::Variable.weight_multiplier(), 1.0);
    }

    #[test]
    fn test_position_helpers() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);

        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(a.midpoint(&b), Position::new(1.5, 2.0));
        assert!(!Position::new(f64::NAN, 0.0).is_finite());
    }
}
