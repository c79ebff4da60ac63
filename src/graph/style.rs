//! Deterministic default styling per node and edge type

use super::types::{EdgeStyle, EdgeType, NodeStyle, NodeType, ValidationStatus};
use crate::constants::nodes::{DEFAULT_HEIGHT, DEFAULT_WIDTH};

mod colors {
    pub const PIPELINE_FILL: &str = "#EDE7F6";
    pub const ENVIRONMENT_FILL: &str = "#E3F2FD";
    pub const MODULE_FILL: &str = "#E8F5E9";
    pub const RESOURCE_FILL: &str = "#FFFFFF";
    pub const DATA_FILL: &str = "#F3E5F5";
    pub const INPUT_FILL: &str = "#FFFDE7";
    pub const OUTPUT_FILL: &str = "#E0F7FA";
    pub const PROVIDER_FILL: &str = "#ECEFF1";

    pub const VALID_STROKE: &str = "#1976D2";
    pub const WARNING_STROKE: &str = "#F9A825";
    pub const ERROR_STROKE: &str = "#D32F2F";
    pub const PENDING_STROKE: &str = "#90A4AE";

    pub const DEPENDENCY_EDGE: &str = "#64B5F6";
    pub const REFERENCE_EDGE: &str = "#90A4AE";
    pub const FLOW_EDGE: &str = "#7E57C2";
    pub const MODULE_LINK_EDGE: &str = "#81C784";
}

pub fn node_style(node_type: NodeType, status: ValidationStatus) -> NodeStyle {
    let (fill, shape, scale) = match node_type {
        NodeType::Pipeline => (colors::PIPELINE_FILL, "rounded", 1.25),
        NodeType::Environment => (colors::ENVIRONMENT_FILL, "rounded", 1.25),
        NodeType::Module | NodeType::Service => (colors::MODULE_FILL, "rounded", 1.0),
        NodeType::Resource => (colors::RESOURCE_FILL, "rect", 1.0),
        NodeType::Data => (colors::DATA_FILL, "rect", 0.9),
        NodeType::Variable | NodeType::Local => (colors::INPUT_FILL, "ellipse", 0.75),
        NodeType::Output => (colors::OUTPUT_FILL, "ellipse", 0.75),
        NodeType::Provider => (colors::PROVIDER_FILL, "hexagon", 0.9),
    };

    NodeStyle {
        fill: fill.to_string(),
        stroke: status_stroke(status).to_string(),
        shape: shape.to_string(),
        width: DEFAULT_WIDTH * scale,
        height: DEFAULT_HEIGHT,
        stroke_width: if status == ValidationStatus::Error {
            2.5
        } else {
            1.5
        },
    }
}

/// Re-colour a node after its status changed
pub fn apply_status(style: &mut NodeStyle, status: ValidationStatus) {
    style.stroke = status_stroke(status).to_string();
    style.stroke_width = if status == ValidationStatus::Error {
        2.5
    } else {
        1.5
    };
}

fn status_stroke(status: ValidationStatus) -> &'static str {
    match status {
        ValidationStatus::Valid => colors::VALID_STROKE,
        ValidationStatus::Warning => colors::WARNING_STROKE,
        ValidationStatus::Error => colors::ERROR_STROKE,
        ValidationStatus::Pending | ValidationStatus::Syncing => colors::PENDING_STROKE,
    }
}

pub fn edge_style(edge_type: EdgeType) -> EdgeStyle {
    let (stroke, dashed, animated) = match edge_type {
        EdgeType::Dependency => (colors::DEPENDENCY_EDGE, false, false),
        EdgeType::Reference => (colors::REFERENCE_EDGE, true, false),
        EdgeType::Flow => (colors::FLOW_EDGE, false, true),
        EdgeType::ModuleLink => (colors::MODULE_LINK_EDGE, true, false),
    };

    EdgeStyle {
        stroke: stroke.to_string(),
        stroke_width: 1.0,
        dashed,
        animated,
    }
}
