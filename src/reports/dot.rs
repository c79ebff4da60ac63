//! Graphviz DOT report generation
//!
//! Positions are emitted pinned (`pos="x,y!"`) so `neato -n` reproduces the
//! engine's layout instead of computing its own. Graphviz's y axis points
//! up, so y is flipped.

use std::fmt::Write;

use super::ReportGenerator;
use crate::error::Result;
use crate::graph::{Graph, ValidationStatus};
use crate::utils::string::escape_dot;

/// Stroke used for edges that close a dependency cycle
const CYCLE_EDGE: &str = "#C62828";

/// Graphviz works in points; the engine in pixels at 72dpi
const POINTS_PER_INCH: f64 = 72.0;

pub struct DotReportGenerator {
    highlight_cycles: bool,
}

impl Default for DotReportGenerator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DotReportGenerator {
    pub fn new(highlight_cycles: bool) -> Self {
        Self { highlight_cycles }
    }
}

impl ReportGenerator<Graph> for DotReportGenerator {
    fn generate_report(&self, graph: &Graph) -> Result<String> {
        let mut output = String::new();

        writeln!(
            output,
            "digraph \"{}\" {{",
            escape_dot(&graph.metadata.id)
        )?;
        writeln!(output, "    layout=neato;")?;
        writeln!(output, "    node [style=\"rounded,filled\", penwidth=2];")?;
        writeln!(output)?;

        for node in &graph.nodes {
            let penwidth = if node.status == ValidationStatus::Error {
                3.0
            } else {
                node.style.stroke_width
            };
            writeln!(
                output,
                r#"    "{}" [label="{}", shape={}, fillcolor="{}", color="{}", penwidth={}, width={:.2}, height={:.2}, pos="{:.1},{:.1}!"];"#,
                escape_dot(&node.id),
                escape_dot(&node.metadata.label),
                node.style.shape,
                node.style.fill,
                node.style.stroke,
                penwidth,
                node.style.width / POINTS_PER_INCH,
                node.style.height / POINTS_PER_INCH,
                node.position.x,
                -node.position.y
            )?;
        }

        writeln!(output)?;

        for edge in &graph.edges {
            let in_cycle = edge.metadata.in_cycle && self.highlight_cycles;
            let color = if in_cycle {
                CYCLE_EDGE
            } else {
                edge.style.stroke.as_str()
            };
            let penwidth = if in_cycle {
                edge.style.stroke_width.max(1.0) + 1.0
            } else {
                edge.style.stroke_width.max(0.5)
            };
            let style = if edge.style.dashed { "dashed" } else { "solid" };

            writeln!(
                output,
                r#"    "{}" -> "{}" [label="{}", color="{}", penwidth={:.2}, style={}];"#,
                escape_dot(&edge.source),
                escape_dot(&edge.target),
                edge.edge_type,
                color,
                penwidth,
                style
            )?;
        }

        writeln!(output, "}}")?;
        Ok(output)
    }
}
