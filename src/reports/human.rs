//! Human-readable console report generation

use std::fmt::Write;

use console::style;

use super::ReportGenerator;
use crate::detector::DependencyAnalysis;
use crate::error::Result;
use crate::graph::{Graph, ValidationStatus};
use crate::utils::string::pluralize;

pub struct HumanReportGenerator {
    max_cycles: Option<usize>,
}

impl Default for HumanReportGenerator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HumanReportGenerator {
    pub fn new(max_cycles: Option<usize>) -> Self {
        Self { max_cycles }
    }

    fn write_cycles(&self, output: &mut String, cycles: &[Vec<String>]) -> Result<()> {
        let limit = self.max_cycles.unwrap_or(usize::MAX);
        for (i, members) in cycles.iter().take(limit).enumerate() {
            let mut path = members.clone();
            if let Some(first) = members.first() {
                path.push(first.clone());
            }
            writeln!(
                output,
                "  {} Cycle #{}: {}",
                style("🔄").yellow(),
                i + 1,
                style(path.join(" → ")).yellow()
            )?;
        }
        if cycles.len() > limit {
            writeln!(
                output,
                "  {} Showing {} of {} cycles.",
                style("ℹ️").blue(),
                style(limit).yellow(),
                style(cycles.len()).yellow()
            )?;
        }
        Ok(())
    }
}

fn status_badge(status: ValidationStatus) -> String {
    match status {
        ValidationStatus::Valid => style("✅ valid").green().bold().to_string(),
        ValidationStatus::Warning => style("⚠️  warning").yellow().bold().to_string(),
        ValidationStatus::Error => style("❌ error").red().bold().to_string(),
        other => style(other).dim().to_string(),
    }
}

impl ReportGenerator<Graph> for HumanReportGenerator {
    fn generate_report(&self, graph: &Graph) -> Result<String> {
        let mut output = String::new();
        let meta = &graph.metadata;

        writeln!(
            output,
            "\n{} {} graph {} ({})",
            style("📊").cyan(),
            style(meta.level).bold(),
            style(&meta.name).bold(),
            status_badge(meta.status)
        )?;
        writeln!(
            output,
            "  {} {}, {} {}, {} layout",
            meta.node_count,
            pluralize("node", meta.node_count),
            meta.edge_count,
            pluralize("edge", meta.edge_count),
            graph.layout
        )?;

        let perf = &meta.performance;
        writeln!(
            output,
            "  {} built in {:.1}ms (layout {:.1}ms over {} {}, optimize {:.1}ms)",
            style("⏱").dim(),
            perf.total_ms,
            perf.layout_ms,
            perf.layout_iterations,
            pluralize("iteration", perf.layout_iterations),
            perf.optimize_ms
        )?;
        if perf.crossings_detected > 0 {
            writeln!(
                output,
                "  {} {} of {} edge {} resolved",
                style("✂").dim(),
                perf.crossings_resolved,
                perf.crossings_detected,
                pluralize("crossing", perf.crossings_detected)
            )?;
        }

        writeln!(output, "\n{} Nodes:", style("📦").blue())?;
        for node in &graph.nodes {
            let marker = match node.status {
                ValidationStatus::Error => style("✗").red(),
                ValidationStatus::Warning => style("!").yellow(),
                _ => style("•").dim(),
            };
            writeln!(
                output,
                "  {} {} {} at ({:.0}, {:.0})",
                marker,
                style(&node.metadata.label).bold(),
                style(format!("[{}]", node.node_type)).dim(),
                node.position.x,
                node.position.y
            )?;
            for message in &node.metadata.validation_errors {
                writeln!(output, "      {} {}", style("↳").dim(), style(message).red())?;
            }
        }

        if !graph.edges.is_empty() {
            writeln!(output, "\n{} Edges:", style("🔗").cyan())?;
            let labels = graph.node_index();
            for edge in &graph.edges {
                let label = |id: &str| {
                    labels
                        .get(id)
                        .map(|&idx| graph.nodes[idx].metadata.label.clone())
                        .unwrap_or_else(|| id.to_string())
                };
                let arrow = if edge.metadata.in_cycle {
                    style("→").red().bold()
                } else {
                    style("→").dim()
                };
                writeln!(
                    output,
                    "  {} {} {} ({}{})",
                    style(label(&edge.source)).yellow(),
                    arrow,
                    style(label(&edge.target)).yellow(),
                    style(edge.edge_type).dim(),
                    if edge.metadata.implicit { ", implicit" } else { "" }
                )?;
            }
        }

        if !meta.cycles.is_empty() {
            writeln!(
                output,
                "\n{} {} dependency {}:",
                style("❌").red().bold(),
                style(meta.cycles.len()).red().bold(),
                pluralize("cycle", meta.cycles.len())
            )?;
            self.write_cycles(&mut output, &meta.cycles)?;
        }

        if !meta.diagnostics.is_empty() {
            writeln!(output, "\n{} Diagnostics:", style("⚠️").yellow())?;
            for diagnostic in &meta.diagnostics {
                writeln!(output, "  {} {}", style("•").dim(), diagnostic)?;
            }
        }

        Ok(output)
    }
}

impl ReportGenerator<DependencyAnalysis> for HumanReportGenerator {
    fn generate_report(&self, analysis: &DependencyAnalysis) -> Result<String> {
        let mut output = String::new();

        if analysis.is_valid() {
            write!(
                output,
                "\n{} No dependency cycles or rejected references. The infrastructure has a \
                 clean dependency structure.\n",
                style("✅").green().bold()
            )?;
        }

        if analysis.has_cycles() {
            write!(
                output,
                "\n{} Found {} dependency {}:\n\n",
                style("❌").red().bold(),
                style(analysis.cycle_count()).red().bold(),
                pluralize("cycle", analysis.cycle_count())
            )?;
            let cycles: Vec<Vec<String>> = analysis
                .cycles()
                .iter()
                .map(|cycle| cycle.members().to_vec())
                .collect();
            self.write_cycles(&mut output, &cycles)?;
        }

        let rejected: Vec<_> = analysis.rejected_references().collect();
        if !rejected.is_empty() {
            writeln!(
                output,
                "\n{} {} cross-boundary {} rejected:",
                style("🚧").red(),
                style(rejected.len()).red().bold(),
                pluralize("reference", rejected.len())
            )?;
            for reference in rejected {
                writeln!(
                    output,
                    "  {} {} → {} ({} → {})",
                    style("→").dim(),
                    style(&reference.from).yellow(),
                    style(&reference.to).yellow(),
                    style(&reference.from_boundary).dim(),
                    style(&reference.to_boundary).dim()
                )?;
            }
        }

        if !analysis.unresolved().is_empty() {
            writeln!(
                output,
                "\n{} {} unresolved {}:",
                style("❓").yellow(),
                analysis.unresolved().len(),
                pluralize("reference", analysis.unresolved().len())
            )?;
            for unresolved in analysis.unresolved() {
                writeln!(
                    output,
                    "  {} {} → {}",
                    style("•").dim(),
                    style(&unresolved.from).bold(),
                    unresolved.reference
                )?;
            }
        }

        let implicit = analysis.implicit_references().count();
        if implicit > 0 {
            writeln!(
                output,
                "\n{} {} implicit {} found in interpolations.",
                style("ℹ️").blue(),
                implicit,
                if implicit == 1 { "dependency" } else { "dependencies" }
            )?;
        }

        if analysis.has_cycles() {
            writeln!(
                output,
                "\n{} To break a cycle, remove at least one dependency or reference from it.",
                style("💡").yellow()
            )?;
        }

        Ok(output)
    }
}
