//! JSON format report generation

use serde_json::json;

use super::ReportGenerator;
use crate::detector::DependencyAnalysis;
use crate::error::{InfravizError, Result};
use crate::graph::Graph;

pub struct JsonReportGenerator {
    pretty: bool,
}

impl Default for JsonReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReportGenerator {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Single-line output, for piping into other tools
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    fn encode(&self, value: &impl serde::Serialize) -> Result<String> {
        if self.pretty {
            serde_json::to_string_pretty(value).map_err(InfravizError::Json)
        } else {
            serde_json::to_string(value).map_err(InfravizError::Json)
        }
    }
}

impl ReportGenerator<Graph> for JsonReportGenerator {
    /// The graph exactly as viewers consume it
    fn generate_report(&self, graph: &Graph) -> Result<String> {
        self.encode(graph)
    }
}

impl ReportGenerator<DependencyAnalysis> for JsonReportGenerator {
    fn generate_report(&self, analysis: &DependencyAnalysis) -> Result<String> {
        let mut cycles: Vec<Vec<String>> = analysis
            .cycles()
            .iter()
            .map(|cycle| cycle.members().to_vec())
            .collect();
        cycles.sort();

        let implicit: Vec<_> = analysis
            .implicit_references()
            .map(|(from, to)| json!({ "from": from, "to": to }))
            .collect();

        let report = json!({
            "valid": analysis.is_valid(),
            "has_cycles": analysis.has_cycles(),
            "cycle_count": analysis.cycle_count(),
            "cycles": cycles,
            "cross_boundary": analysis.cross_boundary(),
            "rejected_count": analysis.rejected_references().count(),
            "unresolved": analysis.unresolved(),
            "implicit": implicit,
        });

        self.encode(&report)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::core::{EnvironmentRecord, ModuleRecord};
    use crate::detector::{DependencyDetector, module_entities};
    use crate::layout::tests::environment_graph;

    fn cyclic_analysis() -> DependencyAnalysis {
        let env = EnvironmentRecord::new("dev", "Dev")
            .with_module(ModuleRecord::new("a", "a").depends_on("b"))
            .with_module(ModuleRecord::new("b", "b").depends_on("a"))
            .with_module(ModuleRecord::new("c", "c").depends_on("missing"));
        DependencyDetector::default()
            .analyze(&module_entities(&env).unwrap())
            .unwrap()
    }

    #[test]
    fn test_analysis_report() {
        let output = JsonReportGenerator::new()
            .generate_report(&cyclic_analysis())
            .unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["valid"], false);
        assert_eq!(parsed["has_cycles"], true);
        assert_eq!(parsed["cycle_count"], 1);
        assert_eq!(parsed["cycles"][0].as_array().unwrap().len(), 2);
        assert_eq!(parsed["unresolved"][0]["reference"], "missing");
    }

    #[test]
    fn test_graph_report_uses_viewer_field_names() {
        let graph = environment_graph(&[("a", &["b"]), ("b", &[])]);

        let output = JsonReportGenerator::compact().generate_report(&graph).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();

        assert!(!output.contains('\n'));
        assert_eq!(parsed["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["edges"][0]["type"], "dependency");
        assert!(parsed["metadata"]["nodeCount"].is_number());
        assert!(parsed["layoutConfig"].is_object());
    }
}
