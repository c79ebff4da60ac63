//! Render command executor

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;

use console::style;
use miette::{IntoDiagnostic, Result, WrapErr};

use super::{load_engine_config, load_snapshot};
use crate::cli::RenderFormat;
use crate::clock::SystemClock;
use crate::config::RenderOptions;
use crate::core::InfrastructureSnapshot;
use crate::engine::GraphEngine;
use crate::error::InfravizError;
use crate::executors::CommandExecutor;
use crate::graph::{Graph, GraphLevel};
use crate::reports::{
    DotReportGenerator, HumanReportGenerator, JsonReportGenerator, ReportGenerator,
};

pub struct RenderExecutor;

/// Build the graph the options ask for
pub(crate) fn build_graph(
    engine: &GraphEngine,
    snapshot: &InfrastructureSnapshot,
    level: GraphLevel,
    id: Option<&str>,
) -> Result<Arc<Graph>, InfravizError> {
    let require_id = || {
        id.ok_or_else(|| InfravizError::ConfigurationError {
            message: format!("--id is required for the {level} level"),
        })
    };

    match level {
        GraphLevel::Pipeline => {
            engine.build_pipeline_graph(&snapshot.id, &snapshot.name, &snapshot.environments)
        }
        GraphLevel::Environment => {
            let id = require_id()?;
            let environment =
                snapshot
                    .find_environment(id)
                    .ok_or_else(|| InfravizError::NotFound {
                        what: "environment",
                        id: id.to_string(),
                    })?;
            engine.build_environment_graph(environment)
        }
        GraphLevel::Module => {
            let id = require_id()?;
            let module = snapshot
                .find_module(id)
                .ok_or_else(|| InfravizError::NotFound {
                    what: "module",
                    id: id.to_string(),
                })?;
            engine.build_module_graph(module)
        }
    }
}

impl CommandExecutor for RenderExecutor {
    type Config = RenderOptions;

    fn execute(options: Self::Config) -> Result<()> {
        eprintln!(
            "{} Rendering {} graph...",
            style("📊").cyan(),
            style(options.level).bold()
        );

        let engine_config = load_engine_config(options.config.as_deref())?;
        let snapshot = load_snapshot(&options.snapshot)?;

        let engine = GraphEngine::new(engine_config, Arc::new(SystemClock))?;
        let graph = build_graph(&engine, &snapshot, options.level, options.id.as_deref())
            .wrap_err("Failed to build graph")?;

        let report = match options.format {
            RenderFormat::Json => JsonReportGenerator::new().generate_report(graph.as_ref()),
            RenderFormat::Dot => DotReportGenerator::default().generate_report(graph.as_ref()),
            RenderFormat::Human => HumanReportGenerator::default().generate_report(graph.as_ref()),
        }
        .wrap_err("Failed to generate report")?;

        // Determine output destination
        let mut output_writer: Box<dyn Write> = if let Some(output_path) = options.output.as_ref() {
            Box::new(BufWriter::new(
                File::create(output_path)
                    .into_diagnostic()
                    .wrap_err_with(|| {
                        format!("Failed to create output file '{}'", output_path.display())
                    })?,
            ))
        } else {
            Box::new(io::stdout())
        };

        output_writer
            .write_all(report.as_bytes())
            .into_diagnostic()
            .wrap_err("Failed to write graph")?;
        output_writer.flush().into_diagnostic()?;

        if let Some(output_path) = options.output {
            eprintln!(
                "{} Graph written to {}",
                style("✓").green(),
                style(output_path.display()).bold()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::{EnvironmentRecord, ModuleRecord};

    fn snapshot() -> InfrastructureSnapshot {
        InfrastructureSnapshot {
            environments: vec![
                EnvironmentRecord::new("dev", "Dev")
                    .with_module(ModuleRecord::new("net", "network")),
            ],
            ..InfrastructureSnapshot::default()
        }
    }

    fn engine() -> GraphEngine {
        GraphEngine::new(EngineConfig::default(), Arc::new(SystemClock)).unwrap()
    }

    #[test]
    fn test_environment_level_requires_an_id() {
        let err = build_graph(&engine(), &snapshot(), GraphLevel::Environment, None).unwrap_err();

        assert!(matches!(err, InfravizError::ConfigurationError { .. }));
    }

    #[test]
    fn test_unknown_module_is_reported() {
        let err =
            build_graph(&engine(), &snapshot(), GraphLevel::Module, Some("nope")).unwrap_err();

        assert!(matches!(err, InfravizError::NotFound { what: "module", .. }));
    }

    #[test]
    fn test_pipeline_uses_snapshot_identity() {
        let graph = build_graph(&engine(), &snapshot(), GraphLevel::Pipeline, None).unwrap();

        assert_eq!(graph.metadata.id, "pipeline");
        assert_eq!(graph.metadata.node_count, 1);
    }
}
