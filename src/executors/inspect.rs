//! Inspect command executor

use std::sync::Arc;

use console::style;
use miette::{Result, WrapErr};

use super::{load_engine_config, load_snapshot};
use crate::cli::InspectFormat;
use crate::clock::SystemClock;
use crate::config::{EngineConfig, InspectOptions};
use crate::engine::GraphEngine;
use crate::executors::CommandExecutor;
use crate::reports::{HumanReportGenerator, JsonReportGenerator, ReportGenerator};
use crate::utils::string::pluralize;

pub struct InspectExecutor;

/// Flags can switch a validation setting on, never off
pub(crate) fn apply_overrides(config: &mut EngineConfig, options: &InspectOptions) {
    config.validation.strict |= options.strict;
    config.validation.allow_cross_boundary |= options.allow_cross_boundary;
}

impl CommandExecutor for InspectExecutor {
    type Config = InspectOptions;

    fn execute(options: Self::Config) -> Result<()> {
        let mut engine_config = load_engine_config(options.config.as_deref())?;
        apply_overrides(&mut engine_config, &options);

        let snapshot = load_snapshot(&options.snapshot)?;
        let module_count: usize = snapshot.environments.iter().map(|e| e.modules.len()).sum();
        eprintln!(
            "{} Inspecting {} {} and {} {}...",
            style("🔍").cyan(),
            snapshot.environments.len(),
            pluralize("environment", snapshot.environments.len()),
            module_count,
            pluralize("module", module_count)
        );

        let engine = GraphEngine::new(engine_config, Arc::new(SystemClock))?;
        let analysis = engine
            .analyze_snapshot(&snapshot, &engine.detector())
            .wrap_err("Failed to analyze dependencies")?;

        let report = match options.format {
            InspectFormat::Human => HumanReportGenerator::default().generate_report(&analysis),
            InspectFormat::Json => JsonReportGenerator::new().generate_report(&analysis),
        }
        .wrap_err("Failed to generate report")?;
        print!("{report}");

        // Exit with error code if cycles found and requested
        if options.error_on_cycles && analysis.has_cycles() {
            std::process::exit(1);
        }

        Ok(())
    }
}
