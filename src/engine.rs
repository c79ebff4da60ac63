//! # Graph Engine
//!
//! The service object every build goes through. It is constructed once with
//! its configuration and clock, holds both cache tiers and an optional
//! publisher, and is shared by reference between concurrent build calls.
//!
//! A build runs these stages under one hard deadline:
//!
//! 1. final-cache lookup, returning the cached graph on a hit
//! 2. raw graph from the builder tier, or build + dependency analysis
//! 3. edge ceiling check
//! 4. layout (node ceiling checked as its precondition)
//! 5. optimization
//! 6. integrity check, cache insert, publish
//!
//! Exceeding the deadline at any stage boundary discards the partial graph
//! and returns [`InfravizError::Timeout`].

use std::iter;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::broadcast::{GraphPublisher, GraphUpdate};
use crate::cache::{CacheKey, GraphCache};
use crate::clock::{Clock, Deadline, elapsed_between};
use crate::config::EngineConfig;
use crate::core::{EnvironmentRecord, InfrastructureSnapshot, ModuleRecord};
use crate::detector::{
    DependencyAnalysis, DependencyDetector, environment_resource_entities, module_entities,
    resource_entities,
};
use crate::error::{InfravizError, Result};
use crate::graph::{EdgeType, Graph, GraphBuilder, GraphLevel};
use crate::layout::run_layout;
use crate::optimizer::GraphOptimizer;

fn millis(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

pub struct GraphEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    builder: GraphBuilder,
    optimizer: GraphOptimizer,
    /// Builder output before layout
    raw_cache: GraphCache,
    /// Laid out and optimized graphs
    graph_cache: GraphCache,
    last_sweep: Mutex<DateTime<Utc>>,
    publisher: Option<Arc<dyn GraphPublisher>>,
}

/// Output of the build stage before layout
struct RawBuild {
    graph: Graph,
    build_ms: f64,
    detection_ms: f64,
}

impl GraphEngine {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let builder = GraphBuilder::new(Arc::clone(&clock))
            .with_surface_dangling(config.validation.surface_dangling);
        let optimizer = GraphOptimizer::new(config.optimizer.clone());
        let raw_cache = GraphCache::new(config.cache.builder_ttl(), Arc::clone(&clock));
        let graph_cache = GraphCache::new(config.cache.graph_ttl(), Arc::clone(&clock));
        let last_sweep = Mutex::new(clock.now());

        Ok(Self {
            config,
            clock,
            builder,
            optimizer,
            raw_cache,
            graph_cache,
            last_sweep,
            publisher: None,
        })
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn GraphPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn detector(&self) -> DependencyDetector {
        DependencyDetector::new(
            self.config.validation.allow_cross_boundary,
            self.config.validation.strict,
        )
    }

    /// Environments in promotion order, linked by flow edges
    pub fn build_pipeline_graph(
        &self,
        id: &str,
        name: &str,
        environments: &[EnvironmentRecord],
    ) -> Result<Arc<Graph>> {
        let key = CacheKey::new(
            GraphLevel::Pipeline,
            iter::once(id).chain(environments.iter().map(|env| env.id.as_str())),
        );

        self.build(GraphLevel::Pipeline, key, || {
            let started = Instant::now();
            let graph = self.builder.build_pipeline(id, name, environments)?;
            Ok(RawBuild {
                graph,
                build_ms: millis(started),
                detection_ms: 0.0,
            })
        })
    }

    /// Modules of one environment with explicit and interpolated links
    pub fn build_environment_graph(&self, environment: &EnvironmentRecord) -> Result<Arc<Graph>> {
        let key = CacheKey::new(
            GraphLevel::Environment,
            iter::once(environment.id.as_str())
                .chain(environment.modules.iter().map(|m| m.id.as_str())),
        );

        self.build(GraphLevel::Environment, key, || {
            let started = Instant::now();
            let mut graph = self.builder.build_environment(environment)?;
            let build_ms = millis(started);

            let started = Instant::now();
            let analysis = self.detector().analyze(&module_entities(environment)?)?;
            self.builder
                .apply_analysis(&mut graph, &analysis, EdgeType::ModuleLink);

            Ok(RawBuild {
                graph,
                build_ms,
                detection_ms: millis(started),
            })
        })
    }

    /// Resources of one module with explicit and interpolated references
    pub fn build_module_graph(&self, module: &ModuleRecord) -> Result<Arc<Graph>> {
        let key = CacheKey::new(
            GraphLevel::Module,
            iter::once(module.id.as_str()).chain(module.resources.iter().map(|r| r.id.as_str())),
        );

        self.build(GraphLevel::Module, key, || {
            let started = Instant::now();
            let mut graph = self.builder.build_module(module)?;
            let build_ms = millis(started);

            let started = Instant::now();
            let analysis = self.detector().analyze(&resource_entities(module)?)?;
            self.builder
                .apply_analysis(&mut graph, &analysis, EdgeType::Reference);

            Ok(RawBuild {
                graph,
                build_ms,
                detection_ms: millis(started),
            })
        })
    }

    /// Dependency analysis over an environment's modules and, separately,
    /// all of its resources with module boundaries enforced
    pub fn analyze_environment(
        &self,
        environment: &EnvironmentRecord,
        detector: &DependencyDetector,
    ) -> Result<DependencyAnalysis> {
        let mut analysis = detector.analyze(&module_entities(environment)?)?;
        analysis.merge(detector.analyze(&environment_resource_entities(environment)?)?);
        Ok(analysis)
    }

    /// [`Self::analyze_environment`] over every environment of a snapshot
    pub fn analyze_snapshot(
        &self,
        snapshot: &InfrastructureSnapshot,
        detector: &DependencyDetector,
    ) -> Result<DependencyAnalysis> {
        let mut analysis = DependencyAnalysis::default();
        for environment in &snapshot.environments {
            analysis.merge(self.analyze_environment(environment, detector)?);
        }
        Ok(analysis)
    }

    /// Drop one cached graph from both tiers
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let raw = self.raw_cache.invalidate(key);
        let built = self.graph_cache.invalidate(key);
        let removed = usize::from(raw) + usize::from(built);

        if removed > 0 {
            self.publish(GraphUpdate::Invalidated {
                level: Some(key.level()),
                key: key.to_string(),
                removed,
            });
        }
        removed > 0
    }

    /// Drop every cached graph built from entity `id`
    pub fn invalidate_entity(&self, id: &str) -> usize {
        let removed = self.raw_cache.invalidate_entity(id) + self.graph_cache.invalidate_entity(id);
        if removed > 0 {
            self.publish(GraphUpdate::Invalidated {
                level: None,
                key: id.to_string(),
                removed,
            });
        }
        removed
    }

    /// Evict expired entries from both tiers
    pub fn sweep(&self) -> usize {
        let evicted = self.raw_cache.sweep() + self.graph_cache.sweep();
        *self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner) = self.clock.now();
        evicted
    }

    pub fn cached_graphs(&self) -> usize {
        self.graph_cache.len()
    }

    fn maybe_sweep(&self) {
        let now = self.clock.now();
        let due = {
            let last = self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner);
            elapsed_between(*last, now) >= self.config.cache.sweep_interval()
        };
        if due {
            self.sweep();
        }
    }

    fn publish(&self, update: GraphUpdate) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(update);
        }
    }

    fn build(
        &self,
        level: GraphLevel,
        key: CacheKey,
        build_raw: impl FnOnce() -> Result<RawBuild>,
    ) -> Result<Arc<Graph>> {
        let caching = self.config.cache.enabled;
        if caching {
            self.maybe_sweep();
            if let Some(graph) = self.graph_cache.get(&key) {
                debug!(%key, "serving graph from cache");
                return Ok(graph);
            }
        }

        let started = Instant::now();
        let deadline = Deadline::new(self.config.limits.build_timeout());

        let cached_raw = if caching {
            self.raw_cache.get(&key)
        } else {
            None
        };
        let RawBuild {
            mut graph,
            build_ms,
            detection_ms,
        } = match cached_raw {
            Some(raw) => RawBuild {
                graph: Graph::clone(&raw),
                build_ms: 0.0,
                detection_ms: 0.0,
            },
            None => {
                let raw = build_raw()?;
                if caching {
                    self.raw_cache.insert(key.clone(), Arc::new(raw.graph.clone()));
                }
                raw
            }
        };
        deadline.check("build")?;

        if graph.edges.len() > self.config.limits.max_edges {
            return Err(InfravizError::SizeLimit {
                what: "edges",
                actual: graph.edges.len(),
                limit: self.config.limits.max_edges,
            });
        }

        graph.layout_config = self.config.layout_for(level);

        let layout_started = Instant::now();
        let stats = run_layout(&mut graph, &deadline)?;
        let layout_ms = millis(layout_started);
        deadline.check("layout")?;

        let optimize_started = Instant::now();
        self.optimizer.optimize(&mut graph, &deadline)?;
        let optimize_ms = millis(optimize_started);
        deadline.check("optimize")?;

        graph.refresh_counts();
        graph.roll_up_status();
        graph.check_integrity()?;

        let performance = &mut graph.metadata.performance;
        performance.build_ms = build_ms;
        performance.detection_ms = detection_ms;
        performance.layout_ms = layout_ms;
        performance.optimize_ms = optimize_ms;
        performance.layout_iterations = stats.iterations;
        performance.total_ms = millis(started);
        graph.metadata.updated_at = self.clock.now();

        info!(
            %key,
            nodes = graph.metadata.node_count,
            edges = graph.metadata.edge_count,
            status = %graph.metadata.status,
            total_ms = graph.metadata.performance.total_ms,
            "graph built"
        );

        let graph = Arc::new(graph);
        if caching {
            self.graph_cache.insert(key, Arc::clone(&graph));
        }
        self.publish(GraphUpdate::Built(Arc::clone(&graph)));

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::broadcast::BroadcastHub;
    use crate::clock::ManualClock;
    use crate::graph::ValidationStatus;

    fn engine_with(config: EngineConfig) -> (Arc<ManualClock>, GraphEngine) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = GraphEngine::new(config, clock.clone()).unwrap();
        (clock, engine)
    }

    fn environment() -> EnvironmentRecord {
        EnvironmentRecord::new("dev", "Dev")
            .with_module(
                ModuleRecord::new("app", "app")
                    .depends_on("db")
                    .with_input("subnet", json!("${module.network.subnet_id}")),
            )
            .with_module(ModuleRecord::new("db", "db").depends_on("net"))
            .with_module(ModuleRecord::new("net", "network"))
    }

    #[test]
    fn test_environment_graph_gets_module_links() {
        let (_clock, engine) = engine_with(EngineConfig::default());

        let graph = engine.build_environment_graph(&environment()).unwrap();

        assert_eq!(graph.metadata.node_count, 3);
        assert_eq!(graph.metadata.edge_count, 3);
        assert_eq!(
            graph
                .edges
                .iter()
                .filter(|e| e.edge_type == EdgeType::ModuleLink)
                .count(),
            1
        );
        assert_eq!(graph.metadata.status, ValidationStatus::Valid);
        graph.check_integrity().unwrap();
    }

    #[test]
    fn test_second_build_is_served_from_cache() {
        let (_clock, engine) = engine_with(EngineConfig::default());

        let first = engine.build_environment_graph(&environment()).unwrap();
        let second = engine.build_environment_graph(&environment()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cached_graphs(), 1);
    }

    #[test]
    fn test_cache_entries_expire_with_the_clock() {
        let (clock, engine) = engine_with(EngineConfig::default());
        let first = engine.build_environment_graph(&environment()).unwrap();

        clock.advance(Duration::from_secs(60 * 60));
        let second = engine.build_environment_graph(&environment()).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_invalidating_an_entity_publishes_an_update() {
        let hub = Arc::new(BroadcastHub::default());
        let mut rx = hub.subscribe();
        let (_clock, engine) = engine_with(EngineConfig::default());
        let engine = engine.with_publisher(hub.clone());

        engine.build_environment_graph(&environment()).unwrap();
        assert!(matches!(rx.try_recv().unwrap(), GraphUpdate::Built(_)));

        assert_eq!(engine.invalidate_entity("db"), 2);
        assert!(matches!(
            rx.try_recv().unwrap(),
            GraphUpdate::Invalidated { removed: 2, .. }
        ));
        assert_eq!(engine.cached_graphs(), 0);
    }

    #[test]
    fn test_strict_mode_rejects_cycles() {
        let mut config = EngineConfig::default();
        config.validation.strict = true;
        let (_clock, engine) = engine_with(config);
        let env = EnvironmentRecord::new("dev", "Dev")
            .with_module(ModuleRecord::new("a", "a").depends_on("b"))
            .with_module(ModuleRecord::new("b", "b").depends_on("a"));

        let err = engine.build_environment_graph(&env).unwrap_err();

        assert!(matches!(err, InfravizError::Cycle { count: 1, .. }));
    }

    #[test]
    fn test_edge_ceiling_is_enforced() {
        let mut config = EngineConfig::default();
        config.limits.max_edges = 1;
        let (_clock, engine) = engine_with(config);

        let err = engine.build_environment_graph(&environment()).unwrap_err();

        assert!(matches!(err, InfravizError::SizeLimit { what: "edges", .. }));
    }

    #[test]
    fn test_disabled_cache_always_rebuilds() {
        let mut config = EngineConfig::default();
        config.cache.enabled = false;
        let (_clock, engine) = engine_with(config);

        let first = engine.build_environment_graph(&environment()).unwrap();
        let second = engine.build_environment_graph(&environment()).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cached_graphs(), 0);
    }

    #[test]
    fn test_cross_module_resource_references_are_rejected() {
        let (_clock, engine) = engine_with(EngineConfig::default());
        let env = EnvironmentRecord::new("dev", "Dev")
            .with_module(ModuleRecord::new("net", "network").with_resource(
                crate::core::ResourceRecord::new("vpc", "main", crate::core::ResourceKind::Resource)
                    .with_type("aws_vpc"),
            ))
            .with_module(ModuleRecord::new("app", "app").with_resource(
                crate::core::ResourceRecord::new("web", "web", crate::core::ResourceKind::Resource)
                    .with_type("aws_instance")
                    .with_attribute("vpc", json!("${aws_vpc.main.id}")),
            ));

        let analysis = engine
            .analyze_environment(&env, &engine.detector())
            .unwrap();

        assert_eq!(analysis.rejected_references().count(), 1);
        assert!(!analysis.is_valid());
    }

    #[test]
    fn test_shared_resource_ids_fail_analysis() {
        use crate::core::{ResourceKind, ResourceRecord};

        let (_clock, engine) = engine_with(EngineConfig::default());
        let env = EnvironmentRecord::new("dev", "Dev")
            .with_module(ModuleRecord::new("net", "network").with_resource(
                ResourceRecord::new("aws_instance.web", "web", ResourceKind::Resource),
            ))
            .with_module(ModuleRecord::new("app", "app").with_resource(
                ResourceRecord::new("aws_instance.web", "web", ResourceKind::Resource),
            ));

        let err = engine
            .analyze_environment(&env, &engine.detector())
            .unwrap_err();

        assert!(matches!(err, InfravizError::Validation { .. }), "{err:?}");
    }

    #[test]
    fn test_sweep_evicts_stale_graphs_once_due() {
        let (clock, engine) = engine_with(EngineConfig::default());
        let prod =
            EnvironmentRecord::new("prod", "Prod").with_module(ModuleRecord::new("app", "app"));

        engine.build_environment_graph(&environment()).unwrap();
        clock.advance(Duration::from_secs(61 * 60));
        engine.build_environment_graph(&prod).unwrap();

        // Only prod is left; dev expired and was swept on the way in
        assert_eq!(engine.cached_graphs(), 1);
    }

    #[test]
    fn test_sweep_waits_for_its_interval() {
        let mut config = EngineConfig::default();
        config.cache.graph_ttl_secs = 60;
        let (clock, engine) = engine_with(config);
        let prod =
            EnvironmentRecord::new("prod", "Prod").with_module(ModuleRecord::new("app", "app"));

        engine.build_environment_graph(&environment()).unwrap();
        clock.advance(Duration::from_secs(120));
        engine.build_environment_graph(&prod).unwrap();

        // dev is stale but the sweep interval has not passed yet
        assert_eq!(engine.cached_graphs(), 2);
        assert_eq!(engine.sweep(), 1);
        assert_eq!(engine.cached_graphs(), 1);
    }

    #[test]
    fn test_expired_graph_is_rebuilt_from_builder_tier() {
        let mut config = EngineConfig::default();
        config.cache.graph_ttl_secs = 60;
        config.cache.builder_ttl_secs = 1800;
        let (clock, engine) = engine_with(config);

        let first = engine.build_environment_graph(&environment()).unwrap();
        clock.advance(Duration::from_secs(120));
        let second = engine.build_environment_graph(&environment()).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.metadata.performance.build_ms, 0.0);
        assert_eq!(second.metadata.performance.detection_ms, 0.0);
        assert_eq!(second.nodes.len(), first.nodes.len());
        assert_eq!(second.edges.len(), first.edges.len());
        for (a, b) in first.nodes.iter().zip(&second.nodes) {
            assert_eq!(a.id, b.id);
            assert!(a.position.distance_to(&b.position) < 1e-9);
        }
    }
}
