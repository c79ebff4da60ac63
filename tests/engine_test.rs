//! Integration tests for the graph engine using the library interface

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use infraviz::broadcast::{BroadcastHub, GraphUpdate};
use infraviz::cache::CacheKey;
use infraviz::clock::{Deadline, ManualClock, SystemClock};
use infraviz::config::EngineConfig;
use infraviz::core::{EnvironmentRecord, ModuleRecord, ResourceKind, ResourceRecord};
use infraviz::engine::GraphEngine;
use infraviz::error::InfravizError;
use infraviz::graph::{EdgeType, Graph, GraphLevel, LayoutKind, ValidationStatus};
use infraviz::optimizer::GraphOptimizer;
use pretty_assertions::assert_eq;
use serde_json::json;

fn engine() -> GraphEngine {
    GraphEngine::new(EngineConfig::default(), Arc::new(SystemClock)).unwrap()
}

fn engine_with(toml: &str) -> GraphEngine {
    let config = EngineConfig::from_toml_str("engine.toml", toml).unwrap();
    GraphEngine::new(config, Arc::new(SystemClock)).unwrap()
}

fn assert_well_formed(graph: &Graph) {
    graph.check_integrity().unwrap();
    assert_eq!(graph.metadata.node_count, graph.nodes.len());
    assert_eq!(graph.metadata.edge_count, graph.edges.len());
    for node in &graph.nodes {
        assert!(node.position.is_finite(), "{} has no position", node.id);
    }
}

/// A module whose resources form a binary tree, with every fifth resource
/// also referencing the root through an interpolation
fn module_with_resources(id: &str, count: usize) -> ModuleRecord {
    let mut module = ModuleRecord::new(id, id);
    for i in 0..count {
        let mut resource =
            ResourceRecord::new(format!("{id}-r{i}"), format!("r{i}"), ResourceKind::Resource)
                .with_type("aws_instance");
        if i > 0 {
            resource = resource.depends_on(format!("{id}-r{}", (i - 1) / 2));
        }
        if i > 2 && i % 5 == 0 {
            resource = resource.with_attribute("root_ip", json!("${aws_instance.r0.private_ip}"));
        }
        module = module.with_resource(resource);
    }
    module
}

#[test]
fn test_pipeline_links_environments_in_order() {
    let environments = ["dev", "staging", "prod"].map(|id| {
        EnvironmentRecord::new(id, id.to_uppercase()).with_module(ModuleRecord::new(
            format!("{id}-app"),
            "app",
        ))
    });

    let graph = engine()
        .build_pipeline_graph("release", "Release", &environments)
        .unwrap();

    assert_well_formed(&graph);
    assert_eq!(graph.layout, LayoutKind::Hierarchical);
    assert_eq!(graph.metadata.level, GraphLevel::Pipeline);
    assert_eq!(graph.nodes.len(), 3);

    let flows: Vec<(&str, &str)> = graph
        .edges
        .iter()
        .map(|e| {
            assert_eq!(e.edge_type, EdgeType::Flow);
            (e.source.as_str(), e.target.as_str())
        })
        .collect();
    assert_eq!(
        flows,
        vec![
            ("environment:dev", "environment:staging"),
            ("environment:staging", "environment:prod"),
        ]
    );

    // Pipelines run left to right
    let x: Vec<f64> = graph.nodes.iter().map(|n| n.position.x).collect();
    assert!(x[0] < x[1] && x[1] < x[2]);
}

#[test]
fn test_module_dependency_becomes_one_edge() {
    let env = EnvironmentRecord::new("dev", "Dev")
        .with_module(ModuleRecord::new("M", "m").depends_on("N"))
        .with_module(ModuleRecord::new("N", "n"));

    let graph = engine().build_environment_graph(&env).unwrap();

    assert_well_formed(&graph);
    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.edges[0].source, "module:M");
    assert_eq!(graph.edges[0].target, "module:N");
    assert_eq!(graph.edges[0].edge_type, EdgeType::Dependency);
    assert_eq!(graph.metadata.status, ValidationStatus::Valid);
}

#[test]
fn test_three_module_cycle_marks_graph_as_error() {
    let env = EnvironmentRecord::new("dev", "Dev")
        .with_module(ModuleRecord::new("A", "a").depends_on("B"))
        .with_module(ModuleRecord::new("B", "b").depends_on("C"))
        .with_module(ModuleRecord::new("C", "c").depends_on("A"));

    let graph = engine().build_environment_graph(&env).unwrap();

    assert_well_formed(&graph);
    assert_eq!(graph.metadata.cycles.len(), 1);
    let mut members = graph.metadata.cycles[0].clone();
    members.sort();
    assert_eq!(members, vec!["A", "B", "C"]);
    assert_eq!(graph.metadata.status, ValidationStatus::Error);
    assert!(graph.edges.iter().all(|e| e.metadata.in_cycle));
}

#[test]
fn test_empty_environment_is_a_warning() {
    let graph = engine()
        .build_environment_graph(&EnvironmentRecord::new("dev", "Dev"))
        .unwrap();

    assert!(graph.nodes.is_empty());
    assert!(graph.edges.is_empty());
    assert_eq!(graph.metadata.node_count, 0);
    assert_eq!(graph.metadata.status, ValidationStatus::Warning);
}

#[test]
fn test_module_graph_gets_implicit_references() {
    let graph = engine()
        .build_module_graph(&module_with_resources("m", 12))
        .unwrap();

    assert_well_formed(&graph);
    assert_eq!(graph.layout, LayoutKind::ForceDirected);
    let implicit: Vec<_> = graph.edges.iter().filter(|e| e.metadata.implicit).collect();
    // r5 and r10; r5's explicit parent is r2 and r10's is r4
    assert_eq!(implicit.len(), 2);
    assert!(implicit.iter().all(|e| e.edge_type == EdgeType::Reference));
    assert!(implicit.iter().all(|e| e.target == "resource:m-r0"));
}

#[test]
fn test_hundred_node_module_graph_builds_quickly() {
    let module = module_with_resources("big", 100);

    let started = Instant::now();
    let graph = engine_with("[cache]\nenabled = false").build_module_graph(&module).unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_well_formed(&graph);
    assert_eq!(graph.nodes.len(), 100);
    assert!(graph.metadata.performance.total_ms > 0.0);
    assert!(graph.metadata.performance.layout_iterations > 0);
}

#[test]
fn test_builds_are_deterministic() {
    let module = module_with_resources("m", 40);

    let first = engine().build_module_graph(&module).unwrap();
    let second = engine().build_module_graph(&module).unwrap();

    for (a, b) in first.nodes.iter().zip(&second.nodes) {
        assert_eq!(a.id, b.id);
        assert!(a.position.distance_to(&b.position) < 1e-9);
    }
}

#[test]
fn test_optimizing_built_graph_again_changes_nothing() {
    let env = EnvironmentRecord::new("dev", "Dev")
        .with_module(ModuleRecord::new("app", "app").depends_on("db").depends_on("cache"))
        .with_module(ModuleRecord::new("db", "db").depends_on("net"))
        .with_module(ModuleRecord::new("cache", "cache").depends_on("net"))
        .with_module(ModuleRecord::new("net", "net"));
    let engine = engine();
    let built = engine.build_environment_graph(&env).unwrap();

    let mut again = Graph::clone(&built);
    GraphOptimizer::new(engine.config().optimizer.clone())
        .optimize(&mut again, &Deadline::unbounded())
        .unwrap();

    for (before, after) in built.nodes.iter().zip(&again.nodes) {
        assert!(before.position.distance_to(&after.position) < 1e-6);
    }
}

#[test]
fn test_node_ceiling_aborts_the_build() {
    let engine = engine_with("[limits]\nmax_nodes = 10");

    let err = engine
        .build_module_graph(&module_with_resources("m", 20))
        .unwrap_err();

    assert!(matches!(
        err,
        InfravizError::SizeLimit {
            what: "nodes",
            actual: 20,
            limit: 10
        }
    ));
    assert!(err.is_fatal());
}

#[test]
fn test_deadline_aborts_the_build() {
    let engine = engine_with(
        r#"
        [limits]
        build_timeout_ms = 1

        [layout.module.force]
        max_iterations = 1000000
        epsilon = 0.0
        batch_size = 1
        "#,
    );

    let err = engine
        .build_module_graph(&module_with_resources("m", 300))
        .unwrap_err();

    assert!(matches!(err, InfravizError::Timeout { .. }), "{err:?}");
    assert_eq!(engine.cached_graphs(), 0);
}

#[test]
fn test_cache_serves_until_ttl_then_rebuilds() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = GraphEngine::new(EngineConfig::default(), clock.clone()).unwrap();
    let module = module_with_resources("m", 8);

    let first = engine.build_module_graph(&module).unwrap();
    clock.advance(Duration::from_secs(30 * 60));
    assert!(Arc::ptr_eq(&first, &engine.build_module_graph(&module).unwrap()));

    clock.advance(Duration::from_secs(30 * 60));
    let rebuilt = engine.build_module_graph(&module).unwrap();
    assert!(!Arc::ptr_eq(&first, &rebuilt));
    assert_eq!(engine.cached_graphs(), 1);
}

#[test]
fn test_invalidation_is_broadcast() {
    let hub = Arc::new(BroadcastHub::default());
    let mut updates = hub.subscribe();
    let engine = engine().with_publisher(hub.clone());
    let env = EnvironmentRecord::new("dev", "Dev").with_module(ModuleRecord::new("net", "net"));

    let graph = engine.build_environment_graph(&env).unwrap();
    match updates.try_recv().unwrap() {
        GraphUpdate::Built(built) => assert!(Arc::ptr_eq(&built, &graph)),
        other => panic!("unexpected update {other:?}"),
    }

    // A cache hit publishes nothing
    engine.build_environment_graph(&env).unwrap();
    assert!(updates.try_recv().is_err());

    assert!(engine.invalidate(&CacheKey::new(GraphLevel::Environment, ["dev", "net"])));
    match updates.try_recv().unwrap() {
        GraphUpdate::Invalidated { level, key, .. } => {
            assert_eq!(level, Some(GraphLevel::Environment));
            assert_eq!(key, "environment:dev,net");
        }
        other => panic!("unexpected update {other:?}"),
    }
    assert_eq!(engine.cached_graphs(), 0);
}

#[test]
fn test_concurrent_builds_share_one_engine() {
    let engine = engine();
    let modules: Vec<ModuleRecord> = (0..6)
        .map(|i| module_with_resources(&format!("m{i}"), 15))
        .collect();

    let engine = &engine;
    let graphs: Vec<Arc<Graph>> = std::thread::scope(|scope| {
        let handles: Vec<_> = modules
            .iter()
            .map(|module| scope.spawn(move || engine.build_module_graph(module).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(graphs.len(), 6);
    graphs.iter().for_each(|g| assert_well_formed(g));
    assert_eq!(engine.cached_graphs(), 6);
}
