use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use super::style;
use super::types::{
    Edge, EdgeMetadata, EdgeType, Graph, GraphLevel, GraphMetadata, Node, NodeMetadata, NodeType,
    PerformanceMetrics, Position, ValidationStatus,
};
use crate::clock::Clock;
use crate::config::LayoutConfig;
use crate::core::{EnvironmentRecord, ModuleRecord, ResourceRecord};
use crate::detector::DependencyAnalysis;
use crate::error::{InfravizError, Result};

/// Builder for turning domain records into typed node-edge graphs
///
/// Each level maps one kind of record onto nodes: environments for a
/// pipeline, modules for an environment, resources for a module. Positions
/// are left at the origin for a layout strategy to fill in.
pub struct GraphBuilder {
    clock: Arc<dyn Clock>,
    surface_dangling: bool,
}

/// Nodes and edges collected while building one graph
struct GraphDraft {
    level: GraphLevel,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// Domain id or address to node id; ids win over addresses
    lookup: HashMap<String, String>,
    domain_ids: HashSet<String>,
    edge_ids: HashMap<String, usize>,
    diagnostics: Vec<String>,
}

impl GraphDraft {
    fn new(level: GraphLevel) -> Self {
        Self {
            level,
            nodes: Vec::new(),
            edges: Vec::new(),
            lookup: HashMap::new(),
            domain_ids: HashSet::new(),
            edge_ids: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    fn add_node(
        &mut self,
        domain_id: &str,
        address: Option<String>,
        label: &str,
        node_type: NodeType,
        status: ValidationStatus,
        data: serde_json::Value,
        validation_errors: Vec<String>,
    ) -> Result<()> {
        if domain_id.trim().is_empty() {
            return Err(InfravizError::Validation {
                message: format!("{node_type} '{label}' has an empty id"),
            });
        }

        let node_id = format!("{node_type}:{domain_id}");
        if !self.domain_ids.insert(domain_id.to_string()) {
            return Err(InfravizError::Validation {
                message: format!("duplicate {node_type} id '{domain_id}'"),
            });
        }

        self.lookup.insert(domain_id.to_string(), node_id.clone());
        if let Some(address) = address
            && !self.domain_ids.contains(&address)
        {
            self.lookup.entry(address).or_insert_with(|| node_id.clone());
        }

        self.nodes.push(Node {
            id: node_id,
            node_type,
            data,
            position: Position::default(),
            status,
            style: style::node_style(node_type, status),
            metadata: NodeMetadata {
                domain_id: domain_id.to_string(),
                label: label.to_string(),
                weight: 0.0,
                rank: None,
                validation_errors,
            },
        });

        Ok(())
    }

    fn add_edge(&mut self, source: &str, target: &str, edge_type: EdgeType, implicit: bool) {
        let base = format!("{source}->{target}");
        let seen = self.edge_ids.entry(base.clone()).or_insert(0);
        let id = if *seen == 0 {
            base
        } else {
            format!("{base}#{seen}")
        };
        *seen += 1;

        self.edges.push(Edge {
            id,
            source: source.to_string(),
            target: target.to_string(),
            edge_type,
            weight: edge_type.default_weight(),
            style: style::edge_style(edge_type),
            metadata: EdgeMetadata {
                implicit,
                ..EdgeMetadata::default()
            },
        });
    }

    /// Resolve a dependency list into edges; absent targets are dropped
    fn link_dependencies(
        &mut self,
        from_domain_id: &str,
        label: &str,
        depends_on: &[String],
        surface_dangling: bool,
    ) {
        let Some(source) = self.lookup.get(from_domain_id).cloned() else {
            return;
        };

        for dep in depends_on {
            match self.lookup.get(dep).cloned() {
                Some(target) => self.add_edge(&source, &target, EdgeType::Dependency, false),
                None if surface_dangling => {
                    warn!(
                        level = %self.level,
                        from = %from_domain_id,
                        "dropping dependency on '{dep}': not part of this graph"
                    );
                    self.diagnostics.push(format!(
                        "'{label}' depends on '{dep}', which is not part of this graph"
                    ));
                    if let Some(node) = self.nodes.iter_mut().find(|n| n.id == source) {
                        let status = node.status.escalate(ValidationStatus::Warning);
                        set_status(node, status);
                    }
                }
                None => debug!(from = %from_domain_id, "dropping dependency on '{dep}'"),
            }
        }
    }
}

fn set_status(node: &mut Node, status: ValidationStatus) {
    node.status = status;
    style::apply_status(&mut node.style, status);
}

impl GraphBuilder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            surface_dangling: true,
        }
    }

    /// Whether dependencies on absent entities become diagnostics
    pub fn with_surface_dangling(mut self, surface_dangling: bool) -> Self {
        self.surface_dangling = surface_dangling;
        self
    }

    /// One node per environment, linked by flow edges in input order
    pub fn build_pipeline(
        &self,
        id: &str,
        name: &str,
        environments: &[EnvironmentRecord],
    ) -> Result<Graph> {
        let mut draft = GraphDraft::new(GraphLevel::Pipeline);

        for env in environments {
            let status = if env.modules.is_empty() {
                ValidationStatus::Warning
            } else if env.modules.iter().any(ModuleRecord::has_errors) {
                ValidationStatus::Error
            } else {
                ValidationStatus::Valid
            };

            draft.add_node(
                &env.id,
                None,
                &env.name,
                NodeType::Environment,
                status,
                json!({ "name": env.name, "moduleCount": env.modules.len() }),
                Vec::new(),
            )?;
        }

        let node_ids: Vec<String> = draft.nodes.iter().map(|n| n.id.clone()).collect();
        for pair in node_ids.windows(2) {
            draft.add_edge(&pair[0], &pair[1], EdgeType::Flow, false);
        }

        Ok(self.finish(draft, id, name))
    }

    /// One node per module, dependency edges from each `depends_on` list
    pub fn build_environment(&self, environment: &EnvironmentRecord) -> Result<Graph> {
        let mut draft = GraphDraft::new(GraphLevel::Environment);

        for module in &environment.modules {
            let status = if module.has_errors() {
                ValidationStatus::Error
            } else {
                ValidationStatus::Valid
            };

            draft.add_node(
                &module.id,
                Some(module.reference_key()),
                &module.name,
                NodeType::Module,
                status,
                json!({
                    "name": module.name,
                    "resourceCount": module.resources.len(),
                    "dependsOn": module.depends_on,
                }),
                module.validation_errors.clone(),
            )?;
        }

        for module in &environment.modules {
            draft.link_dependencies(
                &module.id,
                &module.name,
                &module.depends_on,
                self.surface_dangling,
            );
        }

        Ok(self.finish(draft, &environment.id, &environment.name))
    }

    /// One node per resource, dependency edges from each `depends_on` list
    pub fn build_module(&self, module: &ModuleRecord) -> Result<Graph> {
        let mut draft = GraphDraft::new(GraphLevel::Module);

        for resource in &module.resources {
            add_resource_node(&mut draft, resource)?;
        }

        for resource in &module.resources {
            draft.link_dependencies(
                &resource.id,
                &resource.name,
                &resource.depends_on,
                self.surface_dangling,
            );
        }

        Ok(self.finish(draft, &module.id, &module.name))
    }

    /// Fold dependency analysis into a built graph
    ///
    /// Adds `implicit_edge_type` edges for references known only through
    /// interpolation, attaches cycles (marking their nodes and edges), and
    /// records rejected cross-boundary references as diagnostics.
    pub fn apply_analysis(
        &self,
        graph: &mut Graph,
        analysis: &DependencyAnalysis,
        implicit_edge_type: EdgeType,
    ) {
        let by_domain: HashMap<String, String> = graph
            .nodes
            .iter()
            .map(|n| (n.metadata.domain_id.clone(), n.id.clone()))
            .collect();

        let mut draft = GraphDraft::new(graph.metadata.level);
        for edge in &graph.edges {
            *draft
                .edge_ids
                .entry(format!("{}->{}", edge.source, edge.target))
                .or_insert(0) += 1;
        }
        for (from, to) in analysis.implicit_references() {
            if let (Some(source), Some(target)) = (by_domain.get(from), by_domain.get(to)) {
                draft.add_edge(source, target, implicit_edge_type, true);
            }
        }
        graph.edges.append(&mut draft.edges);

        let mut cycle_links: HashSet<(&str, &str)> = HashSet::new();
        for cycle in analysis.cycles() {
            let members = cycle.members();
            for (idx, member) in members.iter().enumerate() {
                let next = &members[(idx + 1) % members.len()];
                cycle_links.insert((member.as_str(), next.as_str()));
            }
            graph.metadata.cycles.push(members.to_vec());
        }

        if !cycle_links.is_empty() {
            let cyclic = analysis.cyclic_entities();
            for node in &mut graph.nodes {
                if cyclic.contains(node.metadata.domain_id.as_str()) {
                    set_status(node, ValidationStatus::Error);
                }
            }

            let domain_of: HashMap<&str, &str> = graph
                .nodes
                .iter()
                .map(|n| (n.id.as_str(), n.metadata.domain_id.as_str()))
                .collect();
            for edge in &mut graph.edges {
                if let (Some(from), Some(to)) = (
                    domain_of.get(edge.source.as_str()),
                    domain_of.get(edge.target.as_str()),
                ) && cycle_links.contains(&(*from, *to))
                {
                    edge.metadata.in_cycle = true;
                }
            }
        }

        for rejected in analysis.rejected_references() {
            graph.metadata.diagnostics.push(format!(
                "reference from '{}' to '{}' crosses boundary '{}' → '{}'",
                rejected.from, rejected.to, rejected.from_boundary, rejected.to_boundary
            ));
            if let Some(node) = graph
                .nodes
                .iter_mut()
                .find(|n| n.metadata.domain_id == rejected.from)
            {
                set_status(node, ValidationStatus::Error);
            }
        }

        graph.refresh_counts();
        graph.roll_up_status();
    }

    fn finish(&self, draft: GraphDraft, id: &str, name: &str) -> Graph {
        let now = self.clock.now();
        let level = draft.level;

        let mut graph = Graph {
            nodes: draft.nodes,
            edges: draft.edges,
            layout: level.layout_kind(),
            layout_config: LayoutConfig::for_level(level),
            metadata: GraphMetadata {
                id: id.to_string(),
                name: name.to_string(),
                level,
                node_count: 0,
                edge_count: 0,
                status: ValidationStatus::Valid,
                created_at: now,
                updated_at: now,
                performance: PerformanceMetrics::default(),
                cycles: Vec::new(),
                diagnostics: draft.diagnostics,
            },
        };

        graph.refresh_counts();
        graph.roll_up_status();

        debug!(
            level = %level,
            graph = %id,
            nodes = graph.metadata.node_count,
            edges = graph.metadata.edge_count,
            "built raw graph"
        );

        graph
    }
}

fn add_resource_node(draft: &mut GraphDraft, resource: &ResourceRecord) -> Result<()> {
    let status = if resource.has_errors() {
        ValidationStatus::Error
    } else {
        ValidationStatus::Valid
    };

    draft.add_node(
        &resource.id,
        Some(resource.reference_key()),
        &resource.name,
        NodeType::from(resource.kind),
        status,
        json!({
            "name": resource.name,
            "type": resource.resource_type,
            "address": resource.reference_key(),
            "attributes": resource.attributes,
        }),
        resource.validation_errors.clone(),
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clock::SystemClock;
    use crate::core::ResourceKind;
    use crate::detector::{DependencyDetector, module_entities};

    fn builder() -> GraphBuilder {
        GraphBuilder::new(Arc::new(SystemClock))
    }

    fn edge_pairs(graph: &Graph) -> Vec<(String, String)> {
        graph
            .edges
            .iter()
            .map(|e| (e.source.clone(), e.target.clone()))
            .collect()
    }

    #[test]
    fn test_pipeline_flow_edges_follow_input_order() {
        let envs = vec![
            EnvironmentRecord::new("dev", "Dev").with_module(ModuleRecord::new("m1", "app")),
            EnvironmentRecord::new("staging", "Staging")
                .with_module(ModuleRecord::new("m2", "app")),
            EnvironmentRecord::new("prod", "Prod").with_module(ModuleRecord::new("m3", "app")),
        ];

        let graph = builder().build_pipeline("p1", "Release", &envs).unwrap();

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(
            edge_pairs(&graph),
            vec![
                ("environment:dev".to_string(), "environment:staging".to_string()),
                ("environment:staging".to_string(), "environment:prod".to_string()),
            ]
        );
        assert!(graph.edges.iter().all(|e| e.edge_type == EdgeType::Flow));
        assert_eq!(graph.metadata.status, ValidationStatus::Valid);
        graph.check_integrity().unwrap();
    }

    #[test]
    fn test_pipeline_status_derived_from_children() {
        let envs = vec![
            EnvironmentRecord::new("empty", "Empty"),
            EnvironmentRecord::new("broken", "Broken")
                .with_module(ModuleRecord::new("m1", "app").with_error("missing provider")),
        ];

        let graph = builder().build_pipeline("p1", "Release", &envs).unwrap();

        assert_eq!(graph.nodes[0].status, ValidationStatus::Warning);
        assert_eq!(graph.nodes[1].status, ValidationStatus::Error);
        assert_eq!(graph.metadata.status, ValidationStatus::Error);
    }

    #[test]
    fn test_empty_environment_is_a_warning() {
        let graph = builder()
            .build_environment(&EnvironmentRecord::new("dev", "Dev"))
            .unwrap();

        assert_eq!(graph.metadata.node_count, 0);
        assert_eq!(graph.metadata.edge_count, 0);
        assert_eq!(graph.metadata.status, ValidationStatus::Warning);
    }

    #[test]
    fn test_module_dependency_edge() {
        let env = EnvironmentRecord::new("dev", "Dev")
            .with_module(ModuleRecord::new("M", "app").depends_on("N"))
            .with_module(ModuleRecord::new("N", "network"));

        let graph = builder().build_environment(&env).unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(
            edge_pairs(&graph),
            vec![("module:M".to_string(), "module:N".to_string())]
        );
        assert_eq!(graph.edges[0].edge_type, EdgeType::Dependency);
        assert_eq!(graph.layout, crate::graph::LayoutKind::Ranked);
    }

    #[test]
    fn test_dangling_dependency_becomes_diagnostic() {
        let env = EnvironmentRecord::new("dev", "Dev")
            .with_module(ModuleRecord::new("M", "app").depends_on("ghost"));

        let graph = builder().build_environment(&env).unwrap();

        assert!(graph.edges.is_empty());
        assert_eq!(graph.metadata.diagnostics.len(), 1);
        assert_eq!(graph.nodes[0].status, ValidationStatus::Warning);

        let silent = builder()
            .with_surface_dangling(false)
            .build_environment(&env)
            .unwrap();
        assert!(silent.metadata.diagnostics.is_empty());
        assert_eq!(silent.nodes[0].status, ValidationStatus::Valid);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let env = EnvironmentRecord::new("dev", "Dev")
            .with_module(ModuleRecord::new("M", "app"))
            .with_module(ModuleRecord::new("M", "again"));

        let err = builder().build_environment(&env).unwrap_err();

        assert!(matches!(err, InfravizError::Validation { .. }));
    }

    #[test]
    fn test_resource_id_may_equal_an_earlier_address() {
        let module = ModuleRecord::new("m1", "app")
            .with_resource(ResourceRecord::new("a1", "web", ResourceKind::Resource))
            .with_resource(ResourceRecord::new("web", "db", ResourceKind::Resource))
            .with_resource(
                ResourceRecord::new("a3", "app", ResourceKind::Resource).depends_on("web"),
            );

        let graph = builder().build_module(&module).unwrap();

        assert_eq!(graph.nodes.len(), 3);
        // The id takes the address's place
        assert_eq!(
            edge_pairs(&graph),
            vec![("resource:a3".to_string(), "resource:web".to_string())]
        );
        graph.check_integrity().unwrap();
    }

    #[test]
    fn test_module_id_may_equal_an_earlier_address() {
        let env = EnvironmentRecord::new("dev", "Dev")
            .with_module(ModuleRecord::new("m1", "net"))
            .with_module(ModuleRecord::new("module.net", "other"))
            .with_module(ModuleRecord::new("m3", "app").depends_on("module.net"));

        let graph = builder().build_environment(&env).unwrap();

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(
            edge_pairs(&graph),
            vec![("module:m3".to_string(), "module:module.net".to_string())]
        );
    }

    #[test]
    fn test_address_never_shadows_an_earlier_id() {
        let env = EnvironmentRecord::new("dev", "Dev")
            .with_module(ModuleRecord::new("module.net", "other"))
            .with_module(ModuleRecord::new("m2", "net"))
            .with_module(ModuleRecord::new("m3", "app").depends_on("module.net"));

        let graph = builder().build_environment(&env).unwrap();

        assert_eq!(
            edge_pairs(&graph),
            vec![("module:m3".to_string(), "module:module.net".to_string())]
        );
    }

    #[test]
    fn test_resource_dependencies_resolve_by_address() {
        let module = ModuleRecord::new("m1", "app")
            .with_resource(
                ResourceRecord::new("web", "web", ResourceKind::Resource)
                    .with_type("aws_instance")
                    .depends_on("aws_security_group.web"),
            )
            .with_resource(
                ResourceRecord::new("sg", "web", ResourceKind::Resource)
                    .with_type("aws_security_group"),
            );

        let graph = builder().build_module(&module).unwrap();

        assert_eq!(
            edge_pairs(&graph),
            vec![("resource:web".to_string(), "resource:sg".to_string())]
        );
    }

    #[test]
    fn test_apply_analysis_marks_cycles() {
        let env = EnvironmentRecord::new("dev", "Dev")
            .with_module(ModuleRecord::new("A", "a").depends_on("B"))
            .with_module(ModuleRecord::new("B", "b").depends_on("C"))
            .with_module(ModuleRecord::new("C", "c").depends_on("A"));
        let b = builder();

        let mut graph = b.build_environment(&env).unwrap();
        let analysis = DependencyDetector::default()
            .analyze(&module_entities(&env).unwrap())
            .unwrap();
        b.apply_analysis(&mut graph, &analysis, EdgeType::ModuleLink);

        assert_eq!(graph.metadata.cycles, vec![vec!["A", "B", "C"]]);
        assert_eq!(graph.metadata.status, ValidationStatus::Error);
        assert!(graph.edges.iter().all(|e| e.metadata.in_cycle));
        assert!(graph.nodes.iter().all(|n| n.status == ValidationStatus::Error));
        graph.check_integrity().unwrap();
    }

    #[test]
    fn test_apply_analysis_adds_module_links() {
        let env = EnvironmentRecord::new("dev", "Dev")
            .with_module(
                ModuleRecord::new("app", "app")
                    .with_input("vpc_id", json!("${module.network.vpc_id}")),
            )
            .with_module(ModuleRecord::new("net", "network"));
        let b = builder();

        let mut graph = b.build_environment(&env).unwrap();
        let analysis = DependencyDetector::default()
            .analyze(&module_entities(&env).unwrap())
            .unwrap();
        b.apply_analysis(&mut graph, &analysis, EdgeType::ModuleLink);

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].edge_type, EdgeType::ModuleLink);
        assert!(graph.edges[0].metadata.implicit);
        assert_eq!(graph.metadata.edge_count, 1);
    }
}
