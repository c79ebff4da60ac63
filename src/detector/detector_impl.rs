use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::{EnvironmentRecord, ModuleRecord, ResourceRecord};
use crate::error::{InfravizError, Result};

static INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("interpolation pattern should be valid"));

// Quoted literals are matched first so their contents are never read as
// traversals.
static TRAVERSAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""[^"]*"|([A-Za-z_][A-Za-z0-9_\-]*(?:\.[A-Za-z0-9_\-]+)*)"#)
        .expect("traversal pattern should be valid")
});

/// Namespaces that never name another entity
const META_NAMESPACES: &[&str] = &["count", "each", "self", "path", "terraform"];

/// An entity taking part in dependency analysis
#[derive(Debug, Clone)]
pub struct DependencyEntity {
    pub id: String,
    /// Dotted address interpolations use, e.g. `aws_instance.web`
    pub address: String,
    /// The module or environment that owns the entity
    pub boundary: String,
    pub depends_on: Vec<String>,
    pub attributes: BTreeMap<String, Value>,
}

impl DependencyEntity {
    pub fn from_module(module: &ModuleRecord, boundary: &str) -> Self {
        Self {
            id: module.id.clone(),
            address: module.reference_key(),
            boundary: boundary.to_string(),
            depends_on: module.depends_on.clone(),
            attributes: module.inputs.clone(),
        }
    }

    pub fn from_resource(resource: &ResourceRecord, boundary: &str) -> Self {
        Self {
            id: resource.id.clone(),
            address: resource.reference_key(),
            boundary: boundary.to_string(),
            depends_on: resource.depends_on.clone(),
            attributes: resource.attributes.clone(),
        }
    }
}

/// Key every entity by id; a repeated id is rejected
pub fn entity_map(
    entities: impl IntoIterator<Item = DependencyEntity>,
) -> Result<BTreeMap<String, DependencyEntity>> {
    let mut map: BTreeMap<String, DependencyEntity> = BTreeMap::new();
    for entity in entities {
        match map.entry(entity.id.clone()) {
            Entry::Occupied(existing) => {
                return Err(InfravizError::Validation {
                    message: format!(
                        "duplicate entity id '{}' in '{}' and '{}'",
                        entity.id,
                        existing.get().boundary,
                        entity.boundary
                    ),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(entity);
            }
        }
    }
    Ok(map)
}

/// Modules of one environment
pub fn module_entities(
    environment: &EnvironmentRecord,
) -> Result<BTreeMap<String, DependencyEntity>> {
    entity_map(
        environment
            .modules
            .iter()
            .map(|module| DependencyEntity::from_module(module, &environment.id)),
    )
}

/// Resources of one module
pub fn resource_entities(module: &ModuleRecord) -> Result<BTreeMap<String, DependencyEntity>> {
    entity_map(
        module
            .resources
            .iter()
            .map(|resource| DependencyEntity::from_resource(resource, &module.id)),
    )
}

/// Resources of every module in an environment, bounded by their module
pub fn environment_resource_entities(
    environment: &EnvironmentRecord,
) -> Result<BTreeMap<String, DependencyEntity>> {
    entity_map(environment.modules.iter().flat_map(|module| {
        module
            .resources
            .iter()
            .map(|resource| DependencyEntity::from_resource(resource, &module.id))
    }))
}

/// Pull every `${...}` expression out of a value, walking arrays and maps
pub fn extract_interpolations(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_interpolations(value, &mut found);
    found
}

fn collect_interpolations(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::String(text) => {
            for capture in INTERPOLATION.captures_iter(text) {
                if let Some(expr) = capture.get(1) {
                    found.push(expr.as_str().trim().to_string());
                }
            }
        }
        Value::Array(items) => items
            .iter()
            .for_each(|item| collect_interpolations(item, found)),
        Value::Object(map) => map
            .values()
            .for_each(|item| collect_interpolations(item, found)),
        _ => {}
    }
}

/// Dotted traversals mentioned in an expression, outside string literals
pub fn traversals(expression: &str) -> Vec<String> {
    TRAVERSAL
        .captures_iter(expression)
        .filter_map(|capture| capture.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceOrigin {
    Explicit,
    Interpolation,
}

/// A reference from one entity to an entity in a different boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossBoundaryReference {
    pub from: String,
    pub to: String,
    pub from_boundary: String,
    pub to_boundary: String,
    pub origin: ReferenceOrigin,
    /// Kept in the adjacency map because configuration allows it
    pub accepted: bool,
}

/// A reference that names nothing in the analysed entity set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    pub from: String,
    pub reference: String,
    pub origin: ReferenceOrigin,
}

/// One dependency cycle, members in traversal order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyCycle {
    members: Vec<String>,
}

impl DependencyCycle {
    pub fn new(members: Vec<String>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|member| member == id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Rotation starting at the smallest member, used to spot duplicates
    fn canonical(&self) -> Vec<String> {
        let Some(start) = self
            .members
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(idx, _)| idx)
        else {
            return Vec::new();
        };

        self.members[start..]
            .iter()
            .chain(self.members[..start].iter())
            .cloned()
            .collect()
    }
}

impl fmt::Display for DependencyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut path = self.members.join(" → ");
        if let Some(first) = self.members.first() {
            path.push_str(" → ");
            path.push_str(first);
        }
        f.write_str(&path)
    }
}

/// Result of analysing one entity set
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyAnalysis {
    adjacency: BTreeMap<String, Vec<String>>,
    implicit: BTreeSet<(String, String)>,
    cycles: Vec<DependencyCycle>,
    cross_boundary: Vec<CrossBoundaryReference>,
    unresolved: Vec<UnresolvedReference>,
}

impl DependencyAnalysis {
    /// Entity id to the ids it depends on
    pub fn adjacency(&self) -> &BTreeMap<String, Vec<String>> {
        &self.adjacency
    }

    pub fn cycles(&self) -> &[DependencyCycle] {
        &self.cycles
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    pub fn cycle_count(&self) -> usize {
        self.cycles.len()
    }

    pub fn cross_boundary(&self) -> &[CrossBoundaryReference] {
        &self.cross_boundary
    }

    pub fn rejected_references(&self) -> impl Iterator<Item = &CrossBoundaryReference> {
        self.cross_boundary.iter().filter(|r| !r.accepted)
    }

    pub fn unresolved(&self) -> &[UnresolvedReference] {
        &self.unresolved
    }

    /// Dependencies known only through interpolation, never declared
    pub fn implicit_references(&self) -> impl Iterator<Item = (&str, &str)> {
        self.implicit
            .iter()
            .map(|(from, to)| (from.as_str(), to.as_str()))
    }

    /// Ids of every entity that sits on some cycle
    pub fn cyclic_entities(&self) -> HashSet<&str> {
        self.cycles
            .iter()
            .flat_map(|cycle| cycle.members().iter().map(String::as_str))
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.cycles.is_empty() && self.rejected_references().next().is_none()
    }

    /// Fold another analysis into this one (used when inspecting a snapshot)
    pub fn merge(&mut self, other: DependencyAnalysis) {
        for (from, targets) in other.adjacency {
            let entry = self.adjacency.entry(from).or_default();
            for target in targets {
                if !entry.contains(&target) {
                    entry.push(target);
                }
            }
        }
        self.implicit.extend(other.implicit);
        self.cycles.extend(other.cycles);
        self.cross_boundary.extend(other.cross_boundary);
        self.unresolved.extend(other.unresolved);
    }
}

/// Builds adjacency maps from explicit and interpolated references and finds
/// cycles with a depth-first search over them
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyDetector {
    allow_cross_boundary: bool,
    strict: bool,
}

impl DependencyDetector {
    pub fn new(allow_cross_boundary: bool, strict: bool) -> Self {
        Self {
            allow_cross_boundary,
            strict,
        }
    }

    /// Analyse an entity set keyed by id
    ///
    /// Cycles are reported in the returned analysis; in strict mode they are
    /// raised as [`InfravizError::Cycle`] instead.
    pub fn analyze(
        &self,
        entities: &BTreeMap<String, DependencyEntity>,
    ) -> Result<DependencyAnalysis> {
        let by_address: HashMap<&str, &str> = entities
            .values()
            .map(|entity| (entity.address.as_str(), entity.id.as_str()))
            .collect();

        let mut analysis = DependencyAnalysis::default();

        for entity in entities.values() {
            let mut targets: Vec<String> = Vec::new();
            let mut explicit: HashSet<String> = HashSet::new();

            for dep in &entity.depends_on {
                match resolve_explicit(dep, entities, &by_address) {
                    Some(target) => {
                        if self.admit(
                            entity,
                            &entities[target],
                            ReferenceOrigin::Explicit,
                            &mut analysis,
                        ) && !targets.iter().any(|t| t == target)
                        {
                            targets.push(target.to_string());
                        }
                        explicit.insert(target.to_string());
                    }
                    None => analysis.unresolved.push(UnresolvedReference {
                        from: entity.id.clone(),
                        reference: dep.clone(),
                        origin: ReferenceOrigin::Explicit,
                    }),
                }
            }

            for value in entity.attributes.values() {
                for expression in extract_interpolations(value) {
                    for traversal in traversals(&expression) {
                        match resolve_traversal(&traversal, entities, &by_address) {
                            Some(target) if target == entity.id => {}
                            Some(target) => {
                                if !self.admit(
                                    entity,
                                    &entities[target],
                                    ReferenceOrigin::Interpolation,
                                    &mut analysis,
                                ) {
                                    continue;
                                }
                                if !targets.iter().any(|t| t == target) {
                                    targets.push(target.to_string());
                                }
                                if !explicit.contains(target) {
                                    analysis
                                        .implicit
                                        .insert((entity.id.clone(), target.to_string()));
                                }
                            }
                            None if is_reportable(&traversal) => {
                                analysis.unresolved.push(UnresolvedReference {
                                    from: entity.id.clone(),
                                    reference: traversal,
                                    origin: ReferenceOrigin::Interpolation,
                                })
                            }
                            None => {}
                        }
                    }
                }
            }

            analysis.adjacency.insert(entity.id.clone(), targets);
        }

        analysis.cycles = find_cycles(&analysis.adjacency);

        debug!(
            entities = entities.len(),
            cycles = analysis.cycles.len(),
            cross_boundary = analysis.cross_boundary.len(),
            unresolved = analysis.unresolved.len(),
            "dependency analysis complete"
        );

        if self.strict && analysis.has_cycles() {
            return Err(InfravizError::Cycle {
                cycles: analysis
                    .cycles
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
                count: analysis.cycles.len(),
            });
        }

        Ok(analysis)
    }

    /// Record a cross-boundary reference; returns whether it may be followed
    fn admit(
        &self,
        from: &DependencyEntity,
        to: &DependencyEntity,
        origin: ReferenceOrigin,
        analysis: &mut DependencyAnalysis,
    ) -> bool {
        if from.boundary == to.boundary {
            return true;
        }

        if !self.allow_cross_boundary {
            warn!(
                from = %from.id,
                to = %to.id,
                "rejected reference across boundary {} → {}",
                from.boundary,
                to.boundary
            );
        }

        analysis.cross_boundary.push(CrossBoundaryReference {
            from: from.id.clone(),
            to: to.id.clone(),
            from_boundary: from.boundary.clone(),
            to_boundary: to.boundary.clone(),
            origin,
            accepted: self.allow_cross_boundary,
        });

        self.allow_cross_boundary
    }
}

fn resolve_explicit<'a>(
    dep: &str,
    entities: &'a BTreeMap<String, DependencyEntity>,
    by_address: &HashMap<&str, &'a str>,
) -> Option<&'a str> {
    if let Some((id, _)) = entities.get_key_value(dep) {
        return Some(id.as_str());
    }
    by_address.get(dep).copied()
}

/// Longest dotted prefix naming an entity wins
fn resolve_traversal<'a>(
    traversal: &str,
    entities: &'a BTreeMap<String, DependencyEntity>,
    by_address: &HashMap<&str, &'a str>,
) -> Option<&'a str> {
    let parts: Vec<&str> = traversal.split('.').collect();

    (1..=parts.len()).rev().find_map(|len| {
        let candidate = parts[..len].join(".");
        by_address
            .get(candidate.as_str())
            .copied()
            .or_else(|| entities.get_key_value(&candidate).map(|(id, _)| id.as_str()))
    })
}

fn is_reportable(traversal: &str) -> bool {
    match traversal.split_once('.') {
        Some((namespace, _)) => !META_NAMESPACES.contains(&namespace),
        None => false,
    }
}

/// Depth-first search with an explicit recursion stack; reaching a node that
/// is still on the stack records the stack slice from that node as a cycle
pub fn find_cycles(adjacency: &BTreeMap<String, Vec<String>>) -> Vec<DependencyCycle> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut seen_cycles: HashSet<Vec<String>> = HashSet::new();
    let mut cycles = Vec::new();

    for start in adjacency.keys() {
        if visited.contains(start.as_str()) {
            continue;
        }

        let mut frames: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
        let mut path: Vec<&str> = vec![start.as_str()];
        let mut on_stack: HashSet<&str> = HashSet::from([start.as_str()]);
        visited.insert(start.as_str());

        while let Some(frame) = frames.last_mut() {
            let node = frame.0;
            let neighbors = adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]);

            if frame.1 >= neighbors.len() {
                on_stack.remove(node);
                path.pop();
                frames.pop();
                continue;
            }

            let neighbor = neighbors[frame.1].as_str();
            frame.1 += 1;

            if on_stack.contains(neighbor) {
                if let Some(pos) = path.iter().position(|n| *n == neighbor) {
                    let cycle = DependencyCycle::new(
                        path[pos..].iter().map(|n| n.to_string()).collect(),
                    );
                    if seen_cycles.insert(cycle.canonical()) {
                        cycles.push(cycle);
                    }
                }
            } else if visited.insert(neighbor) {
                on_stack.insert(neighbor);
                path.push(neighbor);
                frames.push((neighbor, 0));
            }
        }
    }

    cycles
}
