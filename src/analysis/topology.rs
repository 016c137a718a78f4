//! Dependency trees and evaluation plans for registered rules.
use super::Path;
use crate::diagnostics::{RegistryError, ResolveError};
use crate::payload::BaseNames;
use crate::store::{Registry, Rule};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    BasePresent,
    BaseMissing,
    Derived,
    /// Expanding this rule would revisit a name on the current path.
    CycleDetected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyNode {
    pub name: String,
    pub status: DependencyStatus,
    /// Present only for `Derived` nodes of a recursive tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<DependencyNode>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyTree {
    pub name: String,
    pub description: String,
    pub dependencies: Vec<DependencyNode>,
}

impl DependencyTree {
    /// Finds the first node named `name`, depth first.
    pub fn find(&self, name: &str) -> Option<&DependencyNode> {
        fn walk<'t>(nodes: &'t [DependencyNode], name: &str) -> Option<&'t DependencyNode> {
            nodes.iter().find_map(|n| {
                if n.name == name {
                    Some(n)
                } else {
                    n.dependencies.as_deref().and_then(|deps| walk(deps, name))
                }
            })
        }
        walk(&self.dependencies, name)
    }
}

/// Describes each direct dependency of `name`, expanding derived ones when
/// `recursive` is set.
///
/// A derived name reached through several parents (a diamond) is expanded in
/// full at every occurrence, so each subtree reads the same regardless of
/// which parent reaches it first.
pub fn dependency_tree<N>(registry: &Registry, name: &str, recursive: bool, available: &N) -> Result<DependencyTree, RegistryError>
where
    N: BaseNames + ?Sized,
{
    let rule = registry.require(name)?;
    Ok(DependencyTree {
        name: rule.name().to_string(),
        description: rule.description().to_string(),
        dependencies: expand(registry, rule, recursive, available, Path::root()),
    })
}

fn expand<N>(registry: &Registry, rule: &Rule, recursive: bool, available: &N, path: Path<'_>) -> Vec<DependencyNode>
where
    N: BaseNames + ?Sized,
{
    path.with(rule.name(), |path| {
        let mut seen = HashSet::new();
        rule.dependencies()
            .iter()
            .filter(|dep| seen.insert(dep.as_str()))
            .map(|dep| describe(registry, dep, recursive, available, path))
            .collect()
    })
}

fn describe<N>(registry: &Registry, dep: &str, recursive: bool, available: &N, path: Path<'_>) -> DependencyNode
where
    N: BaseNames + ?Sized,
{
    let (status, dependencies) = if available.contains_base(dep) {
        (DependencyStatus::BasePresent, None)
    } else if let Some(dep_rule) = registry.get(dep) {
        if path.contains(dep) {
            (DependencyStatus::CycleDetected, None)
        } else if recursive {
            (DependencyStatus::Derived, Some(expand(registry, dep_rule, recursive, available, path)))
        } else {
            (DependencyStatus::Derived, None)
        }
    } else {
        (DependencyStatus::BaseMissing, None)
    };
    DependencyNode { name: dep.to_string(), status, dependencies }
}

/// The rules needed to compute `name`, dependencies first, ending with `name`.
///
/// Checks the same graph conditions as the resolver without running any
/// compute function. Missing base names are reported in one flat list for
/// the whole graph.
pub fn evaluation_plan<N>(registry: &Registry, name: &str, available: &N) -> Result<Vec<String>, ResolveError>
where
    N: BaseNames + ?Sized,
{
    let rule = registry
        .get(name)
        .ok_or_else(|| ResolveError::UnknownVariable { name: name.to_string() })?;

    let mut planner = Planner {
        registry,
        available,
        graph: DiGraph::new(),
        index: HashMap::new(),
        missing: BTreeSet::new(),
    };
    planner.visit(rule, Path::root())?;

    if !planner.missing.is_empty() {
        return Err(ResolveError::MissingDependency {
            name: name.to_string(),
            missing_base: planner.missing.into_iter().collect(),
            unavailable_derived: Vec::new(),
        });
    }

    let graph = planner.graph;
    let order = toposort(&graph, None).map_err(|cycle| {
        let at = graph[cycle.node_id()].to_string();
        ResolveError::CyclicDependency { name: at.clone(), path: vec![at] }
    })?;
    Ok(order.into_iter().map(|idx| graph[idx].to_string()).collect())
}

/// Edges point from a dependency to the rule consuming it.
struct Planner<'a, N: ?Sized> {
    registry: &'a Registry,
    available: &'a N,
    graph: DiGraph<&'a str, ()>,
    index: HashMap<&'a str, NodeIndex>,
    missing: BTreeSet<String>,
}

impl<'a, N: BaseNames + ?Sized> Planner<'a, N> {
    fn visit(&mut self, rule: &'a Rule, path: Path<'_>) -> Result<NodeIndex, ResolveError> {
        let name = rule.name();
        if path.contains(name) {
            let mut cycle = path.to_vec();
            cycle.push(name.to_string());
            return Err(ResolveError::CyclicDependency { name: name.to_string(), path: cycle });
        }
        // Already expanded through another parent.
        if let Some(&idx) = self.index.get(name) {
            return Ok(idx);
        }

        let idx = self.graph.add_node(name);
        self.index.insert(name, idx);

        let registry = self.registry;
        path.with(name, |path| -> Result<NodeIndex, ResolveError> {
            for dep in rule.dependencies() {
                if self.available.contains_base(dep) {
                    continue;
                }
                match registry.get(dep) {
                    Some(dep_rule) => {
                        let dep_idx = self.visit(dep_rule, path)?;
                        self.graph.update_edge(dep_idx, idx, ());
                    }
                    None => {
                        self.missing.insert(dep.clone());
                    }
                }
            }
            Ok(idx)
        })
    }
}
