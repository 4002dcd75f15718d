//! Release closure computation
//!
//! Starting from the unit about to be released, walk the reverse dependency
//! edges (from a package to everything that depends on it) and collect every
//! release unit that has to move with it. The result is ordered
//! dependency-first so lower units are released before the ones above them.

use crate::error::{ReleaseError, Result};
use crate::graph::package::{PackageGraph, PackageId, ReleaseUnit};
use log::debug;
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Ordered set of units to release, plus packages that only need range rewrites
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleasePlan {
    /// Units in dependency-first order; the starting units are among them
    pub order: Vec<ReleaseUnit>,
    /// Private packages outside the plan whose ranges still follow the release
    pub range_only: Vec<PackageId>,
}

impl ReleasePlan {
    pub fn contains(&self, unit: ReleaseUnit) -> bool {
        self.order.contains(&unit)
    }

    /// Units queued after `unit`
    pub fn after(&self, unit: ReleaseUnit) -> &[ReleaseUnit] {
        match self.order.iter().position(|u| *u == unit) {
            Some(index) => &self.order[index + 1..],
            None => &[],
        }
    }
}

/// Resolve the release closure of a single unit
pub fn resolve(graph: &PackageGraph, start: ReleaseUnit) -> Result<ReleasePlan> {
    resolve_many(graph, &[start])
}

/// Resolve the combined release closure of several starting units
pub fn resolve_many(graph: &PackageGraph, starts: &[ReleaseUnit]) -> Result<ReleasePlan> {
    let dependents = graph.dependents_index();

    let mut included: Vec<ReleaseUnit> = Vec::new();
    let mut seen: HashSet<ReleaseUnit> = HashSet::new();
    let mut range_only: BTreeSet<PackageId> = BTreeSet::new();
    let mut queue: VecDeque<ReleaseUnit> = VecDeque::new();

    for start in starts {
        if seen.insert(*start) {
            included.push(*start);
            queue.push_back(*start);
        }
    }

    while let Some(unit) = queue.pop_front() {
        for member in graph.unit_members(unit) {
            for dependent in &dependents[member.0] {
                let dependent_unit = graph.unit_of(*dependent);
                if dependent_unit == unit || seen.contains(&dependent_unit) {
                    continue;
                }
                if graph.package(*dependent).private {
                    range_only.insert(*dependent);
                    continue;
                }
                debug!(
                    "{} pulls {} into the release",
                    graph.package(member).name,
                    graph.unit_name(dependent_unit)
                );
                seen.insert(dependent_unit);
                included.push(dependent_unit);
                queue.push_back(dependent_unit);
            }
        }
    }

    // Private members of included groups are covered by their group.
    let range_only: Vec<PackageId> = range_only
        .into_iter()
        .filter(|id| !seen.contains(&graph.unit_of(*id)))
        .collect();

    let order = topological_order(graph, &included, &dependents)?;
    Ok(ReleasePlan { order, range_only })
}

fn topological_order(
    graph: &PackageGraph,
    units: &[ReleaseUnit],
    dependents: &[Vec<PackageId>],
) -> Result<Vec<ReleaseUnit>> {
    let mut unit_graph: DiGraph<ReleaseUnit, ()> = DiGraph::new();
    let mut nodes: HashMap<ReleaseUnit, NodeIndex> = HashMap::new();
    for unit in units {
        nodes.insert(*unit, unit_graph.add_node(*unit));
    }

    for unit in units {
        let from = nodes[unit];
        for member in graph.unit_members(*unit) {
            for dependent in &dependents[member.0] {
                let dependent_unit = graph.unit_of(*dependent);
                if dependent_unit == *unit {
                    continue;
                }
                if let Some(to) = nodes.get(&dependent_unit) {
                    unit_graph.update_edge(from, *to, ());
                }
            }
        }
    }

    algo::toposort(&unit_graph, None).map_err(|_| {
        let members = algo::tarjan_scc(&unit_graph)
            .into_iter()
            .find(|component| component.len() > 1)
            .unwrap_or_default()
            .into_iter()
            .map(|idx| graph.unit_name(unit_graph[idx]).to_string())
            .collect();
        ReleaseError::CyclicReleaseDependency(members)
    })
    .map(|order| order.into_iter().map(|idx| unit_graph[idx]).collect())
}
