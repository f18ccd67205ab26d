//! Model dependency graph and topological ordering

use crate::error::{CoreError, CoreResult};
use crate::model_name::ModelName;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// A directed acyclic graph of `ref()` dependencies between models.
///
/// Edges point from a dependency to its dependent, so a topological sort
/// yields upstream models first.
#[derive(Debug, Default)]
pub struct ModelDag {
    graph: DiGraph<ModelName, ()>,
    node_map: HashMap<ModelName, NodeIndex>,
}

impl ModelDag {
    /// Build the DAG from a map of model -> models it references.
    ///
    /// Nodes are inserted in name order so the resulting execution order is
    /// stable across runs. A reference to a model missing from the map is an
    /// error, as is any cycle.
    pub fn build(dependencies: &BTreeMap<ModelName, Vec<ModelName>>) -> CoreResult<Self> {
        let mut dag = Self::default();

        for model in dependencies.keys() {
            dag.add_model(model);
        }

        for (model, deps) in dependencies {
            for dep in deps {
                if !dag.node_map.contains_key(dep) {
                    return Err(CoreError::ModelNotFound {
                        name: format!("{} (referenced by {})", dep, model),
                    });
                }
                dag.add_dependency(model, dep);
            }
        }

        dag.validate()?;
        Ok(dag)
    }

    fn add_model(&mut self, name: &ModelName) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        self.node_map.insert(name.clone(), idx);
        idx
    }

    fn add_dependency(&mut self, model: &ModelName, depends_on: &ModelName) {
        let from = self.add_model(depends_on);
        let to = self.add_model(model);
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Fail with the offending cycle if the graph is not acyclic
    pub fn validate(&self) -> CoreResult<()> {
        self.topological_order().map(|_| ())
    }

    /// Shortest path from `start` back to itself, rendered `a -> b -> a`.
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let mut came_from: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut closing = None;

        'search: while let Some(current) = queue.pop_front() {
            for edge in self.graph.edges(current) {
                let target = edge.target();
                if target == start {
                    closing = Some(current);
                    break 'search;
                }
                if let Entry::Vacant(slot) = came_from.entry(target) {
                    slot.insert(current);
                    queue.push_back(target);
                }
            }
        }

        let start_name = self.graph[start].to_string();
        let Some(mut node) = closing else {
            return start_name;
        };

        let mut path = vec![start_name.clone()];
        while node != start {
            path.push(self.graph[node].to_string());
            match came_from.get(&node) {
                Some(&prev) => node = prev,
                None => break,
            }
        }
        path.push(start_name);
        path.reverse();

        path.join(" -> ")
    }

    /// Models in dependency order (upstream first)
    pub fn topological_order(&self) -> CoreResult<Vec<ModelName>> {
        toposort(&self.graph, None)
            .map(|indices| indices.into_iter().map(|i| self.graph[i].clone()).collect())
            .map_err(|cycle| CoreError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            })
    }

    /// Direct upstream models of `model`
    pub fn dependencies(&self, model: &str) -> Vec<ModelName> {
        self.neighbors(model, Direction::Incoming)
    }

    /// Direct downstream models of `model`
    pub fn dependents(&self, model: &str) -> Vec<ModelName> {
        self.neighbors(model, Direction::Outgoing)
    }

    fn neighbors(&self, model: &str, direction: Direction) -> Vec<ModelName> {
        let Some(&idx) = self.node_map.get(model) else {
            return Vec::new();
        };
        let mut out: Vec<ModelName> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out
    }

    /// All transitive upstream models
    pub fn ancestors(&self, model: &str) -> Vec<ModelName> {
        self.reachable(model, Direction::Incoming)
    }

    /// All transitive downstream models
    pub fn descendants(&self, model: &str) -> Vec<ModelName> {
        self.reachable(model, Direction::Outgoing)
    }

    fn reachable(&self, model: &str, direction: Direction) -> Vec<ModelName> {
        let Some(&start) = self.node_map.get(model) else {
            return Vec::new();
        };
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        let mut out = Vec::new();
        while let Some(idx) = stack.pop() {
            for n in self.graph.neighbors_directed(idx, direction) {
                if visited.insert(n) {
                    out.push(self.graph[n].clone());
                    stack.push(n);
                }
            }
        }
        out.sort();
        out
    }

    /// Resolve a selector to models, in execution order.
    ///
    /// Supports `model`, `+model` (with ancestors), `model+` (with
    /// descendants) and `+model+`. Several selectors may be joined with
    /// commas; the union is returned.
    pub fn select(&self, selector: &str) -> CoreResult<Vec<ModelName>> {
        let mut selected: HashSet<ModelName> = HashSet::new();

        for part in selector.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let upstream = part.starts_with('+');
            let downstream = part.ends_with('+') && part.len() > 1;
            let name = part.trim_start_matches('+').trim_end_matches('+');

            if name.is_empty() {
                return Err(CoreError::InvalidSelector {
                    selector: part.to_string(),
                    reason: "no model name".to_string(),
                });
            }

            let Some((model, _)) = self.node_map.get_key_value(name) else {
                return Err(CoreError::ModelNotFound {
                    name: name.to_string(),
                });
            };

            selected.insert(model.clone());
            if upstream {
                selected.extend(self.ancestors(name));
            }
            if downstream {
                selected.extend(self.descendants(name));
            }
        }

        if selected.is_empty() {
            return Err(CoreError::InvalidSelector {
                selector: selector.to_string(),
                reason: "selector is empty".to_string(),
            });
        }

        Ok(self
            .topological_order()?
            .into_iter()
            .filter(|m| selected.contains(m))
            .collect())
    }

    /// All model names in the DAG, sorted
    pub fn models(&self) -> Vec<ModelName> {
        let mut names: Vec<ModelName> = self.node_map.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a model exists in the DAG
    pub fn contains(&self, model: &str) -> bool {
        self.node_map.contains_key(model)
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
