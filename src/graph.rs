//! Dependency graph over features or stories.
//!
//! One [`DependencyGraph`] is built per layer. Building validates every edge
//! and rejects cycles, so a graph that exists is always a DAG.
//!
//! # Algorithm
//! - Cycle detection: three-color depth-first search. Nodes are visited in
//!   ascending id order and successors in edge insertion order, so the
//!   reported cycle is reproducible.
//! - Ordering: Kahn's algorithm whose ready set is ordered by a caller
//!   comparator, which breaks ties between unconstrained items.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.3-22.4
//! Kahn (1962), "Topological sorting of large networks"

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::error::{PlanningError, Result};
use crate::models::{Dependency, SprintLookup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// A validated, acyclic dependency graph.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    predecessors: Vec<Vec<usize>>,
    successors: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Builds a graph from item ids and `from → to` edges.
    ///
    /// # Errors
    /// - [`PlanningError::UnknownReference`] if an edge names an unknown id
    /// - [`PlanningError::Cycle`] if the edges form a cycle (self-edges included)
    pub fn build<I, S>(ids: I, edges: &[Dependency]) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes: Vec<String> = ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut predecessors = vec![Vec::new(); nodes.len()];
        let mut successors = vec![Vec::new(); nodes.len()];

        for edge in edges {
            let lookup = |id: &str| {
                index
                    .get(id)
                    .copied()
                    .ok_or_else(|| PlanningError::UnknownReference {
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                        missing: id.to_string(),
                    })
            };
            let from = lookup(&edge.from)?;
            let to = lookup(&edge.to)?;

            if !successors[from].contains(&to) {
                successors[from].push(to);
                predecessors[to].push(from);
            }
        }

        let graph = Self {
            nodes,
            index,
            predecessors,
            successors,
        };

        if let Some(cycle) = graph.find_cycle() {
            return Err(PlanningError::Cycle { cycle });
        }

        Ok(graph)
    }

    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut colors = vec![Color::White; self.nodes.len()];
        let mut stack = Vec::new();

        for start in 0..self.nodes.len() {
            if colors[start] == Color::White {
                if let Some(cycle) = self.visit(start, &mut colors, &mut stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn visit(
        &self,
        node: usize,
        colors: &mut [Color],
        stack: &mut Vec<usize>,
    ) -> Option<Vec<String>> {
        colors[node] = Color::Gray;
        stack.push(node);

        for &next in &self.successors[node] {
            match colors[next] {
                Color::Gray => {
                    // Back edge: the cycle is the stack from `next` upward.
                    let pos = stack.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[pos..].iter().map(|&n| self.nodes[n].clone()).collect();
                    cycle.push(self.nodes[next].clone());
                    return Some(cycle);
                }
                Color::White => {
                    if let Some(cycle) = self.visit(next, colors, stack) {
                        return Some(cycle);
                    }
                }
                Color::Black => {}
            }
        }

        stack.pop();
        colors[node] = Color::Black;
        None
    }

    /// Dependency-respecting order of all items.
    ///
    /// Among items whose predecessors are all emitted, the one that `cmp`
    /// orders first is emitted next.
    pub fn topological_order<F>(&self, mut cmp: F) -> Vec<String>
    where
        F: FnMut(&str, &str) -> Ordering,
    {
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();

        // Sorted descending by `cmp`, so `pop` yields the first item.
        let mut ready: Vec<usize> = Vec::new();
        let push_ready = |ready: &mut Vec<usize>, node: usize, cmp: &mut F| {
            let pos = ready.partition_point(|&r| {
                cmp(self.nodes[r].as_str(), self.nodes[node].as_str()) == Ordering::Greater
            });
            ready.insert(pos, node);
        };

        for node in 0..self.nodes.len() {
            if in_degree[node] == 0 {
                push_ready(&mut ready, node, &mut cmp);
            }
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(node) = ready.pop() {
            order.push(self.nodes[node].clone());
            for &next in &self.successors[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    push_ready(&mut ready, next, &mut cmp);
                }
            }
        }

        order
    }

    /// Direct predecessors of an item, in edge order.
    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, &self.predecessors)
    }

    /// Direct successors of an item, in edge order.
    pub fn successors(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, &self.successors)
    }

    fn neighbors<'a>(&'a self, id: &str, adjacency: &'a [Vec<usize>]) -> Vec<&'a str> {
        match self.index.get(id) {
            Some(&i) => adjacency[i].iter().map(|&n| self.nodes[n].as_str()).collect(),
            None => Vec::new(),
        }
    }

    /// Whether the item is a node.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no items.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Item ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }

    /// Predecessors that are neither complete nor finished strictly before
    /// the item starts.
    ///
    /// When the item itself is unplaced, a predecessor only needs to be
    /// placed somewhere.
    pub fn unsatisfied_predecessors<L: SprintLookup>(&self, id: &str, lookup: &L) -> Vec<String> {
        let start = lookup.start_sprint(id);
        self.predecessors(id)
            .into_iter()
            .filter(|pred| {
                if lookup.is_complete(pred) {
                    return false;
                }
                match (lookup.finish_sprint(pred), start) {
                    (Some(finish), Some(start)) => finish >= start,
                    (Some(_), None) => false,
                    (None, _) => true,
                }
            })
            .map(str::to_string)
            .collect()
    }

    /// Whether every predecessor is complete or finishes strictly earlier.
    pub fn is_satisfied<L: SprintLookup>(&self, id: &str, lookup: &L) -> bool {
        self.unsatisfied_predecessors(id, lookup).is_empty()
    }
}
