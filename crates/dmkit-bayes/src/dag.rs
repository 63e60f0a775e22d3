//! Directed acyclic graph over named variables
//!
//! A `Dag` is a value: edge changes never mutate it in place. `try_apply`
//! builds the changed graph, checks it for cycles, and hands it back only
//! if it is still acyclic, so a speculative edge can never be left behind.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use petgraph::algo::is_cyclic_directed;
use petgraph::dot::{Config as DotConfig, Dot};
use petgraph::graph::DiGraph;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::{Deserialize, Serialize, Serializer};
use tracing::info;

use dmkit_core::{DmError, ObservationTable, Result};

/// A single structural edit, expressed with node indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeChange {
    /// Add `parent -> child`
    Add { parent: usize, child: usize },
    /// Replace `parent -> child` with `child -> parent`
    Reverse { parent: usize, child: usize },
}

/// Directed acyclic graph with one node per variable
#[derive(Debug, Clone)]
pub struct Dag {
    names: Arc<[String]>,
    graph: DiGraphMap<usize, ()>,
}

impl Dag {
    /// Graph with the given nodes and no edges
    pub fn empty(names: Vec<String>) -> Self {
        let mut graph = DiGraphMap::with_capacity(names.len(), 0);
        for idx in 0..names.len() {
            graph.add_node(idx);
        }
        Self {
            names: names.into(),
            graph,
        }
    }

    /// Edgeless graph over the columns of a table, in column order
    pub fn from_table(data: &ObservationTable) -> Self {
        Self::empty(data.names().to_vec())
    }

    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, node: usize) -> &str {
        &self.names[node]
    }

    pub fn has_edge(&self, parent: usize, child: usize) -> bool {
        self.graph.contains_edge(parent, child)
    }

    /// Parents of `node`, ordered by name
    pub fn parents(&self, node: usize) -> Vec<usize> {
        let mut parents: Vec<usize> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        parents.sort_by(|a, b| self.names[*a].cmp(&self.names[*b]));
        parents
    }

    pub fn in_degree(&self, node: usize) -> usize {
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .count()
    }

    /// All edges as `(parent, child)`, ordered by parent then child index
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = self.graph.all_edges().map(|(p, c, _)| (p, c)).collect();
        edges.sort_unstable();
        edges
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.graph)
    }

    /// Apply a change, returning the new graph if it is well-formed and acyclic
    pub fn try_apply(&self, change: EdgeChange) -> Option<Dag> {
        let n = self.node_count();
        let mut graph = self.graph.clone();
        match change {
            EdgeChange::Add { parent, child } => {
                if parent == child || parent >= n || child >= n || graph.contains_edge(parent, child)
                {
                    return None;
                }
                graph.add_edge(parent, child, ());
            }
            EdgeChange::Reverse { parent, child } => {
                graph.remove_edge(parent, child)?;
                graph.add_edge(child, parent, ());
            }
        }

        if is_cyclic_directed(&graph) {
            return None;
        }
        Some(Dag {
            names: Arc::clone(&self.names),
            graph,
        })
    }

    /// Like `try_apply`, but reports why a change was rejected
    pub fn apply(&self, change: EdgeChange) -> Result<Dag> {
        self.try_apply(change).ok_or_else(|| {
            let (verb, parent, child) = match change {
                EdgeChange::Add { parent, child } => ("add", parent, child),
                EdgeChange::Reverse { parent, child } => ("reverse", parent, child),
            };
            let label = |idx: usize| self.names.get(idx).map_or("?", String::as_str);
            DmError::Graph(format!(
                "cannot {verb} edge {} -> {}: missing node, duplicate edge, or cycle",
                label(parent),
                label(child)
            ))
        })
    }

    /// Edges as `(parent name, child name)`
    pub fn named_edges(&self) -> Vec<(&str, &str)> {
        self.edges()
            .into_iter()
            .map(|(p, c)| (self.name(p), self.name(c)))
            .collect()
    }

    /// Write the edge list, one `parent,child` line per edge, no header
    pub fn write_gph<W: Write>(&self, mut writer: W) -> Result<()> {
        for (parent, child) in self.named_edges() {
            writeln!(writer, "{parent},{child}")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the `.gph` edge list file
    pub fn save_gph(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Writing {} edges to {:?}", self.edge_count(), path);
        self.write_gph(BufWriter::new(File::create(path)?))
    }

    /// Graphviz rendering of the graph
    pub fn to_dot(&self) -> String {
        let mut labelled: DiGraph<&str, &str> = DiGraph::with_capacity(self.node_count(), 0);
        let nodes: Vec<_> = self
            .names
            .iter()
            .map(|n| labelled.add_node(n.as_str()))
            .collect();
        for (p, c) in self.edges() {
            labelled.add_edge(nodes[p], nodes[c], "");
        }

        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "{}",
            Dot::with_config(&labelled, &[DotConfig::EdgeNoLabel])
        );
        out
    }
}

#[derive(Serialize)]
struct DagView<'a> {
    nodes: &'a [String],
    edges: Vec<(&'a str, &'a str)>,
}

impl Serialize for Dag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        DagView {
            nodes: &self.names,
            edges: self.named_edges(),
        }
        .serialize(serializer)
    }
}
