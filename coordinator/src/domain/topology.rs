// Copyright (c) 2026 Hivemind Systems
// SPDX-License-Identifier: AGPL-3.0
//! Topology graph over agent identities.
//!
//! Edges are a pure function of (topology kind, membership): the coordinator
//! calls [`TopologyGraph::rebuild`] after every membership change with the
//! node set in registration order, which makes the derived edge set
//! reproducible for identical membership sequences. Edges are stored as
//! normalized undirected pairs `(min, max)`.

use crate::domain::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Structural connectivity pattern among agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    /// All-pairs edges.
    Mesh,
    /// One hub (lowest registration sequence), edges hub <-> spoke.
    Star,
    /// Each node connects to exactly two neighbors in a cycle.
    Ring,
    /// Complete binary tree over the ordered node list; each non-root node
    /// has exactly one parent edge (parent of node `i` is `(i - 1) / 2`).
    Hierarchical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyGraph {
    kind: TopologyKind,
    /// Membership in registration order.
    nodes: Vec<AgentId>,
    edges: BTreeSet<(AgentId, AgentId)>,
}

fn edge(a: AgentId, b: AgentId) -> (AgentId, AgentId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl TopologyGraph {
    pub fn new(kind: TopologyKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
            edges: BTreeSet::new(),
        }
    }

    pub fn kind(&self) -> TopologyKind {
        self.kind
    }

    /// Insert a node without deriving edges; callers follow up with
    /// [`rebuild`](Self::rebuild) since edges are never independently mutated.
    pub fn add_node(&mut self, id: AgentId) {
        if !self.nodes.contains(&id) {
            self.nodes.push(id);
        }
    }

    /// Remove a node, cascading removal of its incident edges.
    pub fn remove_node(&mut self, id: AgentId) {
        self.nodes.retain(|&n| n != id);
        self.edges.retain(|&(a, b)| a != id && b != id);
    }

    /// Recompute the full edge set from `nodes` (registration order) and the
    /// configured kind. An empty node set yields an empty graph: a swarm
    /// transiently at zero agents is valid mid-scale-down.
    pub fn rebuild(&mut self, nodes: Vec<AgentId>) {
        self.nodes = nodes;
        self.edges.clear();
        let n = self.nodes.len();
        if n < 2 {
            return;
        }
        match self.kind {
            TopologyKind::Mesh => {
                for i in 0..n {
                    for j in (i + 1)..n {
                        self.edges.insert(edge(self.nodes[i], self.nodes[j]));
                    }
                }
            }
            TopologyKind::Star => {
                let hub = self.nodes[0];
                for &spoke in &self.nodes[1..] {
                    self.edges.insert(edge(hub, spoke));
                }
            }
            TopologyKind::Ring => {
                for i in 0..n {
                    self.edges.insert(edge(self.nodes[i], self.nodes[(i + 1) % n]));
                }
            }
            TopologyKind::Hierarchical => {
                for i in 1..n {
                    self.edges.insert(edge(self.nodes[(i - 1) / 2], self.nodes[i]));
                }
            }
        }
    }

    pub fn neighbors_of(&self, id: AgentId) -> BTreeSet<AgentId> {
        self.edges
            .iter()
            .filter_map(|&(a, b)| {
                if a == id {
                    Some(b)
                } else if b == id {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn edges(&self) -> &BTreeSet<(AgentId, AgentId)> {
        &self.edges
    }
}
