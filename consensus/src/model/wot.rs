use std::collections::BTreeSet;
use trellis_consensus_core::api::{WotGraph, WotId};

/// A node of the certification graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Node {
    enabled: bool,
    /// Nodes certifying this one.
    sources: BTreeSet<WotId>,
    /// Number of certifications issued by this node.
    issued: usize,
}

/// In-memory certification graph.
///
/// Node ids are dense indices in creation order. Reverting a block first
/// removes the links it added, then pops the nodes it created, so ids held
/// by older identities never move.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryWot {
    nodes: Vec<Node>,
}

impl MemoryWot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WotGraph for MemoryWot {
    fn add_node(&mut self) -> WotId {
        self.nodes.push(Node { enabled: true, ..Default::default() });
        self.nodes.len() - 1
    }

    fn rem_node(&mut self) -> Option<WotId> {
        self.nodes.pop()?;
        Some(self.nodes.len())
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn is_enabled(&self, id: WotId) -> Option<bool> {
        self.nodes.get(id).map(|n| n.enabled)
    }

    fn set_enabled(&mut self, id: WotId, enabled: bool) -> Option<bool> {
        self.nodes.get_mut(id).map(|n| {
            n.enabled = enabled;
            enabled
        })
    }

    fn has_link(&self, from: WotId, to: WotId) -> bool {
        self.nodes.get(to).is_some_and(|n| n.sources.contains(&from))
    }

    fn add_link(&mut self, from: WotId, to: WotId) {
        if from == to || from >= self.nodes.len() || to >= self.nodes.len() {
            return;
        }
        if self.nodes[to].sources.insert(from) {
            self.nodes[from].issued += 1;
        }
    }

    fn rem_link(&mut self, from: WotId, to: WotId) {
        if from >= self.nodes.len() || to >= self.nodes.len() {
            return;
        }
        if self.nodes[to].sources.remove(&from) {
            self.nodes[from].issued -= 1;
        }
    }

    fn sources_of(&self, id: WotId) -> Vec<WotId> {
        self.nodes.get(id).map(|n| n.sources.iter().copied().collect()).unwrap_or_default()
    }

    fn issued_count(&self, id: WotId) -> Option<usize> {
        self.nodes.get(id).map(|n| n.issued)
    }

    fn is_sentry(&self, id: WotId, d_min: usize) -> Option<bool> {
        self.nodes.get(id).map(|n| n.enabled && n.issued >= d_min && n.sources.len() >= d_min)
    }

    fn sentries(&self, d_min: usize) -> Vec<WotId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.enabled && n.issued >= d_min && n.sources.len() >= d_min)
            .map(|(i, _)| i)
            .collect()
    }
}
