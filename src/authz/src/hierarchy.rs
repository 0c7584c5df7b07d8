//! Role inheritance graph
//!
//! Edges point from a parent role to a child role. The graph is rebuilt from
//! the stored edge set whenever it is needed. Nothing here is consulted by the
//! permission checker, which only looks at directly-assigned roles.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::types::{RoleId, RoleInheritance};

/// Adjacency view over a set of role edges
#[derive(Debug, Clone, Default)]
pub struct RoleGraph {
    /// child -> parents, in edge insertion order
    parents: HashMap<RoleId, Vec<RoleId>>,

    /// parent -> children, in edge insertion order
    children: HashMap<RoleId, Vec<RoleId>>,
}

impl RoleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a RoleInheritance>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(edge.parent_id, edge.child_id);
        }
        graph
    }

    pub fn add_edge(&mut self, parent: RoleId, child: RoleId) {
        self.parents.entry(child).or_default().push(parent);
        self.children.entry(parent).or_default().push(child);
    }

    /// Direct descendants of `role`
    pub fn children(&self, role: RoleId) -> Vec<RoleId> {
        self.children.get(&role).cloned().unwrap_or_default()
    }

    /// Every ancestor of `role`, nearest first (breadth-first), without duplicates
    pub fn ancestors(&self, role: RoleId) -> Vec<RoleId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<RoleId> = self.parents.get(&role).cloned().unwrap_or_default().into();

        seen.insert(role);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            if let Some(next) = self.parents.get(&current) {
                queue.extend(next.iter().copied());
            }
        }

        order
    }

    /// Whether adding `parent -> child` would close a cycle
    ///
    /// True when the two roles are the same, or when `child` is already an
    /// ancestor of `parent`.
    pub fn would_create_cycle(&self, parent: RoleId, child: RoleId) -> bool {
        parent == child || self.ancestors(parent).contains(&child)
    }
}
