//! The search tree: an arena of predicted future states (spec §4, §9).
//!
//! Nodes are stored in a flat `Vec` and referenced by index rather than by
//! pointer or `Rc`, per spec §9's design note on cyclic/parent references:
//! this supports cheap bulk deallocation (reset, advance-root) without
//! fighting the borrow checker over parent/child cycles.

use crate::entities::Command;
use crate::snapshot::Snapshot;

/// An index into a [`Tree`]'s arena.
pub type NodeIndex = usize;

/// One node of the search tree (spec §3 Data Model, `Node`).
#[derive(Debug, Clone)]
pub struct Node {
    pub state: Snapshot,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
    /// The command sequence (one per simulated tick / "skip") that produced
    /// this node from its parent.
    pub commands: Vec<Command>,
    pub score: f32,
    pub subtree_score_sum: f32,
    pub subtree_size: usize,
    /// Whether this node is eligible for weighted-descent selection (spec §4.6.5).
    pub expandable: bool,
}

impl Node {
    fn root(state: Snapshot) -> Self {
        Self {
            state,
            parent: None,
            children: Vec::new(),
            commands: Vec::new(),
            score: 0.0,
            subtree_score_sum: 0.0,
            subtree_size: 1,
            expandable: true,
        }
    }

    fn child(state: Snapshot, parent: NodeIndex, commands: Vec<Command>) -> Self {
        Self {
            state,
            parent: Some(parent),
            children: Vec::new(),
            commands,
            score: 0.0,
            subtree_score_sum: 0.0,
            subtree_size: 1,
            expandable: false,
        }
    }
}

/// An arena-backed tree of predicted states.
///
/// Dead nodes (detached by [`Tree::reset`] or [`Tree::advance_root`]) are
/// dropped immediately by truncating/rebuilding the arena rather than left
/// to linger, per spec §5's memory policy.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    pub root: NodeIndex,
}

impl Tree {
    /// Start a brand new tree rooted at `state` (spec §4.6.2, "root reset").
    pub fn reset(state: Snapshot) -> Self {
        Self {
            nodes: vec![Node::root(state)],
            root: 0,
        }
    }

    pub fn get(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx]
    }

    pub fn get_mut(&mut self, idx: NodeIndex) -> &mut Node {
        &mut self.nodes[idx]
    }

    pub fn root_node(&self) -> &Node {
        &self.nodes[self.root]
    }

    /// Number of live nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add `state` as a new child of `parent`, produced by `commands`.
    /// Returns the new node's index.
    pub fn add_child(&mut self, parent: NodeIndex, state: Snapshot, commands: Vec<Command>) -> NodeIndex {
        let idx = self.nodes.len();
        self.nodes.push(Node::child(state, parent, commands));
        self.nodes[parent].children.push(idx);
        idx
    }

    /// Recompute `subtree_score_sum`/`subtree_size` from `idx` up to the root
    /// (spec §4.6.4 step 3, §8 "subtree aggregation").
    pub fn backpropagate(&mut self, mut idx: NodeIndex) {
        loop {
            let sum: f32 = self.nodes[idx]
                .children
                .iter()
                .map(|&c| self.nodes[c].subtree_score_sum)
                .sum();
            let size: usize = 1 + self.nodes[idx].children.iter().map(|&c| self.nodes[c].subtree_size).sum::<usize>();
            self.nodes[idx].subtree_score_sum = self.nodes[idx].score + sum;
            self.nodes[idx].subtree_size = size;
            match self.nodes[idx].parent {
                Some(p) => idx = p,
                None => break,
            }
        }
    }

    /// Promote `next_root` to be the tree's new root, detaching and
    /// dropping every sibling subtree (spec §4.6.2, "advance_root").
    ///
    /// Returns the node indices that were dropped, so the planner can evict
    /// them from its `tips` map.
    pub fn advance_root(&mut self, next_root: NodeIndex) -> Vec<NodeIndex> {
        let mut keep = vec![false; self.nodes.len()];
        let mut stack = vec![next_root];
        while let Some(i) = stack.pop() {
            if keep[i] {
                continue;
            }
            keep[i] = true;
            stack.extend(self.nodes[i].children.iter().copied());
        }

        let dropped: Vec<NodeIndex> = (0..self.nodes.len()).filter(|&i| !keep[i]).collect();

        let mut remap = vec![usize::MAX; self.nodes.len()];
        let mut new_nodes = Vec::with_capacity(keep.iter().filter(|k| **k).count());
        for (old_idx, node) in self.nodes.iter().enumerate() {
            if keep[old_idx] {
                remap[old_idx] = new_nodes.len();
                new_nodes.push(node.clone());
            }
        }
        for node in new_nodes.iter_mut() {
            node.parent = node.parent.and_then(|p| {
                let r = remap[p];
                if r == usize::MAX { None } else { Some(r) }
            });
            node.children.retain(|c| remap[*c] != usize::MAX);
            node.children.iter_mut().for_each(|c| *c = remap[*c]);
        }

        self.root = remap[next_root];
        self.nodes[self.root].parent = None;
        self.nodes = new_nodes;
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;

    fn snap(tick: u64) -> Snapshot {
        Snapshot::new(tick)
    }

    #[test]
    fn subtree_aggregation_invariant() {
        let mut tree = Tree::reset(snap(0));
        tree.get_mut(tree.root).score = 1.0;
        let c1 = tree.add_child(tree.root, snap(1), vec![]);
        let c2 = tree.add_child(tree.root, snap(1), vec![]);
        tree.get_mut(c1).score = 2.0;
        tree.get_mut(c2).score = 3.0;
        tree.backpropagate(c1);
        tree.backpropagate(c2);

        assert_eq!(tree.get(c1).subtree_size, 1);
        assert_eq!(tree.get(c1).subtree_score_sum, 2.0);
        assert_eq!(tree.root_node().subtree_size, 3);
        assert_eq!(tree.root_node().subtree_score_sum, 1.0 + 2.0 + 3.0);
    }

    #[test]
    fn reset_yields_single_root() {
        let tree = Tree::reset(snap(0));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root, 0);
        assert!(tree.root_node().children.is_empty());
    }

    #[test]
    fn advance_root_drops_siblings() {
        let mut tree = Tree::reset(snap(0));
        let a = tree.add_child(tree.root, snap(1), vec![]);
        let b = tree.add_child(tree.root, snap(1), vec![]);
        let a1 = tree.add_child(a, snap(2), vec![]);

        let dropped = tree.advance_root(a);
        assert_eq!(dropped.len(), 2); // old root + b
        assert_eq!(tree.len(), 2); // a (now root) + a1
        assert!(tree.root_node().parent.is_none());
        assert_eq!(tree.root_node().children.len(), 1);
        let _ = a1;
        let _ = b;
    }
}
