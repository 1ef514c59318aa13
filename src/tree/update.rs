//! Sibling-property restoration
//!
//! After a leaf's occurrence its weight must rise by one, and the same
//! rise propagates to every ancestor. Done naively that breaks the sibling
//! property (listing all nodes by non-decreasing weight must keep code
//! length non-increasing as weight grows), so before each increment the
//! node is transposed with its *successor*: the highest-ranked member of
//! its equal-weight block that is neither the node itself nor related to
//! it as ancestor or descendant. The transposition is a link exchange;
//! both subtrees travel with their roots.
//!
//! The successor choice is the one deterministic tie-break the whole
//! format hangs on. Encoder and decoder run this exact code over the same
//! symbol sequence; any divergence would desynchronize their trees with no
//! detectable error, so the rule lives in one place and nothing else may
//! reorder nodes.

use super::node::{LeafKind, NodeId, NodeKind};
use super::{corrupt, AdaptiveTree};
use crate::fallback::Literal;
use crate::CodecError;

impl<S: Literal> AdaptiveTree<S> {
    /// Advance weights along the path from `leaf` to the root, restoring
    /// the sibling property at every step.
    ///
    /// Never fails on a well-formed tree. The checks here are defensive:
    /// on violation they report [`CodecError::CorruptTree`] and make no
    /// attempt at repair; a tree that fails one must be discarded.
    pub(crate) fn update(&mut self, leaf: NodeId) -> Result<(), CodecError> {
        if !self.arena[leaf.index()].is_leaf() {
            return Err(corrupt("update must start at a leaf"));
        }

        let mut current = leaf;
        loop {
            if self.order.get(self.arena[current.index()].rank) != Some(&current) {
                return Err(corrupt("weight order out of sync with arena"));
            }

            if let Some(partner) = self.successor(current) {
                self.swap_nodes(current, partner)?;
            }
            self.arena[current.index()].weight += 1;

            match self.arena[current.index()].parent {
                Some(parent) => {
                    self.child_slot(parent, current)?;
                    current = parent;
                }
                None => break,
            }
        }

        if self.exhaustive_checks {
            self.check_invariants()?;
        }
        Ok(())
    }

    /// The node `current` must trade places with before its increment.
    ///
    /// Scans the contiguous run of equal-weight nodes upward from
    /// `current`'s rank and walks back down from the top of that block,
    /// skipping members related to `current` (swapping with an ancestor or
    /// descendant would cut the subtree into a cycle). `None` means
    /// `current` already holds the highest admissible position.
    fn successor(&self, current: NodeId) -> Option<NodeId> {
        let rank = self.arena[current.index()].rank;
        let weight = self.arena[current.index()].weight;

        let mut top = rank;
        while top + 1 < self.order.len()
            && self.arena[self.order[top + 1].index()].weight == weight
        {
            top += 1;
        }

        let mut candidate = top;
        while candidate > rank {
            let node = self.order[candidate];
            if !self.related(node, current) {
                return Some(node);
            }
            candidate -= 1;
        }
        None
    }

    fn related(&self, a: NodeId, b: NodeId) -> bool {
        self.is_ancestor(a, b) || self.is_ancestor(b, a)
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(parent) = self.arena[node.index()].parent {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    /// Exchange the tree positions and ranks of `a` and `b`.
    ///
    /// Both child slots are resolved before either is written, so the swap
    /// is correct even when `a` and `b` are siblings of one parent.
    fn swap_nodes(&mut self, a: NodeId, b: NodeId) -> Result<(), CodecError> {
        debug_assert!(a != b);
        debug_assert!(!self.related(a, b));

        let parent_a = self.arena[a.index()]
            .parent
            .ok_or_else(|| corrupt("transposition reached the root"))?;
        let parent_b = self.arena[b.index()]
            .parent
            .ok_or_else(|| corrupt("transposition reached the root"))?;
        let slot_a = self.child_slot(parent_a, a)?;
        let slot_b = self.child_slot(parent_b, b)?;

        self.set_child(parent_a, slot_a, b);
        self.set_child(parent_b, slot_b, a);
        self.arena[a.index()].parent = Some(parent_b);
        self.arena[b.index()].parent = Some(parent_a);

        let rank_a = self.arena[a.index()].rank;
        let rank_b = self.arena[b.index()].rank;
        self.order.swap(rank_a, rank_b);
        self.arena[a.index()].rank = rank_b;
        self.arena[b.index()].rank = rank_a;
        Ok(())
    }

    /// Full structural audit: tree shape, weights, reserved leaves, the
    /// symbol index, and the weight order.
    ///
    /// Linear in tree size. Runs after every update when
    /// [`crate::CodecConfig::exhaustive_checks`] is set; also useful from
    /// tests and when debugging a suspected encoder/decoder divergence.
    pub fn check_invariants(&self) -> Result<(), CodecError> {
        let mut seen = vec![false; self.arena.len()];
        let mut stack = vec![self.root];
        let mut escape_leaves = 0usize;
        let mut ordinary_leaves = 0usize;

        while let Some(id) = stack.pop() {
            if seen[id.index()] {
                return Err(corrupt("node reachable along two paths"));
            }
            seen[id.index()] = true;

            let node = &self.arena[id.index()];
            match &node.kind {
                NodeKind::Internal { low, high } => {
                    let high = match high {
                        Some(high) => *high,
                        None => {
                            // Only the bootstrap tree may lack a sibling
                            // for the escape leaf.
                            if id != self.root || self.arena.len() != 2 {
                                return Err(corrupt("empty child slot after first growth"));
                            }
                            if self.arena[low.index()].parent != Some(id) {
                                return Err(corrupt("child does not point back at parent"));
                            }
                            stack.push(*low);
                            continue;
                        }
                    };

                    let sum = self.arena[low.index()].weight + self.arena[high.index()].weight;
                    if sum != node.weight {
                        return Err(corrupt("internal weight is not the sum of its children"));
                    }
                    for child in [*low, high] {
                        if self.arena[child.index()].parent != Some(id) {
                            return Err(corrupt("child does not point back at parent"));
                        }
                        stack.push(child);
                    }
                }
                NodeKind::Leaf(LeafKind::Escape) => {
                    escape_leaves += 1;
                    if id != self.escape {
                        return Err(corrupt("escape leaf id mismatch"));
                    }
                }
                NodeKind::Leaf(LeafKind::End) => {
                    if self.end_leaf != Some(id) {
                        return Err(corrupt("end leaf not registered"));
                    }
                }
                NodeKind::Leaf(LeafKind::Ordinary(symbol)) => {
                    ordinary_leaves += 1;
                    if self.index.get(symbol) != Some(&id) {
                        return Err(corrupt("index entry does not point at its leaf"));
                    }
                }
            }
        }

        if escape_leaves != 1 {
            return Err(corrupt("tree does not hold exactly one escape leaf"));
        }
        if seen.iter().any(|&reached| !reached) {
            return Err(corrupt("arena holds unreachable nodes"));
        }
        if ordinary_leaves != self.index.len() {
            return Err(corrupt("index holds entries without a leaf"));
        }

        if self.order.len() != self.arena.len() {
            return Err(corrupt("weight order does not cover the arena"));
        }
        for (rank, id) in self.order.iter().enumerate() {
            if self.arena[id.index()].rank != rank {
                return Err(corrupt("cached rank disagrees with the weight order"));
            }
        }
        for pair in self.order.windows(2) {
            if self.arena[pair[0].index()].weight > self.arena[pair[1].index()].weight {
                return Err(corrupt("weight order is not sorted"));
            }
        }
        if self.order[0] != self.escape {
            return Err(corrupt("escape leaf is not at rank zero"));
        }
        if self.order.last() != Some(&self.root) {
            return Err(corrupt("root is not at the top rank"));
        }

        Ok(())
    }
}
