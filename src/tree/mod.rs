//! Adaptive Huffman tree
//!
//! One tree instance owns everything the code table needs: the node arena,
//! the weight order the updater restores after every symbol, and the
//! symbol→leaf index. Keeping the index inside the tree means it can never
//! disagree with the live leaves.
//!
//! The tree starts as a root with the escape leaf as its only child and
//! grows one leaf per new symbol, always next to the escape leaf. Encoder
//! and decoder mutate their copies through the identical deterministic
//! update, which is what keeps two trees built from the same symbol
//! sequence bit-for-bit interchangeable.

mod node;
mod update;

pub use node::NodeId;

use crate::bitio::{BitSink, BitSource};
use crate::fallback::{self, Literal};
use crate::{CodeKind, CodecConfig, CodecError, Decoded};
use node::{LeafKind, Node, NodeKind, Slot};
use smallvec::SmallVec;
use std::collections::HashMap;
use tracing::trace;

fn corrupt(detail: &'static str) -> CodecError {
    CodecError::CorruptTree { detail }
}

/// Adaptive Huffman code table over symbols of type `S`.
///
/// Exactly one encode-or-decode call runs at a time against an instance;
/// independent streams need independent instances.
#[derive(Debug)]
pub struct AdaptiveTree<S: Literal> {
    /// Every node, addressed by [`NodeId`]. Dropped as one unit.
    arena: Vec<Node<S>>,
    /// All nodes in non-decreasing weight; the successor search runs here.
    /// The escape leaf is pinned at rank 0, the root sits on top.
    order: Vec<NodeId>,
    /// Symbol→leaf index for O(1) lookup during encode.
    index: HashMap<S, NodeId>,
    root: NodeId,
    escape: NodeId,
    /// Leaf of the end marker once it has been transmitted.
    end_leaf: Option<NodeId>,
    exhaustive_checks: bool,
}

impl<S: Literal> AdaptiveTree<S> {
    /// Create a tree holding only the root and the escape leaf.
    pub fn new() -> Self {
        Self::with_config(&CodecConfig::new())
    }

    /// Create a tree with explicit configuration.
    pub fn with_config(config: &CodecConfig) -> Self {
        let root = NodeId(0);
        let escape = NodeId(1);
        let mut arena = Vec::with_capacity(2 * config.capacity + 2);
        arena.push(Node {
            weight: 0,
            parent: None,
            rank: 1,
            kind: NodeKind::Internal {
                low: escape,
                high: None,
            },
        });
        arena.push(Node::leaf(LeafKind::Escape, Some(root), 0));

        Self {
            arena,
            order: vec![escape, root],
            index: HashMap::with_capacity(config.capacity),
            root,
            escape,
            end_leaf: None,
            exhaustive_checks: config.exhaustive_checks,
        }
    }

    /// Encode one symbol, or the end marker for `None`.
    ///
    /// A known symbol costs exactly its current code path. A new symbol
    /// costs the escape path plus one fallback literal, grows the tree by
    /// one leaf, and registers the symbol. Either way the updater runs
    /// once, on the leaf involved, never on the escape leaf itself; the
    /// escape leaf's weight stays zero for the life of the tree.
    pub fn encode<W: BitSink>(
        &mut self,
        symbol: Option<&S>,
        sink: &mut W,
    ) -> Result<CodeKind, CodecError> {
        let known = match symbol {
            None => self.end_leaf,
            Some(s) => self.index.get(s).copied(),
        };

        match known {
            Some(leaf) => {
                self.write_path(leaf, sink)?;
                self.update(leaf)?;
                Ok(CodeKind::Known)
            }
            None => {
                self.write_path(self.escape, sink)?;
                fallback::write_payload(symbol, sink);
                let kind = match symbol {
                    None => LeafKind::End,
                    Some(s) => LeafKind::Ordinary(s.clone()),
                };
                let leaf = self.grow(kind)?;
                self.update(leaf)?;
                Ok(CodeKind::New)
            }
        }
    }

    /// Decode one symbol by walking the tree along the channel's bits.
    ///
    /// Mirrors [`AdaptiveTree::encode`] exactly: the same sequence of
    /// symbols drives the same growth and updates on both sides. An escaped
    /// end marker reports [`Decoded::End`] without growing the tree; the
    /// stream is over and nothing after it may be read.
    pub fn decode<R: BitSource>(&mut self, source: &mut R) -> Result<Decoded<S>, CodecError> {
        let mut current = self.root;
        loop {
            match &self.arena[current.index()].kind {
                NodeKind::Internal { low, high } => {
                    let (low, high) = (*low, *high);
                    let bit = source.read_bit().ok_or(CodecError::TruncatedStream)?;
                    current = if bit {
                        high.ok_or_else(|| corrupt("code descends into an empty child slot"))?
                    } else {
                        low
                    };
                }
                NodeKind::Leaf(LeafKind::Escape) => {
                    return match fallback::read_payload::<S, R>(source)? {
                        Decoded::End => Ok(Decoded::End),
                        Decoded::Symbol(s) => {
                            let leaf = self.grow(LeafKind::Ordinary(s.clone()))?;
                            self.update(leaf)?;
                            Ok(Decoded::Symbol(s))
                        }
                    };
                }
                NodeKind::Leaf(LeafKind::End) => {
                    self.update(current)?;
                    return Ok(Decoded::End);
                }
                NodeKind::Leaf(LeafKind::Ordinary(s)) => {
                    let s = s.clone();
                    self.update(current)?;
                    return Ok(Decoded::Symbol(s));
                }
            }
        }
    }

    /// Emit the bit path from the root down to `leaf`, low = 0, high = 1.
    fn write_path<W: BitSink>(&self, leaf: NodeId, sink: &mut W) -> Result<(), CodecError> {
        let mut path: SmallVec<[bool; 64]> = SmallVec::new();
        let mut current = leaf;
        while let Some(parent) = self.arena[current.index()].parent {
            let slot = self.child_slot(parent, current)?;
            path.push(slot == Slot::High);
            current = parent;
        }
        for &bit in path.iter().rev() {
            sink.write_bit(bit);
        }
        Ok(())
    }

    /// Grow the tree by one leaf for a symbol that has none yet.
    ///
    /// The very first growth fills the root's empty high slot with the new
    /// leaf, as a sibling of the escape leaf. Every later growth puts a
    /// fresh branch node in the escape leaf's position, with the escape
    /// leaf as its low child and the new leaf as its high child; the branch
    /// takes over the escape leaf's weight, which is always zero.
    fn grow(&mut self, kind: LeafKind<S>) -> Result<NodeId, CodecError> {
        let escape = self.escape;
        let parent = self.arena[escape.index()]
            .parent
            .ok_or_else(|| corrupt("escape leaf has no parent"))?;

        let slots = self.arena[parent.index()]
            .children()
            .ok_or_else(|| corrupt("escape leaf's parent is a leaf"))?;

        let leaf = match slots {
            (_, None) => {
                let leaf = NodeId(self.arena.len());
                self.arena.push(Node::leaf(kind, Some(parent), 0));
                self.set_child(parent, Slot::High, leaf);
                self.insert_rank(1, leaf);
                leaf
            }
            (_, Some(_)) => {
                let branch = NodeId(self.arena.len());
                let leaf = NodeId(self.arena.len() + 1);
                self.arena.push(Node {
                    weight: self.arena[escape.index()].weight,
                    parent: Some(parent),
                    rank: 0,
                    kind: NodeKind::Internal {
                        low: escape,
                        high: Some(leaf),
                    },
                });
                self.arena.push(Node::leaf(kind, Some(branch), 0));

                let slot = self.child_slot(parent, escape)?;
                self.set_child(parent, slot, branch);
                self.arena[escape.index()].parent = Some(branch);

                self.insert_rank(1, leaf);
                self.insert_rank(2, branch);
                leaf
            }
        };

        match &self.arena[leaf.index()].kind {
            NodeKind::Leaf(LeafKind::Ordinary(s)) => {
                // Insertion overwrites a stale entry if one ever existed,
                // re-pointing the symbol at its live leaf.
                self.index.insert(s.clone(), leaf);
            }
            NodeKind::Leaf(LeafKind::End) => self.end_leaf = Some(leaf),
            _ => return Err(corrupt("grown node is not a symbol leaf")),
        }

        trace!(
            leaf = leaf.index(),
            nodes = self.arena.len(),
            "registered new symbol leaf"
        );
        Ok(leaf)
    }

    /// Splice `id` into the weight order at `position`, shifting ranks up.
    fn insert_rank(&mut self, position: usize, id: NodeId) {
        self.order.insert(position, id);
        for rank in position..self.order.len() {
            let node = self.order[rank];
            self.arena[node.index()].rank = rank;
        }
    }

    /// Which child slot of `parent` holds `child`.
    fn child_slot(&self, parent: NodeId, child: NodeId) -> Result<Slot, CodecError> {
        match self.arena[parent.index()].kind {
            NodeKind::Internal { low, .. } if low == child => Ok(Slot::Low),
            NodeKind::Internal { high: Some(h), .. } if h == child => Ok(Slot::High),
            _ => Err(corrupt("parent link is not mutual")),
        }
    }

    fn set_child(&mut self, parent: NodeId, slot: Slot, child: NodeId) {
        match &mut self.arena[parent.index()].kind {
            NodeKind::Internal { low, high } => match slot {
                Slot::Low => *low = child,
                Slot::High => *high = Some(child),
            },
            NodeKind::Leaf(_) => unreachable!("child slots exist only on internal nodes"),
        }
    }

    /// Total number of symbols processed so far (the root's weight).
    pub fn symbols_processed(&self) -> u64 {
        self.arena[self.root.index()].weight
    }

    /// Number of distinct symbols with a leaf, end marker included.
    pub fn distinct_symbols(&self) -> usize {
        self.index.len() + usize::from(self.end_leaf.is_some())
    }

    /// Total nodes in the tree, escape leaf and branches included.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Current code length in bits for a symbol (`None` = end marker), if
    /// it has been transmitted before.
    pub fn code_length(&self, symbol: Option<&S>) -> Option<usize> {
        let leaf = match symbol {
            None => self.end_leaf?,
            Some(s) => *self.index.get(s)?,
        };
        Some(self.depth(leaf))
    }

    /// Occurrence count and code length of every coded leaf, escape leaf
    /// excluded. Ordering follows the weight order, lightest first.
    pub fn code_profile(&self) -> Vec<(u64, usize)> {
        self.order
            .iter()
            .filter(|id| {
                matches!(
                    self.arena[id.index()].kind,
                    NodeKind::Leaf(LeafKind::Ordinary(_)) | NodeKind::Leaf(LeafKind::End)
                )
            })
            .map(|&id| (self.arena[id.index()].weight, self.depth(id)))
            .collect()
    }

    /// Aggregate statistics, including the average emitted code length.
    pub fn stats(&self) -> TreeStats {
        let total = self.symbols_processed();
        let weighted: u64 = self
            .code_profile()
            .iter()
            .map(|&(weight, depth)| weight * depth as u64)
            .sum();
        TreeStats {
            symbols_processed: total,
            distinct_symbols: self.distinct_symbols(),
            nodes: self.node_count(),
            average_code_len: if total == 0 {
                0.0
            } else {
                weighted as f64 / total as f64
            },
        }
    }

    fn depth(&self, mut node: NodeId) -> usize {
        let mut depth = 0;
        while let Some(parent) = self.arena[node.index()].parent {
            depth += 1;
            node = parent;
        }
        depth
    }
}

/// Aggregate view of a tree's current state
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TreeStats {
    /// Symbols processed so far (root weight)
    pub symbols_processed: u64,
    /// Distinct symbols holding a leaf, end marker included
    pub distinct_symbols: usize,
    /// Total node count
    pub nodes: usize,
    /// Mean code length weighted by occurrence, in bits
    pub average_code_len: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitio::BitBuffer;

    #[test]
    fn test_fresh_tree_shape() {
        let tree: AdaptiveTree<u64> = AdaptiveTree::new();
        assert_eq!(tree.node_count(), 2);
        assert_eq!(tree.symbols_processed(), 0);
        assert_eq!(tree.distinct_symbols(), 0);
        assert_eq!(tree.code_length(Some(&1)), None);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_first_symbol_costs_escape_plus_literal() {
        let mut sink = BitBuffer::new();
        let mut tree: AdaptiveTree<u64> = AdaptiveTree::new();

        let kind = tree.encode(Some(&42), &mut sink).unwrap();
        assert_eq!(kind, CodeKind::New);
        // Escape path "0" + end tag + one 8-bit varint group
        assert_eq!(sink.len(), 1 + 1 + 8);
        assert_eq!(tree.symbols_processed(), 1);
        assert_eq!(tree.code_length(Some(&42)), Some(1));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_repeat_symbol_is_known_and_literal_free() {
        let mut sink = BitBuffer::new();
        let mut tree: AdaptiveTree<u64> = AdaptiveTree::new();
        tree.encode(Some(&42), &mut sink).unwrap();

        let before = sink.len();
        let kind = tree.encode(Some(&42), &mut sink).unwrap();
        assert_eq!(kind, CodeKind::Known);
        assert_eq!(sink.len() - before, tree.code_length(Some(&42)).unwrap());
        assert_eq!(tree.symbols_processed(), 2);
    }

    #[test]
    fn test_escape_leaf_weight_stays_zero() {
        let mut sink = BitBuffer::new();
        let mut tree: AdaptiveTree<u64> = AdaptiveTree::new();
        for value in [3u64, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5] {
            tree.encode(Some(&value), &mut sink).unwrap();
        }
        assert_eq!(tree.arena[tree.escape.index()].weight, 0);
        assert_eq!(tree.arena[tree.escape.index()].rank, 0);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn test_end_marker_registers_like_a_symbol() {
        let mut sink = BitBuffer::new();
        let mut tree: AdaptiveTree<u64> = AdaptiveTree::new();
        assert_eq!(tree.encode(None, &mut sink).unwrap(), CodeKind::New);
        assert_eq!(tree.encode(None, &mut sink).unwrap(), CodeKind::Known);
        assert_eq!(tree.distinct_symbols(), 1);
        assert_eq!(tree.symbols_processed(), 2);
    }

    #[test]
    fn test_decoded_end_does_not_grow_tree() {
        let mut sink = BitBuffer::new();
        let mut encoder: AdaptiveTree<u64> = AdaptiveTree::new();
        encoder.encode(None, &mut sink).unwrap();

        let mut decoder: AdaptiveTree<u64> = AdaptiveTree::new();
        let mut source = sink.reader();
        assert_eq!(decoder.decode(&mut source), Ok(Decoded::End));
        assert_eq!(decoder.node_count(), 2);
        decoder.check_invariants().unwrap();
    }

    #[test]
    fn test_truncated_stream_mid_walk() {
        let sink = BitBuffer::new();
        let mut tree: AdaptiveTree<u64> = AdaptiveTree::new();
        let mut source = sink.reader();
        assert_eq!(tree.decode(&mut source), Err(CodecError::TruncatedStream));
    }

    #[test]
    fn test_walk_into_empty_slot_is_corrupt() {
        let mut sink = BitBuffer::new();
        sink.write_bit(true); // fresh root has no high child yet
        let mut tree: AdaptiveTree<u64> = AdaptiveTree::new();
        let mut source = sink.reader();
        assert!(matches!(
            tree.decode(&mut source),
            Err(CodecError::CorruptTree { .. })
        ));
    }

    #[test]
    fn test_average_code_len_tracks_skew() {
        let mut sink = BitBuffer::new();
        let mut tree: AdaptiveTree<u64> = AdaptiveTree::new();
        for _ in 0..20 {
            tree.encode(Some(&1), &mut sink).unwrap();
        }
        tree.encode(Some(&2), &mut sink).unwrap();

        let stats = tree.stats();
        assert_eq!(stats.symbols_processed, 21);
        assert_eq!(stats.distinct_symbols, 2);
        // The dominant symbol must sit at depth 1
        assert_eq!(tree.code_length(Some(&1)), Some(1));
        assert!(stats.average_code_len < 2.0);
    }
}
