//! Bipartition snapshots of a topology.
//!
//! # Overview
//! Each edge of a tree divides the leaves into two groups. A `SplitSnapshot`
//! holds every non-trivial split of one tree as a canonical bitset, so two
//! snapshots compare with plain set operations.
//!
//! ```text
//!      root
//!     /    \
//!   {A,B}  {C,D}  ← both root edges describe the single split AB|CD
//! ```
//!
//! # Leaf indexing
//! Leaves are indexed by their sorted labels, not by node position, so the
//! same taxon maps to the same bit in every tree.
//!
//! # Canonical side
//! A split is stored as the side that does NOT contain leaf 0. `{A,B}` and
//! `{C,D}` above both become `{C,D}`.

use crate::bitset::Bitset;
use crate::topology::{Node, Topology};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct SplitSnapshot {
    /// Sorted leaf labels; position = bit index.
    pub taxa: Vec<String>,

    /// Non-trivial splits, canonicalized.
    pub splits: HashSet<Bitset>,
}

impl SplitSnapshot {
    /// Collect the splits of `topology`.
    ///
    /// # Algorithm
    /// 1. Sort leaf labels and assign bit indices.
    /// 2. Walk the post-order; a leaf sets its own bit, an internal node ORs
    ///    the clusters of its children (the last `k` on the stack).
    /// 3. Keep clusters of non-root nodes with at least two leaves on both
    ///    sides, flipped to the side without leaf 0.
    pub fn from_topology(topology: &Topology) -> Self {
        let mut taxa: Vec<String> = topology.leaf_names().into_iter().map(String::from).collect();
        taxa.sort();

        let n = taxa.len();
        let words = n.div_ceil(64).max(1);
        let bit_of: HashMap<&str, usize> = taxa
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();

        let root = topology.root();
        let mut stack: Vec<Bitset> = Vec::new();
        let mut splits = HashSet::new();

        for &idx in topology.postorder() {
            let cluster = match topology.node(idx) {
                Some(Node::Leaf { name }) => {
                    let mut bs = Bitset::zeros(words);
                    bs.set(bit_of[name.as_str()]);
                    bs
                }
                Some(Node::Internal { children }) => {
                    let mut bs = Bitset::zeros(words);
                    for child in stack.split_off(stack.len() - children.len()) {
                        bs.or_assign(&child);
                    }
                    bs
                }
                None => continue,
            };

            let size = cluster.count_ones();
            if Some(idx) != root && size >= 2 && size + 2 <= n {
                splits.insert(canonicalize(&cluster, n));
            }
            stack.push(cluster);
        }

        SplitSnapshot { taxa, splits }
    }

    pub fn num_leaves(&self) -> usize {
        self.taxa.len()
    }
}

fn canonicalize(cluster: &Bitset, num_leaves: usize) -> Bitset {
    if cluster.contains(0) {
        cluster.complement(num_leaves)
    } else {
        cluster.clone()
    }
}
