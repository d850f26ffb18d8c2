//! Robinson–Foulds topology comparison.
//!
//! RF = |A| + |B| - 2|A ∩ B| over the non-trivial splits of the two trees.
//! Trees are compared as unrooted: a root of degree two adds no split of its
//! own, and branch lengths are ignored.

use crate::error::{ParsimonyError, Result};
use crate::splits::SplitSnapshot;
use crate::topology::Topology;
use itertools::Itertools;

/// Robinson–Foulds symmetric difference between two topologies.
///
/// # Example
/// ```text
/// Tree 1:  ((A,B),(C,(D,E)))     Splits: AB|CDE, DE|ABC
/// Tree 2:  ((A,C),(B,(D,E)))     Splits: AC|BDE, DE|ABC
///
/// Shared: DE|ABC
/// RF = 2 + 2 - 2*1 = 2
/// ```
///
/// # Errors
/// `LeafSetMismatch` if the trees do not carry the same labels.
pub fn robinson_foulds(tree_a: &Topology, tree_b: &Topology) -> Result<usize> {
    let snap_a = SplitSnapshot::from_topology(tree_a);
    let snap_b = SplitSnapshot::from_topology(tree_b);

    rf_from_snapshots(&snap_a, &snap_b)
}

/// RF distance from two pre-computed snapshots.
pub fn rf_from_snapshots(a: &SplitSnapshot, b: &SplitSnapshot) -> Result<usize> {
    if a.taxa != b.taxa {
        // taxa are sorted
        let only_in = |x: &SplitSnapshot, y: &SplitSnapshot| {
            x.taxa
                .iter()
                .filter(|t| y.taxa.binary_search(t).is_err())
                .join(", ")
        };
        return Err(ParsimonyError::LeafSetMismatch(format!(
            "{} vs {} leaves; only in first: [{}], only in second: [{}]",
            a.num_leaves(),
            b.num_leaves(),
            only_in(a, b),
            only_in(b, a)
        )));
    }

    let inter = a.splits.intersection(&b.splits).count();
    Ok(a.splits.len() + b.splits.len() - 2 * inter)
}
