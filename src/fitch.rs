//! Fitch small-parsimony scoring on a fixed topology.
//!
//! # Overview
//! For one alignment column, the minimum number of state changes on the tree
//! is found in a single bottom-up pass. Every node yields a candidate state
//! set and the number of changes already forced inside its subtree:
//!
//! - **Leaf**: `{c}` for an observed character `c`; the whole observed set of
//!   the column for a missing symbol (`-`, `?`, `N`). Cost 0.
//! - **Internal**: sum of the children's costs. If the children's sets share a
//!   state, the node's set is that intersection. Otherwise it is their union
//!   and one change is added, however many children disagree.
//!
//! The same rule is applied to polytomies. For more than two children it can
//! undercount relative to Hartigan's exact algorithm; it is kept as is.
//!
//! # Example
//! ```text
//!            root {T}∩{G} = ∅ → {T,G}, +1      total = 1
//!           /          \
//!     {T}∩{T}={T}    {G}∩{G}={G}
//!       /   \          /   \
//!      A=T  B=T      C=G   D=G
//! ```
//!
//! Columns never depend on each other, so the aggregator scores them in
//! parallel with `rayon` and only sums at the end.

use crate::alignment::{Alignment, Column};
use crate::bitset::Bitset;
use crate::error::{ParsimonyError, Result};
use crate::topology::{Node, Topology};
use rayon::prelude::*;
use tracing::{debug, instrument};

/// Characters meaning "no information" at a tip.
pub const MISSING_SYMBOLS: [u8; 3] = [b'-', b'?', b'N'];

/// Stand-in for a tip that has no entry in the column.
const WILDCARD: u8 = b'?';

/// One bit per byte value.
const STATE_WORDS: usize = 4;

/// Candidate states of a node, one bit per byte value.
pub type StateSet = Bitset;

#[inline]
pub fn is_missing(c: u8) -> bool {
    MISSING_SYMBOLS.contains(&c)
}

/// What to do with a leaf whose label has no entry in the column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingTipPolicy {
    /// Treat it as `?`.
    #[default]
    Wildcard,
    /// Fail with `MissingTipData`.
    Strict,
}

/// Working state of one node during a column pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtree {
    pub states: StateSet,
    /// Changes forced strictly inside the subtree.
    pub score: usize,
}

/// Distinct non-missing characters in a column.
pub fn observed_states(column: &Column<'_>) -> StateSet {
    let mut observed = StateSet::zeros(STATE_WORDS);
    for &c in column.values().filter(|&&c| !is_missing(c)) {
        observed.set(c as usize);
    }
    observed
}

fn singleton(c: u8) -> StateSet {
    let mut set = StateSet::zeros(STATE_WORDS);
    set.set(c as usize);
    set
}

/// Minimum number of changes on `topology` explaining one column.
///
/// Returns 0 without traversing when the column has no observed character.
///
/// # Errors
/// `MissingTipData` under [`MissingTipPolicy::Strict`] when a leaf is absent
/// from `column`.
pub fn score_column(
    topology: &Topology,
    column: &Column<'_>,
    policy: MissingTipPolicy,
) -> Result<usize> {
    let observed = observed_states(column);
    if observed.is_empty() {
        return Ok(0);
    }

    // Post-order guarantees a node's children are the last `k` entries.
    let mut stack: Vec<Subtree> = Vec::new();

    for &idx in topology.postorder() {
        let node = topology.node(idx).ok_or(ParsimonyError::UnknownNode(idx))?;
        let subtree = match node {
            Node::Leaf { name } => {
                let c = match (column.get(name.as_str()), policy) {
                    (Some(&c), _) => c,
                    (None, MissingTipPolicy::Wildcard) => WILDCARD,
                    (None, MissingTipPolicy::Strict) => {
                        return Err(ParsimonyError::MissingTipData { tip: name.clone() });
                    }
                };
                let states = if is_missing(c) {
                    observed.clone()
                } else {
                    singleton(c)
                };
                Subtree { states, score: 0 }
            }
            Node::Internal { children } => {
                let kids = stack.split_off(stack.len() - children.len());
                combine(&kids)
            }
        };
        stack.push(subtree);
    }

    Ok(stack.pop().map_or(0, |root| root.score))
}

/// Internal-node rule over the children's results.
fn combine(children: &[Subtree]) -> Subtree {
    let Some((first, rest)) = children.split_first() else {
        return Subtree {
            states: StateSet::zeros(STATE_WORDS),
            score: 0,
        };
    };

    let mut score: usize = children.iter().map(|c| c.score).sum();
    let mut states = first.states.clone();
    for child in rest {
        states.and_assign(&child.states);
    }

    if states.is_empty() {
        for child in children {
            states.or_assign(&child.states);
        }
        score += 1;
    }

    Subtree { states, score }
}

/// Per-column and total score of an alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentScore {
    pub total: usize,
    pub per_column: Vec<usize>,
}

/// Score every column, in column order.
///
/// # Errors
/// - `InconsistentAlignmentLength` before any column is scored.
/// - `MissingTipData` before any column is scored, under `Strict`, if a leaf
///   has no sequence.
#[instrument(skip_all, fields(tips = alignment.len(), nodes = topology.len()))]
pub fn column_scores(
    topology: &Topology,
    alignment: &Alignment,
    policy: MissingTipPolicy,
) -> Result<Vec<usize>> {
    let columns = alignment.column_count()?;

    if policy == MissingTipPolicy::Strict {
        if let Some((_, tip)) = topology.leaves().find(|(_, name)| !alignment.contains(name)) {
            return Err(ParsimonyError::MissingTipData { tip: tip.to_string() });
        }
    }

    debug!("Scoring {columns} columns");
    (0..columns)
        .into_par_iter()
        .map(|pos| score_column(topology, &alignment.column(pos), policy))
        .collect()
}

/// Sum of the per-column scores.
pub fn total_score(
    topology: &Topology,
    alignment: &Alignment,
    policy: MissingTipPolicy,
) -> Result<usize> {
    Ok(column_scores(topology, alignment, policy)?.into_iter().sum())
}

pub fn score_alignment(
    topology: &Topology,
    alignment: &Alignment,
    policy: MissingTipPolicy,
) -> Result<AlignmentScore> {
    let per_column = column_scores(topology, alignment, policy)?;
    Ok(AlignmentScore {
        total: per_column.iter().sum(),
        per_column,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    fn column<'a>(pairs: &[(&'a str, u8)]) -> Column<'a> {
        pairs.iter().copied().collect()
    }

    fn score(newick: &str, pairs: &[(&str, u8)]) -> usize {
        let topo = Topology::from_newick(newick).unwrap();
        score_column(&topo, &column(pairs), MissingTipPolicy::Wildcard).unwrap()
    }

    #[test]
    fn test_two_clades_one_change() {
        let s = score(
            "((A,B),(C,D));",
            &[("A", b'T'), ("B", b'T'), ("C", b'G'), ("D", b'G')],
        );
        assert_eq!(s, 1);
    }

    /// ```text
    ///              root: {T,G} ∩ {T,G} = {T,G}, +0
    ///            /                  \
    ///   {T}∩{G}=∅ → {T,G}, +1   {T}∩{G}=∅ → {T,G}, +1
    ///      /    \                  /    \
    ///    A=T    B=G              C=T    D=G
    /// ```
    #[test]
    fn test_alternating_pairs_two_changes() {
        let s = score(
            "((A,B),(C,D));",
            &[("A", b'T'), ("B", b'G'), ("C", b'T'), ("D", b'G')],
        );
        assert_eq!(s, 2);
    }

    #[test]
    fn test_star_tree_single_penalty() {
        let s = score(
            "(a,b,c,d,e);",
            &[("a", b'A'), ("b", b'A'), ("c", b'A'), ("d", b'C'), ("e", b'C')],
        );
        assert_eq!(s, 1);
    }

    #[test]
    fn test_uniform_column_scores_zero() {
        for newick in ["((A,B),(C,D));", "(A,B,C,D);", "(((A,B),C),D);", "(A,(B,(C,D)));"] {
            let s = score(newick, &[("A", b'G'), ("B", b'G'), ("C", b'G'), ("D", b'G')]);
            assert_eq!(s, 0, "{newick}");
        }
    }

    #[test]
    fn test_all_missing_column_scores_zero() {
        let s = score(
            "((A,B),(C,D));",
            &[("A", b'-'), ("B", b'?'), ("C", b'N'), ("D", b'-')],
        );
        assert_eq!(s, 0);
    }

    #[test]
    fn test_disjoint_root_children_cost_at_least_one() {
        for newick in ["(A,B);", "((A,C),B);", "((A,A2),(B,B2));", "(A,(B,C,D));"] {
            let s = score(
                newick,
                &[("A", b'A'), ("A2", b'A'), ("B", b'T'), ("B2", b'T'), ("C", b'A'), ("D", b'T')],
            );
            assert!(s >= 1, "{newick} scored {s}");
        }
    }

    #[test]
    fn test_missing_symbol_is_wildcard() {
        // B = '-' takes {T, G}; {T} ∩ {T,G} = {T} so the cherry is free.
        let s = score("((A,B),C);", &[("A", b'T'), ("B", b'-'), ("C", b'G')]);
        assert_eq!(s, 1);
    }

    #[test]
    fn test_lowercase_n_is_a_state() {
        let s = score("(A,B);", &[("A", b'n'), ("B", b'A')]);
        assert_eq!(s, 1);
    }

    #[test]
    fn test_absent_tip_behaves_like_question_mark() {
        let topo = Topology::from_newick("((A,B),C);").unwrap();
        let absent = column(&[("A", b'T'), ("C", b'G')]);
        let explicit = column(&[("A", b'T'), ("B", b'?'), ("C", b'G')]);

        let a = score_column(&topo, &absent, MissingTipPolicy::Wildcard).unwrap();
        let b = score_column(&topo, &explicit, MissingTipPolicy::Wildcard).unwrap();
        assert_eq!(a, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_strict_policy_rejects_absent_tip() {
        let topo = Topology::from_newick("((A,B),C);").unwrap();
        let col = column(&[("A", b'T'), ("C", b'G')]);

        match score_column(&topo, &col, MissingTipPolicy::Strict) {
            Err(ParsimonyError::MissingTipData { tip }) => assert_eq!(tip, "B"),
            other => panic!("expected MissingTipData, got {other:?}"),
        }
    }

    #[test]
    fn test_strict_policy_short_circuits_uninformative_column() {
        let topo = Topology::from_newick("((A,B),C);").unwrap();
        let col = column(&[("A", b'-')]);
        assert_eq!(score_column(&topo, &col, MissingTipPolicy::Strict).unwrap(), 0);
    }

    /// Observed states come from the whole column, including tips the tree
    /// does not contain.
    #[test]
    fn test_observed_set_includes_tips_outside_tree() {
        let topo = Topology::from_newick("(A,(B,C));").unwrap();
        let col = column(&[("A", b'?'), ("B", b'-'), ("C", b'N'), ("Z", b'C')]);

        assert_eq!(observed_states(&col).iter_ones().collect::<Vec<_>>(), vec![b'C' as usize]);
        assert_eq!(score_column(&topo, &col, MissingTipPolicy::Wildcard).unwrap(), 0);
    }

    #[test]
    fn test_child_order_does_not_matter() {
        let chars = [
            ("A", b'A'), ("B", b'C'), ("C", b'A'), ("D", b'G'),
            ("E", b'G'), ("F", b'-'), ("G", b'C'),
        ];
        let clades = ["(A,B,C)", "D", "(E,F)", "G"];
        let reference = score("((A,B,C),D,(E,F),G);", &chars);

        for perm in clades.iter().permutations(clades.len()) {
            let newick = format!("({});", perm.iter().join(","));
            assert_eq!(score(&newick, &chars), reference, "{newick}");
        }
    }

    #[test]
    fn test_single_child_chain_is_free() {
        let mut b = Topology::builder();
        let a = b.add_leaf("A");
        let up = b.add_internal(vec![a]).unwrap();
        let c = b.add_leaf("C");
        let root = b.add_internal(vec![up, c]).unwrap();
        let topo = b.build(root).unwrap();

        let col = column(&[("A", b'T'), ("C", b'T')]);
        assert_eq!(score_column(&topo, &col, MissingTipPolicy::Wildcard).unwrap(), 0);
    }

    #[test]
    fn test_childless_internal_yields_empty_set() {
        let mut b = Topology::builder();
        let a = b.add_leaf("A");
        let hollow = b.add_internal(vec![]).unwrap();
        let root = b.add_internal(vec![a, hollow]).unwrap();
        let topo = b.build(root).unwrap();

        assert_eq!(
            combine(&[]),
            Subtree { states: StateSet::zeros(STATE_WORDS), score: 0 }
        );
        // {T} ∩ ∅ is empty, so the root pays one change.
        let col = column(&[("A", b'T')]);
        assert_eq!(score_column(&topo, &col, MissingTipPolicy::Wildcard).unwrap(), 1);
    }

    #[test]
    fn test_empty_topology_scores_zero() {
        let col = column(&[("A", b'T'), ("B", b'G')]);
        assert_eq!(
            score_column(&Topology::empty(), &col, MissingTipPolicy::Wildcard).unwrap(),
            0
        );
    }

    #[test]
    fn test_deep_caterpillar() {
        let mut b = Topology::builder();
        let mut spine = b.add_leaf("t0");
        let mut names = vec!["t0".to_string()];
        for i in 1..200_000 {
            names.push(format!("t{i}"));
            let leaf = b.add_leaf(names[i].clone());
            spine = b.add_internal(vec![spine, leaf]).unwrap();
        }
        let topo = b.build(spine).unwrap();

        let col: Column<'_> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), if i % 2 == 0 { b'A' } else { b'C' }))
            .collect();

        // Every odd leaf meets a singleton it disagrees with.
        assert_eq!(
            score_column(&topo, &col, MissingTipPolicy::Wildcard).unwrap(),
            100_000
        );
    }

    #[test]
    fn test_two_columns_sum() {
        let topo = Topology::from_newick("((A,B),(C,D));").unwrap();
        let aln = Alignment::from_records([("A", "TT"), ("B", "TG"), ("C", "GT"), ("D", "GG")]);

        let report = score_alignment(&topo, &aln, MissingTipPolicy::Wildcard).unwrap();
        assert_eq!(report.per_column, vec![1, 2]);
        assert_eq!(report.total, 3);
        assert_eq!(total_score(&topo, &aln, MissingTipPolicy::Wildcard).unwrap(), 3);
    }

    #[test]
    fn test_total_matches_independent_columns_in_any_order() {
        let topo = Topology::from_newick("((A,(B,C)),(D,E,F));").unwrap();
        let rows = [
            ("A", "ACGTN-AC"),
            ("B", "ACGTTTGA"),
            ("C", "CCGA?TGC"),
            ("D", "GTGTTAAA"),
            ("E", "GTCTTA-C"),
            ("F", "TACTNAAG"),
        ];
        let aln = Alignment::from_records(rows);
        let total = total_score(&topo, &aln, MissingTipPolicy::Wildcard).unwrap();

        let independent: usize = (0..8)
            .map(|pos| score_column(&topo, &aln.column(pos), MissingTipPolicy::Wildcard).unwrap())
            .sum();
        assert_eq!(total, independent);

        let reversed = Alignment::from_records(
            rows.iter()
                .map(|(id, seq)| (*id, seq.bytes().rev().collect::<Vec<u8>>())),
        );
        assert_eq!(
            total_score(&topo, &reversed, MissingTipPolicy::Wildcard).unwrap(),
            total
        );
    }

    #[test]
    fn test_inconsistent_alignment_fails_before_scoring() {
        let topo = Topology::from_newick("(A,B);").unwrap();
        let aln = Alignment::from_records([("A", "AC"), ("B", "A")]);

        assert!(matches!(
            total_score(&topo, &aln, MissingTipPolicy::Wildcard),
            Err(ParsimonyError::InconsistentAlignmentLength { .. })
        ));
    }

    #[test]
    fn test_strict_aggregator_checks_every_leaf() {
        let topo = Topology::from_newick("((A,B),C);").unwrap();
        let aln = Alignment::from_records([("A", "--"), ("C", "--")]);

        assert_eq!(total_score(&topo, &aln, MissingTipPolicy::Wildcard).unwrap(), 0);
        assert!(matches!(
            total_score(&topo, &aln, MissingTipPolicy::Strict),
            Err(ParsimonyError::MissingTipData { tip }) if tip == "B"
        ));
    }

    #[test]
    fn test_degenerate_inputs_score_zero() {
        let topo = Topology::from_newick("((A,B),C);").unwrap();
        assert_eq!(
            total_score(&topo, &Alignment::new(), MissingTipPolicy::Wildcard).unwrap(),
            0
        );

        let aln = Alignment::from_records([("A", "ACGT"), ("B", "TTTT")]);
        assert_eq!(
            total_score(&Topology::empty(), &aln, MissingTipPolicy::Wildcard).unwrap(),
            0
        );
    }
}
