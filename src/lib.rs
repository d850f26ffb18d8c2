//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `fitch`: Fitch small-parsimony column scorer and alignment aggregator.
//! - `topology`: immutable rooted tree (arena of leaf/internal nodes) built from Newick.
//! - `alignment`: tip identifier → sequence mapping and column projection.
//! - `bitset`: compact bitset for candidate state sets and leaf clusters.
//! - `splits` / `distances`: bipartition snapshots and Robinson–Foulds distance.
//! - `io`: Newick/FASTA reading, tip-label reconciliation, FASTA merging, TSV output.
//! - `error`: error type shared by all of the above.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod alignment;
pub mod bitset;
pub mod distances;
pub mod error;
pub mod fitch;
pub mod io;
pub mod splits;
pub mod topology;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use alignment::Alignment;
pub use bitset::Bitset;
pub use distances::robinson_foulds;
pub use error::{ParsimonyError, Result};
pub use fitch::{column_scores, score_alignment, score_column, total_score, MissingTipPolicy};
pub use io::{read_fasta, read_newick, reconcile_tip_labels};
pub use topology::Topology;
