//! Python binding layer for parsimony scoring and tree comparison.
//!
//! Provides Python functions that read a Newick tree and a FASTA alignment
//! from disk and return Fitch parsimony scores, plus the Robinson-Foulds
//! distance between two Newick trees.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::alignment::Alignment;
use crate::distances::robinson_foulds;
use crate::error::ParsimonyError;
use crate::fitch::{column_scores, MissingTipPolicy};
use crate::io::{read_fasta, read_newick, reconcile_tip_labels};
use crate::topology::Topology;

fn to_py_err(e: ParsimonyError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Helper function to read and reconcile a tree/alignment pair
fn load_inputs(newick: &str, fasta: &str) -> PyResult<(Topology, Alignment)> {
    let mut topology = read_newick(newick).map_err(to_py_err)?;
    let alignment = read_fasta(fasta).map_err(to_py_err)?;
    reconcile_tip_labels(&mut topology, &alignment);
    Ok((topology, alignment))
}

fn policy(strict: bool) -> MissingTipPolicy {
    if strict { MissingTipPolicy::Strict } else { MissingTipPolicy::Wildcard }
}

/// Total Fitch parsimony score of a tree over an alignment.
///
/// Args:
///     newick: Path to the Newick tree file (optionally gzip-compressed)
///     fasta: Path to the aligned FASTA file (optionally gzip-compressed)
///     strict: Raise when a tip has no sequence instead of treating it as missing (default: False)
///
/// Returns:
///     The minimum number of state changes summed over all columns
///
/// Raises:
///     ValueError: If a file cannot be read or parsed, sequences differ in length,
///     or (strict mode) a tip has no sequence
#[pyfunction]
#[pyo3(signature = (newick, fasta, strict=false))]
fn fitch_score(newick: String, fasta: String, strict: bool) -> PyResult<usize> {
    let (topology, alignment) = load_inputs(&newick, &fasta)?;
    let scores = column_scores(&topology, &alignment, policy(strict)).map_err(to_py_err)?;
    Ok(scores.into_iter().sum())
}

/// Per-column Fitch parsimony scores, in alignment order.
///
/// Args:
///     newick: Path to the Newick tree file
///     fasta: Path to the aligned FASTA file
///     strict: Raise when a tip has no sequence (default: False)
///
/// Returns:
///     A list with one score per alignment column
#[pyfunction]
#[pyo3(signature = (newick, fasta, strict=false))]
fn fitch_column_scores(newick: String, fasta: String, strict: bool) -> PyResult<Vec<usize>> {
    let (topology, alignment) = load_inputs(&newick, &fasta)?;
    column_scores(&topology, &alignment, policy(strict)).map_err(to_py_err)
}

/// Robinson-Foulds distance (topology only) between two Newick trees.
///
/// Raises:
///     ValueError: If a tree cannot be read or the trees have different taxa
#[pyfunction]
fn rf_distance(t1: String, t2: String) -> PyResult<usize> {
    let tree_a = read_newick(&t1).map_err(to_py_err)?;
    let tree_b = read_newick(&t2).map_err(to_py_err)?;
    robinson_foulds(&tree_a, &tree_b).map_err(to_py_err)
}

/// Python module definition
#[pymodule]
fn rust_python_parsimony(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(fitch_score, m)?)?;
    m.add_function(wrap_pyfunction!(fitch_column_scores, m)?)?;
    m.add_function(wrap_pyfunction!(rf_distance, m)?)?;
    Ok(())
}
