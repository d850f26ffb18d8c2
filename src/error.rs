//! Error taxonomy shared by scoring, tree comparison and file handling.

use phylotree::tree::TreeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParsimonyError {
    /// A leaf of the tree has no entry in the character data (strict mode only).
    #[error("No character data for tip '{tip}'")]
    MissingTipData { tip: String },

    #[error("Sequence '{id}' has length {found}, expected {expected} (all sequences must be aligned)")]
    InconsistentAlignmentLength {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("Leaf node {0} has no tip label")]
    UnnamedLeaf(usize),

    #[error("Node index {0} does not belong to this topology")]
    UnknownNode(usize),

    #[error("Trees have different leaf sets: {0}")]
    LeafSetMismatch(String),

    #[error("Failed to parse Newick tree: {0}")]
    NewickParse(String),

    #[error("Failed to parse FASTA {path}: {reason}")]
    FastaParse { path: PathBuf, reason: String },

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("No FASTA files found in any subdirectory of {0}")]
    NoFastaFiles(PathBuf),
}

pub type Result<T> = std::result::Result<T, ParsimonyError>;
