//! Aligned character data keyed by tip identifier.
//!
//! Sequences are stored as raw bytes in insertion order. Equal length is not
//! enforced on insertion (files are read as they come); it is checked by
//! [`Alignment::column_count`] before any scoring starts.

use crate::error::{ParsimonyError, Result};
use std::collections::HashMap;
use tracing::warn;

/// Tip identifier → character for one alignment column.
pub type Column<'a> = HashMap<&'a str, u8>;

#[derive(Debug, Clone, Default)]
pub struct Alignment {
    ids: Vec<String>,
    seqs: Vec<Vec<u8>>,
    index: HashMap<String, usize>,
}

impl Alignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(id, sequence)` pairs. A repeated id replaces the earlier
    /// sequence but keeps its original position.
    pub fn from_records<I, S, Q>(records: I) -> Self
    where
        I: IntoIterator<Item = (S, Q)>,
        S: Into<String>,
        Q: Into<Vec<u8>>,
    {
        let mut alignment = Self::new();
        for (id, seq) in records {
            alignment.insert(id, seq);
        }
        alignment
    }

    pub fn insert(&mut self, id: impl Into<String>, seq: impl Into<Vec<u8>>) {
        let id = id.into();
        let seq = seq.into();
        match self.index.get(&id) {
            Some(&pos) => {
                warn!("Duplicate sequence id '{id}', keeping the last occurrence");
                self.seqs[pos] = seq;
            }
            None => {
                self.index.insert(id.clone(), self.ids.len());
                self.ids.push(id);
                self.seqs.push(seq);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&[u8]> {
        self.index.get(id).map(|&pos| self.seqs[pos].as_slice())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.ids.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.ids
            .iter()
            .zip(&self.seqs)
            .map(|(id, seq)| (id.as_str(), seq.as_slice()))
    }

    /// Number of columns shared by every sequence. Empty alignments have 0.
    ///
    /// # Errors
    /// `InconsistentAlignmentLength` naming the first sequence whose length
    /// differs from the first record's.
    pub fn column_count(&self) -> Result<usize> {
        let Some(expected) = self.seqs.first().map(Vec::len) else {
            return Ok(0);
        };
        for (id, seq) in self.iter() {
            if seq.len() != expected {
                return Err(ParsimonyError::InconsistentAlignmentLength {
                    id: id.to_string(),
                    expected,
                    found: seq.len(),
                });
            }
        }
        Ok(expected)
    }

    /// Project every sequence at `pos` into a tip → character map.
    /// Sequences shorter than `pos + 1` are skipped.
    pub fn column(&self, pos: usize) -> Column<'_> {
        self.iter()
            .filter_map(|(id, seq)| seq.get(pos).map(|&c| (id, c)))
            .collect()
    }
}
