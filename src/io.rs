use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bio::io::fasta;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, warn};

use crate::alignment::Alignment;
use crate::error::{ParsimonyError, Result};
use crate::topology::Topology;

/// Extensions picked up by [`merge_fasta_dirs`], compared case-insensitively.
pub const FASTA_EXTENSIONS: [&str; 5] = ["fa", "fasta", "fna", "ffn", "faa"];

fn is_gz(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".gz")
}

/// Open a file for reading, decompressing on the fly when it ends with `.gz`.
fn open_reader(path: &Path) -> io::Result<Box<dyn Read>> {
    let f = File::open(path)?;
    if is_gz(path) {
        Ok(Box::new(MultiGzDecoder::new(f)))
    } else {
        Ok(Box::new(f))
    }
}

/// Create a buffered writer. `-` is stdout; a `.gz` suffix gzip-compresses.
fn create_writer(path: &Path) -> io::Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }

    let f = File::create(path)?;
    if is_gz(path) {
        Ok(Box::new(BufWriter::new(GzEncoder::new(f, Compression::default()))))
    } else {
        Ok(Box::new(BufWriter::new(f)))
    }
}

/// Byte offset of the `;` closing the first tree, skipping any `;` inside a
/// single-quoted label or a `[...]` comment. A doubled quote (`''`) inside a
/// label toggles twice and so stays quoted.
fn first_tree_end(content: &str) -> Option<usize> {
    let mut quoted = false;
    let mut comment_depth = 0usize;
    for (pos, c) in content.char_indices() {
        match c {
            '\'' if comment_depth == 0 => quoted = !quoted,
            '[' if !quoted => comment_depth += 1,
            ']' if !quoted => comment_depth = comment_depth.saturating_sub(1),
            ';' if !quoted && comment_depth == 0 => return Some(pos),
            _ => {}
        }
    }
    None
}

/// Read the first tree of a Newick file.
///
/// Anything after the terminating `;` (further trees, trailing comments) is
/// ignored.
pub fn read_newick<P: AsRef<Path>>(path: P) -> Result<Topology> {
    let mut content = String::new();
    open_reader(path.as_ref())?.read_to_string(&mut content)?;

    let first = match first_tree_end(&content) {
        Some(end) => &content[..=end],
        None => content.as_str(),
    };
    let topology = Topology::from_newick(first.trim())?;
    debug!(
        "Read tree with {} leaves from {:?}",
        topology.leaves().count(),
        path.as_ref()
    );
    Ok(topology)
}

/// Read a FASTA file into an [`Alignment`].
///
/// The record id is the first whitespace-delimited word of the header.
/// Sequences are kept byte for byte; case is not changed.
pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<Alignment> {
    let path = path.as_ref();
    let reader = fasta::Reader::new(open_reader(path)?);

    let mut alignment = Alignment::new();
    for record in reader.records() {
        let record = record.map_err(|e| ParsimonyError::FastaParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        alignment.insert(record.id(), record.seq().to_vec());
    }

    debug!("Read {} sequences from {:?}", alignment.len(), path);
    Ok(alignment)
}

/// Key used to match tree labels against sequence ids: surrounding quotes
/// removed, then every whitespace character and `_` dropped.
///
/// `phylotree` strips the spaces inside quoted labels, so `'Homo sapiens'`
/// reaches us as `'Homosapiens'`; separators are therefore ignored on both
/// sides rather than translated.
///
/// # Example
/// ```
/// # use rust_python_parsimony::io::normalize_label;
/// assert_eq!(normalize_label(" 'Homo sapiens' "), "Homosapiens");
/// assert_eq!(normalize_label("'Homosapiens'"), normalize_label("Homo_sapiens"));
/// ```
pub fn normalize_label(label: &str) -> String {
    label
        .trim()
        .trim_matches(|c: char| c == '\'' || c == '"')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect()
}

/// Rename tree leaves to the sequence ids they refer to.
///
/// A leaf whose label is already an alignment id is left alone. Otherwise it
/// is renamed when exactly one alignment id has the same normalized label.
/// Leaves that still have no sequence afterwards are logged; they are scored
/// as missing data.
///
/// Returns the number of renamed leaves.
pub fn reconcile_tip_labels(topology: &mut Topology, alignment: &Alignment) -> usize {
    // None marks a normalized label shared by several ids.
    let mut by_normalized: HashMap<String, Option<&str>> = HashMap::new();
    for id in alignment.ids() {
        by_normalized
            .entry(normalize_label(id))
            .and_modify(|slot| *slot = None)
            .or_insert(Some(id));
    }

    let renamed = topology.relabel_leaves(|name| {
        if alignment.contains(name) {
            return None;
        }
        let target = by_normalized.get(&normalize_label(name)).copied().flatten()?;
        debug!("Renaming tip '{name}' to '{target}'");
        Some(target.to_string())
    });

    let unmatched: Vec<&str> = topology
        .leaf_names()
        .into_iter()
        .filter(|name| !alignment.contains(name))
        .collect();
    if !unmatched.is_empty() {
        warn!(
            "{} tip(s) have no sequence and count as missing data: {}",
            unmatched.len(),
            unmatched.join(", ")
        );
    }

    renamed
}

fn has_fasta_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FASTA_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.retain(|p| keep(p));
    entries.sort();
    Ok(entries)
}

/// Concatenate the FASTA files found in each immediate subdirectory of `root`
/// into `output`.
///
/// Subdirectories and files are visited in name order. Files directly under
/// `root` are ignored. A missing trailing newline is added between files so
/// records never run together.
///
/// Returns the number of merged files.
///
/// # Errors
/// `NotADirectory` if `root` is not a directory, `NoFastaFiles` if nothing was
/// found.
pub fn merge_fasta_dirs<P: AsRef<Path>, Q: AsRef<Path>>(root: P, output: Q) -> Result<usize> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(ParsimonyError::NotADirectory(root.to_path_buf()));
    }

    let mut fasta_files = Vec::new();
    for dir in sorted_entries(root, Path::is_dir)? {
        let candidates = sorted_entries(&dir, |p| p.is_file() && has_fasta_extension(p))?;
        if candidates.len() > 1 {
            warn!("{:?} has multiple FASTA files; taking all of them", dir);
        }
        fasta_files.extend(candidates);
    }

    if fasta_files.is_empty() {
        return Err(ParsimonyError::NoFastaFiles(root.to_path_buf()));
    }

    let mut out = create_writer(output.as_ref())?;
    for fasta in &fasta_files {
        let content = fs::read(fasta)?;
        out.write_all(&content)?;
        if !content.is_empty() && !content.ends_with(b"\n") {
            writeln!(&mut out)?;
        }
    }
    out.flush()?;

    Ok(fasta_files.len())
}

/// Write per-column scores as a two-column TSV (`column`, `score`), with
/// 1-based column positions.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// If `path` equals `-`, the table is written to stdout.
pub fn write_column_scores_tsv<P: AsRef<Path>>(path: P, scores: &[usize]) -> io::Result<()> {
    let mut out = create_writer(path.as_ref())?;

    writeln!(&mut out, "column\tscore")?;
    for (pos, score) in scores.iter().enumerate() {
        writeln!(&mut out, "{}\t{}", pos + 1, score)?;
    }

    out.flush()?;
    Ok(())
}
