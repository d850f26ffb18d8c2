use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_python_parsimony::distances::robinson_foulds;
use rust_python_parsimony::fitch::{score_alignment, MissingTipPolicy};
use rust_python_parsimony::io::{
    merge_fasta_dirs, read_fasta, read_newick, reconcile_tip_labels, write_column_scores_tsv,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Minimum-mutation (Fitch) parsimony score of a fixed tree over an alignment,
/// plus the small tree/FASTA utilities that go with it.
#[derive(Parser, Debug)]
#[command(name = "parsimony", version, about = "Fitch parsimony scoring for fixed phylogenies")]
struct Cli {
    /// Quiet mode: only warnings and errors on stderr
    #[arg(short = 'q', long = "quiet", global = true, default_value_t = false)]
    quiet: bool,

    /// Increase log detail (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Total parsimony score of a tree for a FASTA alignment
    Score(ScoreArgs),

    /// Robinson–Foulds distance (topology only) between two Newick trees
    Rf {
        /// Path to first input tree (in Newick format)
        #[arg(long = "t1")]
        t1: PathBuf,

        /// Path to second input tree (in Newick format)
        #[arg(long = "t2")]
        t2: PathBuf,
    },

    /// Merge the FASTA files of every subdirectory into a single FASTA
    Merge {
        /// Root directory containing subdirectories with FASTA files
        root: PathBuf,

        /// Output FASTA file name
        #[arg(short = 'o', long = "output", default_value = "sequences.fasta")]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Path to the input tree (in Newick format, optionally .gz)
    #[arg(long = "newick-tree")]
    newick_tree: PathBuf,

    /// Path to the input alignment (FASTA, optionally .gz)
    #[arg(long = "fasta-file")]
    fasta_file: PathBuf,

    /// Parsimony method
    #[arg(long = "method", value_enum, default_value_t = MethodArg::Fitch)]
    method: MethodArg,

    /// Fail when a tree tip has no sequence instead of treating it as missing data
    #[arg(long = "strict", default_value_t = false)]
    strict: bool,

    /// Do not normalize tree tip labels to match sequence ids
    #[arg(long = "no-reconcile", default_value_t = false)]
    no_reconcile: bool,

    /// Write per-column scores as TSV (`-` for stdout, `.gz` to compress)
    #[arg(long = "per-column")]
    per_column: Option<PathBuf>,

    /// Worker threads for column scoring (default: all cores)
    #[arg(long = "threads")]
    threads: Option<usize>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MethodArg { Fitch }

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.quiet, cli.verbose);

    match cli.command {
        Command::Score(args) => run_score(args),
        Command::Rf { t1, t2 } => run_rf(&t1, &t2),
        Command::Merge { root, output } => run_merge(&root, &output),
    }
}

fn run_score(args: ScoreArgs) {
    if let Some(n) = args.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
            warn!("Could not size thread pool to {n}: {e}");
        }
    }

    let t0 = Instant::now();
    let mut topology = match read_newick(&args.newick_tree) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to read tree {:?}: {e}", args.newick_tree);
            std::process::exit(2);
        }
    };
    let alignment = match read_fasta(&args.fasta_file) {
        Ok(a) => a,
        Err(e) => {
            error!("Failed to read alignment {:?}: {e}", args.fasta_file);
            std::process::exit(2);
        }
    };
    let read_s = t0.elapsed().as_secs_f64();
    info!(
        "Read {} tips and {} sequences in {read_s:.3}s",
        topology.leaves().count(),
        alignment.len()
    );

    if !args.no_reconcile {
        let renamed = reconcile_tip_labels(&mut topology, &alignment);
        if renamed > 0 {
            info!("Renamed {renamed} tip label(s) to match sequence ids");
        }
    }

    let policy = if args.strict { MissingTipPolicy::Strict } else { MissingTipPolicy::Wildcard };

    let t1 = Instant::now();
    let report = match args.method {
        MethodArg::Fitch => score_alignment(&topology, &alignment, policy),
    };
    let report = match report {
        Ok(r) => r,
        Err(e) => {
            error!("Scoring failed: {e}");
            std::process::exit(3);
        }
    };
    let score_s = t1.elapsed().as_secs_f64();
    info!("Scored {} columns in {score_s:.3}s", report.per_column.len());

    if let Some(path) = &args.per_column {
        let t2 = Instant::now();
        if let Err(e) = write_column_scores_tsv(path, &report.per_column) {
            error!("Failed to write output {:?}: {e}", path);
            std::process::exit(4);
        }
        info!("Writing per-column scores {:.3}s", t2.elapsed().as_secs_f64());
    }

    println!("Total Fitch score = {}", report.total);
}

fn run_rf(t1: &Path, t2: &Path) {
    let read = |path: &Path| match read_newick(path) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to read tree {:?}: {e}", path);
            std::process::exit(2);
        }
    };
    let (tree_a, tree_b) = (read(t1), read(t2));

    match robinson_foulds(&tree_a, &tree_b) {
        Ok(rf) => println!("RF distance (topology only): {rf}"),
        Err(e) => {
            error!("Failed to compare trees: {e}");
            std::process::exit(3);
        }
    }
}

fn run_merge(root: &Path, output: &Path) {
    match merge_fasta_dirs(root, output) {
        Ok(n) => println!("Merged {n} FASTA file(s) --> {}", output.display()),
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    }
}

fn default_level(quiet: bool, verbose: u8) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::WARN,
        (false, 0) => LevelFilter::INFO,
        (false, 1) => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// `RUST_LOG` wins when set; otherwise the level comes from `-q`/`-v`.
fn setup_logging(quiet: bool, verbose: u8) {
    let level = default_level(quiet, verbose);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_score_args_defaults() {
        let cli = Cli::parse_from([
            "parsimony", "score", "--newick-tree", "t.nwk", "--fasta-file", "a.fasta",
        ]);
        match cli.command {
            Command::Score(args) => {
                assert!(matches!(args.method, MethodArg::Fitch));
                assert!(!args.strict);
                assert!(args.per_column.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(!cli.quiet);
    }

    #[test]
    fn test_merge_default_output() {
        let cli = Cli::parse_from(["parsimony", "-q", "merge", "samples"]);
        match cli.command {
            Command::Merge { root, output } => {
                assert_eq!(root, PathBuf::from("samples"));
                assert_eq!(output, PathBuf::from("sequences.fasta"));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(cli.quiet);
    }

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(true, 2), LevelFilter::WARN);
        assert_eq!(default_level(false, 0), LevelFilter::INFO);
        assert_eq!(default_level(false, 1), LevelFilter::DEBUG);
        assert_eq!(default_level(false, 3), LevelFilter::TRACE);
        assert_eq!(default_level(false, 1).to_string(), "debug");
    }

    #[test]
    fn test_rf_paths() {
        let cli = Cli::parse_from(["parsimony", "rf", "--t1", "a.nwk", "--t2", "b.nwk"]);
        match cli.command {
            Command::Rf { t1, t2 } => {
                assert_eq!(t1.as_path(), Path::new("a.nwk"));
                assert_eq!(t2.as_path(), Path::new("b.nwk"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
