use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use blastqc_rs::config::{default_output_base, RunConfig};
use blastqc_rs::filter::Thresholds;
use blastqc_rs::rank::RankKey;
use blastqc_rs::run_qc;
use blastqc_rs::types::{InputFormat, SearchMode};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FileFormat {
    #[value(name = "XML")]
    Xml,
    #[value(name = "tab")]
    Tab,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BlastType {
    /// nucleotide (blastn, tblastx ...)
    #[value(name = "n")]
    Nucleotide,
    /// protein (blastp, blastx ...)
    #[value(name = "p")]
    Protein,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Order {
    /// lowest E-value
    #[value(name = "e")]
    Evalue,
    /// highest bit score
    #[value(name = "b")]
    Bitscore,
    /// highest percent identity
    #[value(name = "i")]
    Identity,
    /// most detailed definition
    #[value(name = "d")]
    Definition,
}

/// Filter BLAST XML (-outfmt 5) or tabular (-outfmt 6) results and report the
/// best hits per query.
#[derive(Debug, Parser)]
#[command(name = "blastqc", version, about)]
struct Cli {
    /// BLAST results file (.gz accepted); reads standard input when omitted
    #[arg(short = 'f', long)]
    filename: Option<PathBuf>,

    /// Format of the BLAST results
    #[arg(long = "fileformat", visible_alias = "ff", value_enum)]
    fileformat: FileFormat,

    /// Output base name (no extension); defaults to the input name
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Type of BLAST search that produced the results
    #[arg(short = 't', long = "type", value_enum)]
    blast_type: BlastType,

    /// Number of hits to report per query (0 = all that pass)
    #[arg(short = 'n', long, default_value_t = 0)]
    number: usize,

    /// Maximum acceptable E-value
    #[arg(short = 'e', long)]
    evalue: Option<f64>,

    /// Minimum acceptable bit score
    #[arg(short = 'b', long)]
    bitscore: Option<f64>,

    /// Minimum acceptable percent identity (recomputed from the alignment)
    #[arg(short = 'i', long)]
    identity: Option<f64>,

    /// Minimum definition level (';' separators for n, '>' for p; tabular
    /// input needs -outfmt "6 std salltitles")
    #[arg(short = 'd', long)]
    definition: Option<u32>,

    /// Ordering of the hits of each query
    #[arg(long = "order", visible_alias = "or", value_enum, default_value = "e")]
    order: Order,

    /// Prefer richer definitions among hits within this distance of the best E-value (requires --order e)
    #[arg(long = "erange", visible_alias = "er", default_value_t = 0.0)]
    erange: f64,

    /// Prefer richer definitions among hits within this distance of the best bit score (requires --order b)
    #[arg(long = "brange", visible_alias = "br", default_value_t = 0.0)]
    brange: f64,

    /// Prefer richer definitions among hits within this distance of the best identity (requires --order i)
    #[arg(long = "irange", visible_alias = "ir", default_value_t = 0.0)]
    irange: f64,

    /// More logging (repeat for trace)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors, no spinner
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            _ => "trace",
        }
    }

    fn into_config(self) -> RunConfig {
        let defaults = Thresholds::default();
        let output_base = self
            .output
            .unwrap_or_else(|| default_output_base(self.filename.as_deref()));

        RunConfig {
            input: self.filename,
            format: match self.fileformat {
                FileFormat::Xml => InputFormat::Xml,
                FileFormat::Tab => InputFormat::Tabular,
            },
            mode: match self.blast_type {
                BlastType::Nucleotide => SearchMode::Nucleotide,
                BlastType::Protein => SearchMode::Protein,
            },
            output_base,
            max_hits: self.number,
            thresholds: Thresholds {
                max_evalue: self.evalue.unwrap_or(defaults.max_evalue),
                min_bitscore: self.bitscore.unwrap_or(defaults.min_bitscore),
                min_def_level: self.definition.unwrap_or(defaults.min_def_level),
                min_pct_identity: self.identity.unwrap_or(defaults.min_pct_identity),
            },
            order: match self.order {
                Order::Evalue => RankKey::Evalue,
                Order::Bitscore => RankKey::Bitscore,
                Order::Identity => RankKey::Identity,
                Order::Definition => RankKey::DefinitionLevel,
            },
            evalue_window: self.erange,
            bitscore_window: self.brange,
            identity_window: self.irange,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    let spinner = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&[
                "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
            ])
            .template("{spinner:.green} {msg}")
            .expect("Invalid spinner template"),
    );

    let config = cli.into_config();
    spinner.set_message("Filtering BLAST results...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    match run_qc(&config) {
        Ok(summary) => spinner.finish_with_message(format!(
            "Done: {} queries, {} with hits, {} hits reported.",
            summary.queries, summary.queries_with_hits, summary.hits_emitted
        )),
        Err(e) => {
            spinner.abandon();
            eprintln!("blastqc: {e}");
            process::exit(e.exit_code());
        }
    }
}
