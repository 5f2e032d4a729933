use clap::Parser;
use npsearch::{
    NpSearch, NpSearchError, SearchConfig,
    config::{DEFAULT_SIGNALP_BIN, DEFAULT_USEARCH_BIN, SIGNALP_ENV_BIN, USEARCH_ENV_BIN},
    input, output,
};
use std::{path::PathBuf, time::Instant};

#[derive(Parser, Debug)]
#[command(name = "npsearch", version)]
#[command(about = "Identify neuropeptide precursor candidates in nucleotide or protein FASTA files")]
struct Cli {
    /// Input FASTA file, optionally gzip-compressed
    #[arg(short, long)]
    input: PathBuf,

    /// Directory for the FASTA, HTML and JSON reports
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Minimum ORF length in residues
    #[arg(short = 'm', long)]
    min_orf_length: Option<usize>,

    /// Number of worker threads
    #[arg(short = 'n', long)]
    num_threads: Option<usize>,

    /// Skip candidates longer than this many residues
    #[arg(long)]
    max_length: Option<usize>,

    /// Path to the signalp executable
    #[arg(long, value_name = "PATH")]
    signalp_path: Option<String>,

    /// Path to the usearch executable
    #[arg(long, value_name = "PATH")]
    usearch_path: Option<String>,

    /// Seconds before a signalp call is abandoned
    #[arg(long, value_name = "SECONDS")]
    signalp_timeout: Option<u64>,

    /// Identity threshold for fragment clustering
    #[arg(long)]
    cluster_identity: Option<f64>,

    /// Directory for the scratch files of signalp and usearch calls
    #[arg(long, value_name = "DIR")]
    temp_dir: Option<PathBuf>,

    /// JSON file with default settings; flags given here take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn search_config(&self) -> Result<SearchConfig, NpSearchError> {
        let mut config = match &self.config {
            Some(path) => SearchConfig::load_from_path(path)?,
            None => SearchConfig::default(),
        };
        if let Some(v) = self.min_orf_length {
            config.min_orf_length = v;
        }
        if let Some(v) = self.num_threads {
            config.num_threads = v;
        }
        if let Some(v) = self.max_length {
            config.max_sequence_length = v;
        }
        if let Some(v) = self.signalp_timeout {
            config.signalp_timeout_secs = v;
        }
        if let Some(v) = self.cluster_identity {
            config.cluster_identity = v;
        }
        if let Some(dir) = &self.temp_dir {
            config.temp_dir = Some(dir.clone());
        }
        if self.signalp_path.is_some() {
            config.signalp_path = npsearch::config::configured_or_env(
                self.signalp_path.as_deref(),
                SIGNALP_ENV_BIN,
                DEFAULT_SIGNALP_BIN,
            );
        }
        if self.usearch_path.is_some() {
            config.usearch_path = npsearch::config::configured_or_env(
                self.usearch_path.as_deref(),
                USEARCH_ENV_BIN,
                DEFAULT_USEARCH_BIN,
            );
        }
        config.validate()
    }
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> Result<(), NpSearchError> {
    let start = Instant::now();
    let config = cli.search_config()?;
    let search = NpSearch::from_config(config)?;
    let data = input::read_input(&cli.input, search.config())?;
    let records = search.run(&data)?;
    let stem = output::output_stem(&cli.input);
    output::write_outputs(&cli.output_dir, &stem, &records)?;
    log::info!(
        "{} candidate(s) reported in {:.1}s",
        records.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
