use crate::{
    config::SearchConfig,
    error::Result,
    external_tool::{self, ToolOutcome},
    open_reading_frame::OpenReadingFrame,
};
use npsearch_protocol::{Classification, SignalPeptideResult};
use std::{
    io::Write,
    path::PathBuf,
    process::Command,
    sync::Arc,
    time::Duration,
};

const MIN_SHORT_FORMAT_FIELDS: usize = 11;

#[derive(Debug, Clone)]
pub enum Prediction {
    Completed(Vec<SignalPeptideResult>),
    TimedOut,
}

/// Something that can tell whether a protein sequence starts with a signal peptide.
pub trait SignalPeptidePredictor: Send + Sync {
    fn predict(&self, name: &str, sequence: &str) -> Result<Prediction>;
}

/// The `signalp` command line program, eukaryote mode, short output.
#[derive(Debug, Clone)]
pub struct SignalpCli {
    executable: PathBuf,
    cutoff: f64,
    timeout: Duration,
    temp_root: PathBuf,
}

impl SignalpCli {
    pub fn new(executable: PathBuf, cutoff: f64, timeout: Duration) -> Self {
        Self {
            executable,
            cutoff,
            timeout,
            temp_root: std::env::temp_dir(),
        }
    }

    /// Directory under which each call creates and removes its scratch files.
    pub fn with_temp_root(mut self, temp_root: PathBuf) -> Self {
        self.temp_root = temp_root;
        self
    }

    /// Resolves the configured binary; a missing one is a configuration error.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let executable = external_tool::ensure_executable(&config.signalp_path)?;
        Ok(Self::new(
            executable,
            config.signalp_cutoff,
            config.signalp_timeout(),
        )
        .with_temp_root(config.scratch_root()))
    }

    fn args(&self) -> Vec<String> {
        let cutoff = self.cutoff.to_string();
        ["-t", "euk", "-f", "short", "-U", cutoff.as_str(), "-u", cutoff.as_str()]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

impl SignalPeptidePredictor for SignalpCli {
    fn predict(&self, name: &str, sequence: &str) -> Result<Prediction> {
        let scratch = external_tool::scratch_dir(&self.temp_root, "npsearch_signalp_")?;
        let fasta_path = scratch.path().join("query.fa");
        let mut fasta = std::fs::File::create(&fasta_path)?;
        writeln!(fasta, ">{name}\n{sequence}")?;
        fasta.flush()?;
        drop(fasta);

        let mut command = Command::new(&self.executable);
        command.args(self.args()).arg(&fasta_path);
        match external_tool::run_with_timeout(command, self.timeout, scratch.path())? {
            ToolOutcome::TimedOut => Ok(Prediction::TimedOut),
            ToolOutcome::Completed(output) => {
                let output = external_tool::require_success("signalp", output)?;
                Ok(Prediction::Completed(parse_short_output(&output.stdout)))
            }
        }
    }
}

fn parse_row(fields: &[&str]) -> Option<SignalPeptideResult> {
    let float = |i: usize| fields.get(i)?.parse::<f64>().ok();
    let position = |i: usize| fields.get(i)?.parse::<usize>().ok();
    Some(SignalPeptideResult {
        name: fields.first()?.to_string(),
        cmax: float(1)?,
        cmax_pos: position(2)?,
        ymax: float(3)?,
        cleavage_position: position(4)?,
        smax: float(5)?,
        smax_pos: position(6)?,
        smean: float(7)?,
        d_score: float(8)?,
        classification: Classification::from_flag(fields.get(9)?)?,
        dmaxcut: float(10)?,
        network: fields.get(11).map(|s| s.to_string()),
    })
}

/// Parses SignalP short format. Header lines start with `#`; malformed rows are skipped.
pub fn parse_short_output(text: &str) -> Vec<SignalPeptideResult> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < MIN_SHORT_FORMAT_FIELDS {
                log::warn!("Ignoring short SignalP row: '{line}'");
                return None;
            }
            let row = parse_row(&fields);
            if row.is_none() {
                log::warn!("Ignoring unparsable SignalP row: '{line}'");
            }
            row
        })
        .collect()
}

/// A protein sequence submitted for classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub sequence: String,
    pub frame: Option<u8>,
}

impl Candidate {
    pub fn protein(name: &str, sequence: &str) -> Self {
        Self {
            name: name.to_string(),
            sequence: sequence.to_string(),
            frame: None,
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

impl From<OpenReadingFrame> for Candidate {
    fn from(orf: OpenReadingFrame) -> Self {
        Self {
            name: orf.name(),
            sequence: orf.sequence().to_string(),
            frame: Some(orf.frame()),
        }
    }
}

pub struct SignalPeptideClassifier {
    predictor: Arc<dyn SignalPeptidePredictor>,
    max_sequence_length: usize,
}

impl SignalPeptideClassifier {
    pub fn new(predictor: Arc<dyn SignalPeptidePredictor>, max_sequence_length: usize) -> Self {
        Self {
            predictor,
            max_sequence_length,
        }
    }

    /// One predictor call. A timeout becomes the fixed negative result.
    pub fn evaluate(&self, candidate: &Candidate) -> Result<Option<SignalPeptideResult>> {
        match self.predictor.predict(&candidate.name, &candidate.sequence)? {
            Prediction::TimedOut => {
                log::warn!(
                    "Signal peptide prediction for {} timed out, treating it as negative",
                    candidate.name
                );
                Ok(Some(SignalPeptideResult::timeout_fallback(&candidate.name)))
            }
            Prediction::Completed(rows) => {
                let row = rows.into_iter().next();
                if row.is_none() {
                    log::warn!("No signal peptide prediction returned for {}", candidate.name);
                }
                Ok(row)
            }
        }
    }

    /// Classifies candidates that share a parent ORF.
    ///
    /// Candidates are tried shortest first and evaluation stops at the first
    /// positive, which is then the only positive and so the best D-score.
    pub fn classify_group(
        &self,
        group: &[Candidate],
    ) -> Result<Option<(Candidate, SignalPeptideResult)>> {
        let mut ordered: Vec<&Candidate> = group.iter().collect();
        ordered.sort_by_key(|c| c.len());

        for candidate in ordered {
            if candidate.len() > self.max_sequence_length {
                log::debug!(
                    "Skipping {} ({} residues, maximum {})",
                    candidate.name,
                    candidate.len(),
                    self.max_sequence_length
                );
                continue;
            }
            if let Some(result) = self.evaluate(candidate)?
                && result.is_positive()
            {
                // Longer candidates with the same stop are supersets of this one
                return Ok(Some((candidate.clone(), result)));
            }
        }
        Ok(None)
    }
}
