//! Similarity clustering of cleaved fragments via `usearch`.

use crate::{
    config::SearchConfig,
    error::{NpSearchError, Result},
    external_tool::{self, ToolOutcome},
};
use csv::ReaderBuilder;
use std::{
    collections::BTreeMap,
    io::Write,
    path::PathBuf,
    process::Command,
    time::Duration,
};

/// Cluster sizes of one clustering call, keyed by cluster number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterMembership {
    sizes: BTreeMap<usize, usize>,
}

impl ClusterMembership {
    pub fn from_sizes(sizes: impl IntoIterator<Item = (usize, usize)>) -> Self {
        Self {
            sizes: sizes.into_iter().collect(),
        }
    }

    /// Reads a usearch `.uc` table.
    ///
    /// `C` rows carry the cluster size in the third column. Without any `C`
    /// rows the sizes are counted from `S` and `H` rows instead.
    pub fn from_uc(text: &str) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut summary: BTreeMap<usize, usize> = BTreeMap::new();
        let mut counted: BTreeMap<usize, usize> = BTreeMap::new();
        for record in rdr.records() {
            let record = record.map_err(|e| {
                NpSearchError::ExternalTool(format!("Could not read clustering table: {e}"))
            })?;
            let row_type = record.get(0).unwrap_or_default();
            if !matches!(row_type, "S" | "H" | "C") {
                continue;
            }
            let number = |i: usize| -> Result<usize> {
                record
                    .get(i)
                    .and_then(|v| v.parse::<usize>().ok())
                    .ok_or_else(|| {
                        NpSearchError::ExternalTool(format!(
                            "Malformed clustering row: {:?}",
                            record.iter().collect::<Vec<_>>()
                        ))
                    })
            };
            let cluster = number(1)?;
            if row_type == "C" {
                summary.insert(cluster, number(2)?);
            } else {
                *counted.entry(cluster).or_default() += 1;
            }
        }
        let sizes = if summary.is_empty() { counted } else { summary };
        Ok(Self { sizes })
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Sizes of clusters with more than one member.
    pub fn redundant_cluster_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.sizes.values().copied().filter(|size| *size > 1)
    }
}

/// Groups similar fragment bodies. `Ok(None)` means the clustering ran out of time.
pub trait FragmentClusterer: Send + Sync {
    fn cluster(&self, fragments: &[&str]) -> Result<Option<ClusterMembership>>;
}

#[derive(Debug, Clone)]
pub struct UsearchCli {
    executable: PathBuf,
    identity: f64,
    timeout: Duration,
    temp_root: PathBuf,
}

impl UsearchCli {
    pub fn new(executable: PathBuf, identity: f64, timeout: Duration) -> Self {
        Self {
            executable,
            identity,
            timeout,
            temp_root: std::env::temp_dir(),
        }
    }

    pub fn with_temp_root(mut self, temp_root: PathBuf) -> Self {
        self.temp_root = temp_root;
        self
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let executable = external_tool::ensure_executable(&config.usearch_path)?;
        Ok(Self::new(
            executable,
            config.cluster_identity,
            config.cluster_timeout(),
        )
        .with_temp_root(config.scratch_root()))
    }
}

impl FragmentClusterer for UsearchCli {
    fn cluster(&self, fragments: &[&str]) -> Result<Option<ClusterMembership>> {
        let dir = external_tool::scratch_dir(&self.temp_root, "npsearch_clust_")?;
        let fasta_path = dir.path().join("fragments.fa");
        let uc_path = dir.path().join("clusters.uc");

        let mut fasta = std::fs::File::create(&fasta_path)?;
        for (i, fragment) in fragments.iter().enumerate() {
            writeln!(fasta, ">seq{i}\n{fragment}")?;
        }
        fasta.flush()?;
        drop(fasta);

        let mut command = Command::new(&self.executable);
        command
            .arg("-cluster_fast")
            .arg(&fasta_path)
            .arg("-id")
            .arg(self.identity.to_string())
            .arg("-uc")
            .arg(&uc_path)
            .arg("-quiet");
        match external_tool::run_with_timeout(command, self.timeout, dir.path())? {
            ToolOutcome::TimedOut => Ok(None),
            ToolOutcome::Completed(output) => {
                external_tool::require_success("usearch", output)?;
                let text = std::fs::read_to_string(&uc_path)?;
                ClusterMembership::from_uc(&text).map(Some)
            }
        }
    }
}
