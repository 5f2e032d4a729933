//! Shared machine-readable NpSearch contracts.
//!
//! These types are what the search engine produces and what report writers
//! consume. They carry the data invariants that do not depend on any external
//! tool: the signal-peptide split of a candidate and the lossless
//! reconstruction of a mature sequence from its cleaved fragments.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Residue alphabet of an input sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alphabet {
    Nucleotide,
    Protein,
    Ambiguous,
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Nucleotide => "nucleotide",
            Self::Protein => "protein",
            Self::Ambiguous => "ambiguous",
        };
        write!(f, "{label}")
    }
}

/// Signal-peptide verdict as reported by the predictor (`Y`/`N`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Y")]
    Positive,
    #[serde(rename = "N")]
    Negative,
}

impl Classification {
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.trim() {
            "Y" | "y" => Some(Self::Positive),
            "N" | "n" => Some(Self::Negative),
            _ => None,
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Positive)
    }
}

/// One data row of the signal-peptide predictor's short output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPeptideResult {
    pub name: String,
    pub cmax: f64,
    pub cmax_pos: usize,
    pub ymax: f64,
    /// 1-indexed position of the first mature residue (the predictor's Ymax position).
    pub cleavage_position: usize,
    pub smax: f64,
    pub smax_pos: usize,
    pub smean: f64,
    pub d_score: f64,
    pub classification: Classification,
    pub dmaxcut: f64,
    pub network: Option<String>,
}

impl SignalPeptideResult {
    /// The result used in place of a predictor call that ran out of time.
    /// Always the same tuple for a given name.
    pub fn timeout_fallback(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cmax: 0.0,
            cmax_pos: 1,
            ymax: 0.0,
            cleavage_position: 1,
            smax: 0.0,
            smax_pos: 1,
            smean: 0.0,
            d_score: 0.0,
            classification: Classification::Negative,
            dmaxcut: 0.0,
            network: None,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.classification.is_positive()
    }
}

/// Proteolytic cleavage motif families recognised between peptide fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotifKind {
    #[serde(rename = "KR")]
    Kr,
    #[serde(rename = "RR")]
    Rr,
    #[serde(rename = "KK")]
    Kk,
    /// Basic residue, two spacer residues, `R`.
    #[serde(rename = "mono_2")]
    Monobasic2,
    /// Basic residue, four spacer residues, `R`.
    #[serde(rename = "mono_4")]
    Monobasic4,
    /// Basic residue, six spacer residues, `R`.
    #[serde(rename = "mono_6")]
    Monobasic6,
}

impl MotifKind {
    pub fn is_dibasic(&self) -> bool {
        matches!(self, Self::Kr | Self::Rr | Self::Kk)
    }

    pub fn is_monobasic(&self) -> bool {
        !self.is_dibasic()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleavageMotif {
    pub kind: MotifKind,
    /// The residues matched by the motif, e.g. `KR` or `KAAR`.
    pub residues: String,
}

impl CleavageMotif {
    pub fn new(kind: MotifKind, residues: &str) -> Self {
        Self {
            kind,
            residues: residues.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

/// A stretch of the mature sequence between two cleavage motifs.
///
/// A motif is shared by neighbouring fragments: it is the `end_motif` of the
/// fragment before it and the `start_motif` of the fragment after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleavedFragment {
    pub start_motif: Option<CleavageMotif>,
    pub peptide_body: String,
    pub end_motif: Option<CleavageMotif>,
}

impl CleavedFragment {
    pub fn end_kind(&self) -> Option<MotifKind> {
        self.end_motif.as_ref().map(|m| m.kind)
    }
}

/// Concatenates fragment bodies with their connecting motifs.
///
/// For a correct segmentation this yields the segmented sequence exactly.
pub fn reconstruct_mature_sequence(fragments: &[CleavedFragment]) -> String {
    let mut ret = String::new();
    if let Some(start) = fragments.first().and_then(|f| f.start_motif.as_ref()) {
        ret.push_str(&start.residues);
    }
    for fragment in fragments {
        ret.push_str(&fragment.peptide_body);
        if let Some(end) = &fragment.end_motif {
            ret.push_str(&end.residues);
        }
    }
    ret
}

/// A candidate with a positive signal-peptide classification, split into
/// signal peptide and mature sequence, together with its heuristic score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRecord {
    id: String,
    raw_sequence: String,
    signal_peptide: String,
    mature_sequence: String,
    translated_frame: Option<u8>,
    signal_peptide_result: SignalPeptideResult,
    score: f64,
    cleaved_fragments: Option<Vec<CleavedFragment>>,
}

impl SequenceRecord {
    /// Builds a record from a predictor result.
    ///
    /// Returns `None` for negative classifications and for cleavage positions
    /// outside `1..=len+1`.
    pub fn from_signal_peptide(
        id: &str,
        raw_sequence: &str,
        translated_frame: Option<u8>,
        result: SignalPeptideResult,
    ) -> Option<Self> {
        if !result.is_positive() {
            return None;
        }
        let pos = result.cleavage_position;
        if pos == 0 || pos > raw_sequence.len() + 1 {
            return None;
        }
        let signal_peptide = raw_sequence.get(..pos - 1)?.to_string();
        let mature_sequence = raw_sequence.get(pos - 1..)?.to_string();
        Some(Self {
            id: id.to_string(),
            raw_sequence: raw_sequence.to_string(),
            signal_peptide,
            mature_sequence,
            translated_frame,
            signal_peptide_result: result,
            score: 0.0,
            cleaved_fragments: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn raw_sequence(&self) -> &str {
        &self.raw_sequence
    }

    pub fn signal_peptide(&self) -> &str {
        &self.signal_peptide
    }

    pub fn mature_sequence(&self) -> &str {
        &self.mature_sequence
    }

    pub fn translated_frame(&self) -> Option<u8> {
        self.translated_frame
    }

    pub fn signal_peptide_result(&self) -> &SignalPeptideResult {
        &self.signal_peptide_result
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// `None` until the record has been scored; `Some(vec![])` means scored
    /// with no fragments.
    pub fn cleaved_fragments(&self) -> Option<&[CleavedFragment]> {
        self.cleaved_fragments.as_deref()
    }

    /// Adds a non-negative contribution. Negative or NaN deltas are ignored so
    /// the score never decreases.
    pub fn add_score(&mut self, delta: f64) {
        if delta > 0.0 {
            self.score += delta;
        }
    }

    pub fn set_cleaved_fragments(&mut self, fragments: Vec<CleavedFragment>) {
        self.cleaved_fragments = Some(fragments);
    }

    /// Returns the record to its unscored state.
    pub fn reset_scoring(&mut self) {
        self.score = 0.0;
        self.cleaved_fragments = None;
    }
}
