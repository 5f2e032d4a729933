//! Heuristic neuropeptide precursor scoring of a mature sequence.

use crate::clustering::FragmentClusterer;
use npsearch_protocol::{CleavageMotif, CleavedFragment, MotifKind, SequenceRecord};
use regex::Regex;
use std::sync::{Arc, LazyLock};

// Dibasic pairs first, so `KR` wins over a spaced motif starting at the same residue
static CLEAVAGE_MOTIF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(KR)|(RR)|(KK)|([KRH]..R)|([KRH]....R)|([KRH]......R)")
        .expect("cleavage motif pattern is valid")
});

const MOTIF_KINDS: [MotifKind; 6] = [
    MotifKind::Kr,
    MotifKind::Rr,
    MotifKind::Kk,
    MotifKind::Monobasic2,
    MotifKind::Monobasic4,
    MotifKind::Monobasic6,
];

pub const KR_SCORE: f64 = 0.09;
pub const RR_KK_SCORE: f64 = 0.05;
pub const MONOBASIC_SCORE: f64 = 0.02;
pub const FG_KR_SCORE: f64 = 0.40;
pub const G_KR_SCORE: f64 = 0.25;
pub const G_SCORE: f64 = 0.10;
pub const ACIDIC_SPACER_SCORE: f64 = 0.10;
pub const CLUSTER_MEMBER_SCORE: f64 = 0.15;

const ACIDIC_SPACER_MAX_SHARE: f64 = 0.25;
const ACIDIC_SPACER_MIN_DE: f64 = 0.5;

/// Cleavage motifs found in `sequence`, leftmost first, non-overlapping.
pub fn find_motifs(sequence: &str) -> Vec<(usize, CleavageMotif)> {
    CLEAVAGE_MOTIF
        .captures_iter(sequence)
        .filter_map(|caps| {
            let (group, m) = caps
                .iter()
                .enumerate()
                .skip(1)
                .find_map(|(i, m)| m.map(|m| (i, m)))?;
            let kind = MOTIF_KINDS.get(group - 1)?;
            Some((m.start(), CleavageMotif::new(*kind, m.as_str())))
        })
        .collect()
}

/// Splits `mature` into the stretches between cleavage motifs.
///
/// A motif becomes the end motif of the fragment before it and the start
/// motif of the fragment after it. Fragments with an empty body are kept
/// wherever they carry a motif, so the fragments always reconstruct `mature`.
/// Without any motif the result is a single fragment holding everything.
pub fn segment(mature: &str) -> Vec<CleavedFragment> {
    let mut ret = vec![];
    let mut last = 0;
    let mut previous: Option<CleavageMotif> = None;
    for (start, motif) in find_motifs(mature) {
        let end = start + motif.len();
        ret.push(CleavedFragment {
            start_motif: previous.take(),
            peptide_body: mature[last..start].to_string(),
            end_motif: Some(motif.clone()),
        });
        previous = Some(motif);
        last = end;
    }
    let tail = &mature[last..];
    if !tail.is_empty() || ret.is_empty() {
        ret.push(CleavedFragment {
            start_motif: previous,
            peptide_body: tail.to_string(),
            end_motif: None,
        });
    }
    ret
}

/// One cleavage bonus per fragment, by its end motif.
pub fn cleavage_site_score(fragments: &[CleavedFragment]) -> f64 {
    fragments
        .iter()
        .filter_map(|f| f.end_kind())
        .map(|kind| match kind {
            MotifKind::Kr => KR_SCORE,
            MotifKind::Rr | MotifKind::Kk => RR_KK_SCORE,
            _ => MONOBASIC_SCORE,
        })
        .sum()
}

fn c_terminal_glycine(fragment: &CleavedFragment) -> f64 {
    let body = fragment.peptide_body.as_str();
    let kr_end = fragment.end_kind() == Some(MotifKind::Kr);
    if body.ends_with("FG") && kr_end {
        FG_KR_SCORE
    } else if body.ends_with('G') && kr_end {
        G_KR_SCORE
    } else if body.ends_with('G') || body.ends_with("GK") || body.ends_with("GR") {
        G_SCORE
    } else {
        0.0
    }
}

/// Amidation signals at fragment C-termini.
pub fn c_terminal_glycine_score(fragments: &[CleavedFragment]) -> f64 {
    fragments.iter().map(c_terminal_glycine).sum()
}

/// Short fragments made up mostly of aspartate and glutamate.
pub fn acidic_spacer_score(fragments: &[CleavedFragment], mature_length: usize) -> f64 {
    if mature_length == 0 {
        return 0.0;
    }
    fragments
        .iter()
        .map(|f| f.peptide_body.as_str())
        .filter(|body| !body.is_empty())
        .filter(|body| body.len() as f64 / mature_length as f64 <= ACIDIC_SPACER_MAX_SHARE)
        .filter(|body| {
            let acidic = body.bytes().filter(|b| matches!(b, b'D' | b'E')).count();
            acidic as f64 / body.len() as f64 > ACIDIC_SPACER_MIN_DE
        })
        .count() as f64
        * ACIDIC_SPACER_SCORE
}

/// Runs all scoring stages over the mature sequence of one record.
pub struct NeuropeptideScorer {
    clusterer: Arc<dyn FragmentClusterer>,
}

impl NeuropeptideScorer {
    pub fn new(clusterer: Arc<dyn FragmentClusterer>) -> Self {
        Self { clusterer }
    }

    /// Bonus for every cluster of similar fragments, scaled by its size.
    ///
    /// Clustering problems are logged and score nothing.
    pub fn redundancy_score(&self, id: &str, fragments: &[CleavedFragment]) -> f64 {
        let bodies: Vec<&str> = fragments
            .iter()
            .map(|f| f.peptide_body.as_str())
            .filter(|body| !body.is_empty())
            .collect();
        if bodies.len() < 2 {
            return 0.0;
        }
        match self.clusterer.cluster(&bodies) {
            Ok(Some(membership)) => membership
                .redundant_cluster_sizes()
                .map(|size| CLUSTER_MEMBER_SCORE * size as f64)
                .sum(),
            Ok(None) => {
                log::warn!("Fragment clustering for {id} timed out, no redundancy score");
                0.0
            }
            Err(e) => {
                log::warn!("Fragment clustering for {id} failed, no redundancy score: {e}");
                0.0
            }
        }
    }

    pub fn score(&self, record: &mut SequenceRecord) {
        let fragments = segment(record.mature_sequence());
        let mature_length = record.mature_sequence().len();
        record.add_score(cleavage_site_score(&fragments));
        record.add_score(c_terminal_glycine_score(&fragments));
        record.add_score(acidic_spacer_score(&fragments, mature_length));
        record.add_score(self.redundancy_score(record.id(), &fragments));
        log::debug!(
            "{}: {} fragments, score {:.2}",
            record.id(),
            fragments.len(),
            record.score()
        );
        record.set_cleaved_fragments(fragments);
    }
}
