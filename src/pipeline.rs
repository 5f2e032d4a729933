use crate::{
    alphabet::Alphabet,
    clustering::{FragmentClusterer, UsearchCli},
    config::SearchConfig,
    error::{NpSearchError, Result},
    input::InputData,
    open_reading_frame::OpenReadingFrame,
    scoring::NeuropeptideScorer,
    signal_peptide::{Candidate, SignalPeptideClassifier, SignalPeptidePredictor, SignalpCli},
    worker_pool::WorkerPool,
};
use npsearch_protocol::SequenceRecord;
use std::sync::Arc;

/// Classifies and scores all candidates of one input.
pub struct NpSearch {
    config: SearchConfig,
    predictor: Arc<dyn SignalPeptidePredictor>,
    clusterer: Arc<dyn FragmentClusterer>,
}

impl NpSearch {
    pub fn new(
        config: SearchConfig,
        predictor: Arc<dyn SignalPeptidePredictor>,
        clusterer: Arc<dyn FragmentClusterer>,
    ) -> Self {
        Self {
            config,
            predictor,
            clusterer,
        }
    }

    /// Uses the `signalp` and `usearch` binaries named in `config`.
    pub fn from_config(config: SearchConfig) -> Result<Self> {
        let predictor = SignalpCli::from_config(&config)?;
        let clusterer = UsearchCli::from_config(&config)?;
        Ok(Self::new(config, Arc::new(predictor), Arc::new(clusterer)))
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Units of classification work, in input order.
    ///
    /// Nucleotide records yield one group per parent ORF; protein records are
    /// their own single-candidate group.
    pub fn candidate_groups(&self, input: &InputData) -> Result<Vec<Vec<Candidate>>> {
        match input.alphabet {
            Alphabet::Protein => Ok(input
                .records
                .iter()
                .map(|r| vec![Candidate::protein(&r.id, &r.sequence)])
                .collect()),
            Alphabet::Nucleotide => {
                let mut groups = vec![];
                let mut total = 0;
                for record in &input.records {
                    let orfs = OpenReadingFrame::find_orfs(
                        &record.id,
                        record.sequence.as_bytes(),
                        self.config.min_orf_length,
                    );
                    log::debug!("{}: {} ORF candidates", record.id, orfs.len());
                    total += orfs.len();
                    for group in OpenReadingFrame::group_by_parent(orfs) {
                        groups.push(group.into_iter().map(Candidate::from).collect::<Vec<_>>());
                    }
                }
                if total == 0 {
                    return Err(NpSearchError::empty_result(
                        "orf extraction",
                        format!(
                            "no open reading frame of at least {} residues in any input sequence",
                            self.config.min_orf_length
                        ),
                    ));
                }
                log::info!("Extracted {total} ORF candidates in {} groups", groups.len());
                Ok(groups)
            }
            Alphabet::Ambiguous => Err(NpSearchError::Input(
                "Input alphabet could not be determined".to_string(),
            )),
        }
    }

    /// Runs classification and scoring on the worker pool and returns the
    /// records sorted by score, highest first.
    pub fn run(&self, input: &InputData) -> Result<Vec<SequenceRecord>> {
        let groups = self.candidate_groups(input)?;
        let classifier = Arc::new(SignalPeptideClassifier::new(
            self.predictor.clone(),
            self.config.max_sequence_length,
        ));
        let scorer = Arc::new(NeuropeptideScorer::new(self.clusterer.clone()));

        log::info!(
            "Classifying {} candidate group(s) with {} thread(s)",
            groups.len(),
            self.config.num_threads
        );
        let mut pool = WorkerPool::new(
            self.config.num_threads,
            self.config.effective_queue_capacity(),
        )?;
        for group in groups {
            let classifier = classifier.clone();
            let scorer = scorer.clone();
            pool.schedule(group, move |group| {
                let Some((candidate, result)) = classifier.classify_group(&group)? else {
                    return Ok(None);
                };
                let Some(mut record) = SequenceRecord::from_signal_peptide(
                    &candidate.name,
                    &candidate.sequence,
                    candidate.frame,
                    result,
                ) else {
                    log::warn!(
                        "Discarding {}: cleavage position outside the sequence",
                        candidate.name
                    );
                    return Ok(None);
                };
                scorer.score(&mut record);
                Ok(Some(record))
            })?;
        }
        let results = pool.shutdown()?;
        if results.is_empty() {
            return Err(NpSearchError::empty_result(
                "signal peptide classification",
                "no candidate has a predicted signal peptide",
            ));
        }
        log::info!("{} candidate(s) with a signal peptide", results.len());
        Ok(sort_by_score(results))
    }
}

/// Highest score first; equal scores keep their scheduling order.
pub fn sort_by_score(mut results: Vec<(usize, SequenceRecord)>) -> Vec<SequenceRecord> {
    results.sort_by_key(|(ordinal, _)| *ordinal);
    results.sort_by(|(_, a), (_, b)| b.score().total_cmp(&a.score()));
    results.into_iter().map(|(_, record)| record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::InputRecord,
        scoring::tests::FixedClusterer,
        signal_peptide::{
            Prediction,
            tests::{FakePredictor, positive},
        },
    };
    use npsearch_protocol::SignalPeptideResult;

    fn config(threads: usize) -> SearchConfig {
        SearchConfig {
            min_orf_length: 5,
            num_threads: threads,
            ..Default::default()
        }
    }

    fn protein_input(records: &[(&str, &str)]) -> InputData {
        InputData {
            alphabet: Alphabet::Protein,
            records: records
                .iter()
                .map(|(id, seq)| InputRecord {
                    id: id.to_string(),
                    sequence: seq.to_string(),
                })
                .collect(),
        }
    }

    /// Positive with a cleavage after residue 4 for every sequence starting `MSP`.
    fn msp_predictor() -> Arc<FakePredictor> {
        Arc::new(FakePredictor::new(|name, seq| {
            let row = if seq.starts_with("MSP") {
                positive(name, 5, 0.8)
            } else {
                SignalPeptideResult::timeout_fallback(name)
            };
            Ok(Prediction::Completed(vec![row]))
        }))
    }

    #[test]
    fn test_protein_run_sorted() {
        let search = NpSearch::new(
            config(1),
            msp_predictor(),
            Arc::new(FixedClusterer::new(vec![])),
        );
        let input = protein_input(&[
            ("low", "MSPAAAAAKKAAAA"),
            ("none", "MAAAAAAAAAAA"),
            ("high", "MSPADYSSSDDDLYQMNEEDKRGLFPTGGMDPLGASYFTGKR"),
            ("tie", "MSPAAAAAKKAAAA"),
        ]);
        let records = search.run(&input).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["high", "low", "tie"]);
        for record in &records {
            assert_eq!(record.signal_peptide(), "MSPA");
            assert_eq!(
                format!("{}{}", record.signal_peptide(), record.mature_sequence()),
                record.raw_sequence()
            );
            assert!(record.cleaved_fragments().is_some());
            assert_eq!(record.translated_frame(), None);
        }
    }

    #[test]
    fn test_nucleotide_run() {
        // ATG TCT CCT GCT AAA AAA GCT GCT TAA  ->  M S P A K K A A *
        let input = InputData {
            alphabet: Alphabet::Nucleotide,
            records: vec![InputRecord {
                id: "contig".to_string(),
                sequence: "ATGTCTCCTGCTAAAAAAGCTGCTTAA".to_string(),
            }],
        };
        let search = NpSearch::new(
            config(2),
            msp_predictor(),
            Arc::new(FixedClusterer::new(vec![])),
        );
        let records = search.run(&input).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), "contig_f1_0");
        assert_eq!(records[0].translated_frame(), Some(1));
        assert_eq!(records[0].mature_sequence(), "KKAA");
    }

    #[test]
    fn test_no_orfs_is_empty_result() {
        let input = InputData {
            alphabet: Alphabet::Nucleotide,
            records: vec![InputRecord {
                id: "contig".to_string(),
                sequence: "CCCCCCCCCCCCCCCCCCCC".to_string(),
            }],
        };
        let search = NpSearch::new(
            config(1),
            msp_predictor(),
            Arc::new(FixedClusterer::new(vec![])),
        );
        let err = search.run(&input).unwrap_err();
        assert!(matches!(err, NpSearchError::EmptyResult { ref stage, .. } if stage == "orf extraction"));
    }

    #[test]
    fn test_no_positives_is_empty_result() {
        let search = NpSearch::new(
            config(1),
            Arc::new(FakePredictor::new(|_, _| Ok(Prediction::TimedOut))),
            Arc::new(FixedClusterer::new(vec![])),
        );
        let err = search
            .run(&protein_input(&[("a", "MSPAAAAAKKAAAA")]))
            .unwrap_err();
        assert!(matches!(
            err,
            NpSearchError::EmptyResult { ref stage, .. } if stage == "signal peptide classification"
        ));
    }

    #[test]
    fn test_out_of_bounds_cleavage_is_discarded() {
        let search = NpSearch::new(
            config(1),
            Arc::new(FakePredictor::new(|name, _| {
                Ok(Prediction::Completed(vec![positive(name, 500, 0.9)]))
            })),
            Arc::new(FixedClusterer::new(vec![])),
        );
        let input = protein_input(&[("a", "MSPAAAAAKKAAAA")]);
        assert!(matches!(
            search.run(&input),
            Err(NpSearchError::EmptyResult { .. })
        ));
    }

    #[test]
    fn test_hundred_candidates_four_workers() {
        let search = NpSearch::new(
            config(4),
            msp_predictor(),
            Arc::new(FixedClusterer::new(vec![(0, 2)])),
        );
        let owned: Vec<(String, String)> = (0..100)
            .map(|i| (format!("p{i}"), format!("MSPA{}KR{}", "A".repeat(i % 9), "G".repeat(i % 5))))
            .collect();
        let borrowed: Vec<(&str, &str)> = owned.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let records = search.run(&protein_input(&borrowed)).unwrap();
        assert_eq!(records.len(), 100);
        let mut ids: Vec<&str> = records.iter().map(|r| r.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 100);
        assert!(records.windows(2).all(|w| w[0].score() >= w[1].score()));
    }
}
