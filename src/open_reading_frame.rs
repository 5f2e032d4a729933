use crate::genetic_code::{self, START_RESIDUE, STOP_RESIDUE};
use itertools::Itertools;
use rayon::prelude::*;

pub const FRAMES: [u8; 6] = [1, 2, 3, 4, 5, 6];

/// A start-to-stop (or start-to-end) stretch of one translated reading frame.
///
/// Candidates are overlapping: every start residue with enough residues
/// before the next stop yields its own candidate, so nested candidates share
/// a stop with the longest one.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenReadingFrame {
    record_id: String,
    frame: u8,
    index: usize,
    start: usize,
    stop: usize,
    sequence: String,
}

impl OpenReadingFrame {
    pub fn new(
        record_id: &str,
        frame: u8,
        index: usize,
        start: usize,
        stop: usize,
        sequence: String,
    ) -> Self {
        OpenReadingFrame {
            record_id: record_id.to_string(),
            frame,
            index,
            start,
            stop,
            sequence,
        }
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn frame(&self) -> u8 {
        self.frame
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Residue offset of the start residue in the translated frame.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Residue offset of the stop sentinel, or the frame length if none.
    pub fn stop(&self) -> usize {
        self.stop
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Name used for predictor input and reports.
    pub fn name(&self) -> String {
        format!("{}_f{}_{}", self.record_id, self.frame, self.index)
    }

    /// All candidates of `min_length` residues or more in the six frames of `sequence`.
    pub fn find_orfs(record_id: &str, sequence: &[u8], min_length: usize) -> Vec<OpenReadingFrame> {
        FRAMES
            .par_iter()
            .flat_map(|frame| {
                let translated = genetic_code::translate_frame(sequence, *frame);
                Self::add_orfs(record_id, &translated, *frame, min_length)
            })
            .collect()
    }

    fn add_orfs(
        record_id: &str,
        translated: &[u8],
        frame: u8,
        min_length: usize,
    ) -> Vec<OpenReadingFrame> {
        let mut ret = vec![];
        let mut segment_start = 0;
        for segment in translated.split(|aa| *aa == STOP_RESIDUE) {
            let stop = segment_start + segment.len();
            for (i, aa) in segment.iter().enumerate() {
                if *aa != START_RESIDUE || segment.len() - i < min_length {
                    continue;
                }
                let index = ret.len();
                let sequence = String::from_utf8_lossy(&segment[i..]).to_string();
                ret.push(OpenReadingFrame::new(
                    record_id,
                    frame,
                    index,
                    segment_start + i,
                    stop,
                    sequence,
                ));
            }
            segment_start = stop + 1;
        }
        ret
    }

    /// Groups candidates that share a record, frame and stop, shortest first.
    pub fn group_by_parent(orfs: Vec<OpenReadingFrame>) -> Vec<Vec<OpenReadingFrame>> {
        orfs.into_iter()
            .sorted_by(|a, b| {
                (a.record_id.as_str(), a.frame, a.stop, a.len())
                    .cmp(&(b.record_id.as_str(), b.frame, b.stop, b.len()))
            })
            .chunk_by(|orf| (orf.record_id.clone(), orf.frame, orf.stop))
            .into_iter()
            .map(|(_, group)| group.collect())
            .collect()
    }
}
