//! Neuropeptide precursor candidate search.
//!
//! Candidates come from six-frame ORFs of nucleotide input or directly from
//! protein input. Those with a predicted signal peptide are scored for
//! cleavage sites, amidation signals, acidic spacers and repeated fragments.

pub mod alphabet;
pub mod clustering;
pub mod config;
pub mod error;
pub mod external_tool;
pub mod genetic_code;
pub mod input;
pub mod open_reading_frame;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod signal_peptide;
pub mod worker_pool;

pub use config::SearchConfig;
pub use error::{NpSearchError, Result};
pub use npsearch_protocol::SequenceRecord;
pub use pipeline::NpSearch;
