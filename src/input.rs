//! FASTA input: validation, reading and alphabet detection.

use crate::{
    alphabet::{self, Alphabet},
    config::SearchConfig,
    error::{NpSearchError, Result},
};
use bio::io::fasta;
use flate2::read::MultiGzDecoder;
use std::{fs::File, io::Read, path::Path};

#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    pub id: String,
    pub sequence: String,
}

#[derive(Debug, Clone)]
pub struct InputData {
    pub alphabet: Alphabet,
    pub records: Vec<InputRecord>,
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(NpSearchError::Input(format!(
            "Input file '{}' does not exist",
            path.display()
        )));
    }
    let file = File::open(path)?;
    let mut bytes = vec![];
    if is_gzip_path(path) {
        MultiGzDecoder::new(file)
            .read_to_end(&mut bytes)
            .map_err(|e| {
                NpSearchError::Input(format!("Could not decompress '{}': {e}", path.display()))
            })?;
    } else {
        let mut file = file;
        file.read_to_end(&mut bytes)?;
    }
    Ok(bytes)
}

/// Parses FASTA text. Sequences are upper-cased with whitespace removed.
pub fn parse_fasta(bytes: &[u8], source: &str) -> Result<Vec<InputRecord>> {
    let first_line = bytes
        .split(|b| *b == b'\n')
        .map(|line| line.trim_ascii())
        .find(|line| !line.is_empty());
    match first_line {
        None => {
            return Err(NpSearchError::Input(format!("Input file '{source}' is empty")));
        }
        Some(line) if !line.starts_with(b">") => {
            return Err(NpSearchError::Input(format!(
                "Input file '{source}' is not in FASTA format"
            )));
        }
        Some(_) => {}
    }

    let mut ret = vec![];
    for record in fasta::Reader::new(bytes).records() {
        let record = record.map_err(|e| {
            NpSearchError::Input(format!("Could not parse FASTA in '{source}': {e}"))
        })?;
        if let Some(b) = record.seq().iter().find(|b| !b.is_ascii()) {
            return Err(NpSearchError::Input(format!(
                "Record '{}' in '{source}' contains the non-ASCII byte 0x{b:02x}",
                record.id()
            )));
        }
        let sequence: String = record
            .seq()
            .iter()
            .filter(|b| !b.is_ascii_whitespace())
            .map(|b| b.to_ascii_uppercase() as char)
            .collect();
        ret.push(InputRecord {
            id: record.id().to_string(),
            sequence,
        });
    }
    if ret.is_empty() {
        return Err(NpSearchError::Input(format!(
            "Input file '{source}' contains no FASTA records"
        )));
    }
    Ok(ret)
}

/// Decides whether all records are nucleotide or all are protein.
///
/// The verdict comes from one sample pooled over the records. Every record
/// that is clear enough on its own must agree with it.
pub fn detect_alphabet(records: &[InputRecord], config: &SearchConfig) -> Result<Alphabet> {
    let mut pooled = String::new();
    for record in records {
        let remaining = config.alphabet_sample_size.saturating_sub(pooled.len());
        if remaining == 0 {
            break;
        }
        pooled.push_str(&alphabet::sample_prefix(&record.sequence, remaining));
    }
    let verdict = alphabet::classify(&pooled, config.alphabet_threshold);
    if verdict == Alphabet::Ambiguous {
        return Err(NpSearchError::Input(
            "Could not tell whether the input holds protein or nucleotide sequences \
             (too short, or mixed protein and nucleotide content)"
                .to_string(),
        ));
    }
    for record in records {
        let sample = alphabet::sample_prefix(&record.sequence, config.alphabet_sample_size);
        let own = alphabet::classify(&sample, config.alphabet_threshold);
        if own != Alphabet::Ambiguous && own != verdict {
            return Err(NpSearchError::Input(format!(
                "Mixed protein and nucleotide content: '{}' looks like {own}, the file like {verdict}",
                record.id
            )));
        }
    }
    Ok(verdict)
}

/// Validates, reads and classifies an input file before any candidate work.
pub fn read_input(path: &Path, config: &SearchConfig) -> Result<InputData> {
    let bytes = read_bytes(path)?;
    let records = parse_fasta(&bytes, &path.display().to_string())?;
    let alphabet = detect_alphabet(&records, config)?;
    log::info!(
        "Read {} {} sequence(s) from {}",
        records.len(),
        alphabet,
        path.display()
    );
    Ok(InputData { alphabet, records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::GzEncoder};
    use std::io::Write;
    use tempfile::tempdir;

    const NUCLEOTIDE_FASTA: &str = ">contig1 some description\nATGAAACGCAAAGGCTTA\nGCTAGCTAGGATCC\n>contig2\natgcatgcatgcatgcatgc\n";
    const PROTEIN_FASTA: &str = ">prot1\nMFYFESFGRMWLVVCLLNSAFLTTVISGQA\n>prot2\nMKLLQEPPFIQWAAAD\n";

    #[test]
    fn test_parse_fasta() {
        let records = parse_fasta(NUCLEOTIDE_FASTA.as_bytes(), "test").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "contig1");
        assert_eq!(records[0].sequence, "ATGAAACGCAAAGGCTTAGCTAGCTAGGATCC");
        assert_eq!(records[1].sequence, "ATGCATGCATGCATGCATGC");
    }

    #[test]
    fn test_reject_non_fasta_and_empty() {
        assert!(matches!(
            parse_fasta(b"ACGT\n>x\nACGT\n", "test"),
            Err(NpSearchError::Input(_))
        ));
        assert!(matches!(parse_fasta(b"\n  \n", "test"), Err(NpSearchError::Input(_))));
    }

    #[test]
    fn test_reject_non_ascii_residues() {
        let err = parse_fasta(">prot\nMSPAÉKRGCC\n".as_bytes(), "test").unwrap_err();
        assert!(matches!(err, NpSearchError::Input(ref m) if m.contains("0xc3")));
    }

    #[test]
    fn test_detect_alphabet() {
        let config = SearchConfig::default();
        let nucleotide = parse_fasta(NUCLEOTIDE_FASTA.as_bytes(), "test").unwrap();
        assert_eq!(detect_alphabet(&nucleotide, &config).unwrap(), Alphabet::Nucleotide);
        let protein = parse_fasta(PROTEIN_FASTA.as_bytes(), "test").unwrap();
        assert_eq!(detect_alphabet(&protein, &config).unwrap(), Alphabet::Protein);
    }

    #[test]
    fn test_mixed_content_is_rejected() {
        let config = SearchConfig::default();
        let mixed = format!("{NUCLEOTIDE_FASTA}{PROTEIN_FASTA}");
        let records = parse_fasta(mixed.as_bytes(), "test").unwrap();
        assert!(matches!(
            detect_alphabet(&records, &config),
            Err(NpSearchError::Input(_))
        ));
    }

    #[test]
    fn test_read_input_plain_and_gzip() {
        let td = tempdir().unwrap();
        let plain = td.path().join("input.fa");
        std::fs::write(&plain, PROTEIN_FASTA).unwrap();
        let data = read_input(&plain, &SearchConfig::default()).unwrap();
        assert_eq!(data.alphabet, Alphabet::Protein);
        assert_eq!(data.records.len(), 2);

        let gz = td.path().join("input.fa.gz");
        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(NUCLEOTIDE_FASTA.as_bytes()).unwrap();
        encoder.finish().unwrap();
        let data = read_input(&gz, &SearchConfig::default()).unwrap();
        assert_eq!(data.alphabet, Alphabet::Nucleotide);
        assert_eq!(data.records[1].id, "contig2");
    }

    #[test]
    fn test_missing_and_empty_files() {
        let td = tempdir().unwrap();
        let config = SearchConfig::default();
        assert!(matches!(
            read_input(&td.path().join("missing.fa"), &config),
            Err(NpSearchError::Input(_))
        ));
        let empty = td.path().join("empty.fa");
        std::fs::write(&empty, "").unwrap();
        assert!(matches!(read_input(&empty, &config), Err(NpSearchError::Input(_))));
    }
}
