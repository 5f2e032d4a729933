// Standard genetic code (NCBI translation table 1) and strand helpers

pub const STOP_RESIDUE: u8 = b'*';
pub const START_RESIDUE: u8 = b'M';
pub const UNKNOWN_RESIDUE: u8 = b'X';

// Codons indexed by base order T, C, A, G at each position
const STANDARD_TABLE: &[u8; 64] =
    b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

#[inline(always)]
fn base_index(base: u8) -> Option<usize> {
    match base.to_ascii_uppercase() {
        b'T' | b'U' => Some(0),
        b'C' => Some(1),
        b'A' => Some(2),
        b'G' => Some(3),
        _ => None,
    }
}

#[inline(always)]
pub fn translate_codon(codon: &[u8]) -> u8 {
    if codon.len() != 3 {
        return UNKNOWN_RESIDUE;
    }
    match (
        base_index(codon[0]),
        base_index(codon[1]),
        base_index(codon[2]),
    ) {
        (Some(a), Some(b), Some(c)) => STANDARD_TABLE[a * 16 + b * 4 + c],
        _ => UNKNOWN_RESIDUE,
    }
}

/// Translates complete codons; a trailing partial codon is dropped.
pub fn translate(sequence: &[u8]) -> Vec<u8> {
    sequence.chunks_exact(3).map(translate_codon).collect()
}

/// Upper-cases, maps `U` to `T` and drops everything that is not a letter.
pub fn normalize_dna(sequence: &[u8]) -> Vec<u8> {
    sequence
        .iter()
        .filter(|b| b.is_ascii_alphabetic())
        .map(|b| match b.to_ascii_uppercase() {
            b'U' => b'T',
            other => other,
        })
        .collect()
}

pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    bio::alphabets::dna::revcomp(sequence)
}

/// Translation of one of the six reading frames.
///
/// Frames 1-3 read the forward strand from offsets 0-2, frames 4-6 read the
/// reverse complement from offsets 0-2.
pub fn translate_frame(sequence: &[u8], frame: u8) -> Vec<u8> {
    let dna = normalize_dna(sequence);
    let (strand, offset) = match frame {
        1..=3 => (dna, (frame - 1) as usize),
        4..=6 => (reverse_complement(&dna), (frame - 4) as usize),
        _ => return vec![],
    };
    match strand.get(offset..) {
        Some(s) => translate(s),
        None => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_codons() {
        assert_eq!(translate_codon(b"ATG"), b'M');
        assert_eq!(translate_codon(b"TGG"), b'W');
        assert_eq!(translate_codon(b"GGC"), b'G');
        assert_eq!(translate_codon(b"aug"), b'M');
        assert_eq!(translate_codon(b"TAA"), STOP_RESIDUE);
        assert_eq!(translate_codon(b"TAG"), STOP_RESIDUE);
        assert_eq!(translate_codon(b"TGA"), STOP_RESIDUE);
        assert_eq!(translate_codon(b"ANG"), UNKNOWN_RESIDUE);
        assert_eq!(translate_codon(b"AT"), UNKNOWN_RESIDUE);
    }

    #[test]
    fn test_translate_frames() {
        let seq = b"ATGAAATAGC";
        assert_eq!(translate_frame(seq, 1), b"MK*".to_vec());
        assert_eq!(translate_frame(seq, 2), b"*NS".to_vec());
        assert_eq!(translate_frame(seq, 3), b"EI".to_vec());
        // reverse complement: GCTATTTCAT
        assert_eq!(translate_frame(seq, 4), b"AIS".to_vec());
        assert_eq!(translate_frame(seq, 5), b"LFH".to_vec());
        assert_eq!(translate_frame(seq, 6), b"YF".to_vec());
        assert!(translate_frame(seq, 7).is_empty());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_dna(b"acg u\nT"), b"ACGTT".to_vec());
        assert_eq!(reverse_complement(b"AACG"), b"CGTT".to_vec());
    }
}
