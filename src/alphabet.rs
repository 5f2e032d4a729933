pub use npsearch_protocol::Alphabet;

/// Fewer informative residues than this never yield a verdict.
pub const MIN_INFORMATIVE_RESIDUES: usize = 10;

#[inline(always)]
fn is_nucleotide_letter(letter: u8) -> bool {
    matches!(letter.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'U')
}

/// Letters that occur in amino-acid sequences but have no IUPAC nucleotide meaning.
#[inline(always)]
fn is_amino_acid_only_letter(letter: u8) -> bool {
    matches!(
        letter.to_ascii_uppercase(),
        b'E' | b'F' | b'I' | b'J' | b'L' | b'O' | b'P' | b'Q' | b'Z'
    )
}

#[inline(always)]
fn is_informative(letter: u8) -> bool {
    letter.is_ascii_alphabetic() && !matches!(letter.to_ascii_uppercase(), b'N' | b'X')
}

/// Guesses the alphabet of a raw sequence sample.
///
/// Non-letters and the wildcards `N`/`X` are ignored. The nucleotide fraction
/// is smoothed with one pseudo-count on each side, so very short samples need
/// near-perfect evidence to pass `threshold`.
pub fn classify(sample: &str, threshold: f64) -> Alphabet {
    let informative: Vec<u8> = sample.bytes().filter(|&b| is_informative(b)).collect();
    if informative.len() < MIN_INFORMATIVE_RESIDUES {
        return Alphabet::Ambiguous;
    }
    let nucleotides = informative
        .iter()
        .filter(|&&b| is_nucleotide_letter(b))
        .count();
    let fraction = (nucleotides as f64 + 1.0) / (informative.len() as f64 + 2.0);
    if fraction >= threshold {
        Alphabet::Nucleotide
    } else if informative.iter().any(|&b| is_amino_acid_only_letter(b)) {
        Alphabet::Protein
    } else {
        Alphabet::Ambiguous
    }
}

/// Takes up to `max_residues` informative residues from the start of `sequence`.
pub fn sample_prefix(sequence: &str, max_residues: usize) -> String {
    sequence
        .bytes()
        .filter(|&b| is_informative(b))
        .take(max_residues)
        .map(char::from)
        .collect()
}
