use crate::error::{ComparisonError, Result};

/// Counts of each symbol after normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BaseCounts {
    pub a: usize,
    pub c: usize,
    pub g: usize,
    pub t: usize,
    pub n: usize,
}

impl BaseCounts {
    pub fn unambiguous(&self) -> usize {
        self.a + self.c + self.g + self.t
    }

    /// GC percentage over unambiguous bases, 0 when there are none.
    pub fn gc_percent(&self) -> f64 {
        let acgt = self.unambiguous();
        if acgt == 0 {
            0.0
        } else {
            (self.g + self.c) as f64 / acgt as f64 * 100.0
        }
    }
}

/// One strain's full sequence, contigs already concatenated. Only the symbols
/// A, C, G, T and N are present once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Genome {
    id: String,
    sequence: Vec<u8>,
}

impl Genome {
    /// Uppercase the sequence and check its alphabet. IUPAC ambiguity codes
    /// other than N are collapsed to N.
    pub fn new(id: &str, sequence: &[u8]) -> Result<Genome> {
        let mut normalised = Vec::with_capacity(sequence.len());
        for (position, byte) in sequence.iter().enumerate() {
            normalised.push(normalise_base(*byte).ok_or_else(|| {
                ComparisonError::InvalidSymbol {
                    strain: id.to_string(),
                    symbol: *byte as char,
                    position,
                }
            })?);
        }
        Ok(Genome {
            id: id.to_string(),
            sequence: normalised,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn total_length(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn base_counts(&self) -> BaseCounts {
        count_bases(&self.sequence)
    }

    pub fn gc_content(&self) -> f64 {
        self.base_counts().gc_percent()
    }
}

pub fn count_bases(sequence: &[u8]) -> BaseCounts {
    let mut counts = BaseCounts::default();
    for base in sequence {
        match base {
            b'A' => counts.a += 1,
            b'C' => counts.c += 1,
            b'G' => counts.g += 1,
            b'T' => counts.t += 1,
            _ => counts.n += 1,
        }
    }
    counts
}

fn normalise_base(byte: u8) -> Option<u8> {
    match byte.to_ascii_uppercase() {
        b'A' => Some(b'A'),
        b'C' => Some(b'C'),
        b'G' => Some(b'G'),
        b'T' => Some(b'T'),
        b'N' | b'R' | b'Y' | b'K' | b'M' | b'S' | b'W' | b'B' | b'D' | b'H' | b'V' => Some(b'N'),
        _ => None,
    }
}
