use std::collections::BTreeMap;

use crate::error::{ComparisonError, Result};

/// Longest k-mer which fits in the 2-bit packed u64 encoding.
pub const MAX_KMER_LENGTH: usize = 32;
/// Up to this length counts are kept in a flat 4^k slot array rather than a
/// map.
pub const MAX_DENSE_KMER_LENGTH: usize = 8;

const INVALID_BASE: u8 = 4;

lazy_static! {
    static ref BASE_TO_CODE: [u8; 256] = {
        let mut codes = [INVALID_BASE; 256];
        codes[b'A' as usize] = 0;
        codes[b'C' as usize] = 1;
        codes[b'G' as usize] = 2;
        codes[b'T' as usize] = 3;
        codes[b'a' as usize] = 0;
        codes[b'c' as usize] = 1;
        codes[b'g' as usize] = 2;
        codes[b't' as usize] = 3;
        codes
    };
}

const CODE_TO_BASE: [char; 4] = ['A', 'C', 'G', 'T'];

#[derive(Debug, Clone, PartialEq)]
enum KmerFrequencies {
    Dense(Vec<f64>),
    Sparse(BTreeMap<u64, f64>),
}

/// Relative frequencies of every k-mer observed in one genome. Windows
/// containing an ambiguous base are not counted.
#[derive(Debug, Clone, PartialEq)]
pub struct KmerProfile {
    k: usize,
    total_kmers: u64,
    frequencies: KmerFrequencies,
}

impl KmerProfile {
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of valid windows counted
    pub fn total_kmers(&self) -> u64 {
        self.total_kmers
    }

    pub fn is_empty(&self) -> bool {
        self.total_kmers == 0
    }

    pub fn distinct_kmers(&self) -> usize {
        self.iter().count()
    }

    /// Frequency of the given k-mer, 0 if never seen or not a valid k-mer.
    pub fn frequency(&self, kmer: &str) -> f64 {
        if kmer.len() != self.k {
            return 0.0;
        }
        match encode_kmer(kmer.as_bytes()) {
            None => 0.0,
            Some(code) => match &self.frequencies {
                KmerFrequencies::Dense(slots) => slots[code as usize],
                KmerFrequencies::Sparse(map) => map.get(&code).copied().unwrap_or(0.0),
            },
        }
    }

    /// Non-zero entries as (encoded k-mer, frequency), in ascending code
    /// order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (u64, f64)> + '_> {
        match &self.frequencies {
            KmerFrequencies::Dense(slots) => Box::new(
                slots
                    .iter()
                    .enumerate()
                    .filter(|(_, f)| **f > 0.0)
                    .map(|(code, f)| (code as u64, *f)),
            ),
            KmerFrequencies::Sparse(map) => Box::new(map.iter().map(|(code, f)| (*code, *f))),
        }
    }

    /// Non-zero entries with decoded k-mer strings.
    pub fn kmers(&self) -> Vec<(String, f64)> {
        self.iter()
            .map(|(code, f)| (decode_kmer(code, self.k), f))
            .collect()
    }

    /// Sum of squared frequencies, accumulated in ascending code order.
    pub fn norm_squared(&self) -> f64 {
        self.iter().map(|(_, f)| f * f).sum()
    }
}

/// Count k-mers of length k along the sequence, one position at a time.
pub fn profile(sequence: &[u8], k: usize) -> Result<KmerProfile> {
    if k == 0 || k > MAX_KMER_LENGTH {
        return Err(ComparisonError::InvalidKmerLength {
            k,
            max: MAX_KMER_LENGTH,
        });
    }

    let mask = if k == MAX_KMER_LENGTH {
        u64::MAX
    } else {
        (1u64 << (2 * k)) - 1
    };

    let mut dense_counts: Vec<u64> = if k <= MAX_DENSE_KMER_LENGTH {
        vec![0; 1 << (2 * k)]
    } else {
        vec![]
    };
    let mut sparse_counts: BTreeMap<u64, u64> = BTreeMap::new();
    let mut total_kmers = 0u64;

    if sequence.len() >= k {
        let mut code = 0u64;
        let mut run_length = 0usize;
        for base in sequence {
            let base_code = BASE_TO_CODE[*base as usize];
            if base_code == INVALID_BASE {
                // Restart, no window spanning this base is valid
                run_length = 0;
                code = 0;
                continue;
            }
            code = ((code << 2) | base_code as u64) & mask;
            run_length += 1;
            if run_length >= k {
                total_kmers += 1;
                if k <= MAX_DENSE_KMER_LENGTH {
                    dense_counts[code as usize] += 1;
                } else {
                    *sparse_counts.entry(code).or_insert(0) += 1;
                }
            }
        }
    }
    trace!(
        "Counted {} valid {}-mers over {} bases",
        total_kmers,
        k,
        sequence.len()
    );

    let frequencies = if k <= MAX_DENSE_KMER_LENGTH {
        KmerFrequencies::Dense(
            dense_counts
                .into_iter()
                .map(|count| match total_kmers {
                    0 => 0.0,
                    total => count as f64 / total as f64,
                })
                .collect(),
        )
    } else {
        KmerFrequencies::Sparse(
            sparse_counts
                .into_iter()
                .map(|(code, count)| (code, count as f64 / total_kmers as f64))
                .collect(),
        )
    };

    Ok(KmerProfile {
        k,
        total_kmers,
        frequencies,
    })
}

pub fn encode_kmer(kmer: &[u8]) -> Option<u64> {
    if kmer.len() > MAX_KMER_LENGTH {
        return None;
    }
    let mut code = 0u64;
    for base in kmer {
        let base_code = BASE_TO_CODE[*base as usize];
        if base_code == INVALID_BASE {
            return None;
        }
        code = (code << 2) | base_code as u64;
    }
    Some(code)
}

pub fn decode_kmer(code: u64, k: usize) -> String {
    (0..k)
        .rev()
        .map(|i| CODE_TO_BASE[((code >> (2 * i)) & 3) as usize])
        .collect()
}
