use std;
use std::fmt;

use crate::genome::{count_bases, Genome};
use crate::kmer_profile::KmerProfile;

/// Below this, windowed identity is not computed at all.
pub const MIN_IDENTITY_WINDOW_SIZE: usize = 10;

/// One strain as seen by the metric calculators.
#[derive(Debug, Clone, Copy)]
pub struct MetricInput<'a> {
    pub genome: &'a Genome,
    pub kmer_profile: &'a KmerProfile,
}

/// The independent similarity measures which make up the composite score.
/// Each is a pure function of one strain pair and scores in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PairwiseMetric {
    KmerCosine,
    SequenceIdentity,
    GcCorrelation,
    RelativeSize,
}

impl PairwiseMetric {
    pub const ALL: [PairwiseMetric; 4] = [
        PairwiseMetric::KmerCosine,
        PairwiseMetric::SequenceIdentity,
        PairwiseMetric::GcCorrelation,
        PairwiseMetric::RelativeSize,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PairwiseMetric::KmerCosine => "kmer",
            PairwiseMetric::SequenceIdentity => "sequence",
            PairwiseMetric::GcCorrelation => "gc",
            PairwiseMetric::RelativeSize => "size",
        }
    }

    pub fn score(
        &self,
        strain1: &MetricInput,
        strain2: &MetricInput,
        identity_window_size: usize,
        gc_window_size: usize,
    ) -> f64 {
        match self {
            PairwiseMetric::KmerCosine => {
                kmer_cosine_similarity(strain1.kmer_profile, strain2.kmer_profile)
            }
            PairwiseMetric::SequenceIdentity => windowed_identity(
                strain1.genome.sequence(),
                strain2.genome.sequence(),
                identity_window_size,
            ),
            PairwiseMetric::GcCorrelation => gc_correlation(
                strain1.genome.sequence(),
                strain2.genome.sequence(),
                gc_window_size,
            ),
            PairwiseMetric::RelativeSize => {
                size_similarity(strain1.genome.total_length(), strain2.genome.total_length())
            }
        }
    }
}

impl fmt::Display for PairwiseMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Cosine of the angle between two k-mer frequency vectors over the union of
/// their k-mers. An empty profile scores 0.
pub fn kmer_cosine_similarity(profile1: &KmerProfile, profile2: &KmerProfile) -> f64 {
    assert_eq!(
        profile1.k(),
        profile2.k(),
        "Programming error: comparing profiles of different k"
    );
    if profile1.is_empty() || profile2.is_empty() {
        return 0.0;
    }

    // Both iterators are in ascending code order, so merge-join them.
    let mut dot = 0.0;
    let mut iter1 = profile1.iter().peekable();
    let mut iter2 = profile2.iter().peekable();
    while let (Some(&(code1, f1)), Some(&(code2, f2))) = (iter1.peek(), iter2.peek()) {
        match code1.cmp(&code2) {
            std::cmp::Ordering::Less => {
                iter1.next();
            }
            std::cmp::Ordering::Greater => {
                iter2.next();
            }
            std::cmp::Ordering::Equal => {
                dot += f1 * f2;
                iter1.next();
                iter2.next();
            }
        }
    }

    let norm_squared1 = profile1.norm_squared();
    let norm_squared2 = profile2.norm_squared();
    if norm_squared1 == 0.0 || norm_squared2 == 0.0 {
        return 0.0;
    }
    // sqrt(a*b) rather than sqrt(a)*sqrt(b) so self-similarity is exactly 1
    let similarity = dot / (norm_squared1 * norm_squared2).sqrt();
    similarity.max(0.0).min(1.0)
}

/// Mean fraction of identical positions across co-ordinate aligned,
/// non-overlapping windows. No offset search is done.
pub fn windowed_identity(sequence1: &[u8], sequence2: &[u8], window_size: usize) -> f64 {
    let min_length = std::cmp::min(sequence1.len(), sequence2.len());
    let mut window_size = window_size;
    if min_length < window_size {
        window_size = min_length / 2;
    }
    if window_size < MIN_IDENTITY_WINDOW_SIZE {
        debug!(
            "Window size {} too small for sequence identity, scoring 0",
            window_size
        );
        return 0.0;
    }

    let num_windows = min_length / window_size;
    let mut total = 0.0;
    for i in 0..num_windows {
        let start = i * window_size;
        let end = start + window_size;
        let matches = sequence1[start..end]
            .iter()
            .zip(sequence2[start..end].iter())
            .filter(|(a, b)| a == b)
            .count();
        total += matches as f64 / window_size as f64;
    }
    total / num_windows as f64
}

/// GC percentage of each complete, non-overlapping window.
pub fn gc_windows(sequence: &[u8], window_size: usize) -> Vec<f64> {
    sequence
        .chunks_exact(window_size)
        .map(|window| count_bases(window).gc_percent())
        .collect()
}

/// Pearson correlation of the windowed GC profiles of two sequences, over the
/// windows both sequences have. Undefined and negative correlations score 0.
pub fn gc_correlation(sequence1: &[u8], sequence2: &[u8], window_size: usize) -> f64 {
    if window_size == 0 {
        return 0.0;
    }
    let gc1 = gc_windows(sequence1, window_size);
    let gc2 = gc_windows(sequence2, window_size);
    let num_windows = std::cmp::min(gc1.len(), gc2.len());
    if num_windows < 2 {
        return 0.0;
    }

    match pearson_correlation(&gc1[..num_windows], &gc2[..num_windows]) {
        Some(r) if r > 0.0 => r.min(1.0),
        Some(r) => {
            trace!("GC correlation {} treated as no similarity", r);
            0.0
        }
        None => 0.0,
    }
}

/// None when either series has zero variance.
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    assert_eq!(xs.len(), ys.len());
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let r = sxy / (sxx * syy).sqrt();
    if r.is_finite() {
        Some(r)
    } else {
        None
    }
}

/// Two empty sequences are considered the same size.
pub fn size_similarity(length1: usize, length2: usize) -> f64 {
    let longest = std::cmp::max(length1, length2);
    if longest == 0 {
        return 1.0;
    }
    let difference = if length1 > length2 {
        length1 - length2
    } else {
        length2 - length1
    };
    1.0 - difference as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer_profile::profile;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn pseudo_random_sequence(length: usize, seed: u64) -> Vec<u8> {
        let mut state = seed;
        (0..length)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                b"ACGT"[(state % 4) as usize]
            })
            .collect()
    }

    #[test]
    fn test_cosine_self_similarity() {
        init();
        for seed in 1..20 {
            let seq = pseudo_random_sequence(5_000, seed);
            let p = profile(&seq, 4).unwrap();
            assert_eq!(1.0, kmer_cosine_similarity(&p, &p));
        }
        let p = profile(b"ACGTTGCAAGGCTTAC", 9).unwrap();
        assert_eq!(1.0, kmer_cosine_similarity(&p, &p));
    }

    #[test]
    fn test_cosine_empty_profile() {
        init();
        let p1 = profile(b"ACGTACGT", 4).unwrap();
        let p2 = profile(b"ACG", 4).unwrap();
        assert_eq!(0.0, kmer_cosine_similarity(&p1, &p2));
        assert_eq!(0.0, kmer_cosine_similarity(&p2, &p2));
    }

    #[test]
    fn test_cosine_disjoint_profiles() {
        init();
        let p1 = profile(b"AAAAAAAA", 4).unwrap();
        let p2 = profile(b"CCCCCCCC", 4).unwrap();
        assert_eq!(0.0, kmer_cosine_similarity(&p1, &p2));
    }

    #[test]
    fn test_cosine_known_value() {
        init();
        // AAAA only vs AAAA and CCCC equally: cos = 0.5 / sqrt(1 * 0.5)
        let p1 = profile(b"AAAAAAA", 4).unwrap();
        let p2 = profile(b"AAAANCCCC", 4).unwrap();
        let expected = 0.5 / (0.5f64).sqrt();
        assert!((kmer_cosine_similarity(&p1, &p2) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_windowed_identity() {
        init();
        let seq1 = pseudo_random_sequence(3_000, 7);
        assert_eq!(1.0, windowed_identity(&seq1, &seq1, 1000));

        let mut seq2 = seq1.clone();
        // Change every base in the second window
        for base in seq2[1000..2000].iter_mut() {
            *base = match base {
                b'A' => b'C',
                b'C' => b'G',
                b'G' => b'T',
                _ => b'A',
            };
        }
        let expected = 2.0 / 3.0;
        assert!((windowed_identity(&seq1, &seq2, 1000) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_windowed_identity_short_sequences() {
        init();
        // min length 40 < window, so window becomes 20 with 2 windows
        let seq1 = b"AAAAAAAAAAAAAAAAAAAACCCCCCCCCCCCCCCCCCCC";
        let seq2 = b"AAAAAAAAAAAAAAAAAAAAGGGGGGGGGGGGGGGGGGGGTTTT";
        assert_eq!(0.5, windowed_identity(seq1, seq2, 1000));

        // Halved window below the minimum
        let short = b"ACGTACGTACGTACGTACG";
        assert_eq!(0.0, windowed_identity(short, short, 1000));
        assert_eq!(0.0, windowed_identity(b"", b"ACGT", 1000));
    }

    #[test]
    fn test_gc_correlation() {
        init();
        let windows = ["GGGGGGGGGG", "AAAAAAAAAA", "GCGCGAAAAA", "GCAAAAAAAA"];
        let seq1: Vec<u8> = windows.concat().into_bytes();
        assert!((gc_correlation(&seq1, &seq1, 10) - 1.0).abs() < 1e-12);

        // Reversed order of windows gives a negative correlation
        let reversed: Vec<u8> = windows
            .iter()
            .rev()
            .cloned()
            .collect::<String>()
            .into_bytes();
        assert_eq!(0.0, gc_correlation(&seq1, &reversed, 10));
    }

    #[test]
    fn test_gc_correlation_degenerate() {
        init();
        // Only one window
        assert_eq!(0.0, gc_correlation(b"GGGGGGGGGG", b"GGGGGGGGGG", 10));
        // Zero variance
        let flat = b"GCGCATATATGCGCATATAT";
        let varied = b"GGGGGGGGGGAAAAAAAAAA";
        assert_eq!(0.0, gc_correlation(flat, varied, 10));
        // Truncated to the shorter series
        let longer = b"GGGGGGGGGGAAAAAAAAAAGGGGGGGGGGTTTT";
        assert!((gc_correlation(varied, longer, 10) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_known_value() {
        init();
        let r = pearson_correlation(&[1.0, 2.0, 3.0, 4.0], &[2.0, 4.0, 5.0, 4.0]).unwrap();
        assert!((r - 3.5 / (5.0f64 * 4.75).sqrt()).abs() < 1e-12);
        assert_eq!(None, pearson_correlation(&[1.0, 1.0], &[1.0, 2.0]));
    }

    #[test]
    fn test_size_similarity() {
        init();
        assert_eq!(1.0, size_similarity(1000, 1000));
        assert_eq!(0.0, size_similarity(1000, 0));
        assert_eq!(0.0, size_similarity(0, 1000));
        assert_eq!(1.0, size_similarity(0, 0));
        assert_eq!(0.75, size_similarity(1000, 750));
    }

    #[test]
    fn test_metric_dispatch() {
        init();
        let g1 = Genome::new("a", &pseudo_random_sequence(4_000, 3)).unwrap();
        let g2 = Genome::new("b", &pseudo_random_sequence(2_000, 5)).unwrap();
        let p1 = profile(g1.sequence(), 4).unwrap();
        let p2 = profile(g2.sequence(), 4).unwrap();
        let s1 = MetricInput {
            genome: &g1,
            kmer_profile: &p1,
        };
        let s2 = MetricInput {
            genome: &g2,
            kmer_profile: &p2,
        };
        assert_eq!(
            0.5,
            PairwiseMetric::RelativeSize.score(&s1, &s2, 1000, 1000)
        );
        for metric in PairwiseMetric::ALL.iter() {
            let forward = metric.score(&s1, &s2, 1000, 100);
            let backward = metric.score(&s2, &s1, 1000, 100);
            assert!(forward >= 0.0 && forward <= 1.0, "{} {}", metric, forward);
            assert!((forward - backward).abs() < 1e-12, "{}", metric);
        }
    }
}
