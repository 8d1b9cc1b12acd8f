use std;
use std::path::Path;

use needletail::parse_fastx_file;

use crate::error::{ComparisonError, Result};
use crate::genome::{count_bases, BaseCounts, Genome};

#[derive(Debug, PartialEq)]
pub struct GenomeAssemblyStats {
    pub num_contigs: usize,
    pub contig_lengths: Vec<usize>,
    pub total_length: usize,
    pub longest_contig: usize,
    pub shortest_contig: usize,
    pub mean_contig_length: f64,
    pub median_contig_length: f64,
    pub n50: usize,
    pub base_counts: BaseCounts,
}

impl GenomeAssemblyStats {
    pub fn num_ambiguous_bases(&self) -> usize {
        self.base_counts.n
    }

    /// Over unambiguous bases
    pub fn gc_percent(&self) -> f64 {
        self.base_counts.gc_percent()
    }

    /// Over the total length, ambiguous bases included
    pub fn at_percent(&self) -> f64 {
        match self.total_length {
            0 => 0.0,
            total => (self.base_counts.a + self.base_counts.t) as f64 / total as f64 * 100.0,
        }
    }
}

/// Strain name for a genome file, i.e. its file name without extension.
pub fn strain_name_from_path(fasta_path: &str) -> String {
    Path::new(fasta_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| fasta_path.to_string())
}

/// Call f on each (name, uppercased sequence) record of the file.
fn for_each_contig<F>(fasta_path: &str, mut f: F) -> Result<()>
where
    F: FnMut(&str, &[u8]),
{
    let mut reader = parse_fastx_file(fasta_path).map_err(|e| ComparisonError::FastaParse {
        path: fasta_path.to_string(),
        message: e.to_string(),
    })?;
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| ComparisonError::FastaParse {
            path: fasta_path.to_string(),
            message: e.to_string(),
        })?;
        let id = String::from_utf8_lossy(record.id()).into_owned();
        let sequence = record.seq().to_ascii_uppercase();
        f(&id, &sequence);
    }
    Ok(())
}

/// Concatenate all contigs of at least min_contig_length (0 keeps all) into
/// one genome.
pub fn load_genome(
    fasta_path: &str,
    strain_name: &str,
    min_contig_length: usize,
) -> Result<Genome> {
    let mut sequence = vec![];
    let mut num_kept = 0usize;
    let mut num_skipped = 0usize;
    for_each_contig(fasta_path, |contig_name, contig| {
        if contig.len() >= min_contig_length {
            sequence.extend_from_slice(contig);
            num_kept += 1;
        } else {
            trace!(
                "Skipping contig {} of length {} from {}",
                contig_name,
                contig.len(),
                fasta_path
            );
            num_skipped += 1;
        }
    })?;
    if num_skipped > 0 {
        debug!(
            "Skipped {} contigs shorter than {} bp in {}",
            num_skipped, min_contig_length, fasta_path
        );
    }
    let genome = Genome::new(strain_name, &sequence)?;
    debug!(
        "Loaded {}: {} contigs, {} bp",
        strain_name,
        num_kept,
        genome.total_length()
    );
    Ok(genome)
}

pub fn calculate_genome_stats(fasta_path: &str) -> Result<GenomeAssemblyStats> {
    let mut contig_lengths = vec![];
    let mut base_counts = BaseCounts::default();

    for_each_contig(fasta_path, |_, contig| {
        contig_lengths.push(contig.len());
        let counts = count_bases(contig);
        base_counts.a += counts.a;
        base_counts.c += counts.c;
        base_counts.g += counts.g;
        base_counts.t += counts.t;
        base_counts.n += counts.n;
    })?;

    let total_length: usize = contig_lengths.iter().sum();
    let num_contigs = contig_lengths.len();
    let mean_contig_length = match num_contigs {
        0 => 0.0,
        n => total_length as f64 / n as f64,
    };

    Ok(GenomeAssemblyStats {
        num_contigs,
        total_length,
        longest_contig: contig_lengths.iter().copied().max().unwrap_or(0),
        shortest_contig: contig_lengths.iter().copied().min().unwrap_or(0),
        mean_contig_length,
        median_contig_length: calculate_median(&contig_lengths),
        n50: calculate_n50(&contig_lengths),
        contig_lengths,
        base_counts,
    })
}

/// Middle contig length, or the mean of the two middle lengths when the count
/// is even. 0 when there are no contigs.
pub fn calculate_median(contig_lengths: &[usize]) -> f64 {
    let mut sorted = contig_lengths.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[mid] as f64,
        _ => (sorted[mid - 1] + sorted[mid]) as f64 / 2.0,
    }
}

/// Length of the contig at which the cumulative length, longest contigs first,
/// reaches half the total. 0 when there are no contigs.
pub fn calculate_n50(contig_lengths: &[usize]) -> usize {
    let mut sorted = contig_lengths.to_vec();
    sorted.sort_unstable_by_key(|l| std::cmp::Reverse(*l));
    let total: usize = sorted.iter().sum();
    let mut cumulative = 0usize;
    for length in sorted {
        cumulative += length;
        // cumulative >= total / 2, without rounding the half down
        if cumulative * 2 >= total {
            return length;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_hello_world() {
        init();
        let stats = calculate_genome_stats("tests/data/multi_contig/strainD.fna").unwrap();
        assert_eq!(3, stats.num_contigs);
        assert_eq!(vec![60, 30, 10], stats.contig_lengths);
        assert_eq!(100, stats.total_length);
        assert_eq!(60, stats.longest_contig);
        assert_eq!(10, stats.shortest_contig);
        assert_eq!(60, stats.n50);
        assert_eq!(30.0, stats.median_contig_length);
        assert_eq!(4, stats.num_ambiguous_bases());
        assert_eq!(
            BaseCounts {
                a: 24,
                c: 24,
                g: 24,
                t: 24,
                n: 4
            },
            stats.base_counts
        );
        assert_eq!(50.0, stats.gc_percent());
        assert_eq!(48.0, stats.at_percent());
    }

    #[test]
    fn test_load_genome_concatenates() {
        init();
        let genome = load_genome("tests/data/multi_contig/strainD.fna", "strainD", 0).unwrap();
        assert_eq!("strainD", genome.id());
        assert_eq!(100, genome.total_length());
        assert_eq!(b"ACGTACGTAC", &genome.sequence()[..10]);
    }

    #[test]
    fn test_load_genome_min_contig_length() {
        init();
        let genome = load_genome("tests/data/multi_contig/strainD.fna", "strainD", 20).unwrap();
        assert_eq!(90, genome.total_length());
        let genome = load_genome("tests/data/multi_contig/strainD.fna", "strainD", 1000).unwrap();
        assert!(genome.is_empty());
    }

    #[test]
    fn test_missing_file() {
        init();
        assert!(load_genome("tests/data/does_not_exist.fna", "x", 0).is_err());
    }

    #[test]
    fn test_n50() {
        init();
        assert_eq!(60, calculate_n50(&[10, 60, 30]));
        assert_eq!(1_000_000, calculate_n50(&[1_000_000]));
        assert_eq!(30, calculate_n50(&[30, 30, 20, 20]));
        assert_eq!(0, calculate_n50(&[]));
    }

    #[test]
    fn test_median() {
        init();
        assert_eq!(30.0, calculate_median(&[60, 10, 30]));
        assert_eq!(25.0, calculate_median(&[30, 10, 20, 60]));
        assert_eq!(7.0, calculate_median(&[7]));
        assert_eq!(0.0, calculate_median(&[]));
    }

    #[test]
    fn test_strain_name_from_path() {
        init();
        assert_eq!(
            "LB_ATCC11842",
            strain_name_from_path("data/genomes/LB_ATCC11842.fna")
        );
        assert_eq!("genome", strain_name_from_path("genome"));
    }
}
