use std;
use std::collections::BTreeSet;

use crate::composite::{combine, ComponentMatrices, CompositeWeights};
use crate::error::{ComparisonError, Result};
use crate::genome::Genome;
use crate::hierarchical_clusterer::{cluster, ClusterTree, DistanceMatrix};
use crate::kmer_profile::{profile, KmerProfile, MAX_KMER_LENGTH};
use crate::pairwise_metric::{MetricInput, PairwiseMetric};
use crate::similarity_matrix::{upper_triangle_pairs, SimilarityMatrix};

use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonParameters {
    pub kmer_length: usize,
    pub identity_window_size: usize,
    pub gc_window_size: usize,
    /// Contigs shorter than this are dropped when loading, 0 keeps all
    pub min_contig_length: usize,
}

impl Default for ComparisonParameters {
    fn default() -> ComparisonParameters {
        ComparisonParameters {
            kmer_length: 4,
            identity_window_size: 1000,
            gc_window_size: 1000,
            min_contig_length: 0,
        }
    }
}

impl ComparisonParameters {
    pub fn validate(&self) -> Result<()> {
        if self.kmer_length == 0 || self.kmer_length > MAX_KMER_LENGTH {
            return Err(ComparisonError::InvalidKmerLength {
                k: self.kmer_length,
                max: MAX_KMER_LENGTH,
            });
        }
        if self.identity_window_size == 0 {
            return Err(ComparisonError::InvalidWindowSize {
                parameter: "window size",
            });
        }
        if self.gc_window_size == 0 {
            return Err(ComparisonError::InvalidWindowSize {
                parameter: "GC window size",
            });
        }
        Ok(())
    }
}

/// All values computed for one strain pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseComparison {
    pub strain1: String,
    pub strain2: String,
    pub kmer_similarity: f64,
    pub sequence_similarity: f64,
    pub gc_similarity: f64,
    pub size_similarity: f64,
    pub composite_similarity: f64,
    pub distance: f64,
}

/// Result of comparing a set of strains, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct GenomeComparison {
    pub strain_names: Vec<String>,
    pub components: ComponentMatrices,
    pub composite: SimilarityMatrix,
    pub tree: ClusterTree,
}

impl GenomeComparison {
    pub fn distance_matrix(&self) -> DistanceMatrix {
        DistanceMatrix::from_similarity(&self.composite)
    }

    pub fn pairwise_summaries(&self) -> Vec<PairwiseComparison> {
        upper_triangle_pairs(self.strain_names.len())
            .into_iter()
            .map(|(i, j)| {
                let composite = self.composite.get(i, j);
                PairwiseComparison {
                    strain1: self.strain_names[i].clone(),
                    strain2: self.strain_names[j].clone(),
                    kmer_similarity: self.components.kmer.get(i, j),
                    sequence_similarity: self.components.sequence.get(i, j),
                    gc_similarity: self.components.gc.get(i, j),
                    size_similarity: self.components.size.get(i, j),
                    composite_similarity: composite,
                    distance: 1.0 - composite,
                }
            })
            .collect()
    }

    pub fn mean_similarity(&self) -> Option<f64> {
        self.composite.mean_off_diagonal()
    }

    pub fn mean_distance(&self) -> Option<f64> {
        self.mean_similarity().map(|s| 1.0 - s)
    }
}

/// A run needs at least 2 non-empty genomes with distinct names.
pub fn check_genomes(genomes: &[Genome]) -> Result<()> {
    if genomes.len() < 2 {
        return Err(ComparisonError::TooFewGenomes {
            found: genomes.len(),
        });
    }
    let mut seen = BTreeSet::new();
    for genome in genomes {
        if genome.is_empty() {
            return Err(ComparisonError::EmptyGenome {
                strain: genome.id().to_string(),
            });
        }
        if !seen.insert(genome.id()) {
            return Err(ComparisonError::DuplicateStrain {
                strain: genome.id().to_string(),
            });
        }
    }
    Ok(())
}

pub fn compare_genomes(
    genomes: &[Genome],
    parameters: &ComparisonParameters,
) -> Result<GenomeComparison> {
    compare_genomes_with_weights(genomes, parameters, &CompositeWeights::DEFAULT)
}

/// Profile every genome, score every strain pair with each metric, combine
/// into the composite matrix and cluster it.
pub fn compare_genomes_with_weights(
    genomes: &[Genome],
    parameters: &ComparisonParameters,
    weights: &CompositeWeights,
) -> Result<GenomeComparison> {
    parameters.validate()?;
    weights.validate()?;
    check_genomes(genomes)?;

    let strain_names: Vec<String> = genomes.iter().map(|g| g.id().to_string()).collect();

    info!(
        "Calculating {}-mer profiles for {} genomes ..",
        parameters.kmer_length,
        genomes.len()
    );
    let profiles: Vec<KmerProfile> = genomes
        .par_iter()
        .map(|genome| profile(genome.sequence(), parameters.kmer_length))
        .collect::<Result<Vec<_>>>()?;
    for (genome, kmer_profile) in genomes.iter().zip(profiles.iter()) {
        debug!(
            "{}: {} valid {}-mers, {} distinct",
            genome.id(),
            kmer_profile.total_kmers(),
            kmer_profile.k(),
            kmer_profile.distinct_kmers()
        );
        if kmer_profile.is_empty() {
            warn!(
                "No valid {}-mers found in {}, its kmer similarity will be 0",
                kmer_profile.k(),
                genome.id()
            );
        }
    }
    let inputs: Vec<MetricInput> = genomes
        .iter()
        .zip(profiles.iter())
        .map(|(genome, kmer_profile)| MetricInput {
            genome,
            kmer_profile,
        })
        .collect();

    info!("Calculating pairwise similarity matrices ..");
    let pairs = upper_triangle_pairs(genomes.len());
    let scores: Vec<[f64; 4]> = pairs
        .par_iter()
        .map(|(i, j)| {
            let mut pair_scores = [0.0; 4];
            for (slot, metric) in PairwiseMetric::ALL.iter().enumerate() {
                pair_scores[slot] = metric.score(
                    &inputs[*i],
                    &inputs[*j],
                    parameters.identity_window_size,
                    parameters.gc_window_size,
                );
            }
            info!(
                "{} vs {}: kmer={:.3}, seq={:.3}, GC={:.3}, size={:.3}",
                strain_names[*i],
                strain_names[*j],
                pair_scores[0],
                pair_scores[1],
                pair_scores[2],
                pair_scores[3]
            );
            pair_scores
        })
        .collect();

    let component = |slot: usize| -> Result<SimilarityMatrix> {
        let condensed: Vec<f64> = scores.iter().map(|s| s[slot]).collect();
        SimilarityMatrix::from_condensed(strain_names.clone(), &condensed)
    };
    let components = ComponentMatrices {
        kmer: component(0)?,
        sequence: component(1)?,
        gc: component(2)?,
        size: component(3)?,
    };

    info!("Calculating composite similarity ..");
    let composite = combine(&components, weights)?;

    info!("Clustering strains by Ward linkage ..");
    let tree = cluster(&composite)?;
    info!("Finished comparing {} genomes", genomes.len());

    Ok(GenomeComparison {
        strain_names,
        components,
        composite,
        tree,
    })
}
