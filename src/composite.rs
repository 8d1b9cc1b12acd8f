use crate::error::{ComparisonError, Result};
use crate::pairwise_metric::PairwiseMetric;
use crate::similarity_matrix::SimilarityMatrix;

/// Allowed deviation of the weight sum from 1.0.
pub const WEIGHT_SUM_EPSILON: f64 = 1e-9;

/// Contribution of each metric to the composite similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeWeights {
    pub kmer: f64,
    pub sequence: f64,
    pub gc: f64,
    pub size: f64,
}

impl CompositeWeights {
    pub const DEFAULT: CompositeWeights = CompositeWeights {
        kmer: 0.4,
        sequence: 0.3,
        gc: 0.2,
        size: 0.1,
    };

    pub fn weight(&self, metric: PairwiseMetric) -> f64 {
        match metric {
            PairwiseMetric::KmerCosine => self.kmer,
            PairwiseMetric::SequenceIdentity => self.sequence,
            PairwiseMetric::GcCorrelation => self.gc,
            PairwiseMetric::RelativeSize => self.size,
        }
    }

    pub fn sum(&self) -> f64 {
        self.kmer + self.sequence + self.gc + self.size
    }

    /// Weights are never renormalised, a bad sum is an error.
    pub fn validate(&self) -> Result<()> {
        let sum = self.sum();
        let all_finite_non_negative = PairwiseMetric::ALL
            .iter()
            .all(|m| self.weight(*m).is_finite() && self.weight(*m) >= 0.0);
        if !all_finite_non_negative || (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ComparisonError::WeightConfiguration { sum });
        }
        Ok(())
    }
}

impl Default for CompositeWeights {
    fn default() -> CompositeWeights {
        CompositeWeights::DEFAULT
    }
}

/// The four per-metric matrices of one run, all over the same strain order.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentMatrices {
    pub kmer: SimilarityMatrix,
    pub sequence: SimilarityMatrix,
    pub gc: SimilarityMatrix,
    pub size: SimilarityMatrix,
}

impl ComponentMatrices {
    pub fn get(&self, metric: PairwiseMetric) -> &SimilarityMatrix {
        match metric {
            PairwiseMetric::KmerCosine => &self.kmer,
            PairwiseMetric::SequenceIdentity => &self.sequence,
            PairwiseMetric::GcCorrelation => &self.gc,
            PairwiseMetric::RelativeSize => &self.size,
        }
    }
}

/// Weighted element-wise sum of the component matrices. The upper triangle
/// is combined and mirrored, the diagonal stays exactly 1.
pub fn combine(
    components: &ComponentMatrices,
    weights: &CompositeWeights,
) -> Result<SimilarityMatrix> {
    weights.validate()?;

    let strain_names = components.kmer.strain_names();
    for metric in PairwiseMetric::ALL.iter() {
        if components.get(*metric).strain_names() != strain_names {
            return Err(ComparisonError::MatrixShape(format!(
                "{} matrix strain order differs from the kmer matrix",
                metric
            )));
        }
    }

    let n = strain_names.len();
    let mut condensed = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            condensed.push(
                weights.kmer * components.kmer.get(i, j)
                    + weights.sequence * components.sequence.get(i, j)
                    + weights.gc * components.gc.get(i, j)
                    + weights.size * components.size.get(i, j),
            );
        }
    }
    debug!(
        "Combined {} pairwise values into composite",
        condensed.len()
    );
    SimilarityMatrix::from_condensed(strain_names.to_vec(), &condensed)
}
