use std;

use crate::error::{ComparisonError, Result};

/// Position of pair (i, j), i != j, within the row-major upper triangle of an
/// n x n matrix. The pair is sorted before lookup.
pub fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    let (low, high) = if i < j { (i, j) } else { (j, i) };
    assert!(
        low != high && high < n,
        "Programming error: no condensed index for ({}, {}) in {}x{} matrix",
        i,
        j,
        n,
        n
    );
    n * low - low * (low + 1) / 2 + (high - low - 1)
}

/// All (i, j) with i < j in row-major order.
pub fn upper_triangle_pairs(n: usize) -> Vec<(usize, usize)> {
    (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect()
}

/// Square strain x strain similarity matrix. Only the upper triangle is ever
/// computed, the lower triangle is a mirror of it and the diagonal is exactly
/// 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    strain_names: Vec<String>,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    /// Build from upper triangle values given in row-major pair order.
    pub fn from_condensed(
        strain_names: Vec<String>,
        condensed: &[f64],
    ) -> Result<SimilarityMatrix> {
        let n = strain_names.len();
        let expected = n * n.saturating_sub(1) / 2;
        if condensed.len() != expected {
            return Err(ComparisonError::MatrixShape(format!(
                "{} strains require {} pairwise values, found {}",
                n,
                expected,
                condensed.len()
            )));
        }

        let mut values = vec![0.0; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
        }
        for ((i, j), value) in upper_triangle_pairs(n).into_iter().zip(condensed.iter()) {
            values[i * n + j] = *value;
            values[j * n + i] = *value;
        }
        Ok(SimilarityMatrix {
            strain_names,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.strain_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strain_names.is_empty()
    }

    pub fn strain_names(&self) -> &[String] {
        &self.strain_names
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.len() + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.len();
        &self.values[i * n..(i + 1) * n]
    }

    /// Upper triangle values in row-major pair order.
    pub fn condensed(&self) -> Vec<f64> {
        upper_triangle_pairs(self.len())
            .into_iter()
            .map(|(i, j)| self.get(i, j))
            .collect()
    }

    /// Mean of the off-diagonal values, None with fewer than 2 strains.
    pub fn mean_off_diagonal(&self) -> Option<f64> {
        let condensed = self.condensed();
        match condensed.len() {
            0 => None,
            n => Some(condensed.iter().sum::<f64>() / n as f64),
        }
    }

    pub fn is_symmetric(&self) -> bool {
        let n = self.len();
        (0..n).all(|i| (0..n).all(|j| self.get(i, j) == self.get(j, i)))
    }

    /// Every value is in [0,1] and the diagonal is exactly 1.
    pub fn is_valid(&self) -> bool {
        let n = self.len();
        self.is_symmetric()
            && (0..n).all(|i| self.get(i, i) == 1.0)
            && self.values.iter().all(|v| (0.0..=1.0).contains(v))
    }
}
