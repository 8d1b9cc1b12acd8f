use std;

use kodama::{linkage, Method};

use crate::error::{ComparisonError, Result};
use crate::similarity_matrix::{condensed_index, upper_triangle_pairs, SimilarityMatrix};

/// Element-wise 1 - similarity, stored as its condensed upper triangle. The
/// diagonal is implicitly 0.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    strain_names: Vec<String>,
    condensed: Vec<f64>,
}

impl DistanceMatrix {
    pub fn from_similarity(similarity: &SimilarityMatrix) -> DistanceMatrix {
        DistanceMatrix {
            strain_names: similarity.strain_names().to_vec(),
            condensed: similarity.condensed().iter().map(|s| 1.0 - s).collect(),
        }
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
        if i == j {
            0.0
        } else {
            self.condensed[condensed_index(self.len(), i, j)]
        }
    }

    /// Upper triangle in row-major pair order.
    pub fn condensed(&self) -> &[f64] {
        &self.condensed
    }
}

/// One agglomeration step. Leaves have ids 0..n, the cluster created by step
/// s has id n + s. left is always the smaller id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterMerge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    /// Number of leaves in the merged cluster
    pub size: usize,
}

/// Merge history of an agglomerative clustering, as consumed by dendrogram
/// renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterTree {
    leaf_names: Vec<String>,
    merges: Vec<ClusterMerge>,
}

impl ClusterTree {
    pub fn leaf_names(&self) -> &[String] {
        &self.leaf_names
    }

    pub fn num_leaves(&self) -> usize {
        self.leaf_names.len()
    }

    pub fn merges(&self) -> &[ClusterMerge] {
        &self.merges
    }

    /// Id of the cluster containing every leaf.
    pub fn root(&self) -> usize {
        match self.merges.len() {
            0 => 0,
            m => self.num_leaves() + m - 1,
        }
    }

    pub fn is_leaf(&self, cluster_id: usize) -> bool {
        cluster_id < self.num_leaves()
    }

    /// Children of a merged cluster, None for leaves.
    pub fn children(&self, cluster_id: usize) -> Option<(usize, usize)> {
        if self.is_leaf(cluster_id) {
            None
        } else {
            let merge = &self.merges[cluster_id - self.num_leaves()];
            Some((merge.left, merge.right))
        }
    }

    /// Height of a cluster in the dendrogram, 0 for leaves.
    pub fn height(&self, cluster_id: usize) -> f64 {
        if self.is_leaf(cluster_id) {
            0.0
        } else {
            self.merges[cluster_id - self.num_leaves()].distance
        }
    }

    /// Leaf indices under the given cluster, sorted.
    pub fn members(&self, cluster_id: usize) -> Vec<usize> {
        let mut to_return = vec![];
        let mut stack = vec![cluster_id];
        while let Some(id) = stack.pop() {
            match self.children(id) {
                None => to_return.push(id),
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        to_return.sort_unstable();
        to_return
    }

    /// Leaves in left-to-right dendrogram order.
    pub fn leaf_order(&self) -> Vec<usize> {
        if self.leaf_names.is_empty() {
            return vec![];
        }
        let mut to_return = vec![];
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            match self.children(id) {
                None => to_return.push(id),
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        to_return
    }

    pub fn is_monotonic(&self) -> bool {
        self.merges
            .windows(2)
            .all(|pair| pair[1].distance >= pair[0].distance)
    }
}

/// Ward-linkage clustering of a composite similarity matrix.
pub fn cluster(composite: &SimilarityMatrix) -> Result<ClusterTree> {
    let distances = DistanceMatrix::from_similarity(composite);
    ward_linkage(distances.strain_names().to_vec(), distances.condensed())
}

/// Agglomerate by Ward's minimum variance criterion with kodama.
///
/// kodama resolves equal candidate distances by observation order, so
/// identical input always gives the identical merge sequence and equidistant
/// clusters join lowest index first.
pub fn ward_linkage(leaf_names: Vec<String>, condensed: &[f64]) -> Result<ClusterTree> {
    let n = leaf_names.len();
    if n == 0 {
        return Err(ComparisonError::TooFewGenomes { found: 0 });
    }
    if condensed.len() != n * (n - 1) / 2 {
        return Err(ComparisonError::MatrixShape(format!(
            "{} leaves require {} condensed distances, found {}",
            n,
            n * (n - 1) / 2,
            condensed.len()
        )));
    }
    for ((i, j), value) in upper_triangle_pairs(n).into_iter().zip(condensed.iter()) {
        if !value.is_finite() {
            return Err(ComparisonError::NonFiniteDistance {
                left: i,
                right: j,
                value: *value,
            });
        }
    }
    if n == 1 {
        return Ok(ClusterTree {
            leaf_names,
            merges: vec![],
        });
    }

    // kodama overwrites its input
    let mut dissimilarities = condensed.to_vec();
    let dendrogram = linkage(&mut dissimilarities, n, Method::Ward);
    let mut merges = Vec::with_capacity(n - 1);
    for (step, merge) in dendrogram.steps().iter().enumerate() {
        if !merge.dissimilarity.is_finite() {
            return Err(ComparisonError::NonFiniteDistance {
                left: merge.cluster1,
                right: merge.cluster2,
                value: merge.dissimilarity,
            });
        }
        let merge = ClusterMerge {
            left: std::cmp::min(merge.cluster1, merge.cluster2),
            right: std::cmp::max(merge.cluster1, merge.cluster2),
            distance: merge.dissimilarity,
            size: merge.size,
        };
        debug!(
            "Merge {}: clusters {} and {} at distance {} (size {})",
            step, merge.left, merge.right, merge.distance, merge.size
        );
        merges.push(merge);
    }

    let tree = ClusterTree { leaf_names, merges };
    if !tree.is_monotonic() {
        warn!("Ward linkage produced non-monotonic merge distances, dendrogram heights may cross");
        for (i, pair) in tree.merges.windows(2).enumerate() {
            if pair[1].distance < pair[0].distance {
                warn!(
                    "Merge {} at distance {} is below preceding merge distance {}",
                    i + 1,
                    pair[1].distance,
                    pair[0].distance
                );
            }
        }
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("s{}", i)).collect()
    }

    fn assert_merge(expected: (usize, usize, f64, usize), observed: &ClusterMerge) {
        assert_eq!(expected.0, observed.left);
        assert_eq!(expected.1, observed.right);
        assert!(
            (expected.2 - observed.distance).abs() < 1e-12,
            "{} vs {}",
            expected.2,
            observed.distance
        );
        assert_eq!(expected.3, observed.size);
    }

    #[test]
    fn test_distance_matrix() {
        init();
        let s = SimilarityMatrix::from_condensed(names(3), &[0.75, 0.5, 0.25]).unwrap();
        let d = DistanceMatrix::from_similarity(&s);
        assert_eq!(&[0.25, 0.5, 0.75], d.condensed());
        assert_eq!(0.0, d.get(1, 1));
        assert_eq!(0.75, d.get(2, 1));
        assert_eq!(d.get(0, 2), d.get(2, 0));
    }

    #[test]
    fn test_two_leaves() {
        init();
        let tree = ward_linkage(names(2), &[0.3]).unwrap();
        assert_eq!(1, tree.merges().len());
        assert_merge((0, 1, 0.3, 2), &tree.merges()[0]);
        assert_eq!(2, tree.root());
        assert_eq!(vec![0, 1], tree.members(2));
    }

    #[test]
    fn test_points_on_a_line() {
        init();
        // Points at 0, 1, 5 and 6
        let positions = [0.0f64, 1.0, 5.0, 6.0];
        let condensed: Vec<f64> = upper_triangle_pairs(4)
            .into_iter()
            .map(|(i, j)| (positions[i] - positions[j]).abs())
            .collect();
        let tree = ward_linkage(names(4), &condensed).unwrap();
        assert_eq!(3, tree.merges().len());
        assert_merge((0, 1, 1.0, 2), &tree.merges()[0]);
        assert_merge((2, 3, 1.0, 2), &tree.merges()[1]);
        // Ward distance between two pairs of centroid separation 5
        assert_merge((4, 5, (50.0f64).sqrt(), 4), &tree.merges()[2]);
        assert!(tree.is_monotonic());
        assert_eq!(vec![0, 1, 2, 3], tree.leaf_order());
        assert_eq!(vec![2, 3], tree.members(5));
        assert_eq!(vec![0, 1, 2, 3], tree.members(tree.root()));
    }

    #[test]
    fn test_ward_heights_match_centroid_distances() {
        init();
        // On a line, Ward distance between clusters A and B is
        // sqrt(2|A||B| / (|A| + |B|)) * |centroid(A) - centroid(B)|
        let positions = [0.0f64, 2.0, 3.0, 10.0, 11.0, 30.0];
        let condensed: Vec<f64> = upper_triangle_pairs(6)
            .into_iter()
            .map(|(i, j)| (positions[i] - positions[j]).abs())
            .collect();
        let tree = ward_linkage(names(6), &condensed).unwrap();
        let ward = |size_a: f64, size_b: f64, separation: f64| {
            (2.0 * size_a * size_b / (size_a + size_b)).sqrt() * separation
        };
        assert_eq!(5, tree.merges().len());
        assert_merge((1, 2, 1.0, 2), &tree.merges()[0]);
        assert_merge((3, 4, 1.0, 2), &tree.merges()[1]);
        let triple = ward(1.0, 2.0, 2.5);
        let five = ward(3.0, 2.0, 10.5 - 5.0 / 3.0);
        let root = ward(5.0, 1.0, 30.0 - 5.2);
        assert_merge((0, 6, triple, 3), &tree.merges()[2]);
        assert_merge((7, 8, five, 5), &tree.merges()[3]);
        assert_merge((5, 9, root, 6), &tree.merges()[4]);
        assert!(tree.is_monotonic());
        assert_eq!(vec![5, 3, 4, 0, 1, 2], tree.leaf_order());
    }

    #[test]
    fn test_merged_cluster_joins_later() {
        init();
        // 0 and 2 are closest; 1 joins their cluster afterwards
        let tree = ward_linkage(names(3), &[0.6, 0.1, 0.5]).unwrap();
        assert_merge((0, 2, 0.1, 2), &tree.merges()[0]);
        let expected = ((2.0 * 0.36 + 2.0 * 0.25 - 0.01) / 3.0f64).sqrt();
        assert_merge((1, 3, expected, 3), &tree.merges()[1]);
        assert_eq!(vec![1, 0, 2], tree.leaf_order());
    }

    #[test]
    fn test_ties_take_lowest_pair() {
        init();
        // Equidistant points stay equidistant after each Ward update, so
        // every step is a tie
        let tree = ward_linkage(names(4), &[0.5; 6]).unwrap();
        assert_merge((0, 1, 0.5, 2), &tree.merges()[0]);
        assert_merge((2, 4, 0.5, 3), &tree.merges()[1]);
        assert_merge((3, 5, 0.5, 4), &tree.merges()[2]);
    }

    #[test]
    fn test_deterministic() {
        init();
        let condensed = [0.3, 0.7, 0.2, 0.4, 0.9, 0.3, 0.3, 0.8, 0.5, 0.6];
        let tree1 = ward_linkage(names(5), &condensed).unwrap();
        let tree2 = ward_linkage(names(5), &condensed).unwrap();
        assert_eq!(tree1, tree2);
        assert_eq!(4, tree1.merges().len());
        let last = tree1.merges().last().unwrap();
        let mut covered = tree1.members(last.left);
        covered.extend(tree1.members(last.right));
        covered.sort_unstable();
        assert_eq!(vec![0, 1, 2, 3, 4], covered);
    }

    #[test]
    fn test_non_finite_distance() {
        init();
        match ward_linkage(names(3), &[0.3, std::f64::NAN, 0.2]) {
            Err(ComparisonError::NonFiniteDistance { left, right, .. }) => {
                assert_eq!(0, left);
                assert_eq!(2, right);
            }
            other => panic!("Unexpected result {:?}", other),
        }
        assert!(ward_linkage(names(2), &[std::f64::INFINITY]).is_err());
    }

    #[test]
    fn test_single_leaf() {
        init();
        let tree = ward_linkage(names(1), &[]).unwrap();
        assert!(tree.merges().is_empty());
        assert_eq!(vec![0], tree.leaf_order());
        assert!(ward_linkage(vec![], &[]).is_err());
        assert!(ward_linkage(names(3), &[0.1]).is_err());
    }

    #[test]
    fn test_cluster_from_similarity() {
        init();
        let s = SimilarityMatrix::from_condensed(names(3), &[0.9, 0.2, 0.3]).unwrap();
        let tree = cluster(&s).unwrap();
        assert_eq!(2, tree.merges().len());
        assert_eq!(0, tree.merges()[0].left);
        assert_eq!(1, tree.merges()[0].right);
        assert!((tree.merges()[0].distance - (1.0 - 0.9)).abs() < 1e-12);
    }
}
