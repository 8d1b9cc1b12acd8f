use std;
use std::io::Write;

use crate::error::Result;
use crate::genome_comparison::{GenomeComparison, PairwiseComparison};
use crate::genome_stats::GenomeAssemblyStats;
use crate::hierarchical_clusterer::ClusterTree;
use crate::pairwise_metric::PairwiseMetric;
use crate::similarity_matrix::SimilarityMatrix;

/// Square CSV with strain names as both header row and first column.
pub fn write_similarity_matrix(path: &str, matrix: &SimilarityMatrix) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec![String::new()];
    header.extend(matrix.strain_names().iter().cloned());
    wtr.write_record(&header)?;
    for (i, name) in matrix.strain_names().iter().enumerate() {
        let mut record = vec![name.clone()];
        record.extend(matrix.row(i).iter().map(|v| format!("{}", v)));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    debug!("Wrote {}x{} matrix to {}", matrix.len(), matrix.len(), path);
    Ok(())
}

/// Every cell of every component matrix and the composite, one per line.
pub fn write_component_matrices(path: &str, comparison: &GenomeComparison) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&["metric", "strain1", "strain2", "similarity"])?;
    let mut matrices: Vec<(&str, &SimilarityMatrix)> = PairwiseMetric::ALL
        .iter()
        .map(|m| (m.name(), comparison.components.get(*m)))
        .collect();
    matrices.push(("composite", &comparison.composite));

    for (metric_name, matrix) in matrices {
        for (i, strain1) in matrix.strain_names().iter().enumerate() {
            for (j, strain2) in matrix.strain_names().iter().enumerate() {
                let value = format!("{}", matrix.get(i, j));
                wtr.write_record(&[
                    metric_name,
                    strain1.as_str(),
                    strain2.as_str(),
                    value.as_str(),
                ])?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_pairwise_comparisons(path: &str, summaries: &[PairwiseComparison]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&[
        "strain1",
        "strain2",
        "kmer_similarity",
        "sequence_similarity",
        "gc_similarity",
        "size_similarity",
        "composite_similarity",
        "genetic_distance",
    ])?;
    for s in summaries {
        wtr.write_record(&[
            s.strain1.clone(),
            s.strain2.clone(),
            format!("{}", s.kmer_similarity),
            format!("{}", s.sequence_similarity),
            format!("{}", s.gc_similarity),
            format!("{}", s.size_similarity),
            format!("{}", s.composite_similarity),
            format!("{}", s.distance),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_genome_statistics(path: &str, stats: &[(String, GenomeAssemblyStats)]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&[
        "strain",
        "contigs",
        "total_length",
        "gc_percent",
        "at_percent",
        "n50",
        "longest_contig",
        "shortest_contig",
        "mean_contig_length",
        "median_contig_length",
        "ambiguous_bases",
    ])?;
    for (strain, s) in stats {
        wtr.write_record(&[
            strain.clone(),
            format!("{}", s.num_contigs),
            format!("{}", s.total_length),
            format!("{:.2}", s.gc_percent()),
            format!("{:.2}", s.at_percent()),
            format!("{}", s.n50),
            format!("{}", s.longest_contig),
            format!("{}", s.shortest_contig),
            format!("{:.0}", s.mean_contig_length),
            format!("{:.0}", s.median_contig_length),
            format!("{}", s.num_ambiguous_bases()),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Tab separated merge table, one row per merge in order.
pub fn write_linkage(path: &str, tree: &ClusterTree) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    wtr.write_record(&["step", "left", "right", "distance", "size"])?;
    for (step, merge) in tree.merges().iter().enumerate() {
        wtr.write_record(&[
            format!("{}", step),
            format!("{}", merge.left),
            format!("{}", merge.right),
            format!("{}", merge.distance),
            format!("{}", merge.size),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn newick_label(name: &str) -> String {
    if name
        .chars()
        .any(|c| c.is_whitespace() || "(),:;[]'".contains(c))
    {
        format!("'{}'", name.replace('\'', "''"))
    } else {
        name.to_string()
    }
}

/// Newick tree with branch lengths being the difference in merge heights.
pub fn newick_string(tree: &ClusterTree) -> String {
    fn node(tree: &ClusterTree, id: usize, parent_height: f64, out: &mut String) {
        match tree.children(id) {
            None => out.push_str(&newick_label(&tree.leaf_names()[id])),
            Some((left, right)) => {
                let height = tree.height(id);
                out.push('(');
                node(tree, left, height, out);
                out.push(',');
                node(tree, right, height, out);
                out.push(')');
            }
        }
        out.push_str(&format!(":{}", parent_height - tree.height(id)));
    }

    let mut out = String::new();
    if tree.num_leaves() == 0 {
        out.push(';');
        return out;
    }
    let root = tree.root();
    match tree.children(root) {
        None => out.push_str(&newick_label(&tree.leaf_names()[root])),
        Some((left, right)) => {
            let height = tree.height(root);
            out.push('(');
            node(tree, left, height, &mut out);
            out.push(',');
            node(tree, right, height, &mut out);
            out.push(')');
        }
    }
    out.push(';');
    out
}

pub fn write_newick(path: &str, tree: &ClusterTree) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "{}", newick_string(tree))?;
    Ok(())
}
