use std;

use bird_tool_utils::clap_utils::*;
use clap::*;
use rayon::prelude::*;

use crate::error::Result;
use crate::genome::Genome;
use crate::genome_comparison::{compare_genomes, ComparisonParameters, GenomeComparison};
use crate::genome_stats::{calculate_genome_stats, load_genome, strain_name_from_path};
use crate::output_writers;

/// Log the error and exit, for failures the user needs to fix.
fn exit_on_error<T>(result: Result<T>, context: &str) -> T {
    match result {
        Ok(t) => t,
        Err(e) => {
            error!("{}: {}", context, e);
            std::process::exit(1);
        }
    }
}

pub fn parse_comparison_parameters(m: &clap::ArgMatches) -> ComparisonParameters {
    ComparisonParameters {
        kmer_length: *m.get_one::<usize>("kmer-length").unwrap(),
        identity_window_size: *m.get_one::<usize>("window-size").unwrap(),
        gc_window_size: *m.get_one::<usize>("gc-window-size").unwrap(),
        min_contig_length: *m.get_one::<usize>("min-contig-length").unwrap(),
    }
}

/// Load every genome in parallel, dropping those with no sequence.
fn load_genomes(genome_fasta_paths: &[String], min_contig_length: usize) -> Vec<Genome> {
    info!("Reading {} genomes ..", genome_fasta_paths.len());
    let loaded: Vec<Genome> = exit_on_error(
        genome_fasta_paths
            .par_iter()
            .map(|path| load_genome(path, &strain_name_from_path(path), min_contig_length))
            .collect::<Result<Vec<_>>>(),
        "Failed to load genomes",
    );

    let mut genomes = Vec::with_capacity(loaded.len());
    for (path, genome) in genome_fasta_paths.iter().zip(loaded.into_iter()) {
        if genome.is_empty() {
            warn!("No usable sequence found in {}, excluding it", path);
        } else {
            info!("{}: {} bp loaded", genome.id(), genome.total_length());
            genomes.push(genome);
        }
    }
    genomes
}

fn log_summary(comparison: &GenomeComparison, genomes: &[Genome]) {
    info!("Compared genomes:");
    for genome in genomes {
        info!(
            "  {}: {} bp, GC {:.1}%",
            genome.id(),
            genome.total_length(),
            genome.gc_content()
        );
    }
    for summary in comparison.pairwise_summaries() {
        info!(
            "{} vs {}: similarity = {:.3}, distance = {:.3}",
            summary.strain1, summary.strain2, summary.composite_similarity, summary.distance
        );
    }
    if let (Some(similarity), Some(distance)) =
        (comparison.mean_similarity(), comparison.mean_distance())
    {
        info!("Mean similarity: {:.3}", similarity);
        info!("Mean distance: {:.3}", distance);
    }
}

fn write_outputs(m: &clap::ArgMatches, comparison: &GenomeComparison) {
    if let Some(path) = m.get_one::<String>("output-similarity-matrix") {
        info!("Writing composite similarity matrix to {}", path);
        exit_on_error(
            output_writers::write_similarity_matrix(path, &comparison.composite),
            "Failed to write similarity matrix",
        );
    }
    if let Some(path) = m.get_one::<String>("output-component-matrices") {
        info!("Writing component similarity matrices to {}", path);
        exit_on_error(
            output_writers::write_component_matrices(path, comparison),
            "Failed to write component matrices",
        );
    }
    if let Some(path) = m.get_one::<String>("output-pairwise-comparisons") {
        info!("Writing pairwise comparisons to {}", path);
        exit_on_error(
            output_writers::write_pairwise_comparisons(path, &comparison.pairwise_summaries()),
            "Failed to write pairwise comparisons",
        );
    }
    if let Some(path) = m.get_one::<String>("output-linkage") {
        info!("Writing linkage table to {}", path);
        exit_on_error(
            output_writers::write_linkage(path, &comparison.tree),
            "Failed to write linkage table",
        );
    }
    if let Some(path) = m.get_one::<String>("output-newick") {
        info!("Writing dendrogram to {}", path);
        exit_on_error(
            output_writers::write_newick(path, &comparison.tree),
            "Failed to write newick tree",
        );
    }
}

pub fn run_compare_subcommand(
    matches: &clap::ArgMatches,
    program_basename: &str,
    program_version: &str,
) {
    let m = matches.subcommand_matches("compare").unwrap();
    set_log_level(m, true, program_basename, program_version);

    let num_threads: usize = *m.get_one::<usize>("threads").unwrap();
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .expect("Programming error: rayon initialised multiple times");

    let genome_fasta_files: Vec<String> = match parse_list_of_genome_fasta_files(m, true) {
        Ok(paths) => paths,
        Err(e) => {
            error!("Failed to parse genome paths: {}", e);
            std::process::exit(1);
        }
    };
    let parameters = parse_comparison_parameters(m);
    exit_on_error(parameters.validate(), "Invalid parameters");

    if let Some(path) = m.get_one::<String>("output-genome-statistics") {
        info!("Calculating assembly statistics ..");
        let stats = exit_on_error(
            genome_fasta_files
                .par_iter()
                .map(|fasta| {
                    calculate_genome_stats(fasta).map(|s| (strain_name_from_path(fasta), s))
                })
                .collect::<Result<Vec<_>>>(),
            "Failed to calculate genome statistics",
        );
        exit_on_error(
            output_writers::write_genome_statistics(path, &stats),
            "Failed to write genome statistics",
        );
    }

    let genomes = load_genomes(&genome_fasta_files, parameters.min_contig_length);
    info!("Comparing {} genomes ..", genomes.len());
    let comparison = exit_on_error(
        compare_genomes(&genomes, &parameters),
        "Genome comparison failed",
    );

    log_summary(&comparison, &genomes);
    write_outputs(m, &comparison);
    info!("Finished");
}

pub fn add_compare_subcommand(app: clap::Command) -> clap::Command {
    let mut compare_subcommand = add_clap_verbosity_flags(Command::new("compare"))
        .about("Compare genomes by composite similarity and cluster them by Ward linkage")
        .arg(
            Arg::new("kmer-length")
                .long("kmer-length")
                .help("Length of k-mers in compositional profiles")
                .value_parser(value_parser!(usize))
                .default_value(crate::DEFAULT_KMER_LENGTH),
        )
        .arg(
            Arg::new("window-size")
                .long("window-size")
                .help("Window size for co-ordinate aligned sequence identity")
                .value_parser(value_parser!(usize))
                .default_value(crate::DEFAULT_WINDOW_SIZE),
        )
        .arg(
            Arg::new("gc-window-size")
                .long("gc-window-size")
                .help("Window size for local GC content correlation")
                .value_parser(value_parser!(usize))
                .default_value(crate::DEFAULT_GC_WINDOW_SIZE),
        )
        .arg(
            Arg::new("min-contig-length")
                .long("min-contig-length")
                .help("Ignore contigs shorter than this when loading genomes")
                .value_parser(value_parser!(usize))
                .default_value(crate::DEFAULT_MIN_CONTIG_LENGTH),
        )
        .arg(
            Arg::new("output-similarity-matrix")
                .long("output-similarity-matrix")
                .help("Output composite similarity matrix as CSV to this file"),
        )
        .arg(
            Arg::new("output-component-matrices")
                .long("output-component-matrices")
                .help("Output component and composite similarities as long CSV to this file"),
        )
        .arg(
            Arg::new("output-pairwise-comparisons")
                .long("output-pairwise-comparisons")
                .help("Output one CSV line per strain pair with all similarities"),
        )
        .arg(
            Arg::new("output-genome-statistics")
                .long("output-genome-statistics")
                .help("Output assembly statistics of each genome as CSV to this file"),
        )
        .arg(
            Arg::new("output-linkage")
                .long("output-linkage")
                .help("Output the Ward linkage merge table as TSV to this file"),
        )
        .arg(
            Arg::new("output-newick")
                .long("output-newick")
                .help("Output the dendrogram in Newick format to this file"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .help("Number of CPU threads to use")
                .value_parser(value_parser!(usize))
                .default_value("1"),
        );

    compare_subcommand = add_genome_specification_arguments(compare_subcommand);

    app.subcommand(compare_subcommand)
}
