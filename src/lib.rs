pub mod comparison_argument_parsing;
pub mod composite;
pub mod error;
pub mod genome;
pub mod genome_comparison;
pub mod genome_stats;
pub mod hierarchical_clusterer;
pub mod kmer_profile;
pub mod output_writers;
pub mod pairwise_metric;
pub mod similarity_matrix;

#[macro_use]
extern crate log;
extern crate clap;
extern crate rayon;
#[macro_use]
extern crate lazy_static;

pub use crate::error::{ComparisonError, Result};
pub use crate::genome::Genome;
pub use crate::genome_comparison::{compare_genomes, ComparisonParameters, GenomeComparison};

pub const DEFAULT_KMER_LENGTH: &str = "4";
pub const DEFAULT_WINDOW_SIZE: &str = "1000";
pub const DEFAULT_GC_WINDOW_SIZE: &str = "1000";
pub const DEFAULT_MIN_CONTIG_LENGTH: &str = "0";

pub const AUTHOR: &str =
    "Ben J. Woodcroft, Centre for Microbiome Research, Queensland University of Technology";
