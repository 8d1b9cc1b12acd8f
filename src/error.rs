use std;

/// Fatal conditions for a comparison run. Degenerate metric inputs (empty
/// profiles, too few windows etc.) are not errors, they score 0.0.
#[derive(thiserror::Error, Debug)]
pub enum ComparisonError {
    #[error("at least 2 genomes are required for comparison, found {found}")]
    TooFewGenomes { found: usize },

    #[error("genome {strain} has no sequence")]
    EmptyGenome { strain: String },

    #[error("strain name {strain} was specified more than once")]
    DuplicateStrain { strain: String },

    #[error("genome {strain} contains invalid symbol {symbol:?} at position {position}")]
    InvalidSymbol {
        strain: String,
        symbol: char,
        position: usize,
    },

    #[error("kmer length must be between 1 and {max}, found {k}")]
    InvalidKmerLength { k: usize, max: usize },

    #[error("{parameter} must be greater than 0")]
    InvalidWindowSize { parameter: &'static str },

    #[error("composite weights must sum to 1.0, found {sum}")]
    WeightConfiguration { sum: f64 },

    #[error("non-finite distance {value} between clusters {left} and {right}")]
    NonFiniteDistance {
        left: usize,
        right: usize,
        value: f64,
    },

    #[error("matrix shape mismatch: {0}")]
    MatrixShape(String),

    #[error("failed to parse sequence file {path}: {message}")]
    FastaParse { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ComparisonError>;
