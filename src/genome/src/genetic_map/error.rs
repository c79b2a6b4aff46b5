use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeneticMapError {
    #[error("Failed to parse '{}' into a valid genetic map", map.display())]
    ParseMap{map: PathBuf},

    #[error("Failed to open genetic map file")]
    Open,

    #[error("Genetic map is empty")]
    Empty,

    #[error("Malformed genetic map header. Expected the first line to start with '{0}'")]
    InvalidHeader(&'static str),

    #[error("Line {0} appears to be invalid")]
    InvalidLine(usize),

    #[error("Failed to parse position field @ line {0}")]
    ParsePos(usize),

    #[error("Failed to parse cumulative probability field @ line {0}")]
    ParseCdf(usize),

    #[error("File appears to be missing a field @ line {0}")]
    InvalidFields(usize),

    #[error("Cumulative probabilities must be non-decreasing @ line {0}")]
    DecreasingCdf(usize),

    #[error("Genetic map does not contain a non-zero distribution")]
    NullDistribution,
}
