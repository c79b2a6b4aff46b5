use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlleleFrequencyError {
    #[error("Invalid allele frequency bias {0}. Bias must lie within [-1, 1]")]
    InvalidBias(f64),

    #[error("Invalid fixed allele frequency {0}. Expected a value within [0, 1]")]
    InvalidFixedFrequency(f64),

    #[error("Failed to open allele frequency table {}", .0.display())]
    OpenTable(PathBuf),

    #[error("Failed to read line {0} of the allele frequency table")]
    ReadLine(usize),

    #[error("Malformed allele frequency table line {line}: '{content}'. Expected '<frequency> <count>'")]
    MalformedLine{line: usize, content: String},

    #[error("Invalid frequency {freq} at line {line} of the allele frequency table. Expected a value within [0, 1]")]
    InvalidFrequency{line: usize, freq: f64},

    #[error("Out of order frequency {freq} at line {line} of the allele frequency table")]
    OutOfOrder{line: usize, freq: f64},

    #[error("Invalid count {count} at line {line} of the allele frequency table. Expected a finite, non-negative value")]
    InvalidCount{line: usize, count: f64},

    #[error("Allele frequency table does not contain any positive count")]
    EmptyTable,
}
