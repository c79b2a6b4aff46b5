use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PriorsError {
    #[error("Failed to open genome priors file {}", .0.display())]
    OpenParams(PathBuf),

    #[error("Failed to deserialize genome priors from {}", .0.display())]
    ParseParams(PathBuf),

    #[error("Invalid prior '{name}': {value}. Expected a finite, non-negative rate")]
    InvalidRate{name: &'static str, value: f64},

    #[error("Invalid '{0}' distribution: expected at least one positive, finite weight and no negative weights")]
    InvalidDistribution(&'static str),

    #[error("Invalid MNP length distribution: lengths 0 and 1 must carry a null weight")]
    InvalidMnpDistribution,

    #[error("Invalid substitution weights for reference base {0}: at least one alternate base must carry a positive weight")]
    InvalidSubstitutionRow(char),

    #[error("Invalid variant type distribution for draw {0}")]
    UnreachableType(f64),

    #[error("Invalid substitution distribution for draw {rand} and reference base {reference}")]
    InvalidSubstitution{reference: char, rand: f64},

    #[error("Minimum length of a MNP is 2, got {0}")]
    MnpTooShort(usize),

    #[error("An insertion-deletion must insert at least one base")]
    EmptyInsertion,
}
