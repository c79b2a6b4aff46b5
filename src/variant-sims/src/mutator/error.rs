use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MutatorError {
    #[error("Empty mutation specification")]
    EmptySpecification,

    #[error("Invalid mutation specification '{0}': trailing count without an operation")]
    TrailingCount(String),

    #[error("Invalid mutation specification '{spec}': unknown operation '{op}'. Expected one of [X, Y, I, J, D, =, E]")]
    InvalidOperation{spec: String, op: char},

    #[error("Invalid repeat count within mutation specification '{0}'")]
    InvalidCount(String),

    #[error("Heterozygous mutation specification '{0}' must consume the same reference length on both haplotypes")]
    UnbalancedHeterozygous(String),
}
