use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Too many tries during variant generation: {0} consecutive candidates were rejected")]
    TooManyRetries(usize),

    #[error("Invalid fixed-step distance: expected a strictly positive value")]
    InvalidDistance,

    #[error("Invalid allele frequency {0}. Expected a value within [0, 1]")]
    InvalidFrequency(f64),

    #[error("Invalid target variant count {0}. Expected a finite, non-negative value")]
    InvalidTarget(f64),
}
