use thiserror::Error;

#[derive(Error, Debug)]
pub enum SampleSimError {
    #[error("Invalid allele frequency '{value}' at {chrom}:{pos}")]
    InvalidFrequency{chrom: String, pos: usize, value: String},

    #[error("Number of allele frequencies ({found}) does not match the number of alternate alleles ({expected}) at {chrom}:{pos}")]
    FrequencyCount{chrom: String, pos: usize, expected: usize, found: usize},

    #[error("Allele frequencies sum up to {sum}, above 1.0, at {chrom}:{pos}")]
    FrequencySum{chrom: String, pos: usize, sum: f64},

    #[error("Failed to simulate sample '{0}'")]
    Simulate(String),
}
