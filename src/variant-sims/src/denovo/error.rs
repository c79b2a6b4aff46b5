use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeNovoError {
    #[error("Input VCF does not declare a GT FORMAT field")]
    MissingGenotypeFormat,

    #[error("Sequence {chrom}: unsupported ploidy {ploidy} for de novo mutations")]
    UnsupportedPloidy{chrom: String, ploidy: String},

    #[error("Missing genotype for sample {sample} at {chrom}:{pos}")]
    MissingGenotype{sample: String, chrom: String, pos: usize},

    #[error("Failed to simulate de novo mutations for sample '{0}'")]
    Simulate(String),
}
