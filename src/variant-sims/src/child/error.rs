use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChildSimError {
    #[error("Input VCF does not declare a GT FORMAT field")]
    MissingGenotypeFormat,

    #[error("Sequence {chrom}: illegal ploidy combination {desc}")]
    IllegalPloidy{chrom: String, desc: String},

    #[error("Sequence {chrom}: unsupported ploidy combination {desc}")]
    UnsupportedPloidy{chrom: String, desc: String},

    #[error("Genotype with incorrect ploidy for sample {sample} at {chrom}:{pos}. Expected {expected} alleles, found {found}")]
    GenotypeArity{sample: String, chrom: String, pos: usize, expected: usize, found: usize},

    #[error("Missing genotype for sample {sample} at {chrom}:{pos}")]
    MissingGenotype{sample: String, chrom: String, pos: usize},

    #[error("Missing haplotype pointer for sample {sample} on {chrom}")]
    MissingHaplotype{sample: String, chrom: String},

    #[error("Failed to simulate child sample '{0}'")]
    Simulate(String),
}
