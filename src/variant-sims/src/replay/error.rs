use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Missing genotype for sample {sample} at {chrom}:{pos}")]
    MissingGenotype{sample: String, chrom: String, pos: usize},

    #[error("Genotype with incorrect ploidy for sample {sample} at {chrom}:{pos}. Expected {expected} alleles, found {found}")]
    GenotypeArity{sample: String, chrom: String, pos: usize, expected: usize, found: usize},

    #[error("Genotype of sample {sample} at {chrom}:{pos} refers to an unknown allele index {allele}")]
    UnknownAllele{sample: String, chrom: String, pos: usize, allele: usize},

    #[error("Encountered a reference allele at {chrom}:{pos} overlapped by a previous long variant (may be representable using an ALT of \"*\"). Already written up to {chrom}:{cursor}")]
    OverlappedReference{chrom: String, pos: usize, cursor: usize},

    #[error("Encountered a spanning deletion allele \"*\" at {chrom}:{pos}, but this site is not covered by an earlier deletion")]
    UncoveredSpanningDeletion{chrom: String, pos: usize},

    #[error("Symbolic allele '{allele}' at {chrom}:{pos} is not supported")]
    SymbolicAllele{chrom: String, pos: usize, allele: String},

    #[error("Overlapping variants are not supported. Currently at {chrom}:{pos}, already written up to {chrom}:{cursor}")]
    Overlap{chrom: String, pos: usize, cursor: usize},

    #[error("Failed to replay the genome of sample '{0}'")]
    Replay(String),
}
