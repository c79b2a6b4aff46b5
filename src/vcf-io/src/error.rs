use thiserror::Error;

#[derive(Error, Debug)]
pub enum VcfError {
    #[error("Invalid or missing file extension. Accepted format are ['.vcf', '.vcf.gz']")]
    InvalidFileExt,

    #[error("Failed to open VCF file")]
    Open,

    #[error("Failed to create VCF file")]
    Create,

    #[error("Failed to read line {0} of the VCF")]
    ReadLine(usize),

    #[error("Missing '#CHROM' header line")]
    MissingHeader,

    #[error("Expected at least {expected} tab-separated fields, found {found}")]
    MissingFields{expected: usize, found: usize},

    #[error("Invalid position field '{0}'")]
    ParsePos(String),

    #[error("Invalid genotype allele '{0}'")]
    ParseAllele(String),

    #[error("Sample column count ({found}) does not match the header ({expected})")]
    SampleCount{expected: usize, found: usize},

    #[error("Sample '{0}' already exists within the VCF header")]
    DuplicateSample(String),

    #[error("Sample '{0}' is not present within the VCF header")]
    MissingSample(String),

    #[error("Sample index {0} is out of bounds")]
    SampleIndex(usize),

    #[error("Failed to write VCF contents")]
    Write,
}
