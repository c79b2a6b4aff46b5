mod error;
pub use error::VcfError;

pub mod genotype;
pub use genotype::Genotype;

pub mod record;
pub use record::{VcfRecord, AlleleKind, FORMAT_GT, FORMAT_DE_NOVO, INFO_ALLELE_FREQ, SPANNING_DELETION};

pub mod header;
pub use header::VcfHeader;

pub mod read;
pub use read::{Vcf, VcfReader};

pub mod write;
pub use write::{GenericWriter, VcfWriter, write_vcf};
