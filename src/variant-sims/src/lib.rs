use ahash::AHashMap;
use log::warn;
use vcf_io::VcfRecord;

pub mod distribution;
pub mod mutator;
pub mod priors;
pub mod allele_frequency;
pub mod population;
pub mod crossover;
pub mod stats;

pub mod sample;
pub mod child;
pub mod denovo;
pub mod replay;

pub use mutator::Mutator;
pub use priors::{GenomePriorParams, PopulationPriors, VariantType};
pub use allele_frequency::{AlleleFrequencyChooser, FixedAlleleFrequency, TableAlleleFrequencyChooser};
pub use population::{PopulationVariant, PopulationVariantGenerator, PriorVariantSource, FixedStepVariantSource};
pub use crossover::CrossoverSelector;
pub use sample::SampleSimulator;
pub use child::ChildSampleSimulator;
pub use denovo::DeNovoSampleSimulator;
pub use replay::SampleReplayer;
pub use stats::VariantStatistics;

/// Group records by sequence name, preserving their relative order.
pub(crate) fn records_by_chrom(records: Vec<VcfRecord>) -> AHashMap<String, Vec<VcfRecord>> {
    let mut by_chrom: AHashMap<String, Vec<VcfRecord>> = AHashMap::new();
    for record in records {
        match by_chrom.get_mut(record.chrom()) {
            Some(chrom) => chrom.push(record),
            None        => { by_chrom.insert(record.chrom().to_string(), vec![record]); },
        }
    }
    by_chrom
}

/// Report records left over after every reference sequence was processed.
pub(crate) fn warn_unplaced(leftovers: &AHashMap<String, Vec<VcfRecord>>) {
    for (chrom, records) in leftovers {
        warn!("Dropping {} records located on {chrom}, which is absent from the reference", records.len());
    }
}
