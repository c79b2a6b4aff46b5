use std::path::Path;

use genome::ReferenceSource;
use itertools::Itertools;
use located_error::prelude::*;
use vcf_io::{VcfHeader, VcfRecord, INFO_ALLELE_FREQ};

/// A polymorphic site of the simulated population.
///
/// # Fields
/// - `seq_id`     : 0-based id of the reference sequence.
/// - `start`      : 0-based start position.
/// - `ref_allele` : reference bases (uppercase ascii).
/// - `alts`       : alternate alleles (uppercase ascii).
/// - `frequencies`: population frequency of each alternate allele.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationVariant {
    pub seq_id     : usize,
    pub start      : usize,
    pub ref_allele : Vec<u8>,
    pub alts       : Vec<Vec<u8>>,
    pub frequencies: Vec<f64>,
}

/// Format a frequency with at most 3 decimals, without trailing zeros.
pub(crate) fn format_frequency(freq: f64) -> String {
    let formatted = format!("{freq:.3}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other     => other.to_string(),
    }
}

fn ascii(bases: &[u8]) -> String {
    String::from_utf8_lossy(bases).into_owned()
}

impl PopulationVariant {
    /// Ordering key within a population: `(seq_id, start)`.
    #[must_use]
    pub fn key(&self) -> (usize, usize) {
        (self.seq_id, self.start)
    }

    /// 0-based exclusive end of the reference span.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.ref_allele.len()
    }

    /// Probability that a random haplotype carries a non-reference allele (`1 - P(ref)`).
    #[must_use]
    pub fn alt_frequency_sum(&self) -> f64 {
        self.frequencies.iter().sum()
    }

    pub fn to_vcf_record<R: ReferenceSource + ?Sized>(&self, reference: &R) -> Result<VcfRecord> {
        let chrom = reference.name(self.seq_id).loc("While converting a population variant into a VCF record")?;
        let mut record = VcfRecord::new(chrom, self.start, ascii(&self.ref_allele));
        for alt in &self.alts {
            record.add_alt(ascii(alt));
        }
        record.set_info(INFO_ALLELE_FREQ, self.frequencies.iter().map(|f| format_frequency(*f)).join(","));
        Ok(record)
    }
}

/// Header of a sites-only population VCF.
pub fn population_header<R: ReferenceSource + ?Sized>(reference: &R, seed: u64) -> Result<VcfHeader> {
    let mut header = VcfHeader::default();
    header.set_seed(seed);
    for seq_id in 0..reference.num_sequences() {
        header.add_contig(reference.name(seq_id)?, reference.length(seq_id)?);
    }
    header.add_info_line(INFO_ALLELE_FREQ, "A", "Float", "Allele Frequency");
    Ok(header)
}

/// Write population variants as a sites-only VCF. The output is BGZF-compressed if `path` ends with `.gz`
pub fn write_population_vcf<R: ReferenceSource + ?Sized>(path: impl AsRef<Path>, variants: &[PopulationVariant], reference: &R, seed: u64) -> Result<()> {
    let header = population_header(reference, seed)?;
    let records = variants.iter().map(|variant| variant.to_vcf_record(reference)).collect::<Result<Vec<_>>>()?;
    vcf_io::write_vcf(path.as_ref(), &header, &records)
        .with_loc(|| format!("While writing population variants into {}", path.as_ref().display()))
}
