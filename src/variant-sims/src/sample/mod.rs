use std::path::Path;

use genome::{Ploidy, ReferenceSource, Sex};
use located_error::{prelude::*, loc};
use log::{debug, info, warn};
use vcf_io::{Genotype, Vcf, VcfRecord, FORMAT_GT, INFO_ALLELE_FREQ};

use crate::{distribution::choose_from_cumulative, stats::VariantStatistics, records_by_chrom, warn_unplaced};

mod error;
pub use error::SampleSimError;

/// Tolerance on the sum of allele frequencies of a record, absorbing the rounding of the textual AF field.
const FREQUENCY_SUM_TOLERANCE: f64 = 1e-6;

/// Cumulative allele distribution of a record: alternate alleles first, the reference allele last.
///
/// `Ok(None)` if the record carries no allele frequency annotation.
fn allele_distribution(record: &VcfRecord) -> Result<Option<Vec<f64>>> {
    let Some(field) = record.info(INFO_ALLELE_FREQ) else {
        return Ok(None)
    };
    let (chrom, pos) = (record.chrom().to_string(), record.start() + 1);
    let frequencies = field.split(',')
        .map(|value| value.parse::<f64>().ok()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .with_loc(|| SampleSimError::InvalidFrequency{chrom: chrom.clone(), pos, value: value.to_string()})
        )
        .collect::<Result<Vec<_>>>()?;

    if frequencies.len() != record.alts().len() {
        return loc!(SampleSimError::FrequencyCount{chrom, pos, expected: record.alts().len(), found: frequencies.len()})
    }

    let mut acc = 0.0;
    let mut cumulative: Vec<f64> = frequencies.iter().map(|f| { acc += f; acc }).collect();
    if acc > 1.0 + FREQUENCY_SUM_TOLERANCE {
        return loc!(SampleSimError::FrequencySum{chrom, pos, sum: acc})
    }
    cumulative.push(1.0);
    Ok(Some(cumulative))
}

/// Fallback distribution of a record lacking allele frequencies: uniform over every allele, or reference only.
fn fallback_distribution(record: &VcfRecord, uniform: bool) -> Vec<f64> {
    let num_alleles = record.alts().len() + 1;
    match uniform {
        true  => (1..=num_alleles).map(|i| i as f64 / num_alleles as f64).collect(),
        false => {
            let mut cumulative = vec![0.0; num_alleles];
            cumulative[num_alleles - 1] = 1.0;
            cumulative
        }
    }
}

/// Map a bin of an allele distribution onto a VCF allele index. The last bin is the reference.
fn allele_index(bin: usize, num_alleles: usize) -> usize {
    if bin + 1 >= num_alleles { 0 } else { bin + 1 }
}

/// Draws the genotype of a single, independent individual from population allele frequencies.
///
/// # Fields
/// - `reference`       : reference sequences and ploidy specification.
/// - `rng`             : seeded random number generator.
/// - `seed`            : seed of `rng`, written into output headers.
/// - `default_ploidy`  : ploidy of sequences absent from the reference specification.
/// - `allow_missing_af`: draw alleles uniformly for records lacking an `AF` field. When unset, such records
///                       always yield the reference allele.
pub struct SampleSimulator<'a, R: ReferenceSource + ?Sized> {
    reference       : &'a R,
    rng             : fastrand::Rng,
    seed            : u64,
    default_ploidy  : Ploidy,
    allow_missing_af: bool,
}

impl<'a, R: ReferenceSource + ?Sized> SampleSimulator<'a, R> {
    pub fn new(reference: &'a R, seed: u64) -> Self {
        Self{reference, rng: fastrand::Rng::with_seed(seed), seed, default_ploidy: Ploidy::Diploid, allow_missing_af: true}
    }

    #[must_use]
    pub fn with_default_ploidy(mut self, ploidy: Ploidy) -> Self {
        self.default_ploidy = ploidy;
        self
    }

    #[must_use]
    pub fn allow_missing_af(mut self, allow: bool) -> Self {
        self.allow_missing_af = allow;
        self
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Append a new `sample` column to `vcf`. Records located on sequences absent from the reference are dropped.
    pub fn simulate(&mut self, vcf: Vcf, sample: &str, sex: Sex) -> Result<(Vcf, VariantStatistics)> {
        let Vcf{mut header, records} = vcf;
        let sample_idx = header.add_sample(sample)?;
        header.add_format_line(FORMAT_GT, "1", "String", "Genotype");
        if !sex.is_either() {
            header.add_sample_sex(sample, sex);
        }
        header.set_seed(self.seed);

        let genome = self.reference.genome(sex, self.default_ploidy)?;
        let mut by_chrom = records_by_chrom(records);
        let mut stats = VariantStatistics::new(sample);
        let (mut seen, mut with_af, mut missing_af) = (0usize, 0usize, 0usize);

        let mut out = Vec::new();
        for sequence in genome.sequences() {
            let Some(records) = by_chrom.remove(&sequence.name) else {
                continue
            };
            debug!("Simulating {} genotypes of sample {sample} on {} ({})", records.len(), sequence.name, sequence.ploidy);
            let mut last_end = 0;
            for mut record in records {
                seen += 1;
                let genotype = match sequence.ploidy.count() {
                    Some(0) => Genotype::missing(),
                    _ => {
                        let cumulative = match allele_distribution(&record)? {
                            Some(cumulative) => { with_af += 1; cumulative },
                            None             => { missing_af += 1; fallback_distribution(&record, self.allow_missing_af) },
                        };
                        let mut alleles = Vec::with_capacity(sequence.effective_count());
                        let mut called_alt = false;
                        for _ in 0..sequence.effective_count() {
                            // Overlapping calls cannot be represented: the upstream variant owns the span.
                            let allele = match record.start() < last_end {
                                true  => 0,
                                false => allele_index(choose_from_cumulative(&cumulative, self.rng.f64()), cumulative.len()),
                            };
                            called_alt |= allele != 0;
                            alleles.push(allele);
                        }
                        if called_alt {
                            last_end = last_end.max(record.end());
                        }
                        Genotype::phased(&alleles)
                    }
                };
                record.add_format(FORMAT_GT);
                let idx = record.add_sample();
                debug_assert_eq!(idx, sample_idx);
                record.set_genotype(idx, &genotype)?;
                stats.tally(&record, &genotype);
                out.push(record);
            }
        }
        warn_unplaced(&by_chrom);

        if seen == 0 {
            warn!("No input variants were found when simulating sample {sample}");
        } else if with_af == 0 && !self.allow_missing_af {
            warn!("None of the {seen} input variants carried an {INFO_ALLELE_FREQ} field: sample {sample} is entirely homozygous reference");
        }
        if missing_af > 0 {
            info!("{missing_af} variants lacked an {INFO_ALLELE_FREQ} field. {}",
                if self.allow_missing_af { "Alleles were drawn uniformly" } else { "The reference allele was used" }
            );
        }
        info!("{stats}");
        Ok((Vcf{header, records: out}, stats))
    }

    /// Read `input`, add a simulated `sample` column and write the result into `output`.
    pub fn mutate_individual(&mut self, input: impl AsRef<Path>, output: impl AsRef<Path>, sample: &str, sex: Sex) -> Result<VariantStatistics> {
        let (input, output) = (input.as_ref(), output.as_ref());
        info!("Simulating sample {sample} ({sex}) from {}", input.display());
        let vcf = Vcf::from_path(input)?;
        let (vcf, stats) = self.simulate(vcf, sample, sex).with_loc(|| SampleSimError::Simulate(sample.to_string()))?;
        vcf_io::write_vcf(output, &vcf.header, &vcf.records)
            .with_loc(|| format!("While writing sample {sample} into {}", output.display()))?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use genome::{FastaReference, ReferenceSpec};
    use vcf_io::VcfHeader;

    fn record(chrom: &str, start: usize, ref_allele: &str, alts: &[&str], af: Option<&str>) -> VcfRecord {
        let mut record = VcfRecord::new(chrom, start, ref_allele);
        for alt in alts {
            record.add_alt(*alt);
        }
        if let Some(af) = af {
            record.set_info(INFO_ALLELE_FREQ, af);
        }
        record
    }

    fn population(records: Vec<VcfRecord>) -> Vcf {
        Vcf{header: VcfHeader::default(), records}
    }

    fn reference() -> Result<FastaReference> {
        let spec = ReferenceSpec::parse(
            "version 1\neither\tdef\tdiploid\tlinear\nmale\tseq\tchrX\thaploid\tlinear\nfemale\tseq\tchrY\tnone\tlinear\n"
        )?;
        Ok(FastaReference::from_contigs([("chr1", "ACGT".repeat(25)), ("chrX", "ACGT".repeat(25)), ("chrY", "ACGT".repeat(25))])?.with_spec(spec))
    }

    #[test]
    fn cumulative_allele_distribution() -> Result<()> {
        let cumulative = allele_distribution(&record("chr1", 0, "A", &["C", "G"], Some("0.3,0.2")))?.expect("AF is present");
        assert_eq!(cumulative.len(), 3);
        assert!(approx_eq!(f64, cumulative[0], 0.3, ulps = 2));
        assert!(approx_eq!(f64, cumulative[1], 0.5, ulps = 2));
        // A uniform draw of 0.4 selects the second alternate allele.
        assert_eq!(allele_index(choose_from_cumulative(&cumulative, 0.4), cumulative.len()), 2);
        assert_eq!(allele_index(choose_from_cumulative(&cumulative, 0.1), cumulative.len()), 1);
        assert_eq!(allele_index(choose_from_cumulative(&cumulative, 0.7), cumulative.len()), 0);
        Ok(())
    }

    #[test]
    fn invalid_allele_frequencies() -> Result<()> {
        assert!(allele_distribution(&record("chr1", 0, "A", &["C", "G"], Some("0.3"))).is_err());
        assert!(allele_distribution(&record("chr1", 0, "A", &["C", "G"], Some("0.8,0.3"))).is_err());
        assert!(allele_distribution(&record("chr1", 0, "A", &["C"], Some("abc"))).is_err());
        assert!(allele_distribution(&record("chr1", 0, "A", &["C"], None))?.is_none());
        Ok(())
    }

    #[test]
    fn fallback_distributions() {
        let rec = record("chr1", 0, "A", &["C", "G", "T"], None);
        assert_eq!(fallback_distribution(&rec, true), vec![0.25, 0.5, 0.75, 1.0]);
        assert_eq!(fallback_distribution(&rec, false), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn genotype_arity_follows_ploidy() -> Result<()> {
        let reference = reference()?;
        let records = vec![
            record("chr1", 10, "G", &["T"], Some("0.5")),
            record("chrX", 10, "G", &["T"], Some("0.5")),
            record("chrY", 10, "G", &["T"], Some("0.5")),
            record("chrZ", 10, "G", &["T"], Some("0.5")),
        ];
        let mut simulator = SampleSimulator::new(&reference, 42);
        let (vcf, stats) = simulator.simulate(population(records.clone()), "dad", Sex::Male)?;
        let arity: Vec<usize> = vcf.records.iter().map(|r| r.genotype(0).map(|gt| gt.map_or(0, |gt| gt.len()))).collect::<Result<_>>()?;
        assert_eq!(arity, vec![2, 1, 2]);
        assert_eq!(stats.records, 3);
        assert_eq!(vcf.header.sample_sex("dad"), Some(Sex::Male));
        assert_eq!(vcf.header.seed(), Some(42));

        let (vcf, _) = SampleSimulator::new(&reference, 42).simulate(population(records), "mum", Sex::Female)?;
        let genotypes: Vec<String> = vcf.records.iter().map(|r| r.sample_value(0, FORMAT_GT).unwrap_or_default().to_string()).collect();
        assert_eq!(genotypes[2], ".");
        assert_eq!(genotypes[1].len(), 3);
        Ok(())
    }

    #[test]
    fn overlapping_calls_are_forced_to_reference() -> Result<()> {
        let reference = reference()?;
        let records = vec![
            record("chr1", 10, "GTACG", &["G"], Some("1.0")),
            record("chr1", 12, "A", &["T"], Some("1.0")),
            record("chr1", 15, "T", &["C"], Some("1.0")),
        ];
        let (vcf, _) = SampleSimulator::new(&reference, 1).simulate(population(records), "sm", Sex::Female)?;
        let genotypes: Vec<String> = vcf.records.iter().map(|r| r.sample_value(0, FORMAT_GT).unwrap_or_default().to_string()).collect();
        assert_eq!(genotypes, vec!["1|1", "0|0", "1|1"]);
        Ok(())
    }

    #[test]
    fn strict_mode_ignores_records_without_frequency() -> Result<()> {
        let reference = reference()?;
        let records = (0..20).map(|i| record("chr1", i * 2, "A", &["C"], None)).collect();
        let (vcf, stats) = SampleSimulator::new(&reference, 5).allow_missing_af(false).simulate(population(records), "sm", Sex::Either)?;
        assert_eq!(stats.reference, 20);
        assert!(vcf.header.meta_values("SAMPLE").next().is_none());
        Ok(())
    }

    #[test]
    fn duplicate_sample_is_an_error() -> Result<()> {
        let reference = reference()?;
        let mut header = VcfHeader::default();
        header.add_sample("sm")?;
        let vcf = Vcf{header, records: vec![]};
        assert!(SampleSimulator::new(&reference, 1).simulate(vcf, "sm", Sex::Male).is_err());
        Ok(())
    }

    #[test]
    fn seeded_simulation_is_reproducible() -> Result<()> {
        let reference = reference()?;
        let records: Vec<VcfRecord> = (0..50).map(|i| record("chr1", i * 2, "A", &["C", "G"], Some("0.3,0.2"))).collect();
        let run = || -> Result<Vec<String>> {
            let (vcf, _) = SampleSimulator::new(&reference, 77).simulate(population(records.clone()), "sm", Sex::Male)?;
            Ok(vcf.records.iter().map(ToString::to_string).collect())
        };
        assert_eq!(run()?, run()?);
        Ok(())
    }
}
