use std::{collections::VecDeque, fmt::{self, Display, Formatter}, path::Path};

use ahash::AHashMap;
use genome::{Ploidy, ReferenceGenome, ReferenceSource, Sex};
use located_error::{prelude::*, loc};
use log::{debug, info, warn};
use vcf_io::{Genotype, Vcf, VcfRecord, FORMAT_DE_NOVO, FORMAT_GT};

use crate::{
    allele_frequency::FixedAlleleFrequency,
    population::{PopulationVariant, PopulationVariantGenerator, PriorVariantSource},
    priors::PopulationPriors,
    stats::VariantStatistics,
    records_by_chrom, warn_unplaced,
};

mod error;
pub use error::DeNovoError;

/// Value of the de novo FORMAT field for the sample carrying the mutation.
pub const DE_NOVO_FLAG: &str = "Y";

/// Outcome of a de novo simulation.
///
/// # Fields
/// - `variants`  : genotypes of the derived sample.
/// - `generated` : de novo mutations proposed by the generator.
/// - `emitted`   : de novo mutations written into the output.
/// - `collisions`: mutations dropped because they overlap a pre-existing record.
/// - `discarded` : mutations dropped because the derived sample holds no copy of their sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeNovoStatistics {
    pub variants  : VariantStatistics,
    pub generated : usize,
    pub emitted   : usize,
    pub collisions: usize,
    pub discarded : usize,
}

impl Display for DeNovoStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}. De novo mutations: {} generated, {} emitted, {} colliding, {} discarded",
            self.variants, self.generated, self.emitted, self.collisions, self.discarded
        )
    }
}

/// Half-open reference span `[start, end)` of a record.
type Span = (usize, usize);

fn overlaps(a: Span, b: Span) -> bool {
    a.0 < b.1 && b.0 < a.1
}

/// Sample roles within the output VCF.
struct Samples<'s> {
    original    : &'s str,
    original_idx: usize,
    derived_idx : usize,
    /// Sex of every sample, in column order.
    sexes       : Vec<Sex>,
}

/// Adds freshly generated de novo mutations to the genotype of an existing sample.
///
/// # Fields
/// - `reference`         : reference sequences and ploidy specification.
/// - `priors`            : mutation type, length and substitution distributions.
/// - `rng`               : seeded random number generator.
/// - `seed`              : seed of `rng`, written into output headers.
/// - `default_ploidy`    : ploidy of sequences absent from the reference specification.
/// - `expected_mutations`: expected number of de novo mutations per genome.
pub struct DeNovoSampleSimulator<'a, R: ReferenceSource + ?Sized> {
    reference         : &'a R,
    priors            : PopulationPriors,
    rng               : fastrand::Rng,
    seed              : u64,
    default_ploidy    : Ploidy,
    expected_mutations: f64,
}

impl<'a, R: ReferenceSource + ?Sized> DeNovoSampleSimulator<'a, R> {
    pub fn new(reference: &'a R, priors: PopulationPriors, seed: u64, expected_mutations: f64) -> Self {
        Self{reference, priors, rng: fastrand::Rng::with_seed(seed), seed, default_ploidy: Ploidy::Diploid, expected_mutations}
    }

    #[must_use]
    pub fn with_default_ploidy(mut self, ploidy: Ploidy) -> Self {
        self.default_ploidy = ploidy;
        self
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw de novo mutations at a fixed allele frequency of 1.0, regardless of pre-existing variants.
    fn generate_mutations(&mut self) -> Result<Vec<PopulationVariant>> {
        let source = PriorVariantSource::new(self.reference, self.priors.clone(), FixedAlleleFrequency::new(1.0)?)?;
        let mutations = PopulationVariantGenerator::with_target(source, self.expected_mutations)?
            .generate_population(&mut self.rng)
            .loc("While generating de novo mutations")?;
        debug!("Generated {} candidate de novo mutations", mutations.len());
        Ok(mutations)
    }

    /// De novo record, with a genotype for every sample: the derived sample carries the mutation,
    /// every other sample is explicitly homozygous reference.
    fn de_novo_record(&mut self, mutation: &PopulationVariant, samples: &Samples, genomes: &AHashMap<Sex, ReferenceGenome>, copies: usize) -> Result<VcfRecord> {
        let mut record = mutation.to_vcf_record(self.reference)?;
        record.clear_info();
        record.add_format(FORMAT_GT);
        record.add_format(FORMAT_DE_NOVO);

        let derived_gt = match copies {
            1 => Genotype::phased(&[1]),
            _ => match self.rng.bool() {
                true  => Genotype::phased(&[0, 1]),
                false => Genotype::phased(&[1, 0]),
            },
        };
        for sex in &samples.sexes {
            let idx = record.add_sample();
            if idx == samples.derived_idx {
                record.set_genotype(idx, &derived_gt)?;
                record.set_sample_value(idx, FORMAT_DE_NOVO, DE_NOVO_FLAG)?;
            } else {
                let copies = genomes.get(sex)
                    .and_then(|genome| genome.sequence(record.chrom()))
                    .map_or(0, |sequence| sequence.effective_count());
                record.set_genotype(idx, &Genotype::reference(copies))?;
            }
        }
        Ok(record)
    }

    /// Append the derived sample to an existing record.
    fn pass_through(record: &mut VcfRecord, samples: &Samples) -> Result<()> {
        if samples.derived_idx == samples.original_idx {
            return Ok(())
        }
        let gt = record.sample_value(samples.original_idx, FORMAT_GT)
            .with_loc(|| DeNovoError::MissingGenotype{sample: samples.original.to_string(), chrom: record.chrom().to_string(), pos: record.start() + 1})?
            .to_string();
        let idx = record.add_sample();
        record.set_sample_value(idx, FORMAT_GT, gt)
    }

    /// Add de novo mutations to `original`, writing them into the `derived` sample. `derived` may be equal to
    /// `original`, in which case the sample is modified in place.
    pub fn simulate(&mut self, vcf: Vcf, original: &str, derived: &str) -> Result<(Vcf, DeNovoStatistics)> {
        let reference = self.reference;
        let Vcf{mut header, records} = vcf;
        let original_idx = header.require_sample(original).loc("While searching for the original sample")?;
        if !header.has_format(FORMAT_GT) {
            return loc!(DeNovoError::MissingGenotypeFormat)
        }
        header.add_format_line(FORMAT_DE_NOVO, "1", "String", "De novo allele");

        let original_sex = header.sample_sex(original).unwrap_or(Sex::Either);
        let derived_idx = match original == derived {
            true  => original_idx,
            false => {
                let idx = header.add_sample(derived)?;
                if !original_sex.is_either() {
                    header.add_sample_sex(derived, original_sex);
                }
                header.add_derived(derived, original);
                idx
            }
        };
        header.set_seed(self.seed);
        info!("Original sample: {original} ({original_sex}), derived sample: {derived}");

        let sexes = header.samples().iter().map(|name| header.sample_sex(name).unwrap_or(Sex::Either)).collect();
        let samples = Samples{original, original_idx, derived_idx, sexes};
        let genomes = [Sex::Male, Sex::Female, Sex::Either].into_iter()
            .map(|sex| Ok((sex, reference.genome(sex, self.default_ploidy)?)))
            .collect::<Result<AHashMap<_, _>>>()?;
        let original_genome = reference.genome(original_sex, self.default_ploidy)?;

        let mutations = self.generate_mutations()?;
        let mut stats = DeNovoStatistics{variants: VariantStatistics::new(derived), generated: mutations.len(), ..Default::default()};
        let mut by_chrom = records_by_chrom(records);
        let mut seen = false;
        let mut out = Vec::new();

        for sequence in original_genome.sequences() {
            let mut pending: VecDeque<&PopulationVariant> = mutations.iter().filter(|m| m.seq_id == sequence.seq_id).collect();
            let copies = match sequence.ploidy.count() {
                Some(n) if n > 2 => return loc!(DeNovoError::UnsupportedPloidy{chrom: sequence.name.clone(), ploidy: sequence.ploidy.to_string()}),
                _ => sequence.effective_count(),
            };
            if copies == 0 && !pending.is_empty() {
                debug!("Discarding {} de novo mutations on {}: sample {derived} holds no copy of it", pending.len(), sequence.name);
                stats.discarded += pending.len();
                pending.clear();
            }

            let records = by_chrom.remove(&sequence.name).unwrap_or_default();
            let mut previous: Option<Span> = None;
            for next in records.into_iter().map(Some).chain(std::iter::once(None)) {
                let next_span = next.as_ref().map(|record| (record.start(), record.end()));

                // Merge de novo mutations located upstream of the next record.
                while let Some(mutation) = pending.front().copied() {
                    if next_span.map_or(false, |(_, end)| mutation.start >= end) {
                        break
                    }
                    pending.pop_front();
                    let span = (mutation.start, mutation.end());
                    if previous.map_or(false, |prev| overlaps(span, prev)) || next_span.map_or(false, |next| overlaps(span, next)) {
                        warn!("Skipping de novo mutation at {}:{} to avoid a collision with neighboring variants", sequence.name, mutation.start + 1);
                        stats.collisions += 1;
                        continue
                    }
                    let record = self.de_novo_record(mutation, &samples, &genomes, copies)?;
                    debug!("De novo mutation at {}:{}", sequence.name, record.start() + 1);
                    if let Some(gt) = record.genotype(derived_idx)? {
                        stats.variants.tally(&record, &gt);
                    }
                    stats.emitted += 1;
                    out.push(record);
                }

                let Some(mut record) = next else {
                    break
                };
                seen = true;
                Self::pass_through(&mut record, &samples)?;
                if let Some(gt) = record.genotype(derived_idx)? {
                    stats.variants.tally(&record, &gt);
                }
                previous = next_span;
                out.push(record);
            }
        }
        warn_unplaced(&by_chrom);

        if !seen {
            warn!("No input variants! (is the VCF empty, or against an incorrect reference?)");
        }
        info!("{stats}");
        Ok((Vcf{header, records: out}, stats))
    }

    /// Read `input`, add de novo mutations to `original` as the `derived` sample, and write the result into `output`.
    pub fn mutate_individual(&mut self, input: impl AsRef<Path>, output: impl AsRef<Path>, original: &str, derived: &str) -> Result<DeNovoStatistics> {
        let (input, output) = (input.as_ref(), output.as_ref());
        info!("Simulating de novo mutations of {original} from {}", input.display());
        let vcf = Vcf::from_path(input)?;
        let (vcf, stats) = self.simulate(vcf, original, derived).with_loc(|| DeNovoError::Simulate(derived.to_string()))?;
        vcf_io::write_vcf(output, &vcf.header, &vcf.records)
            .with_loc(|| format!("While writing sample {derived} into {}", output.display()))?;
        Ok(stats)
    }
}

/// `true` if the sample at `idx` carries a de novo flag at `record`.
#[must_use]
pub fn is_de_novo(record: &VcfRecord, idx: usize) -> bool {
    record.sample_value(idx, FORMAT_DE_NOVO) == Some(DE_NOVO_FLAG)
}
