use std::{fmt::{self, Display, Formatter}, path::Path};

use ahash::AHashMap;
use genome::{Ploidy, ReferenceGenome, ReferenceSequence, ReferenceSource, Sex};
use located_error::{prelude::*, loc};
use log::{debug, info, trace, warn};
use vcf_io::{genotype::MISSING, Genotype, Vcf, VcfHeader, VcfRecord, FORMAT_GT};

use crate::{crossover::CrossoverSelector, stats::VariantStatistics, records_by_chrom, warn_unplaced};

mod error;
pub use error::ChildSimError;

mod haplotype;
pub use haplotype::HaplotypePointer;

/// A child to simulate, along with the names of its parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trio {
    pub father: String,
    pub mother: String,
    pub child : String,
    pub sex   : Sex,
}

impl Trio {
    #[must_use]
    pub fn new(father: &str, mother: &str, child: &str, sex: Sex) -> Self {
        Self{father: father.to_string(), mother: mother.to_string(), child: child.to_string(), sex}
    }
}

impl Display for Trio {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) <- father: {}, mother: {}", self.child, self.sex, self.father, self.mother)
    }
}

/// Trio, resolved against a VCF header.
struct TrioSamples<'t> {
    trio      : &'t Trio,
    father_idx: usize,
    mother_idx: usize,
    father_sex: Sex,
    mother_sex: Sex,
}

impl<'t> TrioSamples<'t> {
    /// Locate both parents, and register the child within `header`.
    ///
    /// Parent sexes are read from `##SAMPLE` lines, defaulting to a male father and a female mother.
    fn prepare(trio: &'t Trio, header: &mut VcfHeader) -> Result<Self> {
        let father_idx = header.require_sample(&trio.father).loc("While searching for the father")?;
        let mother_idx = header.require_sample(&trio.mother).loc("While searching for the mother")?;
        let father_sex = header.sample_sex(&trio.father).unwrap_or(Sex::Male);
        let mother_sex = header.sample_sex(&trio.mother).unwrap_or(Sex::Female);

        header.add_sample(&trio.child)?;
        if !trio.sex.is_either() {
            header.add_sample_sex(&trio.child, trio.sex);
        }
        header.add_pedigree(&trio.child, &trio.father, &trio.mother);
        info!("Father: {} ({father_sex}), mother: {} ({mother_sex}), child: {} ({})", trio.father, trio.mother, trio.child, trio.sex);
        Ok(Self{trio, father_idx, mother_idx, father_sex, mother_sex})
    }
}

/// Simulated variants and crossovers of a child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildStatistics {
    pub variants         : VariantStatistics,
    pub father_crossovers: usize,
    pub mother_crossovers: usize,
}

impl Display for ChildStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}. Father crossovers: {}, mother crossovers: {}", self.variants, self.father_crossovers, self.mother_crossovers)
    }
}

/// Inheritance state of one parent along a single chromosome.
///
/// # Fields
/// - `sample_idx`: VCF column of the parent.
/// - `count`     : effective copy count of the parent.
/// - `pointer`   : copy currently transmitted to the child. `None` if the parent holds no copy, or the child
///                 inherits nothing.
/// - `obligatory`: position of the obligatory crossover.
/// - `per_base`  : probability of an extra crossover, per base.
struct ParentMeiosis {
    sample_idx: usize,
    count     : usize,
    pointer   : Option<HaplotypePointer>,
    obligatory: Option<usize>,
    per_base  : f64,
}

impl ParentMeiosis {
    /// Advance the haplotype pointer if a crossover occurred within `(last_pos, pos]`.
    fn advance(&mut self, rng: &mut fastrand::Rng, last_pos: usize, pos: usize) -> bool {
        let Some(pointer) = self.pointer else {
            return false
        };
        if self.count < 2 || pos <= last_pos {
            return false
        }
        let obligatory = self.obligatory.map_or(false, |point| last_pos < point && point <= pos);
        let crossed = obligatory || (self.per_base > 0.0 && rng.f64() < (pos - last_pos) as f64 * self.per_base);
        if crossed {
            self.pointer = Some(pointer.advance());
        }
        crossed
    }

    fn read_genotype(&self, record: &VcfRecord, sample: &str) -> Result<Genotype> {
        let (chrom, pos) = (record.chrom().to_string(), record.start() + 1);
        let raw = record.sample_value(self.sample_idx, FORMAT_GT)
            .with_loc(|| ChildSimError::MissingGenotype{sample: sample.to_string(), chrom: chrom.clone(), pos})?;
        let genotype = match raw {
            MISSING => Genotype::reference(self.count),
            gt      => gt.parse::<Genotype>()?,
        };
        if genotype.len() != self.count {
            return loc!(ChildSimError::GenotypeArity{sample: sample.to_string(), chrom, pos, expected: self.count, found: genotype.len()})
        }
        Ok(genotype)
    }

    /// Allele transmitted to the child at `record`.
    fn transmitted(&self, record: &VcfRecord, sample: &str) -> Result<Option<usize>> {
        let pointer = self.pointer.with_loc(|| ChildSimError::MissingHaplotype{sample: sample.to_string(), chrom: record.chrom().to_string()})?;
        let genotype = self.read_genotype(record, sample)?;
        Ok(genotype.alleles()[pointer.index()])
    }
}

/// Per-chromosome inheritance state of a trio.
struct TrioState<'s, 't> {
    samples     : &'s TrioSamples<'t>,
    chrom       : String,
    child_ploidy: Ploidy,
    father      : ParentMeiosis,
    mother      : ParentMeiosis,
}

impl<'s, 't> TrioState<'s, 't> {
    fn new(
        samples  : &'s TrioSamples<'t>,
        sequences: [&ReferenceSequence; 3],
        selector : &mut CrossoverSelector,
        rng      : &mut fastrand::Rng,
    ) -> Result<Self> {
        let [child, father, mother] = sequences;
        let (father_count, mother_count) = (father.effective_count(), mother.effective_count());
        let desc = format!("father={} + mother={} -> child={}", father.ploidy, mother.ploidy, child.ploidy);
        let chrom = child.name.clone();
        match child.ploidy.count() {
            Some(1) if father_count == 0 && mother_count == 0 => return loc!(ChildSimError::IllegalPloidy{chrom, desc}),
            Some(2) if father_count == 0 || mother_count == 0 => return loc!(ChildSimError::IllegalPloidy{chrom, desc}),
            Some(n) if n > 2                                  => return loc!(ChildSimError::UnsupportedPloidy{chrom, desc}),
            _ => {},
        }

        let per_base = match child.length {
            0   => 0.0,
            len => selector.extra_crossover_frequency() / len as f64,
        };
        let mother_point = match mother_count > 1 {
            true  => Some(selector.choose_position(rng, child, Sex::Female)?),
            false => None,
        };
        let father_point = match father_count > 1 {
            true  => Some(selector.choose_position(rng, child, Sex::Male)?),
            false => None,
        };

        let inherits = child.ploidy.count() != Some(0);
        let mother_hap = if inherits { HaplotypePointer::random(rng, mother_count) } else { None };
        let father_hap = if inherits { HaplotypePointer::random(rng, father_count) } else { None };
        debug!("{chrom} ({desc}): child {} starts on father haplotype {:?} and mother haplotype {:?}. Obligatory crossovers: father {:?}, mother {:?}",
            samples.trio.child, father_hap.map(|p| p.index()), mother_hap.map(|p| p.index()), father_point, mother_point
        );

        Ok(Self {
            samples,
            chrom,
            child_ploidy: child.ploidy,
            father: ParentMeiosis{sample_idx: samples.father_idx, count: father_count, pointer: father_hap, obligatory: father_point, per_base},
            mother: ParentMeiosis{sample_idx: samples.mother_idx, count: mother_count, pointer: mother_hap, obligatory: mother_point, per_base},
        })
    }

    /// Apply crossovers located between two consecutive records. Returns `(father, mother)` crossover flags.
    fn advance(&mut self, rng: &mut fastrand::Rng, last_pos: usize, pos: usize) -> (bool, bool) {
        let father = self.father.advance(rng, last_pos, pos);
        let mother = self.mother.advance(rng, last_pos, pos);
        if father || mother {
            debug!("Crossover for child {} in {}:{}-{}. Father haplotype: {:?}, mother haplotype: {:?}",
                self.samples.trio.child, self.chrom, last_pos + 1, pos + 1,
                self.father.pointer.map(|p| p.index()), self.mother.pointer.map(|p| p.index())
            );
        }
        (father, mother)
    }

    fn child_genotype(&self, record: &VcfRecord) -> Result<Genotype> {
        let trio = self.samples.trio;
        Ok(match self.child_ploidy {
            Ploidy::None      => Genotype::missing(),
            // Maternal inheritance of polyploid sequences, such as the mitochondria.
            Ploidy::Polyploid => record.genotype(self.mother.sample_idx)?.with_loc(|| ChildSimError::MissingGenotype{
                sample: trio.mother.clone(), chrom: record.chrom().to_string(), pos: record.start() + 1
            })?,
            Ploidy::Haploid   => {
                let allele = match self.father.count > self.mother.count {
                    true  => self.father.transmitted(record, &trio.father)?,
                    false => self.mother.transmitted(record, &trio.mother)?,
                };
                Genotype::new(vec![allele], true)
            },
            Ploidy::Diploid   => Genotype::new(vec![
                self.father.transmitted(record, &trio.father)?,
                self.mother.transmitted(record, &trio.mother)?,
            ], true),
        })
    }
}

/// Resolved reference sequence of `seq_id`, for a given sex.
fn sequence<'g>(genomes: &'g AHashMap<Sex, ReferenceGenome>, sex: Sex, seq_id: usize) -> Result<&'g ReferenceSequence> {
    genomes.get(&sex)
        .and_then(|genome| genome.sequences().get(seq_id))
        .with_loc(|| format!("Missing reference sequence {seq_id} for sex {sex}"))
}

/// Simulates children from the genotypes of their parents, modelling crossover driven haplotype inheritance.
///
/// # Fields
/// - `reference`         : reference sequences and ploidy specification.
/// - `rng`               : seeded random number generator.
/// - `seed`              : seed of `rng`, written into output headers.
/// - `default_ploidy`    : ploidy of sequences absent from the reference specification.
/// - `crossovers`        : crossover position selector.
/// - `warned_out_of_order`: whether out of order records were already reported.
pub struct ChildSampleSimulator<'a, R: ReferenceSource + ?Sized> {
    reference          : &'a R,
    rng                : fastrand::Rng,
    seed               : u64,
    default_ploidy     : Ploidy,
    crossovers         : CrossoverSelector,
    warned_out_of_order: bool,
}

impl<'a, R: ReferenceSource + ?Sized> ChildSampleSimulator<'a, R> {
    pub fn new(reference: &'a R, seed: u64, crossovers: CrossoverSelector) -> Self {
        Self{reference, rng: fastrand::Rng::with_seed(seed), seed, default_ploidy: Ploidy::Diploid, crossovers, warned_out_of_order: false}
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

    fn warn_out_of_order(&mut self) {
        if !self.warned_out_of_order {
            warn!("Out of order VCF records encountered, crossover simulation may be affected.");
            self.warned_out_of_order = true;
        }
    }

    /// Append one column per trio child to `vcf`. Records located on sequences absent from the reference are dropped.
    pub fn simulate(&mut self, vcf: Vcf, trios: &[Trio]) -> Result<(Vcf, Vec<ChildStatistics>)> {
        let reference = self.reference;
        let Vcf{mut header, records} = vcf;
        if !header.has_format(FORMAT_GT) {
            return loc!(ChildSimError::MissingGenotypeFormat)
        }
        let samples = trios.iter().map(|trio| TrioSamples::prepare(trio, &mut header)).collect::<Result<Vec<_>>>()?;
        header.set_seed(self.seed);

        let genomes = [Sex::Male, Sex::Female, Sex::Either].into_iter()
            .map(|sex| Ok((sex, reference.genome(sex, self.default_ploidy)?)))
            .collect::<Result<AHashMap<_, _>>>()?;

        let mut stats: Vec<ChildStatistics> = trios.iter()
            .map(|trio| ChildStatistics{variants: VariantStatistics::new(&trio.child), ..Default::default()})
            .collect();
        let mut by_chrom = records_by_chrom(records);
        let mut seen = false;
        let mut out = Vec::new();

        for seq_id in 0..reference.num_sequences() {
            let mut states = samples.iter().map(|trio| {
                let sequences = [
                    sequence(&genomes, trio.trio.sex, seq_id)?,
                    sequence(&genomes, trio.father_sex, seq_id)?,
                    sequence(&genomes, trio.mother_sex, seq_id)?,
                ];
                TrioState::new(trio, sequences, &mut self.crossovers, &mut self.rng)
            }).collect::<Result<Vec<_>>>()?;

            let chrom = reference.name(seq_id)?;
            let records = by_chrom.remove(chrom).unwrap_or_default();
            let mut last_pos = 0;
            for mut record in records {
                seen = true;
                let pos = record.start();
                if pos < last_pos {
                    self.warn_out_of_order();
                } else {
                    for (state, stat) in states.iter_mut().zip(stats.iter_mut()) {
                        let (father, mother) = state.advance(&mut self.rng, last_pos, pos);
                        stat.father_crossovers += usize::from(father);
                        stat.mother_crossovers += usize::from(mother);
                    }
                }

                for (state, stat) in states.iter().zip(stats.iter_mut()) {
                    let genotype = state.child_genotype(&record)?;
                    let idx = record.add_sample();
                    record.set_genotype(idx, &genotype)?;
                    stat.variants.tally(&record, &genotype);
                }
                trace!("{chrom}:{} -> {record}", pos + 1);
                last_pos = pos;
                out.push(record);
            }
        }
        warn_unplaced(&by_chrom);

        if !seen {
            warn!("No input variants! (is the VCF empty, or against an incorrect reference?)");
        }
        for stat in &stats {
            info!("{stat}");
        }
        Ok((Vcf{header, records: out}, stats))
    }

    /// Read `input`, add one simulated column per trio child, and write the result into `output`.
    pub fn mutate_individual(&mut self, input: impl AsRef<Path>, output: impl AsRef<Path>, trios: &[Trio]) -> Result<Vec<ChildStatistics>> {
        let (input, output) = (input.as_ref(), output.as_ref());
        let children = trios.iter().map(|trio| trio.child.as_str()).collect::<Vec<_>>().join(", ");
        info!("Simulating children [{children}] from {}", input.display());
        let vcf = Vcf::from_path(input)?;
        let (vcf, stats) = self.simulate(vcf, trios).with_loc(|| ChildSimError::Simulate(children.clone()))?;
        vcf_io::write_vcf(output, &vcf.header, &vcf.records)
            .with_loc(|| format!("While writing children into {}", output.display()))?;
        Ok(stats)
    }
}
