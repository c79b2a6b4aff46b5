use std::path::Path;

use genome::{
    reference::{Contig, DefaultSpec, SequenceSpec, REFERENCE_SPEC_FILE},
    Ploidy, ReferenceSequence, ReferenceSource, ReferenceSpec, Sex,
};
use located_error::{prelude::*, loc};
use log::{debug, info};
use vcf_io::{AlleleKind, GenericWriter, Vcf, VcfRecord};

mod error;
pub use error::ReplayError;

/// File extension of replayed genomes.
pub const FASTA_EXTENSION: &str = "fa";

/// Output name of the `copy`-th haplotype of a sequence. Only split sequences carry a `_<copy>` suffix.
#[must_use]
pub fn haplotype_name(name: &str, copy: usize, copies: usize) -> String {
    match copies > 1 {
        true  => format!("{name}_{copy}"),
        false => name.to_string(),
    }
}

/// Explicit haplotype sequences of a single sample, along with their ploidy specification.
#[derive(Debug, Clone)]
pub struct ReplayedGenome {
    pub sample   : String,
    pub sex      : Sex,
    pub sequences: Vec<Contig>,
    pub spec     : ReferenceSpec,
}

impl ReplayedGenome {
    /// Write `<sample>.fa` and its `reference.txt` specification within `output_dir`.
    pub fn write(&self, output_dir: impl AsRef<Path>) -> Result<()> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)
            .with_loc(|| format!("Failed to create output directory {}", output_dir.display()))?;

        let fasta = output_dir.join(format!("{}.{FASTA_EXTENSION}", self.sample));
        info!("Writing genome of sample {} into {}", self.sample, fasta.display());
        let mut writer = GenericWriter::new(Some(&fasta))?;
        for contig in &self.sequences {
            writer.write_fasta(&contig.name, &contig.bases)?;
        }
        writer.finish()?;

        let spec = output_dir.join(REFERENCE_SPEC_FILE);
        std::fs::write(&spec, self.spec.to_string())
            .with_loc(|| format!("Failed to write reference specification into {}", spec.display()))
    }
}

/// Reconstructs the explicit genome of a sample by applying its genotype calls onto the reference.
pub struct SampleReplayer<'a, R: ReferenceSource + ?Sized> {
    reference     : &'a R,
    default_ploidy: Ploidy,
}

impl<'a, R: ReferenceSource + ?Sized> SampleReplayer<'a, R> {
    pub fn new(reference: &'a R) -> Self {
        Self{reference, default_ploidy: Ploidy::Diploid}
    }

    #[must_use]
    pub fn with_default_ploidy(mut self, ploidy: Ploidy) -> Self {
        self.default_ploidy = ploidy;
        self
    }

    /// Build every haplotype of `sample`. The sex of the sample is read from its `##SAMPLE` header line.
    ///
    /// # Behavior
    /// - Diploid sequences are split into two haploid outputs, suffixed with `_0` and `_1`.
    /// - Polyploid sequences are treated as haploid.
    /// - Sequences absent from the sample (ploidy `none`) are not written.
    pub fn replay(&self, vcf: &Vcf, sample: &str) -> Result<ReplayedGenome> {
        let sample_idx = vcf.header.require_sample(sample)?;
        let sex = vcf.header.sample_sex(sample).unwrap_or(Sex::Either);
        debug!("Replaying sample {sample} as {sex}");

        // Lets sequences be mapped against without specifying the same sex.
        let mut spec = ReferenceSpec{
            defaults : vec![DefaultSpec{sex: Sex::Either, ploidy: Ploidy::Haploid, linear: true}],
            sequences: Vec::new(),
        };
        let mut sequences = Vec::new();
        let genome = self.reference.genome(sex, self.default_ploidy)?;
        for sequence in genome.sequences() {
            let copies = sequence.effective_count();
            spec.sequences.extend(Self::haplotype_specs(sequence, sex, copies));
            let records: Vec<&VcfRecord> = vcf.records_on(&sequence.name).collect();
            for copy in 0..copies {
                let bases = self.replay_haplotype(sequence, &records, sample, sample_idx, copy, copies)?;
                sequences.push(Contig{name: haplotype_name(&sequence.name, copy, copies), bases});
            }
        }
        Ok(ReplayedGenome{sample: sample.to_string(), sex, sequences, spec})
    }

    fn haplotype_specs(sequence: &ReferenceSequence, sex: Sex, copies: usize) -> Vec<SequenceSpec> {
        let linear = sequence.linear;
        match copies {
            2 => (0..2).map(|copy| SequenceSpec{
                sex,
                name: haplotype_name(&sequence.name, copy, copies),
                ploidy: Ploidy::Haploid,
                linear,
                haploid_complement: Some(haplotype_name(&sequence.name, 1 - copy, copies)),
            }).collect(),
            1 => vec![SequenceSpec{
                sex,
                name: sequence.name.clone(),
                ploidy: sequence.ploidy,
                linear,
                haploid_complement: sequence.haploid_complement.clone(),
            }],
            _ => Vec::new(),
        }
    }

    fn replay_haplotype(&self, sequence: &ReferenceSequence, records: &[&VcfRecord], sample: &str, sample_idx: usize, copy: usize, copies: usize) -> Result<Vec<u8>> {
        let chrom = &sequence.name;
        let mut bases = Vec::with_capacity(sequence.length);
        let mut cursor = 0;
        for record in records {
            let pos = record.start() + 1;
            let genotype = record.genotype(sample_idx)?
                .with_loc(|| ReplayError::MissingGenotype{sample: sample.to_string(), chrom: chrom.clone(), pos})?;
            if genotype.len() != copies {
                return loc!(ReplayError::GenotypeArity{sample: sample.to_string(), chrom: chrom.clone(), pos, expected: copies, found: genotype.len()})
            }

            match genotype.alleles()[copy] {
                None    => {},
                Some(0) => if cursor > record.start() {
                    return loc!(ReplayError::OverlappedReference{chrom: chrom.clone(), pos, cursor: cursor + 1})
                },
                Some(idx) => {
                    let allele = record.allele(idx)
                        .with_loc(|| ReplayError::UnknownAllele{sample: sample.to_string(), chrom: chrom.clone(), pos, allele: idx})?;
                    match AlleleKind::of(allele) {
                        AlleleKind::SpanningDeletion => if cursor <= record.start() {
                            return loc!(ReplayError::UncoveredSpanningDeletion{chrom: chrom.clone(), pos})
                        },
                        AlleleKind::Symbolic => {
                            return loc!(ReplayError::SymbolicAllele{chrom: chrom.clone(), pos, allele: allele.to_string()})
                        },
                        AlleleKind::Concrete => {
                            self.copy_reference(sequence, &mut bases, cursor, record.start())?;
                            bases.extend(allele.bytes().map(|b| b.to_ascii_uppercase()));
                            cursor = record.end();
                        },
                    }
                },
            }
        }
        self.copy_reference(sequence, &mut bases, cursor, sequence.length)?;
        Ok(bases)
    }

    /// Append reference bases `[from, to)` to `bases`.
    fn copy_reference(&self, sequence: &ReferenceSequence, bases: &mut Vec<u8>, from: usize, to: usize) -> Result<()> {
        if from > to {
            return loc!(ReplayError::Overlap{chrom: sequence.name.clone(), pos: to + 1, cursor: from + 1})
        }
        bases.extend_from_slice(self.reference.read(sequence.seq_id, from, to - from)?);
        Ok(())
    }

    /// Read `input`, replay the genome of `sample` and write it within `output_dir`.
    pub fn replay_sample(&self, input: impl AsRef<Path>, output_dir: impl AsRef<Path>, sample: &str) -> Result<ReplayedGenome> {
        let input = input.as_ref();
        info!("Replaying the genome of sample {sample} from {}", input.display());
        let vcf = Vcf::from_path(input)?;
        let genome = self.replay(&vcf, sample).with_loc(|| ReplayError::Replay(sample.to_string()))?;
        genome.write(output_dir)?;
        Ok(genome)
    }
}
