use genome::{base, ReferenceSource};
use located_error::{prelude::*, loc};

use super::{GeneratorError, PopulationVariant, VariantSource};
use crate::mutator::Mutator;

/// Proposes a variant every `distance` bases of every reference sequence, following a mutation specification.
///
/// # Fields
/// - `reference`  : reference sequences.
/// - `mutator`    : homozygous or heterozygous mutation generator.
/// - `distance`   : step between two consecutive candidates.
/// - `frequency`  : total alternate allele frequency of each candidate, split evenly between both haplotypes.
/// - `seq_id`, `pos`: next candidate position.
pub struct FixedStepVariantSource<'a, R: ReferenceSource + ?Sized> {
    reference: &'a R,
    mutator  : Mutator,
    distance : usize,
    frequency: f64,
    seq_id   : usize,
    pos      : usize,
}

impl<'a, R: ReferenceSource + ?Sized> FixedStepVariantSource<'a, R> {
    pub fn new(reference: &'a R, mutator: Mutator, distance: usize, frequency: f64) -> Result<Self> {
        if distance == 0 {
            return loc!(GeneratorError::InvalidDistance)
        }
        if !(0.0..=1.0).contains(&frequency) {
            return loc!(GeneratorError::InvalidFrequency(frequency))
        }
        Ok(Self{reference, mutator, distance, frequency, seq_id: 0, pos: 0})
    }

    /// Indels are shifted one base upstream, to carry an anchor base.
    fn position_adjustment(&self) -> usize {
        usize::from(self.mutator.is_indel())
    }

    /// Next `(seq_id, template start)` whose template fits within its sequence and is not entirely unknown.
    fn next_template(&mut self) -> Result<Option<(usize, usize, Vec<u8>)>> {
        let adjust = self.position_adjustment();
        let template_len = self.mutator.reference_length() + adjust;
        while self.seq_id < self.reference.num_sequences() {
            let seq_len = self.reference.length(self.seq_id)?;
            let pos = self.pos;
            if pos >= seq_len {
                self.seq_id += 1;
                self.pos = 0;
                continue
            }
            self.pos += self.distance;

            let Some(start) = pos.checked_sub(adjust) else {
                continue
            };
            if start + template_len >= seq_len {
                // Every subsequent template of this sequence runs past its end.
                self.pos = seq_len;
                continue
            }
            let template = self.reference.read(self.seq_id, start, template_len)?;
            if !base::all_unknown(template) {
                return Ok(Some((self.seq_id, start, template.to_vec())))
            }
        }
        Ok(None)
    }
}

/// Sort alleles by `(length, bases)`, merge identical alleles, and remove alleles equal to the reference.
fn collapse_alleles(reference: &[u8], alleles: Vec<(Vec<u8>, f64)>) -> Vec<(Vec<u8>, f64)> {
    let mut alleles = alleles;
    alleles.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    let mut collapsed: Vec<(Vec<u8>, f64)> = Vec::with_capacity(alleles.len());
    for (allele, freq) in alleles {
        match collapsed.last_mut() {
            Some((last, last_freq)) if *last == allele => *last_freq += freq,
            _ => collapsed.push((allele, freq)),
        }
    }
    collapsed.retain(|(allele, _)| allele != reference);
    collapsed
}

impl<'a, R: ReferenceSource + ?Sized> VariantSource for FixedStepVariantSource<'a, R> {
    fn next_variant(&mut self, rng: &mut fastrand::Rng) -> Result<Option<PopulationVariant>> {
        let adjust = self.position_adjustment();
        loop {
            let Some((seq_id, start, template)) = self.next_template()? else {
                return Ok(None)
            };
            let codes = base::encode(&template);
            let Some(result) = self.mutator.generate_mutation(&codes, adjust, rng) else {
                continue
            };

            let anchored = |haplotype: Vec<u8>| match adjust {
                0 => haplotype,
                _ => std::iter::once(codes[0]).chain(haplotype).collect(),
            };
            let half = self.frequency * 0.5;
            let alleles = vec![(anchored(result.first), half), (anchored(result.second), half)];
            let (alts, frequencies) = collapse_alleles(&codes, alleles).into_iter()
                .map(|(allele, freq)| (base::decode(&allele), freq))
                .unzip();
            return Ok(Some(PopulationVariant{seq_id, start, ref_allele: template, alts, frequencies}))
        }
    }
}
