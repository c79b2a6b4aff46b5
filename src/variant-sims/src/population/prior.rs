use genome::{base, ReferenceSource};
use located_error::prelude::*;
use log::debug;

use super::{PopulationVariant, VariantSource};
use crate::{allele_frequency::AlleleFrequencyChooser, priors::{PopulationPriors, VariantType}};

/// Proposes biallelic variants at uniformly drawn positions, following a set of population priors.
///
/// # Fields
/// - `reference`: reference sequences.
/// - `priors`   : variant type, length and substitution distributions.
/// - `chooser`  : allele frequency source.
/// - `lengths`  : length of each reference sequence.
/// - `total`    : total reference length.
pub struct PriorVariantSource<'a, R: ReferenceSource + ?Sized, A: AlleleFrequencyChooser> {
    reference: &'a R,
    priors   : PopulationPriors,
    chooser  : A,
    lengths  : Vec<usize>,
    total    : u64,
}

impl<'a, R: ReferenceSource + ?Sized, A: AlleleFrequencyChooser> PriorVariantSource<'a, R, A> {
    pub fn new(reference: &'a R, priors: PopulationPriors, chooser: A) -> Result<Self> {
        let lengths = (0..reference.num_sequences()).map(|id| reference.length(id)).collect::<Result<Vec<_>>>()?;
        let total = reference.total_length()?;
        Ok(Self{reference, priors, chooser, lengths, total})
    }

    /// Expected number of variants per haplotype: `total length x event rate`.
    #[must_use]
    pub fn default_target(&self) -> f64 {
        (self.total as f64 * self.priors.rate()).floor()
    }

    /// Uniform position across the whole reference, as `(seq_id, offset)`.
    fn next_position(&self, rng: &mut fastrand::Rng) -> Option<(usize, usize)> {
        let mut pos = (rng.f64() * self.total as f64) as u64;
        for (seq_id, len) in self.lengths.iter().enumerate() {
            let len = *len as u64;
            if pos < len {
                return Some((seq_id, pos as usize))
            }
            pos -= len;
        }
        None
    }

    fn fill_alleles(&self, rng: &mut fastrand::Rng, seq_id: usize, position: usize) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut kind = self.priors.choose_type(rng)?;
        let mut len  = self.priors.choose_length(rng, kind);
        if position + len >= self.lengths[seq_id] {
            kind = VariantType::Snp;
            len  = 1;
        }

        let read = |len| self.reference.read(seq_id, position, len);
        Ok(match kind {
            VariantType::Snp => {
                let ref_allele = read(1)?.to_vec();
                let alt = self.priors.choose_alt_snp(rng, base::encode(&ref_allele)[0])?;
                (ref_allele, base::decode(&alt))
            },
            VariantType::Mnp => {
                let ref_allele = read(len)?.to_vec();
                let alt = self.priors.choose_alt_mnp(rng, &base::encode(&ref_allele))?;
                (ref_allele, base::decode(&alt))
            },
            VariantType::Delete => {
                let ref_allele = read(len + 1)?.to_vec();
                let alt = vec![ref_allele[0]];
                (ref_allele, alt)
            },
            VariantType::Insert => {
                let template = read(len + 1)?;
                let ref_allele = template[..1].to_vec();
                let mut alt = base::decode(&self.priors.choose_alt_mnp(rng, &base::encode(template))?);
                alt[0] = ref_allele[0];
                (ref_allele, alt)
            },
            VariantType::InsDel => self.fill_insdel(rng, seq_id, position, len)?,
        })
    }

    /// Delete `len` bases after the anchor, and insert a random sequence of independently drawn length.
    fn fill_insdel(&self, rng: &mut fastrand::Rng, seq_id: usize, position: usize, len: usize) -> Result<(Vec<u8>, Vec<u8>)> {
        let ref_allele = self.reference.read(seq_id, position, len + 1)?.to_vec();
        let inserted = self.priors.choose_length(rng, VariantType::InsDel);
        let inserted = self.priors.choose_alt_insertion(rng, base::encode(&ref_allele[1..2])[0], inserted)?;
        let alt = [&ref_allele[..1], &base::decode(&inserted)].concat();
        Ok((ref_allele, alt))
    }
}

impl<'a, R: ReferenceSource + ?Sized, A: AlleleFrequencyChooser> VariantSource for PriorVariantSource<'a, R, A> {
    fn next_variant(&mut self, rng: &mut fastrand::Rng) -> Result<Option<PopulationVariant>> {
        let Some((seq_id, start)) = self.next_position(rng) else {
            return Ok(None)
        };
        let freq = self.chooser.choose_alt_frequency(rng);
        let (ref_allele, alt) = self.fill_alleles(rng, seq_id, start)
            .with_loc(|| format!("While generating a variant at {seq_id}:{start}"))?;
        debug!("Candidate {seq_id}:{start} {} -> {} (AF={freq})", String::from_utf8_lossy(&ref_allele), String::from_utf8_lossy(&alt));
        Ok(Some(PopulationVariant{seq_id, start, ref_allele, alts: vec![alt], frequencies: vec![freq]}))
    }
}
