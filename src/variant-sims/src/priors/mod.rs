use std::fmt::{self, Display, Formatter};

use genome::{base::NUM_KNOWN_BASES, Base};
use located_error::prelude::*;
use log::debug;

use crate::distribution::{cumulative_distribution, choose_from_cumulative, try_choose_from_cumulative};

mod error;
pub use error::PriorsError;

mod params;
pub use params::{GenomePriorParams, AVERAGE_HOMO_MNP_LENGTH, AVERAGE_HETERO_MNP_LENGTH};

/// Class of a generated population variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantType {
    Snp,
    Mnp,
    Insert,
    Delete,
    /// Deletion followed by an insertion.
    InsDel,
}

impl VariantType {
    /// Types, in the order of the type distribution.
    pub const ALL: [VariantType; 5] = [Self::Snp, Self::Mnp, Self::Insert, Self::Delete, Self::InsDel];

    #[must_use]
    pub fn is_indel(self) -> bool {
        matches!(self, Self::Insert | Self::Delete | Self::InsDel)
    }
}

impl Display for VariantType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            Self::Snp    => "SNP",
            Self::Mnp    => "MNP",
            Self::Insert => "INSERT",
            Self::Delete => "DELETE",
            Self::InsDel => "INSDEL",
        })
    }
}

/// Probability model of population variants.
///
/// # Fields
/// - `rate`          : overall per-base event rate.
/// - `type_cdf`      : cumulative distribution over [`VariantType::ALL`].
/// - `mnp_cdf`       : cumulative MNP length distribution (index = length).
/// - `indel_cdf`     : cumulative indel length distribution (index = length - 1).
/// - `substitutions` : per reference base (A, C, G, T), cumulative distribution over alternate bases.
#[derive(Debug, Clone)]
pub struct PopulationPriors {
    rate         : f64,
    type_cdf     : Vec<f64>,
    mnp_cdf      : Vec<f64>,
    indel_cdf    : Vec<f64>,
    substitutions: [Vec<f64>; NUM_KNOWN_BASES],
}

impl PopulationPriors {
    pub fn new(params: &GenomePriorParams) -> Result<Self> {
        params.validate()?;
        let indel_portion = params.indel_event_rate / 3.0;
        let type_rates = [
            params.snp_event_rate(),
            params.mnp_event_rate(),
            indel_portion, // insert
            indel_portion, // delete
            indel_portion, // insdel
        ];
        let rate = type_rates.iter().sum();

        let substitutions = std::array::from_fn(|reference| {
            let weights: Vec<f64> = params.substitutions[reference].iter().enumerate()
                .map(|(alt, w)| if alt == reference { 0.0 } else { *w })
                .collect();
            cumulative_distribution(&weights)
        });

        let priors = Self {
            rate,
            type_cdf : cumulative_distribution(&type_rates),
            mnp_cdf  : cumulative_distribution(&params.mnp_distribution),
            indel_cdf: cumulative_distribution(&params.indel_distribution),
            substitutions,
        };
        debug!("{priors}");
        Ok(priors)
    }

    /// Overall per-base event rate.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn choose_type(&self, rng: &mut fastrand::Rng) -> Result<VariantType> {
        let rand = rng.f64();
        try_choose_from_cumulative(&self.type_cdf, rand)
            .map(|i| VariantType::ALL[i])
            .with_loc(|| PriorsError::UnreachableType(rand))
    }

    /// Draw a length for the given variant type. A random number is consumed, whatever the type.
    pub fn choose_length(&self, rng: &mut fastrand::Rng, kind: VariantType) -> usize {
        let rand = rng.f64();
        match kind {
            VariantType::Snp => 1,
            VariantType::Mnp => choose_from_cumulative(&self.mnp_cdf, rand),
            VariantType::Insert | VariantType::Delete | VariantType::InsDel => choose_from_cumulative(&self.indel_cdf, rand) + 1,
        }
    }

    /// Alternate base code for a reference base code. Unknown bases stay unknown.
    fn choose_alt_base(&self, rng: &mut fastrand::Rng, reference: u8) -> Result<u8> {
        let reference = Base::from_code(reference);
        if !reference.is_known() {
            return Ok(Base::N.code())
        }
        let rand = rng.f64();
        let alt = choose_from_cumulative(&self.substitutions[usize::from(reference.code() - 1)], rand) as u8 + 1;
        if alt == reference.code() {
            return Err(PriorsError::InvalidSubstitution{reference: char::from(reference.to_ascii()), rand})
                .loc("While choosing an alternate base")
        }
        Ok(alt)
    }

    /// Biallelic SNP alternate allele, as base codes.
    pub fn choose_alt_snp(&self, rng: &mut fastrand::Rng, reference: u8) -> Result<Vec<u8>> {
        Ok(vec![self.choose_alt_base(rng, reference)?])
    }

    /// MNP alternate allele, as base codes. Both ends differ from the reference, inner bases are random.
    pub fn choose_alt_mnp(&self, rng: &mut fastrand::Rng, reference: &[u8]) -> Result<Vec<u8>> {
        let len = reference.len();
        if len < 2 {
            return Err(PriorsError::MnpTooShort(len)).loc("While choosing a MNP alternate allele")
        }
        let mut alt = reference.to_vec();
        alt[0] = self.choose_alt_base(rng, reference[0])?;
        alt[len - 1] = self.choose_alt_base(rng, reference[len - 1])?;
        for base in alt.iter_mut().take(len - 1).skip(1) {
            *base = rng.u8(1..=NUM_KNOWN_BASES as u8);
        }
        Ok(alt)
    }

    /// Inserted sequence of an insertion-deletion, as base codes. Its first base differs from the first
    /// deleted base `deleted`, so that the two alleles never share more than their anchor.
    pub fn choose_alt_insertion(&self, rng: &mut fastrand::Rng, deleted: u8, len: usize) -> Result<Vec<u8>> {
        if len == 0 {
            return Err(PriorsError::EmptyInsertion).loc("While choosing an insertion-deletion alternate allele")
        }
        let mut inserted = Vec::with_capacity(len);
        inserted.push(match Base::from_code(deleted).is_known() {
            true  => self.choose_alt_base(rng, deleted)?,
            false => rng.u8(1..=NUM_KNOWN_BASES as u8),
        });
        inserted.extend((1..len).map(|_| rng.u8(1..=NUM_KNOWN_BASES as u8)));
        Ok(inserted)
    }
}

impl Display for PopulationPriors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "PopulationPriors:")?;
        writeln!(f, "  Rate             : {}", self.rate)?;
        writeln!(f, "  Type thresholds  : {:?}", self.type_cdf)?;
        writeln!(f, "  MNP length dist. : {:?}", self.mnp_cdf)?;
        writeln!(f, "  Indel length dist: {:?}", self.indel_cdf)?;
        for (base, cdf) in Base::KNOWN.iter().zip(&self.substitutions) {
            writeln!(f, "  Substitutions[{base}] : {cdf:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn snp_only() -> GenomePriorParams {
        GenomePriorParams {
            snp_rate_hetero     : 0.5,
            snp_rate_homo       : 0.5,
            mnp_base_rate_hetero: 0.0,
            mnp_base_rate_homo  : 0.0,
            indel_event_rate    : 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn overall_rate() -> Result<()> {
        let params = GenomePriorParams::default();
        let priors = PopulationPriors::new(&params)?;
        let want = params.snp_event_rate() + params.mnp_event_rate() + params.indel_event_rate;
        assert!(approx_eq!(f64, priors.rate(), want, epsilon = 1e-15));
        Ok(())
    }

    #[test]
    fn choose_type_follows_rates() -> Result<()> {
        let priors = PopulationPriors::new(&snp_only())?;
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..1000 {
            assert_eq!(priors.choose_type(&mut rng)?, VariantType::Snp);
        }

        let indels = GenomePriorParams{snp_rate_hetero: 0.0, snp_rate_homo: 0.0, mnp_base_rate_hetero: 0.0, mnp_base_rate_homo: 0.0, ..Default::default()};
        let priors = PopulationPriors::new(&indels)?;
        for _ in 0..1000 {
            assert!(priors.choose_type(&mut rng)?.is_indel());
        }
        Ok(())
    }

    #[test]
    fn null_rates_are_unreachable() -> Result<()> {
        let params = GenomePriorParams{indel_event_rate: 0.0, ..snp_only()};
        let params = GenomePriorParams{snp_rate_hetero: 0.0, snp_rate_homo: 0.0, ..params};
        let priors = PopulationPriors::new(&params)?;
        assert_eq!(priors.rate(), 0.0);
        assert!(priors.choose_type(&mut fastrand::Rng::with_seed(1)).is_err());
        Ok(())
    }

    #[test]
    fn lengths() -> Result<()> {
        let params = GenomePriorParams{
            mnp_distribution  : vec![0.0, 0.0, 0.0, 1.0],
            indel_distribution: vec![0.0, 1.0],
            ..Default::default()
        };
        let priors = PopulationPriors::new(&params)?;
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..100 {
            assert_eq!(priors.choose_length(&mut rng, VariantType::Snp), 1);
            assert_eq!(priors.choose_length(&mut rng, VariantType::Mnp), 3);
            assert_eq!(priors.choose_length(&mut rng, VariantType::Delete), 2);
            assert_eq!(priors.choose_length(&mut rng, VariantType::Insert), 2);
        }
        Ok(())
    }

    #[test]
    fn choose_length_always_draws() -> Result<()> {
        let priors = PopulationPriors::new(&GenomePriorParams::default())?;
        let mut a = fastrand::Rng::with_seed(3);
        let mut b = fastrand::Rng::with_seed(3);
        priors.choose_length(&mut a, VariantType::Snp);
        b.f64();
        assert_eq!(a.u64(..), b.u64(..));
        Ok(())
    }

    #[test]
    fn alt_bases_differ_from_reference() -> Result<()> {
        let priors = PopulationPriors::new(&GenomePriorParams::default())?;
        let mut rng = fastrand::Rng::with_seed(11);
        for reference in 1..=4u8 {
            for _ in 0..200 {
                let alt = priors.choose_alt_snp(&mut rng, reference)?;
                assert_eq!(alt.len(), 1);
                assert_ne!(alt[0], reference);
                assert!((1..=4).contains(&alt[0]));
            }
        }
        assert_eq!(priors.choose_alt_snp(&mut rng, Base::N.code())?, vec![Base::N.code()]);
        Ok(())
    }

    #[test]
    fn biased_substitutions() -> Result<()> {
        let mut params = GenomePriorParams::default();
        params.substitutions[Base::A.code() as usize - 1] = [0.0, 0.0, 1.0, 0.0];
        let priors = PopulationPriors::new(&params)?;
        let mut rng = fastrand::Rng::with_seed(5);
        for _ in 0..100 {
            assert_eq!(priors.choose_alt_snp(&mut rng, Base::A.code())?, vec![Base::G.code()]);
        }
        Ok(())
    }

    #[test]
    fn mnp_alleles() -> Result<()> {
        let priors = PopulationPriors::new(&GenomePriorParams::default())?;
        let mut rng = fastrand::Rng::with_seed(13);
        let reference = genome::base::encode(b"ACGTA");
        for _ in 0..100 {
            let alt = priors.choose_alt_mnp(&mut rng, &reference)?;
            assert_eq!(alt.len(), reference.len());
            assert_ne!(alt[0], reference[0]);
            assert_ne!(alt[4], reference[4]);
            assert!(alt.iter().all(|b| (1..=4).contains(b)));
        }
        assert!(priors.choose_alt_mnp(&mut rng, &reference[..1]).is_err());
        Ok(())
    }

    #[test]
    fn insertion_alleles() -> Result<()> {
        let priors = PopulationPriors::new(&GenomePriorParams::default())?;
        let mut rng = fastrand::Rng::with_seed(17);
        for _ in 0..100 {
            let inserted = priors.choose_alt_insertion(&mut rng, Base::C.code(), 3)?;
            assert_eq!(inserted.len(), 3);
            assert_ne!(inserted[0], Base::C.code());
            assert!(inserted.iter().all(|b| (1..=4).contains(b)));
        }
        assert_eq!(priors.choose_alt_insertion(&mut rng, Base::N.code(), 1)?.len(), 1);
        assert!(priors.choose_alt_insertion(&mut rng, Base::A.code(), 0).is_err());
        Ok(())
    }
}
