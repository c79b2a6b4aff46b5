use std::{collections::BTreeMap, ops::Bound::{Excluded, Unbounded}};

use genome::base;
use located_error::{prelude::*, loc};
use log::{debug, info, trace};

mod error;
pub use error::GeneratorError;

mod variant;
pub use variant::{PopulationVariant, population_header, write_population_vcf};

mod prior;
pub use prior::PriorVariantSource;

mod fixed_step;
pub use fixed_step::FixedStepVariantSource;

/// Maximum number of consecutive rejected candidates before generation aborts.
pub const MAX_RETRIES: usize = 100;

/// Proposes candidate population variants, one at a time.
pub trait VariantSource {
    /// Next candidate, or `None` once positions are exhausted.
    fn next_variant(&mut self, rng: &mut fastrand::Rng) -> Result<Option<PopulationVariant>>;
}

impl<S: VariantSource + ?Sized> VariantSource for Box<S> {
    fn next_variant(&mut self, rng: &mut fastrand::Rng) -> Result<Option<PopulationVariant>> {
        (**self).next_variant(rng)
    }
}

/// Accepted variants, keyed by `(seq_id, start)`.
type AcceptedSet = BTreeMap<(usize, usize), PopulationVariant>;

/// Rejection sampler of population variants.
///
/// # Fields
/// - `source`: candidate variant proposals.
/// - `target`: expected number of variants per haplotype. Generation stops once the accumulated
///             alternate allele frequency mass reaches this value. `None` exhausts the source.
pub struct PopulationVariantGenerator<S: VariantSource> {
    source: S,
    target: Option<f64>,
}

impl<S: VariantSource> PopulationVariantGenerator<S> {
    /// Generate until `source` is exhausted.
    pub fn new(source: S) -> Self {
        Self{source, target: None}
    }

    /// Generate until the accumulated frequency mass reaches `target`.
    pub fn with_target(source: S, target: f64) -> Result<Self> {
        if !target.is_finite() || target < 0.0 {
            return loc!(GeneratorError::InvalidTarget(target))
        }
        Ok(Self{source, target: Some(target)})
    }

    #[must_use]
    pub fn target(&self) -> Option<f64> {
        self.target
    }

    /// A candidate is accepted if it carries alternate alleles, its reference span is not entirely
    /// unknown, and it overlaps none of the already accepted variants.
    fn is_valid(variant: &PopulationVariant, accepted: &AcceptedSet) -> bool {
        if variant.alts.is_empty() || base::all_unknown(&variant.ref_allele) {
            return false
        }
        let key = variant.key();
        if let Some(((seq_id, _), floor)) = accepted.range(..=key).next_back() {
            if *seq_id == variant.seq_id && floor.end() > variant.start {
                return false
            }
        }
        if let Some(((seq_id, higher_start), _)) = accepted.range((Excluded(key), Unbounded)).next() {
            if *seq_id == variant.seq_id && variant.end() > *higher_start {
                return false
            }
        }
        true
    }

    /// Sorted, pairwise non-overlapping population variants.
    pub fn generate_population(&mut self, rng: &mut fastrand::Rng) -> Result<Vec<PopulationVariant>> {
        let mut accepted = AcceptedSet::new();
        if self.target.map_or(false, |target| target <= 0.0) {
            debug!("Null target variant count. Skipping population generation");
            return Ok(Vec::new())
        }

        let mut mass = 0.0;
        'generate: loop {
            let mut retries = 0;
            let variant = loop {
                if retries >= MAX_RETRIES {
                    return loc!(GeneratorError::TooManyRetries(MAX_RETRIES))
                }
                retries += 1;
                match self.source.next_variant(rng)? {
                    None => break 'generate,
                    Some(candidate) if Self::is_valid(&candidate, &accepted) => break candidate,
                    Some(candidate) => trace!("Rejected candidate at {}:{}", candidate.seq_id, candidate.start),
                }
            };

            mass += variant.alt_frequency_sum();
            accepted.insert(variant.key(), variant);
            if self.target.map_or(false, |target| mass >= target) {
                break
            }
        }
        info!("Generated {} population variants (expected variants per haplotype: {mass:.3})", accepted.len());
        Ok(accepted.into_values().collect())
    }
}
