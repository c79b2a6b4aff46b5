use std::{fs::File, path::Path};

use located_error::prelude::*;
use log::debug;
use serde::{Deserialize, Serialize};

use super::PriorsError;

/// Average length of homozygous MNP events.
pub const AVERAGE_HOMO_MNP_LENGTH: f64 = 2.1;
/// Average length of heterozygous MNP events.
pub const AVERAGE_HETERO_MNP_LENGTH: f64 = 5.8;

/// Per-base event rates and length distributions of a genome.
///
/// # Fields
/// - `snp_rate_hetero`, `snp_rate_homo`          : rate of SNPs per base pair.
/// - `mnp_base_rate_hetero`, `mnp_base_rate_homo`: proportion of base pairs affected by MNPs.
/// - `mnp_distribution`  : weight of each MNP length. Entry `i` is the weight of length `i`, so
///                         that entries 0 and 1 are null.
/// - `indel_event_rate`  : rate of indel events per base pair.
/// - `indel_distribution`: weight of each indel length. Entry `i` is the weight of length `i + 1`.
/// - `substitutions`     : `substitutions[ref][alt]` weight of each base substitution, in `A, C, G, T`
///                         order. Diagonal entries are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenomePriorParams {
    pub snp_rate_hetero     : f64,
    pub snp_rate_homo       : f64,
    pub mnp_base_rate_hetero: f64,
    pub mnp_base_rate_homo  : f64,
    pub mnp_distribution    : Vec<f64>,
    pub indel_event_rate    : f64,
    pub indel_distribution  : Vec<f64>,
    pub substitutions       : [[f64; 4]; 4],
}

const TRANSITION: f64 = 2.0 / 3.0;
const TRANSVERSION: f64 = 1.0 / 6.0;

impl Default for GenomePriorParams {
    /// Human-like priors.
    fn default() -> Self {
        Self {
            snp_rate_hetero     : 0.000_52,
            snp_rate_homo       : 0.000_28,
            mnp_base_rate_hetero: 0.000_03,
            mnp_base_rate_homo  : 0.000_02,
            mnp_distribution    : vec![0.0, 0.0, 0.4, 0.2, 0.1, 0.1, 0.1, 0.1],
            indel_event_rate    : 0.000_15,
            indel_distribution  : vec![0.43, 0.16, 0.09, 0.08, 0.05, 0.04, 0.03, 0.03, 0.03, 0.06],
            substitutions       : [
                //  A             C             G             T
                [0.0,          TRANSVERSION, TRANSITION,   TRANSVERSION], // A
                [TRANSVERSION, 0.0,          TRANSVERSION, TRANSITION  ], // C
                [TRANSITION,   TRANSVERSION, 0.0,          TRANSVERSION], // G
                [TRANSVERSION, TRANSITION,   TRANSVERSION, 0.0         ], // T
            ],
        }
    }
}

fn check_rate(name: &'static str, value: f64) -> Result<(), PriorsError> {
    match value.is_finite() && value >= 0.0 {
        true  => Ok(()),
        false => Err(PriorsError::InvalidRate{name, value}),
    }
}

fn check_distribution(name: &'static str, weights: &[f64]) -> Result<(), PriorsError> {
    let valid = weights.iter().all(|w| w.is_finite() && *w >= 0.0)
        && weights.iter().any(|w| *w > 0.0);
    match valid {
        true  => Ok(()),
        false => Err(PriorsError::InvalidDistribution(name)),
    }
}

impl GenomePriorParams {
    /// Load priors from a `.yaml` file. Missing fields take their default value.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading genome priors from {}", path.display());
        let file = File::open(path).with_loc(|| PriorsError::OpenParams(path.to_path_buf()))?;
        let params: Self = serde_yaml::from_reader(file).with_loc(|| PriorsError::ParseParams(path.to_path_buf()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("snp_rate_hetero",      self.snp_rate_hetero),
            ("snp_rate_homo",        self.snp_rate_homo),
            ("mnp_base_rate_hetero", self.mnp_base_rate_hetero),
            ("mnp_base_rate_homo",   self.mnp_base_rate_homo),
            ("indel_event_rate",     self.indel_event_rate),
        ];
        for (name, value) in rates {
            check_rate(name, value).loc("While validating genome priors")?;
        }
        check_distribution("mnp_distribution", &self.mnp_distribution).loc("While validating genome priors")?;
        if self.mnp_distribution.iter().take(2).any(|w| *w != 0.0) {
            return Err(PriorsError::InvalidMnpDistribution).loc("While validating genome priors")
        }
        check_distribution("indel_distribution", &self.indel_distribution).loc("While validating genome priors")?;
        for (i, row) in self.substitutions.iter().enumerate() {
            let off_diagonal: Vec<f64> = row.iter().enumerate().filter(|(j, _)| *j != i).map(|(_, w)| *w).collect();
            if check_distribution("substitutions", &off_diagonal).is_err() {
                let base = char::from(genome::Base::KNOWN[i].to_ascii());
                return Err(PriorsError::InvalidSubstitutionRow(base)).loc("While validating genome priors")
            }
        }
        Ok(())
    }

    /// Rate of SNP events.
    #[must_use]
    pub fn snp_event_rate(&self) -> f64 {
        self.snp_rate_hetero + self.snp_rate_homo
    }

    /// Rate of MNP events, derived from the MNP base rates and the average MNP lengths.
    #[must_use]
    pub fn mnp_event_rate(&self) -> f64 {
        self.mnp_base_rate_homo / AVERAGE_HOMO_MNP_LENGTH + self.mnp_base_rate_hetero / AVERAGE_HETERO_MNP_LENGTH
    }
}
