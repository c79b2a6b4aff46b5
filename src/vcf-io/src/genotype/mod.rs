use std::{fmt::{self, Display, Formatter}, str::FromStr};

use itertools::Itertools;

use crate::VcfError;

/// Textual representation of a missing allele, or of a missing genotype.
pub const MISSING: &str = ".";

pub const PHASED_SEPARATOR: char = '|';
pub const UNPHASED_SEPARATOR: char = '/';

/// Per-sample genotype: one allele index per haplotype copy.
///
/// `None` is a missing allele, `Some(0)` the reference allele and `Some(k)` the k-th alternate allele.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genotype {
    alleles: Vec<Option<usize>>,
    phased : bool,
}

impl Genotype {
    #[must_use]
    pub fn new(alleles: Vec<Option<usize>>, phased: bool) -> Self {
        Self{alleles, phased}
    }

    /// Phased genotype built from explicit allele indices.
    #[must_use]
    pub fn phased(alleles: &[usize]) -> Self {
        Self::new(alleles.iter().copied().map(Some).collect(), true)
    }

    /// Homozygous reference genotype carrying `copies` alleles.
    #[must_use]
    pub fn reference(copies: usize) -> Self {
        Self::new(vec![Some(0); copies], true)
    }

    /// Genotype of a sample holding no copy of the sequence: `.`
    #[must_use]
    pub fn missing() -> Self {
        Self::new(Vec::new(), false)
    }

    #[must_use]
    pub fn alleles(&self) -> &[Option<usize>] {
        &self.alleles
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alleles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alleles.is_empty()
    }

    #[must_use]
    pub fn is_phased(&self) -> bool {
        self.phased
    }

    /// `true` if the genotype is the single missing marker `.`
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.alleles.iter().all(Option::is_none)
    }
}

impl FromStr for Genotype {
    type Err = VcfError;

    /// Parse a `GT` field. A bare `.` yields a single missing allele.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let phased = !s.contains(UNPHASED_SEPARATOR);
        let alleles = s.split(|c: char| c == PHASED_SEPARATOR || c == UNPHASED_SEPARATOR)
            .map(|allele| match allele {
                MISSING => Ok(None),
                idx     => idx.parse::<usize>().map(Some).map_err(|_| VcfError::ParseAllele(idx.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self{alleles, phased})
    }
}

impl Display for Genotype {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.alleles.is_empty() {
            return write!(f, "{MISSING}")
        }
        let separator = if self.phased { PHASED_SEPARATOR } else { UNPHASED_SEPARATOR };
        let joined = self.alleles.iter()
            .map(|allele| allele.map_or_else(|| MISSING.to_string(), |idx| idx.to_string()))
            .join(&separator.to_string());
        write!(f, "{joined}")
    }
}
