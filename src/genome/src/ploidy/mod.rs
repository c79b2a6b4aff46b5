use std::{fmt::{self, Display, Formatter}, str::FromStr};

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid ploidy '{0}'. Expected one of [none, haploid, diploid, polyploid]")]
pub struct ParsePloidyError(String);

/// Number of homologous copies of a reference sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ploidy {
    None,
    Haploid,
    Diploid,
    Polyploid,
}

impl Ploidy {
    /// Raw copy count. `None` for polyploid sequences, whose copy count is undefined.
    #[must_use]
    pub fn count(self) -> Option<usize> {
        match self {
            Self::None      => Some(0),
            Self::Haploid   => Some(1),
            Self::Diploid   => Some(2),
            Self::Polyploid => None,
        }
    }

    /// Copy count used for inheritance and genotype arity: polyploid collapses to a single copy.
    #[must_use]
    pub fn effective_count(self) -> usize {
        self.count().unwrap_or(1)
    }

    /// Ploidy matching an explicit copy count.
    #[must_use]
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Self::None,
            1 => Self::Haploid,
            2 => Self::Diploid,
            _ => Self::Polyploid,
        }
    }
}

impl Display for Ploidy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            Self::None      => "none",
            Self::Haploid   => "haploid",
            Self::Diploid   => "diploid",
            Self::Polyploid => "polyploid",
        })
    }
}

impl FromStr for Ploidy {
    type Err = ParsePloidyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none"      => Ok(Self::None),
            "haploid"   => Ok(Self::Haploid),
            "diploid"   => Ok(Self::Diploid),
            "polyploid" => Ok(Self::Polyploid),
            other       => Err(ParsePloidyError(other.to_string())),
        }
    }
}
