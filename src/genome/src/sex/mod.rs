use std::{fmt::{self, Formatter, Display}, str::FromStr, result::Result};

/// Sex of a simulated individual. `Either` matches sex-agnostic reference specification lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sex {
    Male,
    Female,
    Either
}

impl Sex {
    /// Draw a random sex from the provided generator.
    #[must_use]
    pub fn random(rng: &mut fastrand::Rng) -> Self {
        [Self::Female, Self::Male][usize::from(rng.bool())]
    }

    #[must_use]
    pub fn is_either(&self) -> bool {
        matches!(self, Self::Either)
    }

    /// Representation used within VCF `##SAMPLE` header lines.
    #[must_use]
    pub fn vcf_tag(&self) -> &'static str {
        match self {
            Self::Male   => "MALE",
            Self::Female => "FEMALE",
            Self::Either => "EITHER",
        }
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "male"   | "1" => Self::Male,
            "female" | "2" => Self::Female,
            _              => Self::Either,
        })
    }
}

impl Display for Sex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            Self::Female => "female",
            Self::Male   => "male",
            Self::Either => "either"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(format!("{}", Sex::Female), "female");
        assert_eq!(format!("{}", Sex::Male), "male");
        assert_eq!(format!("{}", Sex::Either), "either");
        assert_eq!(Sex::Male.vcf_tag(), "MALE");
    }

    #[test]
    fn from_str() {
        assert_eq!(Sex::from_str("FEMALE"), Ok(Sex::Female));
        assert_eq!(Sex::from_str("2"), Ok(Sex::Female));
        assert_eq!(Sex::from_str("MALE"), Ok(Sex::Male));
        assert_eq!(Sex::from_str("1"), Ok(Sex::Male));
        assert_eq!(Sex::from_str("either"), Ok(Sex::Either));
        assert_eq!(Sex::from_str(""), Ok(Sex::Either));
        assert_eq!(Sex::from_str("-9"), Ok(Sex::Either));
    }

    #[test]
    fn random_is_seeded() {
        let draws = |seed| {
            let mut rng = fastrand::Rng::with_seed(seed);
            (0..32).map(|_| Sex::random(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(draws(7), draws(7));
        assert!(draws(7).iter().all(|s| !s.is_either()));
    }
}
