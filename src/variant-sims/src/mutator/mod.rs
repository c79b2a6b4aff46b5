use std::{fmt::{self, Display, Formatter}, str::FromStr};

use genome::base::NUM_KNOWN_BASES;
use located_error::prelude::*;

mod error;
pub use error::MutatorError;

/// Separator between the two haplotypes of a heterozygous specification.
pub const HETEROZYGOUS_SEPARATOR: char = '_';

/// A single edit operation of a mutation specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutatorOp {
    /// `X`: substitute the template base.
    Substitute,
    /// `Y`: substitute, differing from the template and from the other haplotype.
    SubstituteOther,
    /// `I`: insert a random base.
    Insert,
    /// `J`: insert a base differing from the other haplotype.
    InsertOther,
    /// `D`: delete one template base.
    Delete,
    /// `=` or `E`: copy the template base.
    Copy,
}

impl MutatorOp {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'X'       => Some(Self::Substitute),
            'Y'       => Some(Self::SubstituteOther),
            'I'       => Some(Self::Insert),
            'J'       => Some(Self::InsertOther),
            'D'       => Some(Self::Delete),
            '=' | 'E' => Some(Self::Copy),
            _         => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Self::Substitute      => 'X',
            Self::SubstituteOther => 'Y',
            Self::Insert          => 'I',
            Self::InsertOther     => 'J',
            Self::Delete          => 'D',
            Self::Copy            => '=',
        }
    }

    fn consumes_template(self) -> bool {
        !matches!(self, Self::Insert | Self::InsertOther)
    }

    fn emits_base(self) -> bool {
        !matches!(self, Self::Delete)
    }
}

/// Any base code in `1..=4` except `a`. Unknown bases yield any known base.
fn minus(rng: &mut fastrand::Rng, a: u8) -> u8 {
    if !(1..=NUM_KNOWN_BASES as u8).contains(&a) {
        return random_base(rng)
    }
    let r = rng.u8(1..NUM_KNOWN_BASES as u8);
    r + u8::from(r >= a)
}

/// Any base code in `1..=4` except `a` and `b`.
fn minus_both(rng: &mut fastrand::Rng, a: u8, b: u8) -> u8 {
    if a == b {
        return minus(rng, a)
    }
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    let r = rng.u8(1..NUM_KNOWN_BASES as u8 - 1);
    let s = r + u8::from(r >= low);
    s + u8::from(s >= high)
}

fn random_base(rng: &mut fastrand::Rng) -> u8 {
    rng.u8(1..=NUM_KNOWN_BASES as u8)
}

/// Mutation of a single haplotype, following an expanded specification such as `XX=I`.
///
/// Template and generated bases are integer base codes (`N=0`, `A=1`, `C=2`, `G=3`, `T=4`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutatorSingle {
    ops              : Vec<MutatorOp>,
    reference_length : usize,
    mutation_length  : usize,
}

impl MutatorSingle {
    /// Expand repeat counts: `3X2=` -> `XXX==`. A count of zero is read as one.
    fn expand(spec: &str) -> Result<Vec<MutatorOp>, MutatorError> {
        let mut ops = Vec::new();
        let mut count: Option<usize> = None;
        for c in spec.chars() {
            if let Some(digit) = c.to_digit(10) {
                let current = count.unwrap_or(0);
                count = current.checked_mul(10)
                    .and_then(|n| n.checked_add(digit as usize))
                    .map(Some)
                    .ok_or_else(|| MutatorError::InvalidCount(spec.to_string()))?;
                continue
            }
            let op = MutatorOp::from_char(c).ok_or_else(|| MutatorError::InvalidOperation{spec: spec.to_string(), op: c})?;
            let repeats = count.take().unwrap_or(1).max(1);
            ops.extend(std::iter::repeat(op).take(repeats));
        }
        if count.is_some() {
            return Err(MutatorError::TrailingCount(spec.to_string()))
        }
        if ops.is_empty() {
            return Err(MutatorError::EmptySpecification)
        }
        Ok(ops)
    }

    pub fn new(spec: &str) -> Result<Self, MutatorError> {
        let ops = Self::expand(spec)?;
        let reference_length = ops.iter().filter(|op| op.consumes_template()).count();
        let mutation_length  = ops.iter().filter(|op| op.emits_base()).count();
        Ok(Self{ops, reference_length, mutation_length})
    }

    /// Number of template bases consumed.
    #[must_use]
    pub fn reference_length(&self) -> usize {
        self.reference_length
    }

    /// Number of bases emitted.
    #[must_use]
    pub fn mutation_length(&self) -> usize {
        self.mutation_length
    }

    #[must_use]
    pub fn has_indel_op(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, MutatorOp::Insert | MutatorOp::InsertOther | MutatorOp::Delete))
    }

    /// Apply the specification to `template`, starting at `position`.
    ///
    /// `other` is the result of the other haplotype, if any: `Y` and `J` operations then
    /// differ from the base it holds at the same output index.
    /// Returns the generated bases, or `None` if the template is too short.
    pub fn generate(&self, template: &[u8], position: usize, rng: &mut fastrand::Rng, other: Option<&[u8]>) -> Option<Vec<u8>> {
        let mut out = Vec::with_capacity(self.mutation_length);
        let mut t = position;
        for op in &self.ops {
            let other_base = other.and_then(|o| o.get(out.len()).copied());
            if op.consumes_template() && t >= template.len() {
                return None
            }
            match op {
                MutatorOp::Substitute      => out.push(minus(rng, template[t])),
                MutatorOp::SubstituteOther => out.push(match other_base {
                    Some(b) => minus_both(rng, template[t], b),
                    None    => minus(rng, template[t]),
                }),
                MutatorOp::Insert          => out.push(random_base(rng)),
                MutatorOp::InsertOther     => out.push(match other_base {
                    Some(b) => minus(rng, b),
                    None    => random_base(rng),
                }),
                MutatorOp::Delete          => {},
                MutatorOp::Copy            => out.push(template[t]),
            }
            if op.consumes_template() {
                t += 1;
            }
        }
        Some(out)
    }
}

impl Display for MutatorSingle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.ops.iter().try_for_each(|op| write!(f, "{}", op.as_char()))
    }
}

/// Bases generated for both haplotypes of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutatorResult {
    pub first   : Vec<u8>,
    pub second  : Vec<u8>,
    /// Number of template bases consumed.
    pub consumed: usize,
}

/// Homozygous (`spec`) or heterozygous (`spec_spec`) mutation generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutator {
    first : MutatorSingle,
    second: Option<MutatorSingle>,
}

impl FromStr for Mutator {
    type Err = anyhow::Error;

    fn from_str(spec: &str) -> Result<Self> {
        let loc_msg = || format!("While parsing mutation specification '{spec}'");
        let (first, second) = match spec.split_once(HETEROZYGOUS_SEPARATOR) {
            Some((a, b)) => (MutatorSingle::new(a).with_loc(loc_msg)?, Some(MutatorSingle::new(b).with_loc(loc_msg)?)),
            None         => (MutatorSingle::new(spec).with_loc(loc_msg)?, None),
        };
        if let Some(second) = &second {
            if second.reference_length() != first.reference_length() {
                return Err(MutatorError::UnbalancedHeterozygous(spec.to_string())).loc("While parsing mutation specification")
            }
        }
        Ok(Self{first, second})
    }
}

impl Mutator {
    #[must_use]
    pub fn reference_length(&self) -> usize {
        self.first.reference_length()
    }

    /// `true` if either haplotype changes the length of the template, or holds an insertion/deletion.
    #[must_use]
    pub fn is_indel(&self) -> bool {
        std::iter::once(&self.first).chain(self.second.as_ref()).any(|m| {
            m.reference_length() != m.mutation_length() || m.has_indel_op()
        })
    }

    /// Generate a mutation of `template` at `position`. `None` if the template is too short.
    pub fn generate_mutation(&self, template: &[u8], position: usize, rng: &mut fastrand::Rng) -> Option<MutatorResult> {
        let first = self.first.generate(template, position, rng, None)?;
        let second = match &self.second {
            Some(mutator) => mutator.generate(template, position, rng, Some(&first))?,
            None          => first.clone(),
        };
        Some(MutatorResult{first, second, consumed: self.reference_length()})
    }
}

impl Display for Mutator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first)?;
        if let Some(second) = &self.second {
            write!(f, "{HETEROZYGOUS_SEPARATOR}{second}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genome::base;

    #[test]
    fn expand_counts() -> Result<()> {
        assert_eq!(MutatorSingle::new("3X2=I")?.to_string(), "XXX==I");
        assert_eq!(MutatorSingle::new("10D")?.reference_length(), 10);
        assert_eq!(MutatorSingle::new("0I")?.to_string(), "I");
        assert_eq!(MutatorSingle::new("X12"), Err(MutatorError::TrailingCount("X12".to_string())));
        assert!(matches!(MutatorSingle::new("XQ"), Err(MutatorError::InvalidOperation{op: 'Q', ..})));
        assert_eq!(MutatorSingle::new(""), Err(MutatorError::EmptySpecification));
        Ok(())
    }

    #[test]
    fn lengths() -> Result<()> {
        let mutator = MutatorSingle::new("XY=EIJD")?;
        assert_eq!(mutator.reference_length(), 5);
        assert_eq!(mutator.mutation_length(), 6);
        assert!(mutator.has_indel_op());
        assert!(!"XX".parse::<Mutator>()?.is_indel());
        assert!("XI".parse::<Mutator>()?.is_indel());
        assert!("X_D".parse::<Mutator>().is_err());
        assert!("XX_X=".parse::<Mutator>().is_ok());
        Ok(())
    }

    #[test]
    fn minus_never_returns_excluded_bases() {
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..1000 {
            for a in 0..=4 {
                let got = minus(&mut rng, a);
                assert!((1..=4).contains(&got) && got != a);
                for b in 1..=4 {
                    let got = minus_both(&mut rng, a, b);
                    assert!((1..=4).contains(&got) && got != a && got != b);
                }
            }
        }
    }

    #[test]
    fn substitutions_differ_from_template() -> Result<()> {
        let template = base::encode(b"ACGTACGT");
        let mutator: Mutator = "2X=Y".parse()?;
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..100 {
            let result = mutator.generate_mutation(&template, 2, &mut rng).expect("template is long enough");
            assert_eq!(result.consumed, 4);
            assert_eq!(result.first, result.second);
            assert_ne!(result.first[0], template[2]);
            assert_ne!(result.first[1], template[3]);
            assert_eq!(result.first[2], template[4]);
            assert_ne!(result.first[3], template[5]);
        }
        Ok(())
    }

    #[test]
    fn heterozygous_haplotypes_differ() -> Result<()> {
        let template = base::encode(b"ACGT");
        let mutator: Mutator = "XJ_YJ".parse()?;
        let mut rng = fastrand::Rng::with_seed(11);
        for _ in 0..100 {
            let result = mutator.generate_mutation(&template, 0, &mut rng).expect("template is long enough");
            assert_eq!(result.first.len(), 2);
            assert_ne!(result.first[0], result.second[0]);
            assert_ne!(result.first[1], result.second[1]);
        }
        Ok(())
    }

    #[test]
    fn template_overflow() -> Result<()> {
        let template = base::encode(b"ACG");
        let mut rng = fastrand::Rng::with_seed(3);
        assert!("3=".parse::<Mutator>()?.generate_mutation(&template, 0, &mut rng).is_some());
        assert!("3=".parse::<Mutator>()?.generate_mutation(&template, 1, &mut rng).is_none());
        assert!("=D".parse::<Mutator>()?.generate_mutation(&template, 2, &mut rng).is_none());
        let deletion = "=D=".parse::<Mutator>()?.generate_mutation(&template, 0, &mut rng).expect("template is long enough");
        assert_eq!(base::decode(&deletion.first), b"AG");
        Ok(())
    }
}
