use std::fmt::{self, Display, Formatter};

/// A reference nucleotide, encoded with its integer code.
///
/// Codes follow the convention used by the mutation priors:
/// `N=0`, `A=1`, `C=2`, `G=3`, `T=4`. Every ascii byte outside of `ACGTacgt` is read as `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Base { N, A, C, G, T }

/// Number of known (non-`N`) bases.
pub const NUM_KNOWN_BASES: usize = 4;

impl Base {
    pub const KNOWN: [Base; NUM_KNOWN_BASES] = [Base::A, Base::C, Base::G, Base::T];

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Codes greater than 4 are treated as unknown.
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::A,
            2 => Self::C,
            3 => Self::G,
            4 => Self::T,
            _ => Self::N,
        }
    }

    #[must_use]
    pub fn from_ascii(byte: u8) -> Self {
        match byte.to_ascii_uppercase() {
            b'A' => Self::A,
            b'C' => Self::C,
            b'G' => Self::G,
            b'T' => Self::T,
            _    => Self::N,
        }
    }

    #[must_use]
    pub fn to_ascii(self) -> u8 {
        match self {
            Self::N => b'N',
            Self::A => b'A',
            Self::C => b'C',
            Self::G => b'G',
            Self::T => b'T',
        }
    }

    #[must_use]
    pub fn is_known(self) -> bool {
        self != Self::N
    }
}

impl Display for Base {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.to_ascii()))
    }
}

/// Convert a slice of ascii nucleotides into their integer codes.
#[must_use]
pub fn encode(ascii: &[u8]) -> Vec<u8> {
    ascii.iter().map(|b| Base::from_ascii(*b).code()).collect()
}

/// Convert a slice of integer codes back into ascii nucleotides.
#[must_use]
pub fn decode(codes: &[u8]) -> Vec<u8> {
    codes.iter().map(|c| Base::from_code(*c).to_ascii()).collect()
}

/// `true` if every base of the slice is unknown (an empty slice counts as unknown).
#[must_use]
pub fn all_unknown(ascii: &[u8]) -> bool {
    ascii.iter().all(|b| ! Base::from_ascii(*b).is_known())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        for (i, base) in [Base::N, Base::A, Base::C, Base::G, Base::T].iter().enumerate() {
            assert_eq!(base.code() as usize, i);
            assert_eq!(Base::from_code(i as u8), *base);
        }
        assert_eq!(Base::from_code(9), Base::N);
    }

    #[test]
    fn ascii_roundtrip_is_case_insensitive() {
        assert_eq!(encode(b"acgtNx"), vec![1, 2, 3, 4, 0, 0]);
        assert_eq!(decode(&encode(b"acgtn")), b"ACGTN".to_vec());
    }

    #[test]
    fn unknown_spans() {
        assert!(all_unknown(b"NNnN"));
        assert!(!all_unknown(b"NNAN"));
        assert_eq!(format!("{}", Base::G), "G");
    }
}
