use std::{fs::File, io::{BufRead, BufReader}, path::Path};

use located_error::{prelude::*, loc};
use log::debug;

mod error;
pub use error::AlleleFrequencyError;

/// Built-in alternate allele frequency spectrum.
pub const DEFAULT_FREQUENCY_TABLE: &str = include_str!("../../resources/alt_allele_frequency_counts.txt");

/// Source of alternate allele frequencies for newly generated population variants.
#[cfg_attr(test, mockall::automock)]
pub trait AlleleFrequencyChooser {
    fn choose_alt_frequency(&mut self, rng: &mut fastrand::Rng) -> f64;
}

impl<A: AlleleFrequencyChooser + ?Sized> AlleleFrequencyChooser for Box<A> {
    fn choose_alt_frequency(&mut self, rng: &mut fastrand::Rng) -> f64 {
        (**self).choose_alt_frequency(rng)
    }
}

/// Always returns the same frequency. Does not consume any random number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAlleleFrequency(f64);

impl FixedAlleleFrequency {
    pub fn new(freq: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&freq) {
            return loc!(AlleleFrequencyError::InvalidFixedFrequency(freq))
        }
        Ok(Self(freq))
    }

    #[must_use]
    pub fn frequency(&self) -> f64 {
        self.0
    }
}

impl AlleleFrequencyChooser for FixedAlleleFrequency {
    fn choose_alt_frequency(&mut self, _rng: &mut fastrand::Rng) -> f64 {
        self.0
    }
}

/// Draws frequencies from an empirical `frequency count` table.
///
/// # Fields
/// - `cum_counts` : cumulative (bias-adjusted) site counts.
/// - `alt_freqs`  : frequency of each table bin, truncated to 3 decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct TableAlleleFrequencyChooser {
    cum_counts: Vec<u64>,
    alt_freqs : Vec<f64>,
}

impl TableAlleleFrequencyChooser {
    /// Parse a frequency table.
    ///
    /// `bias` skews the table toward common (`1`) or rare (`-1`) alternate alleles. `0` leaves the table unaltered.
    pub fn from_reader(source: impl BufRead, bias: f64) -> Result<Self> {
        use AlleleFrequencyError::{InvalidBias, ReadLine, MalformedLine, InvalidFrequency, OutOfOrder, InvalidCount, EmptyTable};
        if !(-1.0..=1.0).contains(&bias) {
            return loc!(InvalidBias(bias))
        }
        let bias_factor = (bias + 1.0) / 2.0;

        let mut cum_counts = Vec::new();
        let mut alt_freqs  = Vec::new();
        let mut last_freq  = 0.0;
        let mut cum_count  = 0u64;
        for (i, line) in source.lines().enumerate() {
            let line_num = i + 1;
            let line = line.with_loc(|| ReadLine(line_num))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue
            }
            let malformed = || MalformedLine{line: line_num, content: line.to_string()};
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [freq, count] = fields.as_slice() else {
                return loc!(malformed())
            };
            let freq: f64 = freq.parse().with_loc(malformed)?;
            let count: f64 = count.parse().with_loc(malformed)?;

            if !(0.0..=1.0).contains(&freq) {
                return loc!(InvalidFrequency{line: line_num, freq})
            }
            if freq < last_freq {
                return loc!(OutOfOrder{line: line_num, freq})
            }
            if !count.is_finite() || count < 0.0 {
                return loc!(InvalidCount{line: line_num, count})
            }

            let count = bias_factor * count * freq + (1.0 - bias_factor) * count * (1.0 - freq);
            cum_count = (cum_count as f64 + count) as u64;
            cum_counts.push(cum_count);
            alt_freqs.push((1000.0 * freq).floor() / 1000.0);
            last_freq = freq;
        }

        if cum_counts.last().map_or(true, |total| *total == 0) {
            return loc!(EmptyTable)
        }
        debug!("Loaded {} allele frequency bins ({cum_count} sites)", alt_freqs.len());
        Ok(Self{cum_counts, alt_freqs})
    }

    pub fn from_file(path: impl AsRef<Path>, bias: f64) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_loc(|| AlleleFrequencyError::OpenTable(path.to_path_buf()))?;
        Self::from_reader(BufReader::new(file), bias)
            .with_loc(|| format!("While parsing allele frequency table {}", path.display()))
    }

    /// Built-in table, approximating a neutral site frequency spectrum.
    pub fn builtin(bias: f64) -> Result<Self> {
        Self::from_reader(DEFAULT_FREQUENCY_TABLE.as_bytes(), bias)
    }

    /// Number of frequency bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alt_freqs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alt_freqs.is_empty()
    }
}

impl AlleleFrequencyChooser for TableAlleleFrequencyChooser {
    fn choose_alt_frequency(&mut self, rng: &mut fastrand::Rng) -> f64 {
        let total = self.cum_counts.last().copied().unwrap_or(0);
        let pos = (rng.f64() * total as f64) as u64;
        let idx = self.cum_counts.partition_point(|count| *count < pos);
        self.alt_freqs[idx.min(self.alt_freqs.len() - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    const TABLE: &str = "\
        # freq count\n\
        0.1 100\n\
        \n\
        0.5 0\n\
        0.9 100\n";

    #[test]
    fn fixed_frequency() -> Result<()> {
        let mut rng = fastrand::Rng::with_seed(1);
        let mut chooser = FixedAlleleFrequency::new(0.25)?;
        assert_eq!(chooser.choose_alt_frequency(&mut rng), 0.25);
        assert!(FixedAlleleFrequency::new(1.5).is_err());
        Ok(())
    }

    #[test]
    fn parse_table() -> Result<()> {
        let chooser = TableAlleleFrequencyChooser::from_reader(TABLE.as_bytes(), 0.0)?;
        assert_eq!(chooser.cum_counts, vec![50, 50, 100]);
        assert_eq!(chooser.alt_freqs, vec![0.1, 0.5, 0.9]);
        Ok(())
    }

    #[test]
    fn bias_skews_counts() -> Result<()> {
        let common = TableAlleleFrequencyChooser::from_reader(TABLE.as_bytes(), 1.0)?;
        assert_eq!(common.cum_counts, vec![10, 10, 100]);
        let rare = TableAlleleFrequencyChooser::from_reader(TABLE.as_bytes(), -1.0)?;
        assert_eq!(rare.cum_counts, vec![90, 90, 100]);
        assert!(TableAlleleFrequencyChooser::from_reader(TABLE.as_bytes(), 1.5).is_err());
        Ok(())
    }

    #[test]
    fn frequencies_are_truncated() -> Result<()> {
        let chooser = TableAlleleFrequencyChooser::from_reader("0.12345 10\n".as_bytes(), 0.0)?;
        assert!(approx_eq!(f64, chooser.alt_freqs[0], 0.123, ulps = 2));
        Ok(())
    }

    #[test]
    fn malformed_tables() {
        for table in ["0.1\n", "0.1 10 3\n", "abc 10\n", "1.5 10\n", "0.5 10\n0.1 10\n", "0.1 -3\n", "# empty\n", "0.1 0\n"] {
            assert!(TableAlleleFrequencyChooser::from_reader(table.as_bytes(), 0.0).is_err(), "{table}");
        }
    }

    #[test]
    fn draws_follow_counts() -> Result<()> {
        let mut chooser = TableAlleleFrequencyChooser::from_reader(TABLE.as_bytes(), 1.0)?;
        let mut rng = fastrand::Rng::with_seed(42);
        let draws: Vec<f64> = (0..10_000).map(|_| chooser.choose_alt_frequency(&mut rng)).collect();
        assert!(draws.iter().all(|f| *f == 0.1 || *f == 0.9));
        let common = draws.iter().filter(|f| **f == 0.9).count();
        assert!(common > 8500 && common < 9500, "{common}");
        Ok(())
    }

    #[test]
    fn builtin_table() -> Result<()> {
        let mut chooser = TableAlleleFrequencyChooser::builtin(0.0)?;
        assert!(!chooser.is_empty());
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..1000 {
            let freq = chooser.choose_alt_frequency(&mut rng);
            assert!(freq > 0.0 && freq < 1.0);
        }
        Ok(())
    }

    #[test]
    fn boxed_chooser_delegates() {
        let mut mock = MockAlleleFrequencyChooser::default();
        mock.expect_choose_alt_frequency().times(2).returning(|_| 0.3);
        let mut boxed: Box<dyn AlleleFrequencyChooser> = Box::new(mock);
        let mut rng = fastrand::Rng::with_seed(0);
        assert_eq!(boxed.choose_alt_frequency(&mut rng), 0.3);
        assert_eq!(boxed.choose_alt_frequency(&mut rng), 0.3);
    }
}
