use std::{path::{Path, PathBuf}, io::{BufReader, BufRead}, fs::File};

use located_error::{prelude::*, loc};
use log::debug;

mod error;
pub use error::GeneticMapError;

use crate::Sex;

/// Literal header expected on the first line of every cumulative genetic map.
pub const GENETIC_MAP_HEADER: &str = "chr\tpos\tprob\tcdf";

/// File extension of cumulative genetic maps.
pub const GENETIC_MAP_EXT: &str = "CDF.txt";

const POS_COL: usize = 1;
const CDF_COL: usize = 3;

/// Empirical recombination map of a single chromosome, for a single sex.
///
/// Stored as a cumulative distribution table: `cdf[i]` is the probability that a crossover
/// occurs before or at `positions[i]`. Values are normalized, so that the last bin reaches 1.0.
///
/// # Fields
/// - `positions`  : 0-based bin start positions, in file order.
/// - `cdf`        : cumulative probabilities, non-decreasing.
/// - `interpolate`: linearly interpolate positions within the selected bin.
#[derive(Debug, Clone)]
pub struct CdfGeneticMap {
    positions  : Vec<usize>,
    cdf        : Vec<f64>,
    interpolate: bool,
}

impl CdfGeneticMap {
    /// File name of the genetic map tied to a chromosome: `<sex>.<chromosome>.CDF.txt`, or
    /// `<chromosome>.CDF.txt` when no sex is given.
    #[must_use]
    pub fn file_name(chromosome: &str, sex: Option<Sex>) -> String {
        match sex {
            Some(sex) => format!("{sex}.{chromosome}.{GENETIC_MAP_EXT}"),
            None      => format!("{chromosome}.{GENETIC_MAP_EXT}"),
        }
    }

    /// Path of the genetic map tied to a chromosome, within `dir`.
    #[must_use]
    pub fn path(dir: impl AsRef<Path>, chromosome: &str, sex: Option<Sex>) -> PathBuf {
        dir.as_ref().join(Self::file_name(chromosome, sex))
    }

    /// Parse a cumulative genetic map.
    /// Expected fields of a genetic map file are:
    ///  <Chromosome>    <Position>    <Per-event probability>    <Cumulative probability>
    ///
    /// # Errors
    /// - if the first line does not start with [`GENETIC_MAP_HEADER`]
    /// - if any position or cumulative probability fails to parse
    /// - if the cumulative distribution is decreasing or null.
    pub fn from_reader(source: impl BufRead, interpolate: bool) -> Result<Self> {
        use GeneticMapError::*;
        let mut lines = source.lines().enumerate();

        match lines.next() {
            Some((_, Ok(header))) if header.starts_with(GENETIC_MAP_HEADER) => {},
            _ => return loc!(InvalidHeader(GENETIC_MAP_HEADER)),
        }

        let mut positions = Vec::new();
        let mut cdf: Vec<f64> = Vec::new();
        for (i, line) in lines {
            let line = line.with_loc(|| InvalidLine(i + 1))?;
            if line.is_empty() { continue }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() <= CDF_COL {
                return loc!(InvalidFields(i + 1));
            }
            let pos: usize = fields[POS_COL].trim().parse().with_loc(|| ParsePos(i + 1))?;
            let p  : f64   = fields[CDF_COL].trim().parse().with_loc(|| ParseCdf(i + 1))?;
            if cdf.last().map_or(false, |last| p < *last) {
                return loc!(DecreasingCdf(i + 1));
            }
            positions.push(pos);
            cdf.push(p);
        }

        let max = *cdf.last().loc(Empty)?;
        if max <= 0.0 {
            return loc!(NullDistribution);
        }
        cdf.iter_mut().for_each(|p| *p /= max);
        Ok(Self{positions, cdf, interpolate})
    }

    pub fn from_file(path: impl AsRef<Path>, interpolate: bool) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading genetic map from {}", path.display());
        let source = BufReader::new(File::open(path).with_loc(|| GeneticMapError::Open)?);
        Self::from_reader(source, interpolate).with_loc(|| GeneticMapError::ParseMap{map: path.to_path_buf()})
    }

    /// Locate the bin containing `prob` and return its position.
    ///
    /// Returns 0 when `prob` falls outside of every bin.
    #[must_use]
    pub fn find_position(&self, prob: f64) -> usize {
        for j in 0..self.cdf.len().saturating_sub(1) {
            let (low, high) = (self.cdf[j], self.cdf[j + 1]);
            if prob >= low && prob < high {
                if !self.interpolate {
                    return self.positions[j]
                }
                let frac  = (prob - low) / (high - low);
                let width = self.positions[j + 1].saturating_sub(self.positions[j]);
                return self.positions[j] + (frac * width as f64) as usize
            }
        }
        0
    }

    /// Draw a crossover position from this map.
    pub fn choose_position(&self, rng: &mut fastrand::Rng) -> usize {
        self.find_position(rng.f64())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    const MAP: &str = "chr\tpos\tprob\tcdf\n\
        1\t0\t0.0\t0.0\n\
        1\t100\t0.25\t0.25\n\
        1\t200\t0.25\t0.5\n\
        1\t400\t0.5\t1.0\n";

    #[test]
    fn file_names() {
        assert_eq!(CdfGeneticMap::file_name("chr1", Some(Sex::Male)), "male.chr1.CDF.txt");
        assert_eq!(CdfGeneticMap::file_name("chrX", Some(Sex::Female)), "female.chrX.CDF.txt");
        assert_eq!(CdfGeneticMap::file_name("chr2", None), "chr2.CDF.txt");
    }

    #[test]
    fn bin_lookup() -> Result<()> {
        let map = CdfGeneticMap::from_reader(MAP.as_bytes(), false)?;
        assert_eq!(map.len(), 4);
        assert_eq!(map.find_position(0.1), 0);
        assert_eq!(map.find_position(0.25), 100);
        assert_eq!(map.find_position(0.6), 200);
        assert_eq!(map.find_position(1.0), 0);
        Ok(())
    }

    #[test]
    fn interpolated_lookup() -> Result<()> {
        let map = CdfGeneticMap::from_reader(MAP.as_bytes(), true)?;
        assert_eq!(map.find_position(0.125), 50);
        assert_eq!(map.find_position(0.375), 150);
        assert_eq!(map.find_position(0.75), 300);
        Ok(())
    }

    #[test]
    fn normalization() -> Result<()> {
        let unnormalized = "chr\tpos\tprob\tcdf\n1\t0\t0\t0\n1\t10\t1\t2\n1\t20\t1\t4\n";
        let map = CdfGeneticMap::from_reader(unnormalized.as_bytes(), false)?;
        assert!(approx_eq!(f64, *map.cdf.last().unwrap(), 1.0, ulps = 2));
        assert!(approx_eq!(f64, map.cdf[1], 0.5, ulps = 2));
        Ok(())
    }

    #[test]
    fn malformed_maps() {
        let no_header = "1\t0\t0.0\t0.0\n1\t10\t1\t1\n";
        assert!(CdfGeneticMap::from_reader(no_header.as_bytes(), false).is_err());
        let bad_header = "chr\tpos\tcM\n1\t10\t1\n";
        assert!(CdfGeneticMap::from_reader(bad_header.as_bytes(), false).is_err());
        let missing_field = "chr\tpos\tprob\tcdf\n1\t10\t1\n";
        assert!(CdfGeneticMap::from_reader(missing_field.as_bytes(), false).is_err());
        let decreasing = "chr\tpos\tprob\tcdf\n1\t10\t1\t0.5\n1\t20\t1\t0.2\n";
        assert!(CdfGeneticMap::from_reader(decreasing.as_bytes(), false).is_err());
        let null = "chr\tpos\tprob\tcdf\n1\t10\t0\t0\n";
        assert!(CdfGeneticMap::from_reader(null.as_bytes(), false).is_err());
        let empty = "chr\tpos\tprob\tcdf\n";
        assert!(CdfGeneticMap::from_reader(empty.as_bytes(), false).is_err());
    }

    #[test]
    fn seeded_draws_are_reproducible() -> Result<()> {
        let map = CdfGeneticMap::from_reader(MAP.as_bytes(), true)?;
        let draw = |seed| {
            let mut rng = fastrand::Rng::with_seed(seed);
            (0..16).map(|_| map.choose_position(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
        assert!(draw(42).iter().all(|pos| *pos < 400));
        Ok(())
    }

    #[test]
    fn from_missing_file() {
        let tmpdir = tempfile::tempdir().expect("tempdir");
        let path = CdfGeneticMap::path(tmpdir.path(), "chr1", Some(Sex::Male));
        assert!(CdfGeneticMap::from_file(path, false).is_err());
    }
}
