use std::path::{Path, PathBuf};

use ahash::AHashMap;
use genome::{CdfGeneticMap, ReferenceSequence, Sex};
use located_error::{prelude::*, loc};
use log::{debug, warn};

mod error;
pub use error::CrossoverError;

/// Source of crossover positions along a single chromosome.
pub trait GeneticMap {
    /// Draw a crossover position.
    fn choose_position(&self, rng: &mut fastrand::Rng) -> usize;
}

impl GeneticMap for CdfGeneticMap {
    fn choose_position(&self, rng: &mut fastrand::Rng) -> usize {
        CdfGeneticMap::choose_position(self, rng)
    }
}

/// Crossovers are equally likely at every position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformGeneticMap {
    length: usize,
}

impl UniformGeneticMap {
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self{length}
    }
}

impl GeneticMap for UniformGeneticMap {
    fn choose_position(&self, rng: &mut fastrand::Rng) -> usize {
        match self.length {
            0   => 0,
            len => rng.usize(0..len),
        }
    }
}

/// Chooses crossover positions per chromosome and sex.
///
/// # Fields
/// - `map_dir`        : directory of `<sex>.<chromosome>.CDF.txt` genetic maps. `None` always uses uniform maps.
/// - `extra_frequency`: probability of a second crossover on a chromosome, per meiosis.
/// - `interpolate`    : linearly interpolate positions within genetic map bins.
/// - `maps`           : lazily loaded maps, keyed by file name.
pub struct CrossoverSelector {
    map_dir        : Option<PathBuf>,
    extra_frequency: f64,
    interpolate    : bool,
    maps           : AHashMap<String, Box<dyn GeneticMap>>,
}

impl CrossoverSelector {
    pub fn new(map_dir: Option<impl AsRef<Path>>, extra_frequency: f64, interpolate: bool) -> Result<Self> {
        if !extra_frequency.is_finite() || extra_frequency < 0.0 {
            return loc!(CrossoverError::InvalidExtraFrequency(extra_frequency))
        }
        let map_dir = map_dir.map(|dir| dir.as_ref().to_path_buf());
        if let Some(dir) = &map_dir {
            if !dir.is_dir() {
                warn!("Genetic map directory {} does not exist. Crossovers will be uniformly distributed", dir.display());
            }
        }
        Ok(Self{map_dir, extra_frequency, interpolate, maps: AHashMap::new()})
    }

    /// Selector without genetic maps.
    pub fn uniform(extra_frequency: f64) -> Result<Self> {
        Self::new(None::<PathBuf>, extra_frequency, false)
    }

    #[must_use]
    pub fn extra_crossover_frequency(&self) -> f64 {
        self.extra_frequency
    }

    /// Load the map tied to a chromosome and sex: `<sex>.<chromosome>.CDF.txt`, then `<chromosome>.CDF.txt`.
    /// Falls back to a uniform map, with a warning, if neither exists.
    fn load_map(&self, sequence: &ReferenceSequence, sex: Sex) -> Result<Box<dyn GeneticMap>> {
        if let Some(dir) = &self.map_dir {
            let candidates = [
                CdfGeneticMap::path(dir, &sequence.name, Some(sex)),
                CdfGeneticMap::path(dir, &sequence.name, None),
            ];
            if let Some(path) = candidates.iter().find(|path| path.is_file()) {
                let map = CdfGeneticMap::from_file(path, self.interpolate)
                    .with_loc(|| CrossoverError::LoadMap(path.clone()))?;
                debug!("Using genetic map {} for {sex} chromosome {}", path.display(), sequence.name);
                return Ok(Box::new(map))
            }
            warn!("Genetic map file {} does not exist, using uniform distribution", candidates[0].display());
        }
        Ok(Box::new(UniformGeneticMap::new(sequence.length)))
    }

    /// Draw a single crossover position within `[0, sequence.length)`.
    pub fn choose_position(&mut self, rng: &mut fastrand::Rng, sequence: &ReferenceSequence, sex: Sex) -> Result<usize> {
        let key = CdfGeneticMap::file_name(&sequence.name, Some(sex));
        if !self.maps.contains_key(&key) {
            let map = self.load_map(sequence, sex)?;
            self.maps.insert(key.clone(), map);
        }
        let map = self.maps.get(&key).with_loc(|| format!("Genetic map {key} should be cached"))?;
        Ok(map.choose_position(rng).min(sequence.length.saturating_sub(1)))
    }

    /// Sorted crossover positions of a single meiosis: one obligatory crossover, plus an extra
    /// one with probability [`Self::extra_crossover_frequency`].
    pub fn get_crossover_positions(&mut self, rng: &mut fastrand::Rng, sequence: &ReferenceSequence, sex: Sex) -> Result<Vec<usize>> {
        let count = 1 + usize::from(rng.f64() < self.extra_frequency);
        let mut positions = (0..count)
            .map(|_| self.choose_position(rng, sequence, sex))
            .collect::<Result<Vec<_>>>()?;
        positions.sort_unstable();
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genome::Ploidy;
    use std::fs;

    fn chromosome(name: &str, length: usize) -> ReferenceSequence {
        ReferenceSequence{seq_id: 0, name: name.to_string(), length, ploidy: Ploidy::Diploid, linear: true, haploid_complement: None}
    }

    #[test]
    fn single_uniform_crossover() -> Result<()> {
        let mut selector = CrossoverSelector::uniform(0.0)?;
        let mut rng = fastrand::Rng::with_seed(42);
        let chr = chromosome("chr1", 1000);
        for _ in 0..1000 {
            let positions = selector.get_crossover_positions(&mut rng, &chr, Sex::Male)?;
            assert_eq!(positions.len(), 1);
            assert!(positions[0] < 1000);
        }
        Ok(())
    }

    #[test]
    fn extra_crossovers_are_sorted() -> Result<()> {
        let mut selector = CrossoverSelector::uniform(1.0)?;
        let mut rng = fastrand::Rng::with_seed(3);
        let chr = chromosome("chr1", 1000);
        for _ in 0..100 {
            let positions = selector.get_crossover_positions(&mut rng, &chr, Sex::Female)?;
            assert_eq!(positions.len(), 2);
            assert!(positions[0] <= positions[1]);
        }
        Ok(())
    }

    #[test]
    fn invalid_extra_frequency() {
        assert!(CrossoverSelector::uniform(-0.5).is_err());
        assert!(CrossoverSelector::uniform(f64::INFINITY).is_err());
    }

    #[test]
    fn sex_specific_maps_take_precedence() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        fs::write(tmpdir.path().join("male.chr1.CDF.txt"), "chr\tpos\tprob\tcdf\nchr1\t100\t0\t0\nchr1\t200\t1\t1\n")?;
        fs::write(tmpdir.path().join("chr1.CDF.txt"), "chr\tpos\tprob\tcdf\nchr1\t500\t0\t0\nchr1\t600\t1\t1\n")?;

        let mut selector = CrossoverSelector::new(Some(tmpdir.path()), 0.0, false)?;
        let mut rng = fastrand::Rng::with_seed(1);
        let chr = chromosome("chr1", 1000);
        for _ in 0..50 {
            assert_eq!(selector.choose_position(&mut rng, &chr, Sex::Male)?, 100);
            assert_eq!(selector.choose_position(&mut rng, &chr, Sex::Female)?, 500);
        }
        Ok(())
    }

    #[test]
    fn positions_are_clamped_to_the_chromosome() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        fs::write(tmpdir.path().join("chr1.CDF.txt"), "chr\tpos\tprob\tcdf\nchr1\t5000\t0\t0\nchr1\t6000\t1\t1\n")?;
        let mut selector = CrossoverSelector::new(Some(tmpdir.path()), 0.0, true)?;
        let chr = chromosome("chr1", 1000);
        assert_eq!(selector.choose_position(&mut fastrand::Rng::with_seed(1), &chr, Sex::Male)?, 999);
        Ok(())
    }

    #[test]
    fn missing_maps_fall_back_to_uniform() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        let mut selector = CrossoverSelector::new(Some(tmpdir.path().join("missing")), 0.0, false)?;
        let chr = chromosome("chrX", 10);
        let mut rng = fastrand::Rng::with_seed(8);
        for _ in 0..100 {
            assert!(selector.choose_position(&mut rng, &chr, Sex::Female)? < 10);
        }
        Ok(())
    }

    #[test]
    fn malformed_maps_are_fatal() -> Result<()> {
        let tmpdir = tempfile::tempdir()?;
        fs::write(tmpdir.path().join("female.chr2.CDF.txt"), "position\tcdf\n100\t0.5\n")?;
        let mut selector = CrossoverSelector::new(Some(tmpdir.path()), 0.0, false)?;
        let chr = chromosome("chr2", 1000);
        assert!(selector.choose_position(&mut fastrand::Rng::with_seed(1), &chr, Sex::Female).is_err());
        Ok(())
    }

    #[test]
    fn seeded_positions_are_reproducible() -> Result<()> {
        let chr = chromosome("chr1", 1_000_000);
        let draw = || -> Result<Vec<Vec<usize>>> {
            let mut selector = CrossoverSelector::uniform(0.5)?;
            let mut rng = fastrand::Rng::with_seed(99);
            (0..20).map(|_| selector.get_crossover_positions(&mut rng, &chr, Sex::Male)).collect()
        };
        assert_eq!(draw()?, draw()?);
        Ok(())
    }
}
