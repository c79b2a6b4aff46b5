/// Index of the homologous copy currently inherited from a parent, along a single chromosome scan.
///
/// Always satisfies `index < count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaplotypePointer {
    index: usize,
    count: usize,
}

impl HaplotypePointer {
    /// `None` if `index` is out of the `[0, count)` bounds.
    #[must_use]
    pub fn new(index: usize, count: usize) -> Option<Self> {
        (index < count).then_some(Self{index, count})
    }

    /// Uniformly drawn initial copy. `None` if the parent holds no copy.
    pub fn random(rng: &mut fastrand::Rng, count: usize) -> Option<Self> {
        (count > 0).then(|| Self{index: rng.usize(0..count), count})
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Switch to the next copy, following a crossover.
    #[must_use]
    pub fn advance(self) -> Self {
        Self{index: (self.index + 1) % self.count, count: self.count}
    }
}
