pub mod base;
pub use base::Base;

mod sex;
pub use sex::Sex;

pub mod ploidy;
pub use ploidy::Ploidy;

pub mod reference;
pub use reference::{ReferenceSource, ReferenceSequence, ReferenceGenome, ReferenceSpec, FastaReference};

pub mod genetic_map;
pub use genetic_map::CdfGeneticMap;
