use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrossoverError {
    #[error("Invalid extra crossover frequency {0}. Expected a finite, non-negative value")]
    InvalidExtraFrequency(f64),

    #[error("Failed to load genetic map {}", .0.display())]
    LoadMap(PathBuf),
}
