use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Failed to write to file: inner writer returned an io error")]
    IOError(#[from] std::io::Error),

    #[error("Failed to finalize BGZF stream: {0}")]
    Compression(String),

    #[error("Sample count of record ({found}) does not match the header ({expected})")]
    SampleCount{expected: usize, found: usize},
}
