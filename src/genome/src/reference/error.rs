use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Failed to open reference file")]
    Open,

    #[error("Failed to read line {0} of the reference file")]
    InvalidLine(usize),

    #[error("Sequence data found before any '>' header @ line {0}")]
    OrphanSequence(usize),

    #[error("Reference file does not contain any sequence")]
    Empty,

    #[error("Duplicate sequence name '{0}'")]
    DuplicateSequence(String),

    #[error("Unknown sequence id {0}")]
    UnknownSequence(usize),

    #[error("Requested region [{start}, {end}) lies outside of sequence '{name}' (length {length})")]
    OutOfBounds{name: String, start: usize, end: usize, length: usize},

    #[error("Reference specification must start with 'version 1'")]
    MissingVersion,

    #[error("Malformed reference specification @ line {0}")]
    InvalidSpecLine(usize),

    #[error("Invalid sex field '{1}' @ line {0}")]
    InvalidSex(usize, String),

    #[error("Invalid shape field '{1}' @ line {0}. Expected 'linear' or 'circular'")]
    InvalidShape(usize, String),
}
