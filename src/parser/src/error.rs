use thiserror::Error;
use crate::FileEntity;

#[derive(Error, Debug)]
pub enum ParserError{
    #[error("{0} {1} does not exist")]
    MissingFileEntity(FileEntity, String),

    #[error("{1} is not a {0}")]
    InvalidFileEntity(FileEntity, String),

    #[error("The provided value must lie between {0} and {1}")]
    ParseRange(f64, f64),

    #[error("Failed to serialize command line arguments")]
    Serialize,

    #[error("Failed to deserialize command line arguments from {0}")]
    Deserialize(String),

    #[error("Unable to serialize arguments into {0}")]
    WriteYaml(String),

    #[error("{0} already exists. Use --overwrite to force.")]
    CannotOverwrite(String),

    #[error("--child and --sex do not match: {children} children were provided, along with {sexes} sexes")]
    ChildSexCount{children: usize, sexes: usize},
}
