use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IgError {
    #[error("record {record}: {reason}")]
    DataIntegrity { record: usize, reason: String },

    #[error("positional encoding dimension must be at least 1, got {requested}")]
    EncodingDimension { requested: usize },

    #[error("positional encoding failed: {0}")]
    EncodingComputation(String),

    #[error("cannot batch graphs: {0}")]
    BatchMismatch(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IgError {
    pub(crate) fn integrity(record: usize, reason: impl Into<String>) -> Self {
        IgError::DataIntegrity {
            record,
            reason: reason.into(),
        }
    }
}

pub type IgResult<T> = std::result::Result<T, IgError>;
