use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    #[error("unknown activation `{0}` (expected `relu` or `softmax`)")]
    UnknownActivation(String),
    #[error("unknown loss `{0}` (expected `l2` or `crossEntropy`)")]
    UnknownLoss(String),
    #[error("malformed idx file: {0}")]
    Idx(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
