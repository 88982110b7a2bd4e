use thiserror::Error;

use crate::evaluator::Phase;

pub type Result<T> = std::result::Result<T, BloomError>;

#[derive(Error, Debug)]
pub enum BloomError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "Key space exhausted during {phase}: needed {needed} distinct keys, \
         got {obtained} after {draws} draws"
    )]
    ExhaustedKeySpace {
        phase: Phase,
        needed: usize,
        obtained: usize,
        draws: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
