use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Truncated DNS message: need {needed} more bytes at offset {offset}")]
    TruncatedMessage { offset: usize, needed: usize },

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Compression pointer at offset {at} does not point backward (target {target})")]
    InvalidCompressionPointer { at: usize, target: usize },

    #[error("Compression pointer budget exhausted")]
    CompressionBudgetExhausted,

    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Transport timeout waiting on {server}")]
    TransportTimeout { server: String },

    #[error("Delegation depth limit reached ({0})")]
    DelegationDepthExceeded(usize),
}
