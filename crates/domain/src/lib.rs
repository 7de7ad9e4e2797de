//! Delver DNS Domain Layer
pub mod config;
pub mod errors;
pub mod message;
pub mod wire;

pub use config::{CliOverrides, Config, ConfigError};
pub use errors::DomainError;
pub use message::{Header, Message, Question, RData, ResourceRecord};
