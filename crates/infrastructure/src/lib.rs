//! Delver DNS Infrastructure Layer
pub mod dns;
