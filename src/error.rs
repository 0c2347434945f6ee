// src/error.rs
//! Contract-violation errors raised by the core.
//!
//! Data-shape problems inside an item never surface here (the normalizer
//! recovers them). Only callers handing the core the wrong kind of value do.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The caller passed something that is not the documented shape
    /// (e.g. an object where an array of items was expected).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CoreError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
