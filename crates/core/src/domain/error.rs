// Rule violations inside domain types, before any storage is involved

use std::fmt::Display;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Interview or job lifecycle step that its current state forbids
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Malformed value: empty range, bad email, offset out of bounds, rule limits
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl DomainError {
    pub fn transition(from: impl Display, to: impl Display) -> Self {
        DomainError::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
