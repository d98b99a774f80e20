//! Domain error model.

use serde::Serialize;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// A validation failure attached to a single form field.
///
/// Forms surface these next to the offending input; they are never meant to
/// travel further than the calling form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl core::fmt::Display for FieldError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic input failures. Transport and storage
/// concerns belong to the crates that own them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A form field failed validation.
    #[error("invalid field {0}")]
    Field(FieldError),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn field(field: &'static str, msg: impl Into<String>) -> Self {
        Self::Field(FieldError::new(field, msg))
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// The offending field, when the error is tied to one.
    pub fn field_error(&self) -> Option<&FieldError> {
        match self {
            Self::Field(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FieldError> for DomainError {
    fn from(value: FieldError) -> Self {
        Self::Field(value)
    }
}
