//! Request validation error shared across the API boundary.
//!
//! Mirrors the wire shape of a 400 response: the message of the first
//! failing check plus the path of the offending field.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
#[error("{message} (field: {field})")]
pub struct ValidationError {
    pub message: String,
    pub field: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: field.into(),
        }
    }

    /// A required field was omitted from the request body.
    pub fn missing(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("{field} is required"),
            field,
        }
    }
}

/// Reject `None` and strings that are empty after trimming.
pub fn require_text(field: &str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s),
        Some(_) => Err(ValidationError::new(
            field,
            format!("{field} must not be empty"),
        )),
        None => Err(ValidationError::missing(field)),
    }
}
