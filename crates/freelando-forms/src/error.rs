//! Error types for forms.

use std::collections::BTreeMap;
use thiserror::Error;

/// Form-specific errors.
///
/// These signal programming or deployment defects (a missing configuration,
/// a typo in a field name, a malformed pattern). Invalid user input is never
/// reported through this type; it lives on the form group as validity state.
#[derive(Debug, Error)]
pub enum FormError {
    /// No configuration factory is registered under the identifier.
    #[error("form configuration '{0}' was not found")]
    ConfigNotFound(String),

    /// The form group has no control with this name.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A pattern validator was declared with an invalid regular expression.
    #[error("invalid validator pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The control is disabled and does not accept edits.
    #[error("field is disabled: {0}")]
    Disabled(String),

    /// An external lookup failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Failure of an external lookup collaborator (geography, existence checks).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The service could not be reached or answered with a failure.
    #[error("lookup service unavailable: {0}")]
    Unavailable(String),

    /// The service does not know the requested key.
    #[error("no entry for '{0}'")]
    NotFound(String),
}

/// Messages that block a step, grouped by field name.
///
/// Fields iterate in name order so the rendered summary is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    by_field: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Key under which errors not tied to a field are stored.
    pub const NON_FIELD: &'static str = "__all__";

    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for `field`, skipping exact duplicates.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        let messages = self.by_field.entry(field.to_string()).or_default();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    /// Folds `other` into `self`.
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.by_field {
            for message in messages {
                self.add(&field, message);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_field.is_empty()
    }

    /// Number of fields with at least one message.
    pub fn len(&self) -> usize {
        self.by_field.len()
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.by_field.get(field)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (field, messages) in &self.by_field {
            for message in messages {
                writeln!(f, "{field}: {message}")?;
            }
        }
        Ok(())
    }
}

/// Result type alias for form operations.
pub type Result<T> = std::result::Result<T, FormError>;
