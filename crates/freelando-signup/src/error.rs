//! Error types for the registration wizard.

use freelando_forms::{FormError, LookupError};

/// Errors that can occur while running the registration wizard.
#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    /// A form could not be configured or manipulated.
    #[error(transparent)]
    Form(#[from] FormError),

    /// An external lookup failed after its retries.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// The durable draft storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A draft could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The uploaded file is not an image type we accept.
    #[error("Unsupported image file: {0}")]
    UnsupportedImage(String),
}

/// Result type for wizard operations.
pub type Result<T> = std::result::Result<T, SignupError>;
