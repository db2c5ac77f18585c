//! Validation errors for descriptor data.

use thiserror::Error;

/// Errors raised while validating a component descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("identity key '{0}' is reserved for the system")]
    ReservedIdentityKey(String),

    #[error("identity key '{0}' contains non-ASCII characters")]
    NonAsciiIdentityKey(String),

    #[error("unsupported schema version '{0}'")]
    UnsupportedSchemaVersion(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("duplicate {kind} identity {identity}")]
    DuplicateIdentity { kind: String, identity: String },

    #[error("invalid {element}: {reason}")]
    InvalidElement { element: String, reason: String },
}
