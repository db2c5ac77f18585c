//! Errors from normalisation, digesting, signing and verification.
//!
//! Descriptor-scoped variants carry the `name:version` of the descriptor and,
//! where one is involved, the offending element, so callers get actionable
//! diagnostics without re-deriving context.

use compdesc_model::{ComponentRef, DigestSpec, ElementRef};
use thiserror::Error;

use super::pem::PemError;

/// Error returned by a resolver or descriptor source collaborator.
pub type ResolveError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from signature operations
#[derive(Debug, Error)]
pub enum SignatureError {
    /// A reference or resource misses a mandated digest, or a resource
    /// without access carries one.
    #[error("component descriptor {component} is not normalisable: {reason}")]
    NotNormalisable {
        component: ComponentRef,
        element: Option<ElementRef>,
        reason: String,
    },

    #[error(
        "calculated digest mismatches existing digest for {element} in component descriptor {component}: existing {existing}, calculated {calculated}"
    )]
    DigestMismatch {
        component: ComponentRef,
        element: ElementRef,
        existing: DigestSpec,
        calculated: DigestSpec,
    },

    #[error("unknown hash algorithm '{algorithm}'{}", component_suffix(.component))]
    UnknownHashAlgorithm {
        algorithm: String,
        component: Option<ComponentRef>,
    },

    #[error("unsupported signature media type '{media_type}'{}", component_suffix(.component))]
    UnsupportedSignatureMediaType {
        media_type: String,
        component: Option<ComponentRef>,
    },

    #[error("unable to decode key: {0}")]
    KeyDecode(String),

    #[error("expected 1 signature pem block, found {found} in component descriptor {component}")]
    PemBlockCount { component: ComponentRef, found: usize },

    /// The cryptographic check failed. Structural problems use other variants.
    #[error("signature verification failed for component descriptor {component}: {reason}")]
    VerificationFailure { component: ComponentRef, reason: String },

    #[error("unable to hex decode {what} in component descriptor {component}: {source}")]
    InvalidHex {
        component: ComponentRef,
        what: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("invalid pem data in component descriptor {component}: {source}")]
    Pem {
        component: ComponentRef,
        #[source]
        source: PemError,
    },

    #[error("unable to sign digest of component descriptor {component}: {source}")]
    Signing {
        component: ComponentRef,
        #[source]
        source: rsa::Error,
    },

    #[error("unable to resolve digest for {element} in component descriptor {component}: {source}")]
    Resolve {
        component: ComponentRef,
        element: ElementRef,
        #[source]
        source: ResolveError,
    },

    #[error("signature '{name}' not found in component descriptor {component}")]
    SignatureNotFound { component: ComponentRef, name: String },

    /// The descriptor no longer hashes to the digest recorded in the signature.
    #[error(
        "normalised component descriptor {component} does not match signed digest: signed {signed}, calculated {calculated}"
    )]
    SignedDigestMismatch {
        component: ComponentRef,
        signed: String,
        calculated: String,
    },

    #[error("component reference cycle detected: {}", .path.join(" -> "))]
    ReferenceCycle { path: Vec<String> },
}

fn component_suffix(component: &Option<ComponentRef>) -> String {
    component
        .as_ref()
        .map(|c| format!(" in component descriptor {}", c))
        .unwrap_or_default()
}

impl SignatureError {
    /// Attach a descriptor to errors that were raised without one.
    pub fn in_component(self, cd: &ComponentRef) -> Self {
        match self {
            Self::UnknownHashAlgorithm {
                algorithm,
                component: None,
            } => Self::UnknownHashAlgorithm {
                algorithm,
                component: Some(cd.clone()),
            },
            Self::UnsupportedSignatureMediaType {
                media_type,
                component: None,
            } => Self::UnsupportedSignatureMediaType {
                media_type,
                component: Some(cd.clone()),
            },
            other => other,
        }
    }

    /// True for a failed cryptographic check or a tampered descriptor, as
    /// opposed to malformed input or configuration.
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            Self::VerificationFailure { .. } | Self::SignedDigestMismatch { .. }
        )
    }
}

/// Result type for signature operations
pub type SignatureResult<T> = Result<T, SignatureError>;
