//! Component descriptor signing
//!
//! Deterministic normalisation of component descriptors, descriptor digests,
//! digest propagation across descriptor trees, and RSASSA-PKCS1-V1_5
//! signing and verification of the resulting digests.

pub mod config;
pub mod signatures;
pub mod tree;

pub use compdesc_model as model;

pub use config::{ConfigError, EffectiveConfig, SigningConfig};
pub use signatures::{
    add_digests_to_component_descriptor, hash_for_component_descriptor, hasher_for_name,
    normalise_component_descriptor, sign_component_descriptor, verify_signed_component_descriptor,
    HashAlgorithm, RsaSigner, RsaVerifier, SignatureError, SignatureResult, Signer, Verifier,
};
pub use tree::{DescriptorSource, InMemorySource, RecursiveDigester};

/// Process exit code: success
pub const EXIT_OK: i32 = 0;

/// Process exit code: usage, configuration or key error
pub const EXIT_USAGE: i32 = 1;

/// Process exit code: descriptor not normalisable or otherwise malformed
pub const EXIT_STRUCTURAL: i32 = 2;

/// Process exit code: signature does not verify
pub const EXIT_VERIFICATION: i32 = 3;

/// Exit code reported for a signature error.
pub fn exit_code(err: &SignatureError) -> i32 {
    match err {
        e if e.is_verification_failure() => EXIT_VERIFICATION,
        SignatureError::KeyDecode(_)
        | SignatureError::UnknownHashAlgorithm { .. }
        | SignatureError::UnsupportedSignatureMediaType { .. } => EXIT_USAGE,
        _ => EXIT_STRUCTURAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compdesc_model::ComponentRef;

    fn component() -> ComponentRef {
        ComponentRef {
            name: "example.com/root".to_string(),
            version: "1.0.0".to_string(),
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code(&SignatureError::VerificationFailure {
                component: component(),
                reason: "mismatch".to_string(),
            }),
            EXIT_VERIFICATION
        );
        assert_eq!(
            exit_code(&SignatureError::KeyDecode("bad".to_string())),
            EXIT_USAGE
        );
        assert_eq!(
            exit_code(&SignatureError::NotNormalisable {
                component: component(),
                element: None,
                reason: "missing digest".to_string(),
            }),
            EXIT_STRUCTURAL
        );
        assert_eq!(
            exit_code(&SignatureError::PemBlockCount {
                component: component(),
                found: 2,
            }),
            EXIT_STRUCTURAL
        );
    }
}
