//! Signer and verifier seams plus the descriptor-level signing workflow.

use compdesc_model::{ComponentDescriptor, DigestSpec, Signature, SignatureSpec};

use super::error::{SignatureError, SignatureResult};
use super::hash::{hash_for_component_descriptor, hash_function, HashAlgorithm};

/// Produces a detached signature over an already computed digest.
///
/// Implementations hold immutable key material and may be shared between
/// threads.
pub trait Signer: Send + Sync {
    fn sign(&self, cd: &ComponentDescriptor, digest: &DigestSpec) -> SignatureResult<SignatureSpec>;
}

/// Checks a detached signature over the digest it records.
pub trait Verifier: Send + Sync {
    fn verify(&self, cd: &ComponentDescriptor, signature: &Signature) -> SignatureResult<()>;
}

/// Digest `cd`, sign the digest and append the signature under `name`.
///
/// An existing signature with the same name is left untouched; the new one
/// is appended after it.
pub fn sign_component_descriptor(
    cd: &mut ComponentDescriptor,
    signer: &dyn Signer,
    hash: HashAlgorithm,
    name: &str,
) -> SignatureResult<Signature> {
    let digest = hash_for_component_descriptor(cd, hash)?;
    let signature_spec = signer.sign(cd, &digest)?;
    let signature = Signature {
        name: name.to_string(),
        digest,
        signature: signature_spec,
    };
    tracing::info!(
        component = %cd.component_ref(),
        signature = name,
        media_type = %signature.signature.media_type,
        "signed component descriptor"
    );
    cd.signatures.push(signature.clone());
    Ok(signature)
}

/// First signature named `name`.
pub fn select_signature_by_name<'a>(
    cd: &'a ComponentDescriptor,
    name: &str,
) -> SignatureResult<&'a Signature> {
    cd.signatures
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| SignatureError::SignatureNotFound {
            component: cd.component_ref(),
            name: name.to_string(),
        })
}

/// Verify the signature named `name` and check that the descriptor still
/// hashes to the digest it signs.
pub fn verify_signed_component_descriptor(
    cd: &ComponentDescriptor,
    verifier: &dyn Verifier,
    name: &str,
) -> SignatureResult<()> {
    let component = cd.component_ref();
    let signature = select_signature_by_name(cd, name)?;
    verifier.verify(cd, signature)?;

    let hash = hash_function(&signature.digest.hash_algorithm)
        .map_err(|e| e.in_component(&component))?;
    let calculated = hash_for_component_descriptor(cd, hash)?;
    if calculated != signature.digest {
        tracing::warn!(component = %component, signature = name, "descriptor does not match signed digest");
        return Err(SignatureError::SignedDigestMismatch {
            component,
            signed: signature.digest.to_string(),
            calculated: calculated.to_string(),
        });
    }

    tracing::info!(component = %component, signature = name, "verified component descriptor");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use compdesc_model::{ProviderType, Resource, TypedObject};

    /// Signs by echoing the digest value.
    struct EchoSigner;

    impl Signer for EchoSigner {
        fn sign(
            &self,
            _cd: &ComponentDescriptor,
            digest: &DigestSpec,
        ) -> SignatureResult<SignatureSpec> {
            Ok(SignatureSpec {
                algorithm: "echo".to_string(),
                value: digest.value.clone(),
                media_type: "text/plain".to_string(),
            })
        }
    }

    struct EchoVerifier;

    impl Verifier for EchoVerifier {
        fn verify(&self, cd: &ComponentDescriptor, signature: &Signature) -> SignatureResult<()> {
            if signature.signature.value == signature.digest.value {
                Ok(())
            } else {
                Err(SignatureError::VerificationFailure {
                    component: cd.component_ref(),
                    reason: "echo mismatch".to_string(),
                })
            }
        }
    }

    fn cd() -> ComponentDescriptor {
        let mut cd = ComponentDescriptor::new("example.com/root", "1.0.0");
        cd.component.provider = ProviderType::Internal;
        cd.component.resources.push(Resource {
            name: "chart".to_string(),
            version: "1.0.0".to_string(),
            resource_type: "helmChart".to_string(),
            access: Some(TypedObject::new("ociRegistry")),
            digest: Some(DigestSpec::new("sha256", "genericBlobDigest/v1", "0f".repeat(32))),
            ..Default::default()
        });
        cd
    }

    #[test]
    fn test_sign_appends_signature() {
        let mut cd = cd();
        let signature =
            sign_component_descriptor(&mut cd, &EchoSigner, HashAlgorithm::Sha256, "ci").unwrap();
        assert_eq!(cd.signatures.len(), 1);
        assert_eq!(cd.signatures[0], signature);
        assert_eq!(signature.digest.normalisation_algorithm, "jsonNormalisation/v1");

        sign_component_descriptor(&mut cd, &EchoSigner, HashAlgorithm::Sha512, "release").unwrap();
        assert_eq!(cd.signatures.len(), 2);
        // signatures are outside the canonical form
        assert_eq!(cd.signatures[0].digest, signature.digest);
    }

    #[test]
    fn test_select_signature_by_name() {
        let mut cd = cd();
        sign_component_descriptor(&mut cd, &EchoSigner, HashAlgorithm::Sha256, "a").unwrap();
        sign_component_descriptor(&mut cd, &EchoSigner, HashAlgorithm::Sha512, "b").unwrap();
        assert_eq!(select_signature_by_name(&cd, "b").unwrap().digest.hash_algorithm, "sha512");
        assert!(matches!(
            select_signature_by_name(&cd, "c"),
            Err(SignatureError::SignatureNotFound { .. })
        ));
    }

    #[test]
    fn test_verify_signed_descriptor() {
        let mut cd = cd();
        sign_component_descriptor(&mut cd, &EchoSigner, HashAlgorithm::Sha256, "ci").unwrap();
        verify_signed_component_descriptor(&cd, &EchoVerifier, "ci").unwrap();
    }

    #[test]
    fn test_verify_detects_tampering() {
        let mut cd = cd();
        sign_component_descriptor(&mut cd, &EchoSigner, HashAlgorithm::Sha256, "ci").unwrap();
        cd.component.resources[0].version = "1.0.1".to_string();
        let err = verify_signed_component_descriptor(&cd, &EchoVerifier, "ci").unwrap_err();
        assert!(matches!(err, SignatureError::SignedDigestMismatch { .. }));
        assert!(err.is_verification_failure());
    }

    #[test]
    fn test_verify_ignores_unsigned_fields() {
        let mut cd = cd();
        sign_component_descriptor(&mut cd, &EchoSigner, HashAlgorithm::Sha256, "ci").unwrap();
        cd.component.repository_contexts.push(TypedObject::new("ociRegistry"));
        verify_signed_component_descriptor(&cd, &EchoVerifier, "ci").unwrap();
    }

    #[test]
    fn test_verify_unknown_hash_in_signature() {
        let mut cd = cd();
        sign_component_descriptor(&mut cd, &EchoSigner, HashAlgorithm::Sha256, "ci").unwrap();
        cd.signatures[0].digest.hash_algorithm = "md5".to_string();
        let err = verify_signed_component_descriptor(&cd, &EchoVerifier, "ci").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown hash algorithm 'md5' in component descriptor example.com/root:1.0.0"
        );
    }
}
