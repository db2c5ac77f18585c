//! RSASSA-PKCS1-V1_5 signer and verifier.
//!
//! The signature covers the raw digest bytes recorded in a `DigestSpec`, not
//! the descriptor itself. Signatures are emitted either as plain hex
//! (`application/vnd.ocm.signature.rsa`) or as a PEM `SIGNATURE` block
//! (`application/x-pem-file`).

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use compdesc_model::{
    ComponentDescriptor, ComponentRef, DigestSpec, Signature, SignatureSpec, MEDIA_TYPE_PEM,
    MEDIA_TYPE_RSA_SIGNATURE, RSA_PKCS1_V15, SIGNATURE_ALGORITHM_HEADER,
    SIGNATURE_PEM_BLOCK_TYPE,
};

use super::error::{SignatureError, SignatureResult};
use super::hash::{hash_function, HashAlgorithm};
use super::pem::{self, PemBlock};
use super::sign::{Signer, Verifier};

/// Signs digests with an RSA private key.
#[derive(Debug, Clone)]
pub struct RsaSigner {
    private_key: RsaPrivateKey,
    media_type: String,
}

impl RsaSigner {
    pub fn new(private_key: RsaPrivateKey, media_type: impl Into<String>) -> Self {
        Self {
            private_key,
            media_type: media_type.into(),
        }
    }

    /// Load a PEM armored PKCS #8 private key. The first PEM block is used.
    pub fn from_pkcs8_pem(pem_data: &str, media_type: impl Into<String>) -> SignatureResult<Self> {
        let block = first_pem_block(pem_data)?;
        let private_key = RsaPrivateKey::from_pkcs8_der(&block.bytes).map_err(|e| {
            SignatureError::KeyDecode(format!("not an RSA PKCS #8 private key: {}", e))
        })?;
        Ok(Self::new(private_key, media_type))
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }
}

impl Signer for RsaSigner {
    fn sign(&self, cd: &ComponentDescriptor, digest: &DigestSpec) -> SignatureResult<SignatureSpec> {
        let component = cd.component_ref();
        if self.media_type != MEDIA_TYPE_RSA_SIGNATURE && self.media_type != MEDIA_TYPE_PEM {
            return Err(SignatureError::UnsupportedSignatureMediaType {
                media_type: self.media_type.clone(),
                component: Some(component),
            });
        }

        let hash = hash_function(&digest.hash_algorithm).map_err(|e| e.in_component(&component))?;
        let hashed = decode_digest(&component, digest)?;
        let signature = self
            .private_key
            .sign(hash.pkcs1v15(), &hashed)
            .map_err(|source| SignatureError::Signing {
                component: component.clone(),
                source,
            })?;

        let value = if self.media_type == MEDIA_TYPE_PEM {
            pem::encode(
                &PemBlock::new(SIGNATURE_PEM_BLOCK_TYPE, signature)
                    .with_header(SIGNATURE_ALGORITHM_HEADER, RSA_PKCS1_V15),
            )
        } else {
            hex::encode(signature)
        };

        tracing::debug!(component = %component, hash = hash.name(), media_type = %self.media_type, "signed digest");
        Ok(SignatureSpec {
            algorithm: RSA_PKCS1_V15.to_string(),
            value,
            media_type: self.media_type.clone(),
        })
    }
}

/// Verifies digest signatures with an RSA public key.
#[derive(Debug, Clone)]
pub struct RsaVerifier {
    public_key: RsaPublicKey,
}

impl RsaVerifier {
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self { public_key }
    }

    /// Load a PEM armored PKIX (SubjectPublicKeyInfo) public key.
    pub fn from_public_key_pem(pem_data: &str) -> SignatureResult<Self> {
        let block = first_pem_block(pem_data)?;
        let public_key = RsaPublicKey::from_public_key_der(&block.bytes).map_err(|e| {
            SignatureError::KeyDecode(format!("not an RSA PKIX public key: {}", e))
        })?;
        Ok(Self::new(public_key))
    }
}

impl Verifier for RsaVerifier {
    fn verify(&self, cd: &ComponentDescriptor, signature: &Signature) -> SignatureResult<()> {
        let component = cd.component_ref();
        let spec = &signature.signature;

        let signature_bytes = match spec.media_type.as_str() {
            MEDIA_TYPE_RSA_SIGNATURE => {
                hex::decode(&spec.value).map_err(|source| SignatureError::InvalidHex {
                    component: component.clone(),
                    what: "signature value",
                    source,
                })?
            }
            MEDIA_TYPE_PEM => {
                let mut blocks =
                    pem::signature_blocks(&spec.value).map_err(|source| SignatureError::Pem {
                        component: component.clone(),
                        source,
                    })?;
                if blocks.len() != 1 {
                    return Err(SignatureError::PemBlockCount {
                        component,
                        found: blocks.len(),
                    });
                }
                blocks.remove(0).bytes
            }
            other => {
                return Err(SignatureError::UnsupportedSignatureMediaType {
                    media_type: other.to_string(),
                    component: Some(component),
                })
            }
        };

        let hash: HashAlgorithm = hash_function(&signature.digest.hash_algorithm)
            .map_err(|e| e.in_component(&component))?;
        let hashed = decode_digest(&component, &signature.digest)?;

        self.public_key
            .verify(hash.pkcs1v15(), &hashed, &signature_bytes)
            .map_err(|e| SignatureError::VerificationFailure {
                component: component.clone(),
                reason: format!("signature '{}' does not match digest: {}", signature.name, e),
            })?;

        tracing::debug!(component = %component, signature = %signature.name, "signature verified");
        Ok(())
    }
}

fn first_pem_block(pem_data: &str) -> SignatureResult<PemBlock> {
    match pem::decode(pem_data) {
        Ok(Some((block, _))) => Ok(block),
        Ok(None) => Err(SignatureError::KeyDecode(
            "unable to decode pem formatted block".to_string(),
        )),
        Err(e) => Err(SignatureError::KeyDecode(e.to_string())),
    }
}

fn decode_digest(component: &ComponentRef, digest: &DigestSpec) -> SignatureResult<Vec<u8>> {
    hex::decode(&digest.value).map_err(|source| SignatureError::InvalidHex {
        component: component.clone(),
        what: "digest value",
        source,
    })
}
