//! Digest and signature records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// PEM block type of an armored signature.
pub const SIGNATURE_PEM_BLOCK_TYPE: &str = "SIGNATURE";

/// PEM header naming the signature algorithm.
pub const SIGNATURE_ALGORITHM_HEADER: &str = "Signature Algorithm";

/// Media type for PEM formatted signatures.
pub const MEDIA_TYPE_PEM: &str = "application/x-pem-file";

/// Media type for a plain hex encoded RSA signature.
pub const MEDIA_TYPE_RSA_SIGNATURE: &str = "application/vnd.ocm.signature.rsa";

/// RSA PKCS #1 v1.5 signature algorithm identifier.
pub const RSA_PKCS1_V15: &str = "RSASSA-PKCS1-V1_5";

/// Normalisation algorithm of the Exclusion Sentinel.
pub const EXCLUDE_FROM_SIGNATURE: &str = "EXCLUDE-FROM-SIGNATURE";

/// Hash algorithm and value of the Exclusion Sentinel.
pub const NO_DIGEST: &str = "NO-DIGEST";

/// Known normalisation algorithms.
///
/// Only `jsonNormalisation/v1` is computed in this workspace; the other two
/// are produced by resolvers for resource and artifact content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalisationAlgorithm {
    JsonNormalisationV1,
    OciArtifactDigestV1,
    GenericBlobDigestV1,
}

impl NormalisationAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JsonNormalisationV1 => "jsonNormalisation/v1",
            Self::OciArtifactDigestV1 => "ociArtifactDigest/v1",
            Self::GenericBlobDigestV1 => "genericBlobDigest/v1",
        }
    }
}

impl fmt::Display for NormalisationAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A digest: hash algorithm, normalisation algorithm and hex value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestSpec {
    pub hash_algorithm: String,
    pub normalisation_algorithm: String,
    pub value: String,
}

impl DigestSpec {
    pub fn new(
        hash_algorithm: impl Into<String>,
        normalisation_algorithm: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            hash_algorithm: hash_algorithm.into(),
            normalisation_algorithm: normalisation_algorithm.into(),
            value: value.into(),
        }
    }

    /// The Exclusion Sentinel: content deliberately not covered by the signature.
    pub fn exclude_from_signature() -> Self {
        Self::new(NO_DIGEST, EXCLUDE_FROM_SIGNATURE, NO_DIGEST)
    }

    pub fn is_excluded_from_signature(&self) -> bool {
        self.hash_algorithm == NO_DIGEST
            && self.normalisation_algorithm == EXCLUDE_FROM_SIGNATURE
            && self.value == NO_DIGEST
    }

    /// All three fields are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.hash_algorithm.is_empty()
            && !self.normalisation_algorithm.is_empty()
            && !self.value.is_empty()
    }
}

impl fmt::Display for DigestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}",
            self.hash_algorithm, self.normalisation_algorithm, self.value
        )
    }
}

/// A signature value together with its algorithm and encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureSpec {
    pub algorithm: String,
    pub value: String,
    pub media_type: String,
}

/// A named, detached signature over one digest of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub digest: DigestSpec,
    pub signature: SignatureSpec,
}
