//! Hash algorithms and the descriptor digest.

use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256, Sha512};

use compdesc_model::{ComponentDescriptor, DigestSpec, NormalisationAlgorithm};

use super::error::{SignatureError, SignatureResult};
use super::normalise::normalise_component_descriptor;

/// A supported hash function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

/// Name → hash function table. Names are the identifiers stored in
/// `DigestSpec::hash_algorithm`.
pub const HASH_FUNCTIONS: &[(&str, HashAlgorithm)] = &[
    ("sha256", HashAlgorithm::Sha256),
    ("sha512", HashAlgorithm::Sha512),
];

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// PKCS #1 v1.5 padding scheme carrying this hash's DigestInfo prefix.
    pub(crate) fn pkcs1v15(&self) -> Pkcs1v15Sign {
        match self {
            Self::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            Self::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Exact lookup in [`HASH_FUNCTIONS`]. Used when signing and verifying.
pub fn hash_function(name: &str) -> SignatureResult<HashAlgorithm> {
    HASH_FUNCTIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, alg)| *alg)
        .ok_or_else(|| SignatureError::UnknownHashAlgorithm {
            algorithm: name.to_string(),
            component: None,
        })
}

/// Case-insensitive lookup for user supplied names (`SHA256`, `sha512`).
pub fn hasher_for_name(name: &str) -> SignatureResult<HashAlgorithm> {
    hash_function(&name.to_ascii_lowercase())
}

/// Digest of the normalised descriptor (`jsonNormalisation/v1`, lower-case hex).
pub fn hash_for_component_descriptor(
    cd: &ComponentDescriptor,
    algorithm: HashAlgorithm,
) -> SignatureResult<DigestSpec> {
    let normalised = normalise_component_descriptor(cd)?;
    let value = hex::encode(algorithm.digest(&normalised));
    tracing::debug!(
        component = %cd.component_ref(),
        hash = algorithm.name(),
        digest = %value,
        "hashed component descriptor"
    );
    Ok(DigestSpec::new(
        algorithm.name(),
        NormalisationAlgorithm::JsonNormalisationV1.as_str(),
        value,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use compdesc_model::{ComponentReference, ProviderType, Resource, ResourceRelation, TypedObject};

    fn root_cd() -> ComponentDescriptor {
        let mut cd = ComponentDescriptor::new("example.com/root", "1.0.0");
        cd.component.provider = ProviderType::Internal;
        cd.component.resources.push(Resource {
            name: "test".to_string(),
            version: "1.0.0".to_string(),
            resource_type: "ociImage".to_string(),
            relation: ResourceRelation::Local,
            access: Some(TypedObject::new("ociRegistry")),
            digest: Some(DigestSpec::new(
                "sha256",
                "jsonNormalisation/v1",
                "ab".repeat(32),
            )),
            ..Default::default()
        });
        cd
    }

    #[test]
    fn test_root_descriptor_sha256() {
        let digest = hash_for_component_descriptor(&root_cd(), HashAlgorithm::Sha256).unwrap();
        assert_eq!(digest.hash_algorithm, "sha256");
        assert_eq!(digest.normalisation_algorithm, "jsonNormalisation/v1");
        assert_eq!(
            digest.value,
            "22660a2d803f8ae62ba7d9dcde16d36804861d85ee4dd1007b1513f94d6b0114"
        );
    }

    #[test]
    fn test_root_descriptor_sha512() {
        let digest = hash_for_component_descriptor(&root_cd(), HashAlgorithm::Sha512).unwrap();
        assert_eq!(digest.hash_algorithm, "sha512");
        assert_eq!(
            digest.value,
            "16119a67524c373f3883762d1a3d4e7408bcd90826c87ea7866a60e9e792ccfb188250d85b657e2eac39f622f695b2f51f324ec5862de7c592b1888939294724"
        );
    }

    #[test]
    fn test_reference_fixture_hash() {
        let mut cd = ComponentDescriptor::new("CD-Name", "v0.0.1");
        cd.component.component_references.push(ComponentReference {
            name: "compRefName".to_string(),
            component_name: "compRefNameComponentName".to_string(),
            version: "v0.0.2compRef".to_string(),
            extra_identity: [("refKey", "refName")].into_iter().collect(),
            digest: Some(DigestSpec::new("sha256", "jsonNormalisation/v1", "00000000000000")),
            ..Default::default()
        });
        cd.component.resources.push(Resource {
            name: "Resource1".to_string(),
            version: "v0.0.3resource".to_string(),
            extra_identity: [("key", "value")].into_iter().collect(),
            access: Some(TypedObject::new("ociRegistry").with("imageReference", "r/i:1")),
            digest: Some(DigestSpec::new("sha256", "ociArtifactDigest/v1", "00000000000000")),
            ..Default::default()
        });

        let digest = hash_for_component_descriptor(&cd, HashAlgorithm::Sha256).unwrap();
        assert_eq!(
            digest.value,
            "6c571bb6e351ae755baa7f26cbd1f600d2968ab8b88e25a3bab277e53afdc3ad"
        );
    }

    #[test]
    fn test_hash_is_idempotent() {
        let cd = root_cd();
        let first = hash_for_component_descriptor(&cd, HashAlgorithm::Sha256).unwrap();
        let second = hash_for_component_descriptor(&cd, HashAlgorithm::Sha256).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_not_normalisable_propagates() {
        let mut cd = root_cd();
        cd.component.resources[0].digest = None;
        let err = hash_for_component_descriptor(&cd, HashAlgorithm::Sha256).unwrap_err();
        assert!(matches!(err, SignatureError::NotNormalisable { .. }));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(hash_function("sha256").unwrap(), HashAlgorithm::Sha256);
        assert_eq!(hash_function("sha512").unwrap(), HashAlgorithm::Sha512);
        assert!(matches!(
            hash_function("SHA256"),
            Err(SignatureError::UnknownHashAlgorithm { .. })
        ));
        assert!(hash_function("md5").is_err());

        assert_eq!(hasher_for_name("SHA256").unwrap(), HashAlgorithm::Sha256);
        assert!(hasher_for_name("sha1").is_err());
    }

    #[test]
    fn test_output_len_matches_digest() {
        for (_, alg) in HASH_FUNCTIONS {
            assert_eq!(alg.digest(b"x").len(), alg.output_len());
        }
    }
}
