//! Normalisation, digesting and signing of component descriptors.
//!
//! Data flows one way: digest propagation fills in element digests, the
//! normaliser produces canonical bytes, the digester hashes them and a
//! [`Signer`] signs the resulting digest. Verification checks the signature
//! over the recorded digest and, through
//! [`verify_signed_component_descriptor`], re-hashes the descriptor to detect
//! tampering.

pub mod digests;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod normalise;
pub mod pem;
pub mod rsa;
pub mod sign;

pub use digests::add_digests_to_component_descriptor;
pub use encoding::{to_canonical_vec, CanonicalFormatter};
pub use error::{ResolveError, SignatureError, SignatureResult};
pub use hash::{
    hash_for_component_descriptor, hash_function, hasher_for_name, HashAlgorithm, HASH_FUNCTIONS,
};
pub use normalise::{
    canonical_form, deep_sort, is_normalisable, normalise_component_descriptor, CanonicalValue,
    Field,
};
pub use pem::{PemBlock, PemError};
pub use self::rsa::{RsaSigner, RsaVerifier};
pub use sign::{
    select_signature_by_name, sign_component_descriptor, verify_signed_component_descriptor,
    Signer, Verifier,
};
