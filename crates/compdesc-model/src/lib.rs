//! Component Descriptor Model
//!
//! Plain data types for component descriptors (schema `v2`): the descriptor
//! itself, its resources, sources and component references, and the digest
//! and signature records attached to them. Field names follow the JSON wire
//! format exactly.

pub mod descriptor;
pub mod digest;
pub mod error;
pub mod identity;
pub mod resource;

pub use descriptor::{ComponentDescriptor, ComponentSpec, Metadata, ProviderType, TypedObject};
pub use digest::{
    DigestSpec, NormalisationAlgorithm, Signature, SignatureSpec, EXCLUDE_FROM_SIGNATURE,
    MEDIA_TYPE_PEM, MEDIA_TYPE_RSA_SIGNATURE, NO_DIGEST, RSA_PKCS1_V15,
    SIGNATURE_ALGORITHM_HEADER, SIGNATURE_PEM_BLOCK_TYPE,
};
pub use error::ModelError;
pub use identity::{ComponentRef, ElementKind, ElementRef, Identifiable, Identity, Label, Labels};
pub use resource::{ComponentReference, Resource, ResourceRelation, Source, SourceRef};

/// Schema version written to `meta.schemaVersion`.
pub const SCHEMA_VERSION: &str = "v2";

/// Access type marking a resource or source without any access method.
pub const NONE_ACCESS_TYPE: &str = "None";
