//! Normalisation of component descriptors (`jsonNormalisation/v1`).
//!
//! The canonical form covers only the trust-relevant fields of a descriptor.
//! Every record is written as a list of single-key objects rather than as a
//! JSON object, and each such list is sorted by key at every level. That way
//! the byte stream does not depend on how any particular runtime orders map
//! keys, and tools written in different languages agree on the digest.
//!
//! Sources, labels, repository contexts, access details and signatures are
//! not part of the canonical form.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use compdesc_model::{ComponentDescriptor, ComponentReference, DigestSpec, Identity, Resource};

use super::encoding::to_canonical_vec;
use super::error::{SignatureError, SignatureResult};

/// A node of the canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalValue {
    /// Encoded as `null`. Used for an empty extra identity.
    Null,
    Scalar(String),
    /// Single-key records, sorted by key during normalisation.
    Record(Vec<Field>),
    /// Ordered list of values. Element order is kept.
    List(Vec<CanonicalValue>),
}

/// One single-key record: encoded as `{"<key>": <value>}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: String,
    pub value: CanonicalValue,
}

impl Field {
    pub fn new(key: impl Into<String>, value: CanonicalValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    fn scalar(key: &str, value: impl Into<String>) -> Self {
        Self::new(key, CanonicalValue::Scalar(value.into()))
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.value)?;
        map.end()
    }
}

impl Serialize for CanonicalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Scalar(s) => serializer.serialize_str(s),
            Self::Record(fields) => {
                let mut seq = serializer.serialize_seq(Some(fields.len()))?;
                for field in fields {
                    seq.serialize_element(field)?;
                }
                seq.end()
            }
            Self::List(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

/// Recursively sort every record by key. The sort is stable.
pub fn deep_sort(value: &mut CanonicalValue) {
    match value {
        CanonicalValue::Record(fields) => {
            for field in fields.iter_mut() {
                deep_sort(&mut field.value);
            }
            fields.sort_by(|a, b| a.key.cmp(&b.key));
        }
        CanonicalValue::List(values) => values.iter_mut().for_each(deep_sort),
        CanonicalValue::Null | CanonicalValue::Scalar(_) => {}
    }
}

/// Check that every component reference and resource carries the digests the
/// canonical form needs. Does not check that the digests are correct.
///
/// - component references need a complete digest;
/// - resources with access need a digest (the Exclusion Sentinel counts);
/// - resources without access (`null` or type `None`) must not carry a digest
///   other than the Exclusion Sentinel.
pub fn is_normalisable(cd: &ComponentDescriptor) -> SignatureResult<()> {
    for reference in cd.component_references() {
        let complete = reference.digest.as_ref().is_some_and(DigestSpec::is_complete);
        if !complete {
            return Err(not_normalisable(
                cd,
                reference.element_ref(),
                format!(
                    "missing digest in component reference {}:{}",
                    reference.name, reference.version
                ),
            ));
        }
    }

    for resource in cd.resources() {
        let no_access = resource.has_no_access();
        match &resource.digest {
            None if !no_access => {
                return Err(not_normalisable(
                    cd,
                    resource.element_ref(),
                    format!(
                        "missing digest in resource {}:{}",
                        resource.name, resource.version
                    ),
                ));
            }
            Some(digest) if no_access && !digest.is_excluded_from_signature() => {
                return Err(not_normalisable(
                    cd,
                    resource.element_ref(),
                    format!(
                        "digest with empty (None) access not allowed in resource {}:{}",
                        resource.name, resource.version
                    ),
                ));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Build the sorted canonical form of a descriptor.
pub fn canonical_form(cd: &ComponentDescriptor) -> SignatureResult<CanonicalValue> {
    is_normalisable(cd)?;

    let meta = CanonicalValue::Record(vec![Field::scalar(
        "schemaVersion",
        cd.metadata.schema_version.as_str(),
    )]);

    let references = cd
        .component_references()
        .iter()
        .map(|r| reference_record(cd, r))
        .collect::<SignatureResult<Vec<_>>>()?;

    let resources = cd
        .resources()
        .iter()
        .map(|r| resource_record(cd, r))
        .collect::<SignatureResult<Vec<_>>>()?;

    let component = CanonicalValue::Record(vec![
        Field::scalar("name", cd.component.name.as_str()),
        Field::scalar("version", cd.component.version.as_str()),
        Field::scalar("provider", cd.component.provider.as_str()),
        Field::new("componentReferences", CanonicalValue::List(references)),
        Field::new("resources", CanonicalValue::List(resources)),
    ]);

    let mut root = CanonicalValue::Record(vec![
        Field::new("meta", meta),
        Field::new("component", component),
    ]);
    deep_sort(&mut root);
    Ok(root)
}

/// Canonical bytes of a descriptor; the input of the descriptor digest.
pub fn normalise_component_descriptor(cd: &ComponentDescriptor) -> SignatureResult<Vec<u8>> {
    let canonical = canonical_form(cd)?;
    to_canonical_vec(&canonical).map_err(|e| SignatureError::NotNormalisable {
        component: cd.component_ref(),
        element: None,
        reason: format!("unable to encode normalised form: {}", e),
    })
}

fn reference_record(
    cd: &ComponentDescriptor,
    reference: &ComponentReference,
) -> SignatureResult<CanonicalValue> {
    let digest = reference.digest.as_ref().ok_or_else(|| {
        not_normalisable(cd, reference.element_ref(), "missing digest".to_string())
    })?;

    Ok(CanonicalValue::Record(vec![
        Field::scalar("componentName", reference.component_name.as_str()),
        Field::scalar("name", reference.name.as_str()),
        Field::scalar("version", reference.version.as_str()),
        Field::new("extraIdentity", extra_identity(&reference.extra_identity)),
        Field::new("digest", digest_record(digest)),
    ]))
}

fn resource_record(cd: &ComponentDescriptor, resource: &Resource) -> SignatureResult<CanonicalValue> {
    let mut fields = vec![
        Field::scalar("name", resource.name.as_str()),
        Field::scalar("version", resource.version.as_str()),
        Field::scalar("type", resource.resource_type.as_str()),
        Field::scalar("relation", resource.relation.as_str()),
        Field::new("extraIdentity", extra_identity(&resource.extra_identity)),
    ];

    if !resource.has_no_access() {
        let digest = resource.digest.as_ref().ok_or_else(|| {
            not_normalisable(cd, resource.element_ref(), "missing digest".to_string())
        })?;
        if !digest.is_excluded_from_signature() {
            fields.push(Field::new("digest", digest_record(digest)));
        }
    }

    Ok(CanonicalValue::Record(fields))
}

fn digest_record(digest: &DigestSpec) -> CanonicalValue {
    CanonicalValue::Record(vec![
        Field::scalar("hashAlgorithm", digest.hash_algorithm.as_str()),
        Field::scalar("normalisationAlgorithm", digest.normalisation_algorithm.as_str()),
        Field::scalar("value", digest.value.as_str()),
    ])
}

// An empty identity encodes as null, matching the reference encoder's nil slice.
fn extra_identity(identity: &Identity) -> CanonicalValue {
    if identity.is_empty() {
        return CanonicalValue::Null;
    }
    CanonicalValue::Record(identity.iter().map(|(k, v)| Field::scalar(k, v)).collect())
}

fn not_normalisable(
    cd: &ComponentDescriptor,
    element: compdesc_model::ElementRef,
    reason: String,
) -> SignatureError {
    SignatureError::NotNormalisable {
        component: cd.component_ref(),
        element: Some(element),
        reason,
    }
}
