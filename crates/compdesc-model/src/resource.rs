//! Resources, sources and component references.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::descriptor::TypedObject;
use crate::digest::DigestSpec;
use crate::identity::{
    ElementKind, ElementRef, Identifiable, Identity, Label, Labels, SYSTEM_IDENTITY_NAME,
};

/// Relation of a resource to its component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceRelation {
    /// Built as part of the component.
    Local,
    /// Maintained by a third party.
    External,
    /// Any other value, kept verbatim.
    Other(String),
}

impl ResourceRelation {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Local => "local",
            Self::External => "external",
            Self::Other(s) => s,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl Default for ResourceRelation {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for ResourceRelation {
    fn from(s: String) -> Self {
        match s.as_str() {
            "local" => Self::Local,
            "external" => Self::External,
            _ => Self::Other(s),
        }
    }
}

impl From<ResourceRelation> for String {
    fn from(r: ResourceRelation) -> Self {
        r.as_str().to_string()
    }
}

impl fmt::Display for ResourceRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects sources of the component by identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    #[serde(default, skip_serializing_if = "Identity::is_empty")]
    pub identity_selector: Identity,

    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

/// A resource produced by the component or consumed from a third party.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,

    pub version: String,

    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Identity::is_empty")]
    pub extra_identity: Identity,

    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,

    /// Content digest, filled in by digest propagation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<DigestSpec>,

    #[serde(default, skip_serializing_if = "ResourceRelation::is_empty")]
    pub relation: ResourceRelation,

    #[serde(default, rename = "srcRef", skip_serializing_if = "Vec::is_empty")]
    pub source_refs: Vec<SourceRef>,

    /// Access method; `None` or type `"None"` means the resource has no content.
    #[serde(default)]
    pub access: Option<TypedObject>,
}

impl Resource {
    /// True when the resource has no fetchable content.
    pub fn has_no_access(&self) -> bool {
        self.access.as_ref().map_or(true, TypedObject::is_none_type)
    }

    /// Extra identity plus the system `name` key.
    pub fn identity(&self) -> Identity {
        let mut identity = self.extra_identity.clone();
        identity.insert(SYSTEM_IDENTITY_NAME, self.name.clone());
        identity
    }

    pub fn element_ref(&self) -> ElementRef {
        ElementRef {
            kind: ElementKind::Resource,
            name: self.name.clone(),
            version: self.version.clone(),
            extra_identity: self.extra_identity.clone(),
        }
    }
}

impl Identifiable for Resource {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn labels(&self) -> &[Label] {
        self.labels.as_slice()
    }
}

/// A source that produced the component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub name: String,

    pub version: String,

    #[serde(rename = "type")]
    pub source_type: String,

    #[serde(default, skip_serializing_if = "Identity::is_empty")]
    pub extra_identity: Identity,

    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,

    #[serde(default)]
    pub access: Option<TypedObject>,
}

impl Source {
    pub fn identity(&self) -> Identity {
        let mut identity = self.extra_identity.clone();
        identity.insert(SYSTEM_IDENTITY_NAME, self.name.clone());
        identity
    }

    pub fn element_ref(&self) -> ElementRef {
        ElementRef {
            kind: ElementKind::Source,
            name: self.name.clone(),
            version: self.version.clone(),
            extra_identity: self.extra_identity.clone(),
        }
    }
}

impl Identifiable for Source {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn labels(&self) -> &[Label] {
        self.labels.as_slice()
    }
}

/// Reference to another component version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentReference {
    /// Local name of the reference within the referencing component.
    pub name: String,

    /// Name of the referenced component.
    pub component_name: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Identity::is_empty")]
    pub extra_identity: Identity,

    /// Digest of the referenced component descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<DigestSpec>,

    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

impl ComponentReference {
    pub fn identity(&self) -> Identity {
        let mut identity = self.extra_identity.clone();
        identity.insert(SYSTEM_IDENTITY_NAME, self.name.clone());
        identity
    }

    pub fn element_ref(&self) -> ElementRef {
        ElementRef {
            kind: ElementKind::ComponentReference,
            name: self.name.clone(),
            version: self.version.clone(),
            extra_identity: self.extra_identity.clone(),
        }
    }
}

impl Identifiable for ComponentReference {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn labels(&self) -> &[Label] {
        self.labels.as_slice()
    }
}
