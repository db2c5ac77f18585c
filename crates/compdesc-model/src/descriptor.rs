//! The component descriptor document.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::digest::Signature;
use crate::error::ModelError;
use crate::identity::{ComponentRef, Identifiable, Label, Labels};
use crate::resource::{ComponentReference, Resource, Source};
use crate::{NONE_ACCESS_TYPE, SCHEMA_VERSION};

/// Schema metadata of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

/// Provider of a component in the origin's context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderType {
    Internal,
    External,
    Other(String),
}

impl ProviderType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::Other(s) => s,
        }
    }
}

impl Default for ProviderType {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for ProviderType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "internal" => Self::Internal,
            "external" => Self::External,
            _ => Self::Other(s),
        }
    }
}

impl From<ProviderType> for String {
    fn from(p: ProviderType) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed object with arbitrary attributes (access methods, repository contexts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedObject {
    #[serde(rename = "type")]
    pub object_type: String,

    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl TypedObject {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            attributes: serde_json::Map::new(),
        }
    }

    /// Add an attribute, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The explicit "no access" marker.
    pub fn none() -> Self {
        Self::new(NONE_ACCESS_TYPE)
    }

    pub fn is_none_type(&self) -> bool {
        self.object_type == NONE_ACCESS_TYPE
    }
}

/// Specification of a component version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub name: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub repository_contexts: Vec<TypedObject>,

    #[serde(default)]
    pub provider: ProviderType,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub sources: Vec<Source>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub component_references: Vec<ComponentReference>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub resources: Vec<Resource>,
}

/// Lists written by the Go tooling serialize as `null` when empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A versioned component with its resources, sources and dependencies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    #[serde(rename = "meta")]
    pub metadata: Metadata,

    pub component: ComponentSpec,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<Signature>,
}

impl ComponentDescriptor {
    /// Create an empty `v2` descriptor.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            metadata: Metadata::default(),
            component: ComponentSpec {
                name: name.into(),
                version: version.into(),
                ..Default::default()
            },
            signatures: Vec::new(),
        }
    }

    pub fn component_ref(&self) -> ComponentRef {
        ComponentRef::of(self)
    }

    pub fn resources(&self) -> &[Resource] {
        &self.component.resources
    }

    pub fn component_references(&self) -> &[ComponentReference] {
        &self.component.component_references
    }

    /// Structural validation of the descriptor.
    ///
    /// Not required for normalisation; intended for documents read from
    /// untrusted files before they are digested or signed.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.metadata.schema_version != SCHEMA_VERSION {
            return Err(ModelError::UnsupportedSchemaVersion(
                self.metadata.schema_version.clone(),
            ));
        }
        if self.component.name.is_empty() {
            return Err(ModelError::MissingField("component.name"));
        }
        if self.component.version.is_empty() {
            return Err(ModelError::MissingField("component.version"));
        }

        let mut seen = HashSet::new();
        for resource in &self.component.resources {
            resource
                .extra_identity
                .validate()
                .map_err(|e| invalid(resource.element_ref(), e))?;
            let identity = resource.identity();
            if !seen.insert(identity.clone()) {
                return Err(ModelError::DuplicateIdentity {
                    kind: "resource".to_string(),
                    identity: identity.to_string(),
                });
            }
        }

        let mut seen = HashSet::new();
        for source in &self.component.sources {
            source
                .extra_identity
                .validate()
                .map_err(|e| invalid(source.element_ref(), e))?;
            let identity = source.identity();
            if !seen.insert(identity.clone()) {
                return Err(ModelError::DuplicateIdentity {
                    kind: "source".to_string(),
                    identity: identity.to_string(),
                });
            }
        }

        let mut seen = HashSet::new();
        for reference in &self.component.component_references {
            reference
                .extra_identity
                .validate()
                .map_err(|e| invalid(reference.element_ref(), e))?;
            let identity = reference.identity();
            if !seen.insert(identity.clone()) {
                return Err(ModelError::DuplicateIdentity {
                    kind: "component reference".to_string(),
                    identity: identity.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from a JSON file.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))
    }

    /// Write as pretty JSON.
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }
}

fn invalid(element: impl fmt::Display, err: ModelError) -> ModelError {
    ModelError::InvalidElement {
        element: element.to_string(),
        reason: err.to_string(),
    }
}

impl Identifiable for ComponentDescriptor {
    fn name(&self) -> &str {
        &self.component.name
    }

    fn version(&self) -> &str {
        &self.component.version
    }

    fn labels(&self) -> &[Label] {
        self.component.labels.as_slice()
    }
}
