//! Identities, labels and the accessor trait shared by all named entities.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ModelError;

/// System identity key holding the element name.
pub const SYSTEM_IDENTITY_NAME: &str = "name";

/// System identity key holding the element version.
pub const SYSTEM_IDENTITY_VERSION: &str = "version";

/// Identity of an object beyond its name.
///
/// Keys are ASCII strings; the key `name` is system-assigned and must not be
/// supplied as part of an extra identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(BTreeMap<String, String>);

impl Identity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when every entry of `self` is present with the same value in `other`.
    pub fn matches(&self, other: &Identity) -> bool {
        self.0.iter().all(|(k, v)| other.get(k) == Some(v.as_str()))
    }

    /// Check the constraints on a user supplied extra identity.
    pub fn validate(&self) -> Result<(), ModelError> {
        for key in self.0.keys() {
            if key == SYSTEM_IDENTITY_NAME {
                return Err(ModelError::ReservedIdentityKey(key.clone()));
            }
            if !key.is_ascii() {
                return Err(ModelError::NonAsciiIdentityKey(key.clone()));
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Identity {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        write!(f, "}}")
    }
}

/// A label attached to an entity. The value is arbitrary JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: serde_json::Value,
}

/// Ordered list of labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(pub Vec<Label>);

impl Labels {
    /// Value of the first label with the given name.
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.iter().find(|l| l.name == name).map(|l| &l.value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Label] {
        &self.0
    }
}

/// Read access to the name, version and labels of a descriptor entity.
pub trait Identifiable {
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn labels(&self) -> &[Label];
}

/// `name:version` of a component descriptor, used to give errors context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRef {
    pub name: String,
    pub version: String,
}

impl ComponentRef {
    pub fn of(entity: &impl Identifiable) -> Self {
        Self {
            name: entity.name().to_string(),
            version: entity.version().to_string(),
        }
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// Kind of element inside a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Resource,
    ComponentReference,
    Source,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource => write!(f, "resource"),
            Self::ComponentReference => write!(f, "component reference"),
            Self::Source => write!(f, "source"),
        }
    }
}

/// Identity of a resource, source or component reference inside a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub kind: ElementKind,
    pub name: String,
    pub version: String,
    pub extra_identity: Identity,
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.kind, self.name, self.version)?;
        if !self.extra_identity.is_empty() {
            write!(f, " {}", self.extra_identity)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_rejects_reserved_name_key() {
        let identity: Identity = [("name", "x")].into_iter().collect();
        assert!(matches!(
            identity.validate(),
            Err(ModelError::ReservedIdentityKey(k)) if k == "name"
        ));
    }

    #[test]
    fn test_identity_rejects_non_ascii_key() {
        let identity: Identity = [("plätform", "linux")].into_iter().collect();
        assert!(matches!(
            identity.validate(),
            Err(ModelError::NonAsciiIdentityKey(_))
        ));
    }

    #[test]
    fn test_identity_iterates_sorted() {
        let identity: Identity = [("b", "2"), ("a", "1"), ("c", "3")].into_iter().collect();
        let keys: Vec<_> = identity.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(identity.to_string(), "{a=1, b=2, c=3}");
    }

    #[test]
    fn test_identity_matches_subset() {
        let selector: Identity = [("arch", "amd64")].into_iter().collect();
        let full: Identity = [("arch", "amd64"), ("os", "linux")].into_iter().collect();
        assert!(selector.matches(&full));
        assert!(!full.matches(&selector));
    }

    #[test]
    fn test_labels_get() {
        let labels = Labels(vec![Label {
            name: "team".to_string(),
            value: serde_json::json!("core"),
        }]);
        assert_eq!(labels.get("team"), Some(&serde_json::json!("core")));
        assert!(labels.get("missing").is_none());
    }

    #[test]
    fn test_element_ref_display() {
        let element = ElementRef {
            kind: ElementKind::Resource,
            name: "image".to_string(),
            version: "1.0.0".to_string(),
            extra_identity: [("arch", "arm64")].into_iter().collect(),
        };
        assert_eq!(element.to_string(), "resource image:1.0.0 {arch=arm64}");
    }
}
