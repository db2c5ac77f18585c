//! Bottom-up digest propagation across a tree of component descriptors.
//!
//! A descriptor's reference digests are the descriptor digests of the
//! referenced components, so children must be fully digested before their
//! parents. [`RecursiveDigester`] fetches each referenced descriptor from a
//! [`DescriptorSource`], digests it recursively, and hands the child's
//! descriptor digest to the propagator as the reference digest.
//!
//! [`RecursiveDigester::check`] walks the same tree read-only and confirms
//! that the reference digests stored in a descriptor still match what the
//! referenced descriptors hash to.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use compdesc_model::{ComponentDescriptor, ComponentRef, DigestSpec, Resource};

use crate::signatures::{
    add_digests_to_component_descriptor, hash_for_component_descriptor, hash_function,
    HashAlgorithm, ResolveError, SignatureError, SignatureResult,
};

/// Fetches component descriptors by component name and version.
pub trait DescriptorSource {
    fn fetch(&self, component_name: &str, version: &str)
        -> Result<ComponentDescriptor, ResolveError>;
}

/// Descriptors held in memory, keyed by `(name, version)`.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    descriptors: BTreeMap<(String, String), ComponentDescriptor>,
    paths: BTreeMap<(String, String), PathBuf>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cd: ComponentDescriptor) {
        let key = (cd.component.name.clone(), cd.component.version.clone());
        self.descriptors.insert(key, cd);
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// File a descriptor was loaded from by [`InMemorySource::from_dir`].
    pub fn path_of(&self, component_name: &str, version: &str) -> Option<&Path> {
        self.paths
            .get(&(component_name.to_string(), version.to_string()))
            .map(PathBuf::as_path)
    }

    /// Load every `*.json` file in `dir` as a descriptor.
    pub fn from_dir(dir: &Path) -> io::Result<Self> {
        let mut source = Self::new();
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        for path in paths {
            let cd = ComponentDescriptor::from_file(&path)?;
            let key = (cd.component.name.clone(), cd.component.version.clone());
            source.insert(cd);
            source.paths.insert(key, path);
        }
        Ok(source)
    }
}

impl DescriptorSource for InMemorySource {
    fn fetch(
        &self,
        component_name: &str,
        version: &str,
    ) -> Result<ComponentDescriptor, ResolveError> {
        self.descriptors
            .get(&(component_name.to_string(), version.to_string()))
            .cloned()
            .ok_or_else(|| {
                format!("component descriptor {}:{} not found", component_name, version).into()
            })
    }
}

type ResourceResolver<'r> = dyn FnMut(&ComponentDescriptor, &Resource) -> Result<DigestSpec, ResolveError> + 'r;

/// Digests a descriptor and everything it references, children first.
pub struct RecursiveDigester<'a> {
    source: &'a dyn DescriptorSource,
    hash: HashAlgorithm,
    skip_access_types: BTreeSet<String>,
}

impl<'a> RecursiveDigester<'a> {
    pub fn new(source: &'a dyn DescriptorSource, hash: HashAlgorithm) -> Self {
        Self {
            source,
            hash,
            skip_access_types: BTreeSet::new(),
        }
    }

    /// Resources whose access type is in `types` get the Exclusion Sentinel
    /// instead of a resolved digest.
    pub fn skip_access_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_access_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Digest `root` and all descriptors reachable from it.
    ///
    /// `root` is updated in place. Returns every digested descriptor with
    /// children before parents and `root` last. A descriptor referenced more
    /// than once is fetched and returned once.
    pub fn digest<F>(
        &self,
        root: &mut ComponentDescriptor,
        mut resource_resolver: F,
    ) -> SignatureResult<Vec<ComponentDescriptor>>
    where
        F: FnMut(&ComponentDescriptor, &Resource) -> Result<DigestSpec, ResolveError>,
    {
        let mut walk = Walk::default();
        self.visit(root, &mut walk, &mut resource_resolver)?;
        Ok(walk.digested)
    }

    fn visit(
        &self,
        cd: &mut ComponentDescriptor,
        walk: &mut Walk,
        resource_resolver: &mut ResourceResolver<'_>,
    ) -> SignatureResult<DigestSpec> {
        let key = cd.component_ref().to_string();
        walk.stack.push(key.clone());
        tracing::debug!(component = %key, depth = walk.stack.len(), "digesting component descriptor");

        self.mark_excluded(cd);

        let mut reference_digests = Vec::with_capacity(cd.component.component_references.len());
        for reference in &cd.component.component_references {
            let child_key = format!("{}:{}", reference.component_name, reference.version);
            if walk.stack.contains(&child_key) {
                let mut path = walk.stack.clone();
                path.push(child_key);
                return Err(SignatureError::ReferenceCycle { path });
            }
            if let Some(digest) = walk.completed.get(&child_key) {
                reference_digests.push(digest.clone());
                continue;
            }

            let mut child = self
                .source
                .fetch(&reference.component_name, &reference.version)
                .map_err(|source| SignatureError::Resolve {
                    component: cd.component_ref(),
                    element: reference.element_ref(),
                    source,
                })?;
            let digest = self.visit(&mut child, walk, resource_resolver)?;
            reference_digests.push(digest);
        }

        let mut reference_digests = reference_digests.into_iter();
        add_digests_to_component_descriptor(
            cd,
            |_, reference| {
                reference_digests.next().ok_or_else(|| {
                    format!("no digest computed for component reference {}", reference.name)
                        .into()
                })
            },
            &mut *resource_resolver,
        )?;

        let digest = hash_for_component_descriptor(cd, self.hash)?;
        walk.stack.pop();
        walk.completed.insert(key, digest.clone());
        walk.digested.push(cd.clone());
        Ok(digest)
    }

    /// Check the stored digests of `root` against its referenced descriptors.
    ///
    /// Every component reference must carry a complete digest. Each
    /// referenced descriptor is fetched and its digest recalculated from the
    /// bottom up, replacing the digests stored on its own elements, so a
    /// stale digest anywhere below shows up as a changed reference digest at
    /// the root. Resource digests of `root` are compared with what
    /// `resource_resolver` returns. `root` is not modified.
    pub fn check<F>(
        &self,
        root: &ComponentDescriptor,
        mut resource_resolver: F,
    ) -> SignatureResult<()>
    where
        F: FnMut(&ComponentDescriptor, &Resource) -> Result<DigestSpec, ResolveError>,
    {
        let component = root.component_ref();
        let mut walk = Walk::default();
        walk.stack.push(component.to_string());

        for reference in &root.component.component_references {
            let element = reference.element_ref();
            let existing = match &reference.digest {
                Some(digest) if digest.is_complete() => digest,
                _ => {
                    return Err(SignatureError::NotNormalisable {
                        component: component.clone(),
                        element: Some(element),
                        reason: "missing digest in component reference".to_string(),
                    })
                }
            };
            let hash = hash_function(&existing.hash_algorithm)
                .map_err(|e| e.in_component(&component))?;

            let calculated = self.recalculate(
                &component,
                reference,
                hash,
                &mut walk,
                &mut resource_resolver,
            )?;
            if *existing != calculated {
                tracing::warn!(
                    component = %component,
                    element = %element,
                    existing = %existing,
                    calculated = %calculated,
                    "stale component reference digest"
                );
                return Err(SignatureError::DigestMismatch {
                    component,
                    element,
                    existing: existing.clone(),
                    calculated,
                });
            }
        }

        for resource in &root.component.resources {
            let element = resource.element_ref();
            if resource.has_no_access() {
                match &resource.digest {
                    Some(digest) if !digest.is_excluded_from_signature() => {
                        return Err(SignatureError::NotNormalisable {
                            component,
                            element: Some(element),
                            reason: "resource without access carries a digest".to_string(),
                        })
                    }
                    _ => continue,
                }
            }
            let existing = match &resource.digest {
                Some(digest) if digest.is_excluded_from_signature() => continue,
                Some(digest) if digest.is_complete() => digest,
                _ => {
                    return Err(SignatureError::NotNormalisable {
                        component,
                        element: Some(element),
                        reason: "missing digest in resource".to_string(),
                    })
                }
            };
            let calculated =
                resource_resolver(root, resource).map_err(|source| SignatureError::Resolve {
                    component: component.clone(),
                    element: element.clone(),
                    source,
                })?;
            if *existing != calculated {
                return Err(SignatureError::DigestMismatch {
                    component,
                    element,
                    existing: existing.clone(),
                    calculated,
                });
            }
        }

        tracing::info!(component = %component, "component descriptor digests match");
        Ok(())
    }

    /// Digest of the descriptor behind `reference`, recalculated from the
    /// referenced tree instead of trusting its stored element digests.
    fn recalculate(
        &self,
        parent: &ComponentRef,
        reference: &compdesc_model::ComponentReference,
        hash: HashAlgorithm,
        walk: &mut Walk,
        resource_resolver: &mut ResourceResolver<'_>,
    ) -> SignatureResult<DigestSpec> {
        let key = format!("{}:{}", reference.component_name, reference.version);
        if walk.stack.contains(&key) {
            let mut path = walk.stack.clone();
            path.push(key);
            return Err(SignatureError::ReferenceCycle { path });
        }
        if let Some(digest) = walk
            .completed
            .get(&key)
            .filter(|d| d.hash_algorithm == hash.name())
        {
            return Ok(digest.clone());
        }

        let mut child = self
            .source
            .fetch(&reference.component_name, &reference.version)
            .map_err(|source| SignatureError::Resolve {
                component: parent.clone(),
                element: reference.element_ref(),
                source,
            })?;
        walk.stack.push(key.clone());
        let component = child.component_ref();
        self.mark_excluded(&mut child);

        let references = child.component.component_references.clone();
        for (i, nested) in references.iter().enumerate() {
            let nested_hash = match &nested.digest {
                Some(digest) if digest.is_complete() => hash_function(&digest.hash_algorithm)
                    .map_err(|e| e.in_component(&component))?,
                _ => self.hash,
            };
            let digest =
                self.recalculate(&component, nested, nested_hash, walk, resource_resolver)?;
            child.component.component_references[i].digest = Some(digest);
        }

        for i in 0..child.component.resources.len() {
            let resource = &child.component.resources[i];
            let excluded = resource
                .digest
                .as_ref()
                .is_some_and(DigestSpec::is_excluded_from_signature);
            if excluded || resource.has_no_access() {
                continue;
            }
            let calculated =
                resource_resolver(&child, resource).map_err(|source| SignatureError::Resolve {
                    component: component.clone(),
                    element: resource.element_ref(),
                    source,
                })?;
            if resource.digest.as_ref().is_some_and(|d| *d != calculated) {
                // untrusted; the changed descriptor digest reports it at the root
                tracing::info!(
                    component = %component,
                    resource = %resource.element_ref(),
                    "calculated digest differs from stored resource digest"
                );
            }
            child.component.resources[i].digest = Some(calculated);
        }

        let digest = hash_for_component_descriptor(&child, hash)?;
        walk.stack.pop();
        walk.completed.insert(key, digest.clone());
        Ok(digest)
    }

    fn mark_excluded(&self, cd: &mut ComponentDescriptor) {
        let component = cd.component_ref();
        for resource in &mut cd.component.resources {
            let skipped = resource
                .access
                .as_ref()
                .is_some_and(|a| self.skip_access_types.contains(&a.object_type));
            if skipped {
                tracing::info!(
                    component = %component,
                    resource = %resource.element_ref(),
                    "excluding resource from signature"
                );
                resource.digest = Some(DigestSpec::exclude_from_signature());
            }
        }
    }
}

#[derive(Default)]
struct Walk {
    stack: Vec<String>,
    completed: HashMap<String, DigestSpec>,
    digested: Vec<ComponentDescriptor>,
}
