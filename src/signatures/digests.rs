//! Digest propagation: fill in the digests of component references and
//! resources by asking resolver collaborators for them.
//!
//! Elements are processed sequentially, references first and then resources,
//! both in list order, so the first failing element is deterministic. A
//! resolved digest that differs from one already stored on the element is a
//! `DigestMismatch` and is never overwritten.

use compdesc_model::{ComponentDescriptor, ComponentReference, DigestSpec, ElementRef, Resource};

use super::error::{ResolveError, SignatureError, SignatureResult};

/// Compute, or check, the digest of every reference and resource of `cd`.
///
/// Resources carrying the Exclusion Sentinel, and resources without access
/// and without a digest, are skipped without calling `resource_resolver`;
/// the latter keep an absent digest. On failure the elements processed so far keep their
/// newly stored digests.
pub fn add_digests_to_component_descriptor<R, S>(
    cd: &mut ComponentDescriptor,
    mut reference_resolver: R,
    mut resource_resolver: S,
) -> SignatureResult<()>
where
    R: FnMut(&ComponentDescriptor, &ComponentReference) -> Result<DigestSpec, ResolveError>,
    S: FnMut(&ComponentDescriptor, &Resource) -> Result<DigestSpec, ResolveError>,
{
    let component = cd.component_ref();

    for i in 0..cd.component.component_references.len() {
        let reference = &cd.component.component_references[i];
        let element = reference.element_ref();
        let calculated =
            reference_resolver(cd, reference).map_err(|source| SignatureError::Resolve {
                component: component.clone(),
                element: element.clone(),
                source,
            })?;

        let existing = &mut cd.component.component_references[i].digest;
        store_digest(existing, calculated, &component, element)?;
    }

    for i in 0..cd.component.resources.len() {
        let resource = &cd.component.resources[i];
        if resource
            .digest
            .as_ref()
            .is_some_and(DigestSpec::is_excluded_from_signature)
        {
            tracing::debug!(
                component = %component,
                resource = %resource.element_ref(),
                "resource excluded from signature, skipping digest"
            );
            continue;
        }
        if resource.has_no_access() && resource.digest.is_none() {
            tracing::debug!(
                component = %component,
                resource = %resource.element_ref(),
                "resource has no access, nothing to digest"
            );
            continue;
        }

        let element = resource.element_ref();
        let calculated =
            resource_resolver(cd, resource).map_err(|source| SignatureError::Resolve {
                component: component.clone(),
                element: element.clone(),
                source,
            })?;

        let existing = &mut cd.component.resources[i].digest;
        store_digest(existing, calculated, &component, element)?;
    }

    Ok(())
}

fn store_digest(
    existing: &mut Option<DigestSpec>,
    calculated: DigestSpec,
    component: &compdesc_model::ComponentRef,
    element: ElementRef,
) -> SignatureResult<()> {
    match existing {
        Some(current) if *current != calculated => {
            tracing::warn!(
                component = %component,
                element = %element,
                existing = %current,
                calculated = %calculated,
                "digest mismatch"
            );
            Err(SignatureError::DigestMismatch {
                component: component.clone(),
                element,
                existing: current.clone(),
                calculated,
            })
        }
        Some(_) => Ok(()),
        None => {
            tracing::debug!(component = %component, element = %element, digest = %calculated, "added digest");
            *existing = Some(calculated);
            Ok(())
        }
    }
}
