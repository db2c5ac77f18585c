//! Recursive digesting of a descriptor tree loaded from fixture files.

mod fixtures;

use compdesc_signing::model::{ComponentDescriptor, DigestSpec, Resource};
use compdesc_signing::signatures::{ResolveError, SignatureError};
use compdesc_signing::{
    hash_for_component_descriptor, DescriptorSource, HashAlgorithm, InMemorySource,
    RecursiveDigester,
};
use fixtures::{tree_repository_path, tree_root_path};

fn existing_digest(_: &ComponentDescriptor, r: &Resource) -> Result<DigestSpec, ResolveError> {
    r.digest
        .clone()
        .ok_or_else(|| format!("no digest for {}", r.name).into())
}

fn load() -> (ComponentDescriptor, InMemorySource) {
    let root = ComponentDescriptor::from_file(&tree_root_path()).unwrap();
    let source = InMemorySource::from_dir(&tree_repository_path()).unwrap();
    (root, source)
}

#[test]
fn test_tree_digest_order_and_references() {
    let (mut root, source) = load();
    assert_eq!(source.len(), 2);

    let digester = RecursiveDigester::new(&source, HashAlgorithm::Sha256).skip_access_types(["s3"]);
    let digested = digester.digest(&mut root, existing_digest).unwrap();

    let names: Vec<_> = digested.iter().map(|cd| cd.component.name.clone()).collect();
    assert_eq!(
        names,
        vec!["example.com/certs", "example.com/ingress", "example.com/landscape"]
    );

    let certs_digest = hash_for_component_descriptor(&digested[0], HashAlgorithm::Sha256).unwrap();
    let ingress_digest =
        hash_for_component_descriptor(&digested[1], HashAlgorithm::Sha256).unwrap();

    assert_eq!(
        root.component.component_references[0].digest,
        Some(ingress_digest)
    );
    assert_eq!(
        root.component.component_references[1].digest,
        Some(certs_digest.clone())
    );
    assert_eq!(
        digested[1].component.component_references[0].digest,
        Some(certs_digest)
    );

    // s3 resource excluded
    assert_eq!(
        digested[1].component.resources[1].digest,
        Some(DigestSpec::exclude_from_signature())
    );
}

#[test]
fn test_tree_digest_is_stable() {
    let (mut first, source) = load();
    let digester = RecursiveDigester::new(&source, HashAlgorithm::Sha256).skip_access_types(["s3"]);
    digester.digest(&mut first, existing_digest).unwrap();

    // running again over the digested root finds matching digests
    let mut second = first.clone();
    digester.digest(&mut second, existing_digest).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_tree_without_skip_fails_on_unresolvable_resource() {
    let (mut root, source) = load();
    let digester = RecursiveDigester::new(&source, HashAlgorithm::Sha256);
    let err = digester.digest(&mut root, existing_digest).unwrap_err();
    match err {
        SignatureError::Resolve {
            component, element, ..
        } => {
            assert_eq!(component.to_string(), "example.com/ingress:1.4.0");
            assert_eq!(element.name, "archive");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_changed_child_is_detected() {
    let (mut root, source) = load();
    let digester = RecursiveDigester::new(&source, HashAlgorithm::Sha256).skip_access_types(["s3"]);
    digester.digest(&mut root, existing_digest).unwrap();

    // a new certs release under the same version
    let mut changed = source.clone();
    let mut certs = source.fetch("example.com/certs", "0.9.2").unwrap();
    certs.component.resources[0].digest = Some(DigestSpec::new(
        "sha256",
        "ociArtifactDigest/v1",
        "00".repeat(32),
    ));
    changed.insert(certs);

    let digester =
        RecursiveDigester::new(&changed, HashAlgorithm::Sha256).skip_access_types(["s3"]);
    let err = digester.digest(&mut root, existing_digest).unwrap_err();
    assert!(matches!(err, SignatureError::DigestMismatch { .. }));
}

#[test]
fn test_no_access_resource_keeps_absent_digest() {
    let (mut root, source) = load();
    let digester = RecursiveDigester::new(&source, HashAlgorithm::Sha256).skip_access_types(["s3"]);
    digester.digest(&mut root, existing_digest).unwrap();

    let readme = &root.component.resources[1];
    assert_eq!(readme.name, "readme");
    assert!(readme.digest.is_none());
    assert!(!root.to_json().unwrap().contains("EXCLUDE-FROM-SIGNATURE"));
}

#[test]
fn test_check_digested_tree() {
    let (mut root, source) = load();
    let digester = RecursiveDigester::new(&source, HashAlgorithm::Sha256).skip_access_types(["s3"]);
    digester.digest(&mut root, existing_digest).unwrap();

    digester.check(&root, existing_digest).unwrap();
}

#[test]
fn test_check_detects_tampered_child() {
    let (mut root, source) = load();
    let digester = RecursiveDigester::new(&source, HashAlgorithm::Sha256).skip_access_types(["s3"]);
    digester.digest(&mut root, existing_digest).unwrap();

    // certs republished under the same version; the root still holds the old digests
    let mut tampered = source.clone();
    let mut certs = source.fetch("example.com/certs", "0.9.2").unwrap();
    certs.component.resources[0].digest = Some(DigestSpec::new(
        "sha256",
        "ociArtifactDigest/v1",
        "00".repeat(32),
    ));
    tampered.insert(certs);

    let digester =
        RecursiveDigester::new(&tampered, HashAlgorithm::Sha256).skip_access_types(["s3"]);
    let err = digester.check(&root, existing_digest).unwrap_err();
    match err {
        SignatureError::DigestMismatch { element, .. } => assert_eq!(element.name, "ingress"),
        other => panic!("unexpected error: {other}"),
    }
}
