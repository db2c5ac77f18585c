//! Golden-file tests for descriptor normalisation and digests.

mod fixtures;

use compdesc_signing::model::{ComponentDescriptor, DigestSpec, TypedObject};
use compdesc_signing::signatures::SignatureError;
use compdesc_signing::{hash_for_component_descriptor, normalise_component_descriptor, HashAlgorithm};
use fixtures::{load_descriptor, GoldenExpectations};
use serde_json::Value;

#[test]
fn test_golden_normalised_forms() {
    let golden = GoldenExpectations::load().expect("Failed to load golden.json");
    assert!(!golden.cases.is_empty());

    for case in &golden.cases {
        let cd = case.load_descriptor().expect("Failed to load descriptor");
        let normalised = normalise_component_descriptor(&cd).unwrap();
        assert_eq!(
            String::from_utf8(normalised).unwrap(),
            case.normalised,
            "normalised form of {}",
            case.descriptor
        );

        let digest = hash_for_component_descriptor(&cd, HashAlgorithm::Sha256).unwrap();
        assert_eq!(digest.value, case.sha256, "digest of {}", case.descriptor);
        assert_eq!(digest.normalisation_algorithm, "jsonNormalisation/v1");
    }
}

#[test]
fn test_field_order_does_not_matter() {
    let a = load_descriptor("descriptors/root.json");
    let b = load_descriptor("descriptors/reordered-root.json");
    assert_eq!(
        normalise_component_descriptor(&a).unwrap(),
        normalise_component_descriptor(&b).unwrap()
    );
}

/// Every array of single-key objects must be sorted by key.
fn assert_records_sorted(value: &Value, path: &str) {
    let Value::Array(items) = value else {
        return;
    };
    let is_record = !items.is_empty()
        && items
            .iter()
            .all(|i| i.as_object().is_some_and(|o| o.len() == 1));
    if is_record {
        let keys: Vec<&str> = items
            .iter()
            .filter_map(|i| i.as_object())
            .filter_map(|o| o.keys().next().map(String::as_str))
            .collect();
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1], "{}: {} !< {}", path, pair[0], pair[1]);
        }
        for item in items.iter().filter_map(|i| i.as_object()) {
            for (key, inner) in item {
                assert_records_sorted(inner, &format!("{}.{}", path, key));
            }
        }
    } else {
        for (i, item) in items.iter().enumerate() {
            assert_records_sorted(item, &format!("{}[{}]", path, i));
        }
    }
}

#[test]
fn test_sort_invariant_on_fixtures() {
    for file in [
        "descriptors/root.json",
        "descriptors/with-reference.json",
    ] {
        let cd = load_descriptor(file);
        let normalised = normalise_component_descriptor(&cd).unwrap();
        let value: Value = serde_json::from_slice(&normalised).unwrap();
        assert_records_sorted(&value, "$");
    }
}

#[test]
fn test_labels_and_sources_not_signed() {
    let cd = load_descriptor("descriptors/with-reference.json");
    let normalised = String::from_utf8(normalise_component_descriptor(&cd).unwrap()).unwrap();
    assert!(!normalised.contains("not-signed"));
    assert!(!normalised.contains("imageReference"));
}

#[test]
fn test_excluded_resource_changes_digest_only_by_removal() {
    let mut cd = load_descriptor("descriptors/root.json");
    cd.component.resources[0].digest = Some(DigestSpec::exclude_from_signature());
    let excluded = hash_for_component_descriptor(&cd, HashAlgorithm::Sha256).unwrap();

    cd.component.resources[0].digest = None;
    cd.component.resources[0].access = Some(TypedObject::none());
    let no_access = hash_for_component_descriptor(&cd, HashAlgorithm::Sha256).unwrap();

    assert_eq!(excluded, no_access);
}

#[test]
fn test_not_normalisable_names_element() {
    let mut cd = load_descriptor("descriptors/with-reference.json");
    cd.component.component_references[0].digest = None;

    let err = normalise_component_descriptor(&cd).unwrap_err();
    assert!(matches!(err, SignatureError::NotNormalisable { .. }));
    let message = err.to_string();
    assert!(message.contains("CD-Name:v0.0.1"), "{}", message);
    assert!(message.contains("compRefName:v0.0.2compRef"), "{}", message);
}

#[test]
fn test_null_lists_hash_like_empty_lists() {
    let with_nulls = ComponentDescriptor::from_json(
        r#"{"meta":{"schemaVersion":"v2"},"component":{"name":"example.com/root","version":"1.0.0","provider":"internal","repositoryContexts":null,"sources":null,"componentReferences":null,"resources":null}}"#,
    )
    .unwrap();
    let with_empty = ComponentDescriptor::from_json(
        r#"{"meta":{"schemaVersion":"v2"},"component":{"name":"example.com/root","version":"1.0.0","provider":"internal","repositoryContexts":[],"sources":[],"componentReferences":[],"resources":[]}}"#,
    )
    .unwrap();

    assert_eq!(
        hash_for_component_descriptor(&with_nulls, HashAlgorithm::Sha256).unwrap(),
        hash_for_component_descriptor(&with_empty, HashAlgorithm::Sha256).unwrap()
    );
}
