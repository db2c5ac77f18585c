//! Configuration merge logic
//!
//! - Objects: deep-merge by key
//! - Arrays: replace (last wins)
//! - Scalars: override (last wins)

use serde_json::Value;

/// Deep merge two JSON values. `overlay` takes precedence.
///
/// A `null` in the overlay clears the base value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }

        // Arrays are never concatenated
        (_, overlay) => overlay,
    }
}

/// Merge layers in order; the last layer has the highest precedence.
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_override() {
        let result = deep_merge(json!({"hash_algorithm": "sha256"}), json!({"hash_algorithm": "sha512"}));
        assert_eq!(result["hash_algorithm"], "sha512");
    }

    #[test]
    fn test_skip_list_replaced() {
        let base = json!({"skip_access_types": ["s3", "localFilesystemBlob"]});
        let overlay = json!({"skip_access_types": ["ociBlob"]});
        let result = deep_merge(base, overlay);
        assert_eq!(result["skip_access_types"], json!(["ociBlob"]));
    }

    #[test]
    fn test_nested_deep_merge() {
        let base = json!({"keys": {"private_key": "a.pem", "public_key": "a.pub"}});
        let overlay = json!({"keys": {"public_key": "b.pub"}});
        let result = deep_merge(base, overlay);
        assert_eq!(result["keys"]["private_key"], "a.pem");
        assert_eq!(result["keys"]["public_key"], "b.pub");
    }

    #[test]
    fn test_null_clears() {
        let result = deep_merge(json!({"private_key": "a.pem"}), json!({"private_key": null}));
        assert!(result["private_key"].is_null());
    }

    #[test]
    fn test_merge_layers_precedence() {
        let builtin = json!({"hash_algorithm": "sha256", "signature_name": "default"});
        let host = json!({"signature_name": "team"});
        let file = json!({"hash_algorithm": "sha512"});
        let cli = json!({"signature_name": "release"});

        let result = merge_layers(vec![builtin, host, file, cli]);
        assert_eq!(result["signature_name"], "release");
        assert_eq!(result["hash_algorithm"], "sha512");
    }
}
