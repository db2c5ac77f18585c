//! Built-in signing defaults (layer 1)

use serde::{Deserialize, Serialize};

use compdesc_model::MEDIA_TYPE_RSA_SIGNATURE;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Name under which signatures are stored and looked up (default: "default")
    pub signature_name: String,

    /// Hash algorithm of the descriptor digest (default: "sha256")
    pub hash_algorithm: String,

    /// Signature encoding (default: hex, "application/vnd.ocm.signature.rsa")
    pub media_type: String,

    /// Access types whose resources are excluded from the signature (default: none)
    pub skip_access_types: Vec<String>,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            signature_name: "default".to_string(),
            hash_algorithm: "sha256".to_string(),
            media_type: MEDIA_TYPE_RSA_SIGNATURE.to_string(),
            skip_access_types: Vec::new(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "signature_name": self.signature_name,
            "hash_algorithm": self.hash_algorithm,
            "media_type": self.media_type,
            "skip_access_types": self.skip_access_types,
        })
    }
}
