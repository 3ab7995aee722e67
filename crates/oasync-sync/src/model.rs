//! Canonical ("general") record model.

use serde::{Deserialize, Serialize};

/// Vendor-neutral description of one deployed API instance on one platform.
///
/// The root document of an API folder uses the same shape; only the display
/// metadata, owner and documentation fields are meaningful there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanonicalRecord {
    pub name: String,
    pub display_name: String,
    pub version: String,
    pub description: String,
    pub owner_email: String,
    pub owner_name: String,
    pub documentation_url: String,
    pub gateway_url: String,
    pub base_path: String,
    pub platform_id: String,
    pub platform_name: String,
    pub platform_resource_uri: String,
    /// Raw specification body, loaded from the `-oas` companion document.
    #[serde(skip)]
    pub spec: Option<Vec<u8>>,
}

impl CanonicalRecord {
    pub fn with_spec(mut self, spec: Vec<u8>) -> Self {
        self.spec = Some(spec);
        self
    }
}

/// API-level metadata taken from the root canonical document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalApiMeta {
    pub key: String,
    pub display_name: String,
    pub description: String,
    pub documentation_url: String,
    pub owner_name: String,
    pub owner_email: String,
}

impl CanonicalApiMeta {
    pub fn from_record(key: impl Into<String>, record: &CanonicalRecord) -> Self {
        Self {
            key: key.into(),
            display_name: record.display_name.clone(),
            description: record.description.clone(),
            documentation_url: record.documentation_url.clone(),
            owner_name: record.owner_name.clone(),
            owner_email: record.owner_email.clone(),
        }
    }
}

pub(crate) fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reads_camel_case_and_tolerates_missing_fields() {
        let record: CanonicalRecord = serde_json::from_str(
            r#"{"name":"orders-v1-aws","displayName":"Orders","gatewayUrl":"https://gw","platformId":"aws"}"#,
        )
        .unwrap();
        assert_eq!(record.name, "orders-v1-aws");
        assert_eq!(record.display_name, "Orders");
        assert_eq!(record.gateway_url, "https://gw");
        assert_eq!(record.platform_id, "aws");
        assert!(record.owner_email.is_empty());
        assert!(record.spec.is_none());
        assert!(record.documentation_url.is_empty());
    }

    #[test]
    fn test_spec_is_never_serialized() {
        let record = CanonicalRecord {
            name: "orders-v1-aws".into(),
            ..Default::default()
        }
        .with_spec(b"{}".to_vec());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("spec").is_none());
        assert_eq!(json["platformResourceUri"], "");
    }
}
