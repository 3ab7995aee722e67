//! Schema translators between canonical records and API Hub documents.
//!
//! Every function here is pure: the scope is the only context, and nothing is
//! read from or written to the store.

use crate::error::{Result, SyncError};
use crate::hub::{
    local_id, HubApi, HubAttribute, HubAttributeValue, HubContents, HubDeployment,
    HubDocumentation, HubOwner, HubSpec, HubVersion, DEPLOYMENT_TYPE_ATTRIBUTE,
    OPENAPI_SPEC_TYPE_ID, OPENAPI_SPEC_TYPE_NAME, SPEC_MIME_TYPE, SPEC_TYPE_ATTRIBUTE,
};
use crate::keys::ResourceKey;
use crate::model::{CanonicalApiMeta, CanonicalRecord};
use crate::names::ResourceScope;

// ============================================================================
// Canonical -> API Hub
// ============================================================================

pub fn to_platform_api(scope: &ResourceScope, meta: &CanonicalApiMeta) -> HubApi {
    let owner = (!meta.owner_name.is_empty()).then(|| HubOwner {
        display_name: meta.owner_name.clone(),
        email: meta.owner_email.clone(),
    });
    HubApi {
        name: scope.api(&meta.key),
        display_name: meta.display_name.clone(),
        description: meta.description.clone(),
        documentation: HubDocumentation::from_url(&meta.documentation_url),
        owner,
        versions: None,
    }
}

pub fn to_platform_deployment(
    scope: &ResourceScope,
    key: &ResourceKey,
    record: &CanonicalRecord,
) -> HubDeployment {
    let platform = HubAttributeValue {
        id: record.platform_id.clone(),
        display_name: record.platform_name.clone(),
        description: record.platform_name.clone(),
        immutable: true,
    };
    let version = if record.version.is_empty() {
        key.version.clone()
    } else {
        record.version.clone()
    };
    HubDeployment {
        name: scope.deployment(&key.deployment),
        display_name: record.display_name.clone(),
        description: record.description.clone(),
        documentation: HubDocumentation::from_url(&record.documentation_url),
        deployment_type: HubAttribute::single(scope.attribute(DEPLOYMENT_TYPE_ATTRIBUTE), platform),
        resource_uri: record.platform_resource_uri.clone(),
        endpoints: non_empty_vec(&record.gateway_url),
        api_versions: vec![version],
    }
}

/// Version document for `version` from the deployments grouped under it.
/// Display metadata comes from the first deployment; documentation from the
/// owning API.
pub fn to_platform_version(
    scope: &ResourceScope,
    api: &str,
    version: &str,
    deployments: &[HubDeployment],
    api_documentation_url: &str,
) -> HubVersion {
    let (display_name, description) = deployments
        .first()
        .map(|d| (d.display_name.clone(), d.description.clone()))
        .unwrap_or_default();
    HubVersion {
        name: scope.version(api, version),
        display_name,
        description,
        documentation: HubDocumentation::from_url(api_documentation_url),
        deployments: deployments.iter().map(|d| d.name.clone()).collect(),
    }
}

pub fn to_platform_spec(
    scope: &ResourceScope,
    api: &str,
    key: &ResourceKey,
    record: &CanonicalRecord,
    spec: &[u8],
    api_documentation_url: &str,
) -> HubSpec {
    let spec_type = HubAttributeValue {
        id: OPENAPI_SPEC_TYPE_ID.to_string(),
        display_name: OPENAPI_SPEC_TYPE_NAME.to_string(),
        description: OPENAPI_SPEC_TYPE_NAME.to_string(),
        immutable: true,
    };
    HubSpec {
        name: scope.spec(api, &key.version, &key.deployment),
        display_name: format!("{} ({})", record.display_name, record.platform_name),
        spec_type: HubAttribute::single(scope.attribute(SPEC_TYPE_ATTRIBUTE), spec_type),
        contents: HubContents {
            mime_type: SPEC_MIME_TYPE.to_string(),
            contents: encode_contents(spec),
        },
        documentation: HubDocumentation::from_url(api_documentation_url),
    }
}

// ============================================================================
// API Hub -> Canonical
// ============================================================================

pub fn from_platform_api(api: &HubApi) -> CanonicalApiMeta {
    let owner = api.owner.as_ref();
    CanonicalApiMeta {
        key: local_id(&api.name).to_string(),
        display_name: api.display_name.clone(),
        description: api.description.clone(),
        documentation_url: documentation_url(api.documentation.as_ref()),
        owner_name: owner.map(|o| o.display_name.clone()).unwrap_or_default(),
        owner_email: owner.map(|o| o.email.clone()).unwrap_or_default(),
    }
}

/// Recover the canonical fields a deployment document can represent. Owner,
/// base path and spec body have no place in it and come back empty.
pub fn from_platform_deployment(deployment: &HubDeployment) -> CanonicalRecord {
    let platform = deployment.deployment_type.first_value();
    CanonicalRecord {
        name: local_id(&deployment.name).to_string(),
        display_name: deployment.display_name.clone(),
        version: deployment.api_versions.first().cloned().unwrap_or_default(),
        description: deployment.description.clone(),
        documentation_url: documentation_url(deployment.documentation.as_ref()),
        gateway_url: deployment.endpoints.first().cloned().unwrap_or_default(),
        platform_id: platform.map(|p| p.id.clone()).unwrap_or_default(),
        platform_name: platform.map(|p| p.display_name.clone()).unwrap_or_default(),
        platform_resource_uri: deployment.resource_uri.clone(),
        ..Default::default()
    }
}

/// Decode a spec's base64 body.
pub fn spec_body(spec: &HubSpec) -> Result<Vec<u8>> {
    base64::decode_config(spec.contents.contents.trim(), base64::STANDARD).map_err(|e| {
        SyncError::Decode {
            url: spec.name.clone(),
            message: format!("spec contents are not base64: {e}"),
        }
    })
}

pub fn encode_contents(body: &[u8]) -> String {
    base64::encode_config(body, base64::STANDARD)
}

fn documentation_url(doc: Option<&HubDocumentation>) -> String {
    doc.map(|d| d.external_uri.clone()).unwrap_or_default()
}

fn non_empty_vec(value: &str) -> Vec<String> {
    if value.is_empty() {
        Vec::new()
    } else {
        vec![value.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ResourceScope {
        ResourceScope::new(Some("acme"), Some("us-central1")).unwrap()
    }

    fn aws_record() -> CanonicalRecord {
        CanonicalRecord {
            name: "orders-v1-aws".into(),
            display_name: "Orders".into(),
            version: "orders-v1".into(),
            description: "Order management".into(),
            owner_email: "team@acme.test".into(),
            owner_name: "Orders Team".into(),
            documentation_url: "https://docs.acme.test/orders".into(),
            gateway_url: "https://abc.execute-api.aws/prod".into(),
            base_path: "/orders".into(),
            platform_id: "aws".into(),
            platform_name: "AWS API Gateway".into(),
            platform_resource_uri: "arn:aws:apigateway:abc".into(),
            spec: None,
        }
    }

    fn key() -> ResourceKey {
        ResourceKey::parse("orders-v1-aws").unwrap()
    }

    #[test]
    fn test_api_with_owner_and_documentation() {
        let meta = CanonicalApiMeta::from_record("orders", &aws_record());
        let api = to_platform_api(&scope(), &meta);
        assert_eq!(api.name, "projects/acme/locations/us-central1/apis/orders");
        assert_eq!(api.owner.as_ref().unwrap().email, "team@acme.test");
        assert_eq!(
            api.documentation.unwrap().external_uri,
            "https://docs.acme.test/orders"
        );
    }

    #[test]
    fn test_api_without_owner_name_has_no_owner() {
        let mut record = aws_record();
        record.owner_name.clear();
        let api = to_platform_api(&scope(), &CanonicalApiMeta::from_record("orders", &record));
        assert!(api.owner.is_none());
    }

    #[test]
    fn test_deployment_mapping() {
        let d = to_platform_deployment(&scope(), &key(), &aws_record());
        assert_eq!(d.name, "projects/acme/locations/us-central1/deployments/orders-v1-aws");
        assert_eq!(
            d.deployment_type.attribute,
            "projects/acme/locations/us-central1/attributes/system-deployment-type"
        );
        let value = d.deployment_type.first_value().unwrap();
        assert_eq!(value.id, "aws");
        assert_eq!(value.display_name, "AWS API Gateway");
        assert_eq!(value.description, "AWS API Gateway");
        assert!(value.immutable);
        assert_eq!(d.deployment_type.enum_values.values.len(), 1);
        assert_eq!(d.endpoints, vec!["https://abc.execute-api.aws/prod"]);
        assert_eq!(d.api_versions, vec!["orders-v1"]);
        assert_eq!(d.resource_uri, "arn:aws:apigateway:abc");
    }

    #[test]
    fn test_empty_documentation_is_omitted_on_every_kind() {
        let mut record = aws_record();
        record.documentation_url.clear();
        let s = scope();

        let api = to_platform_api(&s, &CanonicalApiMeta::from_record("orders", &record));
        let deployment = to_platform_deployment(&s, &key(), &record);
        let version = to_platform_version(&s, "orders", "orders-v1", &[deployment.clone()], "");
        let spec = to_platform_spec(&s, "orders", &key(), &record, b"{}", "");

        for json in [
            serde_json::to_value(&api).unwrap(),
            serde_json::to_value(&deployment).unwrap(),
            serde_json::to_value(&version).unwrap(),
            serde_json::to_value(&spec).unwrap(),
        ] {
            assert!(json.get("documentation").is_none(), "got: {json}");
        }
    }

    #[test]
    fn test_version_takes_first_deployment_metadata() {
        let s = scope();
        let first = to_platform_deployment(&s, &key(), &aws_record());
        let mut azure = aws_record();
        azure.name = "orders-v1-azure".into();
        azure.display_name = "Orders (Azure)".into();
        let second = to_platform_deployment(&s, &ResourceKey::parse("orders-v1-azure").unwrap(), &azure);

        let version = to_platform_version(
            &s,
            "orders",
            "orders-v1",
            &[first.clone(), second.clone()],
            "https://docs",
        );
        assert_eq!(version.name, "projects/acme/locations/us-central1/apis/orders/versions/orders-v1");
        assert_eq!(version.display_name, "Orders");
        assert_eq!(version.description, "Order management");
        assert_eq!(version.deployments, vec![first.name, second.name]);
        assert_eq!(version.documentation.unwrap().external_uri, "https://docs");
    }

    #[test]
    fn test_spec_mapping_and_body_roundtrip() {
        let body = br#"{"openapi":"3.0.1","info":{"title":"Orders"}}"#;
        let spec = to_platform_spec(&scope(), "orders", &key(), &aws_record(), body, "https://docs");
        assert_eq!(
            spec.name,
            "projects/acme/locations/us-central1/apis/orders/versions/orders-v1/specs/orders-v1-aws"
        );
        assert_eq!(spec.display_name, "Orders (AWS API Gateway)");
        assert_eq!(spec.contents.mime_type, "application/json");
        assert_eq!(spec.spec_type.first_value().unwrap().id, "openapi");
        assert_eq!(spec_body(&spec).unwrap(), body.to_vec());
    }

    #[test]
    fn test_bad_base64_is_decode_error() {
        let mut spec = to_platform_spec(&scope(), "orders", &key(), &aws_record(), b"{}", "");
        spec.contents.contents = "not base64!!".into();
        assert!(matches!(spec_body(&spec), Err(SyncError::Decode { .. })));
    }

    #[test]
    fn test_deployment_inverse_recovers_representable_fields() {
        let record = aws_record();
        let back = from_platform_deployment(&to_platform_deployment(&scope(), &key(), &record));
        assert_eq!(back.name, record.name);
        assert_eq!(back.display_name, record.display_name);
        assert_eq!(back.description, record.description);
        assert_eq!(back.documentation_url, record.documentation_url);
        assert_eq!(back.gateway_url, record.gateway_url);
        assert_eq!(back.version, record.version);
        assert_eq!(back.platform_id, record.platform_id);
        assert_eq!(back.platform_resource_uri, record.platform_resource_uri);
        // not representable on a deployment
        assert!(back.owner_email.is_empty());
        assert!(back.base_path.is_empty());
    }

    #[test]
    fn test_api_inverse() {
        let meta = CanonicalApiMeta::from_record("orders", &aws_record());
        assert_eq!(from_platform_api(&to_platform_api(&scope(), &meta)), meta);
    }
}
