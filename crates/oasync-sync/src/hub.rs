//! API Hub wire schema.
//!
//! These are the documents stored under `apihub/apiproxies` and sent to, or
//! received from, the remote catalog. Optional objects are skipped when absent
//! because the service rejects empty documentation objects.

use serde::{Deserialize, Serialize};

/// Attribute id of the deployment-type system attribute.
pub const DEPLOYMENT_TYPE_ATTRIBUTE: &str = "system-deployment-type";
/// Attribute id of the spec-type system attribute.
pub const SPEC_TYPE_ATTRIBUTE: &str = "system-spec-type";

pub const OPENAPI_SPEC_TYPE_ID: &str = "openapi";
pub const OPENAPI_SPEC_TYPE_NAME: &str = "OpenAPI Spec";
pub const SPEC_MIME_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubDocumentation {
    pub external_uri: String,
}

impl HubDocumentation {
    /// `None` for an empty URL.
    pub fn from_url(url: &str) -> Option<Self> {
        crate::model::non_empty(url).map(|url| Self {
            external_uri: url.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubOwner {
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubApi {
    pub name: String,
    pub display_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<HubDocumentation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<HubOwner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubAttributeValue {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub immutable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubEnumValues {
    pub values: Vec<HubAttributeValue>,
}

/// An extensible-attribute value: the attribute's resource name plus exactly
/// one enum value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubAttribute {
    pub attribute: String,
    pub enum_values: HubEnumValues,
}

impl HubAttribute {
    pub fn single(attribute: String, value: HubAttributeValue) -> Self {
        Self {
            attribute,
            enum_values: HubEnumValues {
                values: vec![value],
            },
        }
    }

    pub fn first_value(&self) -> Option<&HubAttributeValue> {
        self.enum_values.values.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubDeployment {
    pub name: String,
    pub display_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<HubDocumentation>,
    pub deployment_type: HubAttribute,
    pub resource_uri: String,
    pub endpoints: Vec<String>,
    pub api_versions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubVersion {
    pub name: String,
    pub display_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<HubDocumentation>,
    pub deployments: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubContents {
    pub mime_type: String,
    /// Base64 (standard alphabet, padded).
    pub contents: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubSpec {
    pub name: String,
    pub display_name: String,
    pub spec_type: HubAttribute,
    pub contents: HubContents,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<HubDocumentation>,
}

/// Last path segment of a fully-qualified resource name.
pub fn local_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
