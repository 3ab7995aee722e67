//! API Hub remote catalog client.
//!
//! Thin verb mapping over a [`Transport`]:
//!
//! | verb   | request                                              |
//! |--------|------------------------------------------------------|
//! | list   | `GET {base}/{collection}` (single page)              |
//! | get    | `GET {base}/{name}`                                  |
//! | create | `POST {base}/{collection}?{idParam}={id}`            |
//! | patch  | `PATCH {base}/{name}?updateMask={mask}`              |
//! | delete | `DELETE {base}/{name}[?force=true]`                  |
//!
//! A 409 on create surfaces as [`SyncError::Conflict`]; every other non-2xx
//! status is a [`SyncError::RemoteRejection`] carrying the response body.

use crate::error::{Result, SyncError};
use crate::hub::{HubApi, HubContents, HubDeployment, HubSpec, HubVersion};
use crate::names::ResourceScope;
use crate::transport::{resource_url, Method, RawResponse, Transport};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const DEFAULT_APIHUB_URL: &str = "https://apihub.googleapis.com/v1";

pub struct ApiHubClient<T> {
    transport: T,
    base_url: String,
    scope: ResourceScope,
}

impl<T: Transport> ApiHubClient<T> {
    pub fn new(transport: T, scope: ResourceScope) -> Self {
        Self {
            transport,
            base_url: DEFAULT_APIHUB_URL.to_string(),
            scope,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn scope(&self) -> &ResourceScope {
        &self.scope
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn url(&self, name: &str, query: &[(&str, &str)]) -> Result<String> {
        resource_url(&self.base_url, name.split('/'), query)
    }

    // ========================================================================
    // Generic verbs
    // ========================================================================

    /// List one collection; `field` is the array key in the response. An
    /// empty collection may come back as `{}`.
    pub fn list<D: DeserializeOwned>(&self, collection: &str, field: &str) -> Result<Vec<D>> {
        let url = self.url(collection, &[])?;
        let resp = self.transport.send(Method::GET, &url, None)?;
        let value: serde_json::Value = expect_success(collection, resp)?.json(&url)?;
        match value.get(field) {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(items) => serde_json::from_value(items.clone()).map_err(|e| SyncError::Decode {
                url,
                message: e.to_string(),
            }),
        }
    }

    pub fn get<D: DeserializeOwned>(&self, name: &str) -> Result<D> {
        let url = self.url(name, &[])?;
        let resp = self.transport.send(Method::GET, &url, None)?;
        expect_success(name, resp)?.json(&url)
    }

    pub fn create<D: Serialize>(
        &self,
        collection: &str,
        id_param: &str,
        id: &str,
        doc: &D,
    ) -> Result<()> {
        let url = self.url(collection, &[(id_param, id)])?;
        let body = to_body(&url, doc)?;
        let resp = self.transport.send(Method::POST, &url, Some(&body))?;
        let resource = format!("{collection}/{id}");
        if resp.is_conflict() {
            return Err(SyncError::Conflict { resource });
        }
        expect_success(&resource, resp).map(|_| ())
    }

    pub fn patch<D: Serialize>(&self, name: &str, doc: &D, update_mask: &str) -> Result<()> {
        let url = self.url(name, &[("updateMask", update_mask)])?;
        let body = to_body(&url, doc)?;
        let resp = self.transport.send(Method::PATCH, &url, Some(&body))?;
        expect_success(name, resp).map(|_| ())
    }

    pub fn delete(&self, name: &str, force: bool) -> Result<()> {
        let query: &[(&str, &str)] = if force { &[("force", "true")] } else { &[] };
        let url = self.url(name, query)?;
        let resp = self.transport.send(Method::DELETE, &url, None)?;
        expect_success(name, resp).map(|_| ())
    }

    // ========================================================================
    // Typed operations
    // ========================================================================

    pub fn list_apis(&self) -> Result<Vec<HubApi>> {
        self.list(&self.scope.apis(), "apis")
    }

    pub fn list_versions(&self, api: &str) -> Result<Vec<HubVersion>> {
        self.list(&self.scope.versions(api), "versions")
    }

    pub fn list_specs(&self, api: &str, version: &str) -> Result<Vec<HubSpec>> {
        self.list(&self.scope.specs(api, version), "specs")
    }

    pub fn list_deployments(&self) -> Result<Vec<HubDeployment>> {
        self.list(&self.scope.deployments(), "deployments")
    }

    /// Raw contents of one spec (`{name}:contents`).
    pub fn spec_contents(&self, api: &str, version: &str, spec: &str) -> Result<HubContents> {
        self.get(&format!("{}:contents", self.scope.spec(api, version, spec)))
    }

    pub fn create_api(&self, id: &str, api: &HubApi) -> Result<()> {
        self.create(&self.scope.apis(), "apiId", id, api)
    }

    pub fn create_version(&self, api: &str, id: &str, version: &HubVersion) -> Result<()> {
        self.create(&self.scope.versions(api), "versionId", id, version)
    }

    pub fn patch_version(
        &self,
        api: &str,
        id: &str,
        version: &HubVersion,
        update_mask: &str,
    ) -> Result<()> {
        self.patch(&self.scope.version(api, id), version, update_mask)
    }

    pub fn create_spec(&self, api: &str, version: &str, id: &str, spec: &HubSpec) -> Result<()> {
        self.create(&self.scope.specs(api, version), "specId", id, spec)
    }

    pub fn create_deployment(&self, id: &str, deployment: &HubDeployment) -> Result<()> {
        self.create(&self.scope.deployments(), "deploymentId", id, deployment)
    }

    /// Delete an API together with its versions and specs.
    pub fn delete_api(&self, name: &str) -> Result<()> {
        self.delete(name, true)
    }

    pub fn delete_deployment(&self, name: &str) -> Result<()> {
        self.delete(name, false)
    }
}

pub(crate) fn expect_success(resource: &str, resp: RawResponse) -> Result<RawResponse> {
    if resp.is_success() {
        Ok(resp)
    } else {
        Err(SyncError::RemoteRejection {
            resource: resource.to_string(),
            status: resp.status,
            reason: resp.reason.clone(),
            body: resp.body_text(),
        })
    }
}

pub(crate) fn to_body<D: Serialize>(url: &str, doc: &D) -> Result<serde_json::Value> {
    serde_json::to_value(doc).map_err(|e| SyncError::Decode {
        url: url.to_string(),
        message: format!("failed to encode request body: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryHub, TEST_BASE_URL};

    fn client(hub: &InMemoryHub) -> ApiHubClient<&InMemoryHub> {
        let scope = ResourceScope::new(Some("acme"), Some("us-central1")).unwrap();
        ApiHubClient::new(hub, scope).with_base_url(TEST_BASE_URL)
    }

    #[test]
    fn test_create_id_is_query_encoded() {
        let hub = InMemoryHub::new();
        let client = client(&hub);
        client.create_api("orders+beta", &HubApi::default()).unwrap();

        assert_eq!(
            hub.calls()[0].path,
            "projects/acme/locations/us-central1/apis?apiId=orders%2Bbeta"
        );
        assert!(hub
            .get("projects/acme/locations/us-central1/apis/orders+beta")
            .is_some());
    }

    #[test]
    fn test_duplicate_create_is_conflict() {
        let hub = InMemoryHub::new();
        let client = client(&hub);
        client.create_api("orders", &HubApi::default()).unwrap();
        match client.create_api("orders", &HubApi::default()).unwrap_err() {
            SyncError::Conflict { resource } => {
                assert_eq!(resource, "projects/acme/locations/us-central1/apis/orders")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
