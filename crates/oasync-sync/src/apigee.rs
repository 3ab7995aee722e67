//! Apigee (organization-scoped) catalog client.
//!
//! Covers the proxy, product and developer housekeeping the sync tool needs:
//! listing, deleting, and deploying the latest proxy revision. Proxy bundle
//! packing is not handled here.

use crate::client::expect_success;
use crate::error::{Result, SyncError};
use crate::report::{CatalogKind, PlatformStatus, ResourceState, SyncReport};
use crate::transport::{resource_url, Method, Transport};
use oasync_store::LocalCatalogStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const DEFAULT_APIGEE_URL: &str = "https://apigee.googleapis.com/v1";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApigeeProxy {
    pub name: String,
    pub revision: Vec<String>,
    pub api_proxy_type: String,
}

impl ApigeeProxy {
    /// Numerically greatest revision; non-numeric revisions are ignored.
    pub fn latest_revision(&self) -> Option<&str> {
        self.revision
            .iter()
            .filter_map(|r| r.parse::<u64>().ok().map(|n| (n, r.as_str())))
            .max_by_key(|(n, _)| *n)
            .map(|(_, r)| r)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApigeeProduct {
    pub name: String,
    pub display_name: String,
    pub scopes: Vec<String>,
    pub environments: Vec<String>,
    pub api_resources: Vec<String>,
    pub proxies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApigeeDeveloper {
    pub email: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
}

/// Validate the organization scope.
pub fn organization(project: Option<&str>) -> Result<String> {
    match project.map(str::trim).filter(|p| !p.is_empty()) {
        Some(org) => Ok(org.to_string()),
        None => Err(SyncError::Precondition(
            "no project given; specify --project YOUR_PROJECT_ID".to_string(),
        )),
    }
}

/// Validate the deployment environment.
pub fn environment(environment: Option<&str>) -> Result<String> {
    match environment.map(str::trim).filter(|e| !e.is_empty()) {
        Some(env) => Ok(env.to_string()),
        None => Err(SyncError::Precondition(
            "no Apigee environment given; specify --environment YOUR_ENVIRONMENT".to_string(),
        )),
    }
}

pub struct ApigeeClient<T> {
    transport: T,
    base_url: String,
    org: String,
}

impl<T: Transport> ApigeeClient<T> {
    pub fn new(transport: T, org: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_APIGEE_URL.to_string(),
            org: org.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    fn url(&self, path: &[&str], query: &[(&str, &str)]) -> Result<String> {
        let segments = ["organizations", self.org.as_str()].into_iter().chain(path.iter().copied());
        resource_url(&self.base_url, segments, query)
    }

    fn list<D: DeserializeOwned>(
        &self,
        path: &[&str],
        query: &[(&str, &str)],
        field: &str,
    ) -> Result<Vec<D>> {
        let url = self.url(path, query)?;
        let resp = self.transport.send(Method::GET, &url, None)?;
        let value: serde_json::Value = expect_success(&path.join("/"), resp)?.json(&url)?;
        match value.get(field) {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(items) => serde_json::from_value(items.clone()).map_err(|e| SyncError::Decode {
                url,
                message: e.to_string(),
            }),
        }
    }

    fn delete(&self, path: &[&str]) -> Result<()> {
        let url = self.url(path, &[])?;
        let resp = self.transport.send(Method::DELETE, &url, None)?;
        expect_success(&path.join("/"), resp).map(|_| ())
    }

    pub fn list_proxies(&self) -> Result<Vec<ApigeeProxy>> {
        self.list(&["apis"], &[("includeRevisions", "true")], "proxies")
    }

    pub fn get_proxy(&self, name: &str) -> Result<ApigeeProxy> {
        let url = self.url(&["apis", name], &[])?;
        let resp = self.transport.send(Method::GET, &url, None)?;
        expect_success(&format!("apis/{name}"), resp)?.json(&url)
    }

    pub fn delete_proxy(&self, name: &str) -> Result<()> {
        self.delete(&["apis", name])
    }

    pub fn list_products(&self) -> Result<Vec<ApigeeProduct>> {
        self.list(&["apiproducts"], &[("expand", "true")], "apiProduct")
    }

    pub fn delete_product(&self, name: &str) -> Result<()> {
        self.delete(&["apiproducts", name])
    }

    pub fn list_developers(&self) -> Result<Vec<ApigeeDeveloper>> {
        self.list(&["developers"], &[("expand", "true")], "developer")
    }

    pub fn delete_developer(&self, email: &str) -> Result<()> {
        self.delete(&["developers", email])
    }

    /// Deploy `revision` of proxy `name` to `environment`, replacing whatever
    /// revision is deployed there.
    pub fn deploy(
        &self,
        environment: &str,
        name: &str,
        revision: &str,
        service_account: Option<&str>,
    ) -> Result<()> {
        let path = [
            "environments",
            environment,
            "apis",
            name,
            "revisions",
            revision,
            "deployments",
        ];
        let mut query = vec![("override", "true")];
        if let Some(sa) = service_account.filter(|sa| !sa.is_empty()) {
            query.push(("serviceAccount", sa));
        }
        let url = self.url(&path, &query)?;
        let resp = self.transport.send(Method::POST, &url, None)?;
        expect_success(&path.join("/"), resp).map(|_| ())
    }
}

// ============================================================================
// Housekeeping runs
// ============================================================================

fn selected(filter: Option<&str>, name: &str) -> bool {
    filter.map_or(true, |f| f == name)
}

pub fn status<T: Transport>(client: &ApigeeClient<T>) -> PlatformStatus {
    match client.list_proxies() {
        Ok(proxies) => PlatformStatus {
            connected: true,
            message: format!(
                "Connected to Apigee, {} APIs found in project {}.",
                proxies.len(),
                client.org()
            ),
        },
        Err(SyncError::RemoteRejection { status, reason, .. }) => PlatformStatus {
            connected: false,
            message: format!("{status} {reason}"),
        },
        Err(err) => PlatformStatus {
            connected: false,
            message: err.to_string(),
        },
    }
}

/// Delete every proxy, or only `filter`.
pub fn clean_proxies<T: Transport>(client: &ApigeeClient<T>, filter: Option<&str>) -> SyncReport {
    let mut report = SyncReport::new("apis clean");
    match client.list_proxies() {
        Ok(proxies) => {
            for proxy in proxies.iter().filter(|p| selected(filter, &p.name)) {
                match client.delete_proxy(&proxy.name) {
                    Ok(()) => report.record(CatalogKind::Proxy, &proxy.name, ResourceState::Deleted),
                    Err(err) => report.fail(CatalogKind::Proxy, &proxy.name, &err),
                }
            }
        }
        Err(err) => report.fail(CatalogKind::Proxy, "apis", &err),
    }
    report
}

/// Delete every API product, or only `filter`.
pub fn clean_products<T: Transport>(client: &ApigeeClient<T>, filter: Option<&str>) -> SyncReport {
    let mut report = SyncReport::new("products clean");
    match client.list_products() {
        Ok(products) => {
            tracing::info!(count = products.len(), "found products");
            for product in products.iter().filter(|p| selected(filter, &p.name)) {
                match client.delete_product(&product.name) {
                    Ok(()) => report.record(CatalogKind::Product, &product.name, ResourceState::Deleted),
                    Err(err) => report.fail(CatalogKind::Product, &product.name, &err),
                }
            }
        }
        Err(err) => report.fail(CatalogKind::Product, "apiproducts", &err),
    }
    report
}

/// Delete every developer (and with it their apps), or only the one whose
/// email is `filter`.
pub fn clean_developers<T: Transport>(
    client: &ApigeeClient<T>,
    filter: Option<&str>,
) -> SyncReport {
    let mut report = SyncReport::new("developers clean");
    match client.list_developers() {
        Ok(developers) => {
            for developer in developers.iter().filter(|d| selected(filter, &d.email)) {
                match client.delete_developer(&developer.email) {
                    Ok(()) => {
                        report.record(CatalogKind::Developer, &developer.email, ResourceState::Deleted)
                    }
                    Err(err) => report.fail(CatalogKind::Developer, &developer.email, &err),
                }
            }
        }
        Err(err) => report.fail(CatalogKind::Developer, "developers", &err),
    }
    report
}

/// Deploy the latest revision of every locally stored proxy to `environment`.
pub fn deploy_latest<T: Transport>(
    client: &ApigeeClient<T>,
    store: &LocalCatalogStore,
    environment: &str,
    service_account: Option<&str>,
    filter: Option<&str>,
) -> Result<SyncReport> {
    let mut report = SyncReport::new("apis deploy");
    for name in store.list_apis()? {
        if !selected(filter, &name) {
            continue;
        }
        let revision = match client.get_proxy(&name) {
            Ok(proxy) => proxy.latest_revision().map(str::to_string),
            Err(err) => {
                report.fail(CatalogKind::Proxy, &name, &err);
                continue;
            }
        };
        let Some(revision) = revision else {
            report.skip(CatalogKind::Proxy, &name, "no numeric revisions");
            continue;
        };
        tracing::info!(proxy = %name, %revision, environment, "deploying");
        match client.deploy(environment, &name, &revision, service_account) {
            Ok(()) => report.record(CatalogKind::Proxy, &name, ResourceState::Deployed),
            Err(err) => report.fail(CatalogKind::Proxy, &name, &err),
        }
    }
    Ok(report)
}
