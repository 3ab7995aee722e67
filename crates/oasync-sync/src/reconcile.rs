//! Reconciliation driver for API Hub.
//!
//! ```text
//!   general/apiproxies ──onramp──► apihub/apiproxies ──import──► API Hub
//!                                          ▲                        │
//!                                          └────────export──────────┘
//! ```
//!
//! Every entry point walks the local store or the remote catalog one API at a
//! time and records a terminal [`ResourceState`] per resource in a
//! [`SyncReport`]. Failures are scoped to the narrowest resource: a failed
//! deployment never stops its siblings, and a missing root API document only
//! stops its own API.
//!
//! Import state machine per resource:
//!
//! ```text
//! ABSENT → CREATING ─┬─► CREATED
//!                    ├─► CONFLICT ─┬─► PATCHING ─┬─► PATCHED
//!                    │             │             └─► FAILED
//!                    │             └─► EXISTING          (kinds that are kept)
//!                    └─► FAILED
//! ```

use crate::client::ApiHubClient;
use crate::error::{Result, SyncError};
use crate::hierarchy::{ApiHierarchy, VersionGroups};
use crate::hub::{local_id, HubApi, HubDeployment, HubSpec, HubVersion};
use crate::keys::{api_key_of, ResourceKey};
use crate::model::{CanonicalApiMeta, CanonicalRecord};
use crate::names::ResourceScope;
use crate::report::{CatalogKind, PlatformStatus, ResourceState, SyncReport};
use crate::translate;
use crate::transport::Transport;
use oasync_store::{LocalCatalogStore, ResourceKind, StoreError};

// ============================================================================
// Conflict policy
// ============================================================================

/// What to do when a create reports that the resource already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// Leave the remote resource as it is.
    Keep,
    /// Patch the remote resource, limited to this update mask.
    Patch(&'static str),
}

/// Kinds patched on conflict. Anything absent here is kept.
pub const CONFLICT_POLICY: &[(CatalogKind, ConflictAction)] =
    &[(CatalogKind::Version, ConflictAction::Patch("deployments"))];

pub fn conflict_action(kind: CatalogKind) -> ConflictAction {
    CONFLICT_POLICY
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or(ConflictAction::Keep, |(_, action)| *action)
}

/// Result of one create attempt.
#[derive(Debug)]
pub enum CreateOutcome {
    Created,
    Conflicted,
    Failed(SyncError),
}

impl From<Result<()>> for CreateOutcome {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => CreateOutcome::Created,
            Err(SyncError::Conflict { .. }) => CreateOutcome::Conflicted,
            Err(err) => CreateOutcome::Failed(err),
        }
    }
}

/// Drive one resource to a terminal state. `patch` runs at most once, and only
/// when the create conflicted and the kind's policy says to patch.
fn converge(
    report: &mut SyncReport,
    kind: CatalogKind,
    name: &str,
    create: impl FnOnce() -> Result<()>,
    patch: impl FnOnce(&'static str) -> Result<()>,
) -> ResourceState {
    tracing::debug!(%kind, name, "creating");
    let state = match CreateOutcome::from(create()) {
        CreateOutcome::Created => ResourceState::Created,
        CreateOutcome::Conflicted => match conflict_action(kind) {
            ConflictAction::Keep => ResourceState::Existing,
            ConflictAction::Patch(mask) => {
                tracing::debug!(%kind, name, mask, "already exists, patching");
                match patch(mask) {
                    Ok(()) => ResourceState::Patched,
                    Err(err) => {
                        report.fail(kind, name, &err);
                        return ResourceState::Failed;
                    }
                }
            }
        },
        CreateOutcome::Failed(err) => {
            report.fail(kind, name, &err);
            return ResourceState::Failed;
        }
    };
    report.record(kind, name, state);
    state
}

fn no_patch(_: &'static str) -> Result<()> {
    Ok(())
}

fn selected(filter: Option<&str>, api: &str) -> bool {
    filter.map_or(true, |f| f == api)
}

// ============================================================================
// Onramp: general -> apihub (local only)
// ============================================================================

/// Translate canonical records under `general` into API Hub documents under
/// `hub`. Nothing is sent to the remote catalog.
pub fn onramp(
    general: &LocalCatalogStore,
    hub: &LocalCatalogStore,
    scope: &ResourceScope,
    filter: Option<&str>,
) -> Result<SyncReport> {
    let mut report = SyncReport::new("onramp");
    for api in general.list_apis()? {
        if !selected(filter, &api) {
            continue;
        }
        tracing::info!(api = %api, "onramping");
        if let Err(err) = onramp_api(general, hub, scope, &api, &mut report) {
            report.fail(CatalogKind::Api, &api, &err);
        }
    }
    Ok(report)
}

fn onramp_api(
    general: &LocalCatalogStore,
    hub: &LocalCatalogStore,
    scope: &ResourceScope,
    api: &str,
    report: &mut SyncReport,
) -> Result<()> {
    let root: CanonicalRecord = general.read(api, api)?;
    if root.name.is_empty() {
        report.skip(CatalogKind::Api, api, "root record has no name");
        return Ok(());
    }
    let meta = CanonicalApiMeta::from_record(api, &root);
    hub.write(api, api, &translate::to_platform_api(scope, &meta))?;
    report.record(CatalogKind::Api, api, ResourceState::Written);

    let hierarchy = load_hierarchy(general, api, report)?;
    for (version, members) in hierarchy.iter() {
        let mut deployments = Vec::with_capacity(members.len());
        for member in members {
            let deployment = translate::to_platform_deployment(scope, &member.key, &member.doc);
            match hub.write(api, &member.key.deployment, &deployment) {
                Ok(_) => report.record(CatalogKind::Deployment, &member.key.deployment, ResourceState::Written),
                Err(err) => {
                    report.fail(CatalogKind::Deployment, &member.key.deployment, &SyncError::from(err));
                    continue;
                }
            }
            deployments.push(deployment);

            if let Some(spec) = member.doc.spec.as_deref() {
                let doc = translate::to_platform_spec(
                    scope,
                    api,
                    &member.key,
                    &member.doc,
                    spec,
                    &meta.documentation_url,
                );
                let stem = member.key.spec_stem();
                match hub.write(api, &stem, &doc) {
                    Ok(_) => report.record(CatalogKind::Spec, &stem, ResourceState::Written),
                    Err(err) => report.fail(CatalogKind::Spec, &stem, &SyncError::from(err)),
                }
            }
        }
        if deployments.is_empty() {
            continue;
        }
        let doc = translate::to_platform_version(
            scope,
            api,
            version,
            &deployments,
            &meta.documentation_url,
        );
        match hub.write(api, version, &doc) {
            Ok(_) => report.record(CatalogKind::Version, version, ResourceState::Written),
            Err(err) => report.fail(CatalogKind::Version, version, &SyncError::from(err)),
        }
    }
    Ok(())
}

/// Read every canonical deployment record of one API, with its spec body when
/// a companion document exists. Unreadable records are skipped.
fn load_hierarchy(
    general: &LocalCatalogStore,
    api: &str,
    report: &mut SyncReport,
) -> Result<ApiHierarchy> {
    let mut hierarchy = ApiHierarchy::new(api);
    for stem in general.list(ResourceKind::Member, api)? {
        let Some(key) = ResourceKey::parse(&stem) else {
            continue;
        };
        let record: CanonicalRecord = match general.read(api, &stem) {
            Ok(record) => record,
            Err(err) => {
                report.skip(CatalogKind::Deployment, &stem, err.to_string());
                continue;
            }
        };
        if record.name.is_empty() {
            report.skip(CatalogKind::Deployment, &stem, "record has no name");
            continue;
        }
        if record.name != key.deployment {
            tracing::warn!(
                file = %stem,
                name = %record.name,
                "record name differs from file name; using file name"
            );
        }
        let record = match read_optional_raw(general, api, &key.spec_stem()) {
            Ok(Some(spec)) => record.with_spec(spec),
            Ok(None) => record,
            Err(err) => {
                report.skip(CatalogKind::Spec, key.spec_stem(), err.to_string());
                record
            }
        };
        hierarchy.insert(key, record);
    }
    Ok(hierarchy)
}

fn read_optional_raw(
    store: &LocalCatalogStore,
    api: &str,
    stem: &str,
) -> std::result::Result<Option<Vec<u8>>, StoreError> {
    match store.read_raw(api, stem) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(StoreError::NotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

// ============================================================================
// Import: apihub -> remote
// ============================================================================

/// Create every locally stored API Hub document in the remote catalog.
///
/// Per API: the API, then for each version its deployments, the version
/// itself (it references the deployments by name), and finally the specs of
/// that version's deployments.
pub fn import<T: Transport>(
    client: &ApiHubClient<T>,
    hub: &LocalCatalogStore,
    filter: Option<&str>,
) -> Result<SyncReport> {
    let mut report = SyncReport::new("import");
    for api in hub.list_apis()? {
        if !selected(filter, &api) {
            continue;
        }
        tracing::info!(api = %api, "importing");
        if let Err(err) = import_api(client, hub, &api, &mut report) {
            report.fail(CatalogKind::Api, &api, &err);
        }
    }
    Ok(report)
}

fn import_api<T: Transport>(
    client: &ApiHubClient<T>,
    hub: &LocalCatalogStore,
    api: &str,
    report: &mut SyncReport,
) -> Result<()> {
    let api_doc: HubApi = hub.read(api, api)?;
    converge(report, CatalogKind::Api, api, || client.create_api(api, &api_doc), no_patch);

    let mut groups: VersionGroups<HubDeployment> = VersionGroups::new(api);
    for stem in hub.list(ResourceKind::Member, api)? {
        let Some(key) = ResourceKey::parse(&stem) else {
            continue;
        };
        match hub.read::<HubDeployment>(api, &stem) {
            Ok(doc) => groups.insert(key, doc),
            Err(err) => report.skip(CatalogKind::Deployment, &stem, err.to_string()),
        }
    }

    for (version, members) in groups.iter() {
        for member in members {
            let id = &member.key.deployment;
            converge(
                report,
                CatalogKind::Deployment,
                id,
                || client.create_deployment(id, &member.doc),
                no_patch,
            );
        }

        match hub.read::<HubVersion>(api, version) {
            Ok(doc) => {
                converge(
                    report,
                    CatalogKind::Version,
                    version,
                    || client.create_version(api, version, &doc),
                    |mask| client.patch_version(api, version, &doc, mask),
                );
            }
            Err(err) => report.skip(CatalogKind::Version, version, err.to_string()),
        }

        for member in members {
            let stem = member.key.spec_stem();
            let spec: HubSpec = match hub.read(api, &stem) {
                Ok(spec) => spec,
                Err(StoreError::NotFound { .. }) => continue,
                Err(err) => {
                    report.skip(CatalogKind::Spec, &stem, err.to_string());
                    continue;
                }
            };
            converge(
                report,
                CatalogKind::Spec,
                &stem,
                || client.create_spec(api, version, &member.key.deployment, &spec),
                no_patch,
            );
        }
    }
    Ok(())
}

// ============================================================================
// Export: remote -> apihub
// ============================================================================

/// Mirror the remote catalog into `hub`, laid out exactly as onramp lays it
/// out. Spec contents are fetched and embedded. Deployments are filed under
/// the API key derived from their id.
pub fn export<T: Transport>(
    client: &ApiHubClient<T>,
    hub: &LocalCatalogStore,
    filter: Option<&str>,
) -> Result<SyncReport> {
    let mut report = SyncReport::new("export");

    match client.list_apis() {
        Ok(apis) => {
            for api in apis {
                let id = local_id(&api.name).to_string();
                if !selected(filter, &id) {
                    continue;
                }
                tracing::info!(api = %id, "exporting");
                export_api(client, hub, &id, &api, &mut report);
            }
        }
        Err(err) => report.fail(CatalogKind::Api, client.scope().apis(), &err),
    }

    match client.list_deployments() {
        Ok(deployments) => {
            for deployment in deployments {
                let id = local_id(&deployment.name).to_string();
                let api = api_key_of(&id).to_string();
                if !selected(filter, &api) {
                    continue;
                }
                match hub.write(&api, &id, &deployment) {
                    Ok(_) => report.record(CatalogKind::Deployment, id, ResourceState::Exported),
                    Err(err) => report.fail(CatalogKind::Deployment, id, &SyncError::from(err)),
                }
            }
        }
        Err(err) => report.fail(CatalogKind::Deployment, client.scope().deployments(), &err),
    }
    Ok(report)
}

fn export_api<T: Transport>(
    client: &ApiHubClient<T>,
    hub: &LocalCatalogStore,
    id: &str,
    api: &HubApi,
    report: &mut SyncReport,
) {
    if let Err(err) = hub.write(id, id, api) {
        // Versions and specs share this folder; skip them.
        report.fail(CatalogKind::Api, id, &SyncError::from(err));
        return;
    }
    report.record(CatalogKind::Api, id, ResourceState::Exported);

    let versions = match client.list_versions(id) {
        Ok(versions) => versions,
        Err(err) => {
            report.fail(CatalogKind::Version, client.scope().versions(id), &err);
            return;
        }
    };
    for version in versions {
        let version_id = local_id(&version.name).to_string();
        match hub.write(id, &version_id, &version) {
            Ok(_) => report.record(CatalogKind::Version, &version_id, ResourceState::Exported),
            Err(err) => report.fail(CatalogKind::Version, &version_id, &SyncError::from(err)),
        }

        let specs = match client.list_specs(id, &version_id) {
            Ok(specs) => specs,
            Err(err) => {
                report.fail(CatalogKind::Spec, client.scope().specs(id, &version_id), &err);
                continue;
            }
        };
        for mut spec in specs {
            let spec_id = local_id(&spec.name).to_string();
            let stem = oasync_store::spec_stem(&spec_id);
            match client.spec_contents(id, &version_id, &spec_id) {
                Ok(contents) => spec.contents = contents,
                Err(err) => {
                    report.fail(CatalogKind::Spec, &stem, &err);
                    continue;
                }
            }
            match hub.write(id, &stem, &spec) {
                Ok(_) => report.record(CatalogKind::Spec, &stem, ResourceState::Exported),
                Err(err) => report.fail(CatalogKind::Spec, &stem, &SyncError::from(err)),
            }
        }
    }
}

// ============================================================================
// Clean
// ============================================================================

/// Delete remote APIs (with their versions and specs) and deployments.
/// With a filter, only the named API and the deployments whose derived API key
/// matches it are deleted.
pub fn clean<T: Transport>(client: &ApiHubClient<T>, filter: Option<&str>) -> SyncReport {
    let mut report = SyncReport::new("clean");

    match client.list_apis() {
        Ok(apis) => {
            for api in apis {
                if !selected(filter, local_id(&api.name)) {
                    continue;
                }
                match client.delete_api(&api.name) {
                    Ok(()) => report.record(CatalogKind::Api, &api.name, ResourceState::Deleted),
                    Err(err) => report.fail(CatalogKind::Api, &api.name, &err),
                }
            }
        }
        Err(err) => report.fail(CatalogKind::Api, client.scope().apis(), &err),
    }

    match client.list_deployments() {
        Ok(deployments) => {
            for deployment in deployments {
                if !selected(filter, api_key_of(local_id(&deployment.name))) {
                    continue;
                }
                match client.delete_deployment(&deployment.name) {
                    Ok(()) => {
                        report.record(CatalogKind::Deployment, &deployment.name, ResourceState::Deleted)
                    }
                    Err(err) => report.fail(CatalogKind::Deployment, &deployment.name, &err),
                }
            }
        }
        Err(err) => report.fail(CatalogKind::Deployment, client.scope().deployments(), &err),
    }
    report
}

/// Remove a platform's whole local subtree.
pub fn clean_local(store: &LocalCatalogStore) -> Result<SyncReport> {
    let mut report = SyncReport::new("cleanlocal");
    let name = store.platform_root().display().to_string();
    if store.clean()? {
        report.record(CatalogKind::LocalTree, name, ResourceState::Deleted);
    } else {
        report.skip(CatalogKind::LocalTree, name, "already absent");
    }
    Ok(report)
}

// ============================================================================
// Status
// ============================================================================

pub fn status<T: Transport>(client: &ApiHubClient<T>) -> PlatformStatus {
    let scope = client.scope();
    match client.list_apis() {
        Ok(apis) => PlatformStatus {
            connected: true,
            message: format!(
                "Connected to API Hub, {} APIs found in project {} and region {}.",
                apis.len(),
                scope.project,
                scope.region
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
