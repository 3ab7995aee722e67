//! Tests for onramp, import, export and clean against the in-memory hub

use oasync_store::{LocalCatalogStore, Platform};
use oasync_sync::hub::{HubApi, HubDeployment, HubSpec, HubVersion};
use oasync_sync::testing::{InMemoryHub, TEST_BASE_URL};
use oasync_sync::transport::Method;
use oasync_sync::*;
use serde_json::json;
use tempfile::TempDir;

const PROJECT: &str = "acme";
const REGION: &str = "us-central1";

fn scope() -> ResourceScope {
    ResourceScope::new(Some(PROJECT), Some(REGION)).unwrap()
}

fn client(hub: &InMemoryHub) -> ApiHubClient<&InMemoryHub> {
    ApiHubClient::new(hub, scope()).with_base_url(TEST_BASE_URL)
}

fn parent() -> String {
    format!("projects/{PROJECT}/locations/{REGION}")
}

fn deployment_record(name: &str, display: &str, platform: &str, docs: &str) -> serde_json::Value {
    let version = name.rsplit_once('-').map(|(v, _)| v).unwrap_or(name);
    json!({
        "name": name,
        "displayName": display,
        "version": version,
        "description": format!("{display} description"),
        "ownerEmail": "",
        "ownerName": "",
        "documentationUrl": docs,
        "gatewayUrl": format!("https://{name}.gateway.test"),
        "basePath": "/orders",
        "platformId": platform,
        "platformName": platform.to_uppercase(),
        "platformResourceUri": format!("{platform}://{name}")
    })
}

/// General tree with two APIs:
/// - `orders`: v1 on aws (with spec) and azure, v2 on aws
/// - `billing`: v1 on azure, no documentation
fn general_fixture() -> (TempDir, LocalCatalogStore, LocalCatalogStore) {
    let dir = tempfile::tempdir().unwrap();
    let general = LocalCatalogStore::open(dir.path(), Platform::General);
    let hub = LocalCatalogStore::open(dir.path(), Platform::ApiHub);

    general
        .write(
            "orders",
            "orders",
            &json!({
                "name": "orders",
                "displayName": "Orders",
                "description": "Order management",
                "ownerName": "Orders Team",
                "ownerEmail": "orders@acme.test",
                "documentationUrl": "https://docs.acme.test/orders"
            }),
        )
        .unwrap();
    general
        .write(
            "orders",
            "orders-v1-aws",
            &deployment_record("orders-v1-aws", "Orders v1", "aws", "https://docs.acme.test/orders"),
        )
        .unwrap();
    general
        .write(
            "orders",
            "orders-v1-azure",
            &deployment_record("orders-v1-azure", "Orders v1 (Azure)", "azure", ""),
        )
        .unwrap();
    general
        .write(
            "orders",
            "orders-v2-aws",
            &deployment_record("orders-v2-aws", "Orders v2", "aws", ""),
        )
        .unwrap();
    general
        .write(
            "orders",
            "orders-v1-aws-oas",
            &json!({"openapi": "3.0.1", "info": {"title": "Orders", "version": "1"}}),
        )
        .unwrap();

    general
        .write(
            "billing",
            "billing",
            &json!({"name": "billing", "displayName": "Billing", "documentationUrl": ""}),
        )
        .unwrap();
    general
        .write(
            "billing",
            "billing-v1-azure",
            &deployment_record("billing-v1-azure", "Billing v1", "azure", ""),
        )
        .unwrap();

    (dir, general, hub)
}

fn onramped() -> (TempDir, LocalCatalogStore) {
    let (dir, general, hub) = general_fixture();
    let report = onramp(&general, &hub, &scope(), None).unwrap();
    assert!(!report.has_failures(), "{report:?}");
    (dir, hub)
}

fn index_of(hub: &InMemoryHub, method: Method, needle: &str) -> usize {
    hub.calls()
        .iter()
        .position(|c| c.method == method && c.path.contains(needle))
        .unwrap_or_else(|| panic!("no {method} call containing {needle}"))
}

// ============================================================================
// Onramp
// ============================================================================

#[test]
fn test_onramp_writes_full_hierarchy() {
    let (_dir, hub) = onramped();

    assert_eq!(hub.list_apis().unwrap(), vec!["billing", "orders"]);
    assert_eq!(
        hub.list_documents("orders").unwrap(),
        vec![
            "orders",
            "orders-v1",
            "orders-v1-aws",
            "orders-v1-aws-oas",
            "orders-v1-azure",
            "orders-v2",
            "orders-v2-aws",
        ]
    );

    let api: HubApi = hub.read("orders", "orders").unwrap();
    assert_eq!(api.name, format!("{}/apis/orders", parent()));
    assert_eq!(api.owner.unwrap().display_name, "Orders Team");
}

#[test]
fn test_onramp_groups_both_platforms_into_one_version() {
    let (_dir, hub) = onramped();

    let version: HubVersion = hub.read("orders", "orders-v1").unwrap();
    assert_eq!(
        version.deployments,
        vec![
            format!("{}/deployments/orders-v1-aws", parent()),
            format!("{}/deployments/orders-v1-azure", parent()),
        ]
    );
    assert_eq!(version.display_name, "Orders v1");
    assert_eq!(version.description, "Orders v1 description");
    assert_eq!(
        version.documentation.unwrap().external_uri,
        "https://docs.acme.test/orders"
    );
}

#[test]
fn test_onramp_omits_empty_documentation() {
    let (_dir, hub) = onramped();

    let raw: serde_json::Value =
        serde_json::from_slice(&hub.read_raw("orders", "orders-v1-azure").unwrap()).unwrap();
    assert!(raw.get("documentation").is_none(), "got: {raw}");

    let raw: serde_json::Value =
        serde_json::from_slice(&hub.read_raw("billing", "billing").unwrap()).unwrap();
    assert!(raw.get("documentation").is_none(), "got: {raw}");
    let raw: serde_json::Value =
        serde_json::from_slice(&hub.read_raw("billing", "billing-v1").unwrap()).unwrap();
    assert!(raw.get("documentation").is_none(), "got: {raw}");
}

#[test]
fn test_onramp_spec_carries_base64_source() {
    let (dir, hub) = onramped();
    let general = LocalCatalogStore::open(dir.path(), Platform::General);

    let spec: HubSpec = hub.read("orders", "orders-v1-aws-oas").unwrap();
    assert_eq!(
        spec.name,
        format!("{}/apis/orders/versions/orders-v1/specs/orders-v1-aws", parent())
    );
    assert_eq!(spec.display_name, "Orders v1 (AWS)");
    let body = translate::spec_body(&spec).unwrap();
    assert_eq!(body, general.read_raw("orders", "orders-v1-aws-oas").unwrap());
}

#[test]
fn test_onramp_missing_root_is_fatal_for_that_api_only() {
    let (_dir, general, hub) = general_fixture();
    std::fs::remove_file(general.document_path("billing", "billing")).unwrap();

    let report = onramp(&general, &hub, &scope(), None).unwrap();
    assert_eq!(
        report.state_of(CatalogKind::Api, "billing"),
        Some(ResourceState::Failed)
    );
    assert_eq!(
        report.state_of(CatalogKind::Api, "orders"),
        Some(ResourceState::Written)
    );
    assert!(!hub.api_dir("billing").exists());
}

#[test]
fn test_onramp_skips_malformed_deployment_and_keeps_siblings() {
    let (_dir, general, hub) = general_fixture();
    std::fs::write(general.document_path("orders", "orders-v1-azure"), "{ broken").unwrap();

    let report = onramp(&general, &hub, &scope(), None).unwrap();
    assert_eq!(
        report.state_of(CatalogKind::Deployment, "orders-v1-azure"),
        Some(ResourceState::Skipped)
    );
    let version: HubVersion = hub.read("orders", "orders-v1").unwrap();
    assert_eq!(version.deployments.len(), 1);
    assert!(hub.exists("orders", "orders-v2-aws"));
}

#[test]
fn test_onramp_api_filter() {
    let (_dir, general, hub) = general_fixture();
    onramp(&general, &hub, &scope(), Some("billing")).unwrap();
    assert_eq!(hub.list_apis().unwrap(), vec!["billing"]);
}

#[test]
fn test_onramp_nests_spec_under_folder_api_version() {
    let dir = tempfile::tempdir().unwrap();
    let general = LocalCatalogStore::open(dir.path(), Platform::General);
    let hub = LocalCatalogStore::open(dir.path(), Platform::ApiHub);
    general
        .write("orders", "orders", &json!({"name": "orders", "displayName": "Orders"}))
        .unwrap();
    // `v1.2` is not a version suffix, so the derived API key is `orders-v1.2`.
    general
        .write(
            "orders",
            "orders-v1.2-aws",
            &deployment_record("orders-v1.2-aws", "Orders 1.2", "aws", ""),
        )
        .unwrap();
    general
        .write("orders", "orders-v1.2-aws-oas", &json!({"openapi": "3.0.1"}))
        .unwrap();

    let report = onramp(&general, &hub, &scope(), None).unwrap();
    assert!(!report.has_failures(), "{report:?}");

    let version: HubVersion = hub.read("orders", "orders-v1.2").unwrap();
    let spec: HubSpec = hub.read("orders", "orders-v1.2-aws-oas").unwrap();
    assert_eq!(version.name, format!("{}/apis/orders/versions/orders-v1.2", parent()));
    assert_eq!(spec.name, format!("{}/specs/orders-v1.2-aws", version.name));

    let remote = InMemoryHub::new();
    let imported = import(&client(&remote), &hub, None).unwrap();
    assert!(!imported.has_failures(), "{imported:?}");
    assert!(remote.get(&spec.name).is_some());
}

// ============================================================================
// Import
// ============================================================================

#[test]
fn test_import_creates_everything_on_empty_catalog() {
    let (_dir, store) = onramped();
    let remote = InMemoryHub::new();

    let report = import(&client(&remote), &store, None).unwrap();
    assert!(!report.has_failures(), "{report:?}");
    assert_eq!(report.count(ResourceState::Created), 10);

    let names = remote.names();
    for expected in [
        format!("{}/apis/orders", parent()),
        format!("{}/apis/orders/versions/orders-v1", parent()),
        format!("{}/apis/orders/versions/orders-v1/specs/orders-v1-aws", parent()),
        format!("{}/apis/orders/versions/orders-v2", parent()),
        format!("{}/apis/billing/versions/billing-v1", parent()),
        format!("{}/deployments/orders-v1-aws", parent()),
        format!("{}/deployments/orders-v1-azure", parent()),
        format!("{}/deployments/billing-v1-azure", parent()),
    ] {
        assert!(names.contains(&expected), "missing {expected}");
    }
}

#[test]
fn test_import_orders_deployments_before_version_before_specs() {
    let (_dir, store) = onramped();
    let remote = InMemoryHub::new();
    import(&client(&remote), &store, Some("orders")).unwrap();

    let api = index_of(&remote, Method::POST, "apis?apiId=orders");
    let aws = index_of(&remote, Method::POST, "deploymentId=orders-v1-aws");
    let azure = index_of(&remote, Method::POST, "deploymentId=orders-v1-azure");
    let version = index_of(&remote, Method::POST, "versionId=orders-v1");
    let spec = index_of(&remote, Method::POST, "specId=orders-v1-aws");

    assert!(api < aws);
    assert!(aws < azure);
    assert!(azure < version);
    assert!(version < spec);
}

#[test]
fn test_import_twice_converges_to_same_state() {
    let (_dir, store) = onramped();
    let remote = InMemoryHub::new();
    let client = client(&remote);

    import(&client, &store, None).unwrap();
    let first = remote.snapshot();
    remote.clear_calls();

    let report = import(&client, &store, None).unwrap();
    assert!(!report.has_failures(), "{report:?}");
    assert_eq!(remote.snapshot(), first);
    assert_eq!(report.count(ResourceState::Created), 0);
    assert_eq!(report.count(ResourceState::Patched), 3);
    assert_eq!(report.count(ResourceState::Existing), 7);

    let patches = remote.calls_with(&Method::PATCH);
    assert_eq!(patches.len(), 3);
    assert!(patches.iter().all(|c| c.path.ends_with("?updateMask=deployments")));
}

#[test]
fn test_version_conflict_patches_new_deployment_membership() {
    let (_dir, store) = onramped();
    let remote = InMemoryHub::new();
    let client = client(&remote);
    import(&client, &store, Some("orders")).unwrap();

    // v2 gains an azure deployment after the first import
    let mut deployment: HubDeployment = store.read("orders", "orders-v2-aws").unwrap();
    deployment.name = format!("{}/deployments/orders-v2-azure", parent());
    store.write("orders", "orders-v2-azure", &deployment).unwrap();
    let mut version: HubVersion = store.read("orders", "orders-v2").unwrap();
    version.deployments.push(deployment.name.clone());
    store.write("orders", "orders-v2", &version).unwrap();

    remote.clear_calls();
    let report = import(&client, &store, Some("orders")).unwrap();
    assert!(!report.has_failures(), "{report:?}");
    assert_eq!(
        report.state_of(CatalogKind::Deployment, "orders-v2-azure"),
        Some(ResourceState::Created)
    );
    assert_eq!(
        report.state_of(CatalogKind::Version, "orders-v2"),
        Some(ResourceState::Patched)
    );

    let remote_version = remote
        .get(&format!("{}/apis/orders/versions/orders-v2", parent()))
        .unwrap();
    assert_eq!(
        remote_version["deployments"],
        json!([
            format!("{}/deployments/orders-v2-aws", parent()),
            format!("{}/deployments/orders-v2-azure", parent()),
        ])
    );
}

#[test]
fn test_failed_patch_is_reported_and_siblings_continue() {
    let (_dir, store) = onramped();
    let remote = InMemoryHub::new();
    let client = client(&remote);
    import(&client, &store, Some("orders")).unwrap();

    remote.reject(
        Method::PATCH,
        format!("{}/apis/orders/versions/orders-v1", parent()),
        400,
    );
    remote.clear_calls();
    let report = import(&client, &store, Some("orders")).unwrap();

    assert_eq!(
        report.state_of(CatalogKind::Version, "orders-v1"),
        Some(ResourceState::Failed)
    );
    assert_eq!(
        report.state_of(CatalogKind::Version, "orders-v2"),
        Some(ResourceState::Patched)
    );
    assert_eq!(
        report.state_of(CatalogKind::Spec, "orders-v1-aws-oas"),
        Some(ResourceState::Existing)
    );
    let patches_for_v1 = remote
        .calls_with(&Method::PATCH)
        .into_iter()
        .filter(|c| c.path.contains("/versions/orders-v1?"))
        .count();
    assert_eq!(patches_for_v1, 1);
}

#[test]
fn test_rejected_create_fails_only_that_resource() {
    let (_dir, store) = onramped();
    let remote = InMemoryHub::new();
    remote.reject(
        Method::POST,
        format!("{}/deployments/orders-v2-aws", parent()),
        500,
    );

    let report = import(&client(&remote), &store, Some("orders")).unwrap();
    assert_eq!(
        report.state_of(CatalogKind::Deployment, "orders-v2-aws"),
        Some(ResourceState::Failed)
    );
    // the version references a deployment that does not exist remotely
    assert_eq!(
        report.state_of(CatalogKind::Version, "orders-v2"),
        Some(ResourceState::Failed)
    );
    assert_eq!(
        report.state_of(CatalogKind::Version, "orders-v1"),
        Some(ResourceState::Created)
    );
    let failure = report
        .failures()
        .find(|o| o.name == "orders-v2-aws")
        .unwrap();
    assert!(failure.detail.as_deref().unwrap().contains("500"));
}

#[test]
fn test_import_missing_root_document_skips_api() {
    let (_dir, store) = onramped();
    std::fs::remove_file(store.document_path("billing", "billing")).unwrap();
    let remote = InMemoryHub::new();

    let report = import(&client(&remote), &store, None).unwrap();
    assert_eq!(
        report.state_of(CatalogKind::Api, "billing"),
        Some(ResourceState::Failed)
    );
    assert!(remote
        .names()
        .iter()
        .all(|n| !n.contains("billing")));
    assert_eq!(
        report.state_of(CatalogKind::Api, "orders"),
        Some(ResourceState::Created)
    );
}

// ============================================================================
// Export / clean / status
// ============================================================================

#[test]
fn test_export_mirrors_remote_layout() {
    let (_dir, store) = onramped();
    let remote = InMemoryHub::new();
    let client = client(&remote);
    import(&client, &store, None).unwrap();

    let out = tempfile::tempdir().unwrap();
    let exported = LocalCatalogStore::open(out.path(), Platform::ApiHub);
    let report = export(&client, &exported, None).unwrap();
    assert!(!report.has_failures(), "{report:?}");

    assert_eq!(exported.list_apis().unwrap(), store.list_apis().unwrap());
    assert_eq!(
        exported.list_documents("orders").unwrap(),
        store.list_documents("orders").unwrap()
    );
    let spec: HubSpec = exported.read("orders", "orders-v1-aws-oas").unwrap();
    let original: HubSpec = store.read("orders", "orders-v1-aws-oas").unwrap();
    assert_eq!(spec.contents, original.contents);
}

#[test]
fn test_export_write_failure_is_isolated_to_its_api() {
    let (_dir, store) = onramped();
    let remote = InMemoryHub::new();
    let client = client(&remote);
    import(&client, &store, None).unwrap();

    let out = tempfile::tempdir().unwrap();
    let collection = out.path().join("apihub").join("apiproxies");
    std::fs::create_dir_all(&collection).unwrap();
    std::fs::write(collection.join("billing"), b"not a folder").unwrap();

    let exported = LocalCatalogStore::open(out.path(), Platform::ApiHub);
    let report = export(&client, &exported, None).unwrap();

    assert_eq!(report.state_of(CatalogKind::Api, "billing"), Some(ResourceState::Failed));
    assert_eq!(
        report.state_of(CatalogKind::Deployment, "billing-v1-azure"),
        Some(ResourceState::Failed)
    );
    assert_eq!(report.state_of(CatalogKind::Api, "orders"), Some(ResourceState::Exported));
    assert_eq!(
        report.state_of(CatalogKind::Spec, "orders-v1-aws-oas"),
        Some(ResourceState::Exported)
    );
    assert!(exported.exists("orders", "orders-v1-aws"));
    assert!(exported.exists("orders", "orders-v2-aws"));
}

#[test]
fn test_export_filter_applies_to_deployments() {
    let (_dir, store) = onramped();
    let remote = InMemoryHub::new();
    let client = client(&remote);
    import(&client, &store, None).unwrap();

    let out = tempfile::tempdir().unwrap();
    let exported = LocalCatalogStore::open(out.path(), Platform::ApiHub);
    export(&client, &exported, Some("billing")).unwrap();

    assert_eq!(exported.list_apis().unwrap(), vec!["billing"]);
    assert!(exported.exists("billing", "billing-v1-azure"));
}

#[test]
fn test_clean_with_filter_then_all() {
    let (_dir, store) = onramped();
    let remote = InMemoryHub::new();
    let client = client(&remote);
    import(&client, &store, None).unwrap();

    let report = clean(&client, Some("billing"));
    assert!(!report.has_failures(), "{report:?}");
    assert!(remote.names().iter().all(|n| !n.contains("billing")));
    assert!(remote.names().iter().any(|n| n.contains("orders")));

    let report = clean(&client, None);
    assert!(!report.has_failures(), "{report:?}");
    assert!(remote.names().is_empty());
    let forced = remote
        .calls_with(&Method::DELETE)
        .into_iter()
        .filter(|c| c.path.ends_with("?force=true"))
        .count();
    assert_eq!(forced, 2);
}

#[test]
fn test_clean_local_is_idempotent() {
    let (_dir, store) = onramped();

    let report = clean_local(&store).unwrap();
    assert_eq!(report.count(ResourceState::Deleted), 1);
    assert!(!store.platform_root().exists());

    let report = clean_local(&store).unwrap();
    assert_eq!(report.count(ResourceState::Skipped), 1);
}

#[test]
fn test_status_counts_apis() {
    let (_dir, store) = onramped();
    let remote = InMemoryHub::new();
    let client = client(&remote);
    import(&client, &store, None).unwrap();

    let status = status(&client);
    assert!(status.connected);
    assert_eq!(
        status.message,
        "Connected to API Hub, 2 APIs found in project acme and region us-central1."
    );

    remote.reject(Method::GET, format!("{}/apis", parent()), 403);
    let status = oasync_sync::status(&client);
    assert!(!status.connected);
    assert_eq!(status.message, "403 Forbidden");
}
