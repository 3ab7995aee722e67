//! Per-resource outcomes of one run.

use crate::error::SyncError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Catalog resource kinds, across both platforms and the local tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Api,
    Version,
    Deployment,
    Spec,
    Proxy,
    Product,
    Developer,
    LocalTree,
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CatalogKind::Api => "api",
            CatalogKind::Version => "version",
            CatalogKind::Deployment => "deployment",
            CatalogKind::Spec => "spec",
            CatalogKind::Proxy => "proxy",
            CatalogKind::Product => "product",
            CatalogKind::Developer => "developer",
            CatalogKind::LocalTree => "local tree",
        };
        f.write_str(s)
    }
}

/// Terminal state of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceState {
    Created,
    Patched,
    /// Create reported a conflict and the kind is not patched.
    Existing,
    Deleted,
    Deployed,
    Exported,
    Written,
    Skipped,
    Failed,
}

impl ResourceState {
    pub fn is_failure(&self) -> bool {
        matches!(self, ResourceState::Failed)
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceState::Created => "created",
            ResourceState::Patched => "patched",
            ResourceState::Existing => "existing",
            ResourceState::Deleted => "deleted",
            ResourceState::Deployed => "deployed",
            ResourceState::Exported => "exported",
            ResourceState::Written => "written",
            ResourceState::Skipped => "skipped",
            ResourceState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOutcome {
    pub kind: CatalogKind,
    pub name: String,
    pub state: ResourceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub operation: String,
    pub outcomes: Vec<ResourceOutcome>,
}

impl SyncReport {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, kind: CatalogKind, name: impl Into<String>, state: ResourceState) {
        let name = name.into();
        tracing::info!(%kind, name = %name, %state, "resource");
        self.outcomes.push(ResourceOutcome {
            kind,
            name,
            state,
            detail: None,
        });
    }

    pub fn skip(&mut self, kind: CatalogKind, name: impl Into<String>, reason: impl Into<String>) {
        let name = name.into();
        let reason = reason.into();
        tracing::warn!(%kind, name = %name, reason = %reason, "skipped");
        self.outcomes.push(ResourceOutcome {
            kind,
            name,
            state: ResourceState::Skipped,
            detail: Some(reason),
        });
    }

    pub fn fail(&mut self, kind: CatalogKind, name: impl Into<String>, err: &SyncError) {
        let name = name.into();
        tracing::error!(%kind, name = %name, error = %err, "failed");
        self.outcomes.push(ResourceOutcome {
            kind,
            name,
            state: ResourceState::Failed,
            detail: Some(err.to_string()),
        });
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.state.is_failure())
    }

    pub fn count(&self, state: ResourceState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    pub fn state_of(&self, kind: CatalogKind, name: &str) -> Option<ResourceState> {
        self.outcomes
            .iter()
            .rev()
            .find(|o| o.kind == kind && o.name == name)
            .map(|o| o.state)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ResourceOutcome> {
        self.outcomes.iter().filter(|o| o.state.is_failure())
    }

    /// State counts, in state order.
    pub fn summary(&self) -> BTreeMap<ResourceState, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            *counts.entry(outcome.state).or_insert(0) += 1;
        }
        counts
    }
}

/// Result of a connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformStatus {
    pub connected: bool,
    pub message: String,
}
