//! Hierarchy builder: flat per-deployment documents into API / version /
//! deployment groups.
//!
//! Grouping is driven entirely by [`ResourceKey`]; there is no stored parent
//! pointer. Documents whose stem carries no recognized platform suffix are not
//! deployments and are ignored by [`VersionGroups::from_documents`].

use crate::keys::ResourceKey;
use crate::model::CanonicalRecord;
use std::collections::BTreeMap;

/// One deployment under its version, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Member<T> {
    pub key: ResourceKey,
    pub doc: T,
}

/// Version key to the ordered deployments grouped under it.
///
/// Versions iterate in key order; deployments inside a version keep the order
/// they were inserted in (the order the documents were read).
#[derive(Debug, Clone, PartialEq)]
pub struct VersionGroups<T> {
    api: String,
    versions: BTreeMap<String, Vec<Member<T>>>,
}

impl<T> VersionGroups<T> {
    pub fn new(api: impl Into<String>) -> Self {
        Self {
            api: api.into(),
            versions: BTreeMap::new(),
        }
    }

    /// Group `(stem, doc)` pairs, skipping stems that are not deployment keys.
    pub fn from_documents(
        api: impl Into<String>,
        documents: impl IntoIterator<Item = (String, T)>,
    ) -> Self {
        let mut groups = Self::new(api);
        for (stem, doc) in documents {
            if let Some(key) = ResourceKey::parse(&stem) {
                groups.insert(key, doc);
            }
        }
        groups
    }

    pub fn api(&self) -> &str {
        &self.api
    }

    pub fn insert(&mut self, key: ResourceKey, doc: T) {
        self.versions
            .entry(key.version.clone())
            .or_default()
            .push(Member { key, doc });
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    pub fn deployment_count(&self) -> usize {
        self.versions.values().map(Vec::len).sum()
    }

    pub fn version_keys(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    pub fn deployments(&self, version: &str) -> &[Member<T>] {
        self.versions.get(version).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first deployment recorded for `version`; source of the version's
    /// display metadata.
    pub fn first(&self, version: &str) -> Option<&Member<T>> {
        self.deployments(version).first()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Member<T>])> {
        self.versions
            .iter()
            .map(|(version, members)| (version.as_str(), members.as_slice()))
    }
}

/// Canonical records of one API, grouped for onramp.
pub type ApiHierarchy = VersionGroups<CanonicalRecord>;

impl ApiHierarchy {
    /// Deployment key to spec body, for deployments that carry one.
    pub fn specs(&self) -> BTreeMap<&str, &[u8]> {
        self.versions
            .values()
            .flatten()
            .filter_map(|m| m.doc.spec.as_deref().map(|spec| (m.key.deployment.as_str(), spec)))
            .collect()
    }
}
