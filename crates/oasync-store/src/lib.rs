//! oasync Local Catalog Store
//!
//! Every catalog resource is persisted as one pretty-printed JSON document at a
//! deterministic path under a per-platform root:
//!
//! ```text
//! <root>/
//! ├── general/apiproxies/          canonical records (offramp output)
//! │   └── <apiKey>/
//! │       ├── <apiKey>.json        root API record
//! │       ├── <deploymentKey>.json one record per deployed instance
//! │       └── <deploymentKey>-oas.json
//! ├── apihub/apiproxies/           API Hub documents (onramp / export output)
//! │   └── <apiKey>/
//! │       ├── <apiKey>.json        API
//! │       ├── <versionKey>.json    version
//! │       ├── <deploymentKey>.json deployment
//! │       └── <deploymentKey>-oas.json spec
//! └── apigee/apiproxies/
//! ```
//!
//! The store is the only durable owner of catalog state and the interchange
//! format between pipeline stages. It knows the directory layout and the spec
//! companion suffix, but not the platform/version naming convention: callers
//! classify the remaining documents themselves.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};


/// Directory holding per-API folders under each platform root.
pub const COLLECTION_DIR: &str = "apiproxies";

/// File-stem suffix of a spec companion document.
pub const SPEC_SUFFIX: &str = "-oas";

const JSON_EXTENSION: &str = "json";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed document {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("document not found: {path}")]
    NotFound { path: PathBuf },
}

impl StoreError {
    /// Path of the document or directory the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            StoreError::Io { path, .. }
            | StoreError::Malformed { path, .. }
            | StoreError::NotFound { path } => path,
        }
    }

    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            StoreError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

// ============================================================================
// Platforms and resource kinds
// ============================================================================

/// A platform root inside the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Vendor-neutral canonical records.
    General,
    /// Google API Hub documents.
    ApiHub,
    /// Apigee proxy bundles.
    Apigee,
}

impl Platform {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Platform::General => "general",
            Platform::ApiHub => "apihub",
            Platform::Apigee => "apigee",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Classification of a document inside one API folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The root document, whose stem equals the API key.
    Api,
    /// A `<key>-oas` spec companion.
    Spec,
    /// Any other document (versions and deployments).
    Member,
}

impl ResourceKind {
    pub fn classify(api: &str, stem: &str) -> Self {
        if stem == api {
            ResourceKind::Api
        } else if spec_owner(stem).is_some() {
            ResourceKind::Spec
        } else {
            ResourceKind::Member
        }
    }
}

/// Stem of the spec companion for a deployment key.
pub fn spec_stem(key: &str) -> String {
    format!("{key}{SPEC_SUFFIX}")
}

/// The deployment key a spec stem belongs to, if `stem` is a spec companion.
pub fn spec_owner(stem: &str) -> Option<&str> {
    stem.strip_suffix(SPEC_SUFFIX).filter(|owner| !owner.is_empty())
}

// ============================================================================
// Store
// ============================================================================

/// File-tree backed catalog store for one platform.
#[derive(Debug, Clone)]
pub struct LocalCatalogStore {
    platform: Platform,
    platform_root: PathBuf,
}

impl LocalCatalogStore {
    /// Open the store for `platform` under `root`. Nothing is created until the
    /// first write.
    pub fn open(root: impl AsRef<Path>, platform: Platform) -> Self {
        Self {
            platform,
            platform_root: root.as_ref().join(platform.dir_name()),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// `<root>/<platform>`; the subtree removed by [`LocalCatalogStore::clean`].
    pub fn platform_root(&self) -> &Path {
        &self.platform_root
    }

    pub fn collection_dir(&self) -> PathBuf {
        self.platform_root.join(COLLECTION_DIR)
    }

    pub fn api_dir(&self, api: &str) -> PathBuf {
        self.collection_dir().join(api)
    }

    pub fn document_path(&self, api: &str, stem: &str) -> PathBuf {
        self.api_dir(api).join(format!("{stem}.{JSON_EXTENSION}"))
    }

    /// API keys present in the store, sorted. A missing collection directory
    /// is an empty store, not an error.
    pub fn list_apis(&self) -> Result<Vec<String>> {
        let dir = self.collection_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut apis = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))? {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let file_type = entry.file_type().map_err(|e| StoreError::io(&entry.path(), e))?;
            if !file_type.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                apis.push(name.to_string());
            }
        }
        apis.sort();
        Ok(apis)
    }

    /// Stems of every JSON document under one API folder, sorted by file name.
    pub fn list_documents(&self, api: &str) -> Result<Vec<String>> {
        let dir = self.api_dir(api);
        let mut stems = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))? {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(JSON_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_string());
            }
        }
        stems.sort();
        Ok(stems)
    }

    /// Documents of one kind under one API scope.
    pub fn list(&self, kind: ResourceKind, api: &str) -> Result<Vec<String>> {
        Ok(self
            .list_documents(api)?
            .into_iter()
            .filter(|stem| ResourceKind::classify(api, stem) == kind)
            .collect())
    }

    pub fn exists(&self, api: &str, stem: &str) -> bool {
        self.document_path(api, stem).is_file()
    }

    pub fn read_raw(&self, api: &str, stem: &str) -> Result<Vec<u8>> {
        let path = self.document_path(api, stem);
        fs::read(&path).map_err(|e| StoreError::io(&path, e))
    }

    pub fn read<T: DeserializeOwned>(&self, api: &str, stem: &str) -> Result<T> {
        let path = self.document_path(api, stem);
        let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed { path, source })
    }

    /// Serialize `document` as two-space indented JSON, replacing any existing
    /// document at the same path.
    pub fn write<T: Serialize>(&self, api: &str, stem: &str, document: &T) -> Result<PathBuf> {
        let dir = self.api_dir(api);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        let path = self.document_path(api, stem);
        let mut json = serde_json::to_string_pretty(document).map_err(|source| {
            StoreError::Malformed {
                path: path.clone(),
                source,
            }
        })?;
        json.push('\n');
        fs::write(&path, json).map_err(|e| StoreError::io(&path, e))?;
        tracing::debug!(path = %path.display(), "wrote catalog document");
        Ok(path)
    }

    /// Remove one API folder.
    pub fn remove_api(&self, api: &str) -> Result<bool> {
        remove_tree(&self.api_dir(api))
    }

    /// Remove the whole platform subtree. Returns `false` when it was already
    /// absent.
    pub fn clean(&self) -> Result<bool> {
        remove_tree(&self.platform_root)
    }
}

fn remove_tree(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
