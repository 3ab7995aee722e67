//! oasync Sync: catalog mapping and reconciliation
//!
//! Moves API catalog metadata between the vendor-neutral "general" records in
//! the local store, the local API Hub mirror, and the remote catalogs.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        OASYNC SYNC PIPELINE                         │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  general records ──► keys ──► hierarchy ──► translate ──► apihub   │
//! │   (local store)     (typed)   (versions)    (pure fns)   (local)    │
//! │                                                            │  ▲     │
//! │                                              import        │  │     │
//! │                                                            ▼  │     │
//! │   CredentialProvider ──► HttpTransport ──► ApiHubClient ──► remote │
//! │   (resolved once)        (Transport)       ApigeeClient      export │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every run returns a [`SyncReport`] with one terminal state per resource;
//! failures never propagate past the resource they belong to.

pub mod apigee;
pub mod client;
pub mod credentials;
pub mod error;
pub mod hierarchy;
pub mod hub;
pub mod keys;
pub mod model;
pub mod names;
pub mod reconcile;
pub mod report;
pub mod testing;
pub mod translate;
pub mod transport;

pub use apigee::{ApigeeClient, DEFAULT_APIGEE_URL};
pub use client::{ApiHubClient, DEFAULT_APIHUB_URL};
pub use credentials::{BearerToken, CredentialProvider, TokenSource};
pub use error::{Result, SyncError};
pub use hierarchy::{ApiHierarchy, VersionGroups};
pub use keys::{PlatformTag, ResourceKey};
pub use model::{CanonicalApiMeta, CanonicalRecord};
pub use names::ResourceScope;
pub use reconcile::{clean, clean_local, export, import, onramp, status};
pub use report::{CatalogKind, PlatformStatus, ResourceOutcome, ResourceState, SyncReport};
pub use transport::{HttpTransport, RawResponse, Transport};
