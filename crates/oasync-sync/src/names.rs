//! Resource-name construction for the API Hub resource tree.
//!
//! ```text
//! projects/{project}/locations/{region}
//! ├── apis/{api}
//! │   └── versions/{version}
//! │       └── specs/{deployment}
//! ├── deployments/{deployment}
//! └── attributes/{attribute}
//! ```
//!
//! Project and region come from the invocation, never from a stored record.

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceScope {
    pub project: String,
    pub region: String,
}

impl ResourceScope {
    /// Build a scope from optional invocation values. Missing or blank values
    /// are a precondition failure.
    pub fn new(project: Option<&str>, region: Option<&str>) -> Result<Self, SyncError> {
        let project = project.map(str::trim).filter(|p| !p.is_empty());
        let region = region.map(str::trim).filter(|r| !r.is_empty());
        match (project, region) {
            (Some(project), Some(region)) => Ok(Self {
                project: project.to_string(),
                region: region.to_string(),
            }),
            (None, None) => Err(SyncError::Precondition(
                "missing --project YOUR_PROJECT_ID and --region YOUR_REGION".to_string(),
            )),
            (None, _) => Err(SyncError::Precondition(
                "no project given; specify --project YOUR_PROJECT_ID".to_string(),
            )),
            (_, None) => Err(SyncError::Precondition(
                "no region given; specify --region YOUR_REGION".to_string(),
            )),
        }
    }

    /// `projects/{project}/locations/{region}`
    pub fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project, self.region)
    }

    pub fn apis(&self) -> String {
        format!("{}/apis", self.parent())
    }

    pub fn api(&self, api: &str) -> String {
        format!("{}/{api}", self.apis())
    }

    pub fn versions(&self, api: &str) -> String {
        format!("{}/versions", self.api(api))
    }

    pub fn version(&self, api: &str, version: &str) -> String {
        format!("{}/{version}", self.versions(api))
    }

    pub fn specs(&self, api: &str, version: &str) -> String {
        format!("{}/specs", self.version(api, version))
    }

    pub fn spec(&self, api: &str, version: &str, spec: &str) -> String {
        format!("{}/{spec}", self.specs(api, version))
    }

    pub fn deployments(&self) -> String {
        format!("{}/deployments", self.parent())
    }

    pub fn deployment(&self, deployment: &str) -> String {
        format!("{}/{deployment}", self.deployments())
    }

    pub fn attribute(&self, attribute: &str) -> String {
        format!("{}/attributes/{attribute}", self.parent())
    }
}
