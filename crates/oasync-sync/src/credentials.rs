//! Bearer-token resolution.
//!
//! A run resolves its token once, through [`CredentialProvider::resolve`], and
//! hands the resulting [`BearerToken`] to the transport. Nothing downstream
//! looks credentials up again.

use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::process::Command;

/// Environment variable consulted when no explicit token is given.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// An OAuth access token for the `cloud-platform` scope.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Where the token came from; logged, never the token itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Explicit,
    Environment,
    Gcloud,
}

#[derive(Debug, Clone, Default)]
pub struct CredentialProvider {
    explicit: Option<String>,
    gcloud_program: Option<String>,
}

impl CredentialProvider {
    pub fn new(explicit: Option<String>) -> Self {
        Self {
            explicit: explicit.filter(|t| !t.trim().is_empty()),
            gcloud_program: None,
        }
    }

    /// Override the default-credentials helper (defaults to `gcloud`).
    pub fn with_gcloud_program(mut self, program: impl Into<String>) -> Self {
        self.gcloud_program = Some(program.into());
        self
    }

    /// Resolve the token: explicit value, then the environment, then
    /// `gcloud auth print-access-token`.
    pub fn resolve(&self) -> Result<(BearerToken, TokenSource)> {
        if let Some(token) = &self.explicit {
            return Ok((BearerToken::new(token.trim()), TokenSource::Explicit));
        }
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                return Ok((BearerToken::new(token.trim()), TokenSource::Environment));
            }
        }
        let program = self.gcloud_program.as_deref().unwrap_or("gcloud");
        let output = Command::new(program)
            .args(["auth", "print-access-token"])
            .output()
            .with_context(|| {
                format!("no --token given, {ACCESS_TOKEN_ENV} unset, and `{program}` could not be run")
            })?;
        if !output.status.success() {
            return Err(anyhow!(
                "`{program} auth print-access-token` failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        let token = String::from_utf8(output.stdout)
            .context("access token from gcloud is not UTF-8")?
            .trim()
            .to_string();
        if token.is_empty() {
            return Err(anyhow!("`{program} auth print-access-token` printed no token"));
        }
        tracing::debug!(source = ?TokenSource::Gcloud, "resolved access token");
        Ok((BearerToken::new(token), TokenSource::Gcloud))
    }
}
