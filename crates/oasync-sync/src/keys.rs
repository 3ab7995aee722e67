//! Typed resource keys.
//!
//! A deployment key such as `orders-v1-aws` carries the whole hierarchy:
//!
//! ```text
//! orders-v1-aws      deployment   (file stem)
//! orders-v1          version      (platform suffix removed)
//! orders             api          (trailing -v<digits> removed)
//! ```
//!
//! Keys are parsed once, at ingestion, and passed around as [`ResourceKey`].

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Deployment platforms recognized in file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlatformTag {
    Aws,
    Azure,
}

/// Every recognized deployment suffix, checked in order.
pub const PLATFORM_SUFFIXES: &[(PlatformTag, &str)] =
    &[(PlatformTag::Aws, "-aws"), (PlatformTag::Azure, "-azure")];

impl PlatformTag {
    pub fn suffix(&self) -> &'static str {
        match self {
            PlatformTag::Aws => "-aws",
            PlatformTag::Azure => "-azure",
        }
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix().trim_start_matches('-'))
    }
}

fn version_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-v\d+$").expect("valid version suffix regex"))
}

/// Remove a trailing `-v<digits>` from a version key.
pub fn strip_version_suffix(version: &str) -> &str {
    match version_suffix_re().find(version) {
        Some(m) => &version[..m.start()],
        None => version,
    }
}

/// Remove the platform suffix, if the key ends with a recognized one.
pub fn strip_platform_suffix(deployment: &str) -> Option<(&str, PlatformTag)> {
    PLATFORM_SUFFIXES.iter().find_map(|(tag, suffix)| {
        deployment
            .strip_suffix(suffix)
            .filter(|rest| !rest.is_empty())
            .map(|rest| (rest, *tag))
    })
}

/// The three derived hierarchy levels of one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub api: String,
    pub version: String,
    pub deployment: String,
    pub platform: PlatformTag,
}

impl ResourceKey {
    /// Parse a deployment key. `None` when no recognized platform suffix ends it.
    pub fn parse(deployment: &str) -> Option<Self> {
        let (version, platform) = strip_platform_suffix(deployment)?;
        Some(Self {
            api: strip_version_suffix(version).to_string(),
            version: version.to_string(),
            deployment: deployment.to_string(),
            platform,
        })
    }

    /// Recognize a deployment document by file name (`<key>.json`).
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        Self::parse(file_name.strip_suffix(".json")?)
    }

    /// Stem of the spec companion document.
    pub fn spec_stem(&self) -> String {
        oasync_store::spec_stem(&self.deployment)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.deployment)
    }
}

/// API key of any deployment or version key, using the same stripping rule as
/// [`ResourceKey::parse`]; keys without a platform suffix are treated as
/// version keys.
pub fn api_key_of(key: &str) -> &str {
    let version = strip_platform_suffix(key).map_or(key, |(version, _)| version);
    strip_version_suffix(version)
}
