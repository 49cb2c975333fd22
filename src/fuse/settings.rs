use crate::fuse::constants::{
    DEFAULT_SCHEMA_VERSION, DEVELOPMENT_ROOT_COLLECTION, RELEASE_ROOT_COLLECTION,
};
use crate::fuse::model::ResourcePath;

/// Which data partition a server reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    /// Documents live under `devel/<schema_version>`.
    Development,
    /// Documents live under `releases/<schema_version>`.
    Release,
}

impl Environment {
    /// `Development` in debug builds, `Release` otherwise.
    pub fn from_build() -> Self {
        if cfg!(debug_assertions) {
            Environment::Development
        } else {
            Environment::Release
        }
    }

    fn root_collection(self) -> &'static str {
        match self {
            Environment::Development => DEVELOPMENT_ROOT_COLLECTION,
            Environment::Release => RELEASE_ROOT_COLLECTION,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::from_build()
    }
}

/// What happens when a stored document does not match its record type.
///
/// Both policies log the failure together with the offending payload first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Treat the failure as a programming error and panic.
    Strict,
    /// Drop the document from the result.
    Lenient,
}

impl DecodePolicy {
    /// `Strict` in debug builds, `Lenient` otherwise.
    pub fn from_build() -> Self {
        if cfg!(debug_assertions) {
            DecodePolicy::Strict
        } else {
            DecodePolicy::Lenient
        }
    }
}

impl Default for DecodePolicy {
    fn default() -> Self {
        Self::from_build()
    }
}

/// Configuration for a [`FuseServer`](crate::fuse::FuseServer).
///
/// ```
/// use firefuse::fuse::{DecodePolicy, Environment, FuseSettings};
///
/// let settings = FuseSettings {
///     environment: Environment::Release,
///     decode_policy: DecodePolicy::Lenient,
///     ..Default::default()
/// };
/// assert_eq!(settings.root_path().canonical_string(), "releases/0.0.1");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuseSettings {
    pub environment: Environment,
    pub schema_version: String,
    pub decode_policy: DecodePolicy,
}

impl Default for FuseSettings {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            decode_policy: DecodePolicy::default(),
        }
    }
}

impl FuseSettings {
    /// Path of the document every record collection is nested under.
    pub fn root_path(&self) -> ResourcePath {
        ResourcePath::from_segments([
            self.environment.root_collection(),
            self.schema_version.as_str(),
        ])
    }
}
