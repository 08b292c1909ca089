//! Caller-facing identifiers: the target platform and the build descriptor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target platform of a native build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// iOS simulator builds: `.app` bundles (directories).
    Ios,
    /// Android builds: single `.apk` files.
    Android,
}

impl Platform {
    /// Lowercase identifier used on the wire and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown platform name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown platform '{0}': expected 'ios' or 'android'")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

/// Identifies one build: which platform, and the caller-computed fingerprint.
///
/// The fingerprint is opaque. It is never validated, only embedded in cache names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDescriptor {
    /// Target platform.
    pub platform: Platform,
    /// Content hash identifying the build configuration/output.
    pub fingerprint_hash: String,
}

impl BuildDescriptor {
    /// Create a descriptor for `platform` with the given fingerprint.
    pub fn new(platform: Platform, fingerprint_hash: impl Into<String>) -> Self {
        Self {
            platform,
            fingerprint_hash: fingerprint_hash.into(),
        }
    }
}
