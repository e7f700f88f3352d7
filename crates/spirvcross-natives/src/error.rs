//! Bootstrap error types.

use std::path::PathBuf;

use crate::native::LoadError;

/// Errors that can occur while staging, loading, or cleaning up native libraries.
///
/// None of these cross the bootstrap boundary: they are logged where they occur
/// and collected into a [`BootstrapReport`](crate::BootstrapReport).
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The running OS does not map to a supported platform
    #[error("Unsupported platform: {os}")]
    UnsupportedPlatform {
        /// OS identity string that failed to match
        os: String,
    },

    /// The staging directory could not be created
    #[error("Unable to create staging directory {}: {source}", path.display())]
    StagingDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The resource bundle has no entry for a required library
    #[error("Resource {resource} for {library} not available")]
    ResourceNotFound { library: String, resource: String },

    /// Reading the resource or writing the staged file failed
    #[error("Error while staging {library}: {source}")]
    ResourceCopy {
        library: String,
        #[source]
        source: std::io::Error,
    },

    /// The dynamic loader rejected a staged library
    #[error("Could not load native library {library}: {source}")]
    Load {
        library: String,
        #[source]
        source: LoadError,
    },

    /// A staged file or the staging directory could not be removed
    #[error("Unable to delete {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    Invalid(String),
}
