//! spirvcross-natives
//!
//! Makes the spirvcrossj native libraries available to the current process.
//! The libraries are embedded in the crate at build time; the dynamic loader
//! can only open real files, so each attempt copies them to a private staging
//! directory, loads them in dependency order, and deletes the copies again.
//!
//! Most callers only need [`ensure_natives_loaded`]:
//!
//! ```ignore
//! if !spirvcross_natives::ensure_natives_loaded() {
//!     // native calls are unavailable; see the log for details
//! }
//! ```
//!
//! Tests and embedders that need their own resources, loader or staging
//! location construct a [`NativeLoader`] directly.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extract;
pub mod native;
pub mod platform;
pub mod resources;
pub mod staging;

use once_cell::sync::Lazy;

pub use bootstrap::{
    BootstrapReport, LibraryReport, LoadOutcome, LoaderState, NativeLoader, REQUIRED_LIBRARIES,
};
pub use config::LoaderConfig;
pub use error::{BootstrapError, ConfigError};
pub use extract::{RequiredLibrary, StagedFile};
pub use native::{DynamicLoader, LoadError, NativeLibrary, SystemLoader};
pub use platform::Platform;
pub use resources::{ResourceBundle, ResourceEntry, RESOURCE_ROOT};

static NATIVES: Lazy<NativeLoader<SystemLoader>> = Lazy::new(|| {
    let config = LoaderConfig::from_env();
    let bundle = bundle_for(&config);
    NativeLoader::new(config, bundle, SystemLoader)
});

/// The resource bundle selected by `config`: a resource directory if one is
/// configured and readable, the embedded libraries otherwise.
pub fn bundle_for(config: &LoaderConfig) -> ResourceBundle {
    match &config.resource_dir {
        Some(dir) => match ResourceBundle::from_dir(dir) {
            Ok(bundle) => bundle,
            Err(e) => {
                tracing::warn!(
                    "Unable to read resource directory {}: {}; using embedded libraries",
                    dir.display(),
                    e
                );
                ResourceBundle::embedded()
            }
        },
        None => ResourceBundle::embedded(),
    }
}

/// Ensure the native libraries are loaded into this process.
///
/// Idempotent: once it has returned `true`, later calls return `true`
/// immediately. A `false` result can be retried.
pub fn ensure_natives_loaded() -> bool {
    NATIVES.ensure_loaded()
}

/// Whether the native libraries are loaded.
pub fn natives_ready() -> bool {
    NATIVES.is_ready()
}

/// The process-wide loader behind [`ensure_natives_loaded`].
pub fn global_loader() -> &'static NativeLoader<SystemLoader> {
    &NATIVES
}
