//! Bootstrap orchestration and the readiness guard.
//!
//! A [`NativeLoader`] owns the whole lifecycle:
//!
//! ```text
//! NotAttempted -> InProgress -> Ready      (absorbing)
//!                            -> NotReady   (next request retries)
//! ```
//!
//! One attempt runs platform detection, extraction, loading and cleanup in
//! that order. Extraction stops at the first library it cannot stage; loading
//! tries every staged library; cleanup always runs. The loader becomes ready
//! only when every required library was loaded.

use std::path::PathBuf;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::config::LoaderConfig;
use crate::error::BootstrapError;
use crate::extract::{self, RequiredLibrary};
use crate::native::{DynamicLoader, NativeLibrary};
use crate::platform::Platform;
use crate::resources::ResourceBundle;
use crate::staging;

/// Required libraries, dependencies first.
pub const REQUIRED_LIBRARIES: &[&str] = &["SPIRV-Tools-shared", "spirvcrossj"];

/// Lifecycle state of a [`NativeLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderState {
    NotAttempted,
    InProgress,
    Ready,
    NotReady,
}

/// Outcome of one library in one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    NotStaged,
    LoadFailed,
    Loaded,
}

/// Per-library entry of a [`BootstrapReport`].
#[derive(Debug, Clone, Serialize)]
pub struct LibraryReport {
    pub name: String,
    pub outcome: LoadOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staged_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What happened during one bootstrap attempt.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub platform: String,
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
    pub libraries: Vec<LibraryReport>,
    /// Attempt-wide failure (unsupported platform, staging directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Cleanup problems; these never affect readiness
    pub warnings: Vec<String>,
}

impl BootstrapReport {
    /// Number of libraries that reached [`LoadOutcome::Loaded`].
    pub fn loaded_count(&self) -> usize {
        self.libraries
            .iter()
            .filter(|l| l.outcome == LoadOutcome::Loaded)
            .count()
    }

    fn new(platform: Platform, libraries: &[String]) -> Self {
        Self {
            platform: platform.to_string(),
            ready: false,
            staging_dir: None,
            libraries: libraries
                .iter()
                .map(|name| LibraryReport {
                    name: name.clone(),
                    outcome: LoadOutcome::NotStaged,
                    staged_path: None,
                    error: None,
                })
                .collect(),
            error: None,
            warnings: Vec::new(),
        }
    }
}

/// Stages and loads the required native libraries, once per process.
///
/// Construct one per process (or per test) and share it; the attempt itself is
/// serialised internally, so concurrent callers never race on extraction.
pub struct NativeLoader<L: DynamicLoader> {
    config: LoaderConfig,
    bundle: ResourceBundle,
    loader: L,
    libraries: Vec<String>,
    os: String,
    /// Held for the whole attempt
    attempt: Mutex<()>,
    state: RwLock<LoaderState>,
    last_report: RwLock<Option<BootstrapReport>>,
    /// Loaded libraries stay mapped; the handles are kept, never closed
    loaded: Mutex<Vec<NativeLibrary>>,
}

impl<L: DynamicLoader> NativeLoader<L> {
    /// Create a loader for [`REQUIRED_LIBRARIES`] on the running OS.
    pub fn new(config: LoaderConfig, bundle: ResourceBundle, loader: L) -> Self {
        Self {
            config,
            bundle,
            loader,
            libraries: REQUIRED_LIBRARIES.iter().map(|s| s.to_string()).collect(),
            os: std::env::consts::OS.to_string(),
            attempt: Mutex::new(()),
            state: RwLock::new(LoaderState::NotAttempted),
            last_report: RwLock::new(None),
            loaded: Mutex::new(Vec::new()),
        }
    }

    /// Replace the required library set (dependencies first).
    pub fn with_libraries<I, S>(mut self, libraries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libraries = libraries.into_iter().map(Into::into).collect();
        self
    }

    /// Override the OS identity string used for platform detection.
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    /// Make sure every required library is loaded.
    ///
    /// Returns `true` once all libraries are loaded. After that, further calls
    /// return `true` without touching the filesystem or the dynamic loader.
    /// Never panics on I/O or load failures; details go to the log and to
    /// [`last_report`](Self::last_report).
    pub fn ensure_loaded(&self) -> bool {
        if self.is_ready() {
            tracing::info!("Native libs have already been loaded!");
            return true;
        }

        let _attempt = self.attempt.lock();
        // Another caller may have finished while we waited
        if self.is_ready() {
            return true;
        }

        *self.state.write() = LoaderState::InProgress;
        let report = self.run_attempt();
        let ready = report.ready;

        *self.last_report.write() = Some(report);
        *self.state.write() = if ready {
            LoaderState::Ready
        } else {
            LoaderState::NotReady
        };
        ready
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoaderState {
        *self.state.read()
    }

    /// Whether every required library has been loaded.
    pub fn is_ready(&self) -> bool {
        self.state() == LoaderState::Ready
    }

    /// Report of the most recent attempt that ran.
    pub fn last_report(&self) -> Option<BootstrapReport> {
        self.last_report.read().clone()
    }

    /// Paths of every library loaded so far, in load order.
    ///
    /// The files themselves are deleted after loading; the libraries stay mapped.
    pub fn loaded_libraries(&self) -> Vec<PathBuf> {
        self.loaded
            .lock()
            .iter()
            .map(|lib| lib.path().to_path_buf())
            .collect()
    }

    /// The required library set.
    pub fn libraries(&self) -> &[String] {
        &self.libraries
    }

    /// Configuration in use.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Resources the libraries are staged from.
    pub fn bundle(&self) -> &ResourceBundle {
        &self.bundle
    }

    fn run_attempt(&self) -> BootstrapReport {
        let platform = Platform::detect(&self.os);
        let mut report = BootstrapReport::new(platform, &self.libraries);

        let Some(suffix) = platform.suffix() else {
            let err = BootstrapError::UnsupportedPlatform {
                os: self.os.clone(),
            };
            tracing::error!("{}", err);
            report.error = Some(err.to_string());
            return report;
        };

        let root = self.config.staging_root();
        if self.config.sweep_stale {
            staging::sweep_stale(&root, &self.config.dir_prefix, self.config.stale_after());
        }

        let required: Vec<RequiredLibrary> = self
            .libraries
            .iter()
            .map(|name| RequiredLibrary {
                name: name.clone(),
                file_name: format!("lib{}.{}", name, suffix),
            })
            .collect();

        // Phase 1: stage, stopping at the first failure
        let extraction = extract::stage_all(&self.bundle, &required, &root, &self.config.dir_prefix);
        report.staging_dir = extraction
            .staging_dir
            .as_ref()
            .map(|dir| dir.path().to_path_buf());

        if let Some(err) = &extraction.error {
            if extraction.staging_failed() {
                report.error = Some(err.to_string());
            } else if let Some(entry) = report.libraries.get_mut(extraction.staged.len()) {
                // Extraction stages in order, so it stopped at the next library
                entry.error = Some(err.to_string());
            }
        }

        // Phase 2: load every staged library independently
        let mut loaded_count = 0;
        for (index, staged) in extraction.staged.iter().enumerate() {
            let result = self.loader.load(&staged.path);
            let Some(entry) = report.libraries.get_mut(index) else {
                continue;
            };
            entry.staged_path = Some(staged.path.clone());

            match result {
                Ok(library) => {
                    tracing::info!("Loaded native library {}", staged.path.display());
                    entry.outcome = LoadOutcome::Loaded;
                    loaded_count += 1;
                    self.loaded.lock().push(library);
                }
                Err(source) => {
                    let err = BootstrapError::Load {
                        library: staged.library.clone(),
                        source,
                    };
                    tracing::error!("{}", err);
                    entry.outcome = LoadOutcome::LoadFailed;
                    entry.error = Some(err.to_string());
                }
            }
        }

        // Phase 3: always clean up; never affects readiness
        if let Some(dir) = &extraction.staging_dir {
            for warning in staging::clean(dir, &extraction.created) {
                report.warnings.push(warning.to_string());
            }
        }

        report.ready = loaded_count == self.libraries.len();
        report
    }
}
