//! Dynamic library loading for staged native libraries
//!
//! Cross-platform support for mapping shared libraries (.so, .jnilib, .dll)
//! into the process. A loaded library is never unloaded: handles returned here
//! have no `Drop` that closes them, and the loaded code stays valid for the
//! rest of the process lifetime even after the staged file is deleted.

#[cfg(unix)]
use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during library loading
#[derive(Debug, Error)]
pub enum LoadError {
    /// Library file missing, incompatible, or with unresolved symbols
    #[error("Library not loadable: {path}")]
    Rejected {
        /// Path that was attempted, with the platform error
        path: String,
    },

    /// Platform-specific error
    #[error("Platform error: {0}")]
    PlatformError(String),

    /// Invalid path encoding
    #[error("Invalid UTF-8 in path: {0}")]
    InvalidPath(String),
}

/// Handle to a library mapped into the process.
#[derive(Debug)]
pub struct NativeLibrary {
    handle: *mut std::ffi::c_void,
    path: PathBuf,
}

// Safety: the handle is an opaque token owned by the OS loader; it is never
// dereferenced or closed from Rust.
unsafe impl Send for NativeLibrary {}
unsafe impl Sync for NativeLibrary {}

impl NativeLibrary {
    /// Wrap a raw loader handle.
    ///
    /// # Safety
    ///
    /// `handle` must come from the platform loader (or be an opaque token that
    /// is never passed to it, as in test loaders).
    pub unsafe fn from_raw(handle: *mut std::ffi::c_void, path: PathBuf) -> Self {
        Self { handle, path }
    }

    /// Path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw platform handle (`dlopen` handle or `HMODULE`).
    pub fn raw_handle(&self) -> *mut std::ffi::c_void {
        self.handle
    }
}

/// Something that maps a shared library file into the current process.
pub trait DynamicLoader: Send + Sync {
    /// Load the library at `path`.
    fn load(&self, path: &Path) -> Result<NativeLibrary, LoadError>;
}

/// The operating system's dynamic loader.
///
/// # Platform-specific behavior
///
/// - **Linux/macOS**: `dlopen(RTLD_NOW | RTLD_GLOBAL)`
/// - **Windows**: `LoadLibraryW`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLoader;

impl DynamicLoader for SystemLoader {
    fn load(&self, path: &Path) -> Result<NativeLibrary, LoadError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| LoadError::InvalidPath(format!("{:?}", path)))?;

        let handle = platform_load(path_str)?;
        Ok(NativeLibrary {
            handle,
            path: path.to_path_buf(),
        })
    }
}

// ============================================================================
// Unix Implementation (Linux, macOS, BSD)
// ============================================================================

#[cfg(unix)]
fn platform_load(path: &str) -> Result<*mut std::ffi::c_void, LoadError> {
    let c_path = CString::new(path)
        .map_err(|e| LoadError::PlatformError(format!("Invalid path: {}", e)))?;

    let handle = unsafe {
        // RTLD_NOW: Resolve all symbols immediately
        // RTLD_GLOBAL: Later libraries in the set resolve against this one
        libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL)
    };

    if handle.is_null() {
        let error = unsafe {
            let err_ptr = libc::dlerror();
            if err_ptr.is_null() {
                "Unknown error".to_string()
            } else {
                CStr::from_ptr(err_ptr).to_string_lossy().into_owned()
            }
        };

        return Err(LoadError::Rejected {
            path: format!("{}: {}", path, error),
        });
    }

    Ok(handle)
}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(windows)]
fn platform_load(path: &str) -> Result<*mut std::ffi::c_void, LoadError> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;

    if path.contains('\0') {
        return Err(LoadError::PlatformError(format!("Invalid path: {}", path)));
    }

    let wide: Vec<u16> = OsStr::new(path)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    let handle = unsafe { LoadLibraryW(wide.as_ptr()) };

    if handle.is_null() {
        let error = unsafe { GetLastError() };
        return Err(LoadError::Rejected {
            path: format!("{} (error code: {})", path, error),
        });
    }

    Ok(handle)
}

#[cfg(windows)]
extern "system" {
    fn LoadLibraryW(filename: *const u16) -> *mut std::ffi::c_void;
    fn GetLastError() -> u32;
}

#[cfg(not(any(unix, windows)))]
fn platform_load(path: &str) -> Result<*mut std::ffi::c_void, LoadError> {
    let _ = path;
    Err(LoadError::PlatformError(
        "dynamic loading is not supported on this target".to_string(),
    ))
}
