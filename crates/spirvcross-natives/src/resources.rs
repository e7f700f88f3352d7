//! Native library resources bundled with the application
//!
//! The dynamic loader needs a real file path, so libraries shipped inside the
//! binary are only readable through this bundle until they are staged:
//! - **Embedded**: bytes compiled into the crate by the build script
//! - **DiskBacked**: files read on demand from a directory (development mode)
//!
//! Resource paths are package-relative and normalized: forward slashes, no
//! leading `./`, e.g. `spirvcrossj/natives/libspirvcrossj.so`.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Package-relative directory holding the native libraries.
pub const RESOURCE_ROOT: &str = "spirvcrossj/natives";

mod embedded {
    include!(concat!(env!("OUT_DIR"), "/embedded_natives.rs"));
}

/// Package-relative resource path for a library file name.
pub fn resource_path(file_name: &str) -> String {
    format!("{}/{}", RESOURCE_ROOT, file_name)
}

/// A single bundled resource.
#[derive(Debug, Clone)]
pub enum ResourceEntry {
    /// File lives on disk, read when opened.
    DiskBacked(PathBuf),

    /// File data embedded in the binary (or held in memory).
    Embedded(Cow<'static, [u8]>),
}

/// Bundle of native library resources, keyed by package-relative path.
#[derive(Debug, Clone, Default)]
pub struct ResourceBundle {
    entries: HashMap<String, ResourceEntry>,
}

impl ResourceBundle {
    /// Create a bundle from a map of entries.
    pub fn new(entries: HashMap<String, ResourceEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(path, entry)| (normalize_path(&path), entry))
            .collect();
        Self { entries }
    }

    /// Create an empty bundle.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The libraries embedded into this crate at build time.
    pub fn embedded() -> Self {
        let entries = embedded::EMBEDDED_NATIVES
            .iter()
            .map(|(path, data)| {
                (path.to_string(), ResourceEntry::Embedded(Cow::Borrowed(*data)))
            })
            .collect();
        Self::new(entries)
    }

    /// Create a disk-backed bundle from the files directly inside `dir`.
    ///
    /// Each file `dir/<name>` is exposed as `spirvcrossj/natives/<name>`.
    pub fn from_dir(dir: &Path) -> io::Result<Self> {
        let mut entries = HashMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                // Same rule as the build script: dotfiles are never resources
                if name.starts_with('.') {
                    continue;
                }
                entries.insert(resource_path(name), ResourceEntry::DiskBacked(path.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, path: &str, entry: ResourceEntry) {
        self.entries.insert(normalize_path(path), entry);
    }

    /// Open a resource for reading.
    ///
    /// Returns `None` if the path is not in the bundle, `Some(Err(_))` if it
    /// is but cannot be opened.
    pub fn open(&self, path: &str) -> Option<io::Result<Box<dyn Read + '_>>> {
        let entry = self.entries.get(&normalize_path(path))?;
        Some(match entry {
            ResourceEntry::DiskBacked(p) => {
                File::open(p).map(|f| Box::new(f) as Box<dyn Read + '_>)
            }
            ResourceEntry::Embedded(data) => Ok(Box::new(&data[..]) as Box<dyn Read + '_>),
        })
    }

    /// Check if a path exists in the bundle.
    pub fn exists(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize_path(path))
    }

    /// Size in bytes of a resource, if known without reading it.
    pub fn size(&self, path: &str) -> Option<u64> {
        match self.entries.get(&normalize_path(path))? {
            ResourceEntry::DiskBacked(p) => std::fs::metadata(p).ok().map(|m| m.len()),
            ResourceEntry::Embedded(data) => Some(data.len() as u64),
        }
    }

    /// All resource paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.entries.keys().map(|s| s.as_str()).collect();
        paths.sort_unstable();
        paths
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the bundle is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalize a resource path for lookup.
///
/// - Replace backslashes with forward slashes
/// - Remove leading `./` and `/`
fn normalize_path(path: &str) -> String {
    let mut p = path.replace('\\', "/");
    loop {
        if let Some(rest) = p.strip_prefix("./") {
            p = rest.to_string();
        } else if let Some(rest) = p.strip_prefix('/') {
            p = rest.to_string();
        } else {
            break;
        }
    }
    p
}
