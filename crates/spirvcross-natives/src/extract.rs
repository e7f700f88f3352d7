//! Extraction phase: copy bundled libraries into a staging directory.
//!
//! Libraries are staged in order and extraction stops at the first library that
//! cannot be staged, since later libraries may depend on it.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::BootstrapError;
use crate::resources::{resource_path, ResourceBundle};
use crate::staging::StagingDir;

/// A required library and its platform file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredLibrary {
    /// Logical name, e.g. `spirvcrossj`
    pub name: String,
    /// File name on this platform, e.g. `libspirvcrossj.so`
    pub file_name: String,
}

/// A library copied to the real filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub library: String,
    pub path: PathBuf,
}

/// Result of the extraction phase.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Staging directory, if any library got far enough to need it
    pub staging_dir: Option<StagingDir>,
    /// Fully staged libraries, in order, ready to load
    pub staged: Vec<StagedFile>,
    /// Every file created on disk, including a partially written one
    pub created: Vec<PathBuf>,
    /// Error that stopped extraction
    pub error: Option<BootstrapError>,
}

impl Extraction {
    /// Whether the staging directory itself could not be created.
    pub fn staging_failed(&self) -> bool {
        matches!(self.error, Some(BootstrapError::StagingDirectory { .. }))
    }
}

/// Stage `libraries` from `bundle` into a new directory under `root`.
///
/// The staging directory is created on first use, so a missing first resource
/// leaves the filesystem untouched.
pub fn stage_all(
    bundle: &ResourceBundle,
    libraries: &[RequiredLibrary],
    root: &Path,
    prefix: &str,
) -> Extraction {
    let mut extraction = Extraction::default();

    for library in libraries {
        let resource = resource_path(&library.file_name);
        tracing::debug!("Resource path: {}", resource);

        if !bundle.exists(&resource) {
            tracing::error!("Module resource {} not available!", resource);
            extraction.error = Some(BootstrapError::ResourceNotFound {
                library: library.name.clone(),
                resource,
            });
            break;
        }

        if extraction.staging_dir.is_none() {
            match StagingDir::create(root, prefix) {
                Ok(dir) => extraction.staging_dir = Some(dir),
                Err(e) => {
                    tracing::error!("{}", e);
                    extraction.error = Some(e);
                    break;
                }
            }
        }
        let Some(dir) = extraction.staging_dir.as_ref() else {
            break;
        };

        let target = dir.file_path(&library.file_name);
        tracing::debug!("Staging {} at {}", library.name, target.display());

        let reader = match bundle.open(&resource) {
            Some(Ok(reader)) => reader,
            Some(Err(source)) => {
                tracing::error!("Error while reading {}: {}", library.name, source);
                extraction.error = Some(BootstrapError::ResourceCopy {
                    library: library.name.clone(),
                    source,
                });
                break;
            }
            None => {
                extraction.error = Some(BootstrapError::ResourceNotFound {
                    library: library.name.clone(),
                    resource,
                });
                break;
            }
        };

        // create_new: never write over a file the loader may already have mapped
        let file = match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            Err(source) => {
                tracing::error!("Error while writing {}: {}", library.name, source);
                extraction.error = Some(BootstrapError::ResourceCopy {
                    library: library.name.clone(),
                    source,
                });
                break;
            }
        };
        extraction.created.push(target.clone());

        if let Err(source) = copy_resource(reader, file) {
            tracing::error!("Error while writing {}: {}", library.name, source);
            extraction.error = Some(BootstrapError::ResourceCopy {
                library: library.name.clone(),
                source,
            });
            break;
        }

        extraction.staged.push(StagedFile {
            library: library.name.clone(),
            path: target,
        });
    }

    extraction
}

fn copy_resource(mut reader: Box<dyn Read + '_>, file: File) -> io::Result<u64> {
    let mut writer = BufWriter::new(file);
    let written = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceEntry;
    use std::borrow::Cow;

    fn lib(name: &str) -> RequiredLibrary {
        RequiredLibrary {
            name: name.to_string(),
            file_name: format!("lib{}.so", name),
        }
    }

    fn bundle_with(names: &[&str]) -> ResourceBundle {
        let mut bundle = ResourceBundle::empty();
        for name in names {
            bundle.insert(
                &resource_path(&format!("lib{}.so", name)),
                ResourceEntry::Embedded(Cow::Owned(format!("payload-{}", name).into_bytes())),
            );
        }
        bundle
    }

    #[test]
    fn test_stage_all_present() {
        let root = tempfile::tempdir().unwrap();
        let bundle = bundle_with(&["A", "B"]);

        let extraction = stage_all(&bundle, &[lib("A"), lib("B")], root.path(), "natives");

        assert!(extraction.error.is_none());
        assert_eq!(extraction.staged.len(), 2);
        assert_eq!(extraction.created.len(), 2);
        assert_eq!(extraction.staged[0].library, "A");
        assert_eq!(std::fs::read(&extraction.staged[1].path).unwrap(), b"payload-B");
        let dir = extraction.staging_dir.as_ref().unwrap();
        assert!(extraction.staged[0].path.starts_with(dir.path()));
    }

    #[test]
    fn test_missing_first_resource_creates_nothing() {
        let root = tempfile::tempdir().unwrap();
        let bundle = bundle_with(&["B"]);

        let extraction = stage_all(&bundle, &[lib("A"), lib("B")], root.path(), "natives");

        assert!(extraction.staging_dir.is_none());
        assert!(extraction.staged.is_empty());
        assert!(matches!(
            extraction.error,
            Some(BootstrapError::ResourceNotFound { ref library, .. }) if library == "A"
        ));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_stops_after_missing_resource() {
        let root = tempfile::tempdir().unwrap();
        let bundle = bundle_with(&["A", "C"]);

        let extraction = stage_all(
            &bundle,
            &[lib("A"), lib("B"), lib("C")],
            root.path(),
            "natives",
        );

        let staged: Vec<&str> = extraction.staged.iter().map(|s| s.library.as_str()).collect();
        assert_eq!(staged, vec!["A"]);
        assert!(matches!(
            extraction.error,
            Some(BootstrapError::ResourceNotFound { ref library, .. }) if library == "B"
        ));
    }

    #[test]
    fn test_unreadable_resource_stops_extraction() {
        let root = tempfile::tempdir().unwrap();
        let mut bundle = bundle_with(&["B"]);
        bundle.insert(
            &resource_path("libA.so"),
            ResourceEntry::DiskBacked(PathBuf::from("/nonexistent/libA.so")),
        );

        let extraction = stage_all(&bundle, &[lib("A"), lib("B")], root.path(), "natives");

        assert!(extraction.staged.is_empty());
        assert!(extraction.created.is_empty());
        assert!(extraction.staging_dir.is_some());
        assert!(matches!(
            extraction.error,
            Some(BootstrapError::ResourceCopy { ref library, .. }) if library == "A"
        ));
    }

    #[test]
    fn test_staging_dir_failure() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let bundle = bundle_with(&["A"]);

        let extraction = stage_all(&bundle, &[lib("A")], &blocker, "natives");

        assert!(extraction.staging_failed());
        assert!(extraction.staging_dir.is_none());
        assert!(extraction.staged.is_empty());
    }

    #[test]
    fn test_copy_resource_empty_payload() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("empty");
        let file = File::create(&path).unwrap();
        let written = copy_resource(Box::new(&b""[..]), file).unwrap();
        assert_eq!(written, 0);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }
}
