//! Process-wide entry points on a build with no embedded libraries
//!
//! Lives in its own test binary: the global loader is built once per process,
//! from the environment as it is on first use.

use spirvcross_natives::{ensure_natives_loaded, global_loader, natives_ready, LoaderState};

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
#[test]
fn test_empty_bundle_reports_first_library_missing() {
    for var in [
        "SPIRVCROSSJ_NATIVES_TMPDIR",
        "SPIRVCROSSJ_NATIVES_PREFIX",
        "SPIRVCROSSJ_NATIVES_RESOURCES",
        "SPIRVCROSSJ_NATIVES_SWEEP",
    ] {
        std::env::remove_var(var);
    }
    // Only meaningful when the build embedded nothing
    if !global_loader().bundle().is_empty() {
        return;
    }

    assert!(!natives_ready());
    assert!(!ensure_natives_loaded());
    assert!(!natives_ready());
    assert_eq!(global_loader().state(), LoaderState::NotReady);
    assert!(global_loader().loaded_libraries().is_empty());

    let report = global_loader().last_report().unwrap();
    assert!(!report.ready);
    assert!(report.staging_dir.is_none());
    assert_eq!(report.libraries[0].name, "SPIRV-Tools-shared");
    let error = report.libraries[0].error.as_ref().unwrap();
    assert!(error.contains("libSPIRV-Tools-shared"), "{}", error);
    assert!(error.contains("not available"), "{}", error);
    assert!(report.libraries.iter().all(|l| l.staged_path.is_none()));
}
